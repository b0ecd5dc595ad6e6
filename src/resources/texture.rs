use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use image::GenericImageView;

use crate::{
    data_structures::texture::{CubeMap, Texture, order_cube_faces},
    resources::AssetError,
};

pub async fn load_string(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))
}

pub async fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))
}

/// Visit every file below `dir` depth first, entries of a directory in name order.
pub fn walk_dir<F>(dir: &Path, callback: &mut F) -> io::Result<()>
where
    F: FnMut(&Path),
{
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            walk_dir(&path, callback)?;
        } else if path.is_file() {
            callback(&path);
        }
    }
    Ok(())
}

/// Locate a texture a material refers to.
///
/// The name is tried as given (relative to `dir`) first. Exported paths are
/// often stale, so after that the whole tree below `dir` is searched for a
/// file whose name is a prefix of the wanted base name or the other way round.
pub fn find_texture(dir: &Path, name: &str) -> Result<PathBuf, AssetError> {
    let verbatim = dir.join(name);
    if verbatim.is_file() {
        return Ok(verbatim);
    }
    let base = Path::new(&name.replace('\\', "/"))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let mut found = None;
    let walked = walk_dir(dir, &mut |path| {
        if found.is_some() {
            return;
        }
        let Some(file) = path.file_name().map(|f| f.to_string_lossy()) else {
            return;
        };
        if base.starts_with(&*file) || file.starts_with(base.as_str()) {
            found = Some(path.to_path_buf());
        }
    });
    if let Err(e) = walked {
        log::warn!("could not search {} for {}: {}", dir.display(), name, e);
    }
    found.ok_or_else(|| AssetError::TextureNotFound {
        name: name.to_string(),
        dir: dir.to_path_buf(),
    })
}

pub async fn load_image(path: &Path) -> anyhow::Result<image::DynamicImage> {
    let data = load_binary(path).await?;
    image::load_from_memory(&data).with_context(|| format!("could not decode {}", path.display()))
}

pub async fn load_texture(
    path: &Path,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let img = load_image(path).await?;
    let (width, height) = img.dimensions();
    let label = path.to_string_lossy();
    let texture = Texture::from_image(device, queue, &img, Some(&label));
    log::info!("Loaded texture {} ({}x{})", path.display(), width, height);
    Ok(texture)
}

/// Load the six images below `dir` as a cube map, ordered by the side each
/// file name mentions.
pub async fn load_cubemap(
    dir: &Path,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<CubeMap> {
    let mut files = Vec::new();
    walk_dir(dir, &mut |path| files.push(path.to_path_buf()))
        .with_context(|| format!("could not list cube map directory {}", dir.display()))?;
    let ordered = order_cube_faces(&files)?;
    let images = futures::future::try_join_all(ordered.iter().map(|path| load_image(path))).await?;
    let faces: [image::DynamicImage; 6] = images
        .try_into()
        .map_err(|_| AssetError::CubeMap("expected 6 decoded faces".to_string()))?;
    Ok(CubeMap::new(device, queue, &faces, &dir.to_string_lossy())?)
}
