//! Loading of models, textures and cube maps from the asset directory.
//!
//! Broken model files are tolerated: the importer logs the problem and hands
//! back nothing, so the rest of the scene still shows up. Missing textures
//! and unknown asset names are not. They come back as [`AssetError`] and the
//! caller decides whether to give up.

use std::{
    collections::HashMap,
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
    rc::Rc,
};

use cgmath::Vector3;
use thiserror::Error;

use crate::data_structures::{
    mesh::{Mesh, Phong},
    scene_graph::Drawable,
    shader::Shader,
    texture::Texture,
};

pub mod gltf_import;
pub mod mesh;
pub mod texture;

pub use texture::{find_texture, load_binary, load_cubemap, load_string, load_texture};

use self::mesh::MeshData;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("cannot find texture {name} in {} subtree", dir.display())]
    TextureNotFound { name: String, dir: PathBuf },
    #[error("no model named {name} in {} subtree", root.display())]
    UnknownModel { name: String, root: PathBuf },
    #[error("cube map: {0}")]
    CubeMap(String),
}

/// What every importer needs to turn geometry into meshes.
pub struct ModelContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub shader: Rc<Shader>,
    pub light_dir: Vector3<f32>,
    white: Option<Rc<Texture>>,
    textures: HashMap<PathBuf, Rc<Texture>>,
}

impl<'a> ModelContext<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        shader: Rc<Shader>,
        light_dir: Vector3<f32>,
    ) -> Self {
        Self {
            device,
            queue,
            shader,
            light_dir,
            white: None,
            textures: HashMap::new(),
        }
    }

    /// 1×1 white texture for materials without an image.
    pub fn white(&mut self) -> Rc<Texture> {
        let (device, queue) = (self.device, self.queue);
        self.white
            .get_or_insert_with(|| {
                Rc::new(Texture::create_solid(
                    device,
                    queue,
                    [255, 255, 255, 255],
                    "white",
                ))
            })
            .clone()
    }

    /// Load `path` once per context.
    pub async fn texture(&mut self, path: &Path) -> anyhow::Result<Rc<Texture>> {
        if let Some(texture) = self.textures.get(path) {
            return Ok(texture.clone());
        }
        let texture = Rc::new(load_texture(path, self.device, self.queue).await?);
        self.textures.insert(path.to_path_buf(), texture.clone());
        Ok(texture)
    }

    pub fn mesh(
        &self,
        data: &MeshData,
        texture: Rc<Texture>,
        phong: Phong,
    ) -> anyhow::Result<Mesh> {
        Ok(Mesh::textured_phong(
            self.device,
            self.shader.clone(),
            texture,
            &data.attributes(),
            data.index(),
            phong,
        )?)
    }
}

/// Import an OBJ or glTF file as Phong-lit meshes drawn with `ctx.shader`.
///
/// Import failures are logged and yield an empty list. A texture that cannot
/// be found is an error.
pub async fn load_model(
    path: &Path,
    ctx: &mut ModelContext<'_>,
) -> anyhow::Result<Vec<Box<dyn Drawable>>> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let result = match extension.as_str() {
        "obj" => load_model_obj(path, ctx).await,
        "gltf" | "glb" => gltf_import::load_model_gltf(path, ctx).await,
        other => Err(anyhow::anyhow!("unsupported model format `{other}`")),
    };
    match result {
        Ok(drawables) => Ok(drawables),
        Err(e) if e.downcast_ref::<AssetError>().is_some() => Err(e),
        Err(e) => {
            log::error!("ERROR loading {}: {:#}", path.display(), e);
            Ok(Vec::new())
        }
    }
}

pub async fn load_model_obj(
    path: &Path,
    ctx: &mut ModelContext<'_>,
) -> anyhow::Result<Vec<Box<dyn Drawable>>> {
    let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let obj_text = load_string(path).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| {
            let mtl_path = dir.join(p);
            async move {
                match tokio::fs::read_to_string(&mtl_path).await {
                    Ok(text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(text))),
                    Err(e) => {
                        log::warn!("could not read {}: {}", mtl_path.display(), e);
                        Err(tobj::LoadError::OpenFileFailed)
                    }
                }
            }
        },
    )
    .await?;

    let obj_materials = obj_materials.unwrap_or_else(|e| {
        log::warn!("{} has no usable materials: {}", path.display(), e);
        Vec::new()
    });
    let mut materials = Vec::with_capacity(obj_materials.len());
    for m in &obj_materials {
        let texture = match &m.diffuse_texture {
            Some(name) => ctx.texture(&find_texture(&dir, name)?).await?,
            None => ctx.white(),
        };
        let phong = Phong {
            light_dir: ctx.light_dir,
            k_a: m.ambient.unwrap_or([0.0, 0.0, 0.0]).into(),
            k_d: m.diffuse.unwrap_or([1.0, 1.0, 1.0]).into(),
            k_s: m.specular.unwrap_or([1.0, 1.0, 1.0]).into(),
            s: m.shininess.unwrap_or(16.0),
        };
        materials.push((texture, phong));
    }

    let mut drawables: Vec<Box<dyn Drawable>> = Vec::with_capacity(models.len());
    let mut faces = 0;
    for model in &models {
        let data = MeshData::from_obj(&model.name, &model.mesh);
        faces += data.face_count();
        let (texture, phong) = match data.material.and_then(|i| materials.get(i)) {
            Some((texture, phong)) => (texture.clone(), *phong),
            None => (
                ctx.white(),
                Phong {
                    light_dir: ctx.light_dir,
                    k_d: Vector3::new(1.0, 1.0, 1.0),
                    ..Phong::default()
                },
            ),
        };
        drawables.push(Box::new(ctx.mesh(&data, texture, phong)?));
    }
    log::info!(
        "Loaded {} ({} meshes, {} faces)",
        path.display(),
        drawables.len(),
        faces
    );
    Ok(drawables)
}

fn find_dir(root: &Path, name: &str) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    if let Some(dir) = dirs.iter().find(|dir| {
        dir.file_name()
            .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(name))
    }) {
        return Some(dir.clone());
    }
    dirs.iter().find_map(|dir| find_dir(dir, name))
}

/// The first `.obj` inside the directory below `root` called `name`,
/// compared case-insensitively.
pub fn find_named_model(root: &Path, name: &str) -> Result<PathBuf, AssetError> {
    let unknown = || AssetError::UnknownModel {
        name: name.to_string(),
        root: root.to_path_buf(),
    };
    let dir = find_dir(root, name).ok_or_else(unknown)?;
    let mut found = None;
    let walked = texture::walk_dir(&dir, &mut |path| {
        let is_obj = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("obj"));
        if found.is_none() && is_obj {
            found = Some(path.to_path_buf());
        }
    });
    if let Err(e) = walked {
        log::warn!("could not search {}: {}", dir.display(), e);
    }
    found.ok_or_else(unknown)
}
