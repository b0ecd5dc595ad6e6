//! GPU textures: 2D images, cube maps and offscreen render targets.
//!
//! This module provides [`Texture`], [`CubeMap`] and [`FrameTexture`]. Each
//! one owns its `wgpu::Texture` and destroys it exactly once, either through
//! an explicit `release()` or when dropped.

use std::{
    cell::Cell,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use image::GenericImageView;

use crate::resources::AssetError;

/// Face order of a cube map: +x, -x, +y, -y, +z, -z.
pub const CUBE_FACES: [&str; 6] = ["right", "left", "up", "down", "front", "back"];

/// A GPU texture with a view and optional sampler.
///
/// Typically created via [`from_bytes`](Self::from_bytes), as a 1×1 colour
/// via [`create_solid`](Self::create_solid), or as a depth attachment via
/// [`create_depth_texture`](Self::create_depth_texture).
#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
    released: Cell<bool>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    fn wrap(texture: wgpu::Texture, sampler: Option<wgpu::Sampler>) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler,
            released: Cell::new(false),
        }
    }

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        });
        Self::wrap(texture, None)
    }

    /// A 1×1 texture of one colour, bound where a material has no image.
    pub fn create_solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
    ) -> Self {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba(rgba),
        ));
        Self::from_image(device, queue, &img, Some(label))
    }

    /// Decode image file contents (PNG, JPEG, ...) and upload them.
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
    ) -> anyhow::Result<Self> {
        let img = image::load_from_memory(bytes)
            .with_context(|| format!("could not decode texture {label}"))?;
        Ok(Self::from_image(device, queue, &img, Some(label)))
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
    ) -> Self {
        let (width, height) = img.dimensions();
        let rgba = img.to_rgba8();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_layer(queue, &texture, &rgba, 0);
        Self::wrap(
            texture,
            Some(create_sampler(device, wgpu::AddressMode::Repeat)),
        )
    }

    pub fn is_released(&self) -> bool {
        self.released.get()
    }

    /// Destroy the GPU texture. Later calls do nothing.
    pub fn release(&self) {
        if !self.released.replace(true) {
            self.texture.destroy();
        }
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.release();
    }
}

fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, rgba: &image::RgbaImage, layer: u32) {
    let (width, height) = rgba.dimensions();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

pub fn create_sampler(device: &wgpu::Device, address_mode: wgpu::AddressMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Sort six face images into cube map order by the side named in each file stem.
///
/// Each stem must contain exactly one of `right, left, up, down, front, back`
/// (case-insensitive), and every side must be named by exactly one file.
pub fn order_cube_faces<P: AsRef<Path>>(paths: &[P]) -> Result<[PathBuf; 6], AssetError> {
    if paths.len() != 6 {
        return Err(AssetError::CubeMap(format!(
            "expected 6 face images, found {}",
            paths.len()
        )));
    }
    let mut faces: [Option<PathBuf>; 6] = Default::default();
    for path in paths {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let matches: Vec<usize> = CUBE_FACES
            .iter()
            .enumerate()
            .filter(|(_, side)| stem.contains(*side))
            .map(|(i, _)| i)
            .collect();
        let index = match matches.as_slice() {
            [index] => *index,
            [] => {
                return Err(AssetError::CubeMap(format!(
                    "{} does not name a cube side",
                    path.display()
                )));
            }
            _ => {
                return Err(AssetError::CubeMap(format!(
                    "{} names more than one cube side",
                    path.display()
                )));
            }
        };
        if let Some(previous) = &faces[index] {
            return Err(AssetError::CubeMap(format!(
                "both {} and {} are the {} face",
                previous.display(),
                path.display(),
                CUBE_FACES[index]
            )));
        }
        faces[index] = Some(path.to_path_buf());
    }
    // Six files, no side matched twice: every slot is filled.
    let [r, l, u, d, f, b] = faces;
    match (r, l, u, d, f, b) {
        (Some(r), Some(l), Some(u), Some(d), Some(f), Some(b)) => Ok([r, l, u, d, f, b]),
        _ => Err(AssetError::CubeMap("missing cube side".to_string())),
    }
}

/// Six square images uploaded as the layers of one cube texture.
#[derive(Debug)]
pub struct CubeMap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    released: Cell<bool>,
}

impl CubeMap {
    /// `faces` must already be in [`CUBE_FACES`] order and share one size.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[image::DynamicImage; 6],
        label: &str,
    ) -> Result<Self, AssetError> {
        let (width, height) = faces[0].dimensions();
        if let Some((i, _)) = faces
            .iter()
            .enumerate()
            .find(|(_, face)| face.dimensions() != (width, height))
        {
            return Err(AssetError::CubeMap(format!(
                "{} face is {:?}, expected {}x{}",
                CUBE_FACES[i],
                faces[i].dimensions(),
                width,
                height
            )));
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (layer, face) in faces.iter().enumerate() {
            write_layer(queue, &texture, &face.to_rgba8(), layer as u32);
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        log::info!("Loaded cubemap {label} ({width}x{height})");
        Ok(Self {
            texture,
            view,
            sampler: create_sampler(device, wgpu::AddressMode::ClampToEdge),
            released: Cell::new(false),
        })
    }

    pub fn release(&self) {
        if !self.released.replace(true) {
            self.texture.destroy();
        }
    }
}

impl Drop for CubeMap {
    fn drop(&mut self) {
        self.release();
    }
}

/// Offscreen colour target with its own depth attachment.
///
/// The scene renders into `color`; the post-process pass samples it.
#[derive(Debug)]
pub struct FrameTexture {
    pub color: Texture,
    pub depth: Texture,
    pub format: wgpu::TextureFormat,
}

impl FrameTexture {
    pub fn new(device: &wgpu::Device, size: [u32; 2], format: wgpu::TextureFormat) -> Self {
        let extent = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("frame texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        Self {
            color: Texture::wrap(
                texture,
                Some(create_sampler(device, wgpu::AddressMode::ClampToEdge)),
            ),
            depth: Texture::create_depth_texture(device, size, "frame depth"),
            format,
        }
    }

    pub fn size(&self) -> [u32; 2] {
        let size = self.color.texture.size();
        [size.width, size.height]
    }

    pub fn release(&self) {
        self.color.release();
        self.depth.release();
    }

    /// Copy the colour target back to the CPU. Expects an 8-bit RGBA format.
    pub async fn read_pixels(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> anyhow::Result<image::RgbaImage> {
        let [width, height] = self.size();
        let u32_size = std::mem::size_of::<u32>() as u32;
        let unpadded = u32_size * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: Some("frame readback"),
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.color.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            self.color.texture.size(),
        );
        queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })
            .map_err(|e| anyhow::anyhow!("device poll failed: {e:?}"))?;
        rx.receive()
            .await
            .context("readback channel closed")?
            .map_err(|e| anyhow::anyhow!("could not map readback buffer: {e:?}"))?;

        let pixels = {
            let data = buffer_slice.get_mapped_range();
            data.chunks(padded as usize)
                .flat_map(|row| &row[..unpadded as usize])
                .copied()
                .collect::<Vec<u8>>()
        };
        output_buffer.unmap();
        output_buffer.destroy();
        image::RgbaImage::from_raw(width, height, pixels)
            .context("readback buffer has the wrong size")
    }
}
