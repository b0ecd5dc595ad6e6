//! Window, surface and device ownership plus the viewer's configuration.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use winit::window::Window;

use crate::data_structures::texture;

/// Code-level settings of a viewer run.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_colour: wgpu::Color,
    /// Root of the asset tree handed to the scene constructor.
    pub asset_root: PathBuf,
    /// Render the scene offscreen and present it through a full-screen quad.
    pub post_process: bool,
    pub post_process_clear_colour: wgpu::Color,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Viewer".to_string(),
            width: 1280,
            height: 720,
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
            asset_root: PathBuf::from("assets"),
            post_process: false,
            post_process_clear_colour: wgpu::Color::WHITE,
        }
    }
}

/// Adapter, device and queue, optionally compatible with `surface`.
///
/// Without a surface this gives a headless device for offscreen work.
pub async fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> anyhow::Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .context("failed to acquire GPU adapter")?;
    log::info!("Using adapter {}", adapter.get_info().name);
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("viewer device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
            ..Default::default()
        })
        .await
        .context("failed to create GPU device")?;
    Ok((adapter, device, queue))
}

pub fn instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    })
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub viewer: ViewerConfig,
}

impl Context {
    pub async fn new(window: Arc<Window>, viewer: ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let instance = instance();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let (adapter, device, queue) = request_device(&instance, Some(&surface)).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The bundled shaders output linear colour and rely on an sRGB target.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            viewer,
        })
    }

    /// Reconfigure the surface and depth texture. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture.release();
        self.depth_texture =
            texture::Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        true
    }

    pub fn size(&self) -> [u32; 2] {
        [self.config.width, self.config.height]
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

/// What a scene constructor gets to build its GPU resources with.
///
/// `Device` and `Queue` are reference counted, so the clones share the
/// context's handles.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Colour format every scene shader must target.
    pub format: wgpu::TextureFormat,
    pub size: [u32; 2],
    pub asset_root: PathBuf,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            format: ctx.format(),
            size: ctx.size(),
            asset_root: ctx.viewer.asset_root.clone(),
        }
    }
}
