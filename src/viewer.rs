//! The viewer's window and main loop.
//!
//! A run builds one [`Scene`] through a [`SceneConstructor`] once the window
//! and device exist, then loops until the window closes:
//!
//! 1. Apply held movement keys to the camera
//! 2. `root.draw` with the camera matrices and the clock time (CPU only)
//! 3. `root.write_to_buffers` to upload every mesh's uniforms
//! 4. Record the render pass(es): the scene straight to the surface, or into
//!    an offscreen [`FrameTexture`] followed by the full-screen quad
//! 5. Submit and present
//!
//! Input is handled synchronously between frames. Escape and Q close the
//! window, Space restarts the animation clock, W/A/S/D and the mouse drive
//! the camera, and every key press except the closing ones is also routed
//! through the scene graph.

use std::{iter, pin::Pin, rc::Rc, sync::Arc};

use anyhow::Context as _;
use cgmath::{Matrix4, SquareMatrix};
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    animation::{Clock, SystemClock},
    camera::{Camera, CameraController},
    context::{Context, InitContext, ViewerConfig},
    data_structures::{
        mesh::Mesh,
        scene_graph::{Drawable, Frame, Node},
        shader::Shader,
        texture::FrameTexture,
    },
    pipelines::bundled,
};

/// Everything a run draws: the scene graph, its camera and the shaders its
/// meshes share.
pub struct Scene {
    pub root: Node,
    pub camera: Box<dyn Camera>,
    shaders: Vec<Rc<Shader>>,
}

impl Scene {
    pub fn new(camera: impl Camera + 'static) -> Self {
        Self {
            root: Node::default(),
            camera: Box::new(camera),
            shaders: Vec::new(),
        }
    }

    /// Keep `shader` alive for the whole run and hand out a shared handle.
    pub fn add_shader(&mut self, shader: Shader) -> Rc<Shader> {
        let shader = Rc::new(shader);
        self.shaders.push(shader.clone());
        shader
    }

    pub fn shaders(&self) -> &[Rc<Shader>] {
        &self.shaders
    }

    /// CPU half of a frame: matrices and uniform values for every drawable.
    pub fn draw(&mut self, time: f32, aspect: f32) -> Frame {
        let frame = Frame {
            time,
            camera_position: self.camera.position(),
        };
        let view = self.camera.view_matrix();
        let projection = self.camera.projection_matrix(aspect);
        self.root
            .draw(&frame, &projection, &view, &Matrix4::identity());
        frame
    }

    /// Release the meshes first, then the shaders they shared.
    pub fn release(&mut self) {
        self.root.release();
        self.root = Node::default();
        for shader in self.shaders.drain(..) {
            release_shader(shader);
        }
    }
}

/// Release a shared shader once nothing else holds it.
pub fn release_shader(shader: Rc<Shader>) {
    match Rc::try_unwrap(shader) {
        Ok(mut shader) => shader.release(),
        Err(shader) => log::warn!(
            "Shader {} is still referenced {} times at teardown",
            shader.label(),
            Rc::strong_count(&shader) - 1
        ),
    }
}

/// Builds the scene once the device is ready.
pub type SceneConstructor =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = anyhow::Result<Scene>>>>>;

/// Offscreen target plus the quad that presents it.
pub struct PostProcess {
    shader: Rc<Shader>,
    frame: FrameTexture,
    quad: Mesh,
}

impl PostProcess {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: [u32; 2],
    ) -> anyhow::Result<Self> {
        let shader = Rc::new(bundled::screen(device, format));
        let frame = FrameTexture::new(device, size, format);
        let quad = Mesh::screen(device, shader.clone(), &frame)?;
        Ok(Self {
            shader,
            frame,
            quad,
        })
    }

    /// New target and quad at `size`. The quad samples the old texture
    /// otherwise.
    pub fn resize(&mut self, device: &wgpu::Device, size: [u32; 2]) -> anyhow::Result<()> {
        let frame = FrameTexture::new(device, size, self.frame.format);
        let quad = Mesh::screen(device, self.shader.clone(), &frame)?;
        self.quad.release();
        self.frame.release();
        self.frame = frame;
        self.quad = quad;
        Ok(())
    }

    pub fn frame(&self) -> &FrameTexture {
        &self.frame
    }

    pub fn quad(&self) -> &Mesh {
        &self.quad
    }

    fn prepare(&mut self, queue: &wgpu::Queue, time: f32) {
        let identity = Matrix4::identity();
        self.quad
            .draw(&Frame::at(time), &identity, &identity, &identity);
        self.quad.write_to_buffers(queue);
    }

    pub fn release(self) {
        let Self {
            shader,
            frame,
            mut quad,
        } = self;
        quad.release();
        drop(quad);
        frame.release();
        release_shader(shader);
    }
}

/// Handle a pressed key. Returns false when the key closes the viewer.
///
/// Space also restarts `clock`. Every key other than Escape and Q reaches the
/// scene, movement keys included.
pub fn route_key(key: KeyCode, clock: &mut impl Clock, root: &mut Node) -> bool {
    if matches!(key, KeyCode::Escape | KeyCode::KeyQ) {
        return false;
    }
    if key == KeyCode::Space {
        clock.reset();
    }
    root.key_handler(key);
    true
}

/// Record one render pass that clears `target` and renders `drawable`.
pub fn render_pass(
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    depth: Option<&wgpu::TextureView>,
    clear_colour: wgpu::Color,
    drawable: &dyn Drawable,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Render Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear_colour),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    drawable.render(&mut pass);
}

struct ViewerState {
    ctx: Context,
    scene: Scene,
    post_process: Option<PostProcess>,
    controller: CameraController,
    clock: SystemClock,
    last_time: Instant,
    is_surface_configured: bool,
}

impl ViewerState {
    fn resize(&mut self, width: u32, height: u32) {
        if !self.ctx.resize(width, height) {
            return;
        }
        self.is_surface_configured = true;
        if let Some(post_process) = &mut self.post_process {
            if let Err(e) = post_process.resize(&self.ctx.device, [width, height]) {
                log::error!("Could not rebuild the post-process target: {e:#}");
            }
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();
        if !self.is_surface_configured {
            return Ok(());
        }

        let dt = self.last_time.elapsed().as_secs_f32();
        self.last_time = Instant::now();
        for input in self.controller.update(dt) {
            self.scene.camera.process_input(&input);
        }

        let time = self.clock.now();
        self.scene.draw(time, self.ctx.aspect());
        self.scene.root.write_to_buffers(&self.ctx.queue);
        if let Some(post_process) = &mut self.post_process {
            post_process.prepare(&self.ctx.queue, time);
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        let viewer = &self.ctx.viewer;
        match &self.post_process {
            Some(post_process) => {
                render_pass(
                    &mut encoder,
                    &post_process.frame.color.view,
                    Some(&post_process.frame.depth.view),
                    viewer.post_process_clear_colour,
                    &self.scene.root,
                );
                render_pass(
                    &mut encoder,
                    &view,
                    None,
                    viewer.clear_colour,
                    &post_process.quad,
                );
            }
            None => render_pass(
                &mut encoder,
                &view,
                Some(&self.ctx.depth_texture.view),
                viewer.clear_colour,
                &self.scene.root,
            ),
        }
        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn key_pressed(&mut self, key: KeyCode) -> bool {
        route_key(key, &mut self.clock, &mut self.scene.root)
    }

    fn release(mut self) {
        self.scene.release();
        if let Some(post_process) = self.post_process.take() {
            post_process.release();
        }
        self.ctx.depth_texture.release();
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: ViewerConfig,
    constructor: Option<SceneConstructor>,
    state: Option<ViewerState>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: ViewerConfig, constructor: SceneConstructor) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()
                .context("could not start the async runtime")?,
            config,
            constructor: Some(constructor),
            state: None,
            error: None,
        })
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let Some(constructor) = self.constructor.take() else {
            return Ok(());
        };
        let window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("could not create the window")?,
        );

        let ctx = self
            .async_runtime
            .block_on(Context::new(window, self.config.clone()))?;
        let scene = self.async_runtime.block_on(constructor((&ctx).into()))?;
        let post_process = if ctx.viewer.post_process {
            Some(PostProcess::new(&ctx.device, ctx.format(), ctx.size())?)
        } else {
            None
        };

        let size = ctx.window.inner_size();
        let mut state = ViewerState {
            ctx,
            scene,
            post_process,
            controller: CameraController::new(),
            clock: SystemClock::new(),
            last_time: Instant::now(),
            is_surface_configured: false,
        };
        state.resize(size.width, size.height);
        state.clock.reset();
        state.ctx.window.request_redraw();
        self.state = Some(state);
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(state) = self.state.take() {
            state.release();
            log::info!("Viewer closed");
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.init(event_loop) {
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        if let Some(input) = state
            .controller
            .process_window_event(&event, state.ctx.window.inner_size())
        {
            state.scene.camera.process_input(&input);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if !state.key_pressed(code) {
                    event_loop.exit();
                }
            }
            WindowEvent::RedrawRequested => match state.render() {
                Ok(()) => {}
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = state.ctx.window.inner_size();
                    state.resize(size.width, size.height);
                }
                Err(e) => log::error!("Unable to render {e}"),
            },
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}

/// Open a window, build the scene with `constructor` and run until closed.
///
/// Errors from window or device creation and from the scene constructor end
/// the run and are returned here.
pub fn run(config: ViewerConfig, constructor: SceneConstructor) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, constructor)?;
    event_loop.run_app(&mut app)?;
    app.teardown();

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
