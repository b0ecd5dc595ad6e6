//! reef-viewer
//!
//! A small real-time 3D scene viewer on top of wgpu and winit. Scenes are
//! trees of transforms and meshes; the viewer draws them each frame through
//! a trackball or first-person camera, optionally via an offscreen
//! post-process pass, and animates subtrees from keyframes or closed-form
//! motions.
//!
//! High-level modules
//! - `animation`: keyframe interpolation, animation nodes and clocks
//! - `camera`: trackball and first-person cameras behind one trait
//! - `context`: window, surface and device ownership plus configuration
//! - `data_structures`: GPU resource wrappers and the scene graph
//! - `pipelines`: pipeline construction and the bundled WGSL shaders
//! - `resources`: OBJ/glTF import, texture search and cube map loading
//! - `viewer`: the window event loop
//!

pub mod animation;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod pipelines;
pub mod resources;
pub mod viewer;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit::keyboard::KeyCode;
