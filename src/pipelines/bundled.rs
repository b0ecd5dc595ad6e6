//! Shaders shipped with the viewer.
//!
//! Each pair follows the uniform contract in [`crate::data_structures::uniforms`].

use crate::data_structures::shader::{Shader, ShaderTarget};

pub const PHONG_VERT: &str = include_str!("phong.vert.wgsl");
pub const PHONG_FRAG: &str = include_str!("phong.frag.wgsl");
pub const SKYBOX_VERT: &str = include_str!("skybox.vert.wgsl");
pub const SKYBOX_FRAG: &str = include_str!("skybox.frag.wgsl");
pub const SCREEN_VERT: &str = include_str!("screen.vert.wgsl");
pub const SCREEN_FRAG: &str = include_str!("screen.frag.wgsl");
pub const COLOR_VERT: &str = include_str!("color.vert.wgsl");
pub const COLOR_FRAG: &str = include_str!("color.frag.wgsl");

/// Textured Phong lighting: position, normal and uv at locations 0, 1, 2.
pub fn phong(device: &wgpu::Device, format: wgpu::TextureFormat) -> Shader {
    Shader::new(device, "phong", PHONG_VERT, PHONG_FRAG, &ShaderTarget::scene(format))
}

pub fn skybox(device: &wgpu::Device, format: wgpu::TextureFormat) -> Shader {
    Shader::new(device, "skybox", SKYBOX_VERT, SKYBOX_FRAG, &ShaderTarget::skybox(format))
}

pub fn screen(device: &wgpu::Device, format: wgpu::TextureFormat) -> Shader {
    Shader::new(device, "screen", SCREEN_VERT, SCREEN_FRAG, &ShaderTarget::screen(format))
}

/// Unlit per-vertex colour: position at location 0, rgb at 1.
pub fn color(device: &wgpu::Device, format: wgpu::TextureFormat) -> Shader {
    Shader::new(device, "color", COLOR_VERT, COLOR_FRAG, &ShaderTarget::scene(format))
}
