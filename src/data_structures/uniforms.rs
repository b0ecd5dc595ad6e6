//! Shared uniform naming scheme and CPU-side uniform blocks.
//!
//! Every bundled shader (and every shader a user brings) exposes scene-graph
//! state under the names below. A name the shader does not declare simply
//! resolves to no location and writes to it are dropped.

use std::collections::HashMap;

use cgmath::{Matrix4, Vector3};

use crate::data_structures::shader::{Shader, UniformLocation};

pub const MODEL: &str = "mvp.model";
pub const VIEW: &str = "mvp.view";
pub const PROJECTION: &str = "mvp.projection";

pub const SHININESS: &str = "material.s";
pub const DIFFUSE_MAP: &str = "diffuse_map";

pub const LIGHT_DIR: &str = "lamp.light_dir";
pub const K_A: &str = "lamp.k_a";
pub const K_D: &str = "lamp.k_d";
pub const K_S: &str = "lamp.k_s";

pub const CAMERA_POSITION: &str = "camera.camera_position";

pub const SKYBOX: &str = "skybox";
pub const SCREEN_TEXTURE: &str = "screen_texture";

/// Name of the sampler global that accompanies the texture global `texture`.
pub fn sampler_name(texture: &str) -> String {
    format!("{texture}_sampler")
}

/// CPU copy of one uniform buffer binding.
///
/// Values are written at reflected offsets and pushed to the GPU in one
/// `write_buffer` per frame.
#[derive(Debug)]
pub struct UniformBlock {
    pub group: u32,
    pub binding: u32,
    pub data: Vec<u8>,
    pub buffer: Option<wgpu::Buffer>,
}

impl UniformBlock {
    pub fn new(group: u32, binding: u32, size: u32) -> Self {
        Self {
            group,
            binding,
            data: vec![0; size as usize],
            buffer: None,
        }
    }

    fn write(&mut self, location: &UniformLocation, bytes: &[u8]) {
        let start = location.offset as usize;
        let len = bytes.len().min(location.size as usize);
        match self.data.get_mut(start..start + len) {
            Some(target) => target.copy_from_slice(&bytes[..len]),
            None => log::warn!(
                "uniform write at {}..{} is out of bounds for block ({}, {}) of {} bytes",
                start,
                start + len,
                self.group,
                self.binding,
                self.data.len()
            ),
        }
    }
}

/// The uniform blocks of one mesh plus the locations it cached at construction.
#[derive(Debug, Default)]
pub struct UniformSet {
    pub blocks: Vec<UniformBlock>,
    locations: HashMap<&'static str, Option<UniformLocation>>,
}

impl UniformSet {
    /// Create one zeroed block per uniform buffer the shader declares and
    /// look up `names` once.
    pub fn new(shader: &Shader, names: &[&'static str]) -> Self {
        let blocks = shader
            .uniform_buffers()
            .map(|(group, binding, size)| UniformBlock::new(group, binding, size))
            .collect();
        let locations = names
            .iter()
            .map(|&name| (name, shader.uniform_location(name)))
            .collect();
        Self { blocks, locations }
    }

    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.locations.get(name).copied().flatten()
    }

    pub fn set_bytes(&mut self, name: &str, bytes: &[u8]) {
        let Some(location) = self.location(name) else {
            return;
        };
        if let Some(block) = self
            .blocks
            .iter_mut()
            .find(|b| b.group == location.group && b.binding == location.binding)
        {
            block.write(&location, bytes);
        }
    }

    pub fn set_mat4(&mut self, name: &str, value: &Matrix4<f32>) {
        let raw: [[f32; 4]; 4] = (*value).into();
        self.set_bytes(name, bytemuck::cast_slice(&raw));
    }

    pub fn set_vec3(&mut self, name: &str, value: Vector3<f32>) {
        let raw: [f32; 3] = value.into();
        self.set_bytes(name, bytemuck::cast_slice(&raw));
    }

    pub fn set_f32(&mut self, name: &str, value: f32) {
        self.set_bytes(name, bytemuck::bytes_of(&value));
    }

    pub fn write_to_buffers(&self, queue: &wgpu::Queue) {
        for block in &self.blocks {
            if let Some(buffer) = &block.buffer {
                queue.write_buffer(buffer, 0, &block.data);
            }
        }
    }

    pub fn release(&mut self) {
        for block in &mut self.blocks {
            if let Some(buffer) = block.buffer.take() {
                buffer.destroy();
            }
        }
    }
}
