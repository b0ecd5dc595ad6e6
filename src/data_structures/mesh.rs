//! Vertex arrays and the mesh leaves of the scene graph.
//!
//! A [`VertexArray`] is one GPU buffer per attribute (the attribute's position
//! in the list is its shader `@location`) plus an optional index buffer.
//! A [`Mesh`] pairs a vertex array with a shared [`Shader`], the uniform
//! blocks it reflected from that shader, and the textures its kind needs.

use std::rc::Rc;

use cgmath::{Matrix3, Matrix4, SquareMatrix, Vector3};
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::data_structures::{
    scene_graph::{Drawable, Frame},
    shader::{ResourceKind, Shader},
    texture::{CubeMap, FrameTexture, Texture},
    uniforms::{self, UniformSet},
};

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("attribute {location} has {rows} rows, expected {expected}")]
    AttributeLength {
        location: usize,
        rows: usize,
        expected: usize,
    },
    #[error("attribute {location} holds {len} floats, not a multiple of {components}")]
    RaggedAttribute {
        location: usize,
        len: usize,
        components: u32,
    },
    #[error("attribute {location} has {components} components, expected 1 to 4")]
    ComponentCount { location: usize, components: u32 },
    #[error("shader {shader} reads @location({location}) with {expected} components, got {found:?}")]
    MissingAttribute {
        shader: String,
        location: u32,
        expected: u32,
        found: Option<u32>,
    },
    #[error("shader {shader} needs a resource for `{name}`")]
    UnboundResource { shader: String, name: String },
}

/// One per-vertex attribute: `data.len() / components` rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub data: Vec<f32>,
    pub components: u32,
}

impl Attribute {
    pub fn new(data: Vec<f32>, components: u32) -> Self {
        Self { data, components }
    }

    pub fn vec2(rows: &[[f32; 2]]) -> Self {
        Self::new(rows.iter().flatten().copied().collect(), 2)
    }

    pub fn vec3(rows: &[[f32; 3]]) -> Self {
        Self::new(rows.iter().flatten().copied().collect(), 3)
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.components.max(1) as usize
    }
}

/// Vertex array: one buffer per attribute and an optional index buffer.
#[derive(Debug)]
pub struct VertexArray {
    buffers: Vec<Option<wgpu::Buffer>>,
    index: Option<(wgpu::Buffer, u32)>,
    vertex_count: u32,
    released: bool,
}

impl VertexArray {
    /// Shared row count of all present attributes.
    ///
    /// Fails before anything is uploaded when an attribute is ragged or the
    /// attributes disagree on the number of vertices.
    pub fn vertex_count(attributes: &[Option<Attribute>]) -> Result<u32, GpuError> {
        let mut expected: Option<usize> = None;
        for (location, attribute) in attributes.iter().enumerate() {
            let Some(attribute) = attribute else {
                continue;
            };
            if !(1..=4).contains(&attribute.components) {
                return Err(GpuError::ComponentCount {
                    location,
                    components: attribute.components,
                });
            }
            if attribute.data.len() % attribute.components as usize != 0 {
                return Err(GpuError::RaggedAttribute {
                    location,
                    len: attribute.data.len(),
                    components: attribute.components,
                });
            }
            let rows = attribute.rows();
            match expected {
                None => expected = Some(rows),
                Some(expected) if expected != rows => {
                    return Err(GpuError::AttributeLength {
                        location,
                        rows,
                        expected,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(expected.unwrap_or(0) as u32)
    }

    pub fn new(
        device: &wgpu::Device,
        label: &str,
        attributes: &[Option<Attribute>],
        index: Option<&[u32]>,
    ) -> Result<Self, GpuError> {
        let vertex_count = Self::vertex_count(attributes)?;
        let buffers = attributes
            .iter()
            .enumerate()
            .map(|(location, attribute)| {
                attribute.as_ref().map(|attribute| {
                    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{label} attribute {location}")),
                        contents: bytemuck::cast_slice(&attribute.data),
                        usage: wgpu::BufferUsages::VERTEX,
                    })
                })
            })
            .collect();
        let index = index.map(|index| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} index")),
                contents: bytemuck::cast_slice(index),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, index.len() as u32)
        });
        Ok(Self {
            buffers,
            index,
            vertex_count,
            released: false,
        })
    }

    pub fn count(&self) -> u32 {
        self.vertex_count
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Bind every attribute buffer to its slot and issue the draw call.
    pub fn execute(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.released {
            return;
        }
        for (slot, buffer) in self.buffers.iter().enumerate() {
            if let Some(buffer) = buffer {
                pass.set_vertex_buffer(slot as u32, buffer.slice(..));
            }
        }
        match &self.index {
            Some((buffer, count)) => {
                pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..*count, 0, 0..1);
            }
            None => pass.draw(0..self.vertex_count, 0..1),
        }
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for buffer in self.buffers.iter_mut().filter_map(Option::take) {
            buffer.destroy();
        }
        if let Some((buffer, _)) = self.index.take() {
            buffer.destroy();
        }
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        self.release();
    }
}

/// Directional light and material coefficients of a Phong-lit mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Phong {
    /// Light direction in world coordinates.
    pub light_dir: Vector3<f32>,
    pub k_a: Vector3<f32>,
    pub k_d: Vector3<f32>,
    pub k_s: Vector3<f32>,
    pub s: f32,
}

impl Default for Phong {
    fn default() -> Self {
        Self {
            light_dir: Vector3::new(0.0, -1.0, 0.0),
            k_a: Vector3::new(0.0, 0.0, 0.0),
            k_d: Vector3::new(1.0, 1.0, 0.0),
            k_s: Vector3::new(1.0, 1.0, 1.0),
            s: 16.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshKind {
    /// Plain geometry with only the matrices.
    Static,
    TexturedPhong,
    /// Cube around the camera, translation removed from the view.
    Skybox,
    /// Full-screen quad sampling the offscreen frame.
    Screen,
}

impl MeshKind {
    fn uniform_names(self) -> &'static [&'static str] {
        use uniforms::*;
        match self {
            MeshKind::Static | MeshKind::Skybox | MeshKind::Screen => {
                &[MODEL, VIEW, PROJECTION]
            }
            MeshKind::TexturedPhong => &[
                MODEL,
                VIEW,
                PROJECTION,
                SHININESS,
                LIGHT_DIR,
                K_A,
                K_D,
                K_S,
                CAMERA_POSITION,
            ],
        }
    }
}

const SKYBOX_POSITIONS: [[f32; 3]; 36] = [
    [-1.0, 1.0, -1.0], [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [-1.0, -1.0, 1.0],
    [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0], [1.0, 1.0, -1.0], [1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0],
    [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0],
];

const SCREEN_POSITIONS: [[f32; 2]; 6] = [
    [-1.0, 1.0], [-1.0, -1.0], [1.0, -1.0],
    [-1.0, 1.0], [1.0, -1.0], [1.0, 1.0],
];

// Texture rows start at the top in wgpu.
const SCREEN_TEX_COORDS: [[f32; 2]; 6] = [
    [0.0, 0.0], [0.0, 1.0], [1.0, 1.0],
    [0.0, 0.0], [1.0, 1.0], [1.0, 0.0],
];

/// A scene graph leaf: geometry drawn with a shared shader.
pub struct Mesh {
    kind: MeshKind,
    shader: Rc<Shader>,
    uniforms: UniformSet,
    bind_groups: Vec<wgpu::BindGroup>,
    vertex_array: VertexArray,
    pub phong: Phong,
    texture: Option<Rc<Texture>>,
    cubemap: Option<Rc<CubeMap>>,
}

impl Mesh {
    /// Geometry with the model/view/projection matrices only.
    pub fn new(
        device: &wgpu::Device,
        shader: Rc<Shader>,
        attributes: &[Option<Attribute>],
        index: Option<&[u32]>,
    ) -> Result<Self, GpuError> {
        Self::build(device, MeshKind::Static, shader, attributes, index, &[])
    }

    pub fn textured_phong(
        device: &wgpu::Device,
        shader: Rc<Shader>,
        texture: Rc<Texture>,
        attributes: &[Option<Attribute>],
        index: Option<&[u32]>,
        phong: Phong,
    ) -> Result<Self, GpuError> {
        let sampler = uniforms::sampler_name(uniforms::DIFFUSE_MAP);
        let mut mesh = {
            let mut resources = vec![(
                uniforms::DIFFUSE_MAP.to_string(),
                wgpu::BindingResource::TextureView(&texture.view),
            )];
            if let Some(s) = &texture.sampler {
                resources.push((sampler, wgpu::BindingResource::Sampler(s)));
            }
            Self::build(
                device,
                MeshKind::TexturedPhong,
                shader,
                attributes,
                index,
                &resources,
            )?
        };
        mesh.phong = phong;
        mesh.texture = Some(texture);
        Ok(mesh)
    }

    pub fn skybox(
        device: &wgpu::Device,
        shader: Rc<Shader>,
        cubemap: Rc<CubeMap>,
    ) -> Result<Self, GpuError> {
        let mut mesh = Self::build(
            device,
            MeshKind::Skybox,
            shader,
            &[Some(Attribute::vec3(&SKYBOX_POSITIONS))],
            None,
            &[
                (
                    uniforms::SKYBOX.to_string(),
                    wgpu::BindingResource::TextureView(&cubemap.view),
                ),
                (
                    uniforms::sampler_name(uniforms::SKYBOX),
                    wgpu::BindingResource::Sampler(&cubemap.sampler),
                ),
            ],
        )?;
        mesh.cubemap = Some(cubemap);
        Ok(mesh)
    }

    /// Full-screen quad sampling `frame`. Rebuild it when the frame is resized.
    pub fn screen(
        device: &wgpu::Device,
        shader: Rc<Shader>,
        frame: &FrameTexture,
    ) -> Result<Self, GpuError> {
        let mut resources = vec![(
            uniforms::SCREEN_TEXTURE.to_string(),
            wgpu::BindingResource::TextureView(&frame.color.view),
        )];
        if let Some(sampler) = &frame.color.sampler {
            resources.push((
                uniforms::sampler_name(uniforms::SCREEN_TEXTURE),
                wgpu::BindingResource::Sampler(sampler),
            ));
        }
        Self::build(
            device,
            MeshKind::Screen,
            shader,
            &[
                Some(Attribute::vec2(&SCREEN_POSITIONS)),
                Some(Attribute::vec2(&SCREEN_TEX_COORDS)),
            ],
            None,
            &resources,
        )
    }

    fn build(
        device: &wgpu::Device,
        kind: MeshKind,
        shader: Rc<Shader>,
        attributes: &[Option<Attribute>],
        index: Option<&[u32]>,
        resources: &[(String, wgpu::BindingResource<'_>)],
    ) -> Result<Self, GpuError> {
        let label = shader.label().to_string();
        for input in shader.vertex_inputs() {
            let found = attributes
                .get(input.location as usize)
                .and_then(Option::as_ref)
                .map(|a| a.components);
            if found != Some(input.components) {
                return Err(GpuError::MissingAttribute {
                    shader: label,
                    location: input.location,
                    expected: input.components,
                    found,
                });
            }
        }
        let vertex_array = VertexArray::new(device, &label, attributes, index)?;

        let mut uniforms = UniformSet::new(&shader, kind.uniform_names());
        for block in &mut uniforms.blocks {
            block.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{label} uniforms ({}, {})", block.group, block.binding)),
                size: block.data.len() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }

        let mut bind_groups = Vec::new();
        let mut group = 0;
        while let Some(layout) = shader.bind_group_layout(group) {
            let mut entries = Vec::new();
            for binding in shader.bindings().iter().filter(|b| b.group == group) {
                let resource = match binding.kind {
                    ResourceKind::Uniform { .. } => uniforms
                        .blocks
                        .iter()
                        .find(|b| b.group == binding.group && b.binding == binding.binding)
                        .and_then(|b| b.buffer.as_ref())
                        .map(|buffer| buffer.as_entire_binding()),
                    _ => resources
                        .iter()
                        .find(|(name, _)| *name == binding.name)
                        .map(|(_, resource)| resource.clone()),
                };
                let Some(resource) = resource else {
                    return Err(GpuError::UnboundResource {
                        shader: label,
                        name: binding.name.clone(),
                    });
                };
                entries.push(wgpu::BindGroupEntry {
                    binding: binding.binding,
                    resource,
                });
            }
            bind_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{label} bind group {group}")),
                layout,
                entries: &entries,
            }));
            group += 1;
        }

        if !shader.is_valid() {
            log::warn!("Mesh uses invalid shader {label} and will not be drawn");
        }
        Ok(Self {
            kind,
            shader,
            uniforms,
            bind_groups,
            vertex_array,
            phong: Phong::default(),
            texture: None,
            cubemap: None,
        })
    }

    pub fn kind(&self) -> MeshKind {
        self.kind
    }

    pub fn shader(&self) -> &Rc<Shader> {
        &self.shader
    }

    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    pub fn vertex_array(&self) -> &VertexArray {
        &self.vertex_array
    }
}

/// `view` with its translation dropped so the skybox stays centred on the eye.
pub fn rotation_only(view: &Matrix4<f32>) -> Matrix4<f32> {
    let rotation = Matrix3::from_cols(view.x.truncate(), view.y.truncate(), view.z.truncate());
    Matrix4::from(rotation)
}

impl Drawable for Mesh {
    fn draw(
        &mut self,
        frame: &Frame,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
        model: &Matrix4<f32>,
    ) {
        let identity = Matrix4::identity();
        let (projection, view, model) = match self.kind {
            MeshKind::Static | MeshKind::TexturedPhong => (*projection, *view, *model),
            MeshKind::Skybox => (*projection, rotation_only(view), identity),
            MeshKind::Screen => (identity, identity, identity),
        };
        let u = &mut self.uniforms;
        u.set_mat4(uniforms::PROJECTION, &projection);
        u.set_mat4(uniforms::VIEW, &view);
        u.set_mat4(uniforms::MODEL, &model);

        if self.kind == MeshKind::TexturedPhong {
            let phong = self.phong;
            u.set_vec3(uniforms::LIGHT_DIR, phong.light_dir);
            u.set_vec3(uniforms::K_A, phong.k_a);
            u.set_vec3(uniforms::K_D, phong.k_d);
            u.set_vec3(uniforms::K_S, phong.k_s);
            u.set_f32(uniforms::SHININESS, phong.s.max(0.001));
            u.set_vec3(uniforms::CAMERA_POSITION, frame.camera_position);
        }
    }

    fn write_to_buffers(&self, queue: &wgpu::Queue) {
        self.uniforms.write_to_buffers(queue);
    }

    fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(pipeline) = self.shader.pipeline() else {
            return;
        };
        pass.set_pipeline(pipeline);
        for (group, bind_group) in self.bind_groups.iter().enumerate() {
            pass.set_bind_group(group as u32, bind_group, &[]);
        }
        self.vertex_array.execute(pass);
    }

    fn release(&mut self) {
        self.vertex_array.release();
        self.uniforms.release();
        // Textures are shared between meshes; only the last holder destroys one.
        if let Some(texture) = self.texture.take().and_then(|t| Rc::try_unwrap(t).ok()) {
            texture.release();
        }
        if let Some(cubemap) = self.cubemap.take().and_then(|c| Rc::try_unwrap(c).ok()) {
            cubemap.release();
        }
    }
}
