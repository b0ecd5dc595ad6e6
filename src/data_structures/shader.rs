//! Shader programs: WGSL compilation, linking and uniform reflection.
//!
//! A [`Program`] is the CPU half: both stages parsed and validated with naga,
//! checked against each other, and reflected into vertex inputs and resource
//! bindings. A [`Shader`] is a program linked into a `wgpu::RenderPipeline`.
//!
//! Compile and link failures never escape [`Shader::new`]. They are logged
//! with the stage, the validator output and a line-numbered listing, and the
//! resulting shader is simply invalid.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use naga::{
    AddressSpace, Binding, ImageDimension, Module, ScalarKind, ShaderStage, TypeInner,
    valid::{Capabilities, ValidationFlags, Validator},
};
use thiserror::Error;

use crate::pipelines;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("compile failed for {stage} shader\n{log}\n{listing}")]
    Compile {
        stage: Stage,
        log: String,
        listing: String,
    },
    #[error("link failed\n{log}")]
    Link { log: String },
    #[error("could not read shader source {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Shader sources are either inline WGSL or the name of an existing file.
pub fn resolve_source(source: &str) -> Result<String, ShaderError> {
    let path = Path::new(source);
    if !source.contains('\n') && path.is_file() {
        std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })
    } else {
        Ok(source.to_string())
    }
}

/// Prefix every line with its 1-based number, the way the compile log shows it.
pub fn numbered_listing(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{:3}: {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Byte range of a uniform value inside a uniform buffer binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
    pub offset: u32,
    pub size: u32,
}

/// Bind slot of a texture or sampler global.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceSlot {
    pub group: u32,
    pub binding: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Uniform {
        size: u32,
        members: Vec<UniformMember>,
    },
    Texture {
        cube: bool,
    },
    Sampler,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalBinding {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub kind: ResourceKind,
}

/// A float vertex attribute the vertex stage reads at `location`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexInput {
    pub location: u32,
    pub components: u32,
}

impl VertexInput {
    pub fn format(&self) -> wgpu::VertexFormat {
        match self.components {
            1 => wgpu::VertexFormat::Float32,
            2 => wgpu::VertexFormat::Float32x2,
            3 => wgpu::VertexFormat::Float32x3,
            _ => wgpu::VertexFormat::Float32x4,
        }
    }

    pub fn stride(&self) -> wgpu::BufferAddress {
        (self.components as usize * std::mem::size_of::<f32>()) as wgpu::BufferAddress
    }
}

/// Scalar kind and component count of a stage input or output.
type IoType = (ScalarKind, u32);

/// A validated, linked pair of WGSL stages and everything reflected from them.
#[derive(Debug)]
pub struct Program {
    pub vertex_source: String,
    pub fragment_source: String,
    pub inputs: Vec<VertexInput>,
    pub bindings: Vec<GlobalBinding>,
}

impl Program {
    pub fn compile(vertex_source: &str, fragment_source: &str) -> Result<Self, ShaderError> {
        let vertex_source = resolve_source(vertex_source)?;
        let fragment_source = resolve_source(fragment_source)?;
        let vertex = compile_stage(&vertex_source, Stage::Vertex)?;
        let fragment = compile_stage(&fragment_source, Stage::Fragment)?;

        let mut log = Vec::new();
        let vertex_entry = find_entry(&vertex, ShaderStage::Vertex, VERTEX_ENTRY);
        let fragment_entry = find_entry(&fragment, ShaderStage::Fragment, FRAGMENT_ENTRY);
        if vertex_entry.is_none() {
            log.push(format!("vertex stage has no `{VERTEX_ENTRY}` entry point"));
        }
        if fragment_entry.is_none() {
            log.push(format!("fragment stage has no `{FRAGMENT_ENTRY}` entry point"));
        }
        let (Some(vertex_entry), Some(fragment_entry)) = (vertex_entry, fragment_entry) else {
            return Err(ShaderError::Link {
                log: log.join("\n"),
            });
        };

        let inputs = reflect_inputs(&vertex, vertex_entry, &mut log);
        for (expected, input) in inputs.iter().enumerate() {
            if input.location != expected as u32 {
                log.push(format!(
                    "vertex inputs must use contiguous locations from 0, found @location({}) at position {}",
                    input.location, expected
                ));
                break;
            }
        }

        let outputs = stage_outputs(&vertex, vertex_entry);
        for (location, ty) in stage_arguments(&fragment, fragment_entry) {
            match outputs.get(&location) {
                None => log.push(format!(
                    "fragment input @location({location}) is not written by the vertex stage"
                )),
                Some(produced) if *produced != ty => log.push(format!(
                    "fragment input @location({location}) is {:?}x{} but the vertex stage writes {:?}x{}",
                    ty.0, ty.1, produced.0, produced.1
                )),
                Some(_) => {}
            }
        }

        let bindings = merge_bindings(
            reflect_bindings(&vertex),
            reflect_bindings(&fragment),
            &mut log,
        );

        if !log.is_empty() {
            return Err(ShaderError::Link {
                log: log.join("\n"),
            });
        }
        Ok(Self {
            vertex_source,
            fragment_source,
            inputs,
            bindings,
        })
    }

    /// Resolve `"block.member"` or a whole `"block"` uniform variable.
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        let (block, member) = match name.split_once('.') {
            Some((block, member)) => (block, Some(member)),
            None => (name, None),
        };
        self.bindings.iter().find_map(|b| match &b.kind {
            ResourceKind::Uniform { size, members } if b.name == block => match member {
                None => Some(UniformLocation {
                    group: b.group,
                    binding: b.binding,
                    offset: 0,
                    size: *size,
                }),
                Some(member) => members.iter().find(|m| m.name == member).map(|m| {
                    UniformLocation {
                        group: b.group,
                        binding: b.binding,
                        offset: m.offset,
                        size: m.size,
                    }
                }),
            },
            _ => None,
        })
    }

    pub fn resource_slot(&self, name: &str) -> Option<ResourceSlot> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .map(|b| ResourceSlot {
                group: b.group,
                binding: b.binding,
            })
    }

    /// `(group, binding, size)` of every uniform buffer.
    pub fn uniform_buffers(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        self.bindings.iter().filter_map(|b| match b.kind {
            ResourceKind::Uniform { size, .. } => Some((b.group, b.binding, size)),
            _ => None,
        })
    }

    pub fn group_count(&self) -> u32 {
        self.bindings
            .iter()
            .map(|b| b.group + 1)
            .max()
            .unwrap_or(0)
    }
}

fn compile_stage(source: &str, stage: Stage) -> Result<Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        log: e.emit_to_string(source),
        listing: numbered_listing(source),
    })?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| ShaderError::Compile {
            stage,
            log: e.emit_to_string(source),
            listing: numbered_listing(source),
        })?;
    Ok(module)
}

fn find_entry<'m>(
    module: &'m Module,
    stage: ShaderStage,
    name: &str,
) -> Option<&'m naga::EntryPoint> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage && ep.name == name)
}

fn io_type(module: &Module, ty: naga::Handle<naga::Type>) -> Option<IoType> {
    match module.types[ty].inner {
        TypeInner::Scalar(scalar) => Some((scalar.kind, 1)),
        TypeInner::Vector { size, scalar } => Some((scalar.kind, size as u32)),
        _ => None,
    }
}

/// Location-bound values of a type that is either bound directly or a
/// struct whose members carry the bindings.
fn located(
    module: &Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&Binding>,
) -> Vec<(u32, IoType)> {
    match binding {
        Some(Binding::Location { location, .. }) => io_type(module, ty)
            .map(|io| vec![(*location, io)])
            .unwrap_or_default(),
        Some(Binding::BuiltIn(_)) => Vec::new(),
        None => match &module.types[ty].inner {
            TypeInner::Struct { members, .. } => members
                .iter()
                .flat_map(|m| located(module, m.ty, m.binding.as_ref()))
                .collect(),
            _ => Vec::new(),
        },
    }
}

fn stage_arguments(module: &Module, entry: &naga::EntryPoint) -> BTreeMap<u32, IoType> {
    entry
        .function
        .arguments
        .iter()
        .flat_map(|arg| located(module, arg.ty, arg.binding.as_ref()))
        .collect()
}

fn stage_outputs(module: &Module, entry: &naga::EntryPoint) -> BTreeMap<u32, IoType> {
    entry
        .function
        .result
        .iter()
        .flat_map(|result| located(module, result.ty, result.binding.as_ref()))
        .collect()
}

fn reflect_inputs(
    module: &Module,
    entry: &naga::EntryPoint,
    log: &mut Vec<String>,
) -> Vec<VertexInput> {
    stage_arguments(module, entry)
        .into_iter()
        .filter_map(|(location, (kind, components))| {
            if kind == ScalarKind::Float {
                Some(VertexInput {
                    location,
                    components,
                })
            } else {
                log.push(format!(
                    "vertex input @location({location}) has unsupported kind {kind:?}"
                ));
                None
            }
        })
        .collect()
}

fn reflect_bindings(module: &Module) -> Vec<GlobalBinding> {
    let ctx = module.to_ctx();
    module
        .global_variables
        .iter()
        .filter_map(|(_, var)| {
            let binding = var.binding.as_ref()?;
            let name = var.name.clone().unwrap_or_default();
            let inner = &module.types[var.ty].inner;
            let kind = match (var.space, inner) {
                (AddressSpace::Uniform, TypeInner::Struct { members, span }) => {
                    ResourceKind::Uniform {
                        size: *span,
                        members: members
                            .iter()
                            .filter_map(|m| {
                                Some(UniformMember {
                                    name: m.name.clone()?,
                                    offset: m.offset,
                                    size: module.types[m.ty].inner.size(ctx),
                                })
                            })
                            .collect(),
                    }
                }
                (AddressSpace::Uniform, other) => ResourceKind::Uniform {
                    size: other.size(ctx),
                    members: Vec::new(),
                },
                (AddressSpace::Handle, TypeInner::Image { dim, .. }) => ResourceKind::Texture {
                    cube: *dim == ImageDimension::Cube,
                },
                (AddressSpace::Handle, TypeInner::Sampler { .. }) => ResourceKind::Sampler,
                _ => {
                    log::warn!("ignoring unsupported shader global `{name}`");
                    return None;
                }
            };
            Some(GlobalBinding {
                name,
                group: binding.group,
                binding: binding.binding,
                kind,
            })
        })
        .collect()
}

fn merge_bindings(
    vertex: Vec<GlobalBinding>,
    fragment: Vec<GlobalBinding>,
    log: &mut Vec<String>,
) -> Vec<GlobalBinding> {
    let mut merged: BTreeMap<(u32, u32), GlobalBinding> = BTreeMap::new();
    for (stage, binding) in vertex
        .into_iter()
        .map(|b| (Stage::Vertex, b))
        .chain(fragment.into_iter().map(|b| (Stage::Fragment, b)))
    {
        let key = (binding.group, binding.binding);
        match merged.get(&key) {
            Some(existing) if *existing != binding => log.push(format!(
                "binding ({}, {}) is `{}` in one stage but `{}` in the {} stage",
                key.0, key.1, existing.name, binding.name, stage
            )),
            Some(_) => {}
            None => {
                merged.insert(key, binding);
            }
        }
    }
    merged.into_values().collect()
}

/// Fixed-function state that GL kept globally and wgpu bakes into the pipeline.
#[derive(Clone, Debug)]
pub struct ShaderTarget {
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub depth_compare: wgpu::CompareFunction,
    pub depth_write: bool,
    pub cull_mode: Option<wgpu::Face>,
    pub blend: Option<wgpu::BlendState>,
}

impl ShaderTarget {
    pub fn scene(color_format: wgpu::TextureFormat) -> Self {
        Self {
            color_format,
            depth_format: Some(crate::data_structures::texture::Texture::DEPTH_FORMAT),
            depth_compare: wgpu::CompareFunction::Less,
            depth_write: true,
            cull_mode: Some(wgpu::Face::Back),
            blend: Some(wgpu::BlendState::REPLACE),
        }
    }

    /// Drawn at the far plane behind everything else.
    pub fn skybox(color_format: wgpu::TextureFormat) -> Self {
        Self {
            depth_compare: wgpu::CompareFunction::LessEqual,
            depth_write: false,
            cull_mode: None,
            ..Self::scene(color_format)
        }
    }

    /// Full-screen quad of the post-process pass.
    pub fn screen(color_format: wgpu::TextureFormat) -> Self {
        Self {
            depth_format: None,
            depth_compare: wgpu::CompareFunction::Always,
            depth_write: false,
            cull_mode: None,
            ..Self::scene(color_format)
        }
    }
}

/// A linked shader program.
///
/// Immutable once built. An invalid shader (failed compile or link) keeps
/// its label for diagnostics and answers every lookup with `None`.
#[derive(Debug)]
pub struct Shader {
    label: String,
    program: Option<Program>,
    bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    pipeline: Option<wgpu::RenderPipeline>,
}

impl Shader {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
        target: &ShaderTarget,
    ) -> Self {
        match Program::compile(vertex_source, fragment_source) {
            Ok(program) => {
                let bind_group_layouts = pipelines::mk_bind_group_layouts(device, label, &program);
                let pipeline = pipelines::mk_render_pipeline(
                    device,
                    label,
                    &program,
                    &bind_group_layouts,
                    target,
                );
                log::debug!(
                    "Linked shader {} ({} inputs, {} bindings)",
                    label,
                    program.inputs.len(),
                    program.bindings.len()
                );
                Self {
                    label: label.to_string(),
                    program: Some(program),
                    bind_group_layouts,
                    pipeline: Some(pipeline),
                }
            }
            Err(e) => {
                log::error!("Shader {label}: {e}");
                Self::invalid(label)
            }
        }
    }

    pub fn invalid(label: &str) -> Self {
        Self {
            label: label.to_string(),
            program: None,
            bind_group_layouts: Vec::new(),
            pipeline: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_valid(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn pipeline(&self) -> Option<&wgpu::RenderPipeline> {
        self.pipeline.as_ref()
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.program.as_ref()?.uniform_location(name)
    }

    pub fn resource_slot(&self, name: &str) -> Option<ResourceSlot> {
        self.program.as_ref()?.resource_slot(name)
    }

    pub fn uniform_buffers(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        self.program.iter().flat_map(|p| p.uniform_buffers())
    }

    pub fn vertex_inputs(&self) -> &[VertexInput] {
        self.program.as_ref().map_or(&[], |p| p.inputs.as_slice())
    }

    pub fn bindings(&self) -> &[GlobalBinding] {
        self.program.as_ref().map_or(&[], |p| p.bindings.as_slice())
    }

    pub fn bind_group_layout(&self, group: u32) -> Option<&wgpu::BindGroupLayout> {
        self.bind_group_layouts.get(group as usize)
    }

    /// Drop the pipeline. Safe to call repeatedly and on invalid shaders.
    pub fn release(&mut self) {
        if self.pipeline.take().is_some() {
            log::debug!("Released shader {}", self.label);
        }
        self.bind_group_layouts.clear();
        self.program = None;
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.release();
    }
}
