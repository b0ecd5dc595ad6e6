use crate::data_structures::shader::{
    FRAGMENT_ENTRY, Program, ResourceKind, ShaderTarget, VERTEX_ENTRY,
};

/// One bind group layout per group index the program uses, gaps included.
///
/// Every binding is visible to both stages so that a global used by only one
/// of them still matches the bind groups meshes create from the reflection.
pub fn mk_bind_group_layouts(
    device: &wgpu::Device,
    label: &str,
    program: &Program,
) -> Vec<wgpu::BindGroupLayout> {
    (0..program.group_count())
        .map(|group| {
            let entries: Vec<wgpu::BindGroupLayoutEntry> = program
                .bindings
                .iter()
                .filter(|b| b.group == group)
                .map(|b| wgpu::BindGroupLayoutEntry {
                    binding: b.binding,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: match b.kind {
                        ResourceKind::Uniform { .. } => wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        ResourceKind::Texture { cube } => wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: if cube {
                                wgpu::TextureViewDimension::Cube
                            } else {
                                wgpu::TextureViewDimension::D2
                            },
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        ResourceKind::Sampler => {
                            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                        }
                    },
                    count: None,
                })
                .collect();
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label} group {group}")),
                entries: &entries,
            })
        })
        .collect()
}

/// Link a compiled program into a render pipeline.
///
/// Vertex slot `n` carries the single attribute at `@location(n)`.
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    program: &Program,
    bind_group_layouts: &[wgpu::BindGroupLayout],
    target: &ShaderTarget,
) -> wgpu::RenderPipeline {
    let layouts: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &layouts,
        push_constant_ranges: &[],
    });

    let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{label} vertex")),
        source: wgpu::ShaderSource::Wgsl(program.vertex_source.as_str().into()),
    });
    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{label} fragment")),
        source: wgpu::ShaderSource::Wgsl(program.fragment_source.as_str().into()),
    });

    let attributes: Vec<[wgpu::VertexAttribute; 1]> = program
        .inputs
        .iter()
        .map(|input| {
            [wgpu::VertexAttribute {
                format: input.format(),
                offset: 0,
                shader_location: input.location,
            }]
        })
        .collect();
    let vertex_layouts: Vec<wgpu::VertexBufferLayout> = program
        .inputs
        .iter()
        .zip(&attributes)
        .map(|(input, attributes)| wgpu::VertexBufferLayout {
            array_stride: input.stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        })
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(&render_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: Some(VERTEX_ENTRY),
            buffers: &vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some(FRAGMENT_ENTRY),
            targets: &[Some(wgpu::ColorTargetState {
                format: target.color_format,
                blend: target.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: target.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: target.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: target.depth_write,
            depth_compare: target.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
