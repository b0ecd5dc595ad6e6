use std::io::Write;

use reef_viewer::{
    data_structures::{
        shader::{
            Program, ResourceKind, ResourceSlot, ShaderError, Stage, UniformLocation, VertexInput,
            numbered_listing, resolve_source,
        },
        uniforms,
    },
    pipelines::bundled,
};

const VERTEX: &str = r#"
struct Mvp {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
}

@group(0) @binding(0)
var<uniform> mvp: Mvp;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.color = color;
    out.clip_position = mvp.projection * mvp.view * mvp.model * vec4<f32>(position, 1.0);
    return out;
}
"#;

const FRAGMENT: &str = r#"
@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0);
}
"#;

#[test]
fn reflects_vertex_inputs_and_uniform_members() {
    let program = Program::compile(VERTEX, FRAGMENT).unwrap();
    assert_eq!(
        program.inputs,
        vec![
            VertexInput {
                location: 0,
                components: 3
            },
            VertexInput {
                location: 1,
                components: 3
            },
        ]
    );
    assert_eq!(
        program.uniform_location(uniforms::VIEW),
        Some(UniformLocation {
            group: 0,
            binding: 0,
            offset: 64,
            size: 64
        })
    );
    assert_eq!(
        program.uniform_location("mvp"),
        Some(UniformLocation {
            group: 0,
            binding: 0,
            offset: 0,
            size: 192
        })
    );
    assert_eq!(program.uniform_location("mvp.nothing"), None);
    assert_eq!(program.uniform_location(uniforms::SHININESS), None);
    assert_eq!(program.uniform_buffers().collect::<Vec<_>>(), [(0, 0, 192)]);
    assert_eq!(program.group_count(), 1);
}

#[test]
fn syntax_errors_report_the_stage_and_a_numbered_listing() {
    let broken = "@vertex\nfn vs_main( -> {\n";
    match Program::compile(broken, FRAGMENT) {
        Err(ShaderError::Compile {
            stage,
            log,
            listing,
        }) => {
            assert_eq!(stage, Stage::Vertex);
            assert!(!log.is_empty());
            assert_eq!(listing, "  1: @vertex\n  2: fn vs_main( -> {");
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
fn fragment_errors_name_the_fragment_stage() {
    let broken = "@fragment\nfn fs_main() -> @location(0) vec4<f32> { return undefined_name; }\n";
    assert!(matches!(
        Program::compile(VERTEX, broken),
        Err(ShaderError::Compile {
            stage: Stage::Fragment,
            ..
        })
    ));
}

#[test]
fn missing_entry_point_fails_to_link() {
    let renamed = FRAGMENT.replace("fs_main", "main");
    match Program::compile(VERTEX, &renamed) {
        Err(ShaderError::Link { log }) => assert!(log.contains("fs_main"), "{log}"),
        other => panic!("expected a link error, got {other:?}"),
    }
}

#[test]
fn fragment_input_without_a_vertex_output_fails_to_link() {
    let fragment = r#"
@fragment
fn fs_main(@location(3) shade: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(shade, 1.0);
}
"#;
    match Program::compile(VERTEX, fragment) {
        Err(ShaderError::Link { log }) => assert!(log.contains("@location(3)"), "{log}"),
        other => panic!("expected a link error, got {other:?}"),
    }
}

#[test]
fn mismatched_interface_types_fail_to_link() {
    let fragment = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;
    assert!(matches!(
        Program::compile(VERTEX, fragment),
        Err(ShaderError::Link { .. })
    ));
}

#[test]
fn conflicting_bindings_fail_to_link() {
    let fragment = r#"
struct Other {
    tint: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> other: Other;

@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0) * other.tint;
}
"#;
    match Program::compile(VERTEX, fragment) {
        Err(ShaderError::Link { log }) => assert!(log.contains("(0, 0)"), "{log}"),
        other => panic!("expected a link error, got {other:?}"),
    }
}

#[test]
fn gaps_in_vertex_locations_fail_to_link() {
    let vertex = VERTEX.replace("@location(1) color", "@location(2) color");
    assert!(matches!(
        Program::compile(&vertex, FRAGMENT),
        Err(ShaderError::Link { .. })
    ));
}

#[test]
fn bundled_phong_exposes_the_uniform_contract() {
    let program = Program::compile(bundled::PHONG_VERT, bundled::PHONG_FRAG).unwrap();
    assert_eq!(program.inputs.len(), 3);
    assert_eq!(program.inputs[2].components, 2);
    for name in [
        uniforms::MODEL,
        uniforms::VIEW,
        uniforms::PROJECTION,
        uniforms::SHININESS,
        uniforms::LIGHT_DIR,
        uniforms::K_A,
        uniforms::K_D,
        uniforms::K_S,
        uniforms::CAMERA_POSITION,
    ] {
        assert!(program.uniform_location(name).is_some(), "{name} missing");
    }
    assert_eq!(
        program.uniform_location(uniforms::K_D).map(|l| (l.offset, l.size)),
        Some((32, 12))
    );
    assert_eq!(
        program.resource_slot(uniforms::DIFFUSE_MAP),
        Some(ResourceSlot {
            group: 2,
            binding: 0
        })
    );
    assert!(
        program
            .resource_slot(&uniforms::sampler_name(uniforms::DIFFUSE_MAP))
            .is_some()
    );
    assert_eq!(program.group_count(), 3);
}

#[test]
fn bundled_skybox_samples_a_cube_texture() {
    let program = Program::compile(bundled::SKYBOX_VERT, bundled::SKYBOX_FRAG).unwrap();
    let skybox = program
        .bindings
        .iter()
        .find(|b| b.name == uniforms::SKYBOX)
        .unwrap();
    assert_eq!(skybox.kind, ResourceKind::Texture { cube: true });
    assert!(program.uniform_location(uniforms::MODEL).is_some());
}

#[test]
fn bundled_screen_and_color_shaders_link() {
    let screen = Program::compile(bundled::SCREEN_VERT, bundled::SCREEN_FRAG).unwrap();
    assert_eq!(screen.inputs.len(), 2);
    assert_eq!(screen.uniform_buffers().count(), 0);
    assert!(screen.resource_slot(uniforms::SCREEN_TEXTURE).is_some());

    let color = Program::compile(bundled::COLOR_VERT, bundled::COLOR_FRAG).unwrap();
    assert_eq!(color.inputs.len(), 2);
}

#[test]
fn sources_may_be_file_paths() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FRAGMENT.as_bytes()).unwrap();
    let path = file.path().to_str().unwrap().to_string();

    assert_eq!(resolve_source(&path).unwrap(), FRAGMENT);
    assert_eq!(resolve_source(FRAGMENT).unwrap(), FRAGMENT);
    assert!(Program::compile(VERTEX, &path).is_ok());
}

#[test]
fn listing_numbers_every_line() {
    assert_eq!(numbered_listing("a\nb"), "  1: a\n  2: b");
}
