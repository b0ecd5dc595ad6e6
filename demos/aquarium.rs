//! Reef aquarium: a skybox, a bobbing school of fish and a second school
//! swimming a keyframed loop, all presented through the post-process pass.
//!
//! Expects an asset tree like
//!
//! ```text
//! assets/
//!   skybox/   six images named after their side (right, left, up, ...)
//!   Fish/     one directory per fish, each holding an .obj with textures
//! ```
//!
//! Run with `cargo run --example aquarium [asset-root]`. Arrow keys turn the
//! whole reef, Space restarts the animations.

use std::{f32::consts::TAU, path::PathBuf, rc::Rc};

use cgmath::{Deg, Matrix4, Quaternion, Rotation3, Vector3};
use reef_viewer::{
    KeyCode,
    animation::{KeyFrameNode, ProceduralNode, RotationControlNode, TransformKeyFrames, procedural},
    camera::Trackball,
    context::{InitContext, ViewerConfig},
    data_structures::{
        mesh::Mesh,
        scene_graph::{Drawable, Node},
    },
    pipelines::bundled,
    resources::{ModelContext, find_named_model, load_cubemap, load_model},
    viewer::{self, Scene},
};

const SCHOOL_SIZE: usize = 10;

/// Spread `count` positions over the box between `lower` and `upper`.
///
/// Uses a low-discrepancy sequence so the school looks scattered but is the
/// same on every run.
fn school_positions(count: usize, lower: Vector3<f32>, upper: Vector3<f32>) -> Vec<Vector3<f32>> {
    const PHI: f32 = 1.618_034;
    (0..count)
        .map(|i| {
            let i = i as f32 + 1.0;
            let u = (i * PHI).fract();
            let v = (i * PHI * PHI).fract();
            let w = (i / count as f32 * TAU).sin() * 0.5 + 0.5;
            Vector3::new(
                lower.x + u * (upper.x - lower.x),
                lower.y + v * (upper.y - lower.y),
                lower.z + w * (upper.z - lower.z),
            )
        })
        .collect()
}

async fn school(
    ctx: &mut ModelContext<'_>,
    model: &std::path::Path,
    lower: Vector3<f32>,
    upper: Vector3<f32>,
    scale: f32,
) -> anyhow::Result<Vec<Box<dyn Drawable>>> {
    let mut fish: Vec<Box<dyn Drawable>> = Vec::with_capacity(SCHOOL_SIZE);
    for position in school_positions(SCHOOL_SIZE, lower, upper) {
        let transform = Matrix4::from_translation(position) * Matrix4::from_scale(scale);
        fish.push(Box::new(Node::with_children(
            transform,
            load_model(model, ctx).await?,
        )));
    }
    Ok(fish)
}

async fn build_scene(init: InitContext) -> anyhow::Result<Scene> {
    let InitContext {
        device,
        queue,
        format,
        asset_root,
        ..
    } = init;
    let mut scene = Scene::new(Trackball::new(12.0));
    let phong = scene.add_shader(bundled::phong(&device, format));
    let skybox_shader = scene.add_shader(bundled::skybox(&device, format));

    let cubemap = load_cubemap(&asset_root.join("skybox"), &device, &queue).await?;
    scene
        .root
        .add(Box::new(Mesh::skybox(&device, skybox_shader, Rc::new(cubemap))?));

    let fish_root = asset_root.join("Fish");
    let mut ctx = ModelContext::new(&device, &queue, phong, Vector3::new(0.0, -1.0, 0.0));

    let reef_fish = find_named_model(&fish_root, "ReefFish17")?;
    let mut bobbing = ProceduralNode::new(procedural::bob(1.0, 1.0));
    for fish in school(
        &mut ctx,
        &reef_fish,
        Vector3::new(-4.0, -2.0, -1.0),
        Vector3::new(0.0, 2.0, 1.0),
        0.5,
    )
    .await?
    {
        bobbing.add(fish);
    }

    let lionfish = find_named_model(&fish_root, "LionFish")?;
    let laps = TransformKeyFrames::new(
        [
            (0.0, Vector3::new(0.0, 0.0, 0.0)),
            (4.5, Vector3::new(0.0, 1.0, 0.0)),
            (9.0, Vector3::new(0.0, 0.0, 0.0)),
        ],
        [
            (0.0, Quaternion::from_angle_y(Deg(0.0))),
            (3.0, Quaternion::from_angle_y(Deg(120.0))),
            (6.0, Quaternion::from_angle_y(Deg(240.0))),
            (9.0, Quaternion::from_angle_y(Deg(360.0))),
        ],
        [(0.0, Vector3::new(1.0, 1.0, 1.0))],
    )?;
    let mut swimming = KeyFrameNode::new(laps);
    for fish in school(
        &mut ctx,
        &lionfish,
        Vector3::new(1.0, -2.0, -1.0),
        Vector3::new(5.0, 2.0, 1.0),
        0.5,
    )
    .await?
    {
        swimming.add(fish);
    }

    let mut reef = RotationControlNode::new(
        KeyCode::ArrowLeft,
        KeyCode::ArrowRight,
        Vector3::new(0.0, 1.0, 0.0),
        0.0,
    );
    reef.add(Box::new(bobbing));
    reef.add(Box::new(swimming));
    scene.root.add(Box::new(reef));
    Ok(scene)
}

fn main() -> anyhow::Result<()> {
    let asset_root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets"));
    let config = ViewerConfig {
        title: "Reef".to_string(),
        asset_root,
        post_process: true,
        ..Default::default()
    };
    viewer::run(config, Box::new(|init| Box::pin(build_scene(init))))
}
