//! glTF import: node hierarchy, meshes, base colour textures and TRS animation.

use std::{collections::HashMap, path::Path, rc::Rc};

use cgmath::{Matrix4, Quaternion, Vector3};

use crate::{
    animation::{KeyFrameNode, TransformKeyFrames},
    data_structures::{
        mesh::Phong,
        scene_graph::{Drawable, Node},
        texture::Texture,
    },
    resources::{ModelContext, find_texture, load_binary, mesh::MeshData, mesh::smooth_normals},
};

/// Animation channels that target one node. Missing channels hold the
/// node's rest pose.
#[derive(Default)]
struct Channels {
    translation: Option<Vec<(f32, Vector3<f32>)>>,
    rotation: Option<Vec<(f32, Quaternion<f32>)>>,
    scale: Option<Vec<(f32, Vector3<f32>)>>,
}

#[derive(Default)]
struct Counts {
    meshes: usize,
    faces: usize,
}

fn quaternion([x, y, z, w]: [f32; 4]) -> Quaternion<f32> {
    Quaternion::new(w, x, y, z)
}

pub async fn load_model_gltf(
    path: &Path,
    ctx: &mut ModelContext<'_>,
) -> anyhow::Result<Vec<Box<dyn Drawable>>> {
    let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let gltf = gltf::Gltf::from_slice(&load_binary(path).await?)?;

    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("binary chunk missing"))?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                anyhow::bail!("embedded buffer data URIs are not supported")
            }
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_binary(&dir.join(uri)).await?);
            }
        }
    }

    let mut channels: HashMap<usize, Channels> = HashMap::new();
    for animation in gltf.animations() {
        for channel in animation.channels() {
            let reader = channel.reader(|b| buffer_data.get(b.index()).map(Vec::as_slice));
            let Some(times) = reader.read_inputs().map(|inputs| inputs.collect::<Vec<f32>>())
            else {
                log::warn!("animation channel {} has no key times", channel.index());
                continue;
            };
            let entry = channels.entry(channel.target().node().index()).or_default();
            match reader.read_outputs() {
                Some(gltf::animation::util::ReadOutputs::Translations(values)) => {
                    entry.translation = Some(times.iter().copied().zip(values.map(Vector3::from)).collect());
                }
                Some(gltf::animation::util::ReadOutputs::Rotations(values)) => {
                    entry.rotation = Some(
                        times
                            .iter()
                            .copied()
                            .zip(values.into_f32().map(quaternion))
                            .collect(),
                    );
                }
                Some(gltf::animation::util::ReadOutputs::Scales(values)) => {
                    entry.scale = Some(times.iter().copied().zip(values.map(Vector3::from)).collect());
                }
                Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) => {
                    log::warn!("morph target animation is not supported");
                }
                None => log::warn!("animation channel {} has no values", channel.index()),
            }
        }
    }

    // Material index -> base colour texture and factor.
    let mut materials: Vec<(Rc<Texture>, [f32; 4])> = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let texture = match pbr.base_color_texture().map(|info| info.texture().source().source()) {
            Some(gltf::image::Source::View { view, .. }) => {
                let start = view.offset();
                let bytes = buffer_data
                    .get(view.buffer().index())
                    .and_then(|b| b.get(start..start + view.length()))
                    .ok_or_else(|| anyhow::anyhow!("image view out of range"))?;
                let label = format!("{} material {}", path.display(), material.index().unwrap_or(0));
                Rc::new(Texture::from_bytes(ctx.device, ctx.queue, bytes, &label)?)
            }
            Some(gltf::image::Source::Uri { uri, .. }) => {
                ctx.texture(&find_texture(&dir, uri)?).await?
            }
            None => ctx.white(),
        };
        materials.push((texture, pbr.base_color_factor()));
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| anyhow::anyhow!("file contains no scene"))?;
    let mut counts = Counts::default();
    let mut roots = Vec::new();
    for node in scene.nodes() {
        roots.push(build_node(
            &node,
            ctx,
            &buffer_data,
            &materials,
            &channels,
            &mut counts,
        )?);
    }
    log::info!(
        "Loaded {} ({} meshes, {} faces)",
        path.display(),
        counts.meshes,
        counts.faces
    );
    Ok(roots)
}

fn build_node(
    node: &gltf::Node<'_>,
    ctx: &mut ModelContext<'_>,
    buffers: &[Vec<u8>],
    materials: &[(Rc<Texture>, [f32; 4])],
    channels: &HashMap<usize, Channels>,
    counts: &mut Counts,
) -> anyhow::Result<Box<dyn Drawable>> {
    let mut children: Vec<Box<dyn Drawable>> = Vec::new();
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|b| buffers.get(b.index()).map(Vec::as_slice));
            let Some(positions) = reader.read_positions() else {
                log::warn!("primitive {} of mesh {} has no positions", primitive.index(), mesh.index());
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|i| i.into_u32().collect())
                .unwrap_or_default();
            let normals = reader
                .read_normals()
                .map(|n| n.collect::<Vec<_>>())
                .filter(|n| n.len() == positions.len())
                .unwrap_or_else(|| smooth_normals(&positions, &indices));
            let tex_coords = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().collect::<Vec<_>>())
                .filter(|t| t.len() == positions.len())
                .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);
            let data = MeshData {
                name: mesh.name().unwrap_or("mesh").to_string(),
                positions,
                normals,
                tex_coords,
                indices,
                material: primitive.material().index(),
            };
            let (texture, factor) = match data.material.and_then(|i| materials.get(i)) {
                Some((texture, factor)) => (texture.clone(), *factor),
                None => (ctx.white(), [1.0, 1.0, 1.0, 1.0]),
            };
            let phong = Phong {
                light_dir: ctx.light_dir,
                k_d: Vector3::new(factor[0], factor[1], factor[2]),
                ..Phong::default()
            };
            counts.meshes += 1;
            counts.faces += data.face_count();
            children.push(Box::new(ctx.mesh(&data, texture, phong)?));
        }
    }
    for child in node.children() {
        children.push(build_node(&child, ctx, buffers, materials, channels, counts)?);
    }

    let drawable: Box<dyn Drawable> = match channels.get(&node.index()) {
        Some(animated) => {
            let (t, r, s) = node.transform().decomposed();
            let keyframes = TransformKeyFrames::new(
                animated.translation.clone().unwrap_or_else(|| vec![(0.0, t.into())]),
                animated.rotation.clone().unwrap_or_else(|| vec![(0.0, quaternion(r))]),
                animated.scale.clone().unwrap_or_else(|| vec![(0.0, s.into())]),
            )?;
            let mut keyframe_node = KeyFrameNode::new(keyframes);
            keyframe_node.node.add_all(children);
            Box::new(keyframe_node)
        }
        None => Box::new(Node::with_children(
            Matrix4::from(node.transform().matrix()),
            children,
        )),
    };
    Ok(drawable)
}
