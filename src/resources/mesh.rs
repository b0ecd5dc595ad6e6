//! CPU-side mesh data produced by the importers.

use cgmath::{InnerSpace, Vector3, Zero};

use crate::data_structures::mesh::Attribute;

/// Triangulated geometry ready to become a mesh's vertex array.
///
/// Attribute order matches the bundled shaders: position at location 0,
/// normal at 1, texture coordinates at 2.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

impl MeshData {
    /// Convert a `tobj` mesh loaded with `single_index`.
    ///
    /// V is flipped to wgpu's top-left texture origin. Missing texture
    /// coordinates become zeros and missing normals are regenerated.
    pub fn from_obj(name: &str, mesh: &tobj::Mesh) -> Self {
        let vertex_count = mesh.positions.len() / 3;
        let positions = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        let tex_coords = (0..vertex_count)
            .map(|i| {
                [
                    mesh.texcoords.get(i * 2).copied().unwrap_or(0.0),
                    1.0 - mesh.texcoords.get(i * 2 + 1).copied().unwrap_or(1.0),
                ]
            })
            .collect();
        let mut data = Self {
            name: name.to_string(),
            positions,
            normals: Vec::new(),
            tex_coords,
            indices: mesh.indices.clone(),
            material: mesh.material_id,
        };
        if mesh.normals.len() == mesh.positions.len() && !mesh.normals.is_empty() {
            data.normals = mesh
                .normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect();
        } else {
            data.normals = smooth_normals(&data.positions, &data.indices);
        }
        data
    }

    pub fn face_count(&self) -> usize {
        if self.indices.is_empty() {
            self.positions.len() / 3
        } else {
            self.indices.len() / 3
        }
    }

    pub fn attributes(&self) -> [Option<Attribute>; 3] {
        [
            Some(Attribute::vec3(&self.positions)),
            Some(Attribute::vec3(&self.normals)),
            Some(Attribute::vec2(&self.tex_coords)),
        ]
    }

    /// `None` when the geometry is a plain triangle list.
    pub fn index(&self) -> Option<&[u32]> {
        (!self.indices.is_empty()).then_some(self.indices.as_slice())
    }
}

/// Area-weighted vertex normals: every triangle adds its unnormalized face
/// normal to its three corners, and the sums are normalized at the end.
///
/// Without indices the positions are read as consecutive triangles.
pub fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut sums = vec![Vector3::<f32>::zero(); positions.len()];
    let sequential: Vec<u32>;
    let indices = if indices.is_empty() {
        sequential = (0..positions.len() as u32).collect();
        &sequential
    } else {
        indices
    };
    for face in indices.chunks_exact(3) {
        let [a, b, c] = [face[0] as usize, face[1] as usize, face[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            log::warn!("skipping face {face:?} with an out-of-range index");
            continue;
        }
        let (p0, p1, p2): (Vector3<f32>, Vector3<f32>, Vector3<f32>) =
            (positions[a].into(), positions[b].into(), positions[c].into());
        let normal = (p1 - p0).cross(p2 - p0);
        sums[a] += normal;
        sums[b] += normal;
        sums[c] += normal;
    }
    sums.into_iter()
        .map(|n| {
            if n.magnitude2() > 0.0 {
                n.normalize().into()
            } else {
                [0.0, 0.0, 0.0]
            }
        })
        .collect()
}
