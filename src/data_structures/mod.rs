//! Viewer data structures: GPU resource wrappers and the scene graph.
//!
//! - `shader` compiles, links and reflects WGSL programs
//! - `mesh` holds vertex arrays and the mesh leaves of the scene graph
//! - `texture` contains 2D textures, cube maps and offscreen frame targets
//! - `uniforms` defines the shared uniform names and CPU uniform blocks
//! - `scene_graph` enables hierarchical scene organization

pub mod mesh;
pub mod scene_graph;
pub mod shader;
pub mod texture;
pub mod uniforms;
