//! Parametric mesh generation
//!
//! Generators return unpacked [`MeshData`] (positions, normals, UVs and
//! `u32` indices) with counter-clockwise front faces.

mod extrude;
mod polyhedra;
mod primitives;
mod tube;
mod types;

pub use extrude::{ExtrudeSettings, generate_extrusion, regular_polygon};
pub use polyhedra::{generate_dodecahedron, generate_octahedron, generate_tetrahedron};
pub use primitives::{generate_box, generate_sphere, generate_torus, generate_torus_knot};
pub use tube::generate_tube;
pub use types::{MeshData, Vertex};
