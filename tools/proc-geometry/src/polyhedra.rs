//! Platonic solids with flat shading
//!
//! Each face gets its own vertices so normals stay faceted. Vertices are
//! projected onto the circumscribed sphere of the requested radius.

use glam::Vec3;
use tracing::warn;

use crate::types::MeshData;

const TETRAHEDRON_VERTICES: [[f32; 3]; 4] = [
    [1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0],
];

const TETRAHEDRON_FACES: [[u32; 3]; 4] = [[2, 1, 0], [0, 3, 2], [1, 3, 0], [2, 3, 1]];

const OCTAHEDRON_VERTICES: [[f32; 3]; 6] = [
    [1.0, 0.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];

const OCTAHEDRON_FACES: [[u32; 3]; 8] = [
    [0, 2, 4],
    [0, 4, 3],
    [0, 3, 5],
    [0, 5, 2],
    [1, 2, 5],
    [1, 5, 3],
    [1, 3, 4],
    [1, 4, 2],
];

// Pentagons are split into three triangles each
const DODECAHEDRON_FACES: [[u32; 3]; 36] = [
    [3, 11, 7],
    [3, 7, 15],
    [3, 15, 13],
    [7, 19, 17],
    [7, 17, 6],
    [7, 6, 15],
    [17, 4, 8],
    [17, 8, 10],
    [17, 10, 6],
    [8, 0, 16],
    [8, 16, 2],
    [8, 2, 10],
    [0, 12, 1],
    [0, 1, 18],
    [0, 18, 16],
    [6, 10, 2],
    [6, 2, 13],
    [6, 13, 15],
    [2, 16, 18],
    [2, 18, 3],
    [2, 3, 13],
    [18, 1, 9],
    [18, 9, 11],
    [18, 11, 3],
    [4, 14, 12],
    [4, 12, 0],
    [4, 0, 8],
    [11, 9, 5],
    [11, 5, 19],
    [11, 19, 7],
    [19, 5, 14],
    [19, 14, 4],
    [19, 4, 17],
    [1, 12, 14],
    [1, 14, 5],
    [1, 5, 9],
];

fn dodecahedron_vertices() -> [[f32; 3]; 20] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let r = 1.0 / t;
    [
        // (±1, ±1, ±1)
        [-1.0, -1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, 1.0, 1.0],
        [1.0, -1.0, -1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, -1.0],
        [1.0, 1.0, 1.0],
        // (0, ±1/φ, ±φ)
        [0.0, -r, -t],
        [0.0, -r, t],
        [0.0, r, -t],
        [0.0, r, t],
        // (±1/φ, ±φ, 0)
        [-r, -t, 0.0],
        [-r, t, 0.0],
        [r, -t, 0.0],
        [r, t, 0.0],
        // (±φ, 0, ±1/φ)
        [-t, 0.0, -r],
        [t, 0.0, -r],
        [-t, 0.0, r],
        [t, 0.0, r],
    ]
}

fn build(name: &str, radius: f32, vertices: &[[f32; 3]], faces: &[[u32; 3]]) -> MeshData {
    let radius = if radius <= 0.0 {
        warn!("{name}: radius must be > 0.0, clamping to 0.001");
        0.001
    } else {
        radius
    };

    let projected: Vec<Vec3> = vertices
        .iter()
        .map(|v| Vec3::from_array(*v).normalize() * radius)
        .collect();

    let mut mesh = MeshData::new();
    for face in faces {
        mesh.add_flat_triangle(
            projected[face[0] as usize],
            projected[face[1] as usize],
            projected[face[2] as usize],
            Vec3::ZERO,
        );
    }
    mesh
}

/// Generate a tetrahedron (4 faces, 12 vertices)
pub fn generate_tetrahedron(radius: f32) -> MeshData {
    build(
        "generate_tetrahedron",
        radius,
        &TETRAHEDRON_VERTICES,
        &TETRAHEDRON_FACES,
    )
}

/// Generate an octahedron (8 faces, 24 vertices)
pub fn generate_octahedron(radius: f32) -> MeshData {
    build(
        "generate_octahedron",
        radius,
        &OCTAHEDRON_VERTICES,
        &OCTAHEDRON_FACES,
    )
}

/// Generate a dodecahedron (12 pentagonal faces as 36 triangles)
pub fn generate_dodecahedron(radius: f32) -> MeshData {
    build(
        "generate_dodecahedron",
        radius,
        &dodecahedron_vertices(),
        &DODECAHEDRON_FACES,
    )
}
