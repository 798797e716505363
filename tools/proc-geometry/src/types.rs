//! Procedural mesh types
//!
//! Shared types for procedural mesh generation.

use glam::{Vec2, Vec3};

/// Vertex with position, normal and UV coordinates
#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Generated mesh data (unpacked, one entry per vertex attribute)
///
/// Indices are `u32` so large tessellations never need splitting; writers
/// narrow them to the smallest component type that fits.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create empty mesh data
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(vertex.position.to_array());
        self.normals.push(vertex.normal.to_array());
        self.uvs.push(vertex.uv.to_array());
        index
    }

    /// Add a triangle (3 vertex indices)
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Add a flat-shaded triangle with its own three vertices.
    ///
    /// The winding is flipped when needed so the face normal points away
    /// from `interior`.
    pub fn add_flat_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, interior: Vec3) {
        let mut normal = (b - a).cross(c - a).normalize_or_zero();
        let (b, c) = if normal.dot((a + b + c) / 3.0 - interior) < 0.0 {
            normal = -normal;
            (c, b)
        } else {
            (b, c)
        };

        let i0 = self.add_vertex(Vertex::new(a, normal, spherical_uv(a)));
        let i1 = self.add_vertex(Vertex::new(b, normal, spherical_uv(b)));
        let i2 = self.add_vertex(Vertex::new(c, normal, spherical_uv(c)));
        self.add_triangle(i0, i1, i2);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Equirectangular UV for a point, used by shapes without a natural parameterization
pub(crate) fn spherical_uv(p: Vec3) -> Vec2 {
    let dir = p.normalize_or_zero();
    let u = dir.z.atan2(dir.x) / (2.0 * std::f32::consts::PI) + 0.5;
    let v = dir.y.clamp(-1.0, 1.0).asin() / std::f32::consts::PI + 0.5;
    Vec2::new(u, v)
}
