//! Merge vertices whose attributes agree within a tolerance
//!
//! Every primitive comes out indexed. Triangles that collapse onto fewer
//! than three distinct vertices are dropped.

use super::compact_vertices;
use crate::document::{Document, Primitive};
use std::collections::HashMap;
use tracing::debug;

fn vertex_key(primitive: &Primitive, vertex: usize, tolerance: f32) -> Vec<i64> {
    let snap = |v: f32| (v / tolerance).round() as i64;

    let mut key: Vec<i64> = primitive.positions[vertex].iter().copied().map(snap).collect();
    if let Some(normals) = &primitive.normals {
        key.extend(normals[vertex].iter().copied().map(snap));
    }
    if let Some(uvs) = &primitive.uvs {
        key.extend(uvs[vertex].iter().copied().map(snap));
    }
    if let Some(colors) = &primitive.colors {
        key.extend(colors[vertex].iter().copied().map(snap));
    }
    key
}

fn weld_primitive(primitive: &mut Primitive, tolerance: f32) {
    let mut canonical: HashMap<Vec<i64>, u32> = HashMap::new();
    let remap: Vec<u32> = (0..primitive.vertex_count())
        .map(|v| *canonical.entry(vertex_key(primitive, v, tolerance)).or_insert(v as u32))
        .collect();

    let indices: Vec<u32> = primitive
        .triangle_indices()
        .chunks_exact(3)
        .map(|tri| [remap[tri[0] as usize], remap[tri[1] as usize], remap[tri[2] as usize]])
        .filter(|[a, b, c]| a != b && b != c && a != c)
        .flatten()
        .collect();

    compact_vertices(primitive, indices);
}

pub fn weld(document: &mut Document, tolerance: f32) {
    let before = document.vertex_count();
    for primitive in document.meshes.iter_mut().flat_map(|m| &mut m.primitives) {
        weld_primitive(primitive, tolerance);
    }
    debug!("Weld: {} -> {} vertices", before, document.vertex_count());
}
