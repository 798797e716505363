//! Vertex-clustering simplification
//!
//! Vertices are snapped to a uniform grid and each occupied cell collapses
//! to one vertex. The cell size is found by a geometric bisection between a
//! fine and a coarse bound so the triangle count lands at or under the
//! target with as much detail as possible.

use super::compact_vertices;
use crate::document::{Document, Primitive};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const SEARCH_STEPS: usize = 24;

/// Finest cell size tried, as a fraction of the primitive's extent
const FINEST_CELL: f32 = 1.0 / 4096.0;

struct Clustering {
    /// Cluster id per source vertex
    cluster_of: Vec<u32>,
    cluster_count: usize,
    /// Surviving triangles in cluster ids
    triangles: Vec<[u32; 3]>,
}

fn cluster(primitive: &Primitive, indices: &[u32], min: [f32; 3], cell: f32) -> Clustering {
    let mut cells: HashMap<[i64; 3], u32> = HashMap::new();
    let cluster_of: Vec<u32> = primitive
        .positions
        .iter()
        .map(|p| {
            let key = [0, 1, 2].map(|axis| ((p[axis] - min[axis]) / cell).floor() as i64);
            let next = cells.len() as u32;
            *cells.entry(key).or_insert(next)
        })
        .collect();

    let mut seen = HashSet::new();
    let triangles = indices
        .chunks_exact(3)
        .map(|tri| [0, 1, 2].map(|k| cluster_of[tri[k] as usize]))
        .filter(|[a, b, c]| a != b && b != c && a != c)
        .filter(|tri| {
            let mut key = *tri;
            key.sort_unstable();
            seen.insert(key)
        })
        .collect();

    Clustering {
        cluster_of,
        cluster_count: cells.len(),
        triangles,
    }
}

fn bounds(positions: &[[f32; 3]]) -> ([f32; 3], f32) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for p in positions {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    let extent = (0..3).map(|a| max[a] - min[a]).fold(0.0, f32::max);
    (min, extent)
}

/// Rebuild the primitive from a clustering: positions and normals are
/// averaged per cluster, other attributes come from the first member.
fn collapse(primitive: &mut Primitive, clustering: Clustering) {
    let n = clustering.cluster_count;
    let mut first = vec![u32::MAX; n];
    let mut members = vec![0u32; n];
    let mut position_sum = vec![[0.0f32; 3]; n];
    let mut normal_sum = vec![[0.0f32; 3]; n];

    for (vertex, &c) in clustering.cluster_of.iter().enumerate() {
        let c = c as usize;
        if first[c] == u32::MAX {
            first[c] = vertex as u32;
        }
        members[c] += 1;
        for axis in 0..3 {
            position_sum[c][axis] += primitive.positions[vertex][axis];
        }
        if let Some(normals) = &primitive.normals {
            for axis in 0..3 {
                normal_sum[c][axis] += normals[vertex][axis];
            }
        }
    }

    primitive.gather_vertices(&first);
    for c in 0..n {
        let count = members[c] as f32;
        primitive.positions[c] = position_sum[c].map(|v| v / count);
        if let Some(normals) = &mut primitive.normals {
            let [x, y, z] = normal_sum[c];
            let length = (x * x + y * y + z * z).sqrt();
            if length > f32::EPSILON {
                normals[c] = [x / length, y / length, z / length];
            }
        }
    }

    let indices = clustering.triangles.into_iter().flatten().collect();
    compact_vertices(primitive, indices);
}

/// Returns whether the primitive was changed
fn simplify_primitive(primitive: &mut Primitive, ratio: f32) -> bool {
    let indices = primitive.triangle_indices();
    let triangles = indices.len() / 3;
    let target = (triangles as f32 * ratio).floor() as usize;
    if target == 0 || target >= triangles {
        return false;
    }

    let (min, extent) = bounds(&primitive.positions);
    if extent <= 0.0 {
        return false;
    }

    let mut lo = extent * FINEST_CELL;
    let mut hi = extent;
    let mut best = None;
    for _ in 0..SEARCH_STEPS {
        let cell = (lo * hi).sqrt();
        let clustering = cluster(primitive, &indices, min, cell);
        if clustering.triangles.len() <= target {
            hi = cell;
            best = Some(clustering);
        } else {
            lo = cell;
        }
    }

    match best {
        Some(clustering) if !clustering.triangles.is_empty() => {
            collapse(primitive, clustering);
            true
        }
        _ => false,
    }
}

pub fn simplify(document: &mut Document, ratio: f32) {
    let before = document.triangle_count();
    let mut skipped = 0;
    for primitive in document.meshes.iter_mut().flat_map(|m| &mut m.primitives) {
        if !simplify_primitive(primitive, ratio) {
            skipped += 1;
        }
    }
    debug!(
        "Simplify({}): {} -> {} triangles, {} primitives unchanged",
        ratio,
        before,
        document.triangle_count(),
        skipped
    );
}
