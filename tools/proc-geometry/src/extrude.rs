//! Polygon extrusion with an optional rounded bevel
//!
//! The outline is extruded along +Z from `0` to `depth`. With a bevel, extra
//! layers are added in front of `z = 0` and behind `z = depth`, growing the
//! outline by up to `bevel_size` along a quarter circle.

use glam::{Vec2, Vec3};
use std::f32::consts::FRAC_PI_2;
use tracing::warn;

use crate::types::{MeshData, Vertex};

/// Extrusion parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtrudeSettings {
    pub depth: f32,
    pub steps: u32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_segments: u32,
}

impl Default for ExtrudeSettings {
    fn default() -> Self {
        Self {
            depth: 1.0,
            steps: 1,
            bevel_enabled: true,
            bevel_thickness: 0.2,
            bevel_size: 0.1,
            bevel_segments: 3,
        }
    }
}

/// Vertices of a regular polygon in the XY plane, counter-clockwise from +X
pub fn regular_polygon(sides: u32, radius: f32) -> Vec<Vec2> {
    let sides = sides.max(3);
    (0..sides)
        .map(|i| {
            let angle = i as f32 / sides as f32 * std::f32::consts::TAU;
            Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

/// Grow a convex counter-clockwise outline outward by `distance`
fn offset_outline(outline: &[Vec2], distance: f32) -> Vec<Vec2> {
    if distance == 0.0 {
        return outline.to_vec();
    }

    let n = outline.len();
    (0..n)
        .map(|i| {
            let prev = outline[(i + n - 1) % n];
            let curr = outline[i];
            let next = outline[(i + 1) % n];

            // Outward edge normals of a CCW outline point right of the edge
            let n1 = (curr - prev).perp().normalize_or_zero() * -1.0;
            let n2 = (next - curr).perp().normalize_or_zero() * -1.0;
            let bisector = (n1 + n2).normalize_or_zero();
            let cos = bisector.dot(n1).max(1e-4);
            curr + bisector * (distance / cos)
        })
        .collect()
}

/// Signed area, positive for counter-clockwise outlines
fn signed_area(outline: &[Vec2]) -> f32 {
    let n = outline.len();
    (0..n)
        .map(|i| outline[i].perp_dot(outline[(i + 1) % n]))
        .sum::<f32>()
        * 0.5
}

/// Extrude a convex outline into a closed, flat-shaded solid
///
/// Side faces are emitted per layer band with their own vertices; caps are
/// fan-triangulated.
pub fn generate_extrusion(outline: &[Vec2], settings: &ExtrudeSettings) -> MeshData {
    if outline.len() < 3 {
        warn!(
            "generate_extrusion: outline needs at least 3 points, got {}",
            outline.len()
        );
        return MeshData::new();
    }

    let mut outline = outline.to_vec();
    if signed_area(&outline) < 0.0 {
        outline.reverse();
    }

    let depth = if settings.depth <= 0.0 {
        warn!("generate_extrusion: depth must be > 0.0, clamping to 0.001");
        0.001
    } else {
        settings.depth
    };
    let steps = settings.steps.max(1);

    // (z, outward offset) per layer, front to back
    let mut layers: Vec<(f32, f32)> = Vec::new();
    if settings.bevel_enabled {
        let segments = settings.bevel_segments.max(1);
        let thickness = settings.bevel_thickness;
        let size = settings.bevel_size;

        for b in 0..=segments {
            let t = b as f32 / segments as f32 * FRAC_PI_2;
            layers.push((-thickness * t.cos(), size * t.sin()));
        }
        for s in 1..=steps {
            layers.push((depth * s as f32 / steps as f32, size));
        }
        for b in (0..segments).rev() {
            let t = b as f32 / segments as f32 * FRAC_PI_2;
            layers.push((depth + thickness * t.cos(), size * t.sin()));
        }
    } else {
        for s in 0..=steps {
            layers.push((depth * s as f32 / steps as f32, 0.0));
        }
    }

    let rings: Vec<Vec<Vec3>> = layers
        .iter()
        .map(|&(z, offset)| {
            offset_outline(&outline, offset)
                .into_iter()
                .map(|p| p.extend(z))
                .collect()
        })
        .collect();

    let mut mesh = MeshData::new();
    let n = outline.len();
    let last_layer = (rings.len() - 1) as f32;

    for (k, band) in rings.windows(2).enumerate() {
        let (lower, upper) = (&band[0], &band[1]);
        let v0 = k as f32 / last_layer;
        let v1 = (k + 1) as f32 / last_layer;

        for i in 0..n {
            let j = (i + 1) % n;
            let corners = [lower[i], lower[j], upper[j], upper[i]];

            // Side faces point away from the extrusion axis
            let mut normal = (corners[1] - corners[0])
                .cross(corners[3] - corners[0])
                .normalize_or_zero();
            let center = (corners[0] + corners[1] + corners[2] + corners[3]) * 0.25;
            let flip = normal.dot(Vec3::new(center.x, center.y, 0.0)) < 0.0;
            if flip {
                normal = -normal;
            }

            let u0 = i as f32 / n as f32;
            let u1 = (i + 1) as f32 / n as f32;
            let uvs = [
                Vec2::new(u0, v0),
                Vec2::new(u1, v0),
                Vec2::new(u1, v1),
                Vec2::new(u0, v1),
            ];

            let base = mesh.vertex_count() as u32;
            for (corner, uv) in corners.into_iter().zip(uvs) {
                mesh.add_vertex(Vertex::new(corner, normal, uv));
            }
            if flip {
                mesh.add_triangle(base, base + 2, base + 1);
                mesh.add_triangle(base, base + 3, base + 2);
            } else {
                mesh.add_triangle(base, base + 1, base + 2);
                mesh.add_triangle(base, base + 2, base + 3);
            }
        }
    }

    // Caps
    let (min, max) = outline
        .iter()
        .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), p| {
            (lo.min(*p), hi.max(*p))
        });
    let extent = (max - min).max(Vec2::splat(1e-6));
    let cap_uv = |p: Vec3| (p.truncate() - min) / extent;

    if let (Some(front), Some(back)) = (rings.first(), rings.last()) {
        let base = mesh.vertex_count() as u32;
        for p in front {
            mesh.add_vertex(Vertex::new(*p, Vec3::NEG_Z, cap_uv(*p)));
        }
        for i in 1..(n as u32 - 1) {
            mesh.add_triangle(base, base + i + 1, base + i);
        }

        let base = mesh.vertex_count() as u32;
        for p in back {
            mesh.add_vertex(Vertex::new(*p, Vec3::Z, cap_uv(*p)));
        }
        for i in 1..(n as u32 - 1) {
            mesh.add_triangle(base, base + i, base + i + 1);
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_settings() -> ExtrudeSettings {
        ExtrudeSettings {
            depth: 0.5,
            steps: 2,
            bevel_enabled: true,
            bevel_thickness: 0.1,
            bevel_size: 0.1,
            bevel_segments: 2,
        }
    }

    #[test]
    fn test_regular_polygon() {
        let hex = regular_polygon(6, 1.0);
        assert_eq!(hex.len(), 6);
        assert!((hex[0] - Vec2::X).length() < 1e-6);
        assert!(signed_area(&hex) > 0.0);
    }

    #[test]
    fn test_offset_regular_polygon() {
        let hex = regular_polygon(6, 1.0);
        let grown = offset_outline(&hex, 0.1);
        let expected = 1.0 + 0.1 / (std::f32::consts::PI / 6.0).cos();
        for p in grown {
            assert!((p.length() - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_hexagonal_prism_counts() {
        let mesh = generate_extrusion(&regular_polygon(6, 1.0), &hex_settings());

        // 3 front bevel layers, 2 steps, 2 back bevel layers = 7 layers, 6 bands
        let side_quads = 6 * 6;
        assert_eq!(mesh.vertex_count(), side_quads * 4 + 6 * 2);
        assert_eq!(mesh.triangle_count(), side_quads * 2 + 4 * 2);
    }

    #[test]
    fn test_hexagonal_prism_depth_range() {
        let mesh = generate_extrusion(&regular_polygon(6, 1.0), &hex_settings());
        let (lo, hi) = mesh
            .positions
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p[2]), hi.max(p[2])));
        assert!((lo + 0.1).abs() < 1e-5);
        assert!((hi - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_extrusion_faces_point_outward() {
        let mesh = generate_extrusion(&regular_polygon(6, 1.0), &hex_settings());
        let center = Vec3::new(0.0, 0.0, 0.25);
        for tri in mesh.indices.chunks(3) {
            let a = Vec3::from_array(mesh.positions[tri[0] as usize]);
            let b = Vec3::from_array(mesh.positions[tri[1] as usize]);
            let c = Vec3::from_array(mesh.positions[tri[2] as usize]);
            let face = (b - a).cross(c - a);
            assert!(face.dot((a + b + c) / 3.0 - center) > 0.0);
        }
    }

    #[test]
    fn test_clockwise_outline_is_reoriented() {
        let mut square = vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ];
        square.reverse();
        let settings = ExtrudeSettings {
            bevel_enabled: false,
            ..ExtrudeSettings::default()
        };
        let mesh = generate_extrusion(&square, &settings);
        assert_eq!(mesh.triangle_count(), 4 * 2 + 2 * 2);
    }

    #[test]
    fn test_degenerate_outline() {
        let mesh = generate_extrusion(&[Vec2::ZERO, Vec2::X], &ExtrudeSettings::default());
        assert_eq!(mesh.vertex_count(), 0);
    }
}
