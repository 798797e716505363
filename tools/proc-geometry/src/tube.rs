//! Tube swept along a parametric curve
//!
//! Cross-sections are oriented with parallel-transported frames, which
//! avoids the twisting of plain Frenet frames on curves with inflections.

use glam::{Quat, Vec2, Vec3};
use std::f32::consts::TAU;
use tracing::warn;

use crate::types::{MeshData, Vertex};

/// Per-sample orientation along the curve
#[derive(Clone, Copy, Debug)]
struct Frame {
    normal: Vec3,
    binormal: Vec3,
}

fn tangent_at<F: Fn(f32) -> Vec3>(curve: &F, t: f32) -> Vec3 {
    const DELTA: f32 = 1e-4;
    let t0 = (t - DELTA).max(0.0);
    let t1 = (t + DELTA).min(1.0);
    (curve(t1) - curve(t0)).normalize_or_zero()
}

fn compute_frames<F: Fn(f32) -> Vec3>(curve: &F, segments: u32) -> Vec<Frame> {
    let tangents: Vec<Vec3> = (0..=segments)
        .map(|i| tangent_at(curve, i as f32 / segments as f32))
        .collect();

    // Seed the first normal with the axis least aligned to the tangent
    let t0 = tangents[0];
    let abs = t0.abs();
    let axis = if abs.x <= abs.y && abs.x <= abs.z {
        Vec3::X
    } else if abs.y <= abs.z {
        Vec3::Y
    } else {
        Vec3::Z
    };
    let side = t0.cross(axis).normalize_or_zero();
    let mut normal = t0.cross(side).normalize_or_zero();

    let mut frames = Vec::with_capacity(tangents.len());
    frames.push(Frame {
        normal,
        binormal: t0.cross(normal),
    });

    for pair in tangents.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        let axis = prev.cross(curr);
        if axis.length() > f32::EPSILON {
            let theta = prev.dot(curr).clamp(-1.0, 1.0).acos();
            normal = Quat::from_axis_angle(axis.normalize(), theta) * normal;
        }
        frames.push(Frame {
            normal,
            binormal: curr.cross(normal),
        });
    }

    frames
}

/// Generate an open tube of constant radius around `curve(t)`, `t` in `[0, 1]`
///
/// # Arguments
/// * `curve` - Parametric path
/// * `tubular_segments` - Divisions along the path (min 1, max 2048)
/// * `radius` - Tube radius
/// * `radial_segments` - Divisions around the tube (min 3, max 256)
///
/// # Returns
/// Mesh with `(tubular_segments + 1) × (radial_segments + 1)` vertices and
/// no end caps
pub fn generate_tube<F: Fn(f32) -> Vec3>(
    curve: F,
    tubular_segments: u32,
    radius: f32,
    radial_segments: u32,
) -> MeshData {
    let radius = if radius <= 0.0 {
        warn!("generate_tube: radius must be > 0.0, clamping to 0.001");
        0.001
    } else {
        radius
    };
    let tubular_segments = tubular_segments.clamp(1, 2048);
    let radial_segments = radial_segments.clamp(3, 256);

    let frames = compute_frames(&curve, tubular_segments);
    let mut mesh = MeshData::new();

    for (i, frame) in frames.iter().enumerate() {
        let center = curve(i as f32 / tubular_segments as f32);

        for j in 0..=radial_segments {
            let v = j as f32 / radial_segments as f32 * TAU;
            let normal = (frame.normal * -v.cos() + frame.binormal * v.sin()).normalize_or_zero();
            let uv = Vec2::new(
                i as f32 / tubular_segments as f32,
                j as f32 / radial_segments as f32,
            );
            mesh.add_vertex(Vertex::new(center + normal * radius, normal, uv));
        }
    }

    let row = radial_segments + 1;
    for j in 1..=tubular_segments {
        for i in 1..=radial_segments {
            let a = row * (j - 1) + (i - 1);
            let b = row * j + (i - 1);
            let c = row * j + i;
            let d = row * (j - 1) + i;

            mesh.add_triangle(a, b, d);
            mesh.add_triangle(b, c, d);
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ribbon_curve(t: f32) -> Vec3 {
        Vec3::new(
            (t * TAU).sin(),
            0.5 * (t * 2.0 * TAU).sin(),
            0.5 * (t * TAU).cos(),
        ) * 2.0
    }

    #[test]
    fn test_tube_counts() {
        let mesh = generate_tube(ribbon_curve, 100, 0.2, 8);
        assert_eq!(mesh.vertex_count(), 101 * 9);
        assert_eq!(mesh.triangle_count(), 100 * 8 * 2);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn test_tube_radius() {
        let mesh = generate_tube(ribbon_curve, 50, 0.2, 8);
        for (k, p) in mesh.positions.iter().enumerate() {
            let i = k / 9;
            let center = ribbon_curve(i as f32 / 50.0);
            let distance = (Vec3::from_array(*p) - center).length();
            assert!((distance - 0.2).abs() < 1e-3);
        }
    }

    #[test]
    fn test_frames_stay_orthonormal() {
        let frames = compute_frames(&ribbon_curve, 64);
        for (i, frame) in frames.iter().enumerate() {
            let tangent = tangent_at(&ribbon_curve, i as f32 / 64.0);
            assert!(tangent.dot(frame.normal).abs() < 1e-2);
            assert!((frame.normal.length() - 1.0).abs() < 1e-3);
            assert!((frame.binormal.length() - 1.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_straight_line_has_no_twist() {
        let frames = compute_frames(&|t: f32| Vec3::new(0.0, 0.0, t), 10);
        let first = frames[0].normal;
        for frame in &frames {
            assert!(frame.normal.dot(first) > 0.9999);
        }
    }
}
