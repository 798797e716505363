//! Parametric surface primitives
//!
//! Box, UV sphere, torus and torus knot. All generators emit smooth normals
//! (flat per face for the box) and UVs in `[0, 1]`.

use glam::{Vec2, Vec3};
use std::f32::consts::PI;
use tracing::warn;

use crate::types::{MeshData, Vertex};

fn positive(name: &str, param: &str, value: f32) -> f32 {
    if value <= 0.0 {
        warn!("{name}: {param} must be > 0.0, clamping to 0.001");
        0.001
    } else {
        value
    }
}

/// Generate an axis-aligned box centered at the origin
///
/// # Arguments
/// * `width`, `height`, `depth` - Full extents along X, Y and Z
///
/// # Returns
/// Mesh with 24 vertices (4 per face) and 12 triangles
pub fn generate_box(width: f32, height: f32, depth: f32) -> MeshData {
    let hx = positive("generate_box", "width", width) * 0.5;
    let hy = positive("generate_box", "height", height) * 0.5;
    let hz = positive("generate_box", "depth", depth) * 0.5;

    let mut mesh = MeshData::new();

    // v0=BL, v1=BR, v2=TR, v3=TL as seen from outside
    let mut add_quad = |corners: [Vec3; 4], normal: Vec3| {
        let uvs = [
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];
        let base = mesh.vertex_count() as u32;
        for (corner, uv) in corners.into_iter().zip(uvs) {
            mesh.add_vertex(Vertex::new(corner, normal, uv));
        }
        mesh.add_triangle(base, base + 1, base + 2);
        mesh.add_triangle(base, base + 2, base + 3);
    };

    add_quad(
        [
            Vec3::new(-hx, -hy, hz),
            Vec3::new(hx, -hy, hz),
            Vec3::new(hx, hy, hz),
            Vec3::new(-hx, hy, hz),
        ],
        Vec3::Z,
    );
    add_quad(
        [
            Vec3::new(hx, -hy, -hz),
            Vec3::new(-hx, -hy, -hz),
            Vec3::new(-hx, hy, -hz),
            Vec3::new(hx, hy, -hz),
        ],
        Vec3::NEG_Z,
    );
    add_quad(
        [
            Vec3::new(-hx, hy, hz),
            Vec3::new(hx, hy, hz),
            Vec3::new(hx, hy, -hz),
            Vec3::new(-hx, hy, -hz),
        ],
        Vec3::Y,
    );
    add_quad(
        [
            Vec3::new(-hx, -hy, -hz),
            Vec3::new(hx, -hy, -hz),
            Vec3::new(hx, -hy, hz),
            Vec3::new(-hx, -hy, hz),
        ],
        Vec3::NEG_Y,
    );
    add_quad(
        [
            Vec3::new(hx, -hy, hz),
            Vec3::new(hx, -hy, -hz),
            Vec3::new(hx, hy, -hz),
            Vec3::new(hx, hy, hz),
        ],
        Vec3::X,
    );
    add_quad(
        [
            Vec3::new(-hx, -hy, -hz),
            Vec3::new(-hx, -hy, hz),
            Vec3::new(-hx, hy, hz),
            Vec3::new(-hx, hy, -hz),
        ],
        Vec3::NEG_X,
    );

    mesh
}

/// Generate a UV sphere with a duplicated seam column
///
/// # Arguments
/// * `radius` - Sphere radius
/// * `width_segments` - Longitudinal divisions (min 3, max 256)
/// * `height_segments` - Latitudinal divisions (min 2, max 256)
///
/// # Returns
/// Mesh with `(width_segments + 1) × (height_segments + 1)` vertices. The
/// degenerate triangles touching the poles are not emitted.
pub fn generate_sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let radius = positive("generate_sphere", "radius", radius);
    let width_segments = width_segments.clamp(3, 256);
    let height_segments = height_segments.clamp(2, 256);

    let mut mesh = MeshData::new();
    let row = width_segments + 1;

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let theta = u * 2.0 * PI;
            let phi = v * PI;

            let position = Vec3::new(
                -radius * theta.cos() * phi.sin(),
                radius * phi.cos(),
                radius * theta.sin() * phi.sin(),
            );
            let normal = position.normalize_or_zero();
            mesh.add_vertex(Vertex::new(position, normal, Vec2::new(u, 1.0 - v)));
        }
    }

    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;

            if iy != 0 {
                mesh.add_triangle(a, b, d);
            }
            if iy != height_segments - 1 {
                mesh.add_triangle(b, c, d);
            }
        }
    }

    mesh
}

/// Generate a torus lying in the XY plane
///
/// # Arguments
/// * `radius` - Distance from the center to the middle of the tube
/// * `tube` - Tube radius
/// * `radial_segments` - Divisions around the tube (min 3, max 256)
/// * `tubular_segments` - Divisions around the ring (min 3, max 512)
pub fn generate_torus(
    radius: f32,
    tube: f32,
    radial_segments: u32,
    tubular_segments: u32,
) -> MeshData {
    let radius = positive("generate_torus", "radius", radius);
    let tube = positive("generate_torus", "tube", tube);
    let radial_segments = radial_segments.clamp(3, 256);
    let tubular_segments = tubular_segments.clamp(3, 512);

    let mut mesh = MeshData::new();

    for j in 0..=radial_segments {
        let v = j as f32 / radial_segments as f32 * 2.0 * PI;
        for i in 0..=tubular_segments {
            let u = i as f32 / tubular_segments as f32 * 2.0 * PI;

            let position = Vec3::new(
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            );
            let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
            let normal = (position - center).normalize_or_zero();
            let uv = Vec2::new(
                i as f32 / tubular_segments as f32,
                j as f32 / radial_segments as f32,
            );
            mesh.add_vertex(Vertex::new(position, normal, uv));
        }
    }

    let row = tubular_segments + 1;
    for j in 1..=radial_segments {
        for i in 1..=tubular_segments {
            let a = row * j + i - 1;
            let b = row * (j - 1) + i - 1;
            let c = row * (j - 1) + i;
            let d = row * j + i;

            mesh.add_triangle(a, b, d);
            mesh.add_triangle(b, c, d);
        }
    }

    mesh
}

/// Point on the (p, q) torus knot curve
fn torus_knot_point(u: f32, p: f32, q: f32, radius: f32) -> Vec3 {
    let qu_over_p = q / p * u;
    let cs = qu_over_p.cos();
    Vec3::new(
        radius * (2.0 + cs) * 0.5 * u.cos(),
        radius * (2.0 + cs) * 0.5 * u.sin(),
        radius * qu_over_p.sin() * 0.5,
    )
}

/// Generate a (p, q) torus knot
///
/// The tube cross-section is oriented by a frame built from the curve
/// tangent and the sum of two neighbouring curve points.
///
/// # Arguments
/// * `radius` - Knot radius
/// * `tube` - Tube radius
/// * `tubular_segments` - Divisions along the curve (min 3, max 1024)
/// * `radial_segments` - Divisions around the tube (min 3, max 256)
/// * `p`, `q` - Winding numbers (min 1)
pub fn generate_torus_knot(
    radius: f32,
    tube: f32,
    tubular_segments: u32,
    radial_segments: u32,
    p: u32,
    q: u32,
) -> MeshData {
    let radius = positive("generate_torus_knot", "radius", radius);
    let tube = positive("generate_torus_knot", "tube", tube);
    let tubular_segments = tubular_segments.clamp(3, 1024);
    let radial_segments = radial_segments.clamp(3, 256);
    let p = p.max(1) as f32;
    let q = q.max(1) as f32;

    let mut mesh = MeshData::new();

    for i in 0..=tubular_segments {
        let u = i as f32 / tubular_segments as f32 * p * 2.0 * PI;

        let p1 = torus_knot_point(u, p, q, radius);
        let p2 = torus_knot_point(u + 0.01, p, q, radius);

        let tangent = p2 - p1;
        let binormal = tangent.cross(p2 + p1);
        let normal = binormal.cross(tangent).normalize_or_zero();
        let binormal = binormal.normalize_or_zero();

        for j in 0..=radial_segments {
            let v = j as f32 / radial_segments as f32 * 2.0 * PI;
            let cx = -tube * v.cos();
            let cy = tube * v.sin();

            let position = p1 + normal * cx + binormal * cy;
            let vertex_normal = (position - p1).normalize_or_zero();
            let uv = Vec2::new(
                i as f32 / tubular_segments as f32,
                j as f32 / radial_segments as f32,
            );
            mesh.add_vertex(Vertex::new(position, vertex_normal, uv));
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
