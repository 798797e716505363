//! The five procedural scenes shipped with the site

use crate::scene::{MaterialDesc, Scene};
use glam::Vec3;
use proc_geometry::{
    ExtrudeSettings, generate_box, generate_dodecahedron, generate_extrusion,
    generate_octahedron, generate_sphere, generate_tetrahedron, generate_torus,
    generate_torus_knot, generate_tube, regular_polygon,
};
use std::collections::BTreeMap;
use std::f32::consts::TAU;

pub const SCENE_NAMES: [&str; 5] = [
    "brandElements",
    "helixKnot",
    "hexagonalPrism",
    "polyhedra",
    "ribbons",
];

fn hexagonal_prism() -> Scene {
    let settings = ExtrudeSettings {
        depth: 0.5,
        steps: 2,
        bevel_enabled: true,
        bevel_thickness: 0.1,
        bevel_size: 0.1,
        bevel_segments: 2,
    };
    Scene::new("hexagonalPrism").with_mesh(
        "prism",
        generate_extrusion(&regular_polygon(6, 1.0), &settings),
        MaterialDesc::from_hex(0x00ffff, 0.7, 0.3),
        [0.0; 3],
    )
}

fn helix_knot() -> Scene {
    Scene::new("helixKnot").with_mesh(
        "knot",
        generate_torus_knot(1.0, 0.3, 100, 16, 2, 3),
        MaterialDesc::from_hex(0xff6b6b, 0.8, 0.2),
        [0.0; 3],
    )
}

fn polyhedra() -> Scene {
    Scene::new("polyhedra")
        .with_mesh(
            "octahedron",
            generate_octahedron(0.8),
            MaterialDesc::from_hex(0x4ecdc4, 0.6, 0.4),
            [-2.0, 0.0, 0.0],
        )
        .with_mesh(
            "dodecahedron",
            generate_dodecahedron(0.8),
            MaterialDesc::from_hex(0x45b7d1, 0.7, 0.3),
            [0.0, 0.0, 0.0],
        )
        .with_mesh(
            "tetrahedron",
            generate_tetrahedron(0.8),
            MaterialDesc::from_hex(0x96ceb4, 0.5, 0.5),
            [2.0, 0.0, 0.0],
        )
}

fn brand_elements() -> Scene {
    Scene::new("brandElements")
        .with_mesh(
            "sphere",
            generate_sphere(1.0, 32, 32),
            MaterialDesc::from_hex(0x3498db, 0.8, 0.2),
            [0.0, 0.0, 0.0],
        )
        .with_mesh(
            "torus",
            generate_torus(0.6, 0.2, 8, 20),
            MaterialDesc::from_hex(0xe74c3c, 0.6, 0.4),
            [1.5, 0.0, 0.0],
        )
        .with_mesh(
            "box",
            generate_box(0.8, 0.8, 0.8),
            MaterialDesc::from_hex(0x2ecc71, 0.7, 0.3),
            [-1.5, 0.0, 0.0],
        )
}

/// Figure-eight ribbon path, scaled by 2
fn ribbon_curve(t: f32) -> Vec3 {
    let a = TAU * t;
    Vec3::new(a.sin(), (2.0 * a).sin() * 0.5, a.cos() * 0.5) * 2.0
}

fn ribbons() -> Scene {
    Scene::new("ribbons").with_mesh(
        "ribbon",
        generate_tube(ribbon_curve, 100, 0.2, 8),
        MaterialDesc::from_hex(0x9b59b6, 0.5, 0.5).transparent(0.8),
        [0.0; 3],
    )
}

/// Build every scene, keyed by export name
pub fn create_geometries() -> BTreeMap<String, Scene> {
    [
        hexagonal_prism(),
        helix_knot(),
        polyhedra(),
        brand_elements(),
        ribbons(),
    ]
    .into_iter()
    .map(|scene| (scene.name.clone(), scene))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::AlphaMode;

    #[test]
    fn test_exactly_five_named_scenes() {
        let scenes = create_geometries();
        let names: Vec<&str> = scenes.keys().map(String::as_str).collect();
        assert_eq!(names, SCENE_NAMES);
        for scene in scenes.values() {
            assert!(scene.triangle_count() > 0, "{} is empty", scene.name);
        }
    }

    #[test]
    fn test_scene_composition() {
        let scenes = create_geometries();
        assert_eq!(scenes["polyhedra"].meshes.len(), 3);
        assert_eq!(scenes["brandElements"].meshes.len(), 3);
        assert_eq!(scenes["polyhedra"].meshes[0].translation, [-2.0, 0.0, 0.0]);
        assert_eq!(scenes["brandElements"].meshes[2].translation, [-1.5, 0.0, 0.0]);

        // 100 x 16 quads
        assert_eq!(scenes["helixKnot"].triangle_count(), 3200);
    }

    #[test]
    fn test_only_ribbons_blend() {
        for (name, scene) in create_geometries() {
            let doc = scene.to_document();
            let blended = doc.materials.iter().any(|m| m.alpha_mode == AlphaMode::Blend);
            assert_eq!(blended, name == "ribbons", "{name}");
        }
    }

    #[test]
    fn test_ribbon_curve_endpoints() {
        let start = ribbon_curve(0.0);
        assert!((start - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
        assert!((ribbon_curve(1.0) - start).length() < 1e-5);
    }
}
