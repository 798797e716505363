//! Procedural scenes and their conversion to a glTF [`Document`]

use crate::document::{self, AlphaMode, Document, Material, Mesh, Node, Primitive};
use proc_geometry::MeshData;

/// sRGB transfer function inverse, per channel
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Standard PBR material description
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    /// Linear RGB
    pub color: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
    /// `Some` for alpha-blended materials
    pub opacity: Option<f32>,
}

impl MaterialDesc {
    /// Material from a `0xRRGGBB` sRGB color
    pub fn from_hex(hex: u32, metalness: f32, roughness: f32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xFF) as f32 / 255.0);
        Self {
            color: [channel(16), channel(8), channel(0)],
            metalness,
            roughness,
            opacity: None,
        }
    }

    pub fn transparent(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    fn to_material(&self, name: &str) -> Material {
        let [r, g, b] = self.color;
        Material {
            name: Some(name.to_string()),
            base_color_factor: [r, g, b, self.opacity.unwrap_or(1.0)],
            metallic_factor: self.metalness,
            roughness_factor: self.roughness,
            alpha_mode: if self.opacity.is_some() {
                AlphaMode::Blend
            } else {
                AlphaMode::Opaque
            },
            ..Default::default()
        }
    }
}

/// One mesh placed in a scene
#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub name: String,
    pub geometry: MeshData,
    pub material: MaterialDesc,
    pub translation: [f32; 3],
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub name: String,
    pub meshes: Vec<SceneMesh>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meshes: Vec::new(),
        }
    }

    pub fn with_mesh(
        mut self,
        name: impl Into<String>,
        geometry: MeshData,
        material: MaterialDesc,
        translation: [f32; 3],
    ) -> Self {
        self.meshes.push(SceneMesh {
            name: name.into(),
            geometry,
            material,
            translation,
        });
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.geometry.triangle_count()).sum()
    }

    /// One node, mesh and material per scene mesh, under a single scene
    pub fn to_document(&self) -> Document {
        let mut doc = Document::default();

        for (i, scene_mesh) in self.meshes.iter().enumerate() {
            let geometry = &scene_mesh.geometry;
            doc.materials
                .push(scene_mesh.material.to_material(&format!("{}Material", scene_mesh.name)));
            doc.meshes.push(Mesh {
                name: Some(scene_mesh.name.clone()),
                primitives: vec![Primitive {
                    positions: geometry.positions.clone(),
                    normals: Some(geometry.normals.clone()),
                    uvs: Some(geometry.uvs.clone()),
                    colors: None,
                    indices: Some(geometry.indices.clone()),
                    material: Some(i),
                    quantization: None,
                }],
            });
            doc.nodes.push(Node::with_mesh(
                Some(scene_mesh.name.clone()),
                i,
                scene_mesh.translation,
            ));
        }

        doc.scenes.push(document::Scene {
            name: Some(self.name.clone()),
            nodes: (0..self.meshes.len()).collect(),
        });
        doc.default_scene = Some(0);
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_geometry::{generate_box, generate_sphere};

    #[test]
    fn test_hex_to_linear() {
        let white = MaterialDesc::from_hex(0xffffff, 0.0, 1.0);
        assert_eq!(white.color, [1.0, 1.0, 1.0]);

        let cyan = MaterialDesc::from_hex(0x00ffff, 0.7, 0.3);
        assert_eq!(cyan.color, [0.0, 1.0, 1.0]);

        // sRGB 0x80 is roughly 0.216 linear
        let grey = MaterialDesc::from_hex(0x808080, 0.0, 1.0);
        assert!((grey.color[0] - 0.2158).abs() < 1e-3);
    }

    #[test]
    fn test_to_document() {
        let scene = Scene::new("shapes")
            .with_mesh(
                "ball",
                generate_sphere(1.0, 8, 8),
                MaterialDesc::from_hex(0x3498db, 0.8, 0.2),
                [0.0; 3],
            )
            .with_mesh(
                "crate",
                generate_box(1.0, 1.0, 1.0),
                MaterialDesc::from_hex(0x2ecc71, 0.7, 0.3).transparent(0.8),
                [-1.5, 0.0, 0.0],
            );

        let doc = scene.to_document();

        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.meshes.len(), 2);
        assert_eq!(doc.scenes[0].nodes, vec![0, 1]);
        assert_eq!(doc.scenes[0].name.as_deref(), Some("shapes"));
        assert_eq!(doc.nodes[1].translation, [-1.5, 0.0, 0.0]);
        assert_eq!(doc.nodes[1].mesh, Some(1));
        assert_eq!(doc.meshes[1].primitives[0].material, Some(1));
        assert_eq!(doc.materials[1].alpha_mode, AlphaMode::Blend);
        assert_eq!(doc.materials[1].base_color_factor[3], 0.8);
        assert_eq!(doc.materials[0].metallic_factor, 0.8);
        assert_eq!(doc.triangle_count(), scene.triangle_count());
    }
}
