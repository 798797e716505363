//! Geometry codecs: vertex quantization stored through `KHR_mesh_quantization`
//!
//! Positions are normalized into `[-1, 1]` against a bounding volume and
//! snapped to the codec's bit depth; the volume's center and half-extent move
//! into the node transform so world-space geometry is unchanged. Normals,
//! texture coordinates and colors are snapped in place. The writer then packs
//! each attribute into the narrowest integer type that holds its bits.

use super::{GeometryCodec, MeshoptLevel, QuantizationVolume, compact_vertices};
use crate::document::{Document, Node, Primitive, Quantization};
use glam::{Quat, Vec3};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Volume {
    center: [f32; 3],
    /// Largest half-extent over the three axes
    half: f32,
}

impl Volume {
    fn of<'a>(positions: impl Iterator<Item = &'a [f32; 3]>) -> Option<Self> {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        let mut any = false;
        for p in positions {
            any = true;
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        if !any {
            return None;
        }

        let center = [0, 1, 2].map(|a| (min[a] + max[a]) * 0.5);
        let half = (0..3).map(|a| (max[a] - min[a]) * 0.5).fold(0.0, f32::max);
        Some(Self {
            center,
            half: if half > 0.0 { half } else { 1.0 },
        })
    }
}

/// Snap a signed normalized value to `bits` of precision
fn snap_snorm(v: f32, bits: u8) -> f32 {
    let steps = ((1u32 << (bits - 1)) - 1) as f32;
    (v.clamp(-1.0, 1.0) * steps).round() / steps
}

/// Snap an unsigned normalized value to `bits` of precision
fn snap_unorm(v: f32, bits: u8) -> f32 {
    let steps = ((1u32 << bits) - 1) as f32;
    (v.clamp(0.0, 1.0) * steps).round() / steps
}

fn quantize_primitive(primitive: &mut Primitive, volume: Volume, bits: Quantization) {
    for p in &mut primitive.positions {
        *p = [0, 1, 2].map(|a| snap_snorm((p[a] - volume.center[a]) / volume.half, bits.position_bits));
    }
    if let Some(normals) = &mut primitive.normals {
        for n in normals.iter_mut() {
            *n = n.map(|v| snap_snorm(v, bits.normal_bits));
        }
    }
    // Coordinates outside [0, 1] stay float on disk, so only unit ranges snap
    if let Some(uvs) = &mut primitive.uvs
        && uvs.iter().flatten().all(|v| (0.0..=1.0).contains(v))
    {
        for uv in uvs.iter_mut() {
            *uv = uv.map(|v| snap_unorm(v, bits.texcoord_bits));
        }
    }
    if let Some(colors) = &mut primitive.colors {
        for color in colors.iter_mut() {
            *color = color.map(|v| snap_unorm(v, bits.color_bits));
        }
    }
    primitive.quantization = Some(bits);
}

/// Move the dequantization transform onto every node drawing `mesh`
///
/// Leaf nodes absorb it directly. A node with children cannot be scaled
/// without affecting them, and an animated node would have its keyframes
/// overwrite the transform, so in both cases the mesh moves to a new child.
fn compensate_nodes(document: &mut Document, mesh: usize, volume: Volume) {
    let animated = document.animated_nodes();
    for node_index in document.nodes_using_mesh(mesh) {
        let node = &mut document.nodes[node_index];
        if node.children.is_empty() && !animated[node_index] {
            let rotation = Quat::from_array(node.rotation);
            let scale = Vec3::from_array(node.scale);
            let offset = rotation * (scale * Vec3::from_array(volume.center));
            node.translation = (Vec3::from_array(node.translation) + offset).to_array();
            node.scale = (scale * volume.half).to_array();
        } else {
            let child = Node {
                name: node.name.as_ref().map(|n| format!("{n}_mesh")),
                translation: volume.center,
                scale: [volume.half; 3],
                mesh: node.mesh.take(),
                ..Default::default()
            };
            let child_index = document.nodes.len();
            document.nodes[node_index].children.push(child_index);
            document.nodes.push(child);
        }
    }
}

pub fn encode_geometry(document: &mut Document, codec: &GeometryCodec) {
    let bits = codec.quantization();
    let scene_volume = match codec.volume() {
        QuantizationVolume::Scene => Volume::of(
            document
                .meshes
                .iter()
                .flat_map(|m| &m.primitives)
                .flat_map(|p| &p.positions),
        ),
        QuantizationVolume::Mesh => None,
    };

    let mut encoded = 0;
    for mesh in 0..document.meshes.len() {
        if document.nodes_using_mesh(mesh).is_empty() {
            debug!("Mesh {} is not instanced, leaving it unquantized", mesh);
            continue;
        }
        let volume = scene_volume.or_else(|| {
            Volume::of(
                document.meshes[mesh]
                    .primitives
                    .iter()
                    .flat_map(|p| &p.positions),
            )
        });
        let Some(volume) = volume else {
            continue;
        };

        for primitive in &mut document.meshes[mesh].primitives {
            quantize_primitive(primitive, volume, bits);
            if matches!(
                codec,
                GeometryCodec::Meshopt {
                    level: MeshoptLevel::High
                }
            ) {
                let indices = primitive.triangle_indices();
                compact_vertices(primitive, indices);
            }
        }
        compensate_nodes(document, mesh, volume);
        encoded += 1;
    }

    debug!("Quantized {} meshes ({:?})", encoded, bits);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Mesh;
    use crate::transform::DracoSettings;

    const MESHOPT: GeometryCodec = GeometryCodec::Meshopt {
        level: MeshoptLevel::Medium,
    };

    fn box_mesh(min: f32, max: f32) -> Mesh {
        Mesh {
            name: None,
            primitives: vec![Primitive {
                positions: vec![[min, min, min], [max, min, min], [max, max, max]],
                normals: Some(vec![[0.0, 0.0, 1.0]; 3]),
                uvs: Some(vec![[0.0, 0.0], [1.0, 0.0], [0.3333, 1.0]]),
                ..Default::default()
            }],
        }
    }

    fn world(node: &Node, p: [f32; 3]) -> Vec3 {
        Vec3::from_array(node.translation)
            + Quat::from_array(node.rotation) * (Vec3::from_array(node.scale) * Vec3::from_array(p))
    }

    #[test]
    fn test_leaf_node_absorbs_volume() {
        let original = box_mesh(2.0, 10.0);
        let mut node = Node::with_mesh(None, 0, [1.0, 0.0, 0.0]);
        node.rotation = Quat::from_rotation_y(1.0).to_array();
        node.scale = [2.0, 2.0, 2.0];
        let mut doc = Document {
            meshes: vec![original.clone()],
            nodes: vec![node.clone()],
            ..Default::default()
        };

        encode_geometry(&mut doc, &MESHOPT);

        let primitive = &doc.meshes[0].primitives[0];
        assert!(primitive.quantization.is_some());
        assert!(primitive.positions.iter().flatten().all(|v| v.abs() <= 1.0));
        for (q, p) in primitive.positions.iter().zip(&original.primitives[0].positions) {
            let before = world(&node, *p);
            let after = world(&doc.nodes[0], *q);
            assert!((before - after).length() < 2e-3, "{before} vs {after}");
        }
    }

    #[test]
    fn test_parent_node_gets_mesh_child() {
        let mut parent = Node::with_mesh(Some("parent".into()), 0, [0.0; 3]);
        parent.children = vec![1];
        let mut doc = Document {
            meshes: vec![box_mesh(0.0, 4.0)],
            nodes: vec![parent, Node::default()],
            ..Default::default()
        };

        encode_geometry(&mut doc, &MESHOPT);

        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(doc.nodes[0].mesh, None);
        assert_eq!(doc.nodes[0].children, vec![1, 2]);
        assert_eq!(doc.nodes[0].scale, [1.0; 3]);
        let child = &doc.nodes[2];
        assert_eq!(child.mesh, Some(0));
        assert_eq!(child.translation, [2.0; 3]);
        assert_eq!(child.scale, [2.0; 3]);
        assert_eq!(child.name.as_deref(), Some("parent_mesh"));
    }

    #[test]
    fn test_animated_leaf_keeps_its_transform() {
        use crate::document::{Animation, AnimationChannel, Keyframes};
        use gltf::animation::Interpolation;

        let mut doc = Document {
            meshes: vec![box_mesh(0.0, 4.0)],
            nodes: vec![Node::with_mesh(Some("spinner".into()), 0, [5.0, 0.0, 0.0])],
            animations: vec![Animation {
                name: Some("slide".into()),
                channels: vec![AnimationChannel {
                    node: 0,
                    interpolation: Interpolation::Linear,
                    times: vec![0.0, 1.0],
                    values: Keyframes::Translation(vec![[5.0, 0.0, 0.0], [6.0, 0.0, 0.0]]),
                }],
            }],
            ..Default::default()
        };

        encode_geometry(&mut doc, &MESHOPT);

        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.nodes[0].translation, [5.0, 0.0, 0.0]);
        assert_eq!(doc.nodes[0].scale, [1.0; 3]);
        assert_eq!(doc.nodes[0].mesh, None);
        assert_eq!(doc.nodes[0].children, vec![1]);
        assert_eq!(doc.nodes[1].mesh, Some(0));
        assert_eq!(doc.nodes[1].translation, [2.0; 3]);
        assert_eq!(doc.animations[0].channels[0].node, 0);
    }

    #[test]
    fn test_uninstanced_mesh_untouched() {
        let mut doc = Document {
            meshes: vec![box_mesh(0.0, 4.0)],
            ..Default::default()
        };
        let before = doc.clone();
        encode_geometry(&mut doc, &MESHOPT);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_scene_volume_is_shared() {
        let settings = DracoSettings {
            quantization_volume: QuantizationVolume::Scene,
            ..Default::default()
        };
        let mut doc = Document {
            meshes: vec![box_mesh(0.0, 1.0), box_mesh(-3.0, 3.0)],
            nodes: vec![
                Node::with_mesh(None, 0, [0.0; 3]),
                Node::with_mesh(None, 1, [0.0; 3]),
            ],
            ..Default::default()
        };

        encode_geometry(&mut doc, &GeometryCodec::Draco(settings));

        assert_eq!(doc.nodes[0].scale, doc.nodes[1].scale);
        assert_eq!(doc.nodes[0].scale, [3.0; 3]);
        assert_eq!(
            doc.meshes[1].primitives[0].quantization.map(|q| q.normal_bits),
            Some(10)
        );
    }

    #[test]
    fn test_snapping() {
        assert_eq!(snap_snorm(1.5, 8), 1.0);
        assert_eq!(snap_snorm(0.5, 2), 1.0);
        assert_eq!(snap_unorm(0.3333, 1), 0.0);
        assert!((snap_unorm(0.3333, 12) - 0.3333).abs() < 1.0 / 4095.0);
    }
}
