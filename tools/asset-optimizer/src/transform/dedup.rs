//! Merge byte-identical images, samplers, textures, materials and meshes

use crate::document::{Document, Remap};
use tracing::debug;

/// Map every item onto the first earlier item it equals
fn merge_equal<T>(items: &[T], same: impl Fn(&T, &T) -> bool) -> Remap {
    // Item index of each surviving slot
    let mut survivors: Vec<usize> = Vec::new();
    let table = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let slot = survivors
                .iter()
                .position(|&s| same(&items[s], item))
                .unwrap_or_else(|| {
                    survivors.push(i);
                    survivors.len() - 1
                });
            Some(slot)
        })
        .collect();
    Remap::from_table(table)
}

/// Leaves first: merging images makes textures equal, which makes materials
/// equal, which makes meshes equal.
pub fn dedup(document: &mut Document) {
    let images = merge_equal(&document.images, |a, b| {
        a.mime_type == b.mime_type && a.data == b.data
    });
    let merged_images = document.images.len() - images.len();
    document.remap_images(&images);

    let samplers = merge_equal(&document.samplers, |a, b| {
        a.mag_filter == b.mag_filter
            && a.min_filter == b.min_filter
            && a.wrap_s == b.wrap_s
            && a.wrap_t == b.wrap_t
    });
    document.remap_samplers(&samplers);

    let textures = merge_equal(&document.textures, |a, b| {
        a.image == b.image && a.sampler == b.sampler && a.basisu == b.basisu
    });
    document.remap_textures(&textures);

    let materials = merge_equal(&document.materials, |a, b| a.same_content(b));
    let merged_materials = document.materials.len() - materials.len();
    document.remap_materials(&materials);

    let meshes = merge_equal(&document.meshes, |a, b| a.primitives == b.primitives);
    let merged_meshes = document.meshes.len() - meshes.len();
    document.remap_meshes(&meshes);

    debug!(
        "Dedup merged {} images, {} materials, {} meshes",
        merged_images, merged_materials, merged_meshes
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Image, Material, Mesh, Node, Primitive, Texture, TextureRef};

    fn triangle(material: usize) -> Primitive {
        Primitive {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            material: Some(material),
            ..Default::default()
        }
    }

    fn image(data: &[u8]) -> Image {
        Image {
            name: None,
            mime_type: "image/png".to_string(),
            data: data.to_vec(),
        }
    }

    fn textured(texture: usize, name: &str) -> Material {
        Material {
            name: Some(name.to_string()),
            base_color_texture: Some(TextureRef {
                texture,
                tex_coord: 0,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_equal_table() {
        let remap = merge_equal(&[1, 2, 1, 3, 2], |a, b| a == b);
        let mapped: Vec<_> = (0..5).map(|i| remap.get(i)).collect();
        assert_eq!(mapped, [Some(0), Some(1), Some(0), Some(2), Some(1)]);
        assert_eq!(remap.len(), 3);
    }

    #[test]
    fn test_cascading_merge() {
        // Two copies of the same image behind two textures and two materials
        let mut doc = Document {
            images: vec![image(b"abc"), image(b"abc"), image(b"xyz")],
            textures: (0..3)
                .map(|image| Texture {
                    name: None,
                    image,
                    sampler: None,
                    basisu: false,
                })
                .collect(),
            materials: vec![textured(0, "a"), textured(1, "b"), textured(2, "c")],
            meshes: vec![
                Mesh {
                    name: Some("one".into()),
                    primitives: vec![triangle(0)],
                },
                Mesh {
                    name: Some("two".into()),
                    primitives: vec![triangle(1)],
                },
                Mesh {
                    name: Some("three".into()),
                    primitives: vec![triangle(2)],
                },
            ],
            nodes: (0..3)
                .map(|mesh| Node::with_mesh(None, mesh, [mesh as f32, 0.0, 0.0]))
                .collect(),
            ..Default::default()
        };

        dedup(&mut doc);

        assert_eq!(doc.images.len(), 2);
        assert_eq!(doc.textures.len(), 2);
        assert_eq!(doc.materials.len(), 2);
        assert_eq!(doc.meshes.len(), 2);
        assert_eq!(doc.meshes[0].name.as_deref(), Some("one"));
        let meshes: Vec<_> = doc.nodes.iter().map(|n| n.mesh).collect();
        assert_eq!(meshes, [Some(0), Some(0), Some(1)]);
        assert_eq!(doc.meshes[1].primitives[0].material, Some(1));
    }

    #[test]
    fn test_distinct_content_untouched() {
        let mut doc = Document {
            materials: vec![
                Material::default(),
                Material {
                    double_sided: true,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let before = doc.clone();
        dedup(&mut doc);
        assert_eq!(doc, before);
    }
}
