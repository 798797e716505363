//! Document transforms applied by the model compressor
//!
//! The pipeline is a fixed, ordered list; options only filter entries out.
//! Order: dedup, prune, weld, simplify, texture compress, geometry codec.

mod dedup;
mod prune;
mod quantize;
mod simplify;
mod texture;
mod weld;

pub use dedup::dedup;
pub use prune::prune;
pub use quantize::encode_geometry;
pub use simplify::simplify;
pub use texture::compress_textures;
pub use weld::weld;

use crate::config::{CompressOptions, WELD_TOLERANCE};
use crate::document::{Document, Primitive, Quantization};
use crate::error::CompressError;
use crate::texture::TextureEncoder;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshoptLevel {
    Medium,
    /// Also reorders vertices for fetch locality
    High,
}

impl MeshoptLevel {
    /// Levels above 5 on the 0-10 scale select the high setting
    pub fn from_compression_level(level: u8) -> Self {
        if level > 5 {
            MeshoptLevel::High
        } else {
            MeshoptLevel::Medium
        }
    }
}

/// Bounding volume the draco codec quantizes against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantizationVolume {
    /// Each mesh gets its own bounds
    Mesh,
    /// One bounds shared by every mesh
    Scene,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DracoSettings {
    pub quantization_volume: QuantizationVolume,
    pub position_bits: u8,
    pub normal_bits: u8,
    pub texcoord_bits: u8,
    pub color_bits: u8,
}

impl Default for DracoSettings {
    fn default() -> Self {
        Self {
            quantization_volume: QuantizationVolume::Mesh,
            position_bits: 14,
            normal_bits: 10,
            texcoord_bits: 12,
            color_bits: 8,
        }
    }
}

/// Mutually exclusive geometry encodings
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryCodec {
    Meshopt { level: MeshoptLevel },
    /// Fallback when meshopt is disabled
    Draco(DracoSettings),
}

impl GeometryCodec {
    pub fn quantization(&self) -> Quantization {
        match self {
            GeometryCodec::Meshopt { .. } => Quantization {
                position_bits: 14,
                normal_bits: 8,
                texcoord_bits: 12,
                color_bits: 8,
            },
            GeometryCodec::Draco(settings) => Quantization {
                position_bits: settings.position_bits,
                normal_bits: settings.normal_bits,
                texcoord_bits: settings.texcoord_bits,
                color_bits: settings.color_bits,
            },
        }
    }

    pub fn volume(&self) -> QuantizationVolume {
        match self {
            GeometryCodec::Meshopt { .. } => QuantizationVolume::Mesh,
            GeometryCodec::Draco(settings) => settings.quantization_volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Dedup,
    Prune,
    Weld,
    /// Target fraction of the original triangle count
    Simplify(f32),
    /// Quality percentage, 0 - 100
    TextureCompress(u8),
    GeometryCodec(GeometryCodec),
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Dedup => write!(f, "dedup"),
            Transform::Prune => write!(f, "prune"),
            Transform::Weld => write!(f, "weld({WELD_TOLERANCE})"),
            Transform::Simplify(ratio) => write!(f, "simplify({ratio})"),
            Transform::TextureCompress(quality) => write!(f, "textureCompress({quality}%)"),
            Transform::GeometryCodec(GeometryCodec::Meshopt { level }) => {
                write!(f, "meshopt({level:?})")
            }
            Transform::GeometryCodec(GeometryCodec::Draco(settings)) => {
                write!(f, "draco({:?})", settings.quantization_volume)
            }
        }
    }
}

impl Transform {
    /// The enabled transforms, in pipeline order
    pub fn pipeline(options: &CompressOptions) -> Vec<Transform> {
        let codec = if options.enable_meshopt {
            Some(GeometryCodec::Meshopt {
                level: MeshoptLevel::from_compression_level(options.compression_level),
            })
        } else if options.enable_draco {
            Some(GeometryCodec::Draco(DracoSettings::default()))
        } else {
            None
        };

        [
            Some(Transform::Dedup),
            Some(Transform::Prune),
            Some(Transform::Weld),
            options
                .enable_simplify
                .then_some(Transform::Simplify(options.quality_level)),
            options
                .enable_ktx2
                .then(|| Transform::TextureCompress(options.texture_quality_percent())),
            codec.map(Transform::GeometryCodec),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn apply(
        &self,
        document: &mut Document,
        encoder: &dyn TextureEncoder,
    ) -> Result<(), CompressError> {
        match *self {
            Transform::Dedup => dedup(document),
            Transform::Prune => prune(document),
            Transform::Weld => weld(document, WELD_TOLERANCE),
            Transform::Simplify(ratio) => simplify(document, ratio),
            Transform::TextureCompress(quality) => {
                compress_textures(document, quality, encoder)?;
            }
            Transform::GeometryCodec(codec) => encode_geometry(document, &codec),
        }

        debug!(
            "After {}: {} vertices, {} triangles",
            self,
            document.vertex_count(),
            document.triangle_count()
        );
        Ok(())
    }
}

/// Reorder vertices by first use in `indices` and drop unreferenced ones
pub(crate) fn compact_vertices(primitive: &mut Primitive, indices: Vec<u32>) {
    let mut remap = vec![u32::MAX; primitive.vertex_count()];
    let mut order = Vec::new();
    let indices = indices
        .into_iter()
        .map(|i| {
            let slot = &mut remap[i as usize];
            if *slot == u32::MAX {
                *slot = order.len() as u32;
                order.push(i);
            }
            *slot
        })
        .collect();

    primitive.gather_vertices(&order);
    primitive.indices = Some(indices);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pipeline_order() {
        let pipeline = Transform::pipeline(&CompressOptions::default());
        assert_eq!(
            pipeline,
            vec![
                Transform::Dedup,
                Transform::Prune,
                Transform::Weld,
                Transform::TextureCompress(80),
                Transform::GeometryCodec(GeometryCodec::Meshopt {
                    level: MeshoptLevel::High
                }),
            ]
        );
    }

    #[test]
    fn test_codecs_are_exclusive() {
        let draco_only = CompressOptions {
            enable_meshopt: false,
            enable_ktx2: false,
            ..Default::default()
        };
        let pipeline = Transform::pipeline(&draco_only);
        assert_eq!(
            pipeline.last(),
            Some(&Transform::GeometryCodec(GeometryCodec::Draco(
                DracoSettings::default()
            )))
        );
        let codecs = pipeline
            .iter()
            .filter(|t| matches!(t, Transform::GeometryCodec(_)))
            .count();
        assert_eq!(codecs, 1);

        let neither = CompressOptions {
            enable_meshopt: false,
            enable_draco: false,
            ..Default::default()
        };
        assert!(
            !Transform::pipeline(&neither)
                .iter()
                .any(|t| matches!(t, Transform::GeometryCodec(_)))
        );
    }

    #[test]
    fn test_simplify_slots_before_textures() {
        let options = CompressOptions {
            enable_simplify: true,
            quality_level: 0.5,
            compression_level: 3,
            ..Default::default()
        };
        let pipeline = Transform::pipeline(&options);
        assert_eq!(pipeline[3], Transform::Simplify(0.5));
        assert_eq!(pipeline[4], Transform::TextureCompress(50));
        assert_eq!(
            pipeline[5],
            Transform::GeometryCodec(GeometryCodec::Meshopt {
                level: MeshoptLevel::Medium
            })
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(Transform::Weld.to_string(), "weld(0.0001)");
        assert_eq!(Transform::TextureCompress(80).to_string(), "textureCompress(80%)");
        assert_eq!(
            Transform::GeometryCodec(GeometryCodec::Draco(DracoSettings::default())).to_string(),
            "draco(Mesh)"
        );
    }

    #[test]
    fn test_compact_vertices() {
        let mut primitive = Primitive {
            positions: vec![[0.0; 3], [1.0; 3], [2.0; 3], [3.0; 3]],
            ..Default::default()
        };
        compact_vertices(&mut primitive, vec![3, 1, 3]);
        assert_eq!(primitive.positions, vec![[3.0; 3], [1.0; 3]]);
        assert_eq!(primitive.indices, Some(vec![0, 1, 0]));
    }
}
