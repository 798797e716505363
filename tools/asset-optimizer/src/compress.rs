//! glTF model compressor
//!
//! Loads a glTF/GLB document, runs the enabled transforms in their fixed
//! order and writes the result. Sizes are always measured on disk.

use crate::batch::{BatchOutcome, FilePattern};
use crate::config::CompressOptions;
use crate::document;
use crate::error::CompressError;
use crate::stats::{compression_ratio, format_bytes, format_percent, reduction_percent};
use crate::texture::{TextureEncoder, ToktxEncoder};
use crate::transform::Transform;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One successfully compressed file
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Labels of the transforms applied, in order
    pub transforms: Vec<String>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub reduction: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionSummary {
    pub files_processed: usize,
    pub original_size: String,
    pub compressed_size: String,
    pub total_reduction: String,
    pub compression_ratio: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file: String,
    pub original_size: String,
    pub compressed_size: String,
    pub reduction: String,
}

/// Contents of `compression-report.json`
#[derive(Debug, Clone, Serialize)]
pub struct CompressionReport {
    pub summary: CompressionSummary,
    pub options: CompressOptions,
    pub files: Vec<FileReport>,
}

pub struct ModelCompressor {
    options: CompressOptions,
    encoder: Box<dyn TextureEncoder>,
}

impl ModelCompressor {
    /// Compressor whose texture transform uses `toktx` from `PATH`
    pub fn new(options: CompressOptions) -> Self {
        Self::with_encoder(options, Box::new(ToktxEncoder::new()))
    }

    pub fn with_encoder(options: CompressOptions, encoder: Box<dyn TextureEncoder>) -> Self {
        Self { options, encoder }
    }

    pub fn options(&self) -> &CompressOptions {
        &self.options
    }

    pub fn transforms(&self) -> Vec<Transform> {
        Transform::pipeline(&self.options)
    }

    /// Compress one file; nothing is recorded unless the output was written
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<CompressionJob, CompressError> {
        self.options.validate()?;

        let bytes = std::fs::read(input).map_err(|source| CompressError::Io {
            path: input.to_path_buf(),
            source,
        })?;
        let original_size = bytes.len() as u64;

        let mut doc = document::load_slice(&bytes, input.parent())?;
        drop(bytes);

        let transforms = self.transforms();
        for transform in &transforms {
            transform.apply(&mut doc, self.encoder.as_ref())?;
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CompressError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let compressed_size = document::write(&doc, output)?;
        let reduction = reduction_percent(original_size, compressed_size);

        if self.options.verbose {
            info!(
                "{}: {} -> {} ({} reduction)",
                input.display(),
                format_bytes(original_size),
                format_bytes(compressed_size),
                format_percent(reduction)
            );
        }

        Ok(CompressionJob {
            input_path: input.to_path_buf(),
            output_path: output.to_path_buf(),
            transforms: transforms.iter().map(ToString::to_string).collect(),
            original_size,
            compressed_size,
            reduction,
        })
    }

    /// Compress every matching file under `input_dir`, mirroring the
    /// directory layout under `output_dir`
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        pattern: &FilePattern,
    ) -> BatchOutcome<CompressionJob> {
        let mut outcome = BatchOutcome::new();

        let files = pattern.find(input_dir);
        if files.is_empty() {
            warn!("No model files found in {}", input_dir.display());
            return outcome;
        }

        info!("Processing {} model files...", files.len());
        for file in files {
            let relative = file.strip_prefix(input_dir).unwrap_or(&file);
            let output = output_dir.join(relative);
            let result = self.process_file(&file, &output);
            outcome.record(&file, result);
        }

        outcome
    }

    /// Summarize successful jobs for `compression-report.json`
    pub fn generate_report(&self, results: &[CompressionJob]) -> CompressionReport {
        let original: u64 = results.iter().map(|r| r.original_size).sum();
        let compressed: u64 = results.iter().map(|r| r.compressed_size).sum();

        CompressionReport {
            summary: CompressionSummary {
                files_processed: results.len(),
                original_size: format_bytes(original),
                compressed_size: format_bytes(compressed),
                total_reduction: format_percent(reduction_percent(original, compressed)),
                compression_ratio: compression_ratio(original, compressed),
            },
            options: self.options.clone(),
            files: results
                .iter()
                .map(|r| FileReport {
                    file: r
                        .input_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    original_size: format_bytes(r.original_size),
                    compressed_size: format_bytes(r.compressed_size),
                    reduction: format_percent(r.reduction),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Material, Mesh, Node, Primitive, Scene};
    use crate::error::DocumentError;
    use crate::texture::testing::MockEncoder;
    use tempfile::tempdir;

    /// Unindexed UV sphere-ish strip with every corner duplicated
    fn fixture() -> Document {
        let mut positions = Vec::new();
        for ring in 0..16 {
            for seg in 0..16 {
                let corner = |r: u32, s: u32| {
                    let a = r as f32 * 0.2;
                    let b = s as f32 * 0.4;
                    [a.sin() * b.cos(), a.cos(), a.sin() * b.sin()]
                };
                let (a, b, c, d) = (
                    corner(ring, seg),
                    corner(ring + 1, seg),
                    corner(ring + 1, seg + 1),
                    corner(ring, seg + 1),
                );
                positions.extend([a, b, c, a, c, d]);
            }
        }

        Document {
            nodes: vec![Node::with_mesh(Some("ball".into()), 0, [0.0; 3])],
            meshes: vec![Mesh {
                name: Some("ball".into()),
                primitives: vec![Primitive {
                    positions,
                    material: Some(0),
                    ..Default::default()
                }],
            }],
            materials: vec![Material::default(), Material::default()],
            scenes: vec![Scene {
                name: None,
                nodes: vec![0],
            }],
            default_scene: Some(0),
            ..Default::default()
        }
    }

    fn compressor(options: CompressOptions) -> ModelCompressor {
        ModelCompressor::with_encoder(options, Box::new(MockEncoder::new()))
    }

    #[test]
    fn test_process_file_shrinks_output() {
        let dir = tempdir().expect("Failed to create temp dir");
        let input = dir.path().join("ball.glb");
        document::write(&fixture(), &input).unwrap();

        let output = dir.path().join("out").join("ball.glb");
        let job = compressor(CompressOptions::default())
            .process_file(&input, &output)
            .unwrap();

        assert_eq!(job.original_size, std::fs::metadata(&input).unwrap().len());
        assert_eq!(job.compressed_size, std::fs::metadata(&output).unwrap().len());
        assert!(job.compressed_size < job.original_size);
        assert!(job.reduction > 30.0, "reduction {}", job.reduction);
        assert_eq!(job.transforms[0], "dedup");
        assert!(job.transforms.last().unwrap().starts_with("meshopt"));

        let written = document::load(&output).unwrap();
        assert_eq!(written.materials.len(), 1);
        assert!(written.meshes[0].primitives[0].indices.is_some());
    }

    #[test]
    fn test_animations_and_cameras_survive_compression() {
        use crate::document::{Animation, AnimationChannel, Camera, Keyframes, Projection};
        use gltf::animation::Interpolation;

        let mut doc = fixture();
        doc.nodes[0].translation = [3.0, 0.0, 0.0];
        doc.nodes.push(Node {
            name: Some("eye".into()),
            camera: Some(0),
            ..Default::default()
        });
        doc.scenes[0].nodes.push(1);
        doc.cameras.push(Camera {
            name: Some("main".into()),
            projection: Projection::Perspective {
                aspect_ratio: Some(1.5),
                yfov: 0.9,
                zfar: Some(100.0),
                znear: 0.05,
            },
        });
        let bounce = vec![[3.0, 0.0, 0.0], [3.0, 2.0, 0.0], [3.0, 0.0, 0.0]];
        doc.animations.push(Animation {
            name: Some("bounce".into()),
            channels: vec![AnimationChannel {
                node: 0,
                interpolation: Interpolation::Linear,
                times: vec![0.0, 0.5, 1.0],
                values: Keyframes::Translation(bounce.clone()),
            }],
        });

        let dir = tempdir().expect("Failed to create temp dir");
        let input = dir.path().join("ball.glb");
        document::write(&doc, &input).unwrap();
        let output = dir.path().join("out").join("ball.glb");
        compressor(CompressOptions::default())
            .process_file(&input, &output)
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        let glb = gltf::Glb::from_slice(&bytes).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&glb.json).unwrap();
        assert_eq!(json["animations"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["cameras"].as_array().map(Vec::len), Some(1));

        let written = document::load(&output).unwrap();
        let channel = &written.animations[0].channels[0];
        assert_eq!(channel.times, vec![0.0, 0.5, 1.0]);
        assert_eq!(channel.values, Keyframes::Translation(bounce));

        // Keyframes still drive the node that owns the mesh hierarchy
        let animated = &written.nodes[channel.node];
        assert_eq!(animated.name.as_deref(), Some("ball"));
        assert_eq!(animated.translation, [3.0, 0.0, 0.0]);
        assert_eq!(animated.scale, [1.0; 3]);
        let holder = &written.nodes[animated.children[0]];
        assert!(holder.mesh.is_some());

        let eye = written
            .nodes
            .iter()
            .find(|n| n.name.as_deref() == Some("eye"))
            .unwrap();
        assert_eq!(written.cameras[eye.camera.unwrap()], doc.cameras[0]);
    }

    #[test]
    fn test_skinned_input_is_rejected() {
        use glb_builder::json;

        let (mut root, data) = document::to_gltf(&fixture(), None);
        root.skins.push(json::Skin {
            extensions: Default::default(),
            extras: Default::default(),
            inverse_bind_matrices: None,
            joints: vec![json::Index::new(0)],
            name: None,
            skeleton: None,
        });
        let dir = tempdir().expect("Failed to create temp dir");
        let input = dir.path().join("rigged.glb");
        std::fs::write(&input, glb_builder::assemble_glb(&root, &data).unwrap()).unwrap();

        let output = dir.path().join("out.glb");
        let result = compressor(CompressOptions::default()).process_file(&input, &output);

        assert!(matches!(
            result,
            Err(CompressError::Document(DocumentError::Unsupported(_)))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_text_output_counts_sidecar() {
        let dir = tempdir().expect("Failed to create temp dir");
        let input = dir.path().join("ball.glb");
        document::write(&fixture(), &input).unwrap();

        let output = dir.path().join("ball.gltf");
        let job = compressor(CompressOptions::default())
            .process_file(&input, &output)
            .unwrap();

        let gltf = std::fs::metadata(&output).unwrap().len();
        let bin = std::fs::metadata(dir.path().join("ball.bin")).unwrap().len();
        assert_eq!(job.compressed_size, gltf + bin);
    }

    #[test]
    fn test_invalid_input_is_an_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let input = dir.path().join("broken.glb");
        std::fs::write(&input, b"definitely not gltf").unwrap();

        let output = dir.path().join("out.glb");
        let result = compressor(CompressOptions::default()).process_file(&input, &output);

        assert!(matches!(result, Err(CompressError::Document(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = CompressOptions {
            quality_level: 2.0,
            ..Default::default()
        };
        let result = compressor(options).process_file(Path::new("a.glb"), Path::new("b.glb"));
        assert!(matches!(result, Err(CompressError::Config(_))));
    }

    #[test]
    fn test_directory_batch_keeps_layout_and_skips_failures() {
        let dir = tempdir().expect("Failed to create temp dir");
        let input_dir = dir.path().join("models");
        std::fs::create_dir_all(input_dir.join("nested")).unwrap();
        document::write(&fixture(), &input_dir.join("a.glb")).unwrap();
        document::write(&fixture(), &input_dir.join("nested").join("b.gltf")).unwrap();
        std::fs::write(input_dir.join("c.glb"), b"garbage").unwrap();

        let output_dir = dir.path().join("out");
        let outcome = compressor(CompressOptions::default()).process_directory(
            &input_dir,
            &output_dir,
            &FilePattern::models(),
        );

        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.failed[0].path.ends_with("c.glb"));
        assert!(output_dir.join("a.glb").exists());
        assert!(output_dir.join("nested").join("b.gltf").exists());
        assert!(output_dir.join("nested").join("b.bin").exists());
    }

    #[test]
    fn test_report_shape() {
        let compressor = compressor(CompressOptions::default());
        let jobs = vec![CompressionJob {
            input_path: PathBuf::from("models/a.glb"),
            output_path: PathBuf::from("out/a.glb"),
            transforms: vec![],
            original_size: 1_000_000,
            compressed_size: 650_000,
            reduction: 35.0,
        }];

        let value = serde_json::to_value(compressor.generate_report(&jobs)).unwrap();

        assert_eq!(value["summary"]["filesProcessed"], 1);
        assert_eq!(value["summary"]["totalReduction"], "35.0%");
        assert_eq!(value["summary"]["compressionRatio"], "1.54:1");
        assert_eq!(value["summary"]["originalSize"], "976.56 KB");
        assert_eq!(value["options"]["enableMeshopt"], true);
        assert_eq!(value["files"][0]["file"], "a.glb");
        assert_eq!(value["files"][0]["compressedSize"], "634.77 KB");
    }
}
