//! Runtime loader manifests written by the orchestrator
//!
//! Every path is relative to the output directory. Only artifacts that were
//! actually produced appear.

use crate::compress::CompressionJob;
use crate::config::PipelineOptions;
use crate::export::ExportRecord;
use crate::stats::{base_name, format_percent, relative_path, timestamp};
use crate::texture::{MANIFEST_VERSION, TextureEntry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const BASE_PATH: &str = "/assets/optimized/";
pub const MESHOPT_DECODER_PATH: &str = "/assets/optimized/decoders/meshopt_decoder.js";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressionFlags {
    pub meshopt: bool,
    pub draco: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRef {
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedRef {
    pub path: String,
    pub size: u64,
    pub compression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEntry {
    pub original: FileRef,
    pub optimized: OptimizedRef,
    pub meshopt: bool,
    pub format: String,
}

/// `manifests/models.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelManifest {
    pub version: String,
    pub generated_at: String,
    pub compression: CompressionFlags,
    pub models: BTreeMap<String, ModelEntry>,
}

/// `manifests/textures.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureCatalog {
    pub version: String,
    pub generated_at: String,
    pub textures: BTreeMap<String, TextureEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderConfig {
    pub meshopt_decoder: String,
    #[serde(rename = "ktx2Loader")]
    pub ktx2_loader: bool,
    pub draco_loader: bool,
}

/// `asset-manifest.json`, the combined manifest the runtime loader reads
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    pub version: String,
    pub generated_at: String,
    pub base_path: String,
    pub models: BTreeMap<String, ModelEntry>,
    pub textures: BTreeMap<String, TextureEntry>,
    pub loader_config: LoaderConfig,
}

/// One entry per compressed model, keyed by base name
///
/// The original size comes from the export record with the same base name,
/// or 0 for models that were not exported by this run.
pub fn model_entries(
    exports: &[ExportRecord],
    jobs: &[CompressionJob],
    output_dir: &Path,
    meshopt: bool,
) -> BTreeMap<String, ModelEntry> {
    jobs.iter()
        .map(|job| {
            let name = base_name(&job.input_path);
            let original_size = exports
                .iter()
                .find(|e| e.name == name)
                .map_or(0, |e| e.size);

            let entry = ModelEntry {
                original: FileRef {
                    path: relative_path(output_dir, &job.input_path),
                    size: original_size,
                },
                optimized: OptimizedRef {
                    path: relative_path(output_dir, &job.output_path),
                    size: job.compressed_size,
                    compression: format_percent(job.reduction),
                },
                meshopt,
                format: "glb".to_string(),
            };
            (name, entry)
        })
        .collect()
}

impl ModelManifest {
    pub fn new(options: &PipelineOptions, models: BTreeMap<String, ModelEntry>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            generated_at: timestamp(),
            compression: CompressionFlags {
                meshopt: options.enable_meshopt,
                draco: options.enable_draco,
            },
            models,
        }
    }
}

impl TextureCatalog {
    pub fn new(textures: BTreeMap<String, TextureEntry>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            generated_at: timestamp(),
            textures,
        }
    }
}

impl AssetManifest {
    pub fn new(
        options: &PipelineOptions,
        models: BTreeMap<String, ModelEntry>,
        textures: BTreeMap<String, TextureEntry>,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            generated_at: timestamp(),
            base_path: BASE_PATH.to_string(),
            models,
            textures,
            loader_config: LoaderConfig {
                meshopt_decoder: MESHOPT_DECODER_PATH.to_string(),
                ktx2_loader: options.enable_ktx2,
                draco_loader: options.enable_draco,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job(name: &str) -> CompressionJob {
        CompressionJob {
            input_path: PathBuf::from(format!("/work/temp/{name}.glb")),
            output_path: PathBuf::from(format!("/work/out/models/{name}.glb")),
            transforms: vec!["dedup".to_string()],
            original_size: 2000,
            compressed_size: 500,
            reduction: 75.0,
        }
    }

    #[test]
    fn test_model_entries_cross_reference_exports() {
        let exports = vec![ExportRecord {
            name: "helixKnot".to_string(),
            path: PathBuf::from("/work/temp/helixKnot.glb"),
            size: 2000,
        }];
        let jobs = vec![job("helixKnot"), job("imported")];

        let entries = model_entries(&exports, &jobs, Path::new("/work/out"), true);

        let knot = &entries["helixKnot"];
        assert_eq!(knot.original.size, 2000);
        assert_eq!(knot.original.path, "../temp/helixKnot.glb");
        assert_eq!(knot.optimized.path, "models/helixKnot.glb");
        assert_eq!(knot.optimized.compression, "75.0%");
        assert_eq!(knot.format, "glb");
        // No matching export record
        assert_eq!(entries["imported"].original.size, 0);
    }

    #[test]
    fn test_asset_manifest_shape() {
        let options = PipelineOptions::default();
        let manifest = AssetManifest::new(&options, BTreeMap::new(), BTreeMap::new());
        let value = serde_json::to_value(&manifest).unwrap();

        assert_eq!(value["version"], "1.0.0");
        assert_eq!(value["basePath"], "/assets/optimized/");
        assert_eq!(value["textures"], serde_json::json!({}));
        assert_eq!(
            value["loaderConfig"]["meshoptDecoder"],
            "/assets/optimized/decoders/meshopt_decoder.js"
        );
        assert_eq!(value["loaderConfig"]["ktx2Loader"], true);
        assert_eq!(value["loaderConfig"]["dracoLoader"], false);
    }

    #[test]
    fn test_model_manifest_flags() {
        let options = PipelineOptions {
            enable_meshopt: false,
            enable_draco: true,
            ..Default::default()
        };
        let value = serde_json::to_value(ModelManifest::new(&options, BTreeMap::new())).unwrap();
        assert_eq!(value["compression"]["meshopt"], false);
        assert_eq!(value["compression"]["draco"], true);
        assert!(value["generatedAt"].is_string());
    }
}
