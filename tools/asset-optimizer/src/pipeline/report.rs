//! `optimization-report.json`

use crate::config::TARGET_REDUCTION_PERCENT;
use crate::stats::{compression_ratio, format_bytes, format_percent, reduction_percent};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

pub const PIPELINE_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInfo {
    pub version: String,
    pub completed_at: String,
    /// Wall clock, e.g. `"3.21s"`
    pub duration: String,
    pub status: String,
}

/// Totals over successfully compressed models only
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub files_processed: usize,
    pub original_size: String,
    pub optimized_size: String,
    pub total_reduction: String,
    pub compression_ratio: String,
    pub target_achieved: bool,
    #[serde(skip)]
    pub reduction: f64,
}

impl Summary {
    pub fn from_totals(files_processed: usize, original: u64, optimized: u64) -> Self {
        let reduction = reduction_percent(original, optimized);
        Self {
            files_processed,
            original_size: format_bytes(original),
            optimized_size: format_bytes(optimized),
            total_reduction: format_percent(reduction),
            compression_ratio: compression_ratio(original, optimized),
            target_achieved: reduction >= TARGET_REDUCTION_PERCENT,
            reduction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryInfo {
    pub exported: usize,
    pub failed: usize,
    pub total_size: String,
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfInfo {
    pub optimized: usize,
    pub failed: usize,
    pub meshopt_enabled: bool,
    pub draco_enabled: bool,
    pub average_reduction: String,
}

impl GltfInfo {
    /// Mean of per-file reductions, `"0%"` when nothing was compressed
    pub fn average_reduction(reductions: &[f64]) -> String {
        if reductions.is_empty() {
            return "0%".to_string();
        }
        format_percent(reductions.iter().sum::<f64>() / reductions.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TexturesInfo {
    pub converted: usize,
    pub failed: usize,
    #[serde(rename = "ktx2Enabled")]
    pub ktx2_enabled: bool,
    pub formats: Vec<String>,
    /// Why the stage did not run, when it did not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputStructure {
    pub models: String,
    pub textures: String,
    pub manifests: String,
    pub asset_manifest: String,
}

impl OutputStructure {
    pub fn new(output_dir: &Path) -> Self {
        let show = |name: &str| output_dir.join(name).display().to_string();
        Self {
            models: show("models"),
            textures: show("textures"),
            manifests: show("manifests"),
            asset_manifest: show("asset-manifest.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputInfo {
    pub directory: String,
    pub structure: OutputStructure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub pipeline: PipelineInfo,
    pub summary: Summary,
    pub geometry: GeometryInfo,
    pub gltf: GltfInfo,
    pub textures: TexturesInfo,
    pub output: OutputInfo,
}

pub fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}
