//! End-to-end optimization pipeline
//!
//! Stages run strictly in order:
//!
//! ```text
//! Init -> ExportGeometry -> CompressModels -> ConvertTextures
//!      -> GenerateManifests -> GenerateReport -> Cleanup -> Done
//! ```
//!
//! A stage that fails aborts the run. Files that fail inside a stage are
//! logged and left out of every manifest and total.

mod manifest;
mod report;

pub use manifest::{
    AssetManifest, BASE_PATH, CompressionFlags, FileRef, LoaderConfig, MESHOPT_DECODER_PATH,
    ModelEntry, ModelManifest, OptimizedRef, TextureCatalog, model_entries,
};
pub use report::{
    GeometryInfo, GltfInfo, OptimizationReport, OutputInfo, OutputStructure, PIPELINE_VERSION,
    PipelineInfo, Summary, TexturesInfo, format_duration,
};

use crate::batch::{BatchOutcome, FilePattern};
use crate::compress::{CompressionJob, ModelCompressor};
use crate::config::PipelineOptions;
use crate::export::{ExportRecord, GeometryExporter};
use crate::stats::{format_bytes, timestamp, write_json};
use crate::texture::{
    TextureConversionResult, TextureEncoder, TextureFormat, TextureTranscoder, ToktxEncoder,
    texture_entries,
};
use anyhow::{Context, Result};
use std::cell::Cell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ExportGeometry,
    CompressModels,
    ConvertTextures,
    GenerateManifests,
    GenerateReport,
    Cleanup,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Init => "Initializing",
            Stage::ExportGeometry => "Exporting procedural geometries",
            Stage::CompressModels => "Compressing glTF models",
            Stage::ConvertTextures => "Converting textures to KTX2",
            Stage::GenerateManifests => "Generating asset manifests",
            Stage::GenerateReport => "Generating optimization report",
            Stage::Cleanup => "Cleaning temporary files",
            Stage::Done => "Done",
        })
    }
}

impl Stage {
    /// Numbered position in the progress log; bookend stages have none
    pub fn step(self) -> Option<usize> {
        match self {
            Stage::Init | Stage::Done => None,
            Stage::ExportGeometry => Some(1),
            Stage::CompressModels => Some(2),
            Stage::ConvertTextures => Some(3),
            Stage::GenerateManifests => Some(4),
            Stage::GenerateReport => Some(5),
            Stage::Cleanup => Some(6),
        }
    }
}

/// Why the texture stage did not run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSkip {
    MissingInputDir(PathBuf),
    Disabled,
    EncoderUnavailable,
}

impl fmt::Display for TextureSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureSkip::MissingInputDir(_) => {
                f.write_str("No textures directory found, skipping texture optimization.")
            }
            TextureSkip::Disabled => {
                f.write_str("KTX2 compression disabled, skipping texture optimization.")
            }
            TextureSkip::EncoderUnavailable => {
                f.write_str("KTX2 tools not available, skipping texture optimization.")
            }
        }
    }
}

/// Outcome of the texture stage
#[derive(Debug)]
pub enum TextureStage {
    Skipped(TextureSkip),
    Converted(BatchOutcome<TextureConversionResult>),
}

impl TextureStage {
    pub fn results(&self) -> &[TextureConversionResult] {
        match self {
            TextureStage::Skipped(_) => &[],
            TextureStage::Converted(outcome) => &outcome.succeeded,
        }
    }

    pub fn failed(&self) -> usize {
        match self {
            TextureStage::Skipped(_) => 0,
            TextureStage::Converted(outcome) => outcome.failed.len(),
        }
    }

    pub fn skip_reason(&self) -> Option<&TextureSkip> {
        match self {
            TextureStage::Skipped(reason) => Some(reason),
            TextureStage::Converted(_) => None,
        }
    }

    /// Format keys present in the converted output, in encoding order
    pub fn formats(&self) -> Vec<String> {
        TextureFormat::ALL
            .into_iter()
            .filter(|format| {
                self.results()
                    .iter()
                    .flat_map(|r| &r.outputs)
                    .any(|o| o.format == *format)
            })
            .map(|format| format.key().to_string())
            .collect()
    }
}

pub struct PipelineOrchestrator {
    options: PipelineOptions,
    encoder: Rc<dyn TextureEncoder>,
    stage: Cell<Stage>,
}

impl PipelineOrchestrator {
    pub fn new(options: PipelineOptions) -> Self {
        Self::with_encoder(options, Rc::new(ToktxEncoder::new()))
    }

    pub fn with_encoder(options: PipelineOptions, encoder: Rc<dyn TextureEncoder>) -> Self {
        Self {
            options,
            encoder,
            stage: Cell::new(Stage::Init),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Last stage entered; a failed run stays on the stage that failed
    pub fn stage(&self) -> Stage {
        self.stage.get()
    }

    fn models_dir(&self) -> PathBuf {
        self.options.output_dir.join("models")
    }

    fn textures_dir(&self) -> PathBuf {
        self.options.output_dir.join("textures")
    }

    fn manifests_dir(&self) -> PathBuf {
        self.options.output_dir.join("manifests")
    }

    pub fn asset_manifest_path(&self) -> PathBuf {
        self.options.output_dir.join("asset-manifest.json")
    }

    pub fn report_path(&self) -> PathBuf {
        self.options.output_dir.join("optimization-report.json")
    }

    fn enter(&self, stage: Stage) {
        self.stage.set(stage);
        match stage.step() {
            Some(step) => info!("Step {}: {}...", step, stage),
            None => info!("{}", stage),
        }
    }

    /// Run every stage and return the written report
    pub fn optimize(&self) -> Result<OptimizationReport> {
        let started = Instant::now();
        self.enter(Stage::Init);
        info!("Starting 3D asset optimization pipeline...");
        self.options.validate()?;

        self.enter(Stage::ExportGeometry);
        let exports = self
            .export_geometry()
            .context("Geometry export stage failed")?;

        self.enter(Stage::CompressModels);
        let jobs = self
            .compress_models()
            .context("Model compression stage failed")?;

        self.enter(Stage::ConvertTextures);
        let textures = self.convert_textures();

        self.enter(Stage::GenerateManifests);
        self.generate_manifests(&exports.succeeded, &jobs.succeeded, &textures)
            .context("Manifest generation failed")?;

        self.enter(Stage::GenerateReport);
        let report = self.build_report(&exports, &jobs, &textures, started);
        let report_path = self.report_path();
        write_json(&report_path, &report).context("Failed to save optimization report")?;
        log_summary(&report, &report_path);

        if self.options.clean_temp {
            self.enter(Stage::Cleanup);
            self.cleanup();
        }

        self.enter(Stage::Done);
        Ok(report)
    }

    fn export_geometry(&self) -> Result<BatchOutcome<ExportRecord>> {
        let exporter = GeometryExporter::new(self.options.export_options());
        let outcome = exporter.export_all(&self.options.temp_dir)?;
        info!(
            "   Exported {} geometries ({} failed)",
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    fn compress_models(&self) -> Result<BatchOutcome<CompressionJob>> {
        let models_dir = self.models_dir();
        std::fs::create_dir_all(&models_dir)
            .with_context(|| format!("Failed to create {}", models_dir.display()))?;

        let compressor = ModelCompressor::with_encoder(
            self.options.compress_options(),
            Box::new(Rc::clone(&self.encoder)),
        );
        Ok(compressor.process_directory(&self.options.temp_dir, &models_dir, &FilePattern::models()))
    }

    /// Checks run in order: input directory, enable flag, encoder probe
    pub fn convert_textures(&self) -> TextureStage {
        let input_dir = self.options.texture_input_dir();
        let skip = |reason: TextureSkip| {
            info!("   {}", reason);
            TextureStage::Skipped(reason)
        };

        if !input_dir.is_dir() {
            return skip(TextureSkip::MissingInputDir(input_dir));
        }
        if !self.options.enable_ktx2 {
            return skip(TextureSkip::Disabled);
        }

        let transcoder = TextureTranscoder::with_encoder(
            self.options.texture_options(),
            Box::new(Rc::clone(&self.encoder)),
        );
        if !transcoder.check_dependencies() {
            return skip(TextureSkip::EncoderUnavailable);
        }

        TextureStage::Converted(transcoder.process_directory(
            &input_dir,
            &self.textures_dir(),
            &FilePattern::images(),
        ))
    }

    fn generate_manifests(
        &self,
        exports: &[ExportRecord],
        jobs: &[CompressionJob],
        textures: &TextureStage,
    ) -> Result<()> {
        let output_dir = &self.options.output_dir;
        let manifests_dir = self.manifests_dir();

        let models = model_entries(exports, jobs, output_dir, self.options.enable_meshopt);
        let texture_map = texture_entries(textures.results(), output_dir);

        write_json(
            &manifests_dir.join("models.json"),
            &ModelManifest::new(&self.options, models.clone()),
        )?;
        write_json(
            &manifests_dir.join("textures.json"),
            &TextureCatalog::new(texture_map.clone()),
        )?;
        write_json(
            &self.asset_manifest_path(),
            &AssetManifest::new(&self.options, models, texture_map),
        )?;

        info!("   Generated manifests in {}", manifests_dir.display());
        Ok(())
    }

    fn build_report(
        &self,
        exports: &BatchOutcome<ExportRecord>,
        jobs: &BatchOutcome<CompressionJob>,
        textures: &TextureStage,
        started: Instant,
    ) -> OptimizationReport {
        let original: u64 = jobs.succeeded.iter().map(|j| j.original_size).sum();
        let optimized: u64 = jobs.succeeded.iter().map(|j| j.compressed_size).sum();
        let reductions: Vec<f64> = jobs.succeeded.iter().map(|j| j.reduction).collect();
        let output_dir = &self.options.output_dir;

        OptimizationReport {
            pipeline: PipelineInfo {
                version: PIPELINE_VERSION.to_string(),
                completed_at: timestamp(),
                duration: format_duration(started.elapsed()),
                status: "success".to_string(),
            },
            summary: Summary::from_totals(jobs.succeeded.len(), original, optimized),
            geometry: GeometryInfo {
                exported: exports.succeeded.len(),
                failed: exports.failed.len(),
                total_size: format_bytes(exports.succeeded.iter().map(|e| e.size).sum()),
                formats: vec!["glb".to_string()],
            },
            gltf: GltfInfo {
                optimized: jobs.succeeded.len(),
                failed: jobs.failed.len(),
                meshopt_enabled: self.options.enable_meshopt,
                draco_enabled: self.options.enable_draco,
                average_reduction: GltfInfo::average_reduction(&reductions),
            },
            textures: TexturesInfo {
                converted: textures.results().len(),
                failed: textures.failed(),
                ktx2_enabled: self.options.enable_ktx2,
                formats: textures.formats(),
                skipped: textures.skip_reason().map(ToString::to_string),
            },
            output: OutputInfo {
                directory: output_dir.display().to_string(),
                structure: OutputStructure::new(output_dir),
            },
        }
    }

    /// Remove the temp export directory; failure only warns
    pub fn cleanup(&self) -> bool {
        let temp_dir = &self.options.temp_dir;
        match std::fs::remove_dir_all(temp_dir) {
            Ok(()) => {
                info!("   Temporary files cleaned");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(
                    "   Could not clean temporary files at {}: {}",
                    temp_dir.display(),
                    e
                );
                false
            }
        }
    }
}

fn log_summary(report: &OptimizationReport, report_path: &Path) {
    let summary = &report.summary;
    info!("Optimization complete!");
    info!("Duration: {}", report.pipeline.duration);
    info!("Files processed: {}", summary.files_processed);
    info!("Original size: {}", summary.original_size);
    info!("Optimized size: {}", summary.optimized_size);
    info!("Total reduction: {}", summary.total_reduction);
    info!(
        "Target (>={}%): {}",
        crate::config::TARGET_REDUCTION_PERCENT,
        if summary.target_achieved {
            "ACHIEVED"
        } else {
            "NOT MET"
        }
    );
    info!("Report saved: {}", report_path.display());
}
