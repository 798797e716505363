//! asset-optimizer library
//!
//! Offline 3D asset pipeline: procedural geometry export, glTF compression,
//! KTX2 texture transcoding and the orchestrator that ties them together.
//! The `asset-optimizer` binary is a thin CLI over these modules.

pub mod batch;
pub mod catalog;
pub mod compress;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod scene;
pub mod stats;
pub mod texture;
pub mod transform;

pub use batch::{BatchFailure, BatchOutcome, FilePattern};
pub use compress::{CompressionJob, CompressionReport, ModelCompressor};
pub use config::{
    CompressOptions, ExportFormat, ExportOptions, PipelineOptions, TARGET_REDUCTION_PERCENT,
    TextureOptions, WELD_TOLERANCE,
};
pub use error::{CompressError, ConfigError, DocumentError, ExportError, TextureError};
pub use export::{ExportRecord, GeometryExporter};
pub use pipeline::{OptimizationReport, PipelineOrchestrator, Stage, TextureSkip, TextureStage};
pub use texture::{
    TextureConversionResult, TextureEncoder, TextureFormat, TextureTranscoder, ToktxEncoder,
};
pub use transform::Transform;
