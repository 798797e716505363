//! Stage options and the optional pipeline config file
//!
//! Every stage receives an immutable options struct. The orchestrator's
//! options can come from a TOML file; CLI flags override individual fields.

use crate::error::ConfigError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Vertices whose attributes differ by less than this are merged by the weld pass
pub const WELD_TOLERANCE: f32 = 0.0001;

/// Aggregate reduction (percent) a pipeline run must reach to count as a success
pub const TARGET_REDUCTION_PERCENT: f64 = 30.0;

/// Output container for exported scenes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Binary GLB container
    Glb,
    /// JSON `.gltf` with a `.bin` sidecar
    Gltf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Glb => "glb",
            ExportFormat::Gltf => "gltf",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Accepted for CLI compatibility; the procedural catalog has no animation tracks
    pub include_animations: bool,
    pub verbose: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Glb,
            include_animations: false,
            verbose: false,
        }
    }
}

/// Model compressor options (serialized verbatim into `compression-report.json`)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressOptions {
    pub enable_meshopt: bool,
    pub enable_draco: bool,
    #[serde(rename = "enableKTX2")]
    pub enable_ktx2: bool,
    pub enable_simplify: bool,
    /// 0.0 - 1.0; simplify ratio and texture quality
    pub quality_level: f32,
    /// 0 - 10; above 5 selects the high meshopt level
    pub compression_level: u8,
    pub verbose: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            enable_meshopt: true,
            enable_draco: true,
            enable_ktx2: true,
            enable_simplify: false,
            quality_level: 0.8,
            compression_level: 6,
            verbose: false,
        }
    }
}

impl CompressOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.quality_level) {
            return Err(ConfigError::Invalid(format!(
                "quality level {} out of range (0.0-1.0)",
                self.quality_level
            )));
        }
        if self.compression_level > 10 {
            return Err(ConfigError::Invalid(format!(
                "compression level {} out of range (0-10)",
                self.compression_level
            )));
        }
        Ok(())
    }

    /// Texture quality percentage handed to the texture-compress transform
    pub fn texture_quality_percent(&self) -> u8 {
        (self.quality_level * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AstcQuality {
    Fast,
    #[default]
    Medium,
    Thorough,
}

impl AstcQuality {
    pub fn as_arg(self) -> &'static str {
        match self {
            AstcQuality::Fast => "fast",
            AstcQuality::Medium => "medium",
            AstcQuality::Thorough => "thorough",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bc7Quality {
    Fast,
    #[default]
    Medium,
    Slow,
}

impl Bc7Quality {
    /// Compression effort passed to the encoder's `--clevel`
    pub fn clevel(self) -> u8 {
        match self {
            Bc7Quality::Fast => 0,
            Bc7Quality::Medium => 1,
            Bc7Quality::Slow => 3,
        }
    }
}

/// Texture transcoder options
#[derive(Debug, Clone, PartialEq)]
pub struct TextureOptions {
    /// ETC1S quality level, 1 - 255
    pub quality: u8,
    pub astc_quality: AstcQuality,
    pub bc7_quality: Bc7Quality,
    pub enable_mipmaps: bool,
    /// Also produce the ASTC and BC7 variants
    pub enable_multiformat: bool,
    pub verbose: bool,
    /// Kill an encoder invocation that runs longer than this
    pub timeout: Option<Duration>,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            quality: 128,
            astc_quality: AstcQuality::Medium,
            bc7_quality: Bc7Quality::Medium,
            enable_mipmaps: true,
            enable_multiformat: true,
            verbose: false,
            timeout: None,
        }
    }
}

/// Orchestrator options, optionally loaded from a TOML file
///
/// ```toml
/// input_dir = "./public/assets"
/// output_dir = "./public/assets/optimized"
/// quality = 0.9
/// enable_draco = true
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub enable_ktx2: bool,
    pub enable_meshopt: bool,
    pub enable_draco: bool,
    /// 0.0 - 1.0
    pub quality: f32,
    pub verbose: bool,
    pub clean_temp: bool,
    /// Encoder timeout in seconds for the texture stage
    pub texture_timeout_secs: Option<u64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./public/assets"),
            output_dir: PathBuf::from("./public/assets/optimized"),
            temp_dir: PathBuf::from("./temp/3d-export"),
            enable_ktx2: true,
            enable_meshopt: true,
            enable_draco: false,
            quality: 0.85,
            verbose: true,
            clean_temp: true,
            texture_timeout_secs: None,
        }
    }
}

impl PipelineOptions {
    /// Load options from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(ConfigError::Invalid(format!(
                "quality {} out of range (0.0-1.0)",
                self.quality
            )));
        }
        Ok(())
    }

    /// Directory scanned for source textures
    pub fn texture_input_dir(&self) -> PathBuf {
        self.input_dir.join("textures")
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            format: ExportFormat::Glb,
            include_animations: false,
            verbose: self.verbose,
        }
    }

    /// Model stage options; textures are transcoded by their own stage
    pub fn compress_options(&self) -> CompressOptions {
        CompressOptions {
            enable_meshopt: self.enable_meshopt,
            enable_draco: self.enable_draco,
            enable_ktx2: false,
            quality_level: self.quality,
            verbose: self.verbose,
            ..CompressOptions::default()
        }
    }

    pub fn texture_options(&self) -> TextureOptions {
        TextureOptions {
            quality: (self.quality * 255.0).round().clamp(1.0, 255.0) as u8,
            enable_multiformat: true,
            verbose: self.verbose,
            timeout: self.texture_timeout_secs.map(Duration::from_secs),
            ..TextureOptions::default()
        }
    }
}
