//! KTX2 texture transcoding
//!
//! Every source image is encoded once per target format by an external
//! [`TextureEncoder`]. ETC1S (the universal target) is always produced; the
//! ASTC (mobile) and BC7-slot (desktop) variants only with multiformat on.

mod encoder;
mod manifest;

pub use encoder::{TextureEncoder, ToktxEncoder, toktx_args};
pub use manifest::{
    CompressedEntry, MANIFEST_VERSION, OriginalEntry, TextureEntry, TextureManifest,
    generate_texture_manifest, texture_entries,
};

use crate::batch::{BatchOutcome, FilePattern};
use crate::config::TextureOptions;
use crate::error::{FormatFailure, TextureError};
use crate::stats::{base_name, format_bytes, format_percent, reduction_percent};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureFormat {
    /// Universal Basis ETC1S
    Etc1s,
    /// Mobile ASTC
    Astc,
    /// Desktop slot
    Bc7,
}

impl TextureFormat {
    pub const ALL: [TextureFormat; 3] = [
        TextureFormat::Etc1s,
        TextureFormat::Astc,
        TextureFormat::Bc7,
    ];

    /// Lowercase key used in file names and manifests
    pub fn key(self) -> &'static str {
        match self {
            TextureFormat::Etc1s => "etc1s",
            TextureFormat::Astc => "astc",
            TextureFormat::Bc7 => "bc7",
        }
    }

    /// `<basename>_<format>.ktx2`
    pub fn file_name(self, basename: &str) -> String {
        format!("{basename}_{}.ktx2", self.key())
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextureFormat::Etc1s => "ETC1S",
            TextureFormat::Astc => "ASTC",
            TextureFormat::Bc7 => "BC7",
        })
    }
}

/// One encoded variant of an image
#[derive(Debug, Clone, PartialEq)]
pub struct FormatOutput {
    pub format: TextureFormat,
    pub path: PathBuf,
    pub size: u64,
}

/// All variants produced from one source image
#[derive(Debug, Clone, PartialEq)]
pub struct TextureConversionResult {
    pub input_path: PathBuf,
    /// Read once, shared by every variant
    pub original_size: u64,
    pub outputs: Vec<FormatOutput>,
}

impl TextureConversionResult {
    pub fn compression_percent(&self, output: &FormatOutput) -> f64 {
        reduction_percent(self.original_size, output.size)
    }

    pub fn compressed_size(&self) -> u64 {
        self.outputs.iter().map(|o| o.size).sum()
    }
}

pub struct TextureTranscoder {
    options: TextureOptions,
    encoder: Box<dyn TextureEncoder>,
}

impl TextureTranscoder {
    /// Transcoder backed by `toktx` from `PATH`
    pub fn new(options: TextureOptions) -> Self {
        Self::with_encoder(options, Box::new(ToktxEncoder::new()))
    }

    pub fn with_encoder(options: TextureOptions, encoder: Box<dyn TextureEncoder>) -> Self {
        Self { options, encoder }
    }

    pub fn options(&self) -> &TextureOptions {
        &self.options
    }

    /// Formats produced per image, in encoding order
    pub fn formats(&self) -> Vec<TextureFormat> {
        if self.options.enable_multiformat {
            TextureFormat::ALL.to_vec()
        } else {
            vec![TextureFormat::Etc1s]
        }
    }

    /// Probe the encoder, logging installation guidance when it is missing
    pub fn check_dependencies(&self) -> bool {
        if self.encoder.probe() {
            return true;
        }

        error!("{} command not found. Please install KTX-Software tools:", self.encoder.name());
        error!("   https://github.com/KhronosGroup/KTX-Software/releases");
        error!("   Or: brew install ktx-software (macOS)");
        error!("   Or: apt-get install ktx-tools (Ubuntu)");
        false
    }

    /// Encode one image into every enabled format
    ///
    /// All formats are attempted even if an earlier one fails; any failure
    /// fails the image as a whole.
    pub fn convert_image(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<TextureConversionResult, TextureError> {
        let original_size = std::fs::metadata(input)
            .map_err(|source| TextureError::Io {
                path: input.to_path_buf(),
                source,
            })?
            .len();

        std::fs::create_dir_all(output_dir).map_err(|source| TextureError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let basename = base_name(input);
        let mut outputs = Vec::new();
        let mut failures = Vec::new();

        for format in self.formats() {
            let path = output_dir.join(format.file_name(&basename));
            let encoded = self
                .encoder
                .encode(input, &path, format, &self.options)
                .and_then(|()| {
                    std::fs::metadata(&path).map_err(|source| TextureError::Io {
                        path: path.clone(),
                        source,
                    })
                });

            match encoded {
                Ok(metadata) => outputs.push(FormatOutput {
                    format,
                    path,
                    size: metadata.len(),
                }),
                Err(e) => failures.push(FormatFailure {
                    format,
                    message: e.to_string(),
                }),
            }
        }

        if !failures.is_empty() {
            return Err(TextureError::ConversionFailed {
                path: input.to_path_buf(),
                failures,
            });
        }

        let result = TextureConversionResult {
            input_path: input.to_path_buf(),
            original_size,
            outputs,
        };

        if self.options.verbose {
            info!("Converted: {}", basename);
            info!("   Original: {}", format_bytes(original_size));
            for output in &result.outputs {
                info!(
                    "   {}: {} ({} reduction)",
                    output.format,
                    format_bytes(output.size),
                    format_percent(result.compression_percent(output))
                );
            }
        }

        Ok(result)
    }

    /// Convert every matching image under `input_dir` into `output_dir`
    ///
    /// Outputs are named by base name alone, so an image whose base name
    /// was already converted from another subdirectory fails instead of
    /// overwriting the earlier variants.
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        pattern: &FilePattern,
    ) -> BatchOutcome<TextureConversionResult> {
        let mut outcome = BatchOutcome::new();

        let files = pattern.find(input_dir);
        if files.is_empty() {
            warn!("No image files found in {}", input_dir.display());
            return outcome;
        }

        info!("Processing {} texture files...", files.len());
        let mut claimed: BTreeMap<String, PathBuf> = BTreeMap::new();
        for file in files {
            let name = base_name(&file);
            let result = match claimed.get(&name) {
                Some(first) => Err(TextureError::DuplicateName {
                    name,
                    first: first.clone(),
                }),
                None => {
                    claimed.insert(name, file.clone());
                    self.convert_image(&file, output_dir)
                }
            };
            outcome.record(&file, result);
        }

        outcome
    }
}
