//! Library error types
//!
//! Per-file failures are reported through these enums so batch callers can
//! log them and move on; stage and CLI boundaries wrap them with `anyhow`.

use crate::texture::TextureFormat;
use glb_builder::OutputError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid option: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize scene '{scene}': {source}")]
    Serialization {
        scene: String,
        source: OutputError,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("unsupported glTF content: {0}")]
    Unsupported(String),

    #[error("failed to write document: {0}")]
    Write(#[from] OutputError),
}

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("texture compression failed: {0}")]
    Texture(#[from] TextureError),

    #[error("invalid options: {0}")]
    Config(#[from] ConfigError),
}

/// One failed encoder invocation inside an image conversion
#[derive(Debug)]
pub struct FormatFailure {
    pub format: TextureFormat,
    pub message: String,
}

impl fmt::Display for FormatFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.format, self.message)
    }
}

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("toktx not found on PATH")]
    EncoderNotFound,

    #[error("output name {name} is already taken by {}", first.display())]
    DuplicateName { name: String, first: PathBuf },

    #[error("failed to launch encoder: {0}")]
    Spawn(std::io::Error),

    #[error("{format} encoding failed ({status}): {stderr}")]
    EncoderFailed {
        format: TextureFormat,
        status: String,
        stderr: String,
    },

    #[error("{format} encoding timed out after {seconds}s")]
    Timeout { format: TextureFormat, seconds: u64 },

    #[error("encoder reported success but wrote no output at {}", path.display())]
    MissingOutput { path: PathBuf },

    #[error("conversion of {} failed: {}", path.display(), join_failures(failures))]
    ConversionFailed {
        path: PathBuf,
        failures: Vec<FormatFailure>,
    },
}

fn join_failures(failures: &[FormatFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_failed_lists_every_format() {
        let error = TextureError::ConversionFailed {
            path: PathBuf::from("wood.png"),
            failures: vec![
                FormatFailure {
                    format: TextureFormat::Astc,
                    message: "exit 1".to_string(),
                },
                FormatFailure {
                    format: TextureFormat::Bc7,
                    message: "exit 2".to_string(),
                },
            ],
        };

        let message = error.to_string();
        assert!(message.contains("wood.png"));
        assert!(message.contains("ASTC: exit 1"));
        assert!(message.contains("BC7: exit 2"));
    }
}
