//! Shared helpers for the integration tests.
//!
//! `MockEncoder` stands in for `toktx`: it writes a KTX2-tagged file a
//! quarter the size of its input, so sizes and fan-out can be asserted
//! without KTX-Software installed.

#![allow(dead_code)]

use asset_optimizer::config::TextureOptions;
use asset_optimizer::error::TextureError;
use asset_optimizer::texture::{TextureEncoder, TextureFormat};
use std::cell::Cell;
use std::path::{Path, PathBuf};

const KTX2_MAGIC: &[u8] = b"\xABKTX 20\xBB\r\n\x1A\n";

pub struct MockEncoder {
    pub available: bool,
    pub probes: Cell<usize>,
    pub encodes: Cell<usize>,
}

impl MockEncoder {
    pub fn available() -> Self {
        Self {
            available: true,
            probes: Cell::new(0),
            encodes: Cell::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }
}

impl TextureEncoder for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    fn probe(&self) -> bool {
        self.probes.set(self.probes.get() + 1);
        self.available
    }

    fn encode(
        &self,
        input: &Path,
        output: &Path,
        _format: TextureFormat,
        _options: &TextureOptions,
    ) -> Result<(), TextureError> {
        self.encodes.set(self.encodes.get() + 1);
        let data = std::fs::read(input).map_err(|source| TextureError::Io {
            path: input.to_path_buf(),
            source,
        })?;
        let mut ktx = KTX2_MAGIC.to_vec();
        ktx.resize(ktx.len().max(data.len() / 4), 0);
        std::fs::write(output, ktx).map_err(|source| TextureError::Io {
            path: output.to_path_buf(),
            source,
        })
    }
}

/// Write a fake source image of `len` bytes
pub fn write_image(dir: &Path, name: &str, len: usize) -> PathBuf {
    std::fs::create_dir_all(dir).expect("Failed to create image dir");
    let path = dir.join(name);
    std::fs::write(&path, vec![0x5Au8; len]).expect("Failed to write image");
    path
}

/// Files (not directories) directly inside `dir`, sorted
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
