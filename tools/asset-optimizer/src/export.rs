//! Procedural geometry export
//!
//! Serializes each catalog scene to `<output>/<name>.glb` (or `.gltf` with a
//! `.bin` sidecar). One failed scene never stops the others.

use crate::batch::BatchOutcome;
use crate::catalog;
use crate::config::{ExportFormat, ExportOptions};
use crate::document;
use crate::error::ExportError;
use crate::scene::Scene;
use crate::stats::format_bytes;
use glb_builder::{OutputError, sidecar_bin_name, write_glb, write_gltf};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One exported scene; `size` is measured on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

pub struct GeometryExporter {
    options: ExportOptions,
}

impl GeometryExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn create_geometries(&self) -> BTreeMap<String, Scene> {
        catalog::create_geometries()
    }

    /// Serialize one scene in the configured format
    pub fn export_to_file(&self, scene: &Scene, output_path: &Path) -> Result<PathBuf, ExportError> {
        let doc = scene.to_document();
        let result = match self.options.format {
            ExportFormat::Glb => {
                let (root, data) = document::to_gltf(&doc, None);
                write_glb(output_path, &root, &data)
            }
            ExportFormat::Gltf => {
                let (root, data) = document::to_gltf(&doc, Some(sidecar_bin_name(output_path)));
                write_gltf(output_path, &root, &data)
            }
        };

        match result {
            Ok(bytes) => {
                debug!("Wrote {} ({} bytes)", output_path.display(), bytes);
                Ok(output_path.to_path_buf())
            }
            Err(OutputError::Io(source)) => Err(ExportError::Io {
                path: output_path.to_path_buf(),
                source,
            }),
            Err(source) => Err(ExportError::Serialization {
                scene: scene.name.clone(),
                source,
            }),
        }
    }

    /// Bytes on disk for an exported file, including a text sidecar
    fn exported_size(&self, path: &Path) -> Result<u64, ExportError> {
        let metadata = |p: &Path| {
            std::fs::metadata(p)
                .map(|m| m.len())
                .map_err(|source| ExportError::Io {
                    path: p.to_path_buf(),
                    source,
                })
        };

        let mut size = metadata(path)?;
        if self.options.format == ExportFormat::Gltf {
            let sidecar = path.with_file_name(sidecar_bin_name(path));
            if sidecar.exists() {
                size += metadata(&sidecar)?;
            }
        }
        Ok(size)
    }

    /// Export every catalog scene into `output_dir`
    pub fn export_all(&self, output_dir: &Path) -> Result<BatchOutcome<ExportRecord>, ExportError> {
        std::fs::create_dir_all(output_dir).map_err(|source| ExportError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

        info!("Exporting procedural geometries to glTF...");
        let mut outcome = BatchOutcome::new();
        for (name, scene) in self.create_geometries() {
            let file_name = format!("{name}.{}", self.options.format.extension());
            let path = output_dir.join(&file_name);

            let result = self.export_to_file(&scene, &path).and_then(|path| {
                let size = self.exported_size(&path)?;
                Ok(ExportRecord { name, path, size })
            });
            if let Ok(record) = &result {
                info!("Exported: {} ({})", file_name, format_bytes(record.size));
            }
            outcome.record(&path, result);
        }

        Ok(outcome)
    }
}
