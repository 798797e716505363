//! Texture manifest consumed by the runtime loader

use super::TextureConversionResult;
use crate::stats::{base_name, format_percent, relative_path, timestamp};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const MANIFEST_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureManifest {
    pub version: String,
    pub generated_at: String,
    pub textures: BTreeMap<String, TextureEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginalEntry {
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressedEntry {
    pub path: String,
    pub size: u64,
    /// Reduction against the original, e.g. `"75.0%"`
    pub compression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextureEntry {
    pub original: OriginalEntry,
    /// Keyed by lowercase format name
    pub compressed: BTreeMap<String, CompressedEntry>,
}

/// Manifest entries keyed by image base name, paths relative to `base_dir`
pub fn texture_entries(
    results: &[TextureConversionResult],
    base_dir: &Path,
) -> BTreeMap<String, TextureEntry> {
    results
        .iter()
        .map(|result| {
            let compressed = result
                .outputs
                .iter()
                .map(|output| {
                    (
                        output.format.key().to_string(),
                        CompressedEntry {
                            path: relative_path(base_dir, &output.path),
                            size: output.size,
                            compression: format_percent(result.compression_percent(output)),
                        },
                    )
                })
                .collect();

            let entry = TextureEntry {
                original: OriginalEntry {
                    path: relative_path(base_dir, &result.input_path),
                    size: result.original_size,
                },
                compressed,
            };
            (base_name(&result.input_path), entry)
        })
        .collect()
}

/// Build the manifest that will be written at `manifest_path`
///
/// Pure: paths are made relative to the manifest's directory, nothing is
/// written.
pub fn generate_texture_manifest(
    results: &[TextureConversionResult],
    manifest_path: &Path,
) -> TextureManifest {
    let base_dir = manifest_path.parent().unwrap_or(Path::new("."));
    TextureManifest {
        version: MANIFEST_VERSION.to_string(),
        generated_at: timestamp(),
        textures: texture_entries(results, base_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{FormatOutput, TextureFormat};
    use std::path::PathBuf;

    fn result() -> TextureConversionResult {
        TextureConversionResult {
            input_path: PathBuf::from("/assets/textures/wood.png"),
            original_size: 1000,
            outputs: vec![
                FormatOutput {
                    format: TextureFormat::Etc1s,
                    path: PathBuf::from("/assets/optimized/textures/wood_etc1s.ktx2"),
                    size: 250,
                },
                FormatOutput {
                    format: TextureFormat::Bc7,
                    path: PathBuf::from("/assets/optimized/textures/wood_bc7.ktx2"),
                    size: 400,
                },
            ],
        }
    }

    #[test]
    fn test_manifest_shape() {
        let manifest = generate_texture_manifest(
            &[result()],
            Path::new("/assets/optimized/textures/texture-manifest.json"),
        );
        let value = serde_json::to_value(&manifest).unwrap();

        assert_eq!(value["version"], "1.0.0");
        assert!(value["generatedAt"].as_str().unwrap().ends_with('Z'));

        let wood = &value["textures"]["wood"];
        assert_eq!(wood["original"]["path"], "../../textures/wood.png");
        assert_eq!(wood["original"]["size"], 1000);
        assert_eq!(wood["compressed"]["etc1s"]["path"], "wood_etc1s.ktx2");
        assert_eq!(wood["compressed"]["etc1s"]["compression"], "75.0%");
        assert_eq!(wood["compressed"]["bc7"]["size"], 400);
        assert!(wood["compressed"].get("astc").is_none());
    }

    #[test]
    fn test_entries_relative_to_output_root() {
        let entries = texture_entries(&[result()], Path::new("/assets/optimized"));
        assert_eq!(
            entries["wood"].compressed["etc1s"].path,
            "textures/wood_etc1s.ktx2"
        );
    }
}
