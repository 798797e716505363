//! Re-encode embedded raster images as KTX2
//!
//! Images go through the same [`TextureEncoder`] the texture transcoder
//! uses, in the universal ETC1S format only. Textures that sample a
//! converted image switch to `KHR_texture_basisu`.

use crate::config::TextureOptions;
use crate::document::{Document, KTX2_MIME};
use crate::error::TextureError;
use crate::texture::{TextureEncoder, TextureFormat};
use tracing::{debug, info};

/// Encoder input extension for a convertible MIME type
fn source_extension(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// ETC1S quality level (1 - 255) for a percentage
fn quality_level(percent: u8) -> u8 {
    (f32::from(percent) / 100.0 * 255.0).round().clamp(1.0, 255.0) as u8
}

/// Returns the number of images converted
pub fn compress_textures(
    document: &mut Document,
    quality_percent: u8,
    encoder: &dyn TextureEncoder,
) -> Result<usize, TextureError> {
    let candidates: Vec<(usize, &'static str)> = document
        .images
        .iter()
        .enumerate()
        .filter_map(|(i, image)| source_extension(&image.mime_type).map(|ext| (i, ext)))
        .collect();
    if candidates.is_empty() {
        return Ok(0);
    }
    if !encoder.probe() {
        return Err(TextureError::EncoderNotFound);
    }

    let scratch = tempfile::tempdir().map_err(|source| TextureError::Io {
        path: std::env::temp_dir(),
        source,
    })?;
    let options = TextureOptions {
        quality: quality_level(quality_percent),
        enable_multiformat: false,
        ..TextureOptions::default()
    };

    for &(index, extension) in &candidates {
        let input = scratch.path().join(format!("image_{index}.{extension}"));
        let output = scratch.path().join(format!("image_{index}.ktx2"));

        std::fs::write(&input, &document.images[index].data).map_err(|source| {
            TextureError::Io {
                path: input.clone(),
                source,
            }
        })?;
        encoder.encode(&input, &output, TextureFormat::Etc1s, &options)?;
        let encoded = std::fs::read(&output).map_err(|source| TextureError::Io {
            path: output.clone(),
            source,
        })?;

        let image = &mut document.images[index];
        debug!(
            "Image {} ({}): {} -> {} bytes",
            index,
            image.name.as_deref().unwrap_or("unnamed"),
            image.data.len(),
            encoded.len()
        );
        image.data = encoded;
        image.mime_type = KTX2_MIME.to_string();
    }

    for texture in &mut document.textures {
        if candidates.iter().any(|&(index, _)| index == texture.image) {
            texture.basisu = true;
        }
    }

    info!("Compressed {} textures to KTX2", candidates.len());
    Ok(candidates.len())
}
