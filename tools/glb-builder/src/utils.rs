//! Utility functions for GLB construction and output

use gltf_json as json;
use std::fs;
use std::path::Path;
use thiserror::Error;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F534A;
const CHUNK_BIN: u32 = 0x004E4942;

/// Errors raised while serializing or writing a document
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to serialize glTF JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("text glTF output needs a buffer URI for its binary data")]
    MissingBufferUri,
}

/// Compute bounding box for positions
pub fn compute_bounds(positions: &[[f32; 3]]) -> (Vec<f32>, Vec<f32>) {
    if positions.is_empty() {
        return (vec![0.0; 3], vec![0.0; 3]);
    }

    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];

    for pos in positions {
        for i in 0..3 {
            min[i] = min[i].min(pos[i]);
            max[i] = max[i].max(pos[i]);
        }
    }

    (min.to_vec(), max.to_vec())
}

/// Align buffer to 4-byte boundary
pub fn align_buffer(buffer: &mut Vec<u8>) {
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }
}

fn push_chunk(glb: &mut Vec<u8>, kind: u32, data: &[u8], pad: u8) {
    let padding = (4 - data.len() % 4) % 4;
    glb.extend_from_slice(&((data.len() + padding) as u32).to_le_bytes());
    glb.extend_from_slice(&kind.to_le_bytes());
    glb.extend_from_slice(data);
    glb.extend(std::iter::repeat_n(pad, padding));
}

/// Assemble GLB binary from JSON and buffer data
///
/// The BIN chunk is omitted when there is no buffer data.
pub fn assemble_glb(root: &json::Root, buffer_data: &[u8]) -> Result<Vec<u8>, OutputError> {
    let json_bytes = json::serialize::to_vec(root)?;

    let mut glb = Vec::with_capacity(12 + 8 + json_bytes.len() + 8 + buffer_data.len() + 6);
    glb.extend_from_slice(GLB_MAGIC);
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    // Total length is patched once the chunks are in place
    glb.extend_from_slice(&0u32.to_le_bytes());

    // JSON is padded with spaces, binary with zeros
    push_chunk(&mut glb, CHUNK_JSON, &json_bytes, 0x20);
    if !buffer_data.is_empty() {
        push_chunk(&mut glb, CHUNK_BIN, buffer_data, 0);
    }

    let total = glb.len() as u32;
    glb[8..12].copy_from_slice(&total.to_le_bytes());
    Ok(glb)
}

/// File name of the binary sidecar written next to a `.gltf` file
pub fn sidecar_bin_name(gltf_path: &Path) -> String {
    let stem = gltf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".to_string());
    format!("{stem}.bin")
}

/// Write a binary GLB file, returning the number of bytes written
pub fn write_glb(path: &Path, root: &json::Root, buffer_data: &[u8]) -> Result<u64, OutputError> {
    let glb = assemble_glb(root, buffer_data)?;
    fs::write(path, &glb)?;
    Ok(glb.len() as u64)
}

/// Write a text glTF file plus its binary sidecar
///
/// The sidecar location comes from the first buffer's URI, relative to the
/// `.gltf` file. Returns the combined size of both files.
pub fn write_gltf(path: &Path, root: &json::Root, buffer_data: &[u8]) -> Result<u64, OutputError> {
    let json_bytes = json::serialize::to_vec_pretty(root)?;
    fs::write(path, &json_bytes)?;

    if buffer_data.is_empty() {
        return Ok(json_bytes.len() as u64);
    }

    let uri = root
        .buffers
        .first()
        .and_then(|b| b.uri.as_deref())
        .ok_or(OutputError::MissingBufferUri)?;
    let bin_path = path.parent().unwrap_or_else(|| Path::new(".")).join(uri);
    fs::write(&bin_path, buffer_data)?;

    Ok((json_bytes.len() + buffer_data.len()) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferBuilder, GltfBuilder, MeshBuilder, PrimitiveSpec};

    fn triangle(uri: Option<String>) -> (json::Root, Vec<u8>) {
        let mut buffer = BufferBuilder::new();
        let mesh = MeshBuilder::new()
            .positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]])
            .indices(&[0, 1, 2])
            .build(&mut buffer);

        let root = GltfBuilder::new()
            .buffer_byte_length(buffer.data().len() as u64)
            .buffer_uri(uri)
            .add_mesh(
                Some("Triangle"),
                &[PrimitiveSpec {
                    accessors: mesh,
                    material: None,
                }],
            )
            .add_node(json::Node {
                mesh: Some(json::Index::new(0)),
                ..Default::default()
            })
            .add_scene(None, &[0])
            .build(buffer.views(), buffer.accessors(), "test");
        (root, buffer.data().to_vec())
    }

    #[test]
    fn test_compute_bounds_simple() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [-1.0, -2.0, -3.0]];
        let (min, max) = compute_bounds(&positions);
        assert_eq!(min, vec![-1.0, -2.0, -3.0]);
        assert_eq!(max, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_align_buffer() {
        let mut buffer = vec![1, 2, 3];
        align_buffer(&mut buffer);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer, vec![1, 2, 3, 0]);

        let mut buffer2 = vec![1, 2, 3, 4];
        align_buffer(&mut buffer2);
        assert_eq!(buffer2.len(), 4); // Already aligned
    }

    #[test]
    fn test_assemble_glb_header() {
        let (root, data) = triangle(None);
        let glb = assemble_glb(&root, &data).unwrap();

        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes(glb[4..8].try_into().unwrap()), 2);
        assert_eq!(
            u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize,
            glb.len()
        );
        assert_eq!(glb.len() % 4, 0);
    }

    #[test]
    fn test_glb_loads_with_gltf_crate() {
        let (root, data) = triangle(None);
        let glb = assemble_glb(&root, &data).unwrap();

        let gltf = gltf::Gltf::from_slice(&glb).expect("valid glb");
        assert_eq!(gltf.meshes().count(), 1);
        assert_eq!(gltf.blob.as_ref().map(|b| b.len()), Some(data.len()));
    }

    #[test]
    fn test_write_gltf_with_sidecar() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("triangle.gltf");
        let (root, data) = triangle(Some(sidecar_bin_name(&path)));

        let size = write_gltf(&path, &root, &data).unwrap();

        let bin = dir.path().join("triangle.bin");
        assert!(bin.exists());
        let on_disk = fs::metadata(&path).unwrap().len() + fs::metadata(&bin).unwrap().len();
        assert_eq!(size, on_disk);

        let (document, buffers, _) = gltf::import(&path).expect("import");
        assert_eq!(document.meshes().count(), 1);
        assert_eq!(buffers[0].len(), data.len());
    }

    #[test]
    fn test_write_gltf_requires_uri() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let (root, data) = triangle(None);
        let result = write_gltf(&dir.path().join("x.gltf"), &root, &data);
        assert!(matches!(result, Err(OutputError::MissingBufferUri)));
    }
}
