//! glTF/GLB construction utilities
//!
//! Builder-pattern APIs for producing glTF documents:
//! - BufferBuilder: Pack binary data with automatic alignment
//! - MeshBuilder: Float or quantized vertex streams for one primitive
//! - GltfBuilder: Top-level document with materials, textures and images
//! - write_glb / write_gltf: Binary container or JSON plus `.bin` sidecar
//!
//! # Example
//!
//! ```no_run
//! use glb_builder::*;
//!
//! let mut buffer = BufferBuilder::new();
//! let mesh = MeshBuilder::new()
//!     .positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]])
//!     .normals(&[[0.0, 0.0, 1.0]; 3])
//!     .indices(&[0, 1, 2])
//!     .build(&mut buffer);
//!
//! let root = GltfBuilder::new()
//!     .buffer_byte_length(buffer.data().len() as u64)
//!     .add_mesh(Some("Triangle"), &[PrimitiveSpec { accessors: mesh, material: None }])
//!     .build(buffer.views(), buffer.accessors(), "glb-builder");
//!
//! let glb_bytes = assemble_glb(&root, buffer.data()).unwrap();
//! ```

pub mod buffer;
pub mod document;
pub mod mesh;
pub mod utils;

pub use buffer::{AccessorIndex, BufferBuilder, ViewIndex};
pub use document::{
    GltfBuilder, KHR_MESH_QUANTIZATION, KHR_TEXTURE_BASISU, PrimitiveSpec, texture_info,
};
pub use mesh::{Colors, MeshAccessors, MeshBuilder, Normals, Positions, TexCoords};
pub use utils::{
    OutputError, align_buffer, assemble_glb, compute_bounds, sidecar_bin_name, write_glb,
    write_gltf,
};

// Re-export commonly used gltf-json types
pub use gltf_json as json;
pub use gltf_json::validation::Checked::Valid;
