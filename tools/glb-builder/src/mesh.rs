//! High-level primitive construction
//!
//! Vertex streams come either as plain floats or already quantized to the
//! integer layouts allowed by `KHR_mesh_quantization`.

use crate::buffer::{AccessorIndex, BufferBuilder};

/// Position stream
#[derive(Debug, Clone)]
pub enum Positions {
    Float(Vec<[f32; 3]>),
    /// Normalized signed 16-bit, dequantized by the owning node transform
    Snorm16(Vec<[i16; 3]>),
}

/// Normal stream
#[derive(Debug, Clone)]
pub enum Normals {
    Float(Vec<[f32; 3]>),
    Snorm8(Vec<[i8; 3]>),
    Snorm16(Vec<[i16; 3]>),
}

/// Texture coordinate stream
#[derive(Debug, Clone)]
pub enum TexCoords {
    Float(Vec<[f32; 2]>),
    Unorm16(Vec<[u16; 2]>),
}

/// Vertex color stream
#[derive(Debug, Clone)]
pub enum Colors {
    Float(Vec<[f32; 4]>),
    Unorm8(Vec<[u8; 4]>),
}

impl Positions {
    fn is_quantized(&self) -> bool {
        matches!(self, Positions::Snorm16(_))
    }
}

impl Normals {
    fn is_quantized(&self) -> bool {
        !matches!(self, Normals::Float(_))
    }
}

impl TexCoords {
    fn is_quantized(&self) -> bool {
        matches!(self, TexCoords::Unorm16(_))
    }
}

/// Accessor indices for a primitive
#[derive(Debug, Clone)]
pub struct MeshAccessors {
    pub positions: AccessorIndex,
    pub normals: Option<AccessorIndex>,
    pub uvs: Option<AccessorIndex>,
    pub colors: Option<AccessorIndex>,
    pub indices: Option<AccessorIndex>,
    /// True when any stream uses a layout that needs `KHR_mesh_quantization`
    pub quantized: bool,
}

/// Builder for primitive data
pub struct MeshBuilder {
    positions: Positions,
    normals: Option<Normals>,
    uvs: Option<TexCoords>,
    colors: Option<Colors>,
    indices: Option<Vec<u32>>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self {
            positions: Positions::Float(Vec::new()),
            normals: None,
            uvs: None,
            colors: None,
            indices: None,
        }
    }

    /// Set float positions
    pub fn positions(mut self, positions: &[[f32; 3]]) -> Self {
        self.positions = Positions::Float(positions.to_vec());
        self
    }

    /// Set positions in any supported layout
    pub fn position_stream(mut self, positions: Positions) -> Self {
        self.positions = positions;
        self
    }

    /// Set float normals (optional)
    pub fn normals(mut self, normals: &[[f32; 3]]) -> Self {
        self.normals = Some(Normals::Float(normals.to_vec()));
        self
    }

    pub fn normal_stream(mut self, normals: Normals) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Set float UVs (optional)
    pub fn uvs(mut self, uvs: &[[f32; 2]]) -> Self {
        self.uvs = Some(TexCoords::Float(uvs.to_vec()));
        self
    }

    pub fn uv_stream(mut self, uvs: TexCoords) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn color_stream(mut self, colors: Colors) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Set indices (optional); narrowed to u8/u16 when they fit
    pub fn indices(mut self, indices: &[u32]) -> Self {
        self.indices = Some(indices.to_vec());
        self
    }

    /// Build and pack into buffer
    pub fn build(self, buffer: &mut BufferBuilder) -> MeshAccessors {
        let quantized = self.positions.is_quantized()
            || self.normals.as_ref().is_some_and(Normals::is_quantized)
            || self.uvs.as_ref().is_some_and(TexCoords::is_quantized);

        let positions = match &self.positions {
            Positions::Float(p) => buffer.pack_positions(p),
            Positions::Snorm16(p) => buffer.pack_positions_i16(p),
        };
        let normals = self.normals.as_ref().map(|n| match n {
            Normals::Float(n) => buffer.pack_vec3(n),
            Normals::Snorm8(n) => buffer.pack_normals_i8(n),
            Normals::Snorm16(n) => buffer.pack_normals_i16(n),
        });
        let uvs = self.uvs.as_ref().map(|uv| match uv {
            TexCoords::Float(uv) => buffer.pack_vec2(uv),
            TexCoords::Unorm16(uv) => buffer.pack_uvs_u16(uv),
        });
        // Normalized u8 colors are core glTF
        let colors = self.colors.as_ref().map(|c| match c {
            Colors::Float(c) => buffer.pack_vec4(c),
            Colors::Unorm8(c) => buffer.pack_colors_u8(c),
        });
        let indices = self.indices.as_ref().map(|i| buffer.pack_indices(i));

        MeshAccessors {
            positions,
            normals,
            uvs,
            colors,
            indices,
            quantized,
        }
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_builder_basic() {
        let mut buffer = BufferBuilder::new();
        let mesh = MeshBuilder::new()
            .positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]])
            .normals(&[[0.0, 0.0, 1.0]; 3])
            .indices(&[0, 1, 2])
            .build(&mut buffer);

        assert_eq!(mesh.positions, AccessorIndex(0));
        assert_eq!(mesh.normals, Some(AccessorIndex(1)));
        assert_eq!(mesh.indices, Some(AccessorIndex(2)));
        assert!(mesh.uvs.is_none());
        assert!(mesh.colors.is_none());
        assert!(!mesh.quantized);
    }

    #[test]
    fn test_mesh_builder_quantized() {
        let mut buffer = BufferBuilder::new();
        let mesh = MeshBuilder::new()
            .position_stream(Positions::Snorm16(vec![[0, 0, 0], [32767, 0, 0], [0, 32767, 0]]))
            .normal_stream(Normals::Snorm8(vec![[0, 0, 127]; 3]))
            .uv_stream(TexCoords::Unorm16(vec![[0, 0], [65535, 0], [0, 65535]]))
            .color_stream(Colors::Unorm8(vec![[255, 0, 0, 255]; 3]))
            .build(&mut buffer);

        assert!(mesh.quantized);
        assert!(mesh.indices.is_none());
        assert_eq!(buffer.accessor_count(), 4);
        // 24 + 12 + 12 + 12 bytes, all 4-byte aligned
        assert_eq!(buffer.data().len(), 60);
    }
}
