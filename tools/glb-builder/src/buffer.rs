//! Low-level buffer packing with automatic alignment and accessor creation
//!
//! Every `pack_*` call appends one tightly packed (or explicitly strided)
//! buffer view and, for vertex data, one accessor describing it.

use crate::utils::{align_buffer, compute_bounds};
use gltf_json as json;
use gltf_json::accessor::{ComponentType, GenericComponentType, Type};
use gltf_json::buffer::Target;
use gltf_json::validation::Checked::Valid;

/// Accessor index returned by buffer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessorIndex(pub u32);

impl AccessorIndex {
    pub fn as_json_index(&self) -> json::Index<json::Accessor> {
        json::Index::new(self.0)
    }
}

/// Buffer view index for raw payloads such as embedded images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewIndex(pub u32);

impl ViewIndex {
    pub fn as_json_index(&self) -> json::Index<json::buffer::View> {
        json::Index::new(self.0)
    }
}

/// Accessor description shared by every `pack_*` helper
struct AccessorSpec {
    count: usize,
    component: ComponentType,
    type_: Type,
    normalized: bool,
    bounds: Option<(Vec<json::Value>, Vec<json::Value>)>,
}

/// Builder for binary buffer with automatic alignment
pub struct BufferBuilder {
    buffer: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl BufferBuilder {
    /// Create a new empty buffer builder
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            views: Vec::new(),
            accessors: Vec::new(),
        }
    }

    /// Get the current accessor count
    pub fn accessor_count(&self) -> u32 {
        self.accessors.len() as u32
    }

    /// Get the binary buffer data
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer views
    pub fn views(&self) -> &[json::buffer::View] {
        &self.views
    }

    /// Get the accessors
    pub fn accessors(&self) -> &[json::Accessor] {
        &self.accessors
    }

    fn push_view(&mut self, bytes: &[u8], stride: Option<usize>, target: Option<Target>) -> ViewIndex {
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(bytes);
        align_buffer(&mut self.buffer);

        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: bytes.len().into(),
            byte_offset: Some((offset as u64).into()),
            byte_stride: stride.map(json::buffer::Stride),
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: target.map(Valid),
        });

        ViewIndex(self.views.len() as u32 - 1)
    }

    fn push_accessor(&mut self, view: ViewIndex, spec: AccessorSpec) -> AccessorIndex {
        let (min, max) = match spec.bounds {
            Some((min, max)) => (Some(json::Value::Array(min)), Some(json::Value::Array(max))),
            None => (None, None),
        };

        self.accessors.push(json::Accessor {
            buffer_view: Some(view.as_json_index()),
            byte_offset: Some(0u64.into()),
            count: spec.count.into(),
            component_type: Valid(GenericComponentType(spec.component)),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(spec.type_),
            min,
            max,
            name: None,
            normalized: spec.normalized,
            sparse: None,
        });

        AccessorIndex(self.accessors.len() as u32 - 1)
    }

    fn pack_floats<const N: usize>(
        &mut self,
        data: &[[f32; N]],
        type_: Type,
        target: Option<Target>,
    ) -> AccessorIndex
    where
        [f32; N]: bytemuck::Pod,
    {
        let view = self.push_view(bytemuck::cast_slice(data), None, target);
        self.push_accessor(
            view,
            AccessorSpec {
                count: data.len(),
                component: ComponentType::F32,
                type_,
                normalized: false,
                bounds: None,
            },
        )
    }

    /// Pack float positions with bounds calculation
    pub fn pack_positions(&mut self, positions: &[[f32; 3]]) -> AccessorIndex {
        let view = self.push_view(
            bytemuck::cast_slice(positions),
            None,
            Some(Target::ArrayBuffer),
        );
        let (min, max) = compute_bounds(positions);
        self.push_accessor(
            view,
            AccessorSpec {
                count: positions.len(),
                component: ComponentType::F32,
                type_: Type::Vec3,
                normalized: false,
                bounds: Some((
                    min.into_iter().map(json::Value::from).collect(),
                    max.into_iter().map(json::Value::from).collect(),
                )),
            },
        )
    }

    /// Pack Vec3 float data (normals)
    pub fn pack_vec3(&mut self, data: &[[f32; 3]]) -> AccessorIndex {
        self.pack_floats(data, Type::Vec3, Some(Target::ArrayBuffer))
    }

    /// Pack Vec2 float data (UVs)
    pub fn pack_vec2(&mut self, data: &[[f32; 2]]) -> AccessorIndex {
        self.pack_floats(data, Type::Vec2, Some(Target::ArrayBuffer))
    }

    /// Pack Vec4 float data (colors)
    pub fn pack_vec4(&mut self, data: &[[f32; 4]]) -> AccessorIndex {
        self.pack_floats(data, Type::Vec4, Some(Target::ArrayBuffer))
    }

    /// Pack normalized i16 positions
    ///
    /// Vertex attributes must start on 4-byte boundaries, so each element is
    /// padded to 8 bytes. Bounds are written as raw integer values.
    pub fn pack_positions_i16(&mut self, positions: &[[i16; 3]]) -> AccessorIndex {
        let mut bytes = Vec::with_capacity(positions.len() * 8);
        let mut min = [i16::MAX; 3];
        let mut max = [i16::MIN; 3];
        for p in positions {
            for c in 0..3 {
                bytes.extend_from_slice(&p[c].to_le_bytes());
                min[c] = min[c].min(p[c]);
                max[c] = max[c].max(p[c]);
            }
            bytes.extend_from_slice(&[0, 0]);
        }
        if positions.is_empty() {
            min = [0; 3];
            max = [0; 3];
        }

        let view = self.push_view(&bytes, Some(8), Some(Target::ArrayBuffer));
        self.push_accessor(
            view,
            AccessorSpec {
                count: positions.len(),
                component: ComponentType::I16,
                type_: Type::Vec3,
                normalized: true,
                bounds: Some((
                    min.into_iter().map(json::Value::from).collect(),
                    max.into_iter().map(json::Value::from).collect(),
                )),
            },
        )
    }

    /// Pack normalized i8 normals, padded to 4 bytes per element
    pub fn pack_normals_i8(&mut self, normals: &[[i8; 3]]) -> AccessorIndex {
        let mut bytes = Vec::with_capacity(normals.len() * 4);
        for n in normals {
            bytes.extend(n.iter().map(|c| *c as u8));
            bytes.push(0);
        }

        let view = self.push_view(&bytes, Some(4), Some(Target::ArrayBuffer));
        self.push_accessor(
            view,
            AccessorSpec {
                count: normals.len(),
                component: ComponentType::I8,
                type_: Type::Vec3,
                normalized: true,
                bounds: None,
            },
        )
    }

    /// Pack normalized i16 normals, padded to 8 bytes per element
    pub fn pack_normals_i16(&mut self, normals: &[[i16; 3]]) -> AccessorIndex {
        let mut bytes = Vec::with_capacity(normals.len() * 8);
        for n in normals {
            for c in n {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
            bytes.extend_from_slice(&[0, 0]);
        }

        let view = self.push_view(&bytes, Some(8), Some(Target::ArrayBuffer));
        self.push_accessor(
            view,
            AccessorSpec {
                count: normals.len(),
                component: ComponentType::I16,
                type_: Type::Vec3,
                normalized: true,
                bounds: None,
            },
        )
    }

    /// Pack normalized u16 texture coordinates
    pub fn pack_uvs_u16(&mut self, uvs: &[[u16; 2]]) -> AccessorIndex {
        let view = self.push_view(bytemuck::cast_slice(uvs), None, Some(Target::ArrayBuffer));
        self.push_accessor(
            view,
            AccessorSpec {
                count: uvs.len(),
                component: ComponentType::U16,
                type_: Type::Vec2,
                normalized: true,
                bounds: None,
            },
        )
    }

    /// Pack normalized u8 RGBA colors
    pub fn pack_colors_u8(&mut self, colors: &[[u8; 4]]) -> AccessorIndex {
        let view = self.push_view(bytemuck::cast_slice(colors), None, Some(Target::ArrayBuffer));
        self.push_accessor(
            view,
            AccessorSpec {
                count: colors.len(),
                component: ComponentType::U8,
                type_: Type::Vec4,
                normalized: true,
                bounds: None,
            },
        )
    }

    /// Pack triangle indices using the narrowest component type that fits
    pub fn pack_indices(&mut self, indices: &[u32]) -> AccessorIndex {
        let max_index = indices.iter().copied().max().unwrap_or(0);

        let (bytes, component) = if max_index <= u8::MAX as u32 {
            (
                indices.iter().map(|i| *i as u8).collect::<Vec<u8>>(),
                ComponentType::U8,
            )
        } else if max_index <= u16::MAX as u32 {
            (
                indices.iter().flat_map(|i| (*i as u16).to_le_bytes()).collect(),
                ComponentType::U16,
            )
        } else {
            (
                indices.iter().flat_map(|i| i.to_le_bytes()).collect(),
                ComponentType::U32,
            )
        };

        let view = self.push_view(&bytes, None, Some(Target::ElementArrayBuffer));
        self.push_accessor(
            view,
            AccessorSpec {
                count: indices.len(),
                component,
                type_: Type::Scalar,
                normalized: false,
                bounds: None,
            },
        )
    }

    /// Pack animation keyframe times
    ///
    /// Sampler inputs must declare their range, so min and max are always written.
    pub fn pack_keyframe_times(&mut self, times: &[f32]) -> AccessorIndex {
        let view = self.push_view(bytemuck::cast_slice(times), None, None);
        let (min, max) = match times {
            [] => (0.0, 0.0),
            _ => times
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &t| {
                    (lo.min(t), hi.max(t))
                }),
        };
        self.push_accessor(
            view,
            AccessorSpec {
                count: times.len(),
                component: ComponentType::F32,
                type_: Type::Scalar,
                normalized: false,
                bounds: Some((vec![json::Value::from(min)], vec![json::Value::from(max)])),
            },
        )
    }

    /// Pack animation keyframe values (VEC3 translation/scale, VEC4 rotation)
    pub fn pack_keyframes<const N: usize>(&mut self, values: &[[f32; N]]) -> AccessorIndex
    where
        [f32; N]: bytemuck::Pod,
    {
        let type_ = match N {
            1 => Type::Scalar,
            2 => Type::Vec2,
            3 => Type::Vec3,
            _ => Type::Vec4,
        };
        self.pack_floats(values, type_, None)
    }

    /// Pack an encoded image payload; images reference views, not accessors
    pub fn pack_image(&mut self, data: &[u8]) -> ViewIndex {
        self.push_view(data, None, None)
    }
}

impl Default for BufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_builder_positions() {
        let mut builder = BufferBuilder::new();
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]];
        let idx = builder.pack_positions(&positions);

        assert_eq!(idx, AccessorIndex(0));
        assert_eq!(builder.accessor_count(), 1);
        assert_eq!(builder.views().len(), 1);
        // 3 positions * 12 bytes = 36 bytes, aligned to 4 = 36
        assert_eq!(builder.data().len(), 36);
    }

    #[test]
    fn test_indices_narrow_to_u8() {
        let mut builder = BufferBuilder::new();
        let idx = builder.pack_indices(&[0, 1, 2]);

        assert_eq!(idx, AccessorIndex(0));
        // 3 indices * 1 byte = 3 bytes, aligned to 4
        assert_eq!(builder.data().len(), 4);
        assert!(matches!(
            builder.accessors()[0].component_type,
            Valid(GenericComponentType(ComponentType::U8))
        ));
    }

    #[test]
    fn test_indices_widen_when_needed() {
        let mut builder = BufferBuilder::new();
        builder.pack_indices(&[0, 300, 2]);
        builder.pack_indices(&[0, 70_000, 2]);

        let accessors = builder.accessors();
        assert!(matches!(
            accessors[0].component_type,
            Valid(GenericComponentType(ComponentType::U16))
        ));
        assert!(matches!(
            accessors[1].component_type,
            Valid(GenericComponentType(ComponentType::U32))
        ));
        // 6 bytes padded to 8, then 12 bytes
        assert_eq!(builder.data().len(), 20);
    }

    #[test]
    fn test_quantized_positions_are_padded() {
        let mut builder = BufferBuilder::new();
        builder.pack_positions_i16(&[[-32767, 0, 5], [32767, 10, -5]]);

        let view = &builder.views()[0];
        assert_eq!(view.byte_stride, Some(json::buffer::Stride(8)));
        assert_eq!(builder.data().len(), 16);

        let accessor = &builder.accessors()[0];
        assert!(accessor.normalized);
        assert_eq!(
            accessor.min,
            Some(json::Value::from(vec![-32767, 0, -5]))
        );
        assert_eq!(accessor.max, Some(json::Value::from(vec![32767, 10, 5])));
    }

    #[test]
    fn test_image_view_has_no_target() {
        let mut builder = BufferBuilder::new();
        let view = builder.pack_image(&[1, 2, 3, 4, 5]);

        assert_eq!(view, ViewIndex(0));
        assert_eq!(builder.accessor_count(), 0);
        assert!(builder.views()[0].target.is_none());
        assert_eq!(builder.data().len(), 8);
    }

    #[test]
    fn test_keyframe_times_carry_range() {
        let mut builder = BufferBuilder::new();
        builder.pack_keyframe_times(&[0.5, 0.0, 2.0]);
        builder.pack_keyframes(&[[0.0f32, 0.0, 0.0, 1.0]; 3]);

        let times = &builder.accessors()[0];
        assert_eq!(times.min, Some(json::Value::from(vec![0.0f32])));
        assert_eq!(times.max, Some(json::Value::from(vec![2.0f32])));
        assert!(matches!(times.type_, Valid(Type::Scalar)));

        let values = &builder.accessors()[1];
        assert!(matches!(values.type_, Valid(Type::Vec4)));
        assert!(builder.views()[1].target.is_none());
    }
}
