//! glTF / GLB reader

use super::{
    AlphaMode, Animation, AnimationChannel, Camera, Document, Image, Keyframes, Material, Mesh,
    Node, Primitive, Projection, Sampler, Scene, Texture, TextureRef, sniff_mime_type,
};
use crate::error::DocumentError;
use glb_builder::{KHR_MESH_QUANTIZATION, KHR_TEXTURE_BASISU};
use gltf::accessor::{DataType, Dimensions};
use gltf::animation::{Interpolation, Property};
use gltf::mesh::Mode;
use gltf::{Semantic, json};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, warn};

/// Required extensions the loader understands beyond core glTF 2.0
pub const SUPPORTED_REQUIRED_EXTENSIONS: &[&str] = &[KHR_MESH_QUANTIZATION, KHR_TEXTURE_BASISU];

/// Load a `.gltf` or `.glb` file; external buffers and images resolve next to it
pub fn load(path: &Path) -> Result<Document, DocumentError> {
    let bytes = std::fs::read(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or(Path::new("."));
    load_slice(&bytes, Some(base))
}

/// Parse a document from memory
///
/// Without `base`, only embedded or `data:` resources can be resolved.
pub fn load_slice(bytes: &[u8], base: Option<&Path>) -> Result<Document, DocumentError> {
    let (json_bytes, blob): (Cow<'_, [u8]>, Option<Vec<u8>>) = if bytes.starts_with(b"glTF") {
        let glb = gltf::Glb::from_slice(bytes)?;
        (
            Cow::Owned(glb.json.into_owned()),
            glb.bin.map(|b| b.into_owned()),
        )
    } else {
        (Cow::Borrowed(bytes), None)
    };

    let mut root: json::Root =
        json::deserialize::from_slice(&json_bytes).map_err(gltf::Error::from)?;

    // Validation rejects every required extension it does not implement itself
    let required = std::mem::take(&mut root.extensions_required);
    if let Some(ext) = required
        .iter()
        .find(|e| !SUPPORTED_REQUIRED_EXTENSIONS.contains(&e.as_str()))
    {
        return Err(DocumentError::Unsupported(format!(
            "required extension {ext}"
        )));
    }

    let gltf = gltf::Document::from_json(root)?;

    // Joint and weight attributes are not carried, so a skin would lose its binding
    if gltf.skins().next().is_some() {
        return Err(DocumentError::Unsupported("skinned meshes".to_string()));
    }

    let buffers = gltf::import_buffers(&gltf, base, blob)?;

    let mut document = Document {
        generator: gltf.as_json().asset.generator.clone(),
        extensions_used: gltf
            .extensions_used()
            .map(str::to_string)
            .collect(),
        extensions_required: required,
        ..Default::default()
    };

    for node in gltf.nodes() {
        let (translation, rotation, scale) = node.transform().decomposed();
        document.nodes.push(Node {
            name: node.name().map(str::to_string),
            translation,
            rotation,
            scale,
            mesh: node.mesh().map(|m| m.index()),
            camera: node.camera().map(|c| c.index()),
            children: node.children().map(|c| c.index()).collect(),
        });
    }

    for mesh in gltf.meshes() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            primitives.push(read_primitive(&primitive, &buffers).map_err(|e| match e {
                DocumentError::Unsupported(msg) => DocumentError::Unsupported(format!(
                    "mesh {} primitive {}: {msg}",
                    mesh.index(),
                    primitive.index()
                )),
                other => other,
            })?);
        }
        document.meshes.push(Mesh {
            name: mesh.name().map(str::to_string),
            primitives,
        });
    }

    document.materials = gltf.materials().map(read_material).collect();

    document.samplers = gltf
        .samplers()
        .map(|s| Sampler {
            name: s.name().map(str::to_string),
            mag_filter: s.mag_filter(),
            min_filter: s.min_filter(),
            wrap_s: s.wrap_s(),
            wrap_t: s.wrap_t(),
        })
        .collect();

    for texture in gltf.textures() {
        let basisu_source = texture
            .extension_value(KHR_TEXTURE_BASISU)
            .and_then(|ext| ext.get("source"))
            .and_then(|s| s.as_u64())
            .map(|s| s as usize);

        let image = basisu_source.unwrap_or_else(|| texture.source().index());
        if image >= gltf.as_json().images.len() {
            return Err(DocumentError::Unsupported(format!(
                "texture {} references missing image {image}",
                texture.index()
            )));
        }

        document.textures.push(Texture {
            name: texture.name().map(str::to_string),
            image,
            sampler: texture.sampler().index(),
            basisu: basisu_source.is_some(),
        });
    }

    for image in gltf.images() {
        document.images.push(read_image(&image, &buffers, base)?);
    }

    document.scenes = gltf
        .scenes()
        .map(|s| Scene {
            name: s.name().map(str::to_string),
            nodes: s.nodes().map(|n| n.index()).collect(),
        })
        .collect();
    document.default_scene = gltf.default_scene().map(|s| s.index());

    document.cameras = gltf.cameras().map(read_camera).collect();

    for animation in gltf.animations() {
        let mut channels = Vec::new();
        for channel in animation.channels() {
            if let Some(channel) = read_channel(&channel, &buffers)? {
                channels.push(channel);
            }
        }
        if !channels.is_empty() {
            document.animations.push(Animation {
                name: animation.name().map(str::to_string),
                channels,
            });
        }
    }

    debug!(
        "Loaded document: {} nodes, {} meshes, {} materials, {} images, {} animations",
        document.nodes.len(),
        document.meshes.len(),
        document.materials.len(),
        document.images.len(),
        document.animations.len()
    );

    Ok(document)
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<Primitive, DocumentError> {
    if !matches!(primitive.mode(), Mode::Triangles) {
        return Err(DocumentError::Unsupported(format!(
            "primitive mode {:?}",
            primitive.mode()
        )));
    }

    for (semantic, _) in primitive.attributes() {
        let handled = matches!(
            semantic,
            Semantic::Positions | Semantic::Normals | Semantic::TexCoords(0) | Semantic::Colors(0)
        );
        if !handled {
            warn!("Dropping unsupported attribute {:?}", semantic);
        }
    }
    let targets = primitive.morph_targets().count();
    if targets > 0 {
        warn!("Dropping {} morph targets", targets);
    }

    let positions = primitive
        .get(&Semantic::Positions)
        .ok_or_else(|| DocumentError::Unsupported("primitive without POSITION".to_string()))?;
    let positions: Vec<[f32; 3]> = read_vectors(&positions, buffers)?;
    let vertex_count = positions.len();

    let normals = primitive
        .get(&Semantic::Normals)
        .map(|a| read_vectors::<3>(&a, buffers))
        .transpose()?;
    let uvs = primitive
        .get(&Semantic::TexCoords(0))
        .map(|a| read_vectors::<2>(&a, buffers))
        .transpose()?;
    let colors = primitive
        .get(&Semantic::Colors(0))
        .map(|a| read_colors(&a, buffers))
        .transpose()?;

    for (label, len) in [
        ("NORMAL", normals.as_ref().map(Vec::len)),
        ("TEXCOORD_0", uvs.as_ref().map(Vec::len)),
        ("COLOR_0", colors.as_ref().map(Vec::len)),
    ] {
        if let Some(len) = len
            && len != vertex_count
        {
            return Err(DocumentError::Unsupported(format!(
                "{label} has {len} entries for {vertex_count} vertices"
            )));
        }
    }

    let indices = match primitive.indices() {
        Some(accessor) => {
            let indices = read_indices(&accessor, buffers)?;
            if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(DocumentError::Unsupported(format!(
                    "index {bad} out of range for {vertex_count} vertices"
                )));
            }
            Some(indices)
        }
        None => None,
    };

    Ok(Primitive {
        positions,
        normals,
        uvs,
        colors,
        indices,
        material: primitive.material().index(),
        quantization: None,
    })
}

/// Byte slice and stride backing an accessor, bounds-checked
fn accessor_bytes<'a>(
    accessor: &gltf::Accessor<'_>,
    buffers: &'a [gltf::buffer::Data],
) -> Result<Option<(&'a [u8], usize)>, DocumentError> {
    if accessor.sparse().is_some() {
        return Err(DocumentError::Unsupported(format!(
            "sparse accessor {}",
            accessor.index()
        )));
    }

    let Some(view) = accessor.view() else {
        return Ok(None);
    };

    let element_size = accessor.size();
    let stride = view.stride().unwrap_or(element_size);
    let buffer = buffers
        .get(view.buffer().index())
        .map(|b| b.0.as_slice())
        .unwrap_or_default();
    let view_end = view.offset() + view.length();
    let start = view.offset() + accessor.offset();
    let needed = match accessor.count() {
        0 => 0,
        n => (n - 1) * stride + element_size,
    };

    if view_end > buffer.len() || start + needed > view_end {
        return Err(DocumentError::Unsupported(format!(
            "accessor {} exceeds its buffer view",
            accessor.index()
        )));
    }

    Ok(Some((&buffer[start..view_end], stride)))
}

/// Decode one component to `f32`, honoring the normalized flag
fn decode_component(bytes: &[u8], data_type: DataType, normalized: bool) -> f32 {
    match data_type {
        DataType::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        DataType::I8 => {
            let v = bytes[0] as i8 as f32;
            if normalized { (v / 127.0).max(-1.0) } else { v }
        }
        DataType::U8 => {
            let v = bytes[0] as f32;
            if normalized { v / 255.0 } else { v }
        }
        DataType::I16 => {
            let v = i16::from_le_bytes([bytes[0], bytes[1]]) as f32;
            if normalized { (v / 32767.0).max(-1.0) } else { v }
        }
        DataType::U16 => {
            let v = u16::from_le_bytes([bytes[0], bytes[1]]) as f32;
            if normalized { v / 65535.0 } else { v }
        }
        DataType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
    }
}

/// Read an N-component float attribute from any component type
fn read_vectors<const N: usize>(
    accessor: &gltf::Accessor<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<[f32; N]>, DocumentError> {
    if accessor.dimensions().multiplicity() != N {
        return Err(DocumentError::Unsupported(format!(
            "accessor {} is {:?}, expected {N} components",
            accessor.index(),
            accessor.dimensions()
        )));
    }

    let count = accessor.count();
    let Some((bytes, stride)) = accessor_bytes(accessor, buffers)? else {
        return Ok(vec![[0.0; N]; count]);
    };

    let data_type = accessor.data_type();
    let component = data_type.size();
    let normalized = accessor.normalized();

    let mut values = Vec::with_capacity(count);
    for i in 0..count {
        let mut v = [0.0f32; N];
        for (j, out) in v.iter_mut().enumerate() {
            let at = i * stride + j * component;
            *out = decode_component(&bytes[at..at + component], data_type, normalized);
        }
        values.push(v);
    }
    Ok(values)
}

/// Vertex colors may be RGB or RGBA; RGB gets opaque alpha
fn read_colors(
    accessor: &gltf::Accessor<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<[f32; 4]>, DocumentError> {
    match accessor.dimensions() {
        Dimensions::Vec3 => Ok(read_vectors::<3>(accessor, buffers)?
            .into_iter()
            .map(|[r, g, b]| [r, g, b, 1.0])
            .collect()),
        _ => read_vectors::<4>(accessor, buffers),
    }
}

fn read_indices(
    accessor: &gltf::Accessor<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<u32>, DocumentError> {
    let data_type = accessor.data_type();
    if !matches!(data_type, DataType::U8 | DataType::U16 | DataType::U32)
        || !matches!(accessor.dimensions(), Dimensions::Scalar)
    {
        return Err(DocumentError::Unsupported(format!(
            "index accessor {} is {:?} {:?}",
            accessor.index(),
            data_type,
            accessor.dimensions()
        )));
    }

    let count = accessor.count();
    let Some((bytes, stride)) = accessor_bytes(accessor, buffers)? else {
        return Ok(vec![0; count]);
    };

    Ok((0..count)
        .map(|i| {
            let at = i * stride;
            match data_type {
                DataType::U8 => bytes[at] as u32,
                DataType::U16 => u16::from_le_bytes([bytes[at], bytes[at + 1]]) as u32,
                _ => u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]),
            }
        })
        .collect())
}

fn read_camera(camera: gltf::Camera<'_>) -> Camera {
    let projection = match camera.projection() {
        gltf::camera::Projection::Perspective(p) => Projection::Perspective {
            aspect_ratio: p.aspect_ratio(),
            yfov: p.yfov(),
            zfar: p.zfar(),
            znear: p.znear(),
        },
        gltf::camera::Projection::Orthographic(o) => Projection::Orthographic {
            xmag: o.xmag(),
            ymag: o.ymag(),
            zfar: o.zfar(),
            znear: o.znear(),
        },
    };
    Camera {
        name: camera.name().map(str::to_string),
        projection,
    }
}

/// Decode one channel and its sampler; morph weight channels are dropped
/// along with the morph targets they drive
fn read_channel(
    channel: &gltf::animation::Channel<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<Option<AnimationChannel>, DocumentError> {
    let target = channel.target();
    let sampler = channel.sampler();
    let output = sampler.output();

    let values = match target.property() {
        Property::Translation => Keyframes::Translation(read_vectors(&output, buffers)?),
        Property::Rotation => Keyframes::Rotation(read_vectors(&output, buffers)?),
        Property::Scale => Keyframes::Scale(read_vectors(&output, buffers)?),
        Property::MorphTargetWeights => {
            warn!(
                "Dropping morph weight channel {} of animation {}",
                channel.index(),
                channel.animation().index()
            );
            return Ok(None);
        }
    };

    let times: Vec<f32> = read_vectors::<1>(&sampler.input(), buffers)?
        .into_iter()
        .map(|[t]| t)
        .collect();

    let interpolation = sampler.interpolation();
    let per_key = match interpolation {
        Interpolation::CubicSpline => 3,
        Interpolation::Linear | Interpolation::Step => 1,
    };
    if values.len() != times.len() * per_key {
        return Err(DocumentError::Unsupported(format!(
            "animation {} channel {} has {} values for {} keyframes",
            channel.animation().index(),
            channel.index(),
            values.len(),
            times.len()
        )));
    }

    Ok(Some(AnimationChannel {
        node: target.node().index(),
        interpolation,
        times,
        values,
    }))
}

fn texture_ref(texture: gltf::Texture<'_>, tex_coord: u32) -> TextureRef {
    TextureRef {
        texture: texture.index(),
        tex_coord,
    }
}

fn read_material(material: gltf::Material<'_>) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let normal = material.normal_texture();
    let occlusion = material.occlusion_texture();

    Material {
        name: material.name().map(str::to_string),
        base_color_factor: pbr.base_color_factor(),
        base_color_texture: pbr
            .base_color_texture()
            .map(|i| texture_ref(i.texture(), i.tex_coord())),
        metallic_factor: pbr.metallic_factor(),
        roughness_factor: pbr.roughness_factor(),
        metallic_roughness_texture: pbr
            .metallic_roughness_texture()
            .map(|i| texture_ref(i.texture(), i.tex_coord())),
        normal_scale: normal.as_ref().map(|n| n.scale()).unwrap_or(1.0),
        normal_texture: normal.map(|n| texture_ref(n.texture(), n.tex_coord())),
        occlusion_strength: occlusion.as_ref().map(|o| o.strength()).unwrap_or(1.0),
        occlusion_texture: occlusion.map(|o| texture_ref(o.texture(), o.tex_coord())),
        emissive_texture: material
            .emissive_texture()
            .map(|i| texture_ref(i.texture(), i.tex_coord())),
        emissive_factor: material.emissive_factor(),
        alpha_mode: match material.alpha_mode() {
            gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf::material::AlphaMode::Mask => AlphaMode::Mask,
            gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        },
        alpha_cutoff: material.alpha_cutoff(),
        double_sided: material.double_sided(),
    }
}

fn read_image(
    image: &gltf::Image<'_>,
    buffers: &[gltf::buffer::Data],
    base: Option<&Path>,
) -> Result<Image, DocumentError> {
    let (data, declared) = match image.source() {
        gltf::image::Source::View { view, mime_type } => {
            let buffer = buffers
                .get(view.buffer().index())
                .map(|b| b.0.as_slice())
                .unwrap_or_default();
            let end = view.offset() + view.length();
            if end > buffer.len() {
                return Err(DocumentError::Unsupported(format!(
                    "image {} exceeds its buffer",
                    image.index()
                )));
            }
            (buffer[view.offset()..end].to_vec(), Some(mime_type))
        }
        gltf::image::Source::Uri { uri, mime_type } => (read_uri(uri, base)?, mime_type),
    };

    let mime_type = declared
        .map(str::to_string)
        .or_else(|| sniff_mime_type(&data).map(str::to_string))
        .ok_or_else(|| {
            DocumentError::Unsupported(format!("image {} has unknown format", image.index()))
        })?;

    Ok(Image {
        name: image.name().map(str::to_string),
        mime_type,
        data,
    })
}

/// Read an image URI: `data:` payloads inline, anything else relative to `base`
fn read_uri(uri: &str, base: Option<&Path>) -> Result<Vec<u8>, DocumentError> {
    if let Some(rest) = uri.strip_prefix("data:") {
        let (_, payload) = rest.split_once(";base64,").ok_or_else(|| {
            DocumentError::Unsupported("data URI without base64 payload".to_string())
        })?;
        let mut data = gltf::buffer::Data::from_source(gltf::buffer::Source::Uri(uri), None)?.0;
        // Buffer loading pads to four bytes; trim back to the decoded length
        let padding = payload.bytes().rev().take_while(|&b| b == b'=').count();
        data.truncate((payload.len() - padding) * 3 / 4);
        return Ok(data);
    }

    let base = base.ok_or_else(|| {
        DocumentError::Unsupported(format!("external image {uri} without a base directory"))
    })?;
    let path = base.join(percent_decode(uri));
    std::fs::read(&path).map_err(|source| DocumentError::Read { path, source })
}

fn percent_decode(uri: &str) -> String {
    let bytes = uri.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let Some(byte) = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
        {
            out.push(byte);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_normalized_components() {
        assert_eq!(decode_component(&[127], DataType::I8, true), 1.0);
        assert_eq!(decode_component(&[0x80], DataType::I8, true), -1.0);
        assert_eq!(decode_component(&[255], DataType::U8, true), 1.0);
        assert_eq!(decode_component(&[255], DataType::U8, false), 255.0);
        assert_eq!(
            decode_component(&32767i16.to_le_bytes(), DataType::I16, true),
            1.0
        );
        assert_eq!(
            decode_component(&65535u16.to_le_bytes(), DataType::U16, true),
            1.0
        );
        assert_eq!(
            decode_component(&1.5f32.to_le_bytes(), DataType::F32, false),
            1.5
        );
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("my%20texture.png"), "my texture.png");
        assert_eq!(percent_decode("plain.png"), "plain.png");
        assert_eq!(percent_decode("bad%2"), "bad%2");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(load_slice(b"definitely not gltf", None).is_err());
        assert!(load_slice(b"glTF\x02\x00\x00\x00", None).is_err());
    }

    #[test]
    fn test_rejects_unknown_required_extension() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "extensionsUsed": ["EXT_meshopt_compression"],
            "extensionsRequired": ["EXT_meshopt_compression"]
        }"#;
        let result = load_slice(json, None);
        assert!(matches!(result, Err(DocumentError::Unsupported(_))));
    }

    #[test]
    fn test_accepts_quantization_extension() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "extensionsUsed": ["KHR_mesh_quantization"],
            "extensionsRequired": ["KHR_mesh_quantization"]
        }"#;
        let doc = load_slice(json, None).unwrap();
        assert_eq!(doc.extensions_required, vec![KHR_MESH_QUANTIZATION.to_string()]);
    }

    #[test]
    fn test_data_uri_image_keeps_exact_length() {
        // "iVBORw0KGgo=" is the 8-byte PNG signature
        let json = br#"{
            "asset": {"version": "2.0"},
            "images": [{"uri": "data:image/png;base64,iVBORw0KGgo="}]
        }"#;
        let doc = load_slice(json, None).unwrap();
        assert_eq!(doc.images[0].data, b"\x89PNG\r\n\x1a\n");
        assert_eq!(doc.images[0].mime_type, "image/png");
    }
}
