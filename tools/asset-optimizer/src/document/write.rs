//! Document serialization through `glb-builder`

use super::{
    Animation, AlphaMode, Camera, Document, Keyframes, Material, Primitive, Projection, TextureRef,
};
use crate::error::DocumentError;
use glb_builder::json;
use glb_builder::{
    BufferBuilder, Colors, GltfBuilder, KHR_MESH_QUANTIZATION, KHR_TEXTURE_BASISU, MeshAccessors,
    MeshBuilder, Normals, Positions, PrimitiveSpec, TexCoords, Valid, sidecar_bin_name,
    texture_info, write_glb, write_gltf,
};
use std::path::Path;

const GENERATOR: &str = concat!("asset-optimizer ", env!("CARGO_PKG_VERSION"));

/// Write `document` as `.gltf` + `.bin` when the path says so, GLB otherwise
///
/// Returns the number of bytes written across all files.
pub fn write(document: &Document, path: &Path) -> Result<u64, DocumentError> {
    let text = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("gltf"));

    let (root, data) = to_gltf(document, text.then(|| sidecar_bin_name(path)));
    let size = if text {
        write_gltf(path, &root, &data)?
    } else {
        write_glb(path, &root, &data)?
    };
    Ok(size)
}

/// Build glTF JSON and the packed binary buffer for a document
pub fn to_gltf(document: &Document, buffer_uri: Option<String>) -> (json::Root, Vec<u8>) {
    let mut buffer = BufferBuilder::new();
    let mut builder = GltfBuilder::new();

    // Extensions the builder derives from content are not carried over
    for ext in &document.extensions_used {
        if ext != KHR_MESH_QUANTIZATION && ext != KHR_TEXTURE_BASISU {
            builder = builder.use_extension(ext);
        }
    }

    for mesh in &document.meshes {
        let primitives: Vec<PrimitiveSpec> = mesh
            .primitives
            .iter()
            .map(|p| PrimitiveSpec {
                accessors: pack_primitive(p, &mut buffer),
                material: p.material.map(|m| m as u32),
            })
            .collect();
        builder = builder.add_mesh(mesh.name.as_deref(), &primitives);
    }

    for node in &document.nodes {
        builder = builder.add_node(json::Node {
            name: node.name.clone(),
            mesh: node.mesh.map(|m| json::Index::new(m as u32)),
            camera: node.camera.map(|c| json::Index::new(c as u32)),
            children: (!node.children.is_empty())
                .then(|| node.children.iter().map(|&c| json::Index::new(c as u32)).collect()),
            translation: (node.translation != [0.0; 3]).then_some(node.translation),
            rotation: (node.rotation != [0.0, 0.0, 0.0, 1.0])
                .then_some(json::scene::UnitQuaternion(node.rotation)),
            scale: (node.scale != [1.0; 3]).then_some(node.scale),
            ..Default::default()
        });
    }

    for material in &document.materials {
        builder = builder.add_material(material_json(material));
    }

    for sampler in &document.samplers {
        builder = builder.add_sampler(json::texture::Sampler {
            name: sampler.name.clone(),
            mag_filter: sampler.mag_filter.map(Valid),
            min_filter: sampler.min_filter.map(Valid),
            wrap_s: Valid(sampler.wrap_s),
            wrap_t: Valid(sampler.wrap_t),
            ..Default::default()
        });
    }

    for image in &document.images {
        let view = buffer.pack_image(&image.data);
        builder = builder.add_image(image.name.as_deref(), view, &image.mime_type);
    }

    for texture in &document.textures {
        builder = builder.add_texture(
            texture.name.as_deref(),
            texture.image as u32,
            texture.sampler.map(|s| s as u32),
            texture.basisu,
        );
    }

    for camera in &document.cameras {
        builder = builder.add_camera(camera_json(camera));
    }

    for animation in &document.animations {
        builder = builder.add_animation(pack_animation(animation, &mut buffer));
    }

    for scene in &document.scenes {
        let roots: Vec<u32> = scene.nodes.iter().map(|&n| n as u32).collect();
        builder = builder.add_scene(scene.name.as_deref(), &roots);
    }

    let root = builder
        .default_scene(document.default_scene.map(|s| s as u32))
        .buffer_byte_length(buffer.data().len() as u64)
        .buffer_uri(buffer_uri)
        .build(buffer.views(), buffer.accessors(), GENERATOR);

    (root, buffer.data().to_vec())
}

fn snorm16(v: f32) -> i16 {
    (v.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

fn snorm8(v: f32) -> i8 {
    (v.clamp(-1.0, 1.0) * 127.0).round() as i8
}

fn unorm16(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * 65535.0).round() as u16
}

fn unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn pack_primitive(primitive: &Primitive, buffer: &mut BufferBuilder) -> MeshAccessors {
    let mut mesh = MeshBuilder::new();

    match primitive.quantization {
        Some(q) => {
            mesh = mesh.position_stream(Positions::Snorm16(
                primitive.positions.iter().map(|p| p.map(snorm16)).collect(),
            ));

            if let Some(normals) = &primitive.normals {
                mesh = mesh.normal_stream(if q.normal_bits <= 8 {
                    Normals::Snorm8(normals.iter().map(|n| n.map(snorm8)).collect())
                } else {
                    Normals::Snorm16(normals.iter().map(|n| n.map(snorm16)).collect())
                });
            }

            // Normalized texcoords only cover [0, 1]; wrapped UVs stay float
            if let Some(uvs) = &primitive.uvs {
                let in_unit_range = uvs.iter().flatten().all(|v| (0.0..=1.0).contains(v));
                mesh = mesh.uv_stream(if in_unit_range && q.texcoord_bits <= 16 {
                    TexCoords::Unorm16(uvs.iter().map(|uv| uv.map(unorm16)).collect())
                } else {
                    TexCoords::Float(uvs.clone())
                });
            }

            if let Some(colors) = &primitive.colors {
                mesh = mesh.color_stream(if q.color_bits <= 8 {
                    Colors::Unorm8(colors.iter().map(|c| c.map(unorm8)).collect())
                } else {
                    Colors::Float(colors.clone())
                });
            }
        }
        None => {
            mesh = mesh.positions(&primitive.positions);
            if let Some(normals) = &primitive.normals {
                mesh = mesh.normals(normals);
            }
            if let Some(uvs) = &primitive.uvs {
                mesh = mesh.uvs(uvs);
            }
            if let Some(colors) = &primitive.colors {
                mesh = mesh.color_stream(Colors::Float(colors.clone()));
            }
        }
    }

    if let Some(indices) = &primitive.indices {
        mesh = mesh.indices(indices);
    }

    mesh.build(buffer)
}

fn camera_json(camera: &Camera) -> json::Camera {
    let (type_, perspective, orthographic) = match camera.projection {
        Projection::Perspective {
            aspect_ratio,
            yfov,
            zfar,
            znear,
        } => (
            json::camera::Type::Perspective,
            Some(json::camera::Perspective {
                aspect_ratio,
                yfov,
                zfar,
                znear,
                extensions: Default::default(),
                extras: Default::default(),
            }),
            None,
        ),
        Projection::Orthographic {
            xmag,
            ymag,
            zfar,
            znear,
        } => (
            json::camera::Type::Orthographic,
            None,
            Some(json::camera::Orthographic {
                xmag,
                ymag,
                zfar,
                znear,
                extensions: Default::default(),
                extras: Default::default(),
            }),
        ),
    };

    json::Camera {
        name: camera.name.clone(),
        orthographic,
        perspective,
        type_: Valid(type_),
        extensions: Default::default(),
        extras: Default::default(),
    }
}

/// One sampler per channel, in channel order
fn pack_animation(animation: &Animation, buffer: &mut BufferBuilder) -> json::Animation {
    use json::animation::{Channel, Property, Sampler, Target};

    let mut channels = Vec::with_capacity(animation.channels.len());
    let mut samplers = Vec::with_capacity(animation.channels.len());

    for (i, channel) in animation.channels.iter().enumerate() {
        let input = buffer.pack_keyframe_times(&channel.times);
        let (output, path) = match &channel.values {
            Keyframes::Translation(v) => (buffer.pack_keyframes(v), Property::Translation),
            Keyframes::Rotation(v) => (buffer.pack_keyframes(v), Property::Rotation),
            Keyframes::Scale(v) => (buffer.pack_keyframes(v), Property::Scale),
        };

        samplers.push(Sampler {
            input: input.as_json_index(),
            output: output.as_json_index(),
            interpolation: Valid(channel.interpolation),
            extensions: Default::default(),
            extras: Default::default(),
        });
        channels.push(Channel {
            sampler: json::Index::new(i as u32),
            target: Target {
                node: json::Index::new(channel.node as u32),
                path: Valid(path),
                extensions: Default::default(),
                extras: Default::default(),
            },
            extensions: Default::default(),
            extras: Default::default(),
        });
    }

    json::Animation {
        name: animation.name.clone(),
        channels,
        samplers,
        extensions: Default::default(),
        extras: Default::default(),
    }
}

fn info(texture: &Option<TextureRef>) -> Option<json::texture::Info> {
    texture.map(|r| texture_info(r.texture as u32, r.tex_coord))
}

fn material_json(material: &Material) -> json::Material {
    json::Material {
        name: material.name.clone(),
        pbr_metallic_roughness: json::material::PbrMetallicRoughness {
            base_color_factor: json::material::PbrBaseColorFactor(material.base_color_factor),
            base_color_texture: info(&material.base_color_texture),
            metallic_factor: json::material::StrengthFactor(material.metallic_factor),
            roughness_factor: json::material::StrengthFactor(material.roughness_factor),
            metallic_roughness_texture: info(&material.metallic_roughness_texture),
            ..Default::default()
        },
        normal_texture: material
            .normal_texture
            .map(|r| json::material::NormalTexture {
                index: json::Index::new(r.texture as u32),
                scale: material.normal_scale,
                tex_coord: r.tex_coord,
                extensions: Default::default(),
                extras: Default::default(),
            }),
        occlusion_texture: material
            .occlusion_texture
            .map(|r| json::material::OcclusionTexture {
                index: json::Index::new(r.texture as u32),
                strength: json::material::StrengthFactor(material.occlusion_strength),
                tex_coord: r.tex_coord,
                extensions: Default::default(),
                extras: Default::default(),
            }),
        emissive_texture: info(&material.emissive_texture),
        emissive_factor: json::material::EmissiveFactor(material.emissive_factor),
        alpha_mode: Valid(match material.alpha_mode {
            AlphaMode::Opaque => json::material::AlphaMode::Opaque,
            AlphaMode::Mask => json::material::AlphaMode::Mask,
            AlphaMode::Blend => json::material::AlphaMode::Blend,
        }),
        alpha_cutoff: material.alpha_cutoff.map(json::material::AlphaCutoff),
        double_sided: material.double_sided,
        ..Default::default()
    }
}
