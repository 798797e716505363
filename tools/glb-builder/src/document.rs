//! GLTF document construction

use crate::buffer::ViewIndex;
use crate::mesh::MeshAccessors;
use gltf_json as json;
use gltf_json::validation::Checked::Valid;
use std::collections::BTreeMap;

pub const KHR_MESH_QUANTIZATION: &str = "KHR_mesh_quantization";
pub const KHR_TEXTURE_BASISU: &str = "KHR_texture_basisu";

/// One primitive of a mesh: packed accessors plus an optional material
#[derive(Debug, Clone)]
pub struct PrimitiveSpec {
    pub accessors: MeshAccessors,
    pub material: Option<u32>,
}

/// Builder for complete GLTF documents
pub struct GltfBuilder {
    nodes: Vec<json::Node>,
    meshes: Vec<json::Mesh>,
    materials: Vec<json::Material>,
    textures: Vec<json::Texture>,
    images: Vec<json::Image>,
    samplers: Vec<json::texture::Sampler>,
    scenes: Vec<json::Scene>,
    cameras: Vec<json::Camera>,
    animations: Vec<json::Animation>,
    default_scene: Option<u32>,
    extensions_used: Vec<String>,
    extensions_required: Vec<String>,
    buffer_byte_length: u64,
    buffer_uri: Option<String>,
}

impl GltfBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            images: Vec::new(),
            samplers: Vec::new(),
            scenes: Vec::new(),
            cameras: Vec::new(),
            animations: Vec::new(),
            default_scene: None,
            extensions_used: Vec::new(),
            extensions_required: Vec::new(),
            buffer_byte_length: 0,
            buffer_uri: None,
        }
    }

    /// Set buffer byte length (required before building)
    pub fn buffer_byte_length(mut self, length: u64) -> Self {
        self.buffer_byte_length = length;
        self
    }

    /// Point the buffer at an external file instead of the GLB binary chunk
    pub fn buffer_uri(mut self, uri: Option<String>) -> Self {
        self.buffer_uri = uri;
        self
    }

    /// Add a node
    pub fn add_node(mut self, node: json::Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Get the current node count
    pub fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    /// Add a mesh made of triangle primitives
    pub fn add_mesh(mut self, name: Option<&str>, primitives: &[PrimitiveSpec]) -> Self {
        let primitives = primitives
            .iter()
            .map(|spec| {
                if spec.accessors.quantized {
                    self.require_extension(KHR_MESH_QUANTIZATION);
                }
                build_primitive(spec)
            })
            .collect();

        self.meshes.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: name.map(str::to_string),
            primitives,
            weights: None,
        });

        self
    }

    /// Add a material
    pub fn add_material(mut self, material: json::Material) -> Self {
        self.materials.push(material);
        self
    }

    /// Add a sampler
    pub fn add_sampler(mut self, sampler: json::texture::Sampler) -> Self {
        self.samplers.push(sampler);
        self
    }

    /// Add an image stored in a buffer view
    pub fn add_image(mut self, name: Option<&str>, view: ViewIndex, mime_type: &str) -> Self {
        self.images.push(json::Image {
            buffer_view: Some(view.as_json_index()),
            mime_type: Some(json::image::MimeType(mime_type.to_string())),
            name: name.map(str::to_string),
            uri: None,
            extensions: Default::default(),
            extras: Default::default(),
        });
        self
    }

    /// Add a texture
    ///
    /// With `basisu`, the image is also referenced through
    /// `KHR_texture_basisu` and the extension is marked required.
    pub fn add_texture(
        mut self,
        name: Option<&str>,
        image: u32,
        sampler: Option<u32>,
        basisu: bool,
    ) -> Self {
        let extensions = if basisu {
            self.require_extension(KHR_TEXTURE_BASISU);
            let mut others = serde_json::Map::new();
            others.insert(
                KHR_TEXTURE_BASISU.to_string(),
                serde_json::json!({ "source": image }),
            );
            Some(json::extensions::texture::Texture { others })
        } else {
            None
        };

        self.textures.push(json::Texture {
            name: name.map(str::to_string),
            sampler: sampler.map(json::Index::new),
            source: json::Index::new(image),
            extensions,
            extras: Default::default(),
        });
        self
    }

    /// Add a scene
    pub fn add_scene(mut self, name: Option<&str>, root_nodes: &[u32]) -> Self {
        self.scenes.push(json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: name.map(str::to_string),
            nodes: root_nodes.iter().map(|n| json::Index::new(*n)).collect(),
        });
        self
    }

    /// Add a camera
    pub fn add_camera(mut self, camera: json::Camera) -> Self {
        self.cameras.push(camera);
        self
    }

    /// Add an animation whose sampler accessors are already packed
    pub fn add_animation(mut self, animation: json::Animation) -> Self {
        self.animations.push(animation);
        self
    }

    /// Select the default scene (first scene when unset)
    pub fn default_scene(mut self, scene: Option<u32>) -> Self {
        self.default_scene = scene;
        self
    }

    /// Declare an extension as used
    pub fn use_extension(mut self, name: &str) -> Self {
        self.mark_used(name);
        self
    }

    fn mark_used(&mut self, name: &str) {
        if !self.extensions_used.iter().any(|e| e == name) {
            self.extensions_used.push(name.to_string());
        }
    }

    fn require_extension(&mut self, name: &str) {
        self.mark_used(name);
        if !self.extensions_required.iter().any(|e| e == name) {
            self.extensions_required.push(name.to_string());
        }
    }

    /// Build final GLTF Root (requires buffer views and accessors from BufferBuilder)
    pub fn build(
        self,
        buffer_views: &[json::buffer::View],
        accessors: &[json::Accessor],
        generator: &str,
    ) -> json::Root {
        // A zero-length buffer is invalid glTF; documents without data carry none
        let buffers = if self.buffer_byte_length == 0 {
            Vec::new()
        } else {
            vec![json::Buffer {
                byte_length: self.buffer_byte_length.into(),
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                uri: self.buffer_uri,
            }]
        };

        let scene = match self.default_scene {
            Some(index) => Some(json::Index::new(index)),
            None if !self.scenes.is_empty() => Some(json::Index::new(0)),
            None => None,
        };

        json::Root {
            accessors: accessors.to_vec(),
            animations: self.animations,
            asset: json::Asset {
                copyright: None,
                extensions: Default::default(),
                extras: Default::default(),
                generator: Some(generator.to_string()),
                min_version: None,
                version: "2.0".to_string(),
            },
            buffers,
            buffer_views: buffer_views.to_vec(),
            cameras: self.cameras,
            extensions_required: self.extensions_required,
            extensions_used: self.extensions_used,
            images: self.images,
            materials: self.materials,
            meshes: self.meshes,
            nodes: self.nodes,
            samplers: self.samplers,
            scene,
            scenes: self.scenes,
            textures: self.textures,
            ..Default::default()
        }
    }
}

impl Default for GltfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn build_primitive(spec: &PrimitiveSpec) -> json::mesh::Primitive {
    let accessors = &spec.accessors;
    let mut attributes = BTreeMap::new();
    attributes.insert(
        Valid(json::mesh::Semantic::Positions),
        accessors.positions.as_json_index(),
    );

    if let Some(normals) = accessors.normals {
        attributes.insert(
            Valid(json::mesh::Semantic::Normals),
            normals.as_json_index(),
        );
    }

    if let Some(uvs) = accessors.uvs {
        attributes.insert(
            Valid(json::mesh::Semantic::TexCoords(0)),
            uvs.as_json_index(),
        );
    }

    if let Some(colors) = accessors.colors {
        attributes.insert(
            Valid(json::mesh::Semantic::Colors(0)),
            colors.as_json_index(),
        );
    }

    json::mesh::Primitive {
        attributes,
        extensions: Default::default(),
        extras: Default::default(),
        indices: accessors.indices.map(|i| i.as_json_index()),
        material: spec.material.map(json::Index::new),
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
    }
}

/// Texture reference for material slots
pub fn texture_info(texture: u32, tex_coord: u32) -> json::texture::Info {
    json::texture::Info {
        index: json::Index::new(texture),
        tex_coord,
        extensions: Default::default(),
        extras: Default::default(),
    }
}
