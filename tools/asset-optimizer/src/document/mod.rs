//! In-memory glTF document
//!
//! The compressor's transforms operate on this graph rather than on raw
//! glTF JSON. Vertex attributes are always held decoded as `f32`; how they
//! are stored on disk is decided by each primitive's [`Quantization`] when
//! the document is written.
//!
//! References between objects are plain indices into the owning vectors.
//! Transforms that remove objects go through [`Remap`] so every reference is
//! rewritten in one place.

mod load;
mod write;

pub use load::{SUPPORTED_REQUIRED_EXTENSIONS, load, load_slice};
pub use write::{to_gltf, write};

use gltf::animation::Interpolation;
use gltf::texture::{MagFilter, MinFilter, WrappingMode};

/// MIME type of KTX2 containers
pub const KTX2_MIME: &str = "image/ktx2";

/// KTX2 file identifier
const KTX2_MAGIC: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x32, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub generator: Option<String>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub samplers: Vec<Sampler>,
    pub images: Vec<Image>,
    pub scenes: Vec<Scene>,
    pub cameras: Vec<Camera>,
    pub animations: Vec<Animation>,
    pub default_scene: Option<usize>,
    pub extensions_used: Vec<String>,
    pub extensions_required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
    pub mesh: Option<usize>,
    pub camera: Option<usize>,
    pub children: Vec<usize>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: None,
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
            mesh: None,
            camera: None,
            children: Vec::new(),
        }
    }
}

impl Node {
    pub fn with_mesh(name: Option<String>, mesh: usize, translation: [f32; 3]) -> Self {
        Self {
            name,
            translation,
            mesh: Some(mesh),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

/// Storage precision for a primitive's attributes, in bits per component
///
/// Positions of a quantized primitive are normalized to `[-1, 1]`; the
/// owning node carries the transform back to model space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantization {
    pub position_bits: u8,
    pub normal_bits: u8,
    pub texcoord_bits: u8,
    pub color_bits: u8,
}

/// One triangle-list primitive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Primitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub indices: Option<Vec<u32>>,
    pub material: Option<usize>,
    pub quantization: Option<Quantization>,
}

impl Primitive {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Index list, synthesizing `0..n` for non-indexed primitives
    pub fn triangle_indices(&self) -> Vec<u32> {
        match &self.indices {
            Some(indices) => indices.clone(),
            None => (0..self.positions.len() as u32).collect(),
        }
    }

    /// Keep only the listed vertices, in order
    pub fn gather_vertices(&mut self, order: &[u32]) {
        fn gather<T: Copy>(data: &[T], order: &[u32]) -> Vec<T> {
            order.iter().map(|&i| data[i as usize]).collect()
        }

        self.positions = gather(&self.positions, order);
        if let Some(normals) = &mut self.normals {
            *normals = gather(normals, order);
        }
        if let Some(uvs) = &mut self.uvs {
            *uvs = gather(uvs, order);
        }
        if let Some(colors) = &mut self.colors {
            *colors = gather(colors, order);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRef {
    pub texture: usize,
    pub tex_coord: u32,
}

/// Metallic-roughness PBR material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<TextureRef>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
    pub normal_scale: f32,
    pub occlusion_texture: Option<TextureRef>,
    pub occlusion_strength: f32,
    pub emissive_texture: Option<TextureRef>,
    pub emissive_factor: [f32; 3],
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: Option<f32>,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color_factor: [1.0; 4],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            normal_texture: None,
            normal_scale: 1.0,
            occlusion_texture: None,
            occlusion_strength: 1.0,
            emissive_texture: None,
            emissive_factor: [0.0; 3],
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: None,
            double_sided: false,
        }
    }
}

impl Material {
    pub fn texture_refs(&self) -> impl Iterator<Item = &TextureRef> {
        [
            &self.base_color_texture,
            &self.metallic_roughness_texture,
            &self.normal_texture,
            &self.occlusion_texture,
            &self.emissive_texture,
        ]
        .into_iter()
        .flatten()
    }

    /// Equality ignoring the name
    pub fn same_content(&self, other: &Material) -> bool {
        Material {
            name: None,
            ..self.clone()
        } == Material {
            name: None,
            ..other.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: Option<String>,
    pub image: usize,
    pub sampler: Option<usize>,
    /// Referenced through `KHR_texture_basisu`
    pub basisu: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sampler {
    pub name: Option<String>,
    pub mag_filter: Option<MagFilter>,
    pub min_filter: Option<MinFilter>,
    pub wrap_s: WrappingMode,
    pub wrap_t: WrappingMode,
}

/// Encoded image bytes plus MIME type
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub name: Option<String>,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub name: Option<String>,
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        aspect_ratio: Option<f32>,
        yfov: f32,
        zfar: Option<f32>,
        znear: f32,
    },
    Orthographic {
        xmag: f32,
        ymag: f32,
        zfar: f32,
        znear: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: Option<String>,
    pub projection: Projection,
}

/// Keyframe values for one animated node property
#[derive(Debug, Clone, PartialEq)]
pub enum Keyframes {
    Translation(Vec<[f32; 3]>),
    Rotation(Vec<[f32; 4]>),
    Scale(Vec<[f32; 3]>),
}

impl Keyframes {
    pub fn len(&self) -> usize {
        match self {
            Keyframes::Translation(v) | Keyframes::Scale(v) => v.len(),
            Keyframes::Rotation(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One animated property of one node, with its own sampler
///
/// Cubic spline channels hold three values per keyframe (in-tangent,
/// value, out-tangent).
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationChannel {
    pub node: usize,
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    pub values: Keyframes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    pub name: Option<String>,
    pub channels: Vec<AnimationChannel>,
}

/// Sniff the MIME type of encoded image bytes
pub fn sniff_mime_type(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&KTX2_MAGIC) {
        return Some(KTX2_MIME);
    }
    image::guess_format(data)
        .ok()
        .map(|format| format.to_mime_type())
}

/// Old-to-new index mapping produced when objects are removed or merged
#[derive(Debug, Clone)]
pub struct Remap {
    table: Vec<Option<usize>>,
}

impl Remap {
    /// Mapping from an explicit table; `None` marks a removed entry
    pub fn from_table(table: Vec<Option<usize>>) -> Self {
        Self { table }
    }

    /// Keep entries flagged in `keep`, compacting the rest away
    pub fn retain(keep: &[bool]) -> Self {
        let mut next = 0;
        let table = keep
            .iter()
            .map(|&k| {
                k.then(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();
        Self { table }
    }

    pub fn get(&self, old: usize) -> Option<usize> {
        self.table.get(old).copied().flatten()
    }

    /// Number of entries that survive
    pub fn len(&self) -> usize {
        self.table
            .iter()
            .flatten()
            .map(|&i| i + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_identity(&self) -> bool {
        self.table
            .iter()
            .enumerate()
            .all(|(i, mapped)| *mapped == Some(i))
    }

    /// Move surviving items to their new slots
    ///
    /// Items merged onto the same slot keep the first one.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let mut slots: Vec<Option<T>> = (0..self.len()).map(|_| None).collect();
        for (old, item) in items.into_iter().enumerate() {
            if let Some(new) = self.get(old)
                && slots[new].is_none()
            {
                slots[new] = Some(item);
            }
        }
        slots.into_iter().flatten().collect()
    }
}

impl Document {
    pub fn triangle_count(&self) -> usize {
        self.meshes
            .iter()
            .flat_map(|m| &m.primitives)
            .map(Primitive::triangle_count)
            .sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes
            .iter()
            .flat_map(|m| &m.primitives)
            .map(Primitive::vertex_count)
            .sum()
    }

    pub fn remap_nodes(&mut self, remap: &Remap) {
        let nodes = std::mem::take(&mut self.nodes);
        self.nodes = remap.apply(nodes);
        for node in &mut self.nodes {
            node.children = node
                .children
                .iter()
                .filter_map(|&c| remap.get(c))
                .collect();
        }
        for scene in &mut self.scenes {
            scene.nodes = scene.nodes.iter().filter_map(|&n| remap.get(n)).collect();
        }
        for animation in &mut self.animations {
            animation
                .channels
                .retain_mut(|channel| match remap.get(channel.node) {
                    Some(node) => {
                        channel.node = node;
                        true
                    }
                    None => false,
                });
        }
        self.animations.retain(|a| !a.channels.is_empty());
    }

    pub fn remap_meshes(&mut self, remap: &Remap) {
        let meshes = std::mem::take(&mut self.meshes);
        self.meshes = remap.apply(meshes);
        for node in &mut self.nodes {
            node.mesh = node.mesh.and_then(|m| remap.get(m));
        }
    }

    pub fn remap_materials(&mut self, remap: &Remap) {
        let materials = std::mem::take(&mut self.materials);
        self.materials = remap.apply(materials);
        for primitive in self.meshes.iter_mut().flat_map(|m| &mut m.primitives) {
            primitive.material = primitive.material.and_then(|m| remap.get(m));
        }
    }

    pub fn remap_textures(&mut self, remap: &Remap) {
        let textures = std::mem::take(&mut self.textures);
        self.textures = remap.apply(textures);
        for material in &mut self.materials {
            for slot in [
                &mut material.base_color_texture,
                &mut material.metallic_roughness_texture,
                &mut material.normal_texture,
                &mut material.occlusion_texture,
                &mut material.emissive_texture,
            ] {
                *slot = slot.and_then(|r| {
                    remap.get(r.texture).map(|texture| TextureRef {
                        texture,
                        tex_coord: r.tex_coord,
                    })
                });
            }
        }
    }

    pub fn remap_samplers(&mut self, remap: &Remap) {
        let samplers = std::mem::take(&mut self.samplers);
        self.samplers = remap.apply(samplers);
        for texture in &mut self.textures {
            texture.sampler = texture.sampler.and_then(|s| remap.get(s));
        }
    }

    /// Textures always need an image, so callers must not drop a referenced one
    pub fn remap_images(&mut self, remap: &Remap) {
        let images = std::mem::take(&mut self.images);
        self.images = remap.apply(images);
        for texture in &mut self.textures {
            if let Some(image) = remap.get(texture.image) {
                texture.image = image;
            }
        }
    }

    /// Per-node flag: some animation channel drives this node's transform
    pub fn animated_nodes(&self) -> Vec<bool> {
        let mut animated = vec![false; self.nodes.len()];
        for channel in self.animations.iter().flat_map(|a| &a.channels) {
            if let Some(flag) = animated.get_mut(channel.node) {
                *flag = true;
            }
        }
        animated
    }

    /// Indices of nodes that reference `mesh`
    pub fn nodes_using_mesh(&self, mesh: usize) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.mesh == Some(mesh))
            .map(|(i, _)| i)
            .collect()
    }
}
