//! Drop nodes and resources nothing renders

use crate::document::{Document, Remap};
use tracing::debug;

/// Root nodes: those listed by scenes, or every parentless node when the
/// document has no scenes
fn roots(document: &Document) -> Vec<usize> {
    if !document.scenes.is_empty() {
        return document
            .scenes
            .iter()
            .flat_map(|s| s.nodes.iter().copied())
            .collect();
    }

    let mut has_parent = vec![false; document.nodes.len()];
    for child in document.nodes.iter().flat_map(|n| &n.children) {
        if let Some(flag) = has_parent.get_mut(*child) {
            *flag = true;
        }
    }
    (0..document.nodes.len()).filter(|&i| !has_parent[i]).collect()
}

/// Post-order: a node survives if it has a mesh, a camera, an animation
/// channel or a surviving child
fn mark_nodes(
    document: &Document,
    node: usize,
    animated: &[bool],
    visited: &mut [bool],
    keep: &mut [bool],
) -> bool {
    if node >= visited.len() || visited[node] {
        return keep.get(node).copied().unwrap_or(false);
    }
    visited[node] = true;

    let mut kept_child = false;
    for &child in &document.nodes[node].children {
        kept_child |= mark_nodes(document, child, animated, visited, keep);
    }
    let own = &document.nodes[node];
    keep[node] = own.mesh.is_some() || own.camera.is_some() || animated[node] || kept_child;
    keep[node]
}

pub fn prune(document: &mut Document) {
    let node_count = document.nodes.len();
    let animated = document.animated_nodes();
    let mut visited = vec![false; node_count];
    let mut keep_nodes = vec![false; node_count];
    for root in roots(document) {
        mark_nodes(document, root, &animated, &mut visited, &mut keep_nodes);
    }
    let nodes = Remap::retain(&keep_nodes);
    document.remap_nodes(&nodes);

    let mut keep_meshes = vec![false; document.meshes.len()];
    for mesh in document.nodes.iter().filter_map(|n| n.mesh) {
        keep_meshes[mesh] = true;
    }
    document.remap_meshes(&Remap::retain(&keep_meshes));

    let mut keep_materials = vec![false; document.materials.len()];
    for material in document
        .meshes
        .iter()
        .flat_map(|m| &m.primitives)
        .filter_map(|p| p.material)
    {
        keep_materials[material] = true;
    }
    document.remap_materials(&Remap::retain(&keep_materials));

    let mut keep_textures = vec![false; document.textures.len()];
    for texture_ref in document.materials.iter().flat_map(|m| m.texture_refs()) {
        keep_textures[texture_ref.texture] = true;
    }
    document.remap_textures(&Remap::retain(&keep_textures));

    let mut keep_samplers = vec![false; document.samplers.len()];
    let mut keep_images = vec![false; document.images.len()];
    for texture in &document.textures {
        if let Some(sampler) = texture.sampler {
            keep_samplers[sampler] = true;
        }
        keep_images[texture.image] = true;
    }
    document.remap_samplers(&Remap::retain(&keep_samplers));
    document.remap_images(&Remap::retain(&keep_images));

    debug!(
        "Prune kept {}/{} nodes, {} meshes, {} materials, {} images",
        document.nodes.len(),
        node_count,
        document.meshes.len(),
        document.materials.len(),
        document.images.len()
    );
}
