//! Conversion from decoded ITRI triangles to Bevy meshes.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::PrimitiveTopology;
use bevy::prelude::*;
use terrain::TriangleMesh;

/// Marker for the spawned terrain mesh entity.
#[derive(Component, Debug)]
pub struct TerrainMeshMarker {
    /// Load generation of the terrain this mesh was built from.
    pub generation: u64,
}

/// Build an unindexed, flat-shaded triangle list from a decoded mesh.
///
/// Vertex colors and UVs are attached only when the buffer carries them.
pub fn convert_mesh(source: &TriangleMesh) -> Mesh {
    let vertex_count = source.len() * 3;
    let mut positions = Vec::with_capacity(vertex_count);
    let mut normals = Vec::with_capacity(vertex_count);

    for [a, b, c] in source.triangles() {
        // Triangles can come in either winding; the material draws both sides.
        let normal = (b - a).cross(c - a).normalize_or(Vec3::Y).to_array();
        positions.extend([a.to_array(), b.to_array(), c.to_array()]);
        normals.extend([normal; 3]);
    }

    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);

    let header = source.header();
    if header.flags.has_colors() {
        let colors: Vec<[f32; 4]> = (0..source.len())
            .filter_map(|i| source.color_at(i))
            .flat_map(|rgba| [rgba.map(|c| f32::from(c) / 255.0); 3])
            .collect();
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
    }
    if header.flags.has_uvs() {
        let uvs: Vec<[f32; 2]> = (0..source.len())
            .filter_map(|i| source.uvs_at(i))
            .flat_map(|uvs| uvs.map(|v| v.to_array()))
            .collect();
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    }

    mesh
}
