//! Downward ray casts against terrain triangles.

use itri_decode::TriangleMesh;

use crate::config::HeightConfig;
use crate::quadtree::QuadTree;
use crate::ray::{Ray, intersect_triangle};
use crate::rect::Rect;

/// Terrain height under `(x, z)` using the quadtree to select candidates.
///
/// Returns `None` if the point is outside the index, or no candidate
/// triangle is hit.
#[must_use]
pub fn height_indexed(
    mesh: &TriangleMesh,
    tree: &QuadTree,
    x: f32,
    z: f32,
    config: &HeightConfig,
) -> Option<f32> {
    let mut candidates = Vec::new();
    tree.query_point(x, z, &mut candidates);
    if candidates.is_empty() {
        return None;
    }

    let ray = Ray::down(x, config.high_y, z);
    let closest = candidates
        .iter()
        .filter_map(|&i| intersect_triangle(&ray, &mesh.triangle_at(i as usize), config.epsilon))
        .reduce(f32::min)?;

    Some(config.high_y - closest)
}

/// Terrain height under `(x, z)` by testing every triangle.
///
/// Used before the index is built, and to cross-check the indexed path.
/// Triangles whose XZ bounds (grown by `search_radius`) exclude the point
/// are rejected without a ray test.
#[must_use]
pub fn height_exhaustive(mesh: &TriangleMesh, x: f32, z: f32, config: &HeightConfig) -> Option<f32> {
    let ray = Ray::down(x, config.high_y, z);
    let closest = mesh
        .triangles()
        .filter(|t| {
            Rect::of_triangle(t)
                .expand(config.search_radius)
                .contains(x, z)
        })
        .filter_map(|t| intersect_triangle(&ray, &t, config.epsilon))
        .reduce(f32::min)?;

    Some(config.high_y - closest)
}
