//! Axis permutation between asset authoring space (Z-up) and world space (Y-up).

use glam::Vec3;

/// Convert an authoring-space point to world space: `(x, y, z) -> (x, z, -y)`.
#[inline]
#[must_use]
pub fn to_world(p: Vec3) -> Vec3 {
    Vec3::new(p.x, p.z, -p.y)
}

/// Inverse of [`to_world`]: `(x, y, z) -> (x, -z, y)`.
#[inline]
#[must_use]
pub fn to_authoring(p: Vec3) -> Vec3 {
    Vec3::new(p.x, -p.z, p.y)
}
