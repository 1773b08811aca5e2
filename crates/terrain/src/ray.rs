//! Ray-triangle intersection.

use glam::Vec3;

/// A half-line starting at `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// A ray from `(x, y, z)` pointing straight down.
    #[must_use]
    pub fn down(x: f32, y: f32, z: f32) -> Self {
        Self {
            origin: Vec3::new(x, y, z),
            direction: Vec3::NEG_Y,
        }
    }

    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Möller-Trumbore ray-triangle intersection.
///
/// Returns the ray parameter `t` of the hit. Rays within `epsilon` of
/// parallel to the triangle plane are rejected, as are hits with
/// `t <= epsilon`. Both faces count as hits.
#[must_use]
pub fn intersect_triangle(ray: &Ray, triangle: &[Vec3; 3], epsilon: f32) -> Option<f32> {
    let [v0, v1, v2] = *triangle;
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < epsilon {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if u < 0.0 {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > epsilon).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-7;

    fn floor() -> [Vec3; 3] {
        [Vec3::ZERO, Vec3::X, Vec3::Z]
    }

    #[test]
    fn test_hit_from_above() {
        let ray = Ray::down(0.25, 10.0, 0.25);
        let t = intersect_triangle(&ray, &floor(), EPS).unwrap();
        assert!((t - 10.0).abs() < 1e-6);
        assert!(ray.at(t).abs_diff_eq(Vec3::new(0.25, 0.0, 0.25), 1e-6));
    }

    #[test]
    fn test_winding_does_not_matter() {
        let [a, b, c] = floor();
        let ray = Ray::down(0.25, 3.0, 0.25);
        assert!(intersect_triangle(&ray, &[a, c, b], EPS).is_some());
    }

    #[test]
    fn test_miss_outside() {
        let ray = Ray::down(0.75, 10.0, 0.75);
        assert_eq!(intersect_triangle(&ray, &floor(), EPS), None);
        let ray = Ray::down(-0.1, 10.0, 0.5);
        assert_eq!(intersect_triangle(&ray, &floor(), EPS), None);
    }

    #[test]
    fn test_miss_behind_origin() {
        let ray = Ray::down(0.25, -1.0, 0.25);
        assert_eq!(intersect_triangle(&ray, &floor(), EPS), None);
    }

    #[test]
    fn test_parallel_rejected() {
        let wall = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let ray = Ray::down(0.25, 10.0, 0.0);
        assert_eq!(intersect_triangle(&ray, &wall, EPS), None);
    }

    #[test]
    fn test_sloped_triangle() {
        // Plane y = x over the unit triangle.
        let slope = [Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0), Vec3::Z];
        let ray = Ray::down(0.5, 450.0, 0.25);
        let t = intersect_triangle(&ray, &slope, EPS).unwrap();
        assert!((450.0 - t - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_edge_hit() {
        let ray = Ray::down(0.5, 1.0, 0.0);
        assert!(intersect_triangle(&ray, &floor(), EPS).is_some());
    }
}
