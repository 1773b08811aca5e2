//! Axis-aligned rectangles in the world XZ plane.

use glam::{Vec2, Vec3};

/// An axis-aligned rectangle over world X (`min.x..max.x`) and Z (`min.y..max.y`).
///
/// All tests are edge-inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// A rectangle that contains and overlaps nothing.
    pub const EMPTY: Self = Self {
        min: Vec2::splat(f32::INFINITY),
        max: Vec2::splat(f32::NEG_INFINITY),
    };

    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// XZ bounds of a world-space triangle.
    #[must_use]
    pub fn of_triangle(triangle: &[Vec3; 3]) -> Self {
        let [a, b, c] = triangle.map(|v| Vec2::new(v.x, v.z));
        Self {
            min: a.min(b).min(c),
            max: a.max(b).max(c),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Grow to include `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow by `margin` on every side.
    #[must_use]
    pub fn expand(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min.x && x <= self.max.x && z >= self.min.y && z <= self.max.y
    }

    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        other.max.x >= self.min.x
            && other.min.x <= self.max.x
            && other.max.y >= self.min.y
            && other.min.y <= self.max.y
    }

    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Split into four equal quadrants.
    ///
    /// Order: `(-x, -z)`, `(+x, -z)`, `(-x, +z)`, `(+x, +z)`.
    #[must_use]
    pub fn quadrants(&self) -> [Self; 4] {
        let c = self.center();
        [
            Self::new(self.min, c),
            Self::new(Vec2::new(c.x, self.min.y), Vec2::new(self.max.x, c.y)),
            Self::new(Vec2::new(self.min.x, c.y), Vec2::new(c.x, self.max.y)),
            Self::new(c, self.max),
        ]
    }
}
