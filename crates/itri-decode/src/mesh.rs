//! On-demand triangle decoding over an owned ITRI buffer.

use glam::{Vec2, Vec3};

use crate::axis::to_world;
use crate::error::FormatResult;
use crate::header::{Header, parse_header, read_f32};
use crate::quantize::{dequantize_base, dequantize_edge};
use crate::{BASE_STRIDE, COLOR_STRIDE, EDGE_STRIDE, UV_STRIDE};

/// A validated ITRI buffer together with its decode parameters.
///
/// Construction validates every array against the buffer length, so the
/// accessors never read out of bounds. Triangles are not expanded up front;
/// each call to [`TriangleMesh::triangle_at`] dequantizes one triangle.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    bytes: Vec<u8>,
    header: Header,
}

impl TriangleMesh {
    /// Parse and take ownership of an ITRI buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> FormatResult<Self> {
        let header = parse_header(&bytes)?;
        Ok(Self { bytes, header })
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of triangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.header.count as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    /// Decode triangle `index` in authoring space (before the axis permutation).
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn authoring_triangle_at(&self, index: usize) -> [Vec3; 3] {
        assert!(
            index < self.len(),
            "triangle index {index} out of range (count {})",
            self.len()
        );
        let h = &self.header;

        let base = self.u16x3(h.offsets.base + index * BASE_STRIDE);
        let edge_x = self.i16x3(h.offsets.edge_x + index * EDGE_STRIDE);
        let edge_y = self.i16x3(h.offsets.edge_y + index * EDGE_STRIDE);

        let v0 = dequantize_base(base, h.bmin, h.bmax);
        let v1 = v0 + dequantize_edge(edge_x, h.vec_range);
        let v2 = v0 + dequantize_edge(edge_y, h.vec_range);
        [v0, v1, v2]
    }

    /// Decode triangle `index` in world space.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn triangle_at(&self, index: usize) -> [Vec3; 3] {
        self.authoring_triangle_at(index).map(to_world)
    }

    /// RGBA color of triangle `index`, if the buffer carries colors.
    #[must_use]
    pub fn color_at(&self, index: usize) -> Option<[u8; 4]> {
        let offset = self.header.offsets.colors?;
        assert!(index < self.len(), "triangle index {index} out of range");
        let at = offset + index * COLOR_STRIDE;
        Some([
            self.bytes[at],
            self.bytes[at + 1],
            self.bytes[at + 2],
            self.bytes[at + 3],
        ])
    }

    /// Per-corner texture coordinates of triangle `index`, if present.
    #[must_use]
    pub fn uvs_at(&self, index: usize) -> Option<[Vec2; 3]> {
        let offset = self.header.offsets.uvs?;
        assert!(index < self.len(), "triangle index {index} out of range");
        let at = offset + index * UV_STRIDE;
        let f = |k: usize| read_f32(&self.bytes, at + k * 4);
        Some([
            Vec2::new(f(0), f(1)),
            Vec2::new(f(2), f(3)),
            Vec2::new(f(4), f(5)),
        ])
    }

    /// Iterate over all triangles in world space.
    pub fn triangles(&self) -> impl ExactSizeIterator<Item = [Vec3; 3]> + '_ {
        (0..self.len()).map(|i| self.triangle_at(i))
    }

    /// World-space bounding box derived from the quantization box.
    ///
    /// Edge vectors are quantized independently, so decoded `v1`/`v2` may
    /// land slightly outside this box.
    #[must_use]
    pub fn world_bounds(&self) -> (Vec3, Vec3) {
        let a = to_world(self.header.bmin);
        let b = to_world(self.header.bmax);
        (a.min(b), a.max(b))
    }

    fn u16x3(&self, at: usize) -> [u16; 3] {
        let b = &self.bytes[at..at + 6];
        [
            u16::from_le_bytes([b[0], b[1]]),
            u16::from_le_bytes([b[2], b[3]]),
            u16::from_le_bytes([b[4], b[5]]),
        ]
    }

    fn i16x3(&self, at: usize) -> [i16; 3] {
        let b = &self.bytes[at..at + 6];
        [
            i16::from_le_bytes([b[0], b[1]]),
            i16::from_le_bytes([b[2], b[3]]),
            i16::from_le_bytes([b[4], b[5]]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MeshEncoder;
    use proptest::prelude::*;

    fn unit_square() -> TriangleMesh {
        let mut encoder = MeshEncoder::new();
        encoder.push_world_triangle([Vec3::ZERO, Vec3::X, Vec3::Z]);
        encoder.push_world_triangle([Vec3::new(1.0, 0.0, 1.0), Vec3::X, Vec3::Z]);
        TriangleMesh::from_bytes(encoder.encode().unwrap()).unwrap()
    }

    fn assert_close(a: Vec3, b: Vec3, tolerance: f32) {
        assert!(a.abs_diff_eq(b, tolerance), "{a} != {b}");
    }

    #[test]
    fn test_decode_unit_square() {
        let mesh = unit_square();
        assert_eq!(mesh.len(), 2);

        let [a0, a1, a2] = mesh.triangle_at(0);
        assert_close(a0, Vec3::ZERO, 1e-6);
        assert_close(a1, Vec3::X, 1e-6);
        assert_close(a2, Vec3::Z, 1e-6);

        let [b0, b1, b2] = mesh.triangle_at(1);
        assert_close(b0, Vec3::new(1.0, 0.0, 1.0), 1e-6);
        assert_close(b1, Vec3::X, 1e-6);
        assert_close(b2, Vec3::Z, 1e-6);
    }

    #[test]
    fn test_authoring_space_is_z_up() {
        let mesh = unit_square();
        let [v0, v1, v2] = mesh.authoring_triangle_at(0);
        assert_close(v0, Vec3::ZERO, 1e-6);
        assert_close(v1, Vec3::X, 1e-6);
        assert_close(v2, Vec3::NEG_Y, 1e-6);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let mesh = unit_square();
        let first = mesh.triangle_at(1).map(|v| v.to_array());
        let second = mesh.triangle_at(1).map(|v| v.to_array());
        for (a, b) in first.iter().flatten().zip(second.iter().flatten()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_out_of_range_panics() {
        let _ = unit_square().triangle_at(2);
    }

    #[test]
    fn test_world_bounds() {
        let (min, max) = unit_square().world_bounds();
        assert_close(min, Vec3::ZERO, 1e-6);
        assert_close(max, Vec3::new(1.0, 0.0, 1.0), 1e-6);
    }

    #[test]
    fn test_attributes() {
        let mut encoder = MeshEncoder::new();
        encoder.push_triangle([Vec3::ZERO, Vec3::X, Vec3::Y]);
        encoder.push_triangle([Vec3::ONE, Vec3::X, Vec3::Y]);
        encoder.set_colors(vec![[255, 0, 0, 255], [1, 2, 3, 4]]);
        encoder.set_uvs(vec![
            [Vec2::ZERO, Vec2::X, Vec2::Y],
            [Vec2::ONE, Vec2::new(0.5, 0.25), Vec2::splat(0.75)],
        ]);
        let mesh = TriangleMesh::from_bytes(encoder.encode().unwrap()).unwrap();

        assert!(mesh.header().flags.has_colors());
        assert!(mesh.header().flags.has_uvs());
        assert_eq!(mesh.color_at(1), Some([1, 2, 3, 4]));
        assert_eq!(
            mesh.uvs_at(1),
            Some([Vec2::ONE, Vec2::new(0.5, 0.25), Vec2::splat(0.75)])
        );
    }

    #[test]
    fn test_attributes_absent() {
        let mesh = unit_square();
        assert_eq!(mesh.color_at(0), None);
        assert_eq!(mesh.uvs_at(0), None);
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = TriangleMesh::from_bytes(MeshEncoder::new().encode().unwrap()).unwrap();
        assert!(mesh.is_empty());
        assert_eq!(mesh.triangles().count(), 0);
    }

    fn coord() -> impl Strategy<Value = f32> {
        -500.0f32..500.0
    }

    fn triangle() -> impl Strategy<Value = [Vec3; 3]> {
        prop::array::uniform3(
            (coord(), coord(), coord()).prop_map(|(x, y, z)| Vec3::new(x, y, z)),
        )
    }

    proptest! {
        #[test]
        fn decoded_vertices_within_quantization_error(
            triangles in prop::collection::vec(triangle(), 1..32),
        ) {
            let mut encoder = MeshEncoder::new();
            for tri in &triangles {
                encoder.push_world_triangle(*tri);
            }
            let mesh = TriangleMesh::from_bytes(encoder.encode().unwrap()).unwrap();
            let h = *mesh.header();

            // One base step per axis plus one edge step.
            let base_step = (h.bmax - h.bmin).max_element() / 65535.0;
            let edge_step = h.vec_range / 32767.0;
            let tolerance = base_step + edge_step + 1e-3;

            for (i, tri) in triangles.iter().enumerate() {
                let decoded = mesh.triangle_at(i);
                for (a, b) in decoded.iter().zip(tri) {
                    prop_assert!(a.abs_diff_eq(*b, tolerance), "{} vs {}", a, b);
                }
            }
        }
    }
}
