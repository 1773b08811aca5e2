//! ITRI encoding.
//!
//! Produces the byte layout the asset exporter emits: header, base vertices,
//! edge-X, edge-Y, then the optional color and UV arrays, packed back to back.

use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::axis::to_authoring;
use crate::header::MeshFlags;
use crate::quantize::{quantize_snorm16, quantize_unorm16};
use crate::{BASE_STRIDE, COLOR_STRIDE, EDGE_STRIDE, HEADER_SIZE, MAGIC, UV_STRIDE, VERSION};

/// Errors produced while encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{attribute} count {actual} does not match triangle count {expected}")]
    AttributeCountMismatch {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("too many triangles for a u32 count: {0}")]
    TooManyTriangles(usize),

    #[error("triangle {0} has a non-finite vertex")]
    NonFiniteVertex(usize),

    #[error("edge-vector range must be finite and positive, got {0}")]
    InvalidVecRange(f32),

    #[error("encoded mesh exceeds the 4 GiB offset range")]
    TooLarge,
}

/// Builder for ITRI buffers.
///
/// Triangles are stored in authoring space. Use
/// [`MeshEncoder::push_world_triangle`] to add world-space triangles.
#[derive(Debug, Clone, Default)]
pub struct MeshEncoder {
    triangles: Vec<[Vec3; 3]>,
    colors: Option<Vec<[u8; 4]>>,
    uvs: Option<Vec<[Vec2; 3]>>,
    vec_range: Option<f32>,
}

impl MeshEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an authoring-space triangle.
    pub fn push_triangle(&mut self, triangle: [Vec3; 3]) -> &mut Self {
        self.triangles.push(triangle);
        self
    }

    /// Add a world-space triangle (converted back to authoring space).
    pub fn push_world_triangle(&mut self, triangle: [Vec3; 3]) -> &mut Self {
        self.triangles.push(triangle.map(to_authoring));
        self
    }

    /// Per-triangle RGBA colors; must match the triangle count at encode time.
    pub fn set_colors(&mut self, colors: Vec<[u8; 4]>) -> &mut Self {
        self.colors = Some(colors);
        self
    }

    /// Per-triangle UV triples; must match the triangle count at encode time.
    pub fn set_uvs(&mut self, uvs: Vec<[Vec2; 3]>) -> &mut Self {
        self.uvs = Some(uvs);
        self
    }

    /// Fix the edge-vector range instead of deriving it from the longest edge.
    ///
    /// Edge components beyond the range are clamped. The range must be finite
    /// and positive or [`MeshEncoder::encode`] fails.
    pub fn set_vec_range(&mut self, range: f32) -> &mut Self {
        self.vec_range = Some(range);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Encode all triangles into an ITRI v1 buffer.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let count = self.triangles.len();
        let count_u32 = u32::try_from(count).map_err(|_| EncodeError::TooManyTriangles(count))?;

        for (attribute, len) in [
            ("color", self.colors.as_ref().map(Vec::len)),
            ("uv", self.uvs.as_ref().map(Vec::len)),
        ] {
            if let Some(actual) = len.filter(|&n| n != count) {
                return Err(EncodeError::AttributeCountMismatch {
                    attribute,
                    expected: count,
                    actual,
                });
            }
        }

        if let Some(i) = self
            .triangles
            .iter()
            .position(|t| t.iter().any(|v| !v.is_finite()))
        {
            return Err(EncodeError::NonFiniteVertex(i));
        }

        if let Some(range) = self.vec_range.filter(|r| !(r.is_finite() && *r > 0.0)) {
            return Err(EncodeError::InvalidVecRange(range));
        }

        let (bmin, bmax) = self.bounds();
        let size = bmax - bmin;
        let inv_size = Vec3::select(size.cmpgt(Vec3::splat(1e-12)), size.recip(), Vec3::ONE);
        let vec_range = self.vec_range.unwrap_or_else(|| self.auto_vec_range());

        let mut flags = 0;
        if self.colors.is_some() {
            flags |= MeshFlags::COLORS;
        }
        if self.uvs.is_some() {
            flags |= MeshFlags::UVS;
        }

        let base_offset = HEADER_SIZE;
        let edge_x_offset = base_offset + count * BASE_STRIDE;
        let edge_y_offset = edge_x_offset + count * EDGE_STRIDE;
        let mut end = edge_y_offset + count * EDGE_STRIDE;
        let colors_offset = if self.colors.is_some() {
            let at = end;
            end += count * COLOR_STRIDE;
            at
        } else {
            0
        };
        let uvs_offset = if self.uvs.is_some() {
            let at = end;
            end += count * UV_STRIDE;
            at
        } else {
            0
        };
        let offset = |value: usize| u32::try_from(value).map_err(|_| EncodeError::TooLarge);
        if u32::try_from(end).is_err() {
            return Err(EncodeError::TooLarge);
        }

        let mut out = Vec::with_capacity(end);
        out.extend_from_slice(&MAGIC);
        for value in [
            VERSION,
            count_u32,
            flags,
            offset(HEADER_SIZE)?,
            offset(base_offset)?,
            offset(edge_x_offset)?,
            offset(edge_y_offset)?,
            offset(colors_offset)?,
            offset(uvs_offset)?,
            0,
        ] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        for value in [bmin.x, bmin.y, bmin.z, bmax.x, bmax.y, bmax.z, vec_range] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        debug_assert_eq!(out.len(), HEADER_SIZE);

        for [p0, _, _] in &self.triangles {
            let n = (*p0 - bmin) * inv_size;
            for c in [n.x, n.y, n.z] {
                out.extend_from_slice(&quantize_unorm16(c).to_le_bytes());
            }
        }
        for edge in [1, 2] {
            for tri in &self.triangles {
                let e = (tri[edge] - tri[0]) / vec_range;
                for c in [e.x, e.y, e.z] {
                    out.extend_from_slice(&quantize_snorm16(c).to_le_bytes());
                }
            }
        }
        if let Some(colors) = &self.colors {
            out.extend(colors.iter().flatten());
        }
        if let Some(uvs) = &self.uvs {
            for uv in uvs.iter().flatten() {
                out.extend_from_slice(&uv.x.to_le_bytes());
                out.extend_from_slice(&uv.y.to_le_bytes());
            }
        }
        debug_assert_eq!(out.len(), end);

        Ok(out)
    }

    fn bounds(&self) -> (Vec3, Vec3) {
        if self.triangles.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }
        self.triangles.iter().flatten().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), v| (min.min(*v), max.max(*v)),
        )
    }

    fn auto_vec_range(&self) -> f32 {
        let longest = self
            .triangles
            .iter()
            .flat_map(|[p0, p1, p2]| [(*p1 - *p0).length(), (*p2 - *p0).length()])
            .fold(0.0f32, f32::max);
        if longest > 0.0 { longest } else { 1.0 }
    }
}
