//! Header parsing and validation.

use glam::Vec3;

use crate::error::{ArrayKind, FormatError, FormatResult};
use crate::{BASE_STRIDE, COLOR_STRIDE, EDGE_STRIDE, HEADER_SIZE, MAGIC, UV_STRIDE, VERSION};

/// Feature flags stored in the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshFlags(pub u32);

impl MeshFlags {
    pub const COLORS: u32 = 1 << 0;
    pub const UVS: u32 = 1 << 1;

    #[must_use]
    pub fn has_colors(self) -> bool {
        self.0 & Self::COLORS != 0
    }

    #[must_use]
    pub fn has_uvs(self) -> bool {
        self.0 & Self::UVS != 0
    }
}

/// Byte offsets of the per-triangle arrays.
///
/// Offsets of absent optional arrays are `None` regardless of what the
/// buffer declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrayOffsets {
    pub base: usize,
    pub edge_x: usize,
    pub edge_y: usize,
    pub colors: Option<usize>,
    pub uvs: Option<usize>,
}

/// Decode parameters read from an ITRI header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    /// Number of triangles.
    pub count: u32,
    pub flags: MeshFlags,
    /// Declared header size in bytes.
    pub header_size: u32,
    pub offsets: ArrayOffsets,
    /// Minimum corner of the base-vertex quantization box (authoring space).
    pub bmin: Vec3,
    /// Maximum corner of the base-vertex quantization box (authoring space).
    pub bmax: Vec3,
    /// Half-range of the edge-vector quantization.
    pub vec_range: f32,
}

/// Parse and validate the header of an ITRI buffer.
///
/// # Format
///
/// - Bytes 0-3: Magic `"ITRI"`
/// - Bytes 4-43: Ten u32 LE (version, count, flags, header size, base,
///   edge-x, edge-y, colors and uvs offsets, reserved)
/// - Bytes 44-71: Seven f32 LE (`bmin`, `bmax`, `vec_range`)
///
/// Every array the header declares is checked against the buffer length, so
/// a header returned from here can be decoded without reading out of bounds.
pub fn parse_header(bytes: &[u8]) -> FormatResult<Header> {
    if bytes.len() < HEADER_SIZE {
        return Err(FormatError::Truncated {
            needed: HEADER_SIZE,
            actual: bytes.len(),
        });
    }

    let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if magic != MAGIC {
        return Err(FormatError::BadMagic(magic));
    }

    let version = read_u32(bytes, 4);
    if version != VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }

    let count = read_u32(bytes, 8);
    let flags = MeshFlags(read_u32(bytes, 12));
    let header_size = read_u32(bytes, 16);
    if (header_size as usize) < HEADER_SIZE || header_size as usize > bytes.len() {
        return Err(FormatError::InvalidHeaderSize {
            declared: header_size,
            buffer_len: bytes.len(),
        });
    }

    let bmin = Vec3::new(read_f32(bytes, 44), read_f32(bytes, 48), read_f32(bytes, 52));
    let bmax = Vec3::new(read_f32(bytes, 56), read_f32(bytes, 60), read_f32(bytes, 64));
    let vec_range = read_f32(bytes, 68);
    if !bmin.is_finite() || !bmax.is_finite() || !vec_range.is_finite() {
        return Err(FormatError::NonFiniteBounds);
    }

    let check = |array: ArrayKind, at: usize, stride: usize| {
        check_array(bytes.len(), header_size, count, array, read_u32(bytes, at), stride)
    };

    let offsets = ArrayOffsets {
        base: check(ArrayKind::Base, 20, BASE_STRIDE)?,
        edge_x: check(ArrayKind::EdgeX, 24, EDGE_STRIDE)?,
        edge_y: check(ArrayKind::EdgeY, 28, EDGE_STRIDE)?,
        colors: if flags.has_colors() {
            Some(check(ArrayKind::Colors, 32, COLOR_STRIDE)?)
        } else {
            None
        },
        uvs: if flags.has_uvs() {
            Some(check(ArrayKind::Uvs, 36, UV_STRIDE)?)
        } else {
            None
        },
    };

    Ok(Header {
        count,
        flags,
        header_size,
        offsets,
        bmin,
        bmax,
        vec_range,
    })
}

fn check_array(
    buffer_len: usize,
    header_size: u32,
    count: u32,
    array: ArrayKind,
    offset: u32,
    stride: usize,
) -> FormatResult<usize> {
    // Empty arrays are never read, so their offsets are not checked.
    if count == 0 {
        return Ok(offset as usize);
    }
    if offset == 0 {
        return Err(FormatError::MissingArray(array));
    }

    // Computed in u64 so a hostile count cannot wrap.
    let length = u64::from(count) * stride as u64;
    let end = u64::from(offset) + length;
    if offset < header_size || end > buffer_len as u64 {
        return Err(FormatError::ArrayOutOfBounds {
            array,
            offset: u64::from(offset),
            length,
            buffer_len,
        });
    }

    Ok(offset as usize)
}

pub(crate) fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

pub(crate) fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_bits(read_u32(bytes, at))
}
