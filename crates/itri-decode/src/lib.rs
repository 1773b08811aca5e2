//! Decode and encode ITRI terrain meshes.
//!
//! ITRI is a compact triangle soup: every triangle is stored as a quantized
//! base vertex plus two quantized edge vectors, with optional per-triangle
//! colors and texture coordinates. This crate provides pure synchronous
//! functions over the raw byte buffer - the library user controls threading
//! and I/O.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **Zero-copy decode**: Triangles are decoded on demand from the buffer
//! - **Deterministic**: The same buffer and index always decode to the same bits
//! - **Web-compatible**: Compiles to WASM
//!
//! # Key items
//!
//! - [`parse_header`]: Read and validate the 72-byte header
//! - [`TriangleMesh`]: Owned buffer plus decode parameters, with [`TriangleMesh::triangle_at`]
//! - [`MeshEncoder`]: Produce ITRI bytes from floating-point triangles
//! - [`to_world`] / [`to_authoring`]: The fixed axis permutation between asset and world space

mod error;

pub mod axis;
pub mod encode;
pub mod header;
pub mod mesh;
pub mod quantize;

pub use axis::{to_authoring, to_world};
pub use encode::{EncodeError, MeshEncoder};
pub use error::{ArrayKind, FormatError, FormatResult};
pub use header::{ArrayOffsets, Header, MeshFlags, parse_header};
pub use mesh::TriangleMesh;
pub use quantize::{dequantize_snorm16, dequantize_unorm16, quantize_snorm16, quantize_unorm16};

/// Magic marker at the start of every ITRI buffer.
pub const MAGIC: [u8; 4] = *b"ITRI";

/// The only supported format version.
pub const VERSION: u32 = 1;

/// Size of the fixed header in bytes (`4s10I7f`).
pub const HEADER_SIZE: usize = 72;

/// Bytes per triangle in the base-vertex array (3 × u16).
pub const BASE_STRIDE: usize = 6;

/// Bytes per triangle in each edge-vector array (3 × i16).
pub const EDGE_STRIDE: usize = 6;

/// Bytes per triangle in the color array (RGBA8).
pub const COLOR_STRIDE: usize = 4;

/// Bytes per triangle in the UV array (3 × 2 × f32).
pub const UV_STRIDE: usize = 24;
