//! Error types for ITRI parsing.

use std::fmt;

use thiserror::Error;

/// Result alias for parsing operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// One of the per-triangle arrays in an ITRI buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Base,
    EdgeX,
    EdgeY,
    Colors,
    Uvs,
}

impl fmt::Display for ArrayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Base => "base-vertex",
            Self::EdgeX => "edge-x",
            Self::EdgeY => "edge-y",
            Self::Colors => "color",
            Self::Uvs => "uv",
        };
        f.write_str(name)
    }
}

/// A malformed or truncated ITRI buffer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("buffer too short: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("bad magic: expected \"ITRI\", found {0:?}")]
    BadMagic([u8; 4]),

    #[error("unsupported version {0} (expected 1)")]
    UnsupportedVersion(u32),

    #[error("invalid header size {declared} for buffer of {buffer_len} bytes")]
    InvalidHeaderSize { declared: u32, buffer_len: usize },

    #[error(
        "{array} array out of bounds: offset={offset}, length={length}, buffer_len={buffer_len}"
    )]
    ArrayOutOfBounds {
        array: ArrayKind,
        offset: u64,
        length: u64,
        buffer_len: usize,
    },

    #[error("{0} array flagged as present but has offset 0")]
    MissingArray(ArrayKind),

    #[error("non-finite bounds or vector range")]
    NonFiniteBounds,
}
