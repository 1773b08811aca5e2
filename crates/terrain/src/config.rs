//! Tunables for index construction and height queries.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level terrain configuration.
///
/// Every field has a default, so a partial JSON document such as
/// `{"height": {"high_y": 900.0}}` is valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub index: IndexConfig,
    pub height: HeightConfig,
}

/// Deepest quadtree a configuration may ask for.
pub const MAX_INDEX_DEPTH: u32 = 16;

impl TerrainConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject values that would make index construction blow up or queries
    /// meaningless.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field, reason| Err(Error::InvalidSetting { field, reason });

        let index = &self.index;
        if index.max_depth > MAX_INDEX_DEPTH {
            return invalid("index.max_depth", "must be at most 16");
        }
        if index.min_triangles_to_split == 0 {
            return invalid("index.min_triangles_to_split", "must be at least 1");
        }
        if index.bounds_sample_stride == 0 {
            return invalid("index.bounds_sample_stride", "must be at least 1");
        }

        let height = &self.height;
        if !height.high_y.is_finite() {
            return invalid("height.high_y", "must be finite");
        }
        if !(height.epsilon.is_finite() && height.epsilon >= 0.0) {
            return invalid("height.epsilon", "must be finite and non-negative");
        }
        if !(height.search_radius.is_finite() && height.search_radius >= 0.0) {
            return invalid("height.search_radius", "must be finite and non-negative");
        }
        Ok(())
    }
}

/// Quadtree construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Nodes at this depth are never split (the root is depth 0).
    pub max_depth: u32,
    /// Nodes holding fewer triangles than this are never split.
    pub min_triangles_to_split: usize,
    /// Sample every Nth triangle when estimating the root rectangle.
    ///
    /// `1` scans every triangle and gives an exact root bound. Larger values
    /// are faster but may undershoot the true extent, so points near the
    /// edge of the mesh can miss.
    pub bounds_sample_stride: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_triangles_to_split: 500,
            bounds_sample_stride: 1,
        }
    }
}

/// Ray casting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightConfig {
    /// Height the downward ray starts from. Must exceed the mesh's highest point.
    pub high_y: f32,
    /// Determinant and ray-parameter threshold for intersections.
    pub epsilon: f32,
    /// XZ margin around each triangle's bounds used by the exhaustive scan.
    pub search_radius: f32,
}

impl Default for HeightConfig {
    fn default() -> Self {
        Self {
            high_y: 450.0,
            epsilon: 1e-7,
            search_radius: 1.0,
        }
    }
}
