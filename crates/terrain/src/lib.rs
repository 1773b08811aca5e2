//! Terrain height queries over ITRI meshes.
//!
//! This crate answers "how high is the ground under `(x, z)`?" for a loaded
//! ITRI terrain mesh. A ray is cast straight down and intersected with the
//! triangles a quadtree over the XZ plane reports as candidates.
//!
//! # Example
//!
//! ```no_run
//! use terrain::{Fetcher, TerrainConfig, TerrainService};
//!
//! # async fn example() -> terrain::Result<()> {
//! let service = TerrainService::new(TerrainConfig::default());
//! let fetcher = Fetcher::new();
//!
//! if let Some(terrain) = service.load_url(&fetcher, "https://example.com/terrain.bin").await? {
//!     // Usually done on a worker thread; queries fall back to a full scan meanwhile.
//!     service.build_index(&terrain);
//! }
//!
//! let ground = service.query_height(12.0, -30.0, 0.0);
//! # Ok(())
//! # }
//! ```
//!
//! # Lifecycle
//!
//! A [`TerrainService`] moves through `Unloaded -> Loading -> Decoded ->
//! Indexed`. Queries never fail: when no triangle is found under the point
//! the caller-supplied fallback height is returned.

mod error;
mod fetch;

pub mod config;
pub mod height;
pub mod quadtree;
pub mod ray;
pub mod rect;
pub mod service;

pub use config::{HeightConfig, IndexConfig, TerrainConfig};
pub use error::{Error, Result};
pub use fetch::Fetcher;
pub use height::{height_exhaustive, height_indexed};
pub use quadtree::{QuadTree, QuadTreeStats};
pub use ray::{Ray, intersect_triangle};
pub use rect::Rect;
pub use service::{LoadTicket, Terrain, TerrainService, TerrainState};

// Re-export codec types for convenience.
pub use itri_decode::{FormatError, MeshEncoder, TriangleMesh};
