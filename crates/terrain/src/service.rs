//! The terrain data store and height query service.
//!
//! One [`TerrainService`] owns the active terrain. Loading a new terrain
//! builds a fresh [`Terrain`] and swaps it in; queries already running keep
//! their own `Arc` to the old one. The quadtree is published through a
//! `OnceLock`, so readers see either no index or a complete one.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use itri_decode::TriangleMesh;

use crate::config::{HeightConfig, IndexConfig, TerrainConfig};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::height::{height_exhaustive, height_indexed};
use crate::quadtree::QuadTree;

/// Lifecycle of a [`TerrainService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainState {
    /// No terrain; every query returns its fallback.
    Unloaded,
    /// A load is in flight. A previously loaded terrain keeps answering queries.
    Loading,
    /// The mesh is decoded; queries scan every triangle.
    Decoded,
    /// The quadtree is built; queries use it.
    Indexed,
}

/// Identifies one load attempt. Results for superseded tickets are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadTicket {
    #[must_use]
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// A decoded terrain mesh and, once built, its spatial index.
#[derive(Debug)]
pub struct Terrain {
    mesh: TriangleMesh,
    index: OnceLock<QuadTree>,
    generation: u64,
}

impl Terrain {
    #[must_use]
    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// The spatial index, if it has been built.
    #[must_use]
    pub fn index(&self) -> Option<&QuadTree> {
        self.index.get()
    }

    /// Generation of the load that produced this terrain.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Build the index if it does not exist yet.
    ///
    /// Concurrent callers block until the single build finishes.
    pub fn build_index(&self, config: &IndexConfig) -> &QuadTree {
        self.index.get_or_init(|| QuadTree::build(&self.mesh, config))
    }

    /// Height under `(x, z)`, through the index when available.
    #[must_use]
    pub fn height(&self, x: f32, z: f32, config: &HeightConfig) -> Option<f32> {
        match self.index() {
            Some(tree) => height_indexed(&self.mesh, tree, x, z, config),
            None => height_exhaustive(&self.mesh, x, z, config),
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    terrain: Option<Arc<Terrain>>,
    pending: Option<u64>,
}

/// Owns the active terrain and answers height queries against it.
///
/// Share it as `Arc<TerrainService>` between the loader and whatever
/// drives per-frame queries.
#[derive(Debug)]
pub struct TerrainService {
    config: TerrainConfig,
    slot: RwLock<Slot>,
    generation: AtomicU64,
}

impl Default for TerrainService {
    fn default() -> Self {
        Self::new(TerrainConfig::default())
    }
}

impl TerrainService {
    #[must_use]
    pub fn new(config: TerrainConfig) -> Self {
        Self {
            config,
            slot: RwLock::new(Slot::default()),
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> TerrainState {
        let slot = self.read();
        if slot.pending.is_some() {
            return TerrainState::Loading;
        }
        match &slot.terrain {
            None => TerrainState::Unloaded,
            Some(terrain) if terrain.index().is_some() => TerrainState::Indexed,
            Some(_) => TerrainState::Decoded,
        }
    }

    /// The active terrain.
    #[must_use]
    pub fn current(&self) -> Option<Arc<Terrain>> {
        self.read().terrain.clone()
    }

    /// Start a load. Any earlier outstanding ticket becomes stale.
    pub fn begin_load(&self) -> LoadTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.write().pending = Some(generation);
        tracing::debug!("Begin terrain load #{generation}");
        LoadTicket(generation)
    }

    /// Abandon the outstanding load, if any. Its result will be discarded on arrival.
    pub fn cancel_load(&self) {
        let mut slot = self.write();
        if let Some(generation) = slot.pending.take() {
            tracing::info!("Cancelled terrain load #{generation}");
        }
    }

    /// Decode `bytes` for `ticket` and make the result the active terrain.
    ///
    /// Returns `Ok(None)` if the ticket was superseded or cancelled. On a
    /// format error the previously active terrain (if any) stays active.
    pub fn finish_load(&self, ticket: LoadTicket, bytes: Vec<u8>) -> Result<Option<Arc<Terrain>>> {
        if !self.is_pending(ticket) {
            tracing::info!("Discarding stale terrain load #{}", ticket.0);
            return Ok(None);
        }

        let mesh = match TriangleMesh::from_bytes(bytes) {
            Ok(mesh) => mesh,
            Err(e) => {
                tracing::error!("Failed to decode terrain load #{}: {e}", ticket.0);
                self.abandon(ticket);
                return Err(e.into());
            }
        };
        self.log_mesh(&mesh);

        let terrain = Arc::new(Terrain {
            mesh,
            index: OnceLock::new(),
            generation: ticket.0,
        });

        let mut slot = self.write();
        if slot.pending != Some(ticket.0) {
            tracing::info!("Discarding stale terrain load #{}", ticket.0);
            return Ok(None);
        }
        slot.pending = None;
        slot.terrain = Some(Arc::clone(&terrain));
        drop(slot);

        tracing::info!("Terrain #{} decoded", ticket.0);
        Ok(Some(terrain))
    }

    /// Decode and activate an in-memory buffer.
    pub fn load_bytes(&self, bytes: Vec<u8>) -> Result<Option<Arc<Terrain>>> {
        let ticket = self.begin_load();
        self.finish_load(ticket, bytes)
    }

    /// Read, decode and activate a terrain file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Option<Arc<Terrain>>> {
        let path = path.as_ref();
        let ticket = self.begin_load();
        tracing::info!("Loading terrain from {}", path.display());
        match std::fs::read(path) {
            Ok(bytes) => self.finish_load(ticket, bytes),
            Err(e) => {
                self.abandon(ticket);
                Err(e.into())
            }
        }
    }

    /// Fetch, decode and activate a terrain over HTTP.
    ///
    /// Dropping the future abandons the load. If another load starts while
    /// this one is fetching, the fetched buffer is discarded.
    pub async fn load_url(&self, fetcher: &Fetcher, url: &str) -> Result<Option<Arc<Terrain>>> {
        let ticket = self.begin_load();
        let mut guard = AbandonOnDrop {
            service: self,
            ticket: Some(ticket),
        };
        tracing::info!("Fetching terrain from {url}");
        let bytes = fetcher.fetch_bytes(url).await?;
        guard.ticket = None;
        self.finish_load(ticket, bytes)
    }

    /// Build the quadtree for `terrain`.
    ///
    /// This scans every triangle; run it off the frame loop for large
    /// meshes. Once it returns, `terrain` answers queries through the index.
    pub fn build_index<'t>(&self, terrain: &'t Arc<Terrain>) -> &'t QuadTree {
        if let Some(tree) = terrain.index() {
            return tree;
        }

        let tree = terrain.build_index(&self.config.index);
        let stats = tree.stats();
        tracing::info!(
            "Indexed terrain #{}: {} nodes, {} leaves, depth {}, {} references",
            terrain.generation,
            stats.nodes,
            stats.leaves,
            stats.depth,
            stats.references
        );

        let is_current = self
            .read()
            .terrain
            .as_ref()
            .is_some_and(|t| Arc::ptr_eq(t, terrain));
        if !is_current {
            tracing::debug!("Terrain #{} was replaced during indexing", terrain.generation);
        }
        tree
    }

    /// Drop the active terrain and any outstanding load.
    pub fn unload(&self) {
        let mut slot = self.write();
        slot.pending = None;
        slot.terrain = None;
        tracing::info!("Terrain unloaded");
    }

    /// Terrain height under `(x, z)`, or `fallback` if it cannot be determined.
    ///
    /// Never fails: no terrain, a point outside the mesh, and a hole in the
    /// mesh all produce `fallback`.
    #[must_use]
    pub fn query_height(&self, x: f32, z: f32, fallback: f32) -> f32 {
        self.current()
            .and_then(|terrain| terrain.height(x, z, &self.config.height))
            .unwrap_or(fallback)
    }

    /// Like [`TerrainService::query_height`] but always scans every triangle.
    #[must_use]
    pub fn query_height_exhaustive(&self, x: f32, z: f32, fallback: f32) -> f32 {
        self.current()
            .and_then(|terrain| height_exhaustive(terrain.mesh(), x, z, &self.config.height))
            .unwrap_or(fallback)
    }

    fn is_pending(&self, ticket: LoadTicket) -> bool {
        self.read().pending == Some(ticket.0)
    }

    fn abandon(&self, ticket: LoadTicket) {
        let mut slot = self.write();
        if slot.pending == Some(ticket.0) {
            slot.pending = None;
        }
    }

    fn log_mesh(&self, mesh: &TriangleMesh) {
        let header = mesh.header();
        let (min, max) = mesh.world_bounds();
        tracing::info!(
            "Terrain mesh: {} triangles, colors={}, uvs={}, bounds=[{min}, {max}], vec_range={}",
            header.count,
            header.flags.has_colors(),
            header.flags.has_uvs(),
            header.vec_range
        );
        if max.y >= self.config.height.high_y {
            tracing::warn!(
                "Terrain top {:.1} is not below the ray start height {:.1}; heights above it will be missed",
                max.y,
                self.config.height.high_y
            );
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

struct AbandonOnDrop<'a> {
    service: &'a TerrainService,
    ticket: Option<LoadTicket>,
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.service.abandon(ticket);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use itri_decode::MeshEncoder;

    fn floor_at(y: f32) -> Vec<u8> {
        let mut encoder = MeshEncoder::new();
        encoder
            .push_world_triangle([Vec3::new(0.0, y, 0.0), Vec3::new(10.0, y, 0.0), Vec3::new(0.0, y, 10.0)])
            .push_world_triangle([Vec3::new(10.0, y, 10.0), Vec3::new(10.0, y, 0.0), Vec3::new(0.0, y, 10.0)]);
        encoder.encode().unwrap()
    }

    #[test]
    fn test_unloaded_returns_fallback() {
        let service = TerrainService::default();
        assert_eq!(service.state(), TerrainState::Unloaded);
        assert_eq!(service.query_height(1.0, 1.0, 42.0), 42.0);
    }

    #[test]
    fn test_state_progression() {
        let service = TerrainService::default();
        let ticket = service.begin_load();
        assert_eq!(service.state(), TerrainState::Loading);

        let terrain = service.finish_load(ticket, floor_at(3.0)).unwrap().unwrap();
        assert_eq!(service.state(), TerrainState::Decoded);
        assert!((service.query_height(5.0, 2.0, -1.0) - 3.0).abs() < 1e-3);

        service.build_index(&terrain);
        assert_eq!(service.state(), TerrainState::Indexed);
        assert!((service.query_height(5.0, 2.0, -1.0) - 3.0).abs() < 1e-3);

        service.unload();
        assert_eq!(service.state(), TerrainState::Unloaded);
        assert_eq!(service.query_height(5.0, 2.0, -1.0), -1.0);
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let service = TerrainService::default();
        let first = service.begin_load();
        let second = service.begin_load();

        assert!(service.finish_load(first, floor_at(1.0)).unwrap().is_none());
        assert_eq!(service.state(), TerrainState::Loading);

        let terrain = service.finish_load(second, floor_at(2.0)).unwrap().unwrap();
        assert_eq!(terrain.generation(), second.generation());
        assert!((service.query_height(1.0, 1.0, 0.0) - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_cancelled_load_is_discarded() {
        let service = TerrainService::default();
        let ticket = service.begin_load();
        service.cancel_load();
        assert_eq!(service.state(), TerrainState::Unloaded);
        assert!(service.finish_load(ticket, floor_at(1.0)).unwrap().is_none());
        assert!(service.current().is_none());
    }

    #[test]
    fn test_format_error_keeps_previous_terrain() {
        let service = TerrainService::default();
        let terrain = service.load_bytes(floor_at(4.0)).unwrap().unwrap();
        service.build_index(&terrain);

        let err = service.load_bytes(b"NOPE".to_vec()).unwrap_err();
        assert!(matches!(err, crate::Error::Format(_)));
        assert_eq!(service.state(), TerrainState::Indexed);
        assert!((service.query_height(1.0, 1.0, 0.0) - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_reload_keeps_old_terrain_alive_for_holders() {
        let service = TerrainService::default();
        let old = service.load_bytes(floor_at(1.0)).unwrap().unwrap();
        let new = service.load_bytes(floor_at(7.0)).unwrap().unwrap();
        assert_eq!(service.state(), TerrainState::Decoded);

        let config = HeightConfig::default();
        assert!((old.height(1.0, 1.0, &config).unwrap() - 1.0).abs() < 1e-3);
        assert!((new.height(1.0, 1.0, &config).unwrap() - 7.0).abs() < 1e-3);
        assert!((service.query_height(1.0, 1.0, 0.0) - 7.0).abs() < 1e-3);

        // Indexing a replaced terrain does not affect the active one.
        service.build_index(&old);
        assert_eq!(service.state(), TerrainState::Decoded);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let service = TerrainService::default();
        let err = service.load_file("/nonexistent/terrain.bin").unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
        assert_eq!(service.state(), TerrainState::Unloaded);
    }

    #[test]
    fn test_concurrent_queries_during_index_build() {
        let service = Arc::new(TerrainService::default());
        let terrain = service.load_bytes(floor_at(5.0)).unwrap().unwrap();

        let builder = {
            let service = Arc::clone(&service);
            std::thread::spawn(move || {
                service.build_index(&terrain);
            })
        };
        for _ in 0..100 {
            let h = service.query_height(2.0, 2.0, f32::NAN);
            assert!((h - 5.0).abs() < 1e-3);
        }
        builder.join().unwrap();
        assert_eq!(service.state(), TerrainState::Indexed);
    }
}
