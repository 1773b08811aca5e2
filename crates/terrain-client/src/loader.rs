//! Background terrain loading.
//!
//! The terrain buffer is fetched and decoded off the main thread, then the
//! quadtree is built on the compute pool. Results come back over
//! `async_channel` and are polled each frame. Height queries work as soon as
//! the mesh is decoded and switch to the index once it is published.
//!
//! The spawn mechanism differs by platform:
//! - Native: `bevy-tokio-tasks` for Tokio runtime (reqwest requires it)
//! - WASM: Bevy's built-in `AsyncComputeTaskPool` (reqwest uses browser fetch)

use std::path::PathBuf;
use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::AsyncComputeTaskPool;
#[cfg(not(target_family = "wasm"))]
use bevy_tokio_tasks::TokioTasksRuntime;

use terrain::{Fetcher, Terrain, TerrainService};

use crate::camera::WalkCamera;
use crate::mesh::{TerrainMeshMarker, convert_mesh};

/// Plugin for loading the terrain asset.
pub struct TerrainLoaderPlugin;

impl Plugin for TerrainLoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LoaderChannels>()
            .add_systems(Startup, start_terrain_load)
            .add_systems(Update, (poll_decoded_terrain, poll_indexed_terrain));
    }
}

/// Where the terrain buffer comes from.
#[derive(Resource, Debug, Clone)]
pub enum TerrainSource {
    File(PathBuf),
    Url(String),
}

impl TerrainSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::Url(source.to_owned())
        } else {
            Self::File(PathBuf::from(source))
        }
    }
}

/// The shared terrain service. Per-frame systems query heights through it.
#[derive(Resource, Clone)]
pub struct TerrainHandle(pub Arc<TerrainService>);

type LoadResult = terrain::Result<Option<Arc<Terrain>>>;

/// Channels for receiving results from background tasks.
#[derive(Resource)]
pub struct LoaderChannels {
    decoded_rx: async_channel::Receiver<LoadResult>,
    decoded_tx: async_channel::Sender<LoadResult>,
    indexed_rx: async_channel::Receiver<Arc<Terrain>>,
    indexed_tx: async_channel::Sender<Arc<Terrain>>,
}

impl Default for LoaderChannels {
    fn default() -> Self {
        let (decoded_tx, decoded_rx) = async_channel::unbounded();
        let (indexed_tx, indexed_rx) = async_channel::unbounded();
        Self {
            decoded_rx,
            decoded_tx,
            indexed_rx,
            indexed_tx,
        }
    }
}

/// Start fetching and decoding the terrain.
#[allow(clippy::needless_pass_by_value)]
fn start_terrain_load(
    source: Res<TerrainSource>,
    handle: Res<TerrainHandle>,
    channels: Res<LoaderChannels>,
    #[cfg(not(target_family = "wasm"))] runtime: ResMut<TokioTasksRuntime>,
) {
    tracing::info!("Started loading terrain from {:?}", *source);

    let service = Arc::clone(&handle.0);
    let source = (*source).clone();
    let tx = channels.decoded_tx.clone();

    #[cfg(not(target_family = "wasm"))]
    runtime.spawn_background_task(move |_ctx| async move {
        let result = load(&service, &source).await;
        let _ = tx.send(result).await;
    });

    #[cfg(target_family = "wasm")]
    AsyncComputeTaskPool::get()
        .spawn(async move {
            let result = load(&service, &source).await;
            let _ = tx.send(result).await;
        })
        .detach();
}

async fn load(service: &TerrainService, source: &TerrainSource) -> LoadResult {
    match source {
        TerrainSource::Url(url) => service.load_url(&Fetcher::new(), url).await,
        TerrainSource::File(path) => service.load_file(path),
    }
}

/// Poll for a decoded terrain: spawn its mesh and start indexing.
#[allow(clippy::needless_pass_by_value)]
fn poll_decoded_terrain(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    handle: Res<TerrainHandle>,
    channels: Res<LoaderChannels>,
    existing: Query<Entity, With<TerrainMeshMarker>>,
    mut cameras: Query<&mut Transform, With<WalkCamera>>,
) {
    let Ok(result) = channels.decoded_rx.try_recv() else {
        return;
    };

    let terrain = match result {
        Ok(Some(terrain)) => terrain,
        Ok(None) => {
            tracing::debug!("Terrain load was superseded");
            return;
        }
        Err(e) => {
            tracing::error!("Failed to load terrain: {e}; walking on flat ground");
            return;
        }
    };

    for entity in &existing {
        commands.entity(entity).despawn();
    }

    let mesh = terrain.mesh();
    let has_colors = mesh.header().flags.has_colors();
    commands.spawn((
        Mesh3d(meshes.add(convert_mesh(mesh))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: if has_colors {
                Color::WHITE
            } else {
                Color::srgb(0.35, 0.5, 0.25)
            },
            perceptual_roughness: 0.9,
            double_sided: true,
            cull_mode: None,
            ..default()
        })),
        Transform::IDENTITY,
        TerrainMeshMarker {
            generation: terrain.generation(),
        },
    ));

    // Drop the camera in the middle of the terrain.
    let (min, max) = mesh.world_bounds();
    let centre = (min + max) * 0.5;
    for mut transform in &mut cameras {
        transform.translation.x = centre.x;
        transform.translation.z = centre.z;
    }

    let generation = terrain.generation();
    let service = Arc::clone(&handle.0);
    let tx = channels.indexed_tx.clone();
    AsyncComputeTaskPool::get()
        .spawn(async move {
            service.build_index(&terrain);
            let _ = tx.send(terrain).await;
        })
        .detach();

    tracing::info!("Terrain #{generation} decoded, indexing in background");
}

/// Poll for a finished index.
#[allow(clippy::needless_pass_by_value)]
fn poll_indexed_terrain(channels: Res<LoaderChannels>, handle: Res<TerrainHandle>) {
    let Ok(terrain) = channels.indexed_rx.try_recv() else {
        return;
    };

    let is_current = handle
        .0
        .current()
        .is_some_and(|current| Arc::ptr_eq(&current, &terrain));
    if is_current {
        tracing::info!(
            "Terrain #{} indexed, height queries use the quadtree",
            terrain.generation()
        );
    }
}
