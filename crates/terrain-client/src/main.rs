//! First-person terrain viewer.
//!
//! Usage: `terrain-client [path-or-url] [config.json]`
//!
//! Loads an ITRI terrain in the background, draws it, and keeps the camera
//! standing on it. WASD to walk, mouse to look, Shift to run.

mod camera;
mod loader;
mod mesh;

use std::sync::Arc;

use bevy::prelude::*;
use terrain::{TerrainConfig, TerrainService};

use camera::{GroundCameraPlugin, WalkCamera};
use loader::{TerrainHandle, TerrainLoaderPlugin, TerrainSource};

const DEFAULT_SOURCE: &str = "terrain.bin";

fn main() {
    #[cfg(not(target_family = "wasm"))]
    tracing_subscriber::fmt::init();

    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let args: Vec<String> = std::env::args().collect();
    let source = TerrainSource::parse(args.get(1).map_or(DEFAULT_SOURCE, String::as_str));
    let config = match args.get(2) {
        Some(path) => TerrainConfig::from_json_file(path).unwrap_or_else(|e| {
            tracing::error!("Failed to read config {path}: {e}; using defaults");
            TerrainConfig::default()
        }),
        None => TerrainConfig::default(),
    };

    let mut app = App::new();
    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Terrain Viewer".into(),
            ..default()
        }),
        ..default()
    }));

    #[cfg(not(target_family = "wasm"))]
    app.add_plugins(bevy_tokio_tasks::TokioTasksPlugin::default());

    app.insert_resource(source)
        .insert_resource(TerrainHandle(Arc::new(TerrainService::new(config))))
        .add_plugins((TerrainLoaderPlugin, GroundCameraPlugin))
        .add_systems(Startup, setup_scene)
        .run();
}

/// Spawn the camera and lighting. Terrain meshes are spawned by the loader.
fn setup_scene(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 2.0, 0.0),
        WalkCamera::default(),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 10_000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(50.0, 100.0, 25.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}
