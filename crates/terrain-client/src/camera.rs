//! Ground-following first-person camera.
//!
//! WASD walks on the XZ plane, mouse looks around, Shift runs. Every frame the
//! camera asks the terrain service for the ground height under it and stands
//! `eye_height` above that. While no terrain is loaded it keeps the last
//! ground height it saw.

use bevy::ecs::message::MessageReader;
use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, CursorOptions, PrimaryWindow};

use crate::loader::TerrainHandle;

/// Steepest allowed pitch, just short of straight up or down.
const MAX_PITCH: f32 = 1.54;

/// Plugin for the walking camera.
pub struct GroundCameraPlugin;

impl Plugin for GroundCameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WalkSettings>()
            .add_systems(Startup, grab_cursor)
            .add_systems(
                Update,
                (
                    cursor_grab_system,
                    camera_look.run_if(cursor_is_grabbed),
                    camera_walk,
                )
                    .chain(),
            );
    }
}

/// Settings for camera movement.
#[derive(Resource)]
pub struct WalkSettings {
    /// Walking speed in meters per second.
    pub walk_speed: f32,
    /// Speed multiplier when the run key is held.
    pub run_multiplier: f32,
    /// Mouse sensitivity for look rotation.
    pub mouse_sensitivity: f32,
    /// Height of the eye above the ground.
    pub eye_height: f32,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            walk_speed: 5.0,
            run_multiplier: 4.0,
            mouse_sensitivity: 0.002,
            eye_height: 1.7,
        }
    }
}

/// Marker component for the camera entity that walks on the terrain.
#[derive(Component, Default)]
pub struct WalkCamera {
    /// Rotation about the world Y axis, in radians.
    pub yaw: f32,
    /// Rotation about the camera's X axis, in radians.
    pub pitch: f32,
    /// Last ground height under the camera. Used as the fallback.
    pub ground: f32,
}

/// Grab the cursor on startup.
fn grab_cursor(
    mut cursor: Single<&mut CursorOptions>,
    mut window: Single<&mut Window, With<PrimaryWindow>>,
) {
    set_cursor_grab(&mut cursor, &mut window, true);
}

/// Set cursor grab state, centering the cursor when grabbing.
fn set_cursor_grab(cursor: &mut CursorOptions, window: &mut Window, grabbed: bool) {
    if grabbed {
        cursor.grab_mode = CursorGrabMode::Locked;
        cursor.visible = false;
        let center = Vec2::new(window.width() / 2.0, window.height() / 2.0);
        window.set_cursor_position(Some(center));
    } else {
        cursor.grab_mode = CursorGrabMode::None;
        cursor.visible = true;
    }
}

#[allow(clippy::needless_pass_by_value)]
fn cursor_is_grabbed(cursor: Single<&CursorOptions>) -> bool {
    cursor.grab_mode == CursorGrabMode::Locked
}

/// ESC releases the cursor, left-click grabs it again.
#[allow(clippy::needless_pass_by_value)]
fn cursor_grab_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    mut cursor: Single<&mut CursorOptions>,
    mut window: Single<&mut Window, With<PrimaryWindow>>,
) {
    let is_grabbed = cursor.grab_mode == CursorGrabMode::Locked;

    if keyboard.just_pressed(KeyCode::Escape) && is_grabbed {
        set_cursor_grab(&mut cursor, &mut window, false);
    } else if mouse.just_pressed(MouseButton::Left) && !is_grabbed {
        set_cursor_grab(&mut cursor, &mut window, true);
    }
}

/// Handle mouse look rotation.
#[allow(clippy::needless_pass_by_value)]
fn camera_look(
    mut mouse_motion: MessageReader<MouseMotion>,
    settings: Res<WalkSettings>,
    mut query: Query<(&mut Transform, &mut WalkCamera)>,
) {
    let mut delta = Vec2::ZERO;
    for event in mouse_motion.read() {
        delta += event.delta;
    }

    if delta == Vec2::ZERO {
        return;
    }

    for (mut transform, mut camera) in &mut query {
        camera.yaw -= delta.x * settings.mouse_sensitivity;
        camera.pitch =
            (camera.pitch - delta.y * settings.mouse_sensitivity).clamp(-MAX_PITCH, MAX_PITCH);
        transform.rotation = Quat::from_euler(EulerRot::YXZ, camera.yaw, camera.pitch, 0.0);
    }
}

/// Handle WASD movement and keep the camera on the ground.
#[allow(clippy::needless_pass_by_value)]
fn camera_walk(
    time: Res<Time>,
    keyboard: Res<ButtonInput<KeyCode>>,
    settings: Res<WalkSettings>,
    terrain: Res<TerrainHandle>,
    mut query: Query<(&mut Transform, &mut WalkCamera)>,
) {
    for (mut transform, mut camera) in &mut query {
        let mut speed = settings.walk_speed;
        if keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight) {
            speed *= settings.run_multiplier;
        }

        // Movement stays on the XZ plane regardless of pitch.
        let (sin, cos) = camera.yaw.sin_cos();
        let forward = Vec3::new(-sin, 0.0, -cos);
        let right = Vec3::new(cos, 0.0, -sin);

        let mut movement = Vec3::ZERO;
        if keyboard.pressed(KeyCode::KeyW) {
            movement += forward;
        }
        if keyboard.pressed(KeyCode::KeyS) {
            movement -= forward;
        }
        if keyboard.pressed(KeyCode::KeyA) {
            movement -= right;
        }
        if keyboard.pressed(KeyCode::KeyD) {
            movement += right;
        }

        if movement != Vec3::ZERO {
            transform.translation += movement.normalize() * speed * time.delta_secs();
        }

        let Vec3 { x, z, .. } = transform.translation;
        camera.ground = terrain.0.query_height(x, z, camera.ground);
        transform.translation.y = camera.ground + settings.eye_height;
    }
}
