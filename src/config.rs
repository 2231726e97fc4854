//! Gameplay tunables and asset locations.
//!
//! Defaults reproduce the shipped level's feel; the native binary can move
//! the asset directory with `HAUNTUS_ASSET_DIR`.

use glam::Vec3;
use std::f32::consts::FRAC_PI_2;

pub use crate::controller::input::KeyBindings;

#[derive(Debug, Clone)]
pub struct MovementConfig {
    pub move_speed: f32,
    pub gravity: f32,
    pub player_height: f32,
    /// Movement is blocked when a wall is at most this far along the move direction
    pub clearance: f32,
    pub mouse_sensitivity: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: 4.0,
            gravity: 30.0,
            player_height: 1.8,
            clearance: 0.5,
            mouse_sensitivity: 0.002,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DoorConfig {
    pub interact_range: f32,
    pub swing_angle: f32,
    pub swing_duration: f32,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            interact_range: 4.0,
            swing_angle: FRAC_PI_2,
            swing_duration: 1.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { fov_y_degrees: 75.0, z_near: 0.1, z_far: 1000.0 }
    }
}

/// One intensity pulse of the lightning flash
#[derive(Debug, Clone, Copy)]
pub struct FlashPulse {
    pub peak: f32,
    pub duration: f32,
    pub delay: f32,
}

#[derive(Debug, Clone)]
pub struct ScareConfig {
    pub interval: f32,
    pub flash_delay: f32,
    pub restore_delay: f32,
    pub light_offset: Vec3,
    pub light_distance: f32,
    pub pulses: Vec<FlashPulse>,
}

impl Default for ScareConfig {
    fn default() -> Self {
        Self {
            interval: 5.0,
            flash_delay: 0.5,
            restore_delay: 0.5,
            light_offset: Vec3::new(0.0, 5.0, 5.0),
            light_distance: 50.0,
            pulses: vec![
                FlashPulse { peak: 200.0, duration: 0.05, delay: 0.0 },
                FlashPulse { peak: 150.0, duration: 0.1, delay: 0.15 },
            ],
        }
    }
}

/// File names resolved against `base` (a URL prefix on the web, a directory natively)
#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub base: String,
    pub scene: String,
    pub scare_image: String,
    pub thunder: String,
    pub footsteps: String,
    pub volume: f32,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base: ".".to_string(),
            scene: "Hauntus.glb".to_string(),
            scare_image: "scare_image.jpg".to_string(),
            thunder: "thunder.mp3".to_string(),
            footsteps: "footstep.mp3".to_string(),
            volume: 0.5,
        }
    }
}

impl AssetConfig {
    pub fn resolve(&self, file: &str) -> String {
        if self.base.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", self.base.trim_end_matches('/'), file)
        }
    }
}

/// Names the level artist gave the objects the game looks up
#[derive(Debug, Clone)]
pub struct LevelNames {
    pub level: String,
    pub door: String,
    pub scare_face: String,
    pub spawn: String,
    pub event_plane: String,
}

impl Default for LevelNames {
    fn default() -> Self {
        Self {
            level: "Level".to_string(),
            door: "door_1".to_string(),
            scare_face: "face_scare".to_string(),
            spawn: "player_spawn".to_string(),
            event_plane: "event_plane".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GameConfig {
    pub keys: KeyBindings,
    pub camera: CameraConfig,
    pub movement: MovementConfig,
    pub door: DoorConfig,
    pub scare: ScareConfig,
    pub assets: AssetConfig,
    pub names: LevelNames,
}

impl GameConfig {
    /// Defaults for the native binary: assets under `assets/` unless
    /// `HAUNTUS_ASSET_DIR` points elsewhere
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.assets.base = std::env::var("HAUNTUS_ASSET_DIR").unwrap_or_else(|_| "assets".to_string());
        config
    }
}
