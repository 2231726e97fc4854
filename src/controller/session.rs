use glam::Vec3;
use tracing::{debug, info};

use crate::assets::{LevelAsset, LevelHandles};
use crate::audio::{Sound, SoundBank, SoundKind};
use crate::config::GameConfig;
use crate::controller::camera_controller::{CameraController, PlayerState};
use crate::controller::collidables::CollidableSet;
use crate::controller::input::{InputEvent, InputState};
use crate::controller::interaction::{Door, InteractionSystem};
use crate::controller::movement::MovementSystem;
use crate::controller::scare::{Interval, ScareCue, ScarePhase, ScareSequencer};
use crate::model::{Camera, Material, SceneGraph, TextureData};
use crate::tween::Tweener;

/// Longest frame step the drivers hand to `tick`
pub const MAX_FRAME_DT: f32 = 0.1;

pub fn clamp_frame_dt(dt: f32) -> f32 {
    if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 }
}

/// Snapshot for the debug overlay
#[derive(Debug, Clone, Copy)]
pub struct SessionStatus {
    pub position: Vec3,
    pub on_ground: bool,
    pub door_open: Option<bool>,
    pub scare_phase: ScarePhase,
    pub level_loaded: bool,
    pub controls_active: bool,
}

/// All world state for one play session
pub struct GameSession {
    pub config: GameConfig,
    pub camera: Camera,
    pub player: PlayerState,
    pub input: InputState,
    pub collidables: CollidableSet,
    pub scene: SceneGraph,
    pub level: LevelHandles,
    pub door: Option<Door>,
    pub sounds: SoundBank,
    pub tweener: Tweener<ScareCue>,
    look: CameraController,
    movement: MovementSystem,
    interaction: InteractionSystem,
    scare: ScareSequencer,
    interval: Interval,
    pending_scare_image: Option<TextureData>,
    level_loaded: bool,
}

impl GameSession {
    pub fn new(config: GameConfig, width: u32, height: u32) -> Self {
        Self {
            camera: Camera::from_config(width, height, &config.camera),
            player: PlayerState::new(),
            input: InputState::with_bindings(config.keys.clone()),
            collidables: CollidableSet::new(),
            scene: SceneGraph::new(),
            level: LevelHandles::default(),
            door: None,
            sounds: SoundBank::default(),
            tweener: Tweener::new(),
            look: CameraController::new(config.movement.mouse_sensitivity),
            movement: MovementSystem::new(&config.movement),
            interaction: InteractionSystem::new(&config.door),
            scare: ScareSequencer::new(config.scare.clone()),
            interval: Interval::new(config.scare.interval),
            pending_scare_image: None,
            level_loaded: false,
            config,
        }
    }

    /// Take ownership of a loaded level and wire the named objects into gameplay
    pub fn install_level(&mut self, asset: LevelAsset) {
        let LevelAsset { scene, handles } = asset;
        self.scene = scene;
        self.level = handles;
        self.collidables.clear();
        self.tweener = Tweener::new();

        if let Some(level) = handles.level {
            self.collidables.insert(level);
        }

        self.door = handles.door.map(Door::closed);
        if let Some(door) = handles.door {
            self.collidables.insert(door);
        }

        self.scare = ScareSequencer::new(self.config.scare.clone());
        self.scare.face = handles.scare_face;
        if let Some(face) = handles.scare_face {
            self.scene.set_visible(face, false);
            self.interval.arm();
        }

        if let Some(spawn) = handles.spawn.and_then(|s| self.scene.world_position(s)) {
            self.player.respawn(&mut self.camera, spawn);
        }

        self.scare.event_plane = handles.event_plane;
        self.scare.default_material = handles
            .event_plane
            .and_then(|p| self.scene.object(p))
            .and_then(|o| o.material);

        if let Some(image) = self.pending_scare_image.take() {
            self.register_scare_image(image);
        }

        self.level_loaded = true;
        info!("level installed, {} collidables", self.collidables.len());
    }

    /// The image can arrive before or after the level
    pub fn install_scare_image(&mut self, image: TextureData) {
        if self.level_loaded {
            self.register_scare_image(image);
        } else {
            self.pending_scare_image = Some(image);
        }
    }

    fn register_scare_image(&mut self, image: TextureData) {
        let texture = self.scene.add_texture(image);
        let material = self.scene.add_material(Material::textured("scare", texture));
        self.scare.scare_material = Some(material);
        debug!("scare material ready");
    }

    pub fn install_sound(&mut self, kind: SoundKind, sound: Box<dyn Sound>) {
        self.sounds.install(kind, sound, self.config.assets.volume);
        info!("{:?} sound ready", kind);
    }

    pub fn handle_input(&mut self, event: &InputEvent) {
        self.input.process_event(event);
        if let InputEvent::PointerLockChanged { locked: false } = event {
            if let Some(steps) = self.sounds.footsteps.as_mut() {
                if steps.is_playing() {
                    steps.stop();
                }
            }
        }
    }

    pub fn controls_active(&self) -> bool {
        self.input.pointer_locked
    }

    pub fn scare_phase(&self) -> ScarePhase {
        self.scare.phase()
    }

    pub fn is_level_loaded(&self) -> bool {
        self.level_loaded
    }

    /// One simulation frame
    pub fn tick(&mut self, dt: f32) {
        if self.controls_active() {
            let (dx, dy) = self.input.consume_look();
            self.look.apply_look(&mut self.camera, dx, dy);

            self.movement.update(
                &mut self.player,
                &mut self.camera,
                &self.input,
                &self.scene,
                &self.collidables,
                &mut self.sounds.footsteps,
                dt,
            );
            self.interaction.update(
                self.door.as_mut(),
                &self.camera,
                &self.input,
                &self.scene,
                &mut self.collidables,
                &mut self.tweener,
            );
        }

        for cue in self.tweener.update(dt, &mut self.scene) {
            self.scare.handle_cue(cue, &mut self.scene, &mut self.tweener);
        }

        // triggers schedule against the end-of-frame tweener clock
        for _ in 0..self.interval.advance(dt) {
            self.scare.trigger(&mut self.sounds.thunder, &mut self.tweener);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            position: self.camera.eye,
            on_ground: self.player.on_ground,
            door_open: self.door.map(|d| d.is_open),
            scare_phase: self.scare.phase(),
            level_loaded: self.level_loaded,
            controls_active: self.controls_active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LevelNames;
    use crate::model::{MeshData, Transform};

    fn level() -> LevelAsset {
        let mut scene = SceneGraph::new();
        let root = scene.add_object("scene", Transform::default(), None);
        let mesh = scene.add_mesh(MeshData::plane(50.0));
        let mat = scene.add_material(Material::colored("floor", [1.0; 4]));
        scene.add_mesh_object("Level", Transform::default(), Some(root), mesh, mat);
        scene.add_object("player_spawn", Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)), Some(root));
        scene.add_object("face_scare", Transform::default(), Some(root));
        let handles = LevelHandles::resolve(&scene, &LevelNames::default());
        LevelAsset { scene, handles }
    }

    #[test]
    fn install_wires_named_objects() {
        let mut session = GameSession::new(GameConfig::default(), 800, 600);
        session.install_level(level());
        assert_eq!(session.camera.eye, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(session.collidables.len(), 1);
        assert!(session.door.is_none());
        let face = session.level.scare_face.unwrap();
        assert!(!session.scene.is_rendered(face));
    }

    #[test]
    fn simulation_waits_for_pointer_lock() {
        let mut session = GameSession::new(GameConfig::default(), 800, 600);
        session.install_level(level());
        let start = session.camera.eye;
        session.tick(0.1);
        assert_eq!(session.camera.eye, start);

        session.handle_input(&InputEvent::PointerLockChanged { locked: true });
        session.tick(0.1);
        assert_ne!(session.camera.eye, start);
    }

    #[test]
    fn scare_runs_without_pointer_lock() {
        let mut session = GameSession::new(GameConfig::default(), 800, 600);
        session.install_level(level());
        for _ in 0..52 {
            session.tick(0.1);
        }
        // fired around the 5s mark, flash still 0.5s away
        assert_eq!(session.scare_phase(), ScarePhase::Triggered);
    }

    /// Frame-end times at which the phase entered Triggered and FlashActive
    fn triggered_to_flash(dt: f32) -> (f64, f64) {
        let mut session = GameSession::new(GameConfig::default(), 800, 600);
        session.install_level(level());
        let mut triggered_at = None;
        for frame in 1..200 {
            session.tick(dt);
            let now = frame as f64 * dt as f64;
            match session.scare_phase() {
                ScarePhase::Triggered if triggered_at.is_none() => triggered_at = Some(now),
                ScarePhase::FlashActive { .. } => {
                    let start = triggered_at.expect("flash without trigger");
                    return (start, now);
                }
                _ => {}
            }
        }
        panic!("no flash within 200 frames");
    }

    #[test]
    fn flash_follows_trigger_by_the_full_delay() {
        for dt in [0.1, 0.25, 0.05] {
            let (triggered, flashed) = triggered_to_flash(dt);
            let gap = flashed - triggered;
            assert!((gap - 0.5).abs() < 1e-3, "dt {dt}: Triggered lasted {gap}s");
        }
    }

    #[test]
    fn rebound_forward_key_moves_the_player() {
        let mut config = GameConfig::default();
        config.keys.forward = "i".to_string();
        let mut session = GameSession::new(config, 800, 600);
        session.install_level(level());
        session.handle_input(&InputEvent::PointerLockChanged { locked: true });

        session.handle_input(&InputEvent::KeyDown("w".into()));
        session.tick(0.1);
        assert_eq!(session.camera.eye.z, 0.0);

        session.handle_input(&InputEvent::KeyUp("w".into()));
        session.handle_input(&InputEvent::KeyDown("i".into()));
        session.tick(0.1);
        assert!(session.camera.eye.z < -0.3, "eye {:?}", session.camera.eye);
    }

    #[test]
    fn camera_takes_lens_from_config() {
        let mut config = GameConfig::default();
        config.camera.fov_y_degrees = 60.0;
        config.camera.z_far = 250.0;
        let session = GameSession::new(config, 800, 600);
        assert!((session.camera.fov_y - 60f32.to_radians()).abs() < 1e-6);
        assert_eq!(session.camera.z_far, 250.0);
    }

    #[test]
    fn scare_image_before_level_is_kept() {
        let mut session = GameSession::new(GameConfig::default(), 800, 600);
        session.install_scare_image(TextureData { width: 1, height: 1, rgba: vec![255; 4] });
        session.install_level(level());
        assert!(session.scare.scare_material.is_some());
    }

    #[test]
    fn frame_dt_is_clamped() {
        assert_eq!(clamp_frame_dt(0.5), MAX_FRAME_DT);
        assert_eq!(clamp_frame_dt(-1.0), 0.0);
        assert_eq!(clamp_frame_dt(f32::NAN), 0.0);
        assert_eq!(clamp_frame_dt(0.016), 0.016);
    }
}
