use std::cell::RefCell;
use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

use glam::Vec3;
use hauntus::assets::{LevelAsset, LevelHandles};
use hauntus::audio::{Sound, SoundKind};
use hauntus::config::{GameConfig, LevelNames};
use hauntus::controller::{GameSession, InputEvent, ScarePhase};
use hauntus::model::{Material, MeshData, SceneGraph, TextureData, Transform};

#[derive(Default)]
struct Log {
    plays: u32,
    playing: bool,
}

struct Recording(Rc<RefCell<Log>>);

impl Sound for Recording {
    fn play(&mut self) {
        let mut log = self.0.borrow_mut();
        log.plays += 1;
        log.playing = true;
    }

    fn stop(&mut self) {
        self.0.borrow_mut().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.0.borrow().playing
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn set_looping(&mut self, _looping: bool) {}
}

fn recording() -> (Box<dyn Sound>, Rc<RefCell<Log>>) {
    let log = Rc::new(RefCell::new(Log::default()));
    (Box::new(Recording(log.clone())), log)
}

/// Floor at y = 0, spawn two units above it, optional door three units ahead
fn build_level(with_door: bool, with_face: bool) -> LevelAsset {
    let mut scene = SceneGraph::new();
    let root = scene.add_object("scene", Transform::default(), None);

    let floor = scene.add_mesh(MeshData::plane(40.0));
    let grey = scene.add_material(Material::colored("floor", [0.5, 0.5, 0.5, 1.0]));
    scene.add_mesh_object("Level", Transform::default(), Some(root), floor, grey);
    scene.add_object("player_spawn", Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)), Some(root));

    if with_door {
        let slab = scene.add_mesh(MeshData::cuboid(Vec3::new(0.5, 1.0, 0.1)));
        let wood = scene.add_material(Material::colored("wood", [0.4, 0.3, 0.2, 1.0]));
        scene.add_mesh_object("door_1", Transform::from_translation(Vec3::new(0.0, 1.0, -3.0)), Some(root), slab, wood);
    }

    if with_face {
        scene.add_object("face_scare", Transform::from_translation(Vec3::new(0.0, 1.5, -8.0)), Some(root));
        let plane = scene.add_mesh(MeshData::plane(2.0));
        let wall = scene.add_material(Material::colored("wall", [1.0; 4]));
        scene.add_mesh_object("event_plane", Transform::from_translation(Vec3::new(0.0, 0.1, -6.0)), Some(root), plane, wall);
    }

    let handles = LevelHandles::resolve(&scene, &LevelNames::default());
    LevelAsset { scene, handles }
}

fn playing_session(level: LevelAsset) -> GameSession {
    let mut session = GameSession::new(GameConfig::default(), 800, 600);
    session.install_level(level);
    session.handle_input(&InputEvent::PointerLockChanged { locked: true });
    session
}

#[test]
fn player_falls_to_the_floor_and_stays_there() {
    let mut session = playing_session(build_level(false, false));
    let spawn_y = session.camera.eye.y;

    let mut heights = Vec::new();
    for _ in 0..30 {
        session.tick(0.1);
        heights.push(session.camera.eye.y);
    }

    assert!(heights[0] < spawn_y);
    let settled = heights[heights.len() - 1];
    for h in &heights[5..] {
        assert!((h - settled).abs() < 1e-4, "altitude drifted: {h} vs {settled}");
    }
    assert!(settled > 0.0 && settled < 1.8);
    assert!(session.player.on_ground);
}

#[test]
fn one_press_swings_the_door_open_once() {
    let mut session = playing_session(build_level(true, false));
    let door = session.level.door.expect("door resolved");
    assert!(session.collidables.contains(door));

    session.handle_input(&InputEvent::KeyDown(" ".into()));
    session.tick(0.1);
    assert_eq!(session.door.map(|d| d.is_open), Some(true));
    assert!(!session.collidables.contains(door));

    // key stays down for two more seconds
    for _ in 0..20 {
        session.tick(0.1);
        assert_eq!(session.door.map(|d| d.is_open), Some(true));
    }
    let angle = session.scene.rotation_y(door).unwrap_or_default();
    assert!((angle - FRAC_PI_2).abs() < 1e-4, "door at {angle}");

    session.handle_input(&InputEvent::KeyUp(" ".into()));
    session.tick(0.1);
    session.handle_input(&InputEvent::KeyDown(" ".into()));
    session.tick(0.1);
    assert_eq!(session.door.map(|d| d.is_open), Some(false));
    assert!(session.collidables.contains(door));
}

#[test]
fn door_collision_tracks_open_state() {
    let mut session = playing_session(build_level(true, false));
    let door = session.level.door.expect("door resolved");

    for step in 0..12 {
        let key = if step % 2 == 0 { InputEvent::KeyDown(" ".into()) } else { InputEvent::KeyUp(" ".into()) };
        session.handle_input(&key);
        session.tick(0.05);
        let open = session.door.map(|d| d.is_open).unwrap_or(false);
        assert_eq!(session.collidables.contains(door), !open);
    }
}

#[test]
fn scare_plays_twice_five_seconds_apart() {
    let mut session = GameSession::new(GameConfig::default(), 800, 600);
    let (thunder, log) = recording();
    session.install_sound(SoundKind::Thunder, thunder);
    session.install_scare_image(TextureData { width: 1, height: 1, rgba: vec![200, 0, 0, 255] });
    session.install_level(build_level(false, true));

    let face = session.level.scare_face.expect("face resolved");
    let plane = session.level.event_plane.expect("plane resolved");
    let default_material = session.scene.object(plane).and_then(|o| o.material);

    let mut shown = 0;
    let mut hidden = 0;
    let mut completed = 0;
    let mut was_visible = false;
    let mut last_phase = session.scare_phase();

    // no pointer lock: the sequence runs on its own
    for _ in 0..48 {
        session.tick(0.25);
        let visible = session.scene.is_rendered(face);
        if visible && !was_visible {
            shown += 1;
            assert_ne!(session.scene.object(plane).and_then(|o| o.material), default_material);
        }
        if !visible && was_visible {
            hidden += 1;
            assert_eq!(session.scene.object(plane).and_then(|o| o.material), default_material);
        }
        let phase = session.scare_phase();
        if matches!(last_phase, ScarePhase::FlashActive { .. }) && phase == ScarePhase::Idle {
            completed += 1;
            assert_eq!(session.scene.lights().count(), 0);
        }
        was_visible = visible;
        last_phase = phase;
    }

    assert_eq!(log.borrow().plays, 2);
    assert_eq!(shown, 2);
    assert_eq!(hidden, 2);
    assert_eq!(completed, 2);
    assert_eq!(session.scare_phase(), ScarePhase::Idle);
}

#[test]
fn nothing_moves_without_a_level() {
    let mut session = GameSession::new(GameConfig::default(), 800, 600);
    session.handle_input(&InputEvent::PointerLockChanged { locked: true });
    session.handle_input(&InputEvent::KeyDown("w".into()));
    let start = session.camera.eye;
    for _ in 0..10 {
        session.tick(0.1);
    }
    assert_eq!(session.camera.eye, start);
    assert_eq!(session.scare_phase(), ScarePhase::Idle);
}
