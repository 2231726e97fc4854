//! Timed jump-scare: thunder, then a lightning flash that reveals the face
//! and swaps the event plane's material, then a restore.
//!
//! The sequence is a three-phase state machine driven by cues fired from
//! the session's [`Tweener`]. Each step touches only the scene pieces that
//! actually loaded, but the phase lifecycle always runs to completion.

use glam::Vec3;
use tracing::debug;

use crate::audio::{self, SoundSlot};
use crate::config::ScareConfig;
use crate::model::{LightId, MaterialId, ObjectId, PointLight, SceneGraph};
use crate::tween::{TweenSpec, TweenTarget, Tweener};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScarePhase {
    Idle,
    Triggered,
    FlashActive { light: LightId },
}

/// Delayed steps of the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScareCue {
    Flash,
    Restore(LightId),
}

/// Repeating timer advanced by frame time
#[derive(Debug, Clone)]
pub struct Interval {
    pub period: f32,
    elapsed: f32,
    armed: bool,
}

impl Interval {
    pub fn new(period: f32) -> Self {
        Self { period, elapsed: 0.0, armed: false }
    }

    pub fn arm(&mut self) {
        self.armed = true;
        self.elapsed = 0.0;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Number of periods completed during this step
    pub fn advance(&mut self, dt: f32) -> u32 {
        if !self.armed || self.period <= 0.0 {
            return 0;
        }
        self.elapsed += dt.max(0.0);
        let mut fired = 0;
        while self.elapsed >= self.period {
            self.elapsed -= self.period;
            fired += 1;
        }
        fired
    }
}

pub struct ScareSequencer {
    config: ScareConfig,
    phase: ScarePhase,
    pub face: Option<ObjectId>,
    pub event_plane: Option<ObjectId>,
    pub default_material: Option<MaterialId>,
    pub scare_material: Option<MaterialId>,
}

impl ScareSequencer {
    pub fn new(config: ScareConfig) -> Self {
        Self {
            config,
            phase: ScarePhase::Idle,
            face: None,
            event_plane: None,
            default_material: None,
            scare_material: None,
        }
    }

    pub fn phase(&self) -> ScarePhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase != ScarePhase::Idle
    }

    /// Start a sequence. Returns false (and does nothing) while one is running.
    pub fn trigger(&mut self, thunder: &mut SoundSlot, tweener: &mut Tweener<ScareCue>) -> bool {
        if self.is_playing() {
            debug!("scare trigger dropped, sequence still running");
            return false;
        }
        self.phase = ScarePhase::Triggered;
        debug!("scare triggered");
        audio::restart(thunder);
        tweener.delayed_call(self.config.flash_delay, ScareCue::Flash);
        true
    }

    pub fn handle_cue(&mut self, cue: ScareCue, scene: &mut SceneGraph, tweener: &mut Tweener<ScareCue>) {
        match (cue, self.phase) {
            (ScareCue::Flash, ScarePhase::Triggered) => self.flash(scene, tweener),
            (ScareCue::Restore(light), ScarePhase::FlashActive { light: active }) if light == active => {
                self.restore(light, scene, tweener)
            }
            (cue, phase) => debug!("ignoring {:?} in phase {:?}", cue, phase),
        }
    }

    fn flash(&mut self, scene: &mut SceneGraph, tweener: &mut Tweener<ScareCue>) {
        let anchor = self.face.and_then(|f| scene.world_position(f)).unwrap_or(Vec3::ZERO);
        let light = scene.add_light(PointLight {
            position: anchor + self.config.light_offset,
            color: Vec3::ONE,
            intensity: 0.0,
            distance: self.config.light_distance,
        });

        let target = TweenTarget::LightIntensity(light);
        for pulse in &self.config.pulses {
            tweener.to(target, pulse.peak, TweenSpec::new(pulse.duration).delay(pulse.delay).yoyo(1));
        }

        if let Some(face) = self.face {
            scene.set_visible(face, true);
        }
        if let (Some(plane), Some(material)) = (self.event_plane, self.scare_material) {
            scene.set_material(plane, material);
        }

        self.phase = ScarePhase::FlashActive { light };
        debug!("scare flash");
        tweener.delayed_call(self.config.restore_delay, ScareCue::Restore(light));
    }

    fn restore(&mut self, light: LightId, scene: &mut SceneGraph, tweener: &mut Tweener<ScareCue>) {
        if let Some(face) = self.face {
            scene.set_visible(face, false);
        }
        if let (Some(plane), Some(material)) = (self.event_plane, self.default_material) {
            scene.set_material(plane, material);
        }
        tweener.kill_target(TweenTarget::LightIntensity(light));
        scene.remove_light(light);
        self.phase = ScarePhase::Idle;
        debug!("scare restored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::test_support::RecordingSound;
    use crate::model::{Material, Transform};

    struct Fixture {
        scene: SceneGraph,
        tweener: Tweener<ScareCue>,
        thunder: SoundSlot,
        seq: ScareSequencer,
    }

    fn fixture() -> Fixture {
        let mut scene = SceneGraph::new();
        let face = scene.add_object("face_scare", Transform::from_translation(Vec3::new(1.0, 2.0, 3.0)), None);
        scene.set_visible(face, false);
        let plane = scene.add_object("event_plane", Transform::default(), None);
        let default = scene.add_material(Material::colored("wall", [1.0; 4]));
        let scare = scene.add_material(Material::colored("scare", [1.0, 0.0, 0.0, 1.0]));
        scene.set_material(plane, default);

        let mut seq = ScareSequencer::new(ScareConfig::default());
        seq.face = Some(face);
        seq.event_plane = Some(plane);
        seq.default_material = Some(default);
        seq.scare_material = Some(scare);
        Fixture { scene, tweener: Tweener::new(), thunder: None, seq }
    }

    impl Fixture {
        fn advance(&mut self, dt: f32) {
            for cue in self.tweener.update(dt, &mut self.scene) {
                self.seq.handle_cue(cue, &mut self.scene, &mut self.tweener);
            }
        }
    }

    #[test]
    fn full_sequence_returns_to_idle() {
        let mut f = fixture();
        let face = f.seq.face.unwrap();
        let plane = f.seq.event_plane.unwrap();
        let (sound, log) = RecordingSound::new();
        f.thunder = Some(sound);

        assert!(f.seq.trigger(&mut f.thunder, &mut f.tweener));
        assert_eq!(f.seq.phase(), ScarePhase::Triggered);
        assert_eq!(log.borrow().plays, 1);

        f.advance(0.5);
        let ScarePhase::FlashActive { light } = f.seq.phase() else { panic!("expected flash") };
        assert!(f.scene.is_rendered(face));
        assert_eq!(f.scene.object(plane).unwrap().material, f.seq.scare_material);
        let pos = f.scene.light(light).unwrap().position;
        assert!((pos - Vec3::new(1.0, 7.0, 8.0)).length() < 1e-5);

        f.advance(0.5);
        assert_eq!(f.seq.phase(), ScarePhase::Idle);
        assert!(!f.scene.is_rendered(face));
        assert_eq!(f.scene.object(plane).unwrap().material, f.seq.default_material);
        assert_eq!(f.scene.lights().count(), 0);
        assert_eq!(f.tweener.active_tweens(), 0);
    }

    #[test]
    fn overlapping_trigger_is_dropped() {
        let mut f = fixture();
        assert!(f.seq.trigger(&mut f.thunder, &mut f.tweener));
        f.advance(0.2);
        assert!(!f.seq.trigger(&mut f.thunder, &mut f.tweener));
        f.advance(0.4);
        assert!(!f.seq.trigger(&mut f.thunder, &mut f.tweener));
        assert_eq!(f.tweener.pending_calls(), 1);
    }

    #[test]
    fn flash_pulses_light_intensity() {
        let mut f = fixture();
        f.seq.trigger(&mut f.thunder, &mut f.tweener);
        f.advance(0.5);
        let ScarePhase::FlashActive { light } = f.seq.phase() else { panic!("expected flash") };
        f.advance(0.05);
        assert!(f.scene.light(light).unwrap().intensity > 100.0);
        f.advance(0.1);
        assert!(f.scene.light(light).unwrap().intensity < 1.0);
    }

    #[test]
    fn missing_pieces_still_complete_the_cycle() {
        let mut scene = SceneGraph::new();
        let mut tweener = Tweener::new();
        let mut thunder: SoundSlot = None;
        let mut seq = ScareSequencer::new(ScareConfig::default());
        assert!(seq.trigger(&mut thunder, &mut tweener));
        for _ in 0..20 {
            for cue in tweener.update(0.1, &mut scene) {
                seq.handle_cue(cue, &mut scene, &mut tweener);
            }
        }
        assert_eq!(seq.phase(), ScarePhase::Idle);
        assert_eq!(scene.lights().count(), 0);
    }

    #[test]
    fn interval_fires_once_per_period() {
        let mut interval = Interval::new(5.0);
        assert_eq!(interval.advance(6.0), 0);
        interval.arm();
        assert_eq!(interval.advance(4.5), 0);
        assert_eq!(interval.advance(0.5), 1);
        assert_eq!(interval.advance(10.0), 2);
    }
}
