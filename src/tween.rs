//! Numeric property tweens and delayed cues on their own clock.
//!
//! The scheduler never owns the values it animates. Each `update` reads
//! start values from and writes interpolated values into an [`Animatable`]
//! host (the scene graph), and hands fired cues back to the caller, so
//! callbacks carry data instead of closures over shared state.

use crate::model::{LightId, ObjectId, SceneGraph};

/// Easing curves, named after their GSAP counterparts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ease {
    Linear,
    Power1In,
    Power1Out,
    Power1InOut,
    Power2In,
    Power2Out,
    Power2InOut,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power1In => t * t,
            Ease::Power1Out => 1.0 - (1.0 - t) * (1.0 - t),
            Ease::Power1InOut => {
                if t < 0.5 { 2.0 * t * t } else { 1.0 - (-2.0 * t + 2.0).powi(2) / 2.0 }
            }
            Ease::Power2In => t * t * t,
            Ease::Power2Out => 1.0 - (1.0 - t).powi(3),
            Ease::Power2InOut => {
                if t < 0.5 { 4.0 * t * t * t } else { 1.0 - (-2.0 * t + 2.0).powi(3) / 2.0 }
            }
        }
    }
}

/// A numeric property a tween can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TweenTarget {
    RotationY(ObjectId),
    LightIntensity(LightId),
}

/// Read/write access to tweened properties. `None` means the target is gone.
pub trait Animatable {
    fn value(&self, target: TweenTarget) -> Option<f32>;
    fn set_value(&mut self, target: TweenTarget, value: f32);
}

impl Animatable for SceneGraph {
    fn value(&self, target: TweenTarget) -> Option<f32> {
        match target {
            TweenTarget::RotationY(id) => self.rotation_y(id),
            TweenTarget::LightIntensity(id) => self.light(id).map(|l| l.intensity),
        }
    }

    fn set_value(&mut self, target: TweenTarget, value: f32) {
        match target {
            TweenTarget::RotationY(id) => self.set_rotation_y(id, value),
            TweenTarget::LightIntensity(id) => {
                if let Some(light) = self.light_mut(id) {
                    light.intensity = value;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenSpec {
    pub duration: f32,
    pub delay: f32,
    pub ease: Ease,
    pub yoyo: bool,
    /// Extra cycles after the first
    pub repeat: u32,
    /// Kill running tweens on the same target when this one is created
    pub overwrite: bool,
}

impl TweenSpec {
    pub fn new(duration: f32) -> Self {
        Self { duration, delay: 0.0, ease: Ease::Power1Out, yoyo: false, repeat: 0, overwrite: false }
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    pub fn yoyo(mut self, repeat: u32) -> Self {
        self.yoyo = true;
        self.repeat = repeat;
        self
    }

    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    fn total(&self) -> f32 {
        self.duration * (self.repeat + 1) as f32
    }

    /// Eased progress at `local` seconds after the delay
    fn progress(&self, local: f32) -> f32 {
        if self.duration <= 0.0 || local >= self.total() {
            let reversed = self.yoyo && self.repeat % 2 == 1;
            return if reversed { 0.0 } else { 1.0 };
        }
        let cycle = (local / self.duration).floor();
        let p = (local - cycle * self.duration) / self.duration;
        if self.yoyo && (cycle as u32) % 2 == 1 {
            self.ease.apply(1.0 - p)
        } else {
            self.ease.apply(p)
        }
    }
}

struct Tween {
    target: TweenTarget,
    end: f32,
    spec: TweenSpec,
    starts_at: f64,
    start_value: Option<f32>,
}

struct DelayedCall<C> {
    due: f64,
    seq: u64,
    cue: C,
}

/// Tween and delayed-call scheduler
pub struct Tweener<C> {
    clock: f64,
    seq: u64,
    tweens: Vec<Tween>,
    calls: Vec<DelayedCall<C>>,
}

impl<C> Default for Tweener<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Tweener<C> {
    pub fn new() -> Self {
        Self { clock: 0.0, seq: 0, tweens: Vec::new(), calls: Vec::new() }
    }

    /// Seconds on the scheduler's own clock
    pub fn time(&self) -> f64 {
        self.clock
    }

    /// Animate `target` towards `end`. The start value is read when the
    /// tween first becomes active, after its delay.
    pub fn to(&mut self, target: TweenTarget, end: f32, spec: TweenSpec) {
        if spec.overwrite {
            self.kill_target(target);
        }
        self.tweens.push(Tween {
            target,
            end,
            spec,
            starts_at: self.clock + spec.delay.max(0.0) as f64,
            start_value: None,
        });
    }

    /// Fire `cue` from `update` once `delay` seconds have passed
    pub fn delayed_call(&mut self, delay: f32, cue: C) {
        self.seq += 1;
        self.calls.push(DelayedCall { due: self.clock + delay.max(0.0) as f64, seq: self.seq, cue });
    }

    pub fn kill_target(&mut self, target: TweenTarget) {
        self.tweens.retain(|t| t.target != target);
    }

    pub fn is_animating(&self, target: TweenTarget) -> bool {
        self.tweens.iter().any(|t| t.target == target)
    }

    pub fn active_tweens(&self) -> usize {
        self.tweens.len()
    }

    pub fn pending_calls(&self) -> usize {
        self.calls.len()
    }

    /// Advance by `dt` seconds, write tweened values into `host` and return
    /// the cues that came due, earliest first.
    pub fn update(&mut self, dt: f32, host: &mut impl Animatable) -> Vec<C> {
        self.clock += dt.max(0.0) as f64;
        let now = self.clock;

        self.tweens.retain_mut(|tween| {
            if now < tween.starts_at {
                return true;
            }
            let start = match tween.start_value {
                Some(v) => v,
                None => match host.value(tween.target) {
                    Some(v) => *tween.start_value.insert(v),
                    None => return false,
                },
            };
            let local = (now - tween.starts_at) as f32;
            let p = tween.spec.progress(local);
            host.set_value(tween.target, start + (tween.end - start) * p);
            local < tween.spec.total()
        });

        let mut fired = Vec::new();
        let mut i = 0;
        while i < self.calls.len() {
            if self.calls[i].due <= now {
                fired.push(self.calls.swap_remove(i));
            } else {
                i += 1;
            }
        }
        fired.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        fired.into_iter().map(|c| c.cue).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PointLight, Transform};
    use glam::Vec3;

    fn scene_with_light() -> (SceneGraph, LightId) {
        let mut scene = SceneGraph::new();
        let light = scene.add_light(PointLight { position: Vec3::ZERO, color: Vec3::ONE, intensity: 0.0, distance: 50.0 });
        (scene, light)
    }

    #[test]
    fn eases_hit_their_endpoints() {
        for ease in [
            Ease::Linear,
            Ease::Power1In,
            Ease::Power1Out,
            Ease::Power1InOut,
            Ease::Power2In,
            Ease::Power2Out,
            Ease::Power2InOut,
        ] {
            assert!(ease.apply(0.0).abs() < 1e-6, "{ease:?}");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-6, "{ease:?}");
        }
        assert!((Ease::Power2InOut.apply(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn yoyo_pulse_returns_to_start() {
        let (mut scene, light) = scene_with_light();
        let mut tweener: Tweener<()> = Tweener::new();
        let target = TweenTarget::LightIntensity(light);
        tweener.to(target, 200.0, TweenSpec::new(0.05).ease(Ease::Linear).yoyo(1));

        tweener.update(0.05, &mut scene);
        assert!((scene.light(light).unwrap().intensity - 200.0).abs() < 1e-2);
        tweener.update(0.025, &mut scene);
        assert!((scene.light(light).unwrap().intensity - 100.0).abs() < 1e-2);
        tweener.update(0.05, &mut scene);
        assert_eq!(scene.light(light).unwrap().intensity, 0.0);
        assert_eq!(tweener.active_tweens(), 0);
    }

    #[test]
    fn delayed_tween_captures_start_when_it_begins() {
        let mut scene = SceneGraph::new();
        let door = scene.add_object("door", Transform::default(), None);
        let mut tweener: Tweener<()> = Tweener::new();
        let target = TweenTarget::RotationY(door);
        tweener.to(target, 1.0, TweenSpec::new(1.0).delay(1.0).ease(Ease::Linear));

        scene.set_rotation_y(door, 0.5);
        tweener.update(0.5, &mut scene);
        assert_eq!(scene.rotation_y(door), Some(0.5));
        tweener.update(1.0, &mut scene);
        assert!((scene.rotation_y(door).unwrap() - 0.75).abs() < 1e-5);
    }

    #[test]
    fn overwrite_replaces_running_tween() {
        let mut scene = SceneGraph::new();
        let door = scene.add_object("door", Transform::default(), None);
        let mut tweener: Tweener<()> = Tweener::new();
        let target = TweenTarget::RotationY(door);
        tweener.to(target, 10.0, TweenSpec::new(1.0).overwrite());
        tweener.update(0.5, &mut scene);
        tweener.to(target, 0.0, TweenSpec::new(1.0).overwrite());
        assert_eq!(tweener.active_tweens(), 1);
        tweener.update(1.0, &mut scene);
        assert_eq!(scene.rotation_y(door), Some(0.0));
    }

    #[test]
    fn cues_fire_in_due_order() {
        let mut scene = SceneGraph::new();
        let mut tweener = Tweener::new();
        tweener.delayed_call(0.3, "late");
        tweener.delayed_call(0.1, "early");
        assert!(tweener.update(0.05, &mut scene).is_empty());
        assert_eq!(tweener.update(0.5, &mut scene), vec!["early", "late"]);
        assert_eq!(tweener.pending_calls(), 0);
    }

    #[test]
    fn tween_on_removed_light_is_dropped() {
        let (mut scene, light) = scene_with_light();
        let mut tweener: Tweener<()> = Tweener::new();
        tweener.to(TweenTarget::LightIntensity(light), 5.0, TweenSpec::new(1.0));
        scene.remove_light(light);
        tweener.update(0.1, &mut scene);
        assert_eq!(tweener.active_tweens(), 0);
    }
}
