use tracing::debug;

use crate::config::DoorConfig;
use crate::controller::collidables::CollidableSet;
use crate::controller::input::{InputState, Key};
use crate::model::{Camera, ObjectId, SceneGraph};
use crate::tween::{Ease, TweenSpec, TweenTarget, Tweener};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Door {
    pub object: ObjectId,
    pub is_open: bool,
}

impl Door {
    pub fn closed(object: ObjectId) -> Self {
        Self { object, is_open: false }
    }
}

/// Edge-triggered door toggling from the crosshair ray
pub struct InteractionSystem {
    pub range: f32,
    pub swing_angle: f32,
    pub swing_duration: f32,
    interact_latched: bool,
}

impl InteractionSystem {
    pub fn new(config: &DoorConfig) -> Self {
        Self {
            range: config.interact_range,
            swing_angle: config.swing_angle,
            swing_duration: config.swing_duration,
            interact_latched: false,
        }
    }

    pub fn is_latched(&self) -> bool {
        self.interact_latched
    }

    /// Returns true when the door was toggled this frame
    pub fn update<C>(
        &mut self,
        door: Option<&mut Door>,
        camera: &Camera,
        input: &InputState,
        scene: &SceneGraph,
        collidables: &mut CollidableSet,
        tweener: &mut Tweener<C>,
    ) -> bool {
        let pressed = input.is_pressed(Key::Interact);
        if !pressed {
            self.interact_latched = false;
        }
        let Some(door) = door else { return false };
        if !pressed || self.interact_latched {
            return false;
        }

        let Some(ray) = camera.center_ray() else { return false };
        let in_range = scene
            .raycast_nearest(&ray, &[door.object], true)
            .is_some_and(|hit| hit.distance < self.range);
        if !in_range {
            return false;
        }

        self.interact_latched = true;
        let spec = TweenSpec::new(self.swing_duration).ease(Ease::Power2InOut).overwrite();
        let target = TweenTarget::RotationY(door.object);
        if door.is_open {
            tweener.to(target, 0.0, spec);
            door.is_open = false;
            collidables.insert(door.object);
            debug!("door closing");
        } else {
            let current = scene.rotation_y(door.object).unwrap_or(0.0);
            tweener.to(target, current + self.swing_angle, spec);
            door.is_open = true;
            collidables.remove(door.object);
            debug!("door opening");
        }
        true
    }
}
