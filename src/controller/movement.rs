use glam::Vec3;
use crate::audio::SoundSlot;
use crate::config::MovementConfig;
use crate::controller::camera_controller::PlayerState;
use crate::controller::collidables::CollidableSet;
use crate::controller::input::InputState;
use crate::model::{Camera, Ray, SceneGraph};

/// Handles player movement (gravity, ground contact, wall blocking) by
/// raycasting against the collidable set
pub struct MovementSystem {
    pub move_speed: f32,
    pub gravity: f32,
    pub player_height: f32,
    pub clearance: f32,
}

impl MovementSystem {
    pub fn new(config: &MovementConfig) -> Self {
        Self {
            move_speed: config.move_speed,
            gravity: config.gravity,
            player_height: config.player_height,
            clearance: config.clearance,
        }
    }

    /// Horizontal displacement for this frame, or zero when keys cancel out
    /// or the camera looks straight up/down
    pub fn move_vector(&self, camera: &Camera, input: &InputState, dt: f32) -> Vec3 {
        let (forward_amount, right_amount) = input.move_axes();
        let mut forward = camera.forward();
        forward.y = 0.0;
        let forward = forward.normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        (forward * forward_amount + right * right_amount).normalize_or_zero() * self.move_speed * dt
    }

    /// Update player position and velocity for one frame
    pub fn update(
        &self,
        player: &mut PlayerState,
        camera: &mut Camera,
        input: &InputState,
        scene: &SceneGraph,
        collidables: &CollidableSet,
        footsteps: &mut SoundSlot,
        dt: f32,
    ) {
        if collidables.is_empty() {
            return;
        }
        let targets = collidables.as_slice();

        // Ground contact
        player.on_ground = false;
        if let Some(down) = Ray::new(camera.eye, Vec3::NEG_Y) {
            if let Some(hit) = scene.raycast_nearest(&down, targets, true) {
                if hit.distance < self.player_height {
                    camera.eye.y = hit.point.y + self.player_height;
                    player.velocity_y = 0.0;
                    player.on_ground = true;
                }
            }
        }

        // Horizontal movement, fully blocked by anything within clearance
        player.is_moving = input.is_moving();
        if player.is_moving {
            let move_vector = self.move_vector(camera, input, dt);
            if let Some(ray) = Ray::new(camera.eye, move_vector) {
                let blocked = scene
                    .raycast_nearest(&ray, targets, true)
                    .is_some_and(|hit| hit.distance <= self.clearance);
                if !blocked {
                    camera.eye += move_vector;
                }
            }
        }

        // Gravity runs after the ground snap, so a grounded player still
        // sinks by gravity * dt^2 within the frame
        player.velocity_y -= self.gravity * dt;
        camera.eye.y += player.velocity_y * dt;

        if let Some(sound) = footsteps.as_mut() {
            if player.is_moving && player.on_ground {
                if !sound.is_playing() {
                    sound.play();
                }
            } else if sound.is_playing() {
                sound.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::test_support::RecordingSound;
    use crate::controller::input::Key;
    use crate::model::{Material, MeshData, Transform};

    struct Fixture {
        scene: SceneGraph,
        collidables: CollidableSet,
        camera: Camera,
        player: PlayerState,
        input: InputState,
        movement: MovementSystem,
    }

    fn fixture() -> Fixture {
        let mut scene = SceneGraph::new();
        let mesh = scene.add_mesh(MeshData::plane(100.0));
        let mat = scene.add_material(Material::colored("ground", [1.0; 4]));
        let ground = scene.add_mesh_object("Level", Transform::default(), None, mesh, mat);
        let mut collidables = CollidableSet::new();
        collidables.insert(ground);
        let mut camera = Camera::new(800, 600);
        camera.eye = Vec3::new(0.0, 1.0, 0.0);
        Fixture {
            scene,
            collidables,
            camera,
            player: PlayerState::new(),
            input: InputState::new(),
            movement: MovementSystem::new(&MovementConfig::default()),
        }
    }

    impl Fixture {
        fn step(&mut self, footsteps: &mut SoundSlot, dt: f32) {
            self.movement.update(
                &mut self.player,
                &mut self.camera,
                &self.input,
                &self.scene,
                &self.collidables,
                footsteps,
                dt,
            );
        }

        fn add_wall_at_z(&mut self, z: f32) {
            let mesh = self.scene.add_mesh(MeshData::cuboid(Vec3::new(5.0, 5.0, 0.1)));
            let mat = self.scene.add_material(Material::colored("wall", [1.0; 4]));
            let wall = self.scene.add_mesh_object("wall", Transform::from_translation(Vec3::new(0.0, 0.0, z)), None, mesh, mat);
            self.collidables.insert(wall);
        }
    }

    #[test]
    fn empty_collidables_leave_player_untouched() {
        let mut f = fixture();
        f.collidables.clear();
        f.input.set_pressed(Key::Forward, true);
        f.player.velocity_y = -3.0;
        let before = f.camera.eye;
        f.step(&mut None, 0.1);
        assert_eq!(f.camera.eye, before);
        assert_eq!(f.player.velocity_y, -3.0);
    }

    #[test]
    fn ground_hit_snaps_then_integrates_gravity() {
        let mut f = fixture();
        f.player.velocity_y = -10.0;
        f.step(&mut None, 0.1);
        assert!(f.player.on_ground);
        // snapped to 1.8, then v = -3.0, y -= 0.3
        assert!((f.player.velocity_y + 3.0).abs() < 1e-5);
        assert!((f.camera.eye.y - 1.5).abs() < 1e-4);
    }

    #[test]
    fn forward_moves_along_flattened_camera_direction() {
        let mut f = fixture();
        f.camera.pitch = -0.8;
        f.input.set_pressed(Key::Forward, true);
        f.step(&mut None, 0.25);
        assert!((f.camera.eye.z + 1.0).abs() < 1e-4, "moved {:?}", f.camera.eye);
        assert!(f.camera.eye.x.abs() < 1e-4);
    }

    #[test]
    fn strafe_right_is_positive_x_when_facing_negative_z() {
        let f = fixture();
        let mut input = InputState::new();
        input.set_pressed(Key::Right, true);
        let v = f.movement.move_vector(&f.camera, &input, 1.0);
        assert!((v - Vec3::new(4.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn opposing_keys_produce_no_motion() {
        let mut f = fixture();
        f.input.set_pressed(Key::Forward, true);
        f.input.set_pressed(Key::Back, true);
        assert_eq!(f.movement.move_vector(&f.camera, &f.input, 1.0), Vec3::ZERO);
        f.step(&mut None, 0.1);
        assert_eq!((f.camera.eye.x, f.camera.eye.z), (0.0, 0.0));
    }

    #[test]
    fn wall_within_clearance_blocks_movement_entirely() {
        let mut f = fixture();
        f.add_wall_at_z(-0.5);
        f.input.set_pressed(Key::Forward, true);
        let (x, z) = (f.camera.eye.x, f.camera.eye.z);
        f.step(&mut None, 0.1);
        assert_eq!((f.camera.eye.x, f.camera.eye.z), (x, z));
    }

    #[test]
    fn wall_beyond_clearance_does_not_block() {
        let mut f = fixture();
        f.add_wall_at_z(-3.0);
        f.input.set_pressed(Key::Forward, true);
        f.step(&mut None, 0.1);
        assert!((f.camera.eye.z + 0.4).abs() < 1e-4);
    }

    #[test]
    fn footsteps_follow_grounded_movement() {
        let mut f = fixture();
        let (sound, log) = RecordingSound::new();
        let mut footsteps: SoundSlot = Some(sound);

        f.input.set_pressed(Key::Left, true);
        f.step(&mut footsteps, 0.016);
        f.step(&mut footsteps, 0.016);
        assert_eq!(log.borrow().plays, 1);
        assert!(log.borrow().playing);

        f.input.set_pressed(Key::Left, false);
        f.step(&mut footsteps, 0.016);
        assert_eq!(log.borrow().stops, 1);
        assert!(!log.borrow().playing);
    }

    #[test]
    fn airborne_movement_is_silent() {
        let mut f = fixture();
        f.camera.eye.y = 10.0;
        let (sound, log) = RecordingSound::new();
        let mut footsteps: SoundSlot = Some(sound);
        f.input.set_pressed(Key::Forward, true);
        f.step(&mut footsteps, 0.016);
        assert!(!f.player.on_ground);
        assert_eq!(log.borrow().plays, 0);
    }
}
