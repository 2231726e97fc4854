use glam::Vec3;
use crate::model::Camera;

/// Player state that is not the camera eye itself
#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    pub velocity_y: f32,
    /// Recomputed every frame by the movement system
    pub on_ground: bool,
    pub is_moving: bool,
}

impl PlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the player at a spawn point and drop any fall speed
    pub fn respawn(&mut self, camera: &mut Camera, spawn: Vec3) {
        camera.eye = spawn;
        self.velocity_y = 0.0;
        self.on_ground = false;
    }
}

/// Handles mouse look
pub struct CameraController {
    pub mouse_sensitivity: f32,
}

impl CameraController {
    pub fn new(mouse_sensitivity: f32) -> Self {
        Self { mouse_sensitivity }
    }

    /// Apply mouse look delta to camera
    pub fn apply_look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        camera.yaw += dx * self.mouse_sensitivity;
        let pi_half = std::f32::consts::PI / 2.0;
        camera.pitch = (camera.pitch - dy * self.mouse_sensitivity).clamp(-pi_half, pi_half);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_is_clamped_to_straight_up_and_down() {
        let controller = CameraController::new(0.002);
        let mut cam = Camera::new(800, 600);
        controller.apply_look(&mut cam, 0.0, -10_000.0);
        assert!((cam.pitch - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        controller.apply_look(&mut cam, 0.0, 20_000.0);
        assert!((cam.pitch + std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn respawn_resets_vertical_velocity() {
        let mut player = PlayerState { velocity_y: -12.0, on_ground: true, is_moving: false };
        let mut cam = Camera::new(800, 600);
        player.respawn(&mut cam, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(cam.eye, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(player.velocity_y, 0.0);
    }
}
