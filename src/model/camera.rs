use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraConfig;
use crate::model::geometry::Ray;

/// First-person camera; the eye doubles as the player position
pub struct Camera {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_config(width, height, &CameraConfig::default())
    }

    pub fn from_config(width: u32, height: u32, lens: &CameraConfig) -> Self {
        Self {
            eye: Vec3::ZERO,
            // looking down -Z
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            up: Vec3::Y,
            fov_y: lens.fov_y_degrees.to_radians(),
            aspect: width as f32 / height.max(1) as f32,
            z_near: lens.z_near,
            z_far: lens.z_far,
        }
    }

    pub fn forward(&self) -> Vec3 {
        let cy = self.yaw;
        let cp = self.pitch.clamp(-1.5533, 1.5533); // Slightly less than π/2 to avoid gimbal lock
        Vec3::new(cy.cos() * cp.cos(), cp.sin(), cy.sin() * cp.cos()).normalize()
    }

    pub fn target(&self) -> Vec3 { self.eye + self.forward() }

    pub fn set_aspect(&mut self, width: u32, height: u32) { self.aspect = width as f32 / height.max(1) as f32; }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target(), self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn set_look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.eye).try_normalize() else { return };
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir.y.asin().clamp(-1.4, 1.4);
    }

    /// Ray through a point in normalized device coordinates ([-1, 1] on both axes)
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Option<Ray> {
        let inv = self.view_proj().inverse();
        let far = inv.project_point3(ndc.extend(1.0));
        Ray::new(self.eye, far - self.eye)
    }

    /// Ray through the crosshair
    pub fn center_ray(&self) -> Option<Ray> {
        self.ray_from_ndc(Vec2::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_looks_down_negative_z() {
        let cam = Camera::new(800, 600);
        assert!((cam.forward() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn center_ray_follows_forward() {
        let mut cam = Camera::new(800, 600);
        cam.eye = Vec3::new(1.0, 2.0, 3.0);
        cam.yaw = 0.3;
        cam.pitch = -0.2;
        let ray = cam.center_ray().unwrap();
        assert_eq!(ray.origin, cam.eye);
        assert!((ray.direction - cam.forward()).length() < 1e-3);
    }

    #[test]
    fn look_at_points_forward_at_target() {
        let mut cam = Camera::new(800, 600);
        cam.set_look_at(Vec3::new(5.0, 0.0, 0.0));
        assert!((cam.forward() - Vec3::X).length() < 1e-5);
    }
}
