//! Rays, bounds and triangle meshes used for collision raycasts.

use glam::{Mat4, Vec2, Vec3};

const EPSILON: f32 = 1.0e-7;

/// A half-line with a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray; returns None when `direction` has no length
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Ray expressed in another space. The direction is left unnormalized so
    /// distances along it stay comparable with the source space.
    pub fn transformed(&self, m: &Mat4) -> Ray {
        Ray {
            origin: m.transform_point3(self.origin),
            direction: m.transform_vector3(self.direction),
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn empty() -> Self {
        Self { min: Vec3::splat(f32::MAX), max: Vec3::splat(f32::MIN) }
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::empty(), |mut b, p| {
            b.min = b.min.min(*p);
            b.max = b.max.max(*p);
            b
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Slab test. Works on unnormalized directions; returns the entry parameter.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let inv = ray.direction.recip();
        let t1 = (self.min - ray.origin) * inv;
        let t2 = (self.max - ray.origin) * inv;
        // NaN from 0 * inf is dropped by min/max
        let tmin = t1.min(t2).max_element();
        let tmax = t1.max(t2).min_element();
        if tmax < 0.0 || tmin > tmax {
            None
        } else {
            Some(tmin.max(0.0))
        }
    }
}

/// Ray/triangle intersection (Möller-Trumbore). Returns the ray parameter.
pub fn ray_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3, cull_backface: bool) -> Option<f32> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    if cull_backface {
        if a < EPSILON {
            return None;
        }
    } else if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > EPSILON).then_some(t)
}

/// Indexed triangle mesh with the attributes the renderer needs
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl MeshData {
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, uvs: Vec<Vec2>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(&positions);
        let n = positions.len();
        let normals = if normals.len() == n { normals } else { vec![Vec3::Y; n] };
        let uvs = if uvs.len() == n { uvs } else { vec![Vec2::ZERO; n] };
        Self { positions, normals, uvs, indices, bounds }
    }

    /// Horizontal square centred on the origin, facing +Y
    pub fn plane(size: f32) -> Self {
        let h = size / 2.0;
        let positions = vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new(-h, 0.0, h),
            Vec3::new(h, 0.0, h),
            Vec3::new(h, 0.0, -h),
        ];
        let uvs = vec![Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0)];
        Self::new(positions, vec![Vec3::Y; 4], uvs, vec![0, 1, 2, 0, 2, 3])
    }

    /// Axis-aligned box centred on the origin with outward-facing triangles
    pub fn cuboid(half_extents: Vec3) -> Self {
        let e = half_extents;
        // (normal, tangent u, tangent v) per face; u x v = normal
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (n, u, v) in faces {
            let base = positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push((n + u * su + v * sv) * e);
                normals.push(n);
                uvs.push(Vec2::new((su + 1.0) / 2.0, (1.0 - sv) / 2.0));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new(positions, normals, uvs, indices)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Nearest hit parameter along `ray` (in the ray's own units)
    pub fn raycast(&self, ray: &Ray, cull_backface: bool) -> Option<f32> {
        self.bounds.intersect(ray)?;
        self.indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| self.positions.get(i as usize).copied());
                ray_triangle(ray, a?, b?, c?, cull_backface)
            })
            .min_by(f32::total_cmp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_triangle_from_front() {
        let ray = Ray::new(Vec3::new(0.25, 1.0, 0.25), Vec3::NEG_Y).unwrap();
        let t = ray_triangle(&ray, Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), true);
        assert!((t.unwrap() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn backface_culling_rejects_hits_from_behind() {
        let ray = Ray::new(Vec3::new(0.25, -1.0, 0.25), Vec3::Y).unwrap();
        let (a, b, c) = (Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray_triangle(&ray, a, b, c, true).is_none());
        assert!(ray_triangle(&ray, a, b, c, false).is_some());
    }

    #[test]
    fn zero_direction_builds_no_ray() {
        assert!(Ray::new(Vec3::ONE, Vec3::ZERO).is_none());
    }

    #[test]
    fn plane_is_hit_from_above_only_when_culling() {
        let plane = MeshData::plane(10.0);
        let down = Ray::new(Vec3::new(1.0, 3.0, -2.0), Vec3::NEG_Y).unwrap();
        let up = Ray::new(Vec3::new(1.0, -3.0, -2.0), Vec3::Y).unwrap();
        assert!((plane.raycast(&down, true).unwrap() - 3.0).abs() < 1e-5);
        assert!(plane.raycast(&up, true).is_none());
    }

    #[test]
    fn cuboid_faces_point_outward() {
        let cube = MeshData::cuboid(Vec3::splat(1.0));
        assert_eq!(cube.triangle_count(), 12);
        for dir in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
            let ray = Ray::new(dir * 5.0, -dir).unwrap();
            let t = cube.raycast(&ray, true).expect("outer face should be hit");
            assert!((t - 4.0).abs() < 1e-5, "dir {dir:?} t {t}");
        }
    }

    #[test]
    fn aabb_misses_ray_pointing_away() {
        let b = Aabb::from_points(&[Vec3::ZERO, Vec3::ONE]);
        let ray = Ray::new(Vec3::new(0.5, 2.0, 0.5), Vec3::Y).unwrap();
        assert!(b.intersect(&ray).is_none());
    }
}
