use std::sync::atomic::{AtomicU64, Ordering};

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::model::geometry::{MeshData, Ray};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// Lights are removed mid-session, so ids carry a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightId {
    index: usize,
    generation: u32,
}

/// Local transform; rotation is XYZ Euler in radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Vec3::ZERO, scale: Vec3::ONE }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Default::default() }
    }

    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
        Self { translation, rotation: Vec3::new(x, y, z), scale }
    }

    pub fn matrix(&self) -> Mat4 {
        let r = self.rotation;
        Mat4::from_scale_rotation_translation(
            self.scale,
            Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z),
            self.translation,
        )
    }
}

pub struct SceneObject {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub mesh: Option<MeshId>,
    pub material: Option<MaterialId>,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub texture: Option<TextureId>,
    pub double_sided: bool,
}

impl Material {
    pub fn colored(name: &str, base_color: [f32; 4]) -> Self {
        Self { name: name.to_string(), base_color, texture: None, double_sided: false }
    }

    pub fn textured(name: &str, texture: TextureId) -> Self {
        Self { name: name.to_string(), base_color: [1.0; 4], texture: Some(texture), double_sided: false }
    }
}

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Range after which the light contributes nothing; 0 means unlimited
    pub distance: f32,
}

/// Intersection against a scene object, ordered by distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub object: ObjectId,
    pub distance: f32,
    pub point: Vec3,
}

static NEXT_SCENE_UID: AtomicU64 = AtomicU64::new(1);

/// Arena scene graph with named objects, materials and point lights
pub struct SceneGraph {
    uid: u64,
    objects: Vec<SceneObject>,
    meshes: Vec<MeshData>,
    materials: Vec<Material>,
    textures: Vec<TextureData>,
    lights: Vec<(u32, Option<PointLight>)>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            uid: NEXT_SCENE_UID.fetch_add(1, Ordering::Relaxed),
            objects: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            lights: Vec::new(),
        }
    }

    /// Distinguishes graphs so GPU caches keyed by ids can be dropped on swap
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn add_object(&mut self, name: &str, transform: Transform, parent: Option<ObjectId>) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(SceneObject {
            name: name.to_string(),
            transform,
            visible: true,
            mesh: None,
            material: None,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent.and_then(|p| self.objects.get_mut(p.0)) {
            p.children.push(id);
        }
        id
    }

    pub fn add_mesh_object(
        &mut self,
        name: &str,
        transform: Transform,
        parent: Option<ObjectId>,
        mesh: MeshId,
        material: MaterialId,
    ) -> ObjectId {
        let id = self.add_object(name, transform, parent);
        self.objects[id.0].mesh = Some(mesh);
        self.objects[id.0].material = Some(material);
        id
    }

    pub fn add_mesh(&mut self, mesh: MeshData) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn add_texture(&mut self, texture: TextureData) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().enumerate().map(|(i, o)| (ObjectId(i), o))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshData> {
        self.meshes.get(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials.iter().enumerate().map(|(i, m)| (MaterialId(i), m))
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureData> {
        self.textures.get(id.0)
    }

    /// First object with the given name, in insertion order
    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().position(|o| o.name == name).map(ObjectId)
    }

    pub fn world_matrix(&self, id: ObjectId) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        let mut cursor = self.object(id);
        while let Some(obj) = cursor {
            m = obj.transform.matrix() * m;
            cursor = obj.parent.and_then(|p| self.object(p));
        }
        m
    }

    pub fn world_position(&self, id: ObjectId) -> Option<Vec3> {
        self.object(id)?;
        Some(self.world_matrix(id).transform_point3(Vec3::ZERO))
    }

    /// Visible only when every ancestor is visible too
    pub fn is_rendered(&self, id: ObjectId) -> bool {
        let mut cursor = self.object(id);
        while let Some(obj) = cursor {
            if !obj.visible {
                return false;
            }
            cursor = obj.parent.and_then(|p| self.object(p));
        }
        true
    }

    pub fn set_visible(&mut self, id: ObjectId, visible: bool) {
        if let Some(obj) = self.object_mut(id) {
            obj.visible = visible;
        }
    }

    pub fn set_material(&mut self, id: ObjectId, material: MaterialId) {
        if let Some(obj) = self.object_mut(id) {
            obj.material = Some(material);
        }
    }

    pub fn add_light(&mut self, light: PointLight) -> LightId {
        if let Some(index) = self.lights.iter().position(|(_, l)| l.is_none()) {
            let slot = &mut self.lights[index];
            slot.0 += 1;
            slot.1 = Some(light);
            return LightId { index, generation: slot.0 };
        }
        self.lights.push((0, Some(light)));
        LightId { index: self.lights.len() - 1, generation: 0 }
    }

    /// Removes exactly this light; stale ids are ignored
    pub fn remove_light(&mut self, id: LightId) -> Option<PointLight> {
        match self.lights.get_mut(id.index) {
            Some((generation, slot)) if *generation == id.generation => slot.take(),
            _ => None,
        }
    }

    pub fn light(&self, id: LightId) -> Option<&PointLight> {
        match self.lights.get(id.index) {
            Some((generation, Some(light))) if *generation == id.generation => Some(light),
            _ => None,
        }
    }

    pub fn light_mut(&mut self, id: LightId) -> Option<&mut PointLight> {
        match self.lights.get_mut(id.index) {
            Some((generation, Some(light))) if *generation == id.generation => Some(light),
            _ => None,
        }
    }

    pub fn lights(&self) -> impl Iterator<Item = &PointLight> {
        self.lights.iter().filter_map(|(_, l)| l.as_ref())
    }

    /// Cast `ray` against `targets`, descending into children when
    /// `recursive`. Hits are sorted nearest first.
    pub fn raycast(&self, ray: &Ray, targets: &[ObjectId], recursive: bool) -> Vec<RayHit> {
        let mut hits = Vec::new();
        for &target in targets {
            self.raycast_object(ray, target, recursive, &mut hits);
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    pub fn raycast_nearest(&self, ray: &Ray, targets: &[ObjectId], recursive: bool) -> Option<RayHit> {
        self.raycast(ray, targets, recursive).into_iter().next()
    }

    fn raycast_object(&self, ray: &Ray, id: ObjectId, recursive: bool, hits: &mut Vec<RayHit>) {
        let Some(obj) = self.object(id) else { return };

        if let Some(mesh) = obj.mesh.and_then(|m| self.mesh(m)) {
            let world = self.world_matrix(id);
            let cull = !obj
                .material
                .and_then(|m| self.material(m))
                .map(|m| m.double_sided)
                .unwrap_or(false);
            let local_ray = ray.transformed(&world.inverse());
            if let Some(t) = mesh.raycast(&local_ray, cull) {
                hits.push(RayHit { object: id, distance: t, point: ray.at(t) });
            }
        }

        if recursive {
            for &child in &obj.children {
                self.raycast_object(ray, child, recursive, hits);
            }
        }
    }

    /// Euler Y rotation, the property door tweens drive
    pub fn rotation_y(&self, id: ObjectId) -> Option<f32> {
        self.object(id).map(|o| o.transform.rotation.y)
    }

    pub fn set_rotation_y(&mut self, id: ObjectId, angle: f32) {
        if let Some(obj) = self.object_mut(id) {
            obj.transform.rotation.y = angle;
        }
    }
}
