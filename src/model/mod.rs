// MODEL: Scene data, geometry and the camera
pub mod geometry;
pub mod camera;
pub mod scene;

pub use geometry::{Aabb, MeshData, Ray};
pub use camera::Camera;
pub use scene::{
    LightId, Material, MaterialId, MeshId, ObjectId, PointLight, RayHit, SceneGraph, SceneObject,
    TextureData, TextureId, Transform,
};
