//! Level import and scare image decoding.
//!
//! The GLB is flattened into a [`SceneGraph`] under a single root object.
//! Nodes keep their names so gameplay can look up the handful of objects
//! it drives; everything else is just geometry to draw and collide with.

use std::collections::HashMap;

use glam::{Quat, Vec2, Vec3};
use tracing::{info, warn};

use crate::config::LevelNames;
use crate::error::AssetError;
use crate::model::{Material, MaterialId, MeshData, MeshId, ObjectId, SceneGraph, TextureData, TextureId, Transform};

/// Objects the game looks up by name after import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelHandles {
    pub root: Option<ObjectId>,
    pub level: Option<ObjectId>,
    pub door: Option<ObjectId>,
    pub scare_face: Option<ObjectId>,
    pub spawn: Option<ObjectId>,
    pub event_plane: Option<ObjectId>,
}

impl LevelHandles {
    pub fn resolve(scene: &SceneGraph, names: &LevelNames) -> Self {
        let find = |name: &str| {
            let id = scene.find_by_name(name);
            if id.is_none() {
                warn!("level has no object named '{}'", name);
            }
            id
        };
        Self {
            root: None,
            level: find(&names.level),
            door: find(&names.door),
            scare_face: find(&names.scare_face),
            spawn: find(&names.spawn),
            event_plane: find(&names.event_plane),
        }
    }
}

pub struct LevelAsset {
    pub scene: SceneGraph,
    pub handles: LevelHandles,
}

/// Parse GLB (or embedded glTF) bytes into a scene graph
pub fn parse_level(bytes: &[u8], path: &str, names: &LevelNames) -> Result<LevelAsset, AssetError> {
    let (document, buffers, images) =
        gltf::import_slice(bytes).map_err(|source| AssetError::Gltf { path: path.to_string(), source })?;

    let mut importer = Importer {
        path,
        scene: SceneGraph::new(),
        buffers: &buffers,
        images: &images,
        materials: HashMap::new(),
        textures: HashMap::new(),
    };

    let root = importer.scene.add_object("scene", Transform::default(), None);
    let scene_nodes: Vec<gltf::Node> = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene.nodes().collect(),
        None => Vec::new(),
    };
    for node in scene_nodes {
        importer.add_node(&node, root)?;
    }

    let scene = importer.scene;
    let mut handles = LevelHandles::resolve(&scene, names);
    handles.root = Some(root);
    info!("loaded {} ({} objects)", path, scene.object_count());
    Ok(LevelAsset { scene, handles })
}

struct Importer<'a> {
    path: &'a str,
    scene: SceneGraph,
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    materials: HashMap<Option<usize>, MaterialId>,
    textures: HashMap<usize, Option<TextureId>>,
}

impl Importer<'_> {
    fn add_node(&mut self, node: &gltf::Node, parent: ObjectId) -> Result<(), AssetError> {
        let (t, r, s) = node.transform().decomposed();
        let transform = Transform::from_trs(Vec3::from(t), Quat::from_array(r), Vec3::from(s));
        let name = sanitize_node_name(node.name().unwrap_or(""));
        let id = self.scene.add_object(&name, transform, Some(parent));

        if let Some(mesh) = node.mesh() {
            let primitives: Vec<gltf::Primitive> = mesh.primitives().collect();
            if primitives.len() == 1 {
                let (mesh_id, material) = self.load_primitive(&primitives[0], &name)?;
                if let Some(obj) = self.scene.object_mut(id) {
                    obj.mesh = Some(mesh_id);
                    obj.material = Some(material);
                }
            } else {
                // one child per primitive, so each keeps its own material
                for (i, primitive) in primitives.iter().enumerate() {
                    let (mesh_id, material) = self.load_primitive(primitive, &name)?;
                    let child_name = format!("{}_{}", name, i);
                    self.scene.add_mesh_object(&child_name, Transform::default(), Some(id), mesh_id, material);
                }
            }
        }

        for child in node.children() {
            self.add_node(&child, id)?;
        }
        Ok(())
    }

    fn load_primitive(&mut self, primitive: &gltf::Primitive, node: &str) -> Result<(MeshId, MaterialId), AssetError> {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            warn!("{}: primitive in '{}' is {:?}, drawing it as triangles", self.path, node, primitive.mode());
        }
        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));

        let positions: Vec<Vec3> = reader
            .read_positions()
            .ok_or_else(|| AssetError::MissingGeometry { path: self.path.to_string(), node: node.to_string() })?
            .map(Vec3::from)
            .collect();
        let normals: Vec<Vec3> = reader.read_normals().map(|n| n.map(Vec3::from).collect()).unwrap_or_default();
        let uvs: Vec<Vec2> = reader
            .read_tex_coords(0)
            .map(|t| t.into_f32().map(Vec2::from).collect())
            .unwrap_or_default();
        let indices: Vec<u32> = reader
            .read_indices()
            .map(|i| i.into_u32().collect())
            .unwrap_or_else(|| (0..positions.len() as u32).collect());

        let mesh = self.scene.add_mesh(MeshData::new(positions, normals, uvs, indices));
        let material = self.material(&primitive.material());
        Ok((mesh, material))
    }

    fn material(&mut self, material: &gltf::Material) -> MaterialId {
        if let Some(&id) = self.materials.get(&material.index()) {
            return id;
        }
        let pbr = material.pbr_metallic_roughness();
        let texture = pbr
            .base_color_texture()
            .and_then(|info| self.texture(info.texture().source().index()));
        let id = self.scene.add_material(Material {
            name: material.name().unwrap_or("default").to_string(),
            base_color: pbr.base_color_factor(),
            texture,
            double_sided: material.double_sided(),
        });
        self.materials.insert(material.index(), id);
        id
    }

    fn texture(&mut self, image_index: usize) -> Option<TextureId> {
        if let Some(&id) = self.textures.get(&image_index) {
            return id;
        }
        let (images, path) = (self.images, self.path);
        let id = images
            .get(image_index)
            .and_then(|image| gltf_image_to_rgba(image, path))
            .map(|texture| self.scene.add_texture(texture));
        self.textures.insert(image_index, id);
        id
    }
}

fn gltf_image_to_rgba(image: &gltf::image::Data, path: &str) -> Option<TextureData> {
    use gltf::image::Format;
    let rgba = match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image.pixels.chunks_exact(3).flat_map(|c| [c[0], c[1], c[2], 255]).collect(),
        Format::R8G8 => image.pixels.chunks_exact(2).flat_map(|c| [c[0], c[1], 0, 255]).collect(),
        Format::R8 => image.pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        other => {
            warn!("{}: unsupported embedded image format {:?}, using base color only", path, other);
            return None;
        }
    };
    Some(TextureData { width: image.width, height: image.height, rgba })
}

/// Whitespace becomes `_`; `[ ] . : /` are dropped, matching the names
/// three.js scene exports are looked up by
pub fn sanitize_node_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(*c, '[' | ']' | '.' | ':' | '/'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Decode a standalone image to RGBA8, rows top to bottom
pub fn decode_image(bytes: &[u8], path: &str) -> Result<TextureData, AssetError> {
    let image = image::load_from_memory(bytes)
        .map_err(|source| AssetError::Image { path: path.to_string(), source })?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok(TextureData { width, height, rgba: image.into_raw() })
}

#[cfg(not(target_arch = "wasm32"))]
pub fn read_file(path: &str) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Io { path: path.to_string(), source })
}

#[cfg(target_arch = "wasm32")]
pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, AssetError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let fetch_err = |message: String| AssetError::Fetch { path: url.to_string(), message };
    let window = web_sys::window().ok_or_else(|| fetch_err("no window".into()))?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| fetch_err(format!("{:?}", e)))?;
    let response: web_sys::Response = response.dyn_into().map_err(|e| fetch_err(format!("{:?}", e)))?;
    if !response.ok() {
        return Err(fetch_err(format!("HTTP {}", response.status())));
    }
    let buffer = response.array_buffer().map_err(|e| fetch_err(format!("{:?}", e)))?;
    let buffer = JsFuture::from(buffer).await.map_err(|e| fetch_err(format!("{:?}", e)))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}
