use std::collections::HashMap;

use glam::Mat4;
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::model::{Camera, MaterialId, MeshId, ObjectId, SceneGraph, TextureId};
use crate::utils::{hex_to_linear, upload_mesh, MeshBuffer, Vertex};
use crate::view::gpu_init::GpuContext;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const MAX_LIGHTS: usize = 5;

/// Fixed lighting rig around the camera
#[derive(Debug, Clone)]
pub struct LightingRig {
    pub background: u32,
    pub exposure: f32,
    pub sky: u32,
    pub ground: u32,
    pub hemisphere_intensity: f32,
    pub flashlight_intensity: f32,
    pub flashlight_distance: f32,
}

impl Default for LightingRig {
    fn default() -> Self {
        Self {
            background: 0x101010,
            exposure: 0.8,
            sky: 0xffffff,
            ground: 0x444444,
            hemisphere_intensity: 2.0,
            flashlight_intensity: 10.0,
            flashlight_distance: 30.0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    pub distance: f32,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub sky: [f32; 4],
    pub ground: [f32; 4],
    pub params: [f32; 4],
    pub lights: [LightUniform; MAX_LIGHTS],
}

impl FrameUniform {
    /// Flashlight first, then scene lights until the array is full
    pub fn build(camera: &Camera, scene: &SceneGraph, rig: &LightingRig) -> Self {
        let mut lights = [LightUniform::default(); MAX_LIGHTS];
        lights[0] = LightUniform {
            position: camera.eye.to_array(),
            intensity: rig.flashlight_intensity,
            color: [1.0, 1.0, 1.0],
            distance: rig.flashlight_distance,
        };
        let mut count = 1;
        for light in scene.lights().take(MAX_LIGHTS - 1) {
            lights[count] = LightUniform {
                position: light.position.to_array(),
                intensity: light.intensity,
                color: light.color.to_array(),
                distance: light.distance,
            };
            count += 1;
        }

        let sky = hex_to_linear(rig.sky);
        let ground = hex_to_linear(rig.ground);
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            camera_pos: camera.eye.extend(1.0).to_array(),
            sky: [sky[0], sky[1], sky[2], rig.hemisphere_intensity],
            ground: [ground[0], ground[1], ground[2], 0.0],
            params: [rig.exposure, count as f32, 0.0, 0.0],
            lights,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl ObjectUniform {
    pub fn from_world(world: Mat4) -> Self {
        Self {
            model: world.to_cols_array_2d(),
            normal: world.inverse().transpose().to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    base_color: [f32; 4],
}

struct ObjectGpu {
    buffer: Buffer,
    bind_group: BindGroup,
}

struct MaterialGpu {
    bind_group: BindGroup,
    double_sided: bool,
}

/// egui output for one frame, tessellated
pub struct OverlayFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

pub fn create_depth_texture(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

fn uniform_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_scene_pipeline(
    device: &Device,
    layout: &PipelineLayout,
    shader: &ShaderModule,
    format: TextureFormat,
    cull_mode: Option<Face>,
    label: &str,
) -> RenderPipeline {
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format,
                blend: Some(BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

/// Draws a [`SceneGraph`] plus the egui overlay. GPU copies of meshes,
/// materials and textures are created the first time they are drawn.
pub struct SceneRenderer {
    pub rig: LightingRig,
    pipeline: RenderPipeline,
    pipeline_double_sided: RenderPipeline,
    frame_buffer: Buffer,
    frame_bind_group: BindGroup,
    object_layout: BindGroupLayout,
    material_layout: BindGroupLayout,
    sampler: Sampler,
    white_texture: TextureView,
    depth_view: TextureView,
    scene_uid: u64,
    meshes: HashMap<MeshId, MeshBuffer>,
    materials: HashMap<MaterialId, MaterialGpu>,
    textures: HashMap<TextureId, TextureView>,
    objects: HashMap<ObjectId, ObjectGpu>,
    egui_renderer: egui_wgpu::Renderer,
}

impl SceneRenderer {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = gpu.device.as_ref();

        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let frame_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("frame_bgl"),
            entries: &[uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT)],
        });
        let object_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("object_bgl"),
            entries: &[uniform_entry(0, ShaderStages::VERTEX)],
        });
        let material_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("material_bgl"),
            entries: &[
                uniform_entry(0, ShaderStages::FRAGMENT),
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &object_layout, &material_layout],
            push_constant_ranges: &[],
        });
        let pipeline = create_scene_pipeline(device, &pipeline_layout, &shader, gpu.format, Some(Face::Back), "scene_pipeline");
        let pipeline_double_sided =
            create_scene_pipeline(device, &pipeline_layout, &shader, gpu.format, None, "scene_pipeline_double_sided");

        let frame_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("frame_uniform"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("frame_bg"),
            layout: &frame_layout,
            entries: &[BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() }],
        });

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("base_sampler"),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });
        let white_texture = create_texture(device, gpu.queue.as_ref(), 1, 1, &[255; 4], "white");
        let (_, depth_view) = create_depth_texture(device, gpu.config.width, gpu.config.height);

        let egui_renderer = egui_wgpu::Renderer::new(device, gpu.format, egui_wgpu::RendererOptions::default());

        Self {
            rig: LightingRig::default(),
            pipeline,
            pipeline_double_sided,
            frame_buffer,
            frame_bind_group,
            object_layout,
            material_layout,
            sampler,
            white_texture,
            depth_view,
            scene_uid: 0,
            meshes: HashMap::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            objects: HashMap::new(),
            egui_renderer,
        }
    }

    pub fn resize(&mut self, gpu: &mut GpuContext, width: u32, height: u32) {
        gpu.resize(width, height);
        let (_, depth_view) = create_depth_texture(&gpu.device, gpu.config.width, gpu.config.height);
        self.depth_view = depth_view;
    }

    fn sync_scene(&mut self, scene: &SceneGraph) {
        if self.scene_uid != scene.uid() {
            self.meshes.clear();
            self.materials.clear();
            self.textures.clear();
            self.objects.clear();
            self.scene_uid = scene.uid();
        }
    }

    fn prepare_material(&mut self, device: &Device, queue: &Queue, scene: &SceneGraph, id: MaterialId) -> bool {
        if self.materials.contains_key(&id) {
            return true;
        }
        let Some(material) = scene.material(id) else { return false };

        if let Some(tex_id) = material.texture {
            if !self.textures.contains_key(&tex_id) {
                if let Some(data) = scene.texture(tex_id) {
                    let view = create_texture(device, queue, data.width, data.height, &data.rgba, &material.name);
                    self.textures.insert(tex_id, view);
                }
            }
        }
        let view = material
            .texture
            .and_then(|t| self.textures.get(&t))
            .unwrap_or(&self.white_texture);

        let buffer = device.create_buffer_init(&util::BufferInitDescriptor {
            label: Some(&material.name),
            contents: bytemuck::bytes_of(&MaterialUniform { base_color: material.base_color }),
            usage: BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some(&material.name),
            layout: &self.material_layout,
            entries: &[
                BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() },
                BindGroupEntry { binding: 1, resource: BindingResource::TextureView(view) },
                BindGroupEntry { binding: 2, resource: BindingResource::Sampler(&self.sampler) },
            ],
        });
        self.materials.insert(id, MaterialGpu { bind_group, double_sided: material.double_sided });
        true
    }

    /// Upload per-frame data and GPU copies for every drawable object
    fn prepare(&mut self, device: &Device, queue: &Queue, scene: &SceneGraph, camera: &Camera) -> Vec<(ObjectId, MeshId, MaterialId)> {
        self.sync_scene(scene);
        let frame = FrameUniform::build(camera, scene, &self.rig);
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        let mut draws = Vec::new();
        for (id, obj) in scene.objects() {
            let (Some(mesh_id), Some(material_id)) = (obj.mesh, obj.material) else { continue };
            if !scene.is_rendered(id) {
                continue;
            }
            let Some(mesh) = scene.mesh(mesh_id) else { continue };
            if mesh.indices.is_empty() {
                continue;
            }
            self.meshes.entry(mesh_id).or_insert_with(|| upload_mesh(device, mesh, &obj.name));
            if !self.prepare_material(device, queue, scene, material_id) {
                continue;
            }

            let uniform = ObjectUniform::from_world(scene.world_matrix(id));
            match self.objects.get(&id) {
                Some(gpu) => queue.write_buffer(&gpu.buffer, 0, bytemuck::bytes_of(&uniform)),
                None => {
                    let buffer = device.create_buffer_init(&util::BufferInitDescriptor {
                        label: Some(&obj.name),
                        contents: bytemuck::bytes_of(&uniform),
                        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                    });
                    let bind_group = device.create_bind_group(&BindGroupDescriptor {
                        label: Some(&obj.name),
                        layout: &self.object_layout,
                        entries: &[BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
                    });
                    self.objects.insert(id, ObjectGpu { buffer, bind_group });
                }
            }
            draws.push((id, mesh_id, material_id));
        }
        draws
    }

    pub fn render(&mut self, gpu: &GpuContext, scene: &SceneGraph, camera: &Camera, overlay: Option<OverlayFrame>) {
        let device = gpu.device.as_ref();
        let queue = gpu.queue.as_ref();

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                gpu.reconfigure();
                return;
            }
            Err(e) => {
                tracing::warn!("skipping frame: {e:?}");
                return;
            }
        };

        let draws = self.prepare(device, queue, scene, camera);

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor { label: Some("encoder") });

        let bg = hex_to_linear(self.rig.background);
        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color { r: bg[0] as f64, g: bg[1] as f64, b: bg[2] as f64, a: 1.0 }),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations { load: LoadOp::Clear(1.0), store: StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_bind_group(0, &self.frame_bind_group, &[]);
            for (object, mesh, material) in draws {
                let (Some(obj), Some(mesh), Some(mat)) =
                    (self.objects.get(&object), self.meshes.get(&mesh), self.materials.get(&material))
                else {
                    continue;
                };
                rp.set_pipeline(if mat.double_sided { &self.pipeline_double_sided } else { &self.pipeline });
                rp.set_bind_group(1, &obj.bind_group, &[]);
                rp.set_bind_group(2, &mat.bind_group, &[]);
                rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        if let Some(overlay) = overlay {
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [gpu.config.width, gpu.config.height],
                pixels_per_point: overlay.pixels_per_point,
            };

            for (id, image_delta) in &overlay.textures_delta.set {
                self.egui_renderer.update_texture(device, queue, *id, image_delta);
            }
            self.egui_renderer
                .update_buffers(device, queue, &mut encoder, &overlay.primitives, &screen_descriptor);

            {
                let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                    label: Some("egui_render_pass"),
                    color_attachments: &[Some(RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: Operations { load: LoadOp::Load, store: StoreOp::Store },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                self.egui_renderer
                    .render(&mut egui_pass.forget_lifetime(), &overlay.primitives, &screen_descriptor);
            }

            for id in &overlay.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

fn create_texture(device: &Device, queue: &Queue, width: u32, height: u32, rgba: &[u8], label: &str) -> TextureView {
    let size = Extent3d { width, height, depth_or_array_layers: 1 };
    let texture = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8UnormSrgb,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: Origin3d::ZERO,
            aspect: TextureAspect::All,
        },
        rgba,
        TexelCopyBufferLayout { offset: 0, bytes_per_row: Some(4 * width), rows_per_image: Some(height) },
        size,
    );
    texture.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PointLight;
    use glam::Vec3;

    fn light(intensity: f32) -> PointLight {
        PointLight { position: Vec3::ONE, color: Vec3::ONE, intensity, distance: 50.0 }
    }

    #[test]
    fn uniform_sizes_match_shader_layout() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 32);
        assert_eq!(std::mem::size_of::<FrameUniform>(), 128 + 32 * MAX_LIGHTS);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 128);
    }

    #[test]
    fn flashlight_leads_and_scene_lights_are_capped() {
        let mut scene = SceneGraph::new();
        for i in 0..6 {
            scene.add_light(light(i as f32));
        }
        let mut camera = Camera::new(800, 600);
        camera.eye = Vec3::new(3.0, 1.5, -2.0);
        let frame = FrameUniform::build(&camera, &scene, &LightingRig::default());
        assert_eq!(frame.params[1], MAX_LIGHTS as f32);
        assert_eq!(frame.lights[0].position, [3.0, 1.5, -2.0]);
        assert_eq!(frame.lights[0].intensity, 10.0);
        assert_eq!(frame.lights[1].intensity, 0.0);
        assert_eq!(frame.params[0], 0.8);
    }
}
