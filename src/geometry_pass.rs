//! Deferred geometry pass: entity meshes into the G-buffer.
//!
//! Uses two bind groups, following the camera/model split of the mesh
//! renderer this grew from:
//! - **Group 0**: camera uniforms (view-projection, view, position, time)
//! - **Group 1**: per-object uniforms in one dynamic-offset buffer

use glam::{Mat4, Vec3};
use hecs::World;

use crate::ecs::{MeshRegistry, RenderMesh, WorldMatrix};
use crate::gbuffer::{GBUFFER_DEPTH_FORMAT, GBuffer};
use crate::gpu::GpuContext;
use crate::mesh::Vertex3d;

/// Camera uniforms for the geometry pass.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub time: f32,
}

/// Per-object uniforms, one 256-byte stride slot per draw.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    albedo: [f32; 4],
    emissive: [f32; 4],
    /// x = roughness.
    params: [f32; 4],
}

/// Minimum dynamic-offset alignment guaranteed by the default limits.
const OBJECT_STRIDE: u64 = 256;

/// Renders all `(WorldMatrix, RenderMesh)` entities into the G-buffer.
pub struct GeometryPass {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    capacity: usize,
}

impl GeometryPass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("GBuffer Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/gbuffer.wgsl").into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Geometry Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Geometry Camera Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Geometry Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Geometry Object Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ObjectUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });

        let capacity = 64;
        let (object_buffer, object_bind_group) =
            Self::create_object_buffer(gpu, &object_layout, capacity);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Geometry Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let color_targets: Vec<Option<wgpu::ColorTargetState>> = GBuffer::color_formats()
            .into_iter()
            .map(|format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Geometry Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &color_targets,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: GBUFFER_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            camera_buffer,
            camera_bind_group,
            object_buffer,
            object_bind_group,
            object_layout,
            capacity,
        }
    }

    fn create_object_buffer(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Geometry Object Uniforms"),
            size: OBJECT_STRIDE * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Geometry Object Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ObjectUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Renders every mesh entity into the G-buffer.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        meshes: &MeshRegistry,
        world: &World,
        view: Mat4,
        projection: Mat4,
        camera_pos: Vec3,
        time: f32,
    ) {
        let mut draws = Vec::new();
        for (_, (world_matrix, render_mesh)) in world.query::<(&WorldMatrix, &RenderMesh)>().iter()
        {
            let model = world_matrix.0;
            draws.push((
                render_mesh.mesh,
                ObjectUniforms {
                    model: model.to_cols_array_2d(),
                    normal_matrix: model.inverse().transpose().to_cols_array_2d(),
                    albedo: render_mesh.albedo,
                    emissive: render_mesh.emissive,
                    params: [render_mesh.roughness, 0.0, 0.0, 0.0],
                },
            ));
        }

        if draws.len() > self.capacity {
            self.capacity = draws.len().next_power_of_two();
            let (buffer, bind_group) =
                Self::create_object_buffer(gpu, &self.object_layout, self.capacity);
            self.object_buffer = buffer;
            self.object_bind_group = bind_group;
        }

        let camera = CameraUniforms {
            view_proj: (projection * view).to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            camera_pos: camera_pos.to_array(),
            time,
        };
        gpu.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera));

        for (i, (_, object)) in draws.iter().enumerate() {
            gpu.queue.write_buffer(
                &self.object_buffer,
                i as u64 * OBJECT_STRIDE,
                bytemuck::bytes_of(object),
            );
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: gbuffer.albedo_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: gbuffer.normal_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: gbuffer.emissive_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: gbuffer.depth_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        for (i, (mesh_id, _)) in draws.iter().enumerate() {
            let mesh = meshes.get(*mesh_id);
            render_pass.set_bind_group(
                1,
                &self.object_bind_group,
                &[(i as u64 * OBJECT_STRIDE) as u32],
            );
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}
