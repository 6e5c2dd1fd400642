//! Window and frame loop.
//!
//! One update tick and at most one resize per frame, delivered from the
//! winit event loop in a fixed order: scene systems, camera update (DOF +
//! feedback swaps), geometry, lighting, then the post chain. Nothing in
//! the frame path suspends or blocks; GPU submission is fire-and-forget.

use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use hecs::World;

use crate::ecs::{MeshRegistry, apply_motion, propagate_world_matrices};
use crate::gbuffer::GBuffer;
use crate::geometry_pass::GeometryPass;
use crate::gpu::GpuContext;
use crate::lighting_pass::LightingPass;
use crate::main_camera::MainCamera;
use crate::post_chain::ChainInputs;
use crate::scene::build_scene;

/// Direction of the key light, also the light-shaft axis.
const KEY_LIGHT_DIR: glam::Vec3 = glam::Vec3::new(-0.35, -0.8, -0.5);

struct Piece {
    world: World,
    meshes: MeshRegistry,
    gbuffer: GBuffer,
    geometry: GeometryPass,
    lighting: LightingPass,
    camera: MainCamera,
}

impl Piece {
    fn new(gpu: &GpuContext) -> Self {
        let mut world = World::new();
        let mut meshes = MeshRegistry::new();
        build_scene(gpu, &mut world, &mut meshes);

        let mut camera = MainCamera::new(gpu).expect("post chain construction failed");
        camera.bind_scene(&world);

        let mut piece = Self {
            world,
            meshes,
            gbuffer: GBuffer::new(gpu, gpu.width(), gpu.height()),
            geometry: GeometryPass::new(gpu),
            lighting: LightingPass::new(gpu, gpu.width(), gpu.height()),
            camera,
        };
        // First resize event: give every target its real size.
        piece.resize(gpu, gpu.width(), gpu.height());
        piece
    }

    fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        self.gbuffer.resize(gpu, width, height);
        self.lighting.resize(gpu, width, height);
        self.camera.resize(gpu, width, height);
    }

    fn frame(&mut self, gpu: &GpuContext, time: f32) {
        // Scene tick.
        apply_motion(&mut self.world, time);
        propagate_world_matrices(&mut self.world);

        // Camera tick: DOF parameters and feedback swaps, strictly before
        // the chain runs.
        self.camera.update(&self.world, time);

        let output = gpu.surface.get_current_texture().unwrap();
        let screen_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let view = self.camera.camera.view;
        let projection = self.camera.camera.projection;

        self.geometry.render(
            gpu,
            &mut encoder,
            &self.gbuffer,
            &self.meshes,
            &self.world,
            view,
            projection,
            self.camera.position(),
            time,
        );

        self.lighting.render(
            gpu,
            &mut encoder,
            &self.gbuffer,
            projection * view,
            self.camera.position(),
            KEY_LIGHT_DIR,
            time,
        );

        let inputs = ChainInputs {
            gbuffer_color: [
                self.gbuffer.albedo_view(),
                self.gbuffer.normal_view(),
                self.gbuffer.emissive_view(),
            ],
            gbuffer_depth: self.gbuffer.depth_view(),
            scene_color: self.lighting.scene_view(),
            screen: &screen_view,
        };
        self.camera.run(gpu, &mut encoder, &inputs, time);

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    piece: Option<Piece>,
    start: Instant,
}

impl Default for App {
    fn default() -> Self {
        Self {
            window: None,
            gpu: None,
            piece: None,
            start: Instant::now(),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window = Arc::new(
            event_loop
                .create_window(Window::default_attributes().with_title("phosphor"))
                .unwrap(),
        );

        let gpu = GpuContext::new(window.clone());
        let piece = Piece::new(&gpu);

        self.gpu = Some(gpu);
        self.piece = Some(piece);
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let (Some(gpu), Some(piece)) = (&mut self.gpu, &mut self.piece) {
                    gpu.resize(size.width, size.height);
                    piece.resize(gpu, size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let (Some(gpu), Some(piece)) = (&self.gpu, &mut self.piece) {
                    let time = self.start.elapsed().as_secs_f32();
                    piece.frame(gpu, time);
                }
                self.window.as_ref().unwrap().request_redraw();
            }
            _ => (),
        }
    }
}

/// Opens the window and runs the piece until close.
pub fn run() {
    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::default();
    event_loop.run_app(&mut app).unwrap();
}
