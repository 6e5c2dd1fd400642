//! The camera composition root.
//!
//! Owns the target pool and the full post-processing chain, and drives the
//! per-frame feedback swaps and the resize cascade. The chain, in execution
//! order:
//!
//! 1. light shaft (temporal, feedback pair)
//! 2. screen-space reflections (temporal, feedback pair)
//! 3. screen-space composite (scene + shafts + reflections)
//! 4. depth of field: CoC → bokeh → composite
//! 5. FXAA
//! 6. bloom: bright pass + 4-level separable Gaussian pyramid
//! 7. final composite to the surface
//!
//! Within a frame, [`MainCamera::update`] (DOF parameters, pair swaps)
//! strictly precedes [`MainCamera::run`]; that ordering is the entire
//! correctness argument for the temporal passes: a pass must never read
//! the target it is about to write this frame.

use glam::{EulerRot, Mat4, Quat, Vec3};
use hecs::{Entity, World};

use crate::camera::RenderCamera;
use crate::ecs::{find_by_name, world_position};
use crate::error::BuildError;
use crate::gpu::GpuContext;
use crate::post_chain::{ChainInputs, FrameUniforms, PassId, PostChain};
use crate::post_pass::{
    PassDescriptor, PassTarget, PostProcessPass, ShaderDefines, TextureSource, UniformSlot,
};
use crate::render_target::{
    FeedbackSlot, HDR_FORMAT, TargetPool, TargetSlot, bloom_level_size, half_resolution,
};
use crate::uniforms::UniformValue;

/// Bloom pyramid depth; also the Gaussian tap count baked into the blur
/// shader.
pub const BLOOM_LEVELS: usize = 4;

/// Nominal film-back height in meters, for the focal length estimate.
const FILM_HEIGHT: f32 = 0.036;

/// Fixed DOF blend coefficient. A physically-derived value would come from
/// focal length and aperture; this stays a tunable.
const DOF_BLEND_COEFF: f32 = 0.5;

/// Gaussian variance constant for the bloom blur weights.
const GAUSS_VARIANCE: f32 = 100.0;

const BASE_FOV_DEG: f32 = 50.0;
const NEAR_PLANE: f32 = 90.0;
const FAR_PLANE: f32 = 200.0;

/// Amplitude of the per-frame view shake, radians.
const SHAKE_AMPLITUDE: f32 = 0.005;

const BLOOM_V_LABELS: [&str; BLOOM_LEVELS] = ["Bloom V0", "Bloom V1", "Bloom V2", "Bloom V3"];
const BLOOM_H_LABELS: [&str; BLOOM_LEVELS] = ["Bloom H0", "Bloom H1", "Bloom H2", "Bloom H3"];
const BLUR_V_LABELS: [&str; BLOOM_LEVELS] =
    ["bloom_blur_v0", "bloom_blur_v1", "bloom_blur_v2", "bloom_blur_v3"];
const BLUR_H_LABELS: [&str; BLOOM_LEVELS] =
    ["bloom_blur_h0", "bloom_blur_h1", "bloom_blur_h2", "bloom_blur_h3"];

/// Discrete Gaussian blur weights sampled at odd offsets `r = 1 + 2i`,
/// normalized so the sum, with off-center taps counted twice to exploit
/// the kernel's symmetry, equals 1.
pub fn gauss_weights(count: usize) -> Vec<f32> {
    let mut weights = vec![0.0f32; count];
    let mut total = 0.0f32;
    for (i, weight) in weights.iter_mut().enumerate() {
        let r = 1.0 + 2.0 * i as f32;
        let w = (-0.5 * r * r / GAUSS_VARIANCE).exp();
        *weight = w;
        total += if i > 0 { w * 2.0 } else { w };
    }
    for weight in &mut weights {
        *weight /= total;
    }
    weights
}

/// Focal length from vertical field of view and the nominal film height.
pub fn focal_length(fov_radians: f32) -> f32 {
    0.5 * FILM_HEIGHT / (0.5 * fov_radians).tan()
}

/// DOF parameter vector: focus distance, max circle of confusion,
/// reciprocal max CoC, blend coefficient.
pub fn dof_params(focus_distance: f32, bokeh_height: u32) -> [f32; 4] {
    let max_coc = 6.0 / bokeh_height.max(1) as f32;
    [focus_distance, max_coc, 1.0 / max_coc, DOF_BLEND_COEFF]
}

/// Camera rig plus the whole post stack.
pub struct MainCamera {
    pub camera: RenderCamera,
    position: Vec3,

    pool: TargetPool,
    chain: PostChain,

    rt1: TargetSlot,
    rt2: TargetSlot,
    rt3: TargetSlot,

    /// Light-shaft feedback pair, public for external inspection.
    pub light_shaft: FeedbackSlot,
    /// SSR feedback pair, public for external inspection.
    pub ssr: FeedbackSlot,

    pub dof_coc_target: TargetSlot,
    pub dof_bokeh_target: TargetSlot,
    pub dof_composite_target: TargetSlot,

    bloom_vertical: Vec<TargetSlot>,
    bloom_horizontal: Vec<TargetSlot>,

    ssr_pass: PassId,
    u_ssr_view: UniformSlot,
    u_ssr_projection: UniformSlot,
    u_ssr_inv_projection: UniformSlot,
    u_ssr_inv_view: UniformSlot,

    dof_coc_pass: PassId,
    u_dof_coc_params: UniformSlot,
    dof_bokeh_pass: PassId,
    u_dof_bokeh_params: UniformSlot,

    /// Blur passes with their per-level resolution uniform, two per level.
    blur_passes: Vec<(PassId, UniformSlot)>,

    look_target: Option<Entity>,
    dof_target: Option<Entity>,

    resolution: (u32, u32),
    resolution_inv: [f32; 2],
}

impl MainCamera {
    /// Builds every target and pass. Targets start at 1x1 and get real
    /// sizes on the first resize event.
    pub fn new(gpu: &GpuContext) -> Result<Self, BuildError> {
        let camera = RenderCamera::new(BASE_FOV_DEG, NEAR_PLANE, FAR_PLANE);

        let mut pool = TargetPool::new();
        let rt1 = pool.create(gpu, "Chain RT1", HDR_FORMAT);
        let rt2 = pool.create(gpu, "Chain RT2", HDR_FORMAT);
        let rt3 = pool.create(gpu, "Chain RT3", HDR_FORMAT);

        let light_shaft = pool.create_pair(gpu, "Light Shaft A", "Light Shaft B", HDR_FORMAT);
        let ssr = pool.create_pair(gpu, "SSR A", "SSR B", HDR_FORMAT);

        let dof_coc_target = pool.create(gpu, "DOF CoC", HDR_FORMAT);
        let dof_bokeh_target = pool.create(gpu, "DOF Bokeh", HDR_FORMAT);
        let dof_composite_target = pool.create(gpu, "DOF Composite", HDR_FORMAT);

        let bloom_vertical: Vec<TargetSlot> = (0..BLOOM_LEVELS)
            .map(|i| pool.create(gpu, BLOOM_V_LABELS[i], HDR_FORMAT))
            .collect();
        let bloom_horizontal: Vec<TargetSlot> = (0..BLOOM_LEVELS)
            .map(|i| pool.create(gpu, BLOOM_H_LABELS[i], HDR_FORMAT))
            .collect();

        let mut chain = PostChain::new();

        // Temporal passes first: each reads its pair's previous frame and
        // writes the side swapped in this frame.
        chain.push(PostProcessPass::new(
            gpu,
            PassDescriptor {
                label: "light_shaft",
                source: include_str!("shaders/light_shaft.wgsl"),
                inputs: vec![
                    TextureSource::FeedbackRead(light_shaft),
                    TextureSource::GBufferDepth,
                ],
                target: PassTarget::FeedbackWrite(light_shaft),
                format: HDR_FORMAT,
                uniforms: vec![],
                defines: ShaderDefines::new(),
            },
        )?)?;

        let identity = Mat4::IDENTITY.to_cols_array_2d();
        let ssr_pass = chain.push(PostProcessPass::new(
            gpu,
            PassDescriptor {
                label: "ssr",
                source: include_str!("shaders/ssr.wgsl"),
                inputs: vec![
                    TextureSource::GBufferColor(1),
                    TextureSource::SceneColor,
                    TextureSource::FeedbackRead(ssr),
                    TextureSource::GBufferDepth,
                ],
                target: PassTarget::FeedbackWrite(ssr),
                format: HDR_FORMAT,
                uniforms: vec![
                    ("view", UniformValue::Mat4(identity)),
                    ("projection", UniformValue::Mat4(identity)),
                    ("inv_projection", UniformValue::Mat4(identity)),
                    ("inv_view", UniformValue::Mat4(identity)),
                ],
                defines: ShaderDefines::new(),
            },
        )?)?;

        // Downstream composite reads the sides written *this* frame.
        chain.push(PostProcessPass::new(
            gpu,
            PassDescriptor {
                label: "ss_composite",
                source: include_str!("shaders/ss_composite.wgsl"),
                inputs: vec![
                    TextureSource::SceneColor,
                    TextureSource::FeedbackWrite(light_shaft),
                    TextureSource::FeedbackWrite(ssr),
                    TextureSource::GBufferColor(1),
                ],
                target: PassTarget::Target(rt1),
                format: HDR_FORMAT,
                uniforms: vec![],
                defines: ShaderDefines::new(),
            },
        )?)?;

        let initial_dof = UniformValue::Vec4([10.0, 0.05, 20.0, DOF_BLEND_COEFF]);
        let dof_coc_pass = chain.push(PostProcessPass::new(
            gpu,
            PassDescriptor {
                label: "dof_coc",
                source: include_str!("shaders/dof_coc.wgsl"),
                inputs: vec![TextureSource::Target(rt1), TextureSource::GBufferDepth],
                target: PassTarget::Target(dof_coc_target),
                format: HDR_FORMAT,
                uniforms: vec![("params", initial_dof.clone())],
                defines: ShaderDefines::new()
                    .float("NEAR_PLANE", NEAR_PLANE)
                    .float("FAR_PLANE", FAR_PLANE),
            },
        )?)?;

        let dof_bokeh_pass = chain.push(PostProcessPass::new(
            gpu,
            PassDescriptor {
                label: "dof_bokeh",
                source: include_str!("shaders/dof_bokeh.wgsl"),
                inputs: vec![TextureSource::Target(dof_coc_target)],
                target: PassTarget::Target(dof_bokeh_target),
                format: HDR_FORMAT,
                uniforms: vec![("params", initial_dof)],
                defines: ShaderDefines::new(),
            },
        )?)?;

        chain.push(PostProcessPass::new(
            gpu,
            PassDescriptor {
                label: "dof_composite",
                source: include_str!("shaders/dof_composite.wgsl"),
                inputs: vec![
                    TextureSource::Target(rt1),
                    TextureSource::Target(dof_bokeh_target),
                ],
                target: PassTarget::Target(dof_composite_target),
                format: HDR_FORMAT,
                uniforms: vec![],
                defines: ShaderDefines::new(),
            },
        )?)?;

        chain.push(PostProcessPass::new(
            gpu,
            PassDescriptor {
                label: "fxaa",
                source: include_str!("shaders/fxaa.wgsl"),
                inputs: vec![TextureSource::Target(dof_composite_target)],
                target: PassTarget::Target(rt1),
                format: HDR_FORMAT,
                uniforms: vec![],
                defines: ShaderDefines::new(),
            },
        )?)?;

        chain.push(PostProcessPass::new(
            gpu,
            PassDescriptor {
                label: "bloom_bright",
                source: include_str!("shaders/bloom_bright.wgsl"),
                inputs: vec![TextureSource::Target(rt1)],
                target: PassTarget::Target(rt2),
                format: HDR_FORMAT,
                uniforms: vec![("threshold", UniformValue::Float(0.5))],
                defines: ShaderDefines::new(),
            },
        )?)?;

        let weights = gauss_weights(BLOOM_LEVELS);
        let mut blur_passes = Vec::with_capacity(BLOOM_LEVELS * 2);
        let mut bloom_input = rt2;
        for level in 0..BLOOM_LEVELS {
            let vertical = chain.push(PostProcessPass::new(
                gpu,
                PassDescriptor {
                    label: BLUR_V_LABELS[level],
                    source: include_str!("shaders/bloom_blur.wgsl"),
                    inputs: vec![TextureSource::Target(bloom_input)],
                    target: PassTarget::Target(bloom_vertical[level]),
                    format: HDR_FORMAT,
                    uniforms: vec![
                        ("weights", UniformValue::FloatArray(weights.clone())),
                        ("tex_size", UniformValue::Vec2([1.0, 1.0])),
                    ],
                    defines: ShaderDefines::new()
                        .uint("GAUSS_TAPS", BLOOM_LEVELS as u32)
                        .uint("BLUR_VERTICAL", 1),
                },
            )?)?;

            let horizontal = chain.push(PostProcessPass::new(
                gpu,
                PassDescriptor {
                    label: BLUR_H_LABELS[level],
                    source: include_str!("shaders/bloom_blur.wgsl"),
                    inputs: vec![TextureSource::Target(bloom_vertical[level])],
                    target: PassTarget::Target(bloom_horizontal[level]),
                    format: HDR_FORMAT,
                    uniforms: vec![
                        ("weights", UniformValue::FloatArray(weights.clone())),
                        ("tex_size", UniformValue::Vec2([1.0, 1.0])),
                    ],
                    defines: ShaderDefines::new()
                        .uint("GAUSS_TAPS", BLOOM_LEVELS as u32)
                        .uint("BLUR_VERTICAL", 0),
                },
            )?)?;

            let u_v = chain.pass(vertical).uniform_slot("tex_size").expect("declared");
            let u_h = chain
                .pass(horizontal)
                .uniform_slot("tex_size")
                .expect("declared");
            blur_passes.push((vertical, u_v));
            blur_passes.push((horizontal, u_h));

            bloom_input = bloom_horizontal[level];
        }

        chain.push(PostProcessPass::new(
            gpu,
            PassDescriptor {
                label: "composite",
                source: include_str!("shaders/composite.wgsl"),
                inputs: vec![
                    TextureSource::Target(rt1),
                    TextureSource::Target(bloom_horizontal[0]),
                    TextureSource::Target(bloom_horizontal[1]),
                    TextureSource::Target(bloom_horizontal[2]),
                    TextureSource::Target(bloom_horizontal[3]),
                ],
                target: PassTarget::Screen,
                format: gpu.config.format,
                uniforms: vec![],
                defines: ShaderDefines::new().uint("BLOOM_COUNT", BLOOM_LEVELS as u32),
            },
        )?)?;

        let u_ssr_view = chain.pass(ssr_pass).uniform_slot("view").expect("declared");
        let u_ssr_projection = chain
            .pass(ssr_pass)
            .uniform_slot("projection")
            .expect("declared");
        let u_ssr_inv_projection = chain
            .pass(ssr_pass)
            .uniform_slot("inv_projection")
            .expect("declared");
        let u_ssr_inv_view = chain
            .pass(ssr_pass)
            .uniform_slot("inv_view")
            .expect("declared");
        let u_dof_coc_params = chain
            .pass(dof_coc_pass)
            .uniform_slot("params")
            .expect("declared");
        let u_dof_bokeh_params = chain
            .pass(dof_bokeh_pass)
            .uniform_slot("params")
            .expect("declared");

        log::info!("post chain: {}", chain.labels().join(" -> "));

        Ok(Self {
            camera,
            position: Vec3::new(0.0, 40.0, 150.0),
            pool,
            chain,
            rt1,
            rt2,
            rt3,
            light_shaft,
            ssr,
            dof_coc_target,
            dof_bokeh_target,
            dof_composite_target,
            bloom_vertical,
            bloom_horizontal,
            ssr_pass,
            u_ssr_view,
            u_ssr_projection,
            u_ssr_inv_projection,
            u_ssr_inv_view,
            dof_coc_pass,
            u_dof_coc_params,
            dof_bokeh_pass,
            u_dof_bokeh_params,
            blur_passes,
            look_target: None,
            dof_target: None,
            resolution: (1, 1),
            resolution_inv: [1.0, 1.0],
        })
    }

    /// Resolves the rig's named scene targets after the scene is built.
    /// Missing targets degrade gracefully: the view aims at the origin and
    /// the focus distance falls back to the zero vector.
    pub fn bind_scene(&mut self, world: &World) {
        self.look_target = find_by_name(world, "CameraTarget");
        if self.look_target.is_none() {
            log::warn!("scene has no CameraTarget; aiming at origin");
        }
        self.dof_target = find_by_name(world, "CameraTargetDof");
        if self.dof_target.is_none() {
            log::warn!("scene has no CameraTargetDof; focusing on origin");
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Size of a pool target, for external inspection.
    pub fn target_size(&self, slot: TargetSlot) -> (u32, u32) {
        self.pool.target(slot).size()
    }

    /// Current write/read slots of a feedback pair.
    pub fn pair_slots(&self, pair: FeedbackSlot) -> (TargetSlot, TargetSlot) {
        (self.pool.write_slot(pair), self.pool.read_slot(pair))
    }

    /// Per-frame camera work. Must run before [`MainCamera::run`] each
    /// frame: it recomputes the view, refreshes the DOF and SSR uniforms,
    /// and swaps the feedback pairs.
    pub fn update(&mut self, world: &World, time: f32) {
        // View: aim at the look target, then perturb with a slow shake.
        let look_at = self
            .look_target
            .and_then(|entity| world_position(world, entity))
            .unwrap_or(Vec3::ZERO);
        let mut camera_world = Mat4::look_at_rh(self.position, look_at, Vec3::Y).inverse();
        let shake = Quat::from_euler(
            EulerRot::XYZ,
            (time * 2.0).sin() * SHAKE_AMPLITUDE,
            (time * 2.5).sin() * SHAKE_AMPLITUDE,
            0.0,
        );
        camera_world *= Mat4::from_quat(shake);
        self.camera.view = camera_world.inverse();

        // DOF parameters from the camera-to-target distance.
        let focus_point = self
            .dof_target
            .and_then(|entity| world_position(world, entity))
            .unwrap_or(Vec3::ZERO);
        let focus_distance = (self.position - focus_point).length();
        let (_, bokeh_height) = self.pool.target(self.dof_bokeh_target).size();
        let params = dof_params(focus_distance, bokeh_height);
        self.chain
            .pass_mut(self.dof_coc_pass)
            .set_uniform(self.u_dof_coc_params, UniformValue::Vec4(params));
        self.chain
            .pass_mut(self.dof_bokeh_pass)
            .set_uniform(self.u_dof_bokeh_params, UniformValue::Vec4(params));

        // SSR camera matrices.
        let view = self.camera.view;
        let projection = self.camera.projection;
        let ssr = self.chain.pass_mut(self.ssr_pass);
        ssr.set_uniform(self.u_ssr_view, UniformValue::Mat4(view.to_cols_array_2d()));
        ssr.set_uniform(
            self.u_ssr_projection,
            UniformValue::Mat4(projection.to_cols_array_2d()),
        );
        ssr.set_uniform(
            self.u_ssr_inv_projection,
            UniformValue::Mat4(projection.inverse().to_cols_array_2d()),
        );
        ssr.set_uniform(
            self.u_ssr_inv_view,
            UniformValue::Mat4(view.inverse().to_cols_array_2d()),
        );

        // Swap the temporal pairs. After this, each producer writes the
        // fresh side and reads last frame's, and the composite reads the
        // fresh side.
        self.pool.swap(self.light_shaft);
        self.pool.swap(self.ssr);
    }

    /// Resize cascade. Derived resolutions (half, bloom levels) are
    /// computed before the targets that consume them are resized.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        self.resolution = (width, height);
        self.resolution_inv = [1.0 / width as f32, 1.0 / height as f32];

        let (half_w, half_h) = half_resolution(width, height);
        let bloom_sizes: Vec<(u32, u32)> = (0..BLOOM_LEVELS as u32)
            .map(|level| bloom_level_size(width, height, level))
            .collect();

        self.pool.resize(gpu, self.rt1, width, height);
        self.pool.resize(gpu, self.rt2, width, height);
        self.pool.resize(gpu, self.rt3, width, height);

        self.camera.set_resolution(width, height);

        for level in 0..BLOOM_LEVELS {
            let (w, h) = bloom_sizes[level];
            self.pool.resize(gpu, self.bloom_vertical[level], w, h);
            self.pool.resize(gpu, self.bloom_horizontal[level], w, h);

            let size = UniformValue::Vec2([w as f32, h as f32]);
            let (vertical, u_v) = self.blur_passes[level * 2];
            self.chain.pass_mut(vertical).set_uniform(u_v, size.clone());
            let (horizontal, u_h) = self.blur_passes[level * 2 + 1];
            self.chain.pass_mut(horizontal).set_uniform(u_h, size);
        }

        self.pool.resize_pair(gpu, self.light_shaft, width, height);
        self.pool.resize_pair(gpu, self.ssr, half_w, half_h);

        self.pool.resize(gpu, self.dof_coc_target, half_w, half_h);
        self.pool.resize(gpu, self.dof_bokeh_target, half_w, half_h);
        self.pool.resize(gpu, self.dof_composite_target, width, height);

        log::debug!("resized chain targets to {width}x{height} (half {half_w}x{half_h})");
    }

    /// Executes the post chain for this frame.
    pub fn run(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        inputs: &ChainInputs,
        time: f32,
    ) {
        let frame = FrameUniforms {
            resolution: [self.resolution.0 as f32, self.resolution.1 as f32],
            resolution_inv: self.resolution_inv,
            time,
            _pad: [0.0; 3],
        };
        self.chain.run(gpu, encoder, &self.pool, inputs, &frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauss_weights_sum_to_one_with_doubled_tail() {
        for count in 1..=8 {
            let weights = gauss_weights(count);
            let sum: f32 = weights
                .iter()
                .enumerate()
                .map(|(i, w)| if i > 0 { w * 2.0 } else { *w })
                .sum();
            assert!(
                (sum - 1.0).abs() < 1e-5,
                "count {count}: weighted sum was {sum}"
            );
        }
    }

    #[test]
    fn gauss_weights_decrease_from_center() {
        let weights = gauss_weights(4);
        for pair in weights.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn dof_coc_terms_are_reciprocal() {
        for height in [1u32, 67, 540, 1080, 4321] {
            let params = dof_params(25.0, height);
            assert!((params[1] * params[2] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn dof_params_are_finite_for_missing_target() {
        // A missing DOF target degrades to focusing on the zero vector.
        let focus = (Vec3::new(0.0, 40.0, 150.0) - Vec3::ZERO).length();
        let params = dof_params(focus, 540);
        assert!(params.iter().all(|v| v.is_finite()));
        assert_eq!(params[3], DOF_BLEND_COEFF);
    }

    #[test]
    fn focal_length_narrows_with_wider_fov() {
        let narrow = focal_length(30f32.to_radians());
        let wide = focal_length(90f32.to_radians());
        assert!(narrow > wide);
        assert!(wide > 0.0);
    }
}
