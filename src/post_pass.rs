//! A single full-screen post-processing pass.
//!
//! A pass is an immutable shader pipeline plus mutable wiring: an ordered
//! list of input texture [`TextureSource`]s, an output [`PassTarget`], and a
//! set of declared uniforms. Texture sources and the output are symbolic
//! (pool slots, feedback roles, upstream attachments) and are resolved to
//! real texture views by the chain at execute time, so swapping a feedback
//! pair never touches the pass itself.
//!
//! Uniform *names and types* are fixed at construction; uniform *values* are
//! read at draw time, so values replaced between frames (depth-of-field
//! parameters, camera matrices) are picked up without rebuilding anything.
//!
//! # Shader contract
//!
//! Each pass's WGSL module defines `vs` and `fs` entry points and binds:
//!
//! ```wgsl
//! struct FrameUniforms {
//!     resolution: vec2f,
//!     resolution_inv: vec2f,
//!     time: f32,
//! }
//! @group(0) @binding(0) var<uniform> frame: FrameUniforms;
//! @group(0) @binding(1) var<uniform> params: Params;      // if declared
//! @group(0) @binding(2) var tex0: texture_2d<f32>;        // inputs, in order
//! // ...
//! @group(0) @binding(2 + N) var samp: sampler;
//! ```
//!
//! Depth inputs bind as `texture_depth_2d` and are read with `textureLoad`.

use crate::error::PassError;
use crate::gpu::GpuContext;
use crate::post_chain::FrameUniforms;
use crate::render_target::{FeedbackSlot, TargetSlot};
use crate::uniforms::{UniformValue, pack, packed_size};

/// Where a pass reads a texture from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureSource {
    /// A pool target's color attachment.
    Target(TargetSlot),
    /// The side of a feedback pair holding *last* frame's output.
    FeedbackRead(FeedbackSlot),
    /// The side of a feedback pair written *this* frame (valid for passes
    /// downstream of the pair's producer).
    FeedbackWrite(FeedbackSlot),
    /// G-buffer color attachment `n`.
    GBufferColor(usize),
    /// The G-buffer depth attachment.
    GBufferDepth,
    /// The lit scene color produced by the deferred lighting pass.
    SceneColor,
}

/// Where a pass writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassTarget {
    /// A pool target.
    Target(TargetSlot),
    /// The write side of a feedback pair (resolved after the frame's swap).
    FeedbackWrite(FeedbackSlot),
    /// Present directly to the surface.
    Screen,
}

/// Compile-time constants injected into the WGSL source as module `const`
/// declarations. Changing a define requires reconstructing the pass.
#[derive(Clone, Debug, Default)]
pub struct ShaderDefines {
    defs: Vec<(String, String)>,
}

impl ShaderDefines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `const NAME: u32` define.
    pub fn uint(mut self, name: &str, value: u32) -> Self {
        self.defs.push((name.to_string(), format!("{value}u")));
        self
    }

    /// Adds a `const NAME: f32` define.
    pub fn float(mut self, name: &str, value: f32) -> Self {
        self.defs.push((name.to_string(), format!("{value:?}")));
        self
    }

    fn validate(&self, label: &'static str) -> Result<(), PassError> {
        for (name, _) in &self.defs {
            let mut chars = name.chars();
            let head_ok = chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
            let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !head_ok || !tail_ok {
                return Err(PassError::InvalidDefine {
                    label,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    fn prelude(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.defs {
            let ty = if value.ends_with('u') { "u32" } else { "f32" };
            out.push_str(&format!("const {name}: {ty} = {value};\n"));
        }
        out
    }
}

/// Everything needed to construct a [`PostProcessPass`].
pub struct PassDescriptor<'a> {
    /// Debug label, also used in error reporting.
    pub label: &'static str,
    /// WGSL module source with `vs`/`fs` entry points.
    pub source: &'a str,
    /// Input textures, bound in declaration order. May be empty.
    pub inputs: Vec<TextureSource>,
    /// Output target, or [`PassTarget::Screen`] to present.
    pub target: PassTarget,
    /// Color format of the output target.
    pub format: wgpu::TextureFormat,
    /// Declared uniforms: name, type, initial value.
    pub uniforms: Vec<(&'static str, UniformValue)>,
    /// Compile-time constants, fixed at construction.
    pub defines: ShaderDefines,
}

/// Handle to a declared uniform, resolved once at composition time so
/// per-frame updates are infallible.
#[derive(Clone, Copy, Debug)]
pub struct UniformSlot(usize);

/// One full-screen shader invocation in the chain.
pub struct PostProcessPass {
    label: &'static str,
    pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    inputs: Vec<TextureSource>,
    target: PassTarget,
    uniforms: Vec<(&'static str, UniformValue)>,
}

impl PostProcessPass {
    /// Builds the pass: validates the declaration, injects defines into the
    /// WGSL source, and compiles the pipeline.
    ///
    /// # Errors
    ///
    /// Fails fast on an invalid define name, a duplicate uniform, or a WGSL
    /// validation error (the failing source is carried in the error).
    pub fn new(gpu: &GpuContext, desc: PassDescriptor) -> Result<Self, PassError> {
        let PassDescriptor {
            label,
            source,
            inputs,
            target,
            format,
            uniforms,
            defines,
        } = desc;

        defines.validate(label)?;
        for (i, (name, _)) in uniforms.iter().enumerate() {
            if uniforms[..i].iter().any(|(other, _)| other == name) {
                return Err(PassError::DuplicateUniform { label, name });
            }
        }

        let source = format!("{}{}", defines.prelude(), source);
        let device = &gpu.device;

        // Compile under a validation scope so a broken shader surfaces as a
        // construction error carrying the source, not a deferred panic.
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl((&source).into()),
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: packed_size(&uniforms) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mut entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ];
        for (i, input) in inputs.iter().enumerate() {
            let sample_type = match input {
                TextureSource::GBufferDepth => wgpu::TextureSampleType::Depth,
                _ => wgpu::TextureSampleType::Float { filterable: true },
            };
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2 + i as u32,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 2 + inputs.len() as u32,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &entries,
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(PassError::ShaderCompile {
                label,
                message: error.to_string(),
                shader_source: source,
            });
        }

        Ok(Self {
            label,
            pipeline,
            frame_buffer,
            params_buffer,
            bind_group_layout,
            sampler,
            inputs,
            target,
            uniforms,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn inputs(&self) -> &[TextureSource] {
        &self.inputs
    }

    pub fn target(&self) -> PassTarget {
        self.target
    }

    /// Resolves a declared uniform name to a slot for per-frame updates.
    pub fn uniform_slot(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms
            .iter()
            .position(|(n, _)| *n == name)
            .map(UniformSlot)
    }

    /// Replaces a uniform value. The new value must keep the declared type.
    pub fn set_uniform(&mut self, slot: UniformSlot, value: UniformValue) {
        debug_assert!(
            self.uniforms[slot.0].1.same_type(&value),
            "uniform `{}` on pass `{}` changed type",
            self.uniforms[slot.0].0,
            self.label
        );
        self.uniforms[slot.0].1 = value;
    }

    /// Records the pass: uploads frame and param uniforms, binds the
    /// resolved input views in declaration order, and draws one full-screen
    /// triangle into `target_view`.
    pub(crate) fn draw(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target_view: &wgpu::TextureView,
        input_views: &[&wgpu::TextureView],
        frame: &FrameUniforms,
    ) {
        debug_assert_eq!(input_views.len(), self.inputs.len());

        gpu.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(frame));
        gpu.queue
            .write_buffer(&self.params_buffer, 0, &pack(&self.uniforms));

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.frame_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: self.params_buffer.as_entire_binding(),
            },
        ];
        for (i, view) in input_views.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 2 + i as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: 2 + input_views.len() as u32,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_prelude_emits_typed_constants() {
        let defines = ShaderDefines::new()
            .uint("GAUSS_TAPS", 4)
            .float("THRESHOLD", 0.5);
        let prelude = defines.prelude();
        assert!(prelude.contains("const GAUSS_TAPS: u32 = 4u;"));
        assert!(prelude.contains("const THRESHOLD: f32 = 0.5;"));
    }

    #[test]
    fn define_names_must_be_identifiers() {
        let bad = ShaderDefines::new().uint("4TAPS", 4);
        assert!(bad.validate("test").is_err());

        let bad = ShaderDefines::new().uint("TAP COUNT", 4);
        assert!(bad.validate("test").is_err());

        let good = ShaderDefines::new().uint("_TAPS_2", 4);
        assert!(good.validate("test").is_ok());
    }

    #[test]
    fn float_defines_always_carry_a_decimal_point() {
        let defines = ShaderDefines::new().float("SCALE", 2.0);
        assert!(defines.prelude().contains("= 2.0;"));
    }
}
