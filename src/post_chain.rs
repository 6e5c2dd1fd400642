//! The post-processing orchestrator.
//!
//! [`PostChain`] owns an ordered list of passes and executes them in
//! declaration order, once per frame, unconditionally; there is no per-pass
//! enable/disable and no reordering. The order is fixed at construction and
//! encodes the real data dependencies (reflections before the screen-space
//! composite, the composite before depth-of-field, depth-of-field before
//! bloom). Later passes read earlier passes' outputs, so the chain is
//! inherently sequential on the single GPU command stream.
//!
//! Each pass's symbolic sources are resolved against the target pool and
//! the frame's external inputs at execute time; feedback pairs resolve
//! through their current roles, so the per-frame swap needs no pass
//! rewiring. A shared [`FrameUniforms`] record is handed to every pass
//! instead of a mutable shared uniforms object.

use crate::error::ChainError;
use crate::gpu::GpuContext;
use crate::post_pass::{PassTarget, PostProcessPass, TextureSource};
use crate::render_target::TargetPool;

/// Per-frame values shared by every pass, immutable for the frame.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    /// Display resolution in pixels.
    pub resolution: [f32; 2],
    /// Reciprocal display resolution.
    pub resolution_inv: [f32; 2],
    /// Elapsed time in seconds.
    pub time: f32,
    /// Padding for 16-byte alignment.
    pub _pad: [f32; 3],
}

/// External texture views feeding the chain for one frame.
pub struct ChainInputs<'a> {
    /// G-buffer color attachments: albedo, normal+roughness, emissive.
    pub gbuffer_color: [&'a wgpu::TextureView; 3],
    /// G-buffer depth attachment.
    pub gbuffer_depth: &'a wgpu::TextureView,
    /// Lit scene color from the deferred lighting pass.
    pub scene_color: &'a wgpu::TextureView,
    /// This frame's surface view, the final composite's target.
    pub screen: &'a wgpu::TextureView,
}

/// Index of a pass in the chain, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassId(pub(crate) usize);

/// True when a pass's input would read the very texture its target writes
/// this frame. Feedback read-vs-write of the same pair is *not* an alias:
/// the roles resolve to the two different slots of the pair.
fn source_aliases_target(source: TextureSource, target: PassTarget) -> bool {
    match (source, target) {
        (TextureSource::Target(s), PassTarget::Target(t)) => s == t,
        (TextureSource::FeedbackWrite(s), PassTarget::FeedbackWrite(t)) => s == t,
        _ => false,
    }
}

/// Checks one pass's wiring against its own target.
pub(crate) fn validate_wiring(
    label: &'static str,
    inputs: &[TextureSource],
    target: PassTarget,
) -> Result<(), ChainError> {
    if inputs
        .iter()
        .any(|&source| source_aliases_target(source, target))
    {
        return Err(ChainError::TargetAliased { label });
    }
    Ok(())
}

/// Ordered sequence of post-processing passes.
pub struct PostChain {
    passes: Vec<PostProcessPass>,
}

impl PostChain {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Appends a pass; execution order is append order.
    ///
    /// # Errors
    ///
    /// Fails if the pass declares its own render target among its inputs.
    pub fn push(&mut self, pass: PostProcessPass) -> Result<PassId, ChainError> {
        validate_wiring(pass.label(), pass.inputs(), pass.target())?;
        let id = PassId(self.passes.len());
        self.passes.push(pass);
        Ok(id)
    }

    pub fn pass(&self, id: PassId) -> &PostProcessPass {
        &self.passes[id.0]
    }

    pub fn pass_mut(&mut self, id: PassId) -> &mut PostProcessPass {
        &mut self.passes[id.0]
    }

    /// Pass labels in execution order.
    pub fn labels(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.label()).collect()
    }

    /// Executes every pass in declaration order.
    ///
    /// Uniform values are read at draw time (late binding), so values set
    /// since the last frame (depth-of-field parameters, camera matrices)
    /// take effect here without any rewiring.
    pub fn run(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        pool: &TargetPool,
        inputs: &ChainInputs,
        frame: &FrameUniforms,
    ) {
        for pass in &self.passes {
            let target_view = match pass.target() {
                PassTarget::Target(slot) => pool.target(slot).view(),
                PassTarget::FeedbackWrite(pair) => pool.target(pool.write_slot(pair)).view(),
                PassTarget::Screen => inputs.screen,
            };

            let input_views: Vec<&wgpu::TextureView> = pass
                .inputs()
                .iter()
                .map(|&source| resolve_source(source, pool, inputs))
                .collect();

            pass.draw(gpu, encoder, target_view, &input_views, frame);
        }
    }
}

impl Default for PostChain {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_source<'a>(
    source: TextureSource,
    pool: &'a TargetPool,
    inputs: &ChainInputs<'a>,
) -> &'a wgpu::TextureView {
    match source {
        TextureSource::Target(slot) => pool.target(slot).view(),
        TextureSource::FeedbackRead(pair) => pool.target(pool.read_slot(pair)).view(),
        TextureSource::FeedbackWrite(pair) => pool.target(pool.write_slot(pair)).view(),
        TextureSource::GBufferColor(n) => inputs.gbuffer_color[n],
        TextureSource::GBufferDepth => inputs.gbuffer_depth,
        TextureSource::SceneColor => inputs.scene_color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_target::{FeedbackSlot, TargetSlot};

    #[test]
    fn reading_own_target_is_rejected() {
        let slot = TargetSlot(0);
        let result = validate_wiring(
            "bad",
            &[TextureSource::Target(slot)],
            PassTarget::Target(slot),
        );
        assert!(result.is_err());
    }

    #[test]
    fn feedback_read_while_writing_same_pair_is_allowed() {
        // The defining shape of a temporal pass: read last frame's side,
        // write this frame's side.
        let pair = FeedbackSlot(0);
        let result = validate_wiring(
            "light_shaft",
            &[TextureSource::FeedbackRead(pair), TextureSource::GBufferDepth],
            PassTarget::FeedbackWrite(pair),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn feedback_write_as_input_to_its_own_producer_is_rejected() {
        let pair = FeedbackSlot(1);
        let result = validate_wiring(
            "bad",
            &[TextureSource::FeedbackWrite(pair)],
            PassTarget::FeedbackWrite(pair),
        );
        assert!(result.is_err());
    }

    #[test]
    fn downstream_reads_of_a_fresh_feedback_write_are_allowed() {
        let pair = FeedbackSlot(0);
        let result = validate_wiring(
            "ss_composite",
            &[
                TextureSource::FeedbackWrite(pair),
                TextureSource::SceneColor,
            ],
            PassTarget::Target(TargetSlot(2)),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn zero_input_wiring_is_valid() {
        let result = validate_wiring("first_frame", &[], PassTarget::Target(TargetSlot(0)));
        assert!(result.is_ok());
    }
}
