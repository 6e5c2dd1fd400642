//! Offscreen render targets, the target pool, and feedback pairs.
//!
//! Render targets are GPU textures that can be both rendered to (as a color
//! attachment) and sampled from (as a texture binding). Passes never hold a
//! reference to a target; they hold a [`TargetSlot`] index into the
//! [`TargetPool`]. Resizing a slot reallocates the backing texture while the
//! slot handle stays valid, and swapping a [`FeedbackSlot`] is a role flip
//! on the pair rather than a reference rebind, so read/write aliasing stays
//! visible to the chain's validation.

use crate::gpu::GpuContext;

/// HDR color format used by every intermediate target in the chain.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Index of a target in the [`TargetPool`].
///
/// Slots are stable for the life of the pool; resizing reallocates the
/// texture behind the slot without invalidating the handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetSlot(pub(crate) usize);

/// Index of a feedback pair in the [`TargetPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FeedbackSlot(pub(crate) usize);

/// An offscreen color surface.
///
/// Post targets are color-only; the one depth surface in the frame lives
/// with the G-buffer and is sampled, never written, by the chain.
pub struct RenderTarget {
    label: &'static str,
    format: wgpu::TextureFormat,
    // Kept alive for the lifetime of the view.
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Creates a target at the given size.
    ///
    /// The texture gets `RENDER_ATTACHMENT` usage for writing and
    /// `TEXTURE_BINDING` usage for sampling in later passes.
    fn new(
        gpu: &GpuContext,
        label: &'static str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            label,
            format,
            _texture: texture,
            view,
            width,
            height,
        }
    }

    /// View for render pass attachment or shader sampling.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// The target's color format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Current size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reallocates backing storage if the size changed.
    ///
    /// Passes must not cache this size; the chain supplies resolution
    /// through uniforms each frame.
    fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if self.width != width || self.height != height {
            *self = Self::new(gpu, self.label, self.format, width, height);
        }
    }
}

/// Two slots alternating write/read roles across frames.
///
/// Exactly one slot is the write target at any time; the other is the read
/// source holding last frame's output. [`FeedbackPair::swap`] flips the
/// roles and must run before the owning pass executes for the frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FeedbackPair {
    a: TargetSlot,
    b: TargetSlot,
    flipped: bool,
}

impl FeedbackPair {
    pub(crate) fn new(a: TargetSlot, b: TargetSlot) -> Self {
        Self {
            a,
            b,
            flipped: false,
        }
    }

    pub(crate) fn write_slot(&self) -> TargetSlot {
        if self.flipped { self.b } else { self.a }
    }

    pub(crate) fn read_slot(&self) -> TargetSlot {
        if self.flipped { self.a } else { self.b }
    }

    pub(crate) fn swap(&mut self) {
        self.flipped = !self.flipped;
    }
}

/// Owns every offscreen target and feedback pair in the chain.
///
/// The pool is created once by the camera composition root and mutated only
/// by it; passes address it read-only through slots at execute time.
pub struct TargetPool {
    targets: Vec<RenderTarget>,
    pairs: Vec<FeedbackPair>,
}

impl TargetPool {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            pairs: Vec::new(),
        }
    }

    /// Allocates a target. It starts at 1x1 and receives its real size on
    /// the first resize event.
    pub fn create(
        &mut self,
        gpu: &GpuContext,
        label: &'static str,
        format: wgpu::TextureFormat,
    ) -> TargetSlot {
        let slot = TargetSlot(self.targets.len());
        self.targets.push(RenderTarget::new(gpu, label, format, 1, 1));
        slot
    }

    /// Allocates a feedback pair of two identically-formatted targets.
    pub fn create_pair(
        &mut self,
        gpu: &GpuContext,
        label_a: &'static str,
        label_b: &'static str,
        format: wgpu::TextureFormat,
    ) -> FeedbackSlot {
        let a = self.create(gpu, label_a, format);
        let b = self.create(gpu, label_b, format);
        let slot = FeedbackSlot(self.pairs.len());
        self.pairs.push(FeedbackPair::new(a, b));
        slot
    }

    pub fn target(&self, slot: TargetSlot) -> &RenderTarget {
        &self.targets[slot.0]
    }

    /// The pair's current write target.
    pub fn write_slot(&self, pair: FeedbackSlot) -> TargetSlot {
        self.pairs[pair.0].write_slot()
    }

    /// The pair's current read source (last frame's output).
    pub fn read_slot(&self, pair: FeedbackSlot) -> TargetSlot {
        self.pairs[pair.0].read_slot()
    }

    /// Flips the pair's write/read roles.
    pub fn swap(&mut self, pair: FeedbackSlot) {
        self.pairs[pair.0].swap();
    }

    /// Resizes one slot, reallocating its texture if needed.
    pub fn resize(&mut self, gpu: &GpuContext, slot: TargetSlot, width: u32, height: u32) {
        self.targets[slot.0].resize(gpu, width, height);
    }

    /// Resizes both sides of a pair.
    pub fn resize_pair(&mut self, gpu: &GpuContext, pair: FeedbackSlot, width: u32, height: u32) {
        let FeedbackPair { a, b, .. } = self.pairs[pair.0];
        self.resize(gpu, a, width, height);
        self.resize(gpu, b, width, height);
    }
}

impl Default for TargetPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Floored half resolution, clamped to 1x1.
pub fn half_resolution(width: u32, height: u32) -> (u32, u32) {
    ((width / 2).max(1), (height / 2).max(1))
}

/// Size of bloom pyramid level `level`: `res / 2^(level + 1)`, clamped to 1.
pub fn bloom_level_size(width: u32, height: u32, level: u32) -> (u32, u32) {
    let divisor = 1u32 << (level + 1);
    ((width / divisor).max(1), (height / divisor).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_resolution_floors_and_clamps() {
        assert_eq!(half_resolution(1920, 1080), (960, 540));
        assert_eq!(half_resolution(1921, 1081), (960, 540));
        assert_eq!(half_resolution(1, 1), (1, 1));
        assert_eq!(half_resolution(3, 5), (1, 2));
    }

    #[test]
    fn bloom_levels_halve_per_level() {
        assert_eq!(bloom_level_size(1920, 1080, 0), (960, 540));
        assert_eq!(bloom_level_size(1920, 1080, 1), (480, 270));
        assert_eq!(bloom_level_size(1920, 1080, 2), (240, 135));
        assert_eq!(bloom_level_size(1920, 1080, 3), (120, 67));
    }

    #[test]
    fn bloom_levels_clamp_to_one() {
        assert_eq!(bloom_level_size(8, 8, 5), (1, 1));
    }

    #[test]
    fn feedback_swap_alternates_roles() {
        let mut pair = FeedbackPair::new(TargetSlot(0), TargetSlot(1));
        assert_eq!(pair.write_slot(), TargetSlot(0));
        assert_eq!(pair.read_slot(), TargetSlot(1));

        pair.swap();
        assert_eq!(pair.write_slot(), TargetSlot(1));
        assert_eq!(pair.read_slot(), TargetSlot(0));
    }

    #[test]
    fn feedback_swap_is_idempotent_over_two_frames() {
        let mut pair = FeedbackPair::new(TargetSlot(3), TargetSlot(4));
        let (w0, r0) = (pair.write_slot(), pair.read_slot());
        pair.swap();
        pair.swap();
        assert_eq!(pair.write_slot(), w0);
        assert_eq!(pair.read_slot(), r0);
    }

    #[test]
    fn write_and_read_slots_never_alias() {
        let mut pair = FeedbackPair::new(TargetSlot(0), TargetSlot(1));
        for _ in 0..5 {
            assert_ne!(pair.write_slot(), pair.read_slot());
            pair.swap();
        }
    }
}
