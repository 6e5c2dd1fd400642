//! Deferred G-buffer attachments.
//!
//! Three color attachments plus depth, all recreated together on resize:
//!
//! - `albedo`: base color (rgb) + unused alpha
//! - `normal`: world-space normal (xyz) + roughness (w)
//! - `emissive`: emissive color
//!
//! The depth attachment is the single depth surface of the whole frame; the
//! post chain samples it (light shaft, SSR, CoC) but never writes it.

use crate::gpu::GpuContext;
use crate::render_target::HDR_FORMAT;

/// Depth format shared by the geometry pass and the chain's depth reads.
pub const GBUFFER_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Number of G-buffer color attachments.
pub const GBUFFER_COLOR_COUNT: usize = 3;

struct Attachment {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl Attachment {
    fn new(
        gpu: &GpuContext,
        label: &str,
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
            _texture: texture,
            view,
        }
    }
}

/// The deferred geometry attachments.
pub struct GBuffer {
    albedo: Attachment,
    normal: Attachment,
    emissive: Attachment,
    depth: Attachment,
    width: u32,
    height: u32,
}

impl GBuffer {
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            albedo: Attachment::new(gpu, "GBuffer Albedo", HDR_FORMAT, width, height),
            normal: Attachment::new(gpu, "GBuffer Normal+Roughness", HDR_FORMAT, width, height),
            emissive: Attachment::new(gpu, "GBuffer Emissive", HDR_FORMAT, width, height),
            depth: Attachment::new(gpu, "GBuffer Depth", GBUFFER_DEPTH_FORMAT, width, height),
            width,
            height,
        }
    }

    /// Recreates every attachment at the new size.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if self.width != width.max(1) || self.height != height.max(1) {
            *self = Self::new(gpu, width, height);
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn albedo_view(&self) -> &wgpu::TextureView {
        &self.albedo.view
    }

    pub fn normal_view(&self) -> &wgpu::TextureView {
        &self.normal.view
    }

    pub fn emissive_view(&self) -> &wgpu::TextureView {
        &self.emissive.view
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    /// Color formats in attachment order, for pipeline creation.
    pub fn color_formats() -> [wgpu::TextureFormat; GBUFFER_COLOR_COUNT] {
        [HDR_FORMAT; GBUFFER_COLOR_COUNT]
    }
}
