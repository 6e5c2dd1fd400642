//! # Phosphor
//!
//! A deferred-rendered interactive graphics piece: an entity scene feeding
//! a G-buffer, shaded by a deferred lighting pass, finished by a
//! multi-stage post-processing chain: temporal light shafts and
//! screen-space reflections on ping-pong targets, depth of field, FXAA, a
//! bloom pyramid, and a final tone composite to the surface.
//!
//! The interesting machinery is the chain orchestration in
//! [`MainCamera`]: symbolic texture wiring through a target pool, feedback
//! pairs swapped by role (never by reference), and a resize cascade that
//! keeps every derived resolution consistent.

mod app;
mod camera;
mod ecs;
mod error;
mod gbuffer;
mod geometry_pass;
mod gpu;
mod lighting_pass;
mod main_camera;
mod mesh;
mod post_chain;
mod post_pass;
mod render_target;
mod scene;
mod uniforms;

pub use app::run;
pub use camera::{RenderCamera, corrected_fov};
pub use ecs::{
    Bob, MeshId, MeshRegistry, Name, RenderMesh, Spin, Transform, WorldMatrix, apply_motion,
    find_by_name, propagate_world_matrices, world_position,
};
pub use error::{BuildError, ChainError, PassError};
pub use gbuffer::{GBUFFER_DEPTH_FORMAT, GBuffer};
pub use geometry_pass::GeometryPass;
pub use gpu::GpuContext;
pub use lighting_pass::LightingPass;
pub use main_camera::{BLOOM_LEVELS, MainCamera, dof_params, focal_length, gauss_weights};
pub use mesh::{Mesh, Vertex3d};
pub use post_chain::{ChainInputs, FrameUniforms, PassId, PostChain};
pub use post_pass::{
    PassDescriptor, PassTarget, PostProcessPass, ShaderDefines, TextureSource, UniformSlot,
};
pub use render_target::{
    FeedbackSlot, HDR_FORMAT, RenderTarget, TargetPool, TargetSlot, bloom_level_size,
    half_resolution,
};
pub use scene::{NodeKind, SceneNodeDesc, authored_nodes, build_scene, route};
pub use uniforms::UniformValue;

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export the ECS world
pub use hecs::{Entity, World};
