//! Construction-time failure taxonomy.
//!
//! Everything here is fatal at setup: a pass that fails to build has no
//! recovery path once the frame loop is running. Per-frame code never
//! returns errors; degraded lookups (a missing scene node) are handled with
//! `Option` at the call site instead.

use thiserror::Error;

/// Errors raised while constructing a post-process pass.
#[derive(Debug, Error)]
pub enum PassError {
    /// The WGSL module failed validation. Carries the preprocessed source
    /// so the offending line can be found without re-running.
    #[error("shader for pass `{label}` failed to compile: {message}\n--- source ---\n{shader_source}")]
    ShaderCompile {
        label: &'static str,
        message: String,
        shader_source: String,
    },

    /// Two uniforms with the same name were declared on one pass.
    #[error("pass `{label}` declares duplicate uniform `{name}`")]
    DuplicateUniform {
        label: &'static str,
        name: &'static str,
    },

    /// A define name is not a valid WGSL identifier.
    #[error("pass `{label}` has invalid define name `{name}`")]
    InvalidDefine { label: &'static str, name: String },
}

/// Errors raised while assembling the pass chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A pass declares one of its own input textures as its render target.
    #[error("pass `{label}` reads the target it writes")]
    TargetAliased { label: &'static str },
}

/// Anything that can go wrong while assembling the camera's post stack.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Pass(#[from] PassError),
    #[error(transparent)]
    Chain(#[from] ChainError),
}
