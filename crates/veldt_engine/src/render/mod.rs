//! # Rendering subsystem
//!
//! Turns a [`crate::scene::Scene`] into draw calls each frame.
//!
//! ## Architecture
//!
//! - [`device`]: the seam to the single immediate-submission GPU backend
//! - [`shader`]: shader variant registry, feature bitsets and catalog
//! - [`scene_model`]: the flattened, GPU-ready scene representation
//! - [`dispatch`]: per-variant draw routine dispatch and frame statistics
//! - [`pipeline`]: forward and deferred render strategies
//! - [`compositor`]: optional full-screen post-processing pass
//! - [`builder`]: pipeline and compositor assembly from a realized registry
//! - [`frame`]: per-frame coordination of pipeline and compositor
//!
//! ## Error policy
//!
//! A broken material must not take the scene down. Shader and asset
//! resolution failures are logged, the affected element is skipped, and the
//! frame always completes. Nothing in this module panics on bad scene data.

pub mod builder;
pub mod compositor;
pub mod device;
pub mod dispatch;
pub mod frame;
pub mod pipeline;
pub mod scene_model;
pub mod shader;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::{build_compositor, build_scene_pipeline};
pub use compositor::Compositor;
pub use device::{GraphicsDevice, OffscreenTarget};
pub use dispatch::RenderDispatcher;
pub use frame::FrameRenderer;
pub use pipeline::{DeferredPipeline, ForwardPipeline, ScenePipeline};
pub use scene_model::SceneRenderModel;
pub use shader::{ShaderFeatures, ShaderVariant, ShaderVariantRegistry};

use thiserror::Error;

/// Rendering error taxonomy.
///
/// Everything here is recoverable at scene granularity: callers log the
/// error and skip the element it concerns.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A symbolic shader property has no known feature flag
    #[error("unknown shader property: {0}")]
    UnknownShaderProperty(String),

    /// A shader name has no catalog description or source text
    #[error("shader resolution failed: {0}")]
    ShaderResolution(String),

    /// Shader compilation or program linking failed
    #[error("shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// A GPU resource could not be created
    #[error("resource creation failed: {0}")]
    ResourceCreation(String),

    /// Backend-reported failure outside the categories above
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;
