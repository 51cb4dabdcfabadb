//! # Veldt Engine
//!
//! A chunked-terrain 3D scene renderer with forward and deferred pipelines.
//!
//! ## Features
//!
//! - **Shader variant registry**: symbolic material descriptions resolve to
//!   a deduplicated set of compiled programs, realized lazily per scene
//! - **Quadrant culling**: each terrain chunk splits into four quadrants
//!   with per-frame visibility flags driving draw-call culling
//! - **Forward and deferred pipelines**: a single colour pass, or geometry
//!   buffer plus stencil-masked light accumulation, behind one strategy seam
//! - **Post-processing**: optional full-screen effects composited onto the
//!   backbuffer
//! - **Scene editing**: instance insertion and group scattering with
//!   objects-only render model rebuilds
//! - **Day/night plumbing**: a background simulation worker publishing
//!   light updates through a mutex-guarded snapshot model
//!
//! ## Architecture
//!
//! The renderer is strictly single-threaded and synchronous: one
//! [`render::FrameRenderer::render_frame`] call per frame on the thread
//! owning the GPU context, reached through the [`render::device`] seam.
//! Asset loading, windowing, input and UI live outside this crate and are
//! consumed through collaborator traits ([`assets`],
//! [`render::shader::ShaderSourceProvider`], [`sim::SimulationClock`]).

#![warn(missing_docs)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod sim;

pub use config::{ConfigError, RendererConfig};
pub use render::{RenderError, RenderResult};

/// Common imports for renderer users
pub mod prelude {
    pub use crate::assets::{MeshHandles, ObjectSource, ParticleSource, TerrainSource};
    pub use crate::config::RendererConfig;
    pub use crate::foundation::math::{Mat3, Mat4, Vec2, Vec3, Vec4};
    pub use crate::render::{
        build_compositor, build_scene_pipeline, FrameRenderer, GraphicsDevice, RenderError,
        RenderResult, SceneRenderModel, ScenePipeline, ShaderVariantRegistry,
    };
    pub use crate::scene::{
        compute_chunk_margins, recalculate_visibility, ChunkMargins, Scene, VisibilityFlags,
    };
    pub use crate::sim::{SimulationClock, SimulationWorker};
}
