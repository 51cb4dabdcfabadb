//! Graphics device seam
//!
//! [`GraphicsDevice`] expresses exactly the operations the pipelines issue
//! against the single immediate-submission GPU context: program and uniform
//! handling, vertex array and texture binds, draws, fixed-function state and
//! framebuffer management. It is a seam for the one backend this renderer
//! targets, not a cross-platform abstraction layer.
//!
//! Handles are opaque `Copy` newtypes owned by whoever created them; the
//! renderer never destroys a handle it did not create.

use crate::foundation::math::{Mat3, Mat4, Vec2, Vec3, Vec4};
use crate::render::BackendResult;

/// Handle to a compiled and linked shader program
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Handle to a vertex array object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VertexArrayId(pub u32);

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Handle to a texture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Handle to a framebuffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

impl FramebufferId {
    /// The default framebuffer (the backbuffer)
    pub const BACKBUFFER: FramebufferId = FramebufferId(0);
}

/// Resolved uniform location within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// An offscreen framebuffer with its colour attachments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffscreenTarget {
    /// The framebuffer handle
    pub framebuffer: FramebufferId,
    /// Colour attachment textures in attachment order
    pub colour_textures: Vec<TextureId>,
}

/// Blend equation selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Source-alpha / one-minus-source-alpha
    Alpha,
    /// One / one, used by light accumulation
    Additive,
}

/// Which face set gets culled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullFace {
    /// Cull back faces (the default scene state)
    Back,
    /// Cull front faces, used when shading light volume interiors
    Front,
}

/// Depth comparison function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    /// Strict less-than
    Less,
    /// Less-or-equal, lets the sky dome pass at the far plane
    LessOrEqual,
}

/// Stencil comparison function, reference value fixed at zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilFunc {
    /// Always pass, used while marking the light volume
    Always,
    /// Pass where the stencil value differs from zero
    NotEqualZero,
}

/// Per-face stencil operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    /// Leave the stencil value unchanged
    Keep,
    /// Increment with wraparound
    IncrementWrap,
    /// Decrement with wraparound
    DecrementWrap,
}

/// Face selector for separate stencil operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilFace {
    /// Front faces
    Front,
    /// Back faces
    Back,
}

/// The single GPU backend contract.
///
/// One device exists per process, owned by the render thread; every render
/// entry point receives it as `&mut dyn GraphicsDevice`.
pub trait GraphicsDevice {
    // Programs and uniforms

    /// Compile and link a program from vertex and fragment source text
    fn compile_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> BackendResult<ProgramId>;

    /// Bind a program for subsequent uniform uploads and draws
    fn use_program(&mut self, program: ProgramId);

    /// Resolve a named uniform, `None` when the program does not declare it
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Upload an integer uniform (texture units)
    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32);

    /// Upload a float uniform
    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32);

    /// Upload a vec2 uniform
    fn set_uniform_vec2(&mut self, location: UniformLocation, value: &Vec2);

    /// Upload a vec3 uniform
    fn set_uniform_vec3(&mut self, location: UniformLocation, value: &Vec3);

    /// Upload a vec4 uniform
    fn set_uniform_vec4(&mut self, location: UniformLocation, value: &Vec4);

    /// Upload a 3x3 matrix uniform
    fn set_uniform_mat3(&mut self, location: UniformLocation, value: &Mat3);

    /// Upload a 4x4 matrix uniform
    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4);

    // Geometry

    /// Bind a vertex array for subsequent draws
    fn bind_vertex_array(&mut self, vao: VertexArrayId);

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Draw `vertex_count` vertices as triangles
    fn draw_triangles(&mut self, vertex_count: u32);

    /// Draw `vertex_count` vertices as a triangle strip
    fn draw_triangle_strip(&mut self, vertex_count: u32);

    /// Draw `vertex_count` vertices as triangles, `instance_count` times
    fn draw_triangles_instanced(&mut self, vertex_count: u32, instance_count: u32);

    /// Create the shared full-screen quad used by light and post passes
    fn create_fullscreen_quad(&mut self) -> BackendResult<VertexArrayId>;

    // Fixed-function state

    /// Set the clear colour
    fn set_clear_colour(&mut self, r: f32, g: f32, b: f32, a: f32);

    /// Clear the bound framebuffer's colour and depth
    fn clear_colour_and_depth(&mut self);

    /// Enable or disable depth testing
    fn set_depth_test(&mut self, enabled: bool);

    /// Enable or disable depth writes
    fn set_depth_write(&mut self, enabled: bool);

    /// Select the depth comparison function
    fn set_depth_function(&mut self, func: DepthFunc);

    /// Enable blending with a mode, or disable it
    fn set_blend(&mut self, mode: Option<BlendMode>);

    /// Enable face culling for a face set, or disable culling
    fn set_cull_face(&mut self, face: Option<CullFace>);

    /// Enable or disable colour writes on the bound framebuffer
    fn set_colour_writes(&mut self, enabled: bool);

    /// Enable or disable the stencil test
    fn set_stencil_test(&mut self, enabled: bool);

    /// Select the stencil comparison function
    fn set_stencil_func(&mut self, func: StencilFunc);

    /// Set per-face stencil operations for fail / depth-fail / pass
    fn set_stencil_op(
        &mut self,
        face: StencilFace,
        stencil_fail: StencilOp,
        depth_fail: StencilOp,
        depth_pass: StencilOp,
    );

    // Framebuffers

    /// Create an offscreen framebuffer with colour attachments and a
    /// depth-stencil attachment
    fn create_offscreen_target(
        &mut self,
        width: u32,
        height: u32,
        colour_attachments: u32,
    ) -> BackendResult<OffscreenTarget>;

    /// Bind a framebuffer as the draw target
    fn bind_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Set the viewport dimensions
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Copy the depth buffer from one framebuffer into another
    fn blit_depth(&mut self, from: FramebufferId, to: FramebufferId, width: u32, height: u32);

    // Optional-location conveniences. A variant's uniform table stores
    // `None` for uniforms its program does not declare; these skip the
    // upload in that case, mirroring how the hardware API ignores
    // unresolved locations.

    /// Upload an integer uniform if the location is resolved
    fn set_uniform_i32_opt(&mut self, location: Option<UniformLocation>, value: i32) {
        if let Some(location) = location {
            self.set_uniform_i32(location, value);
        }
    }

    /// Upload a float uniform if the location is resolved
    fn set_uniform_f32_opt(&mut self, location: Option<UniformLocation>, value: f32) {
        if let Some(location) = location {
            self.set_uniform_f32(location, value);
        }
    }

    /// Upload a vec2 uniform if the location is resolved
    fn set_uniform_vec2_opt(&mut self, location: Option<UniformLocation>, value: &Vec2) {
        if let Some(location) = location {
            self.set_uniform_vec2(location, value);
        }
    }

    /// Upload a vec3 uniform if the location is resolved
    fn set_uniform_vec3_opt(&mut self, location: Option<UniformLocation>, value: &Vec3) {
        if let Some(location) = location {
            self.set_uniform_vec3(location, value);
        }
    }

    /// Upload a vec4 uniform if the location is resolved
    fn set_uniform_vec4_opt(&mut self, location: Option<UniformLocation>, value: &Vec4) {
        if let Some(location) = location {
            self.set_uniform_vec4(location, value);
        }
    }

    /// Upload a 3x3 matrix uniform if the location is resolved
    fn set_uniform_mat3_opt(&mut self, location: Option<UniformLocation>, value: &Mat3) {
        if let Some(location) = location {
            self.set_uniform_mat3(location, value);
        }
    }

    /// Upload a 4x4 matrix uniform if the location is resolved
    fn set_uniform_mat4_opt(&mut self, location: Option<UniformLocation>, value: &Mat4) {
        if let Some(location) = location {
            self.set_uniform_mat4(location, value);
        }
    }
}
