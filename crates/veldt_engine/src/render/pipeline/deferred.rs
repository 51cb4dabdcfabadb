//! Deferred rendering
//!
//! Pass sequence per frame:
//!
//! 1. Geometry pass into the multi-target geometry buffer (position, uv,
//!    normal, diffuse plus depth-stencil), depth test and writes on.
//! 2. For a point light, a stencil pass: the light's bounding sphere is
//!    drawn with front/back increment/decrement and colour writes off,
//!    marking the pixels inside the light volume.
//! 3. Light accumulation into the output framebuffer: a full-screen quad
//!    for the directional channel, then (point light only) the light
//!    sphere again, stencil-tested not-equal-zero, front-face culled,
//!    additively blended.
//! 4. The geometry pass's depth is blitted into the output framebuffer so
//!    the forward epilogue depth-tests against opaque scene depth.
//! 5. Forward epilogue: sky with depth writes off, then alpha-blended
//!    transparent geometry.
//!
//! When the scene light is a point light, the directional channel carries a
//! forced all-black diffuse and serves purely as the ambient "night" term;
//! the two light models are never both dynamically active.

use nalgebra::Translation3;

use crate::assets::MeshHandles;
use crate::foundation::math::{compute_bounding_sphere_radius, Mat4, Vec3};
use crate::render::device::{
    BlendMode, CullFace, FramebufferId, GraphicsDevice, OffscreenTarget, StencilFace, StencilFunc,
    StencilOp, VertexArrayId,
};
use crate::render::dispatch::RenderDispatcher;
use crate::render::pipeline::ScenePipeline;
use crate::render::shader::ShaderVariant;

/// Geometry buffer colour attachment holding world positions
pub const TEXTURE_INDEX_POSITION: usize = 0;
/// Geometry buffer colour attachment holding normals
pub const TEXTURE_INDEX_NORMAL: usize = 2;
/// Geometry buffer colour attachment holding diffuse colour
pub const TEXTURE_INDEX_DIFFUSE: usize = 3;
/// Number of geometry buffer colour attachments
pub const GEOMETRY_TARGETS: u32 = 4;

/// Point-light machinery, present only when the scene light is a point
pub struct PointLightPasses {
    /// Stencil-only sphere shader
    pub stencil_pass: ShaderVariant,
    /// Stencil-masked accumulation shader
    pub light_pass: ShaderVariant,
    /// Bounding sphere mesh
    pub light_sphere: MeshHandles,
    /// World position of the light
    pub light_position: Vec3,
    /// Light power driving the sphere radius
    pub light_power: f32,
}

/// Deferred rendering strategy
pub struct DeferredPipeline {
    dispatcher: RenderDispatcher,

    geometry_buffer: OffscreenTarget,
    quad_vao: VertexArrayId,
    width: u32,
    height: u32,

    use_fog: bool,
    directional_light_pass: ShaderVariant,
    point_light: Option<PointLightPasses>,

    output_framebuffer: FramebufferId,
}

impl DeferredPipeline {
    /// Deferred pipeline over a prepared dispatcher and geometry buffer.
    ///
    /// `point_light` is `None` when the scene light is directional; the
    /// stencil and point accumulation passes are skipped entirely then.
    pub fn new(
        dispatcher: RenderDispatcher,
        geometry_buffer: OffscreenTarget,
        quad_vao: VertexArrayId,
        width: u32,
        height: u32,
        use_fog: bool,
        directional_light_pass: ShaderVariant,
        point_light: Option<PointLightPasses>,
    ) -> Self {
        Self {
            dispatcher,
            geometry_buffer,
            quad_vao,
            width,
            height,
            use_fog,
            directional_light_pass,
            point_light,
            output_framebuffer: FramebufferId::BACKBUFFER,
        }
    }

    fn perform_stencil_pass(&mut self, device: &mut dyn GraphicsDevice) {
        let Some(point) = &self.point_light else {
            return;
        };

        device.set_stencil_test(true);
        device.use_program(point.stencil_pass.program);

        device.set_colour_writes(false);
        device.set_cull_face(None);

        device.set_stencil_func(StencilFunc::Always);
        device.set_stencil_op(
            StencilFace::Front,
            StencilOp::Keep,
            StencilOp::DecrementWrap,
            StencilOp::Keep,
        );
        device.set_stencil_op(
            StencilFace::Back,
            StencilOp::Keep,
            StencilOp::IncrementWrap,
            StencilOp::Keep,
        );

        let radius = compute_bounding_sphere_radius(point.light_power);
        let model = Mat4::new_scaling(radius)
            * Translation3::from(point.light_position).to_homogeneous();
        device.set_uniform_mat4_opt(point.stencil_pass.uniforms.model, &model);
        device.set_uniform_mat4_opt(
            point.stencil_pass.uniforms.view,
            self.dispatcher.view_matrix(),
        );

        device.bind_vertex_array(point.light_sphere.vao);
        device.draw_triangles(point.light_sphere.vertex_count);

        device.set_cull_face(Some(CullFace::Back));
        device.set_colour_writes(true);
        device.set_stencil_test(false);
    }

    fn perform_directional_light_pass(&mut self, device: &mut dyn GraphicsDevice) {
        let pass = &self.directional_light_pass;
        device.use_program(pass.program);

        if self.use_fog {
            device.set_uniform_mat4_opt(pass.uniforms.view, self.dispatcher.view_matrix());

            device.bind_texture(
                0,
                self.geometry_buffer.colour_textures[TEXTURE_INDEX_POSITION],
            );
            device.set_uniform_i32_opt(pass.uniforms.position_component, 0);
        }

        device.bind_vertex_array(self.quad_vao);

        device.bind_texture(2, self.geometry_buffer.colour_textures[TEXTURE_INDEX_NORMAL]);
        device.set_uniform_i32_opt(pass.uniforms.normal_component, 2);

        device.bind_texture(
            3,
            self.geometry_buffer.colour_textures[TEXTURE_INDEX_DIFFUSE],
        );
        device.set_uniform_i32_opt(pass.uniforms.diffuse_component, 3);

        // Two triangles cover the screen
        device.draw_triangles(6);
    }

    fn perform_point_light_pass(&mut self, device: &mut dyn GraphicsDevice) {
        let Some(point) = &self.point_light else {
            return;
        };

        device.use_program(point.light_pass.program);

        device.set_stencil_test(true);
        device.set_stencil_func(StencilFunc::NotEqualZero);

        device.set_cull_face(Some(CullFace::Front));

        device.set_blend(Some(BlendMode::Additive));

        let model = Translation3::from(point.light_position).to_homogeneous();
        device.set_uniform_mat4_opt(point.light_pass.uniforms.model, &model);
        device.set_uniform_mat4_opt(
            point.light_pass.uniforms.view,
            self.dispatcher.view_matrix(),
        );

        device.bind_vertex_array(point.light_sphere.vao);

        device.bind_texture(
            0,
            self.geometry_buffer.colour_textures[TEXTURE_INDEX_POSITION],
        );
        device.set_uniform_i32_opt(point.light_pass.uniforms.position_component, 0);

        device.bind_texture(2, self.geometry_buffer.colour_textures[TEXTURE_INDEX_NORMAL]);
        device.set_uniform_i32_opt(point.light_pass.uniforms.normal_component, 2);

        device.bind_texture(
            3,
            self.geometry_buffer.colour_textures[TEXTURE_INDEX_DIFFUSE],
        );
        device.set_uniform_i32_opt(point.light_pass.uniforms.diffuse_component, 3);

        device.draw_triangles(point.light_sphere.vertex_count);

        device.set_blend(None);
        device.set_cull_face(Some(CullFace::Back));
        device.set_stencil_test(false);
    }

    fn draw_sky_as_forward(&mut self, device: &mut dyn GraphicsDevice) {
        device.set_depth_write(false);
        self.dispatcher.draw_sky(device);
        device.set_depth_write(true);
    }
}

impl ScenePipeline for DeferredPipeline {
    fn render(&mut self, device: &mut dyn GraphicsDevice) {
        self.dispatcher.begin_frame();

        device.set_depth_test(true);
        device.set_depth_write(true);

        // Geometry pass
        device.clear_colour_and_depth();
        self.dispatcher.render_opaque(device);

        device.set_depth_write(false);

        self.perform_stencil_pass(device);

        device.set_depth_test(false);

        // Light passes
        device.bind_framebuffer(self.output_framebuffer);
        device.set_viewport(self.width, self.height);
        device.clear_colour_and_depth();

        self.perform_directional_light_pass(device);
        self.perform_point_light_pass(device);

        // Forward epilogue needs opaque scene depth in the output buffer
        device.blit_depth(
            self.geometry_buffer.framebuffer,
            self.output_framebuffer,
            self.width,
            self.height,
        );
        device.bind_framebuffer(self.output_framebuffer);

        device.set_depth_test(true);

        self.draw_sky_as_forward(device);

        self.dispatcher.reset_program_binding();
        device.set_blend(Some(BlendMode::Alpha));
        self.dispatcher.render_transparent(device);
        device.set_blend(None);

        device.set_depth_test(false);
    }

    fn bind_target_framebuffer(&mut self, device: &mut dyn GraphicsDevice) {
        device.bind_framebuffer(self.geometry_buffer.framebuffer);
        device.set_viewport(self.width, self.height);
    }

    fn set_output_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.output_framebuffer = framebuffer;
    }

    fn dispatcher(&self) -> &RenderDispatcher {
        &self.dispatcher
    }

    fn dispatcher_mut(&mut self) -> &mut RenderDispatcher {
        &mut self.dispatcher
    }

    fn set_light_direction(&mut self, device: &mut dyn GraphicsDevice, direction: Vec3) {
        self.dispatcher.set_light_direction(device, direction);

        if self.directional_light_pass.is_directional_light {
            device.use_program(self.directional_light_pass.program);
            device.set_uniform_vec3_opt(
                self.directional_light_pass.uniforms.light_direction,
                &direction,
            );
        }
    }

    fn set_diffuse_light_colour(&mut self, device: &mut dyn GraphicsDevice, colour: Vec3) {
        self.dispatcher.set_diffuse_light_colour(device, colour);

        if self.directional_light_pass.is_directional_light {
            device.use_program(self.directional_light_pass.program);
            device.set_uniform_vec3_opt(
                self.directional_light_pass.uniforms.diffuse_light_colour,
                &colour,
            );
        }
    }

    fn set_ambient_light_colour(&mut self, device: &mut dyn GraphicsDevice, colour: Vec3) {
        self.dispatcher.set_ambient_light_colour(device, colour);

        if self.directional_light_pass.is_directional_light {
            device.use_program(self.directional_light_pass.program);
            device.set_uniform_vec3_opt(
                self.directional_light_pass.uniforms.ambient_light_colour,
                &colour,
            );
        }
    }
}
