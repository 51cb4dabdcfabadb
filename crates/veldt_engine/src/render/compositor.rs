//! Full-screen post-processing pass
//!
//! The compositor owns an offscreen target the main pipeline renders into
//! and draws that target's colour texture to the backbuffer through one of
//! the named post-effect shaders. Its extra uniforms (screen ratio, screen
//! size) are set once at build time; the only per-frame input is the
//! texture itself.

use crate::render::device::{FramebufferId, GraphicsDevice, OffscreenTarget, VertexArrayId};
use crate::render::shader::ShaderVariant;

/// Post-processing stage, independent of the forward/deferred choice
pub struct Compositor {
    shader: ShaderVariant,
    quad_vao: VertexArrayId,
    target: OffscreenTarget,
    width: u32,
    height: u32,
}

impl Compositor {
    /// Compositor over a pre-built offscreen target and quad
    pub fn new(
        shader: ShaderVariant,
        quad_vao: VertexArrayId,
        target: OffscreenTarget,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            shader,
            quad_vao,
            target,
            width,
            height,
        }
    }

    /// The framebuffer the main pipeline should render into
    pub fn framebuffer(&self) -> FramebufferId {
        self.target.framebuffer
    }

    /// Bind and clear the offscreen target ahead of the main pipeline
    pub fn bind_target_framebuffer(&self, device: &mut dyn GraphicsDevice) {
        device.bind_framebuffer(self.target.framebuffer);
        device.set_viewport(self.width, self.height);
        device.clear_colour_and_depth();
    }

    /// Draw the captured frame to the backbuffer through the effect shader
    pub fn render(&self, device: &mut dyn GraphicsDevice) {
        device.bind_framebuffer(FramebufferId::BACKBUFFER);
        device.set_viewport(self.width, self.height);
        device.clear_colour_and_depth();

        device.use_program(self.shader.program);

        device.bind_vertex_array(self.quad_vao);
        device.bind_texture(0, self.target.colour_textures[0]);
        device.set_uniform_i32_opt(self.shader.uniforms.colour_texture, 0);

        // Two triangles cover the screen
        device.draw_triangles(6);
    }
}
