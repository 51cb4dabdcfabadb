//! Single-pass forward rendering
//!
//! Clear, draw everything opaque, then the sky with depth writes off, then
//! transparent geometry under alpha blending. The opaque pass must precede
//! the sky so the dome never wins the depth test against nearer geometry at
//! the far plane.

use crate::render::device::{BlendMode, FramebufferId, GraphicsDevice};
use crate::render::dispatch::RenderDispatcher;
use crate::render::pipeline::ScenePipeline;

/// Forward rendering strategy: one full-colour pass into the backbuffer
pub struct ForwardPipeline {
    dispatcher: RenderDispatcher,
}

impl ForwardPipeline {
    /// Forward pipeline over a prepared dispatcher
    pub fn new(dispatcher: RenderDispatcher) -> Self {
        Self { dispatcher }
    }
}

impl ScenePipeline for ForwardPipeline {
    fn render(&mut self, device: &mut dyn GraphicsDevice) {
        self.dispatcher.begin_frame();

        device.clear_colour_and_depth();

        self.dispatcher.render_opaque(device);

        // Sky
        device.set_depth_write(false);
        self.dispatcher.draw_sky(device);
        device.set_depth_write(true);

        // The sky draw bound its own program
        self.dispatcher.reset_program_binding();

        device.set_blend(Some(BlendMode::Alpha));
        self.dispatcher.render_transparent(device);
        device.set_blend(None);
    }

    fn bind_target_framebuffer(&mut self, _device: &mut dyn GraphicsDevice) {
        // Forward rendering draws directly into whatever is bound
    }

    fn set_output_framebuffer(&mut self, _framebuffer: FramebufferId) {}

    fn dispatcher(&self) -> &RenderDispatcher {
        &self.dispatcher
    }

    fn dispatcher_mut(&mut self) -> &mut RenderDispatcher {
        &mut self.dispatcher
    }
}
