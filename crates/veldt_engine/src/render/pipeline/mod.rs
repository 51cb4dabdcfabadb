//! Render strategy implementations
//!
//! [`ScenePipeline`] is the strategy seam between the per-frame coordinator
//! and the two ways a scene gets shaded: a single forward colour pass, or a
//! geometry pass plus stencil-masked light accumulation. Both build on the
//! shared [`RenderDispatcher`] walk.

pub mod deferred;
pub mod forward;

pub use deferred::DeferredPipeline;
pub use forward::ForwardPipeline;

use crate::foundation::math::Vec3;
use crate::render::device::{FramebufferId, GraphicsDevice};
use crate::render::dispatch::RenderDispatcher;

/// One render strategy, invoked once per frame
pub trait ScenePipeline {
    /// Draw the whole scene
    fn render(&mut self, device: &mut dyn GraphicsDevice);

    /// Bind the framebuffer this pipeline draws its main passes into.
    /// Forward rendering draws directly and binds nothing.
    fn bind_target_framebuffer(&mut self, device: &mut dyn GraphicsDevice);

    /// Select where the finished image lands: the backbuffer or a
    /// post-processing input. A no-op for forward rendering.
    fn set_output_framebuffer(&mut self, framebuffer: FramebufferId);

    /// The shared dispatcher
    fn dispatcher(&self) -> &RenderDispatcher;

    /// Mutable access to the shared dispatcher
    fn dispatcher_mut(&mut self) -> &mut RenderDispatcher;

    /// Broadcast a new light direction to every directional variant
    fn set_light_direction(&mut self, device: &mut dyn GraphicsDevice, direction: Vec3) {
        self.dispatcher_mut().set_light_direction(device, direction);
    }

    /// Broadcast a new diffuse light colour to every directional variant
    fn set_diffuse_light_colour(&mut self, device: &mut dyn GraphicsDevice, colour: Vec3) {
        self.dispatcher_mut().set_diffuse_light_colour(device, colour);
    }

    /// Broadcast a new ambient light colour to every directional variant
    fn set_ambient_light_colour(&mut self, device: &mut dyn GraphicsDevice, colour: Vec3) {
        self.dispatcher_mut().set_ambient_light_colour(device, colour);
    }
}
