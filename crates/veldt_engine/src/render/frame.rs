//! Per-frame coordination
//!
//! [`FrameRenderer`] sequences one frame: target framebuffer selection, the
//! main pipeline, and the optional post-processing pass. It also carries
//! the statistics and simulation status lines for the UI collaborator and
//! forwards camera, visibility and light updates to the pipeline.

use crate::foundation::math::{Mat4, Vec3};
use crate::render::compositor::Compositor;
use crate::render::device::{CullFace, DepthFunc, GraphicsDevice};
use crate::render::pipeline::ScenePipeline;
use crate::render::scene_model::SceneRenderModel;
use crate::scene::visibility::VisibilityFlags;

/// Background clear colour, a daylight blue
const CLEAR_COLOUR: [f32; 3] = [0.0, 162.0 / 255.0, 232.0 / 255.0];

/// Draws one frame per call and owns the pipeline doing it
pub struct FrameRenderer {
    pipeline: Box<dyn ScenePipeline>,
    compositor: Option<Compositor>,
    is_deferred: bool,

    statistics_line: String,
    simulation_line: String,
}

impl FrameRenderer {
    /// Assemble the frame renderer.
    ///
    /// With both a deferred pipeline and a compositor, the pipeline's output
    /// is routed into the compositor's target here; a forward pipeline
    /// instead draws into whatever target is bound before its pass.
    pub fn new(
        mut pipeline: Box<dyn ScenePipeline>,
        compositor: Option<Compositor>,
        is_deferred: bool,
    ) -> Self {
        if is_deferred {
            if let Some(compositor) = &compositor {
                pipeline.set_output_framebuffer(compositor.framebuffer());
            }
        }

        Self {
            pipeline,
            compositor,
            is_deferred,
            statistics_line: String::new(),
            simulation_line: String::new(),
        }
    }

    /// Apply the fixed global device state the renderer assumes:
    /// clear colour, back-face culling, less-or-equal depth testing.
    pub fn apply_global_state(&self, device: &mut dyn GraphicsDevice) {
        device.set_clear_colour(CLEAR_COLOUR[0], CLEAR_COLOUR[1], CLEAR_COLOUR[2], 1.0);
        device.set_cull_face(Some(CullFace::Back));
        device.set_depth_test(true);
        device.set_depth_function(DepthFunc::LessOrEqual);
    }

    /// Draw one frame
    pub fn render_frame(&mut self, device: &mut dyn GraphicsDevice) {
        self.pipeline.bind_target_framebuffer(device);
        if !self.is_deferred {
            if let Some(compositor) = &self.compositor {
                compositor.bind_target_framebuffer(device);
            }
        }

        self.pipeline.render(device);

        if let Some(compositor) = &self.compositor {
            compositor.render(device);
        }
    }

    /// Replace the view matrix for subsequent frames
    pub fn update_camera(&mut self, view: Mat4) {
        self.pipeline.dispatcher_mut().set_view_matrix(view);
    }

    /// Replace the camera world position for sky and glitter draws
    pub fn set_camera_position(&mut self, position: Vec3) {
        self.pipeline.dispatcher_mut().set_camera_position(position);
    }

    /// Replace the per-chunk visibility flags
    pub fn set_visibility(&mut self, visibility: Vec<VisibilityFlags>) {
        self.pipeline.dispatcher_mut().set_visibility(visibility);
    }

    /// Broadcast a new light direction
    pub fn set_light_direction(&mut self, device: &mut dyn GraphicsDevice, direction: Vec3) {
        self.pipeline.set_light_direction(device, direction);
    }

    /// Broadcast a new diffuse light colour
    pub fn set_diffuse_light_colour(&mut self, device: &mut dyn GraphicsDevice, colour: Vec3) {
        self.pipeline.set_diffuse_light_colour(device, colour);
    }

    /// Broadcast a new ambient light colour
    pub fn set_ambient_light_colour(&mut self, device: &mut dyn GraphicsDevice, colour: Vec3) {
        self.pipeline.set_ambient_light_colour(device, colour);
    }

    /// Triangles drawn by the last frame
    pub fn drawn_triangle_count(&self) -> u64 {
        self.pipeline.dispatcher().drawn_triangle_count()
    }

    /// The scene model, for editor-driven rebuilds between frames
    pub fn scene_model_mut(&mut self) -> &mut SceneRenderModel {
        self.pipeline.dispatcher_mut().scene_model_mut()
    }

    /// Update the statistics line shown by the UI collaborator
    pub fn set_statistics_line(&mut self, line: impl Into<String>) {
        self.statistics_line = line.into();
    }

    /// Update the simulation status line shown by the UI collaborator
    pub fn set_simulation_line(&mut self, line: impl Into<String>) {
        self.simulation_line = line.into();
    }

    /// The current statistics line
    pub fn statistics_line(&self) -> &str {
        &self.statistics_line
    }

    /// The current simulation status line
    pub fn simulation_line(&self) -> &str {
        &self.simulation_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::{BlendMode, FramebufferId};
    use crate::render::dispatch::RenderDispatcher;
    use crate::render::pipeline::ForwardPipeline;
    use crate::render::shader::{ShaderVariant, UniformTable};
    use crate::render::test_support::{DeviceCall, RecordingDevice};
    use std::collections::BTreeMap;

    fn empty_forward() -> Box<dyn ScenePipeline> {
        let dispatcher = RenderDispatcher::new(
            Vec::new(),
            ShaderVariant {
                program: crate::render::device::ProgramId(50),
                uniforms: UniformTable::default(),
                is_directional_light: false,
            },
            &BTreeMap::new(),
            true,
            SceneRenderModel::default(),
        );
        Box::new(ForwardPipeline::new(dispatcher))
    }

    fn compositor(device: &mut RecordingDevice) -> Compositor {
        let target = device.create_offscreen_target(640, 480, 1).unwrap();
        let quad = device.create_fullscreen_quad().unwrap();
        Compositor::new(ShaderVariant::default(), quad, target, 640, 480)
    }

    #[test]
    fn test_forward_frame_with_compositor_renders_into_its_target() {
        let mut device = RecordingDevice::new();
        let post = compositor(&mut device);
        let post_framebuffer = post.framebuffer();

        let mut frame = FrameRenderer::new(empty_forward(), Some(post), false);

        let before = device.calls().len();
        frame.render_frame(&mut device);
        let calls = &device.calls()[before..];

        // The compositor target is bound before the forward pass, and the
        // backbuffer before the post pass
        let target_bind = calls
            .iter()
            .position(|c| matches!(c, DeviceCall::BindFramebuffer(f) if *f == post_framebuffer))
            .expect("offscreen target bound");
        let backbuffer_bind = calls
            .iter()
            .position(
                |c| matches!(c, DeviceCall::BindFramebuffer(f) if *f == FramebufferId::BACKBUFFER),
            )
            .expect("backbuffer bound");
        assert!(target_bind < backbuffer_bind);
    }

    #[test]
    fn test_forward_frame_without_compositor_touches_no_framebuffers() {
        let mut device = RecordingDevice::new();
        let mut frame = FrameRenderer::new(empty_forward(), None, false);

        frame.render_frame(&mut device);

        assert_eq!(
            device.count(|c| matches!(c, DeviceCall::BindFramebuffer(_))),
            0
        );
        // The empty scene still runs the blend bracket for transparency
        assert!(device
            .calls()
            .contains(&DeviceCall::SetBlend(Some(BlendMode::Alpha))));
        assert!(device.calls().contains(&DeviceCall::SetBlend(None)));
    }

    #[test]
    fn test_status_lines_round_trip() {
        let mut frame = FrameRenderer::new(empty_forward(), None, false);

        frame.set_statistics_line("60 FPS  1200 triangles drawn");
        frame.set_simulation_line("Simulation is ON");

        assert_eq!(frame.statistics_line(), "60 FPS  1200 triangles drawn");
        assert_eq!(frame.simulation_line(), "Simulation is ON");
    }
}
