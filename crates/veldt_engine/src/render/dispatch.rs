//! Per-variant draw dispatch
//!
//! [`RenderDispatcher`] owns the dense shader variant table and the scene
//! model, walks the model filtered by visibility, and issues draws through
//! the routine selected for each shader index at construction time.
//!
//! Program binds are elided through `previous_shader`: a batch rebinds its
//! program only when its shader index differs from the previous batch's.
//! The field resets to "none" at the top of every frame and after any
//! out-of-band program change (sky draw, light uniform broadcast), which is
//! the sole mechanism keeping the elision correct. The view matrix is
//! re-uploaded on every batch instead of tracking a second piece of state.

use std::collections::BTreeMap;
use std::time::Instant;

use log::error;
use nalgebra::Translation3;

use crate::foundation::math::{Mat3, Mat4, Vec3};
use crate::render::device::GraphicsDevice;
use crate::render::scene_model::{ObjectBatch, ObjectQuadrants, SceneRenderModel};
use crate::render::shader::{ShaderFeatures, ShaderVariant};
use crate::scene::visibility::VisibilityFlags;

/// Draw routine for non-instanced object batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRoutine {
    /// Plain textured (also covers specular variants)
    Plain,
    /// Colour plus tangent-space normal texture
    NormalMapped,
    /// Time-animated vertices
    Waves,
    /// View-dependent sparkle, uploads the camera position per draw
    Glitter,
}

/// Walks the scene model and issues draw calls for the active pipeline
pub struct RenderDispatcher {
    variants: Vec<Option<ShaderVariant>>,
    sky_shader: ShaderVariant,
    object_routines: Vec<Option<ObjectRoutine>>,
    directional: bool,

    previous_shader: Option<usize>,
    view_matrix: Mat4,
    camera_position: Vec3,
    visibility: Vec<VisibilityFlags>,
    scene_model: SceneRenderModel,

    triangle_count: u64,
    started: Instant,
}

impl RenderDispatcher {
    /// Assemble a dispatcher over realized variants.
    ///
    /// The draw routine for each index is selected here, once, from the
    /// needed-features table; feature combinations no routine covers are
    /// logged and left undrawable.
    pub fn new(
        variants: Vec<Option<ShaderVariant>>,
        sky_shader: ShaderVariant,
        needed_features: &BTreeMap<usize, ShaderFeatures>,
        directional: bool,
        scene_model: SceneRenderModel,
    ) -> Self {
        let mut object_routines = vec![None; variants.len()];

        for (&index, &flags) in needed_features {
            if index >= object_routines.len() {
                continue;
            }

            let mut routine = None;
            if flags.intersects(
                ShaderFeatures::DIRECTIONAL_LIGHT
                    | ShaderFeatures::POINT_LIGHT
                    | ShaderFeatures::SPECULAR,
            ) {
                routine = Some(ObjectRoutine::Plain);
            }
            if flags.contains(ShaderFeatures::NORMAL_MAP) {
                routine = Some(ObjectRoutine::NormalMapped);
            }
            if flags.contains(ShaderFeatures::SMALL_WAVES) {
                routine = Some(ObjectRoutine::Waves);
            }
            if flags.contains(ShaderFeatures::GLITTER) {
                routine = Some(ObjectRoutine::Glitter);
            }

            // Instanced variants are drawn by the particle walk and need no
            // object routine of their own.
            if routine.is_none() && !flags.contains(ShaderFeatures::INSTANCING) {
                error!("flag combination {flags:?} does not match any render method");
            }

            object_routines[index] = routine;
        }

        Self {
            variants,
            sky_shader,
            object_routines,
            directional,
            previous_shader: None,
            view_matrix: Mat4::identity(),
            camera_position: Vec3::zeros(),
            visibility: Vec::new(),
            scene_model,
            triangle_count: 0,
            started: Instant::now(),
        }
    }

    /// Reset per-frame state: triangle counter and the program-bind elision
    pub fn begin_frame(&mut self) {
        self.triangle_count = 0;
        self.previous_shader = None;
    }

    /// Force the next batch to rebind its program.
    ///
    /// Called after anything binds a program behind the dispatcher's back.
    pub fn reset_program_binding(&mut self) {
        self.previous_shader = None;
    }

    /// Draw all visible opaque objects, particles and terrain
    pub fn render_opaque(&mut self, device: &mut dyn GraphicsDevice) {
        self.render_object_quadrants(device, false);
        self.render_particles(device);
        self.render_terrain(device);
    }

    /// Draw all visible transparent objects; no-op without transparent
    /// batches in the scene
    pub fn render_transparent(&mut self, device: &mut dyn GraphicsDevice) {
        self.render_object_quadrants(device, true);
    }

    fn render_object_quadrants(&mut self, device: &mut dyn GraphicsDevice, transparent: bool) {
        let Self {
            variants,
            object_routines,
            directional,
            previous_shader,
            view_matrix,
            camera_position,
            visibility,
            scene_model,
            triangle_count,
            started,
            ..
        } = self;

        let objects: &[ObjectQuadrants] = if transparent {
            match &scene_model.transparent_objects {
                Some(objects) => objects,
                None => return,
            }
        } else {
            &scene_model.opaque_objects
        };

        let chunk_count = objects.len().min(visibility.len());
        for chunk_index in 0..chunk_count {
            let flags = visibility[chunk_index];
            if !flags.chunk_visible {
                continue;
            }

            for quadrant in 0..4 {
                if !flags.quadrant_visible(quadrant) {
                    continue;
                }

                for batch in &objects[chunk_index].quadrants[quadrant] {
                    let Some(routine) = object_routines
                        .get(batch.shader_index)
                        .copied()
                        .flatten()
                    else {
                        continue;
                    };
                    let Some(variant) =
                        variants.get(batch.shader_index).and_then(Option::as_ref)
                    else {
                        continue;
                    };

                    if *previous_shader != Some(batch.shader_index) {
                        device.use_program(variant.program);
                        *previous_shader = Some(batch.shader_index);
                    }
                    // View matrix is shared by objects, terrain and particles
                    device.set_uniform_mat4_opt(variant.uniforms.view, view_matrix);

                    draw_instances(
                        device,
                        variant,
                        batch,
                        routine,
                        *directional,
                        camera_position,
                        started,
                        triangle_count,
                    );
                }
            }
        }
    }

    fn render_particles(&mut self, device: &mut dyn GraphicsDevice) {
        let Self {
            variants,
            previous_shader,
            view_matrix,
            visibility,
            scene_model,
            triangle_count,
            ..
        } = self;

        let chunk_count = scene_model.particles.len().min(visibility.len());
        for chunk_index in 0..chunk_count {
            let flags = visibility[chunk_index];
            if !flags.chunk_visible {
                continue;
            }

            for quadrant in 0..4 {
                if !flags.quadrant_visible(quadrant) {
                    continue;
                }

                for batch in &scene_model.particles[chunk_index].quadrants[quadrant] {
                    let Some(variant) =
                        variants.get(batch.shader_index).and_then(Option::as_ref)
                    else {
                        continue;
                    };

                    if *previous_shader != Some(batch.shader_index) {
                        device.use_program(variant.program);
                        *previous_shader = Some(batch.shader_index);
                    }
                    device.set_uniform_mat4_opt(variant.uniforms.view, view_matrix);

                    let mesh = &batch.particles.object;
                    device.bind_vertex_array(mesh.vao);
                    device.bind_texture(0, mesh.texture);
                    device.set_uniform_i32_opt(variant.uniforms.colour_texture, 0);

                    device.set_uniform_mat4_opt(variant.uniforms.model, &batch.placement);
                    // Rotation is defined per particle in the instancing buffers
                    device.set_uniform_mat3_opt(variant.uniforms.rotation, &Mat3::identity());

                    device
                        .draw_triangles_instanced(mesh.vertex_count, batch.particles.particle_count);
                    *triangle_count += u64::from(mesh.vertex_count / 3)
                        * u64::from(batch.particles.particle_count);
                }
            }
        }
    }

    fn render_terrain(&mut self, device: &mut dyn GraphicsDevice) {
        let Self {
            variants,
            directional,
            previous_shader,
            view_matrix,
            visibility,
            scene_model,
            triangle_count,
            ..
        } = self;

        // All terrain in a scene uses one shader; a scene always has at
        // least one chunk.
        let Some(first) = scene_model.terrain.first() else {
            return;
        };
        let shader_index = first.shader_index;
        let Some(variant) = variants.get(shader_index).and_then(Option::as_ref) else {
            return;
        };

        device.use_program(variant.program);
        device.set_uniform_mat4_opt(variant.uniforms.view, view_matrix);
        *previous_shader = Some(shader_index);

        let chunk_count = scene_model.terrain.len().min(visibility.len());
        for chunk_index in 0..chunk_count {
            if !visibility[chunk_index].chunk_visible {
                continue;
            }

            let entry = &scene_model.terrain[chunk_index];
            device.bind_vertex_array(entry.mesh.vao);
            device.bind_texture(0, entry.mesh.texture);
            device.set_uniform_i32_opt(variant.uniforms.colour_texture, 0);

            device.set_uniform_mat4_opt(variant.uniforms.model, &entry.model);
            if *directional {
                // No rotation support for terrain
                device.set_uniform_mat3_opt(variant.uniforms.rotation, &Mat3::identity());
            }

            device.draw_triangle_strip(entry.mesh.vertex_count);
            *triangle_count += u64::from(entry.mesh.vertex_count / 3);
        }
    }

    /// Draw the sky dome centered on the camera.
    ///
    /// The caller is responsible for disabling depth writes around this and
    /// resetting the program binding afterwards.
    pub fn draw_sky(&mut self, device: &mut dyn GraphicsDevice) {
        device.use_program(self.sky_shader.program);
        device.set_uniform_mat4_opt(self.sky_shader.uniforms.view, &self.view_matrix);

        let sky = &self.scene_model.sky;
        device.bind_vertex_array(sky.vao);
        device.bind_texture(0, sky.texture);
        device.set_uniform_i32_opt(self.sky_shader.uniforms.colour_texture, 0);

        let model = Translation3::from(self.camera_position).to_homogeneous();
        device.set_uniform_mat4_opt(self.sky_shader.uniforms.model, &model);

        device.draw_triangles(sky.vertex_count);
        self.triangle_count += u64::from(sky.vertex_count / 3);
    }

    /// Push a new light direction to every directional variant and force a
    /// program rebind on the next draw
    pub fn set_light_direction(&mut self, device: &mut dyn GraphicsDevice, direction: Vec3) {
        for variant in self.variants.iter().flatten() {
            if !variant.is_directional_light {
                continue;
            }
            device.use_program(variant.program);
            device.set_uniform_vec3_opt(variant.uniforms.light_direction, &direction);
        }

        self.previous_shader = None;
    }

    /// Push a new diffuse light colour to every directional variant
    pub fn set_diffuse_light_colour(&mut self, device: &mut dyn GraphicsDevice, colour: Vec3) {
        for variant in self.variants.iter().flatten() {
            if !variant.is_directional_light {
                continue;
            }
            device.use_program(variant.program);
            device.set_uniform_vec3_opt(variant.uniforms.diffuse_light_colour, &colour);
        }

        self.previous_shader = None;
    }

    /// Push a new ambient light colour to every directional variant
    pub fn set_ambient_light_colour(&mut self, device: &mut dyn GraphicsDevice, colour: Vec3) {
        for variant in self.variants.iter().flatten() {
            if !variant.is_directional_light {
                continue;
            }
            device.use_program(variant.program);
            device.set_uniform_vec3_opt(variant.uniforms.ambient_light_colour, &colour);
        }

        self.previous_shader = None;
    }

    /// Replace the view matrix used by subsequent draws
    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view_matrix = view;
    }

    /// The view matrix shared by every pass of the current frame
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Replace the camera position used by sky and glitter draws
    pub fn set_camera_position(&mut self, position: Vec3) {
        self.camera_position = position;
    }

    /// Replace the per-chunk visibility flags
    pub fn set_visibility(&mut self, visibility: Vec<VisibilityFlags>) {
        self.visibility = visibility;
    }

    /// Triangles drawn since the last [`Self::begin_frame`]
    pub fn drawn_triangle_count(&self) -> u64 {
        self.triangle_count
    }

    /// The scene model being rendered
    pub fn scene_model(&self) -> &SceneRenderModel {
        &self.scene_model
    }

    /// Mutable access for editor-driven rebuilds between frames
    pub fn scene_model_mut(&mut self) -> &mut SceneRenderModel {
        &mut self.scene_model
    }
}

/// Issue one draw per instance of a batch with the routine's extra uniforms
fn draw_instances(
    device: &mut dyn GraphicsDevice,
    variant: &ShaderVariant,
    batch: &ObjectBatch,
    routine: ObjectRoutine,
    directional: bool,
    camera_position: &Vec3,
    started: &Instant,
    triangle_count: &mut u64,
) {
    device.bind_vertex_array(batch.mesh.vao);
    device.bind_texture(0, batch.mesh.texture);
    device.set_uniform_i32_opt(variant.uniforms.colour_texture, 0);

    match routine {
        ObjectRoutine::NormalMapped => {
            if let Some(normal_texture) = batch.mesh.normal_texture {
                device.bind_texture(1, normal_texture);
            }
            device.set_uniform_i32_opt(variant.uniforms.normal_texture, 1);
        }
        ObjectRoutine::Waves => {
            device.set_uniform_f32_opt(variant.uniforms.time, started.elapsed().as_secs_f32());
        }
        ObjectRoutine::Plain | ObjectRoutine::Glitter => {}
    }

    for i in 0..batch.instance_count() {
        device.set_uniform_mat4_opt(variant.uniforms.model, &batch.placements[i]);
        if directional {
            device.set_uniform_mat3_opt(variant.uniforms.rotation, &batch.rotations[i]);
        }
        if routine == ObjectRoutine::Glitter {
            device.set_uniform_vec3_opt(variant.uniforms.camera_position, camera_position);
        }

        device.draw_triangles(batch.mesh.vertex_count);
        *triangle_count += u64::from(batch.mesh.vertex_count / 3);
    }
}
