//! Pipeline and compositor assembly
//!
//! After the scene model reserves its shader indices, the builder realizes
//! every variant, resolves the uniform locations each feature bit needs,
//! uploads the static uniforms (projection, light, fog, glitter alpha) and
//! assembles the forward or deferred pipeline, for the latter including
//! the light-pass programs, the stencil machinery and the light sphere.

use log::{error, info};

use crate::assets::{MeshHandles, ObjectSource};
use crate::config::RendererConfig;
use crate::foundation::math::{compute_bounding_sphere_radius, deg_to_rad, Mat4, Vec2, Vec3, Vec4};
use crate::render::compositor::Compositor;
use crate::render::device::GraphicsDevice;
use crate::render::dispatch::RenderDispatcher;
use crate::render::pipeline::deferred::{DeferredPipeline, PointLightPasses, GEOMETRY_TARGETS};
use crate::render::pipeline::{ForwardPipeline, ScenePipeline};
use crate::render::scene_model::SceneRenderModel;
use crate::render::shader::{
    PostEffects, ShaderFeatures, ShaderSourceProvider, ShaderVariant, ShaderVariantRegistry,
};
use crate::render::RenderResult;
use crate::scene::{Fog, LightSource};

const SHADER_NAME_SKY: &str = "sky";
const DIRECTIONAL_LIGHT_PASS_SHADER_NAME: &str = "directional-light-pass";
const DIRECTIONAL_FOG_LIGHT_PASS_SHADER_NAME: &str = "directional-fog-light-pass";
const STENCIL_PASS_SHADER_NAME: &str = "stencil";
const POINT_LIGHT_PASS_SHADER_NAME: &str = "point-light-pass";

const OBJECT_LIGHT_SPHERE_NAME: &str = "light-sphere";

// Common part
const COLOUR_TEXTURE_UNIFORM_NAME: &str = "colourTexture";

// 3D shaders
const MODEL_UNIFORM_NAME: &str = "model";
const VIEW_UNIFORM_NAME: &str = "view";
const PROJECTION_UNIFORM_NAME: &str = "projection";

// Directional light only
const ROTATION_UNIFORM_NAME: &str = "rotation";
const LIGHT_DIRECTION_UNIFORM_NAME: &str = "lightDirection";
const LIGHT_DIFFUSE_COLOUR_UNIFORM_NAME: &str = "diffuseLightColour";
const LIGHT_AMBIENT_COLOUR_UNIFORM_NAME: &str = "ambientLightColour";

// Point light only
const LIGHT_POSITION_WORLDSPACE_UNIFORM_NAME: &str = "lightPositionWld";

// Shader-specific
const NORMAL_TEXTURE_UNIFORM_NAME: &str = "normalTexture";
const TIME_UNIFORM_NAME: &str = "time";
const CAMERA_POSITION_UNIFORM_NAME: &str = "cameraPosition";
const MATERIAL_ALPHA_UNIFORM_NAME: &str = "materialAlpha";
const FOG_DENSITY_UNIFORM_NAME: &str = "fogDensity";
const FOG_COLOUR_UNIFORM_NAME: &str = "fogColour";

// Deferred shaders
const POSITION_COMPONENT_UNIFORM_NAME: &str = "positionComponent";
const NORMAL_COMPONENT_UNIFORM_NAME: &str = "normalComponent";
const DIFFUSE_COMPONENT_UNIFORM_NAME: &str = "diffuseComponent";
const SCREEN_SIZE_UNIFORM_NAME: &str = "screenSize";
const LIGHT_PARAMETERS_UNIFORM_NAME: &str = "lightParameters";

// Post-processing
const RENDERED_TEXTURE_UNIFORM_NAME: &str = "renderedTexture";
const SCREEN_RATIO_UNIFORM_NAME: &str = "screenRatio";
const SCREEN_WIDTH_HEIGHT_UNIFORM_NAME: &str = "screenWidthHeight";

const LIGHT_DIFFUSE_COLOUR_DEFAULT: Vec3 = Vec3::new(1.0, 1.0, 1.0);
const LIGHT_AMBIENT_COLOUR_DEFAULT: Vec3 = Vec3::new(1.0, 1.0, 1.0);
/// Diffuse contribution is carried by the point light while it is active
const LIGHT_DIFFUSE_NIGHT_COLOUR: Vec3 = Vec3::new(0.0, 0.0, 0.0);

/// Realize all reserved shader variants and assemble the pipeline the scene
/// asks for. The scene model must have reserved its indices already.
pub fn build_scene_pipeline(
    device: &mut dyn GraphicsDevice,
    sources: &mut dyn ShaderSourceProvider,
    registry: &mut ShaderVariantRegistry,
    objects: &mut dyn ObjectSource,
    config: &RendererConfig,
    light: &LightSource,
    fog: &Fog,
    is_deferred: bool,
    scene_model: SceneRenderModel,
) -> RenderResult<Box<dyn ScenePipeline>> {
    let projection = Mat4::new_perspective(
        config.screen_ratio(),
        deg_to_rad(config.fov_degrees),
        config.near_clip,
        config.far_clip,
    );

    let realized = registry.realize_all(device, sources);
    let needed: Vec<(usize, ShaderFeatures)> = registry
        .needed_features()
        .iter()
        .map(|(&index, &flags)| (index, flags))
        .collect();

    for (index, flags) in needed {
        let Some(key) = realized[index] else {
            continue;
        };

        let variant = registry.variant_mut(key);
        device.use_program(variant.program);

        variant.uniforms.colour_texture =
            device.uniform_location(variant.program, COLOUR_TEXTURE_UNIFORM_NAME);

        if flags.contains(ShaderFeatures::DIRECTIONAL_LIGHT) {
            setup_directional_uniforms(device, variant, &projection, light);
        }
        if flags.contains(ShaderFeatures::POINT_LIGHT) {
            setup_point_uniforms(device, variant, &projection, light);
        }
        if flags.contains(ShaderFeatures::NORMAL_MAP) {
            variant.uniforms.normal_texture =
                device.uniform_location(variant.program, NORMAL_TEXTURE_UNIFORM_NAME);
        }
        if flags.contains(ShaderFeatures::SMALL_WAVES) {
            variant.uniforms.time = device.uniform_location(variant.program, TIME_UNIFORM_NAME);
        }
        if flags.contains(ShaderFeatures::GLITTER) {
            setup_glitter_uniforms(device, variant, config.glitter_material_alpha);
        }
        if flags.contains(ShaderFeatures::FOG) {
            setup_fog_uniforms(device, variant, fog, config.fog_density);
        }
    }

    let sky_shader = match registry.resolve_or_compile(device, sources, SHADER_NAME_SKY) {
        Ok(key) => {
            let variant = registry.variant_mut(key);
            device.use_program(variant.program);
            setup_sky_uniforms(device, variant, &projection);
            variant.clone()
        }
        Err(err) => {
            error!("cannot create shader \"{SHADER_NAME_SKY}\": {err}");
            ShaderVariant::default()
        }
    };

    let variants: Vec<Option<ShaderVariant>> = realized
        .iter()
        .map(|key| key.map(|key| registry.variant(key).clone()))
        .collect();

    let dispatcher = RenderDispatcher::new(
        variants,
        sky_shader,
        registry.needed_features(),
        light.is_directional(),
        scene_model,
    );

    if !is_deferred {
        info!("initializing forward renderer");
        return Ok(Box::new(ForwardPipeline::new(dispatcher)));
    }

    info!("initializing deferred renderer");

    let light_pass_name = if fog.enabled {
        DIRECTIONAL_FOG_LIGHT_PASS_SHADER_NAME
    } else {
        DIRECTIONAL_LIGHT_PASS_SHADER_NAME
    };
    let directional_light_pass =
        match registry.resolve_or_compile(device, sources, light_pass_name) {
            Ok(key) => {
                let variant = registry.variant_mut(key);
                device.use_program(variant.program);
                if light.is_directional() {
                    setup_deferred_directional_light_pass_uniforms(
                        device, variant, fog, config, light,
                    );
                } else {
                    setup_deferred_point_light_pass_uniforms(
                        device, variant, &projection, config, light,
                    );
                }
                variant.clone()
            }
            Err(err) => {
                error!("cannot create shader \"{light_pass_name}\": {err}");
                ShaderVariant::default()
            }
        };

    let point_light = if light.is_directional() {
        None
    } else {
        let light_sphere = objects
            .rendering_data(OBJECT_LIGHT_SPHERE_NAME)
            .unwrap_or_else(|| {
                error!("light sphere mesh isn't found");
                MeshHandles::default()
            });

        let stencil_pass =
            match registry.resolve_or_compile(device, sources, STENCIL_PASS_SHADER_NAME) {
                Ok(key) => {
                    let variant = registry.variant_mut(key);
                    device.use_program(variant.program);
                    setup_stencil_uniforms(device, variant, &projection);
                    variant.clone()
                }
                Err(err) => {
                    error!("cannot create shader \"{STENCIL_PASS_SHADER_NAME}\": {err}");
                    ShaderVariant::default()
                }
            };

        let light_pass =
            match registry.resolve_or_compile(device, sources, POINT_LIGHT_PASS_SHADER_NAME) {
                Ok(key) => {
                    let variant = registry.variant_mut(key);
                    device.use_program(variant.program);
                    setup_deferred_point_light_pass_uniforms(
                        device, variant, &projection, config, light,
                    );
                    variant.clone()
                }
                Err(err) => {
                    error!("cannot create shader \"{POINT_LIGHT_PASS_SHADER_NAME}\": {err}");
                    ShaderVariant::default()
                }
            };

        Some(PointLightPasses {
            stencil_pass,
            light_pass,
            light_sphere,
            light_position: light.coordinates,
            light_power: config.point_light_power,
        })
    };

    let geometry_buffer =
        device.create_offscreen_target(config.screen_width, config.screen_height, GEOMETRY_TARGETS)?;
    let quad_vao = device.create_fullscreen_quad()?;

    let mut pipeline = DeferredPipeline::new(
        dispatcher,
        geometry_buffer,
        quad_vao,
        config.screen_width,
        config.screen_height,
        fog.enabled,
        directional_light_pass,
        point_light,
    );

    if !light.is_directional() {
        // Only the ambient component carries while the point light shades
        pipeline.set_diffuse_light_colour(device, LIGHT_DIFFUSE_NIGHT_COLOUR);
    }

    Ok(Box::new(pipeline))
}

/// Build the post-processing stage for a named effect
pub fn build_compositor(
    device: &mut dyn GraphicsDevice,
    sources: &mut dyn ShaderSourceProvider,
    registry: &mut ShaderVariantRegistry,
    config: &RendererConfig,
    effect: &str,
) -> RenderResult<Compositor> {
    let key = registry.post_effect_variant(device, sources, effect)?;
    let flags = registry.post_effect_flags(effect);

    let variant = registry.variant_mut(key);
    device.use_program(variant.program);

    variant.uniforms.colour_texture =
        device.uniform_location(variant.program, RENDERED_TEXTURE_UNIFORM_NAME);

    if flags.intersects(PostEffects::VIGNETTE | PostEffects::DROPS_ON_LENS) {
        variant.uniforms.screen_ratio =
            device.uniform_location(variant.program, SCREEN_RATIO_UNIFORM_NAME);
        device.set_uniform_f32_opt(variant.uniforms.screen_ratio, config.screen_ratio());
    }

    if flags.contains(PostEffects::EMBOSS) {
        variant.uniforms.screen_size =
            device.uniform_location(variant.program, SCREEN_WIDTH_HEIGHT_UNIFORM_NAME);
        device.set_uniform_vec2_opt(
            variant.uniforms.screen_size,
            &Vec2::new(config.screen_width as f32, config.screen_height as f32),
        );
    }

    let shader = variant.clone();
    let target = device.create_offscreen_target(config.screen_width, config.screen_height, 1)?;
    let quad_vao = device.create_fullscreen_quad()?;

    Ok(Compositor::new(
        shader,
        quad_vao,
        target,
        config.screen_width,
        config.screen_height,
    ))
}

fn setup_directional_uniforms(
    device: &mut dyn GraphicsDevice,
    variant: &mut ShaderVariant,
    projection: &Mat4,
    light: &LightSource,
) {
    let program = variant.program;
    variant.uniforms.model = device.uniform_location(program, MODEL_UNIFORM_NAME);
    variant.uniforms.view = device.uniform_location(program, VIEW_UNIFORM_NAME);
    variant.uniforms.projection = device.uniform_location(program, PROJECTION_UNIFORM_NAME);
    variant.uniforms.rotation = device.uniform_location(program, ROTATION_UNIFORM_NAME);
    variant.uniforms.light_direction =
        device.uniform_location(program, LIGHT_DIRECTION_UNIFORM_NAME);
    variant.uniforms.diffuse_light_colour =
        device.uniform_location(program, LIGHT_DIFFUSE_COLOUR_UNIFORM_NAME);
    variant.uniforms.ambient_light_colour =
        device.uniform_location(program, LIGHT_AMBIENT_COLOUR_UNIFORM_NAME);

    device.set_uniform_mat4_opt(variant.uniforms.projection, projection);
    device.set_uniform_vec3_opt(variant.uniforms.light_direction, &light.coordinates);
    device.set_uniform_vec3_opt(
        variant.uniforms.diffuse_light_colour,
        &LIGHT_DIFFUSE_COLOUR_DEFAULT,
    );
    device.set_uniform_vec3_opt(
        variant.uniforms.ambient_light_colour,
        &LIGHT_AMBIENT_COLOUR_DEFAULT,
    );

    variant.is_directional_light = true;
}

fn setup_point_uniforms(
    device: &mut dyn GraphicsDevice,
    variant: &mut ShaderVariant,
    projection: &Mat4,
    light: &LightSource,
) {
    let program = variant.program;
    variant.uniforms.model = device.uniform_location(program, MODEL_UNIFORM_NAME);
    variant.uniforms.view = device.uniform_location(program, VIEW_UNIFORM_NAME);
    variant.uniforms.projection = device.uniform_location(program, PROJECTION_UNIFORM_NAME);
    variant.uniforms.light_position =
        device.uniform_location(program, LIGHT_POSITION_WORLDSPACE_UNIFORM_NAME);

    device.set_uniform_mat4_opt(variant.uniforms.projection, projection);
    device.set_uniform_vec3_opt(variant.uniforms.light_position, &light.coordinates);
}

fn setup_glitter_uniforms(
    device: &mut dyn GraphicsDevice,
    variant: &mut ShaderVariant,
    material_alpha: [f32; 2],
) {
    let program = variant.program;
    variant.uniforms.camera_position =
        device.uniform_location(program, CAMERA_POSITION_UNIFORM_NAME);
    variant.uniforms.material_alpha =
        device.uniform_location(program, MATERIAL_ALPHA_UNIFORM_NAME);

    device.set_uniform_vec2_opt(
        variant.uniforms.material_alpha,
        &Vec2::new(material_alpha[0], material_alpha[1]),
    );
}

fn setup_fog_uniforms(
    device: &mut dyn GraphicsDevice,
    variant: &mut ShaderVariant,
    fog: &Fog,
    fog_density: f32,
) {
    let program = variant.program;
    variant.uniforms.fog_density = device.uniform_location(program, FOG_DENSITY_UNIFORM_NAME);
    variant.uniforms.fog_colour = device.uniform_location(program, FOG_COLOUR_UNIFORM_NAME);

    device.set_uniform_f32_opt(variant.uniforms.fog_density, fog_density);
    let colour = Vec4::new(
        f32::from(fog.red) / 255.0,
        f32::from(fog.green) / 255.0,
        f32::from(fog.blue) / 255.0,
        1.0,
    );
    device.set_uniform_vec4_opt(variant.uniforms.fog_colour, &colour);
}

fn setup_sky_uniforms(
    device: &mut dyn GraphicsDevice,
    variant: &mut ShaderVariant,
    projection: &Mat4,
) {
    let program = variant.program;
    variant.uniforms.colour_texture =
        device.uniform_location(program, COLOUR_TEXTURE_UNIFORM_NAME);
    variant.uniforms.model = device.uniform_location(program, MODEL_UNIFORM_NAME);
    variant.uniforms.view = device.uniform_location(program, VIEW_UNIFORM_NAME);
    variant.uniforms.projection = device.uniform_location(program, PROJECTION_UNIFORM_NAME);

    device.set_uniform_mat4_opt(variant.uniforms.projection, projection);
}

fn setup_stencil_uniforms(
    device: &mut dyn GraphicsDevice,
    variant: &mut ShaderVariant,
    projection: &Mat4,
) {
    let program = variant.program;
    variant.uniforms.model = device.uniform_location(program, MODEL_UNIFORM_NAME);
    variant.uniforms.view = device.uniform_location(program, VIEW_UNIFORM_NAME);
    variant.uniforms.projection = device.uniform_location(program, PROJECTION_UNIFORM_NAME);

    device.set_uniform_mat4_opt(variant.uniforms.projection, projection);
}

fn setup_deferred_directional_light_pass_uniforms(
    device: &mut dyn GraphicsDevice,
    variant: &mut ShaderVariant,
    fog: &Fog,
    config: &RendererConfig,
    light: &LightSource,
) {
    let program = variant.program;
    variant.uniforms.light_direction =
        device.uniform_location(program, LIGHT_DIRECTION_UNIFORM_NAME);
    variant.uniforms.diffuse_light_colour =
        device.uniform_location(program, LIGHT_DIFFUSE_COLOUR_UNIFORM_NAME);
    variant.uniforms.ambient_light_colour =
        device.uniform_location(program, LIGHT_AMBIENT_COLOUR_UNIFORM_NAME);

    if fog.enabled {
        variant.uniforms.view = device.uniform_location(program, VIEW_UNIFORM_NAME);
        variant.uniforms.position_component =
            device.uniform_location(program, POSITION_COMPONENT_UNIFORM_NAME);
        setup_fog_uniforms(device, variant, fog, config.fog_density);
    }

    variant.uniforms.normal_component =
        device.uniform_location(program, NORMAL_COMPONENT_UNIFORM_NAME);
    variant.uniforms.diffuse_component =
        device.uniform_location(program, DIFFUSE_COMPONENT_UNIFORM_NAME);

    device.set_uniform_vec3_opt(variant.uniforms.light_direction, &light.coordinates);
    device.set_uniform_vec3_opt(
        variant.uniforms.diffuse_light_colour,
        &LIGHT_DIFFUSE_COLOUR_DEFAULT,
    );
    device.set_uniform_vec3_opt(
        variant.uniforms.ambient_light_colour,
        &LIGHT_AMBIENT_COLOUR_DEFAULT,
    );

    variant.is_directional_light = true;
}

fn setup_deferred_point_light_pass_uniforms(
    device: &mut dyn GraphicsDevice,
    variant: &mut ShaderVariant,
    projection: &Mat4,
    config: &RendererConfig,
    light: &LightSource,
) {
    let program = variant.program;
    variant.uniforms.model = device.uniform_location(program, MODEL_UNIFORM_NAME);
    variant.uniforms.view = device.uniform_location(program, VIEW_UNIFORM_NAME);
    variant.uniforms.projection = device.uniform_location(program, PROJECTION_UNIFORM_NAME);
    variant.uniforms.light_position =
        device.uniform_location(program, LIGHT_POSITION_WORLDSPACE_UNIFORM_NAME);
    variant.uniforms.diffuse_light_colour =
        device.uniform_location(program, LIGHT_DIFFUSE_COLOUR_UNIFORM_NAME);
    variant.uniforms.ambient_light_colour =
        device.uniform_location(program, LIGHT_AMBIENT_COLOUR_UNIFORM_NAME);
    variant.uniforms.position_component =
        device.uniform_location(program, POSITION_COMPONENT_UNIFORM_NAME);
    variant.uniforms.normal_component =
        device.uniform_location(program, NORMAL_COMPONENT_UNIFORM_NAME);
    variant.uniforms.diffuse_component =
        device.uniform_location(program, DIFFUSE_COMPONENT_UNIFORM_NAME);
    variant.uniforms.screen_size = device.uniform_location(program, SCREEN_SIZE_UNIFORM_NAME);
    variant.uniforms.light_parameters =
        device.uniform_location(program, LIGHT_PARAMETERS_UNIFORM_NAME);

    device.set_uniform_mat4_opt(variant.uniforms.projection, projection);

    device.set_uniform_vec2_opt(
        variant.uniforms.screen_size,
        &Vec2::new(config.screen_width as f32, config.screen_height as f32),
    );

    let radius = compute_bounding_sphere_radius(config.point_light_power);
    device.set_uniform_vec2_opt(
        variant.uniforms.light_parameters,
        &Vec2::new(config.point_light_power, radius),
    );

    device.set_uniform_vec3_opt(variant.uniforms.light_position, &light.coordinates);
    device.set_uniform_vec3_opt(
        variant.uniforms.diffuse_light_colour,
        &LIGHT_DIFFUSE_COLOUR_DEFAULT,
    );
    device.set_uniform_vec3_opt(
        variant.uniforms.ambient_light_colour,
        &LIGHT_AMBIENT_COLOUR_DEFAULT,
    );

    variant.is_directional_light = false;
}
