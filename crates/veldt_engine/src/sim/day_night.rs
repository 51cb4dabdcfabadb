//! Mapping simulation snapshots onto scene lighting
//!
//! The sun slerps between its sunrise and sunset directions with a sine
//! height profile; diffuse colour blends through the golden hours and goes
//! black at night, while the ambient colour fades through the twilights.

use crate::foundation::math::{mix, slerp, smoothstep, Vec3};
use crate::render::device::GraphicsDevice;
use crate::render::frame::FrameRenderer;
use crate::scene::LightSource;
use crate::sim::{take_update, SimulationModel, SimulationSnapshot};
use std::sync::Mutex;

const LIGHT_DIRECTION_SUNRISE: Vec3 = Vec3::new(-1.0, -0.05, -0.02);
const LIGHT_DIRECTION_SUNSET: Vec3 = Vec3::new(1.0, -0.05, -0.02);
/// Peak sun height, `[0, 1]` maps onto 0..90 degrees
const LIGHT_MAX_HEIGHT: f32 = 0.6;

const LIGHT_GOLDEN_HOUR_COLOUR: Vec3 = Vec3::new(1.0, 0.24, 0.0);
const LIGHT_DAY_COLOUR: Vec3 = Vec3::new(1.0, 1.0, 1.0);
/// Diffuse component is not used at night
const LIGHT_DIFFUSE_NIGHT_COLOUR: Vec3 = Vec3::new(0.0, 0.0, 0.0);

const LIGHT_AMBIENT_COLOUR_DARK: Vec3 = Vec3::new(0.6, 0.6, 0.6);
const LIGHT_AMBIENT_COLOUR_LIGHT: Vec3 = Vec3::new(1.0, 1.0, 1.0);

const GOLDEN_HOUR_MORNING_MIX_START: f32 = 0.3;
const GOLDEN_HOUR_MORNING_MIX_END: f32 = 1.0;
const GOLDEN_HOUR_EVENING_MIX_START: f32 = 0.0;
const GOLDEN_HOUR_EVENING_MIX_END: f32 = 0.7;

/// Light parameters derived from one snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingUpdate {
    /// New sun direction, daytime only
    pub direction: Option<Vec3>,
    /// New diffuse colour
    pub diffuse_colour: Vec3,
    /// New ambient colour, night only
    pub ambient_colour: Option<Vec3>,
}

/// Compute the light parameters a snapshot calls for
pub fn lighting_for_snapshot(snapshot: &SimulationSnapshot) -> LightingUpdate {
    if snapshot.is_day {
        let mut direction = slerp(
            LIGHT_DIRECTION_SUNRISE,
            LIGHT_DIRECTION_SUNSET,
            snapshot.sun_rays_interpolation,
        );
        direction.y = -(snapshot.sun_rays_interpolation * std::f32::consts::PI).sin()
            * LIGHT_MAX_HEIGHT;

        let diffuse_colour = if snapshot.is_morning_golden_hour {
            mix(
                LIGHT_GOLDEN_HOUR_COLOUR,
                LIGHT_DAY_COLOUR,
                smoothstep(
                    GOLDEN_HOUR_MORNING_MIX_START,
                    GOLDEN_HOUR_MORNING_MIX_END,
                    snapshot.golden_hour_interpolation,
                ),
            )
        } else if snapshot.is_evening_golden_hour {
            mix(
                LIGHT_DAY_COLOUR,
                LIGHT_GOLDEN_HOUR_COLOUR,
                smoothstep(
                    GOLDEN_HOUR_EVENING_MIX_START,
                    GOLDEN_HOUR_EVENING_MIX_END,
                    snapshot.golden_hour_interpolation,
                ),
            )
        } else {
            LIGHT_DAY_COLOUR
        };

        LightingUpdate {
            direction: Some(direction),
            diffuse_colour,
            ambient_colour: None,
        }
    } else {
        let ambient_colour = if snapshot.is_dawn_twilight {
            mix(
                LIGHT_AMBIENT_COLOUR_DARK,
                LIGHT_AMBIENT_COLOUR_LIGHT,
                snapshot.twilight_interpolation,
            )
        } else if snapshot.is_dusk_twilight {
            mix(
                LIGHT_AMBIENT_COLOUR_LIGHT,
                LIGHT_AMBIENT_COLOUR_DARK,
                snapshot.twilight_interpolation,
            )
        } else {
            LIGHT_AMBIENT_COLOUR_DARK
        };

        LightingUpdate {
            direction: None,
            diffuse_colour: LIGHT_DIFFUSE_NIGHT_COLOUR,
            ambient_colour: Some(ambient_colour),
        }
    }
}

/// Sample the shared model once and, if the worker published, apply the
/// resulting light changes. GPU calls happen after the lock is released.
pub fn process_simulation_changes(
    model: &Mutex<SimulationModel>,
    frame: &mut FrameRenderer,
    device: &mut dyn GraphicsDevice,
) {
    let Some(snapshot) = take_update(model) else {
        return;
    };

    let update = lighting_for_snapshot(&snapshot);

    if let Some(direction) = update.direction {
        frame.set_light_direction(device, direction);
    }
    frame.set_diffuse_light_colour(device, update.diffuse_colour);
    if let Some(ambient) = update.ambient_colour {
        frame.set_ambient_light_colour(device, ambient);
    }
}

/// Restore the scene's static lighting after the simulation stops
pub fn restore_light(
    frame: &mut FrameRenderer,
    device: &mut dyn GraphicsDevice,
    light: &LightSource,
) {
    frame.set_diffuse_light_colour(device, LIGHT_DAY_COLOUR);
    frame.set_ambient_light_colour(device, LIGHT_AMBIENT_COLOUR_LIGHT);
    frame.set_light_direction(device, light.coordinates);
}
