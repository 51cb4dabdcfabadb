//! Instance placement generation
//!
//! Scatters object instances uniformly over a disc, sampling the terrain
//! height under each point. Callers supply the RNG so generation stays
//! deterministic under test.

use rand::Rng;

use crate::assets::TerrainSource;
use crate::foundation::math::Vec3;
use crate::scene::ChunkData;

/// Number of instances a disc of `radius` holds at `density` per square unit
pub fn disc_instance_count(density: f32, radius: f32) -> usize {
    let amount = (std::f32::consts::PI * radius * radius * density) as usize;
    amount.max(1)
}

fn disc_point(radius: f32, rng: &mut impl Rng) -> (f32, f32) {
    let angle = rng.random_range(0.0..std::f32::consts::TAU);
    // sqrt keeps the area density uniform
    let distance = radius * rng.random_range(0.0_f32..1.0).sqrt();

    (distance * angle.cos(), distance * angle.sin())
}

/// Generate world-space x/y/z triples on a disc around `center`
pub fn generate_absolute_positions(
    density: f32,
    center: Vec3,
    radius: f32,
    terrain: &mut dyn TerrainSource,
    chunk: &ChunkData,
    rng: &mut impl Rng,
) -> Vec<f32> {
    let amount = disc_instance_count(density, radius);
    let mut positions = Vec::with_capacity(amount * 3);

    for _ in 0..amount {
        let (dx, dz) = disc_point(radius, rng);
        let x = center.x + dx;
        let z = center.z + dz;
        let y = terrain.height(chunk.x, chunk.z, &chunk.name, x, z);

        positions.push(x);
        positions.push(y);
        positions.push(z);
    }

    positions
}

/// Generate x/y/z triples relative to `center`, heights still sampled in
/// world space. Used for particle groups placed by a single group matrix.
pub fn generate_relative_positions(
    density: f32,
    center: Vec3,
    radius: f32,
    terrain: &mut dyn TerrainSource,
    chunk: &ChunkData,
    rng: &mut impl Rng,
) -> Vec<f32> {
    let amount = disc_instance_count(density, radius);
    let mut positions = Vec::with_capacity(amount * 3);

    for _ in 0..amount {
        let (dx, dz) = disc_point(radius, rng);
        let y = terrain.height(chunk.x, chunk.z, &chunk.name, center.x + dx, center.z + dz);

        positions.push(dx);
        positions.push(y);
        positions.push(dz);
    }

    positions
}
