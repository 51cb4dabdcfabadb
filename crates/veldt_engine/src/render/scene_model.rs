//! GPU-ready scene representation
//!
//! [`SceneRenderModel`] flattens the scene description into per-chunk,
//! per-quadrant batch arrays the dispatcher can walk without any lookups:
//! one terrain entry per chunk, opaque object batches, an optional
//! transparent batch array (allocated only when the scene has at least one
//! transparent instance) and particle batches, plus the shared sky mesh.
//!
//! The model is rebuilt wholesale from the authoritative scene description
//! on every structural edit; terrain, particles and sky are immutable after
//! load and only the object arrays are recomputed.

use log::error;
use nalgebra::{Rotation3, Translation3};

use crate::assets::{MeshHandles, ObjectSource, ParticleHandles, ParticleSource, TerrainSource};
use crate::foundation::math::{deg_to_rad, Mat3, Mat4, Vec3};
use crate::render::shader::ShaderVariantRegistry;
use crate::scene::margins::{quadrant_of, ChunkMargins};
use crate::scene::{Scene, FLOATS_PER_INSTANCE};

/// Asset name of the shared sky mesh
const OBJECT_SKY_NAME: &str = "sky";

/// One terrain chunk ready to draw
#[derive(Debug, Clone, Default)]
pub struct TerrainEntry {
    /// Dense shader index
    pub shader_index: usize,
    /// Chunk mesh handles
    pub mesh: MeshHandles,
    /// Chunk placement matrix
    pub model: Mat4,
}

/// All instances of one object sharing a shader within one quadrant
#[derive(Debug, Clone)]
pub struct ObjectBatch {
    /// Dense shader index
    pub shader_index: usize,
    /// Object mesh handles
    pub mesh: MeshHandles,
    /// Per-instance world transforms
    pub placements: Vec<Mat4>,
    /// Per-instance rotation-only matrices, same length as `placements`
    pub rotations: Vec<Mat3>,
}

impl ObjectBatch {
    /// Number of instances in the batch
    pub fn instance_count(&self) -> usize {
        self.placements.len()
    }
}

/// One instanced particle group placed by a single group matrix
#[derive(Debug, Clone, Default)]
pub struct ParticleBatch {
    /// Dense shader index
    pub shader_index: usize,
    /// Instancing buffers and mesh handles
    pub particles: ParticleHandles,
    /// Placement of the whole group
    pub placement: Mat4,
}

/// Object batches of one chunk, one slot per quadrant
#[derive(Debug, Clone, Default)]
pub struct ObjectQuadrants {
    /// Batches per quadrant, stably partitioned by shader index
    pub quadrants: [Vec<ObjectBatch>; 4],
}

/// Particle batches of one chunk, one slot per quadrant
#[derive(Debug, Clone, Default)]
pub struct ParticleQuadrants {
    /// Batches per quadrant
    pub quadrants: [Vec<ParticleBatch>; 4],
}

/// The flattened, GPU-ready scene
#[derive(Debug, Default)]
pub struct SceneRenderModel {
    /// One entry per chunk
    pub terrain: Vec<TerrainEntry>,
    /// Opaque object batches per chunk
    pub opaque_objects: Vec<ObjectQuadrants>,
    /// Transparent object batches, `None` until a transparent instance exists
    pub transparent_objects: Option<Vec<ObjectQuadrants>>,
    /// Particle batches per chunk
    pub particles: Vec<ParticleQuadrants>,
    /// Shared sky mesh
    pub sky: MeshHandles,
}

impl SceneRenderModel {
    /// Number of chunks the model covers
    pub fn chunk_count(&self) -> usize {
        self.terrain.len()
    }

    /// Build the full model from a scene snapshot.
    ///
    /// Idempotent for the same snapshot: shader indices are reserved through
    /// the registry's first-seen-wins table, so repeated builds agree.
    pub fn build(
        scene: &Scene,
        is_deferred: bool,
        margins: &[ChunkMargins],
        registry: &mut ShaderVariantRegistry,
        objects: &mut dyn ObjectSource,
        terrain: &mut dyn TerrainSource,
        particles: &mut dyn ParticleSource,
    ) -> Self {
        let mut model = Self::default();

        model.arrange_terrain(scene, is_deferred, terrain, registry);
        model.arrange_objects(scene, is_deferred, margins, registry, objects);
        model.populate_particles(scene, is_deferred, margins, registry, objects, particles);
        model.create_sky(objects);

        model
    }

    /// Rebuild the opaque and transparent object arrays from the scene,
    /// leaving terrain, particles and sky untouched. Used after every
    /// editor mutation.
    pub fn rebuild_objects(
        &mut self,
        scene: &Scene,
        is_deferred: bool,
        margins: &[ChunkMargins],
        registry: &mut ShaderVariantRegistry,
        objects: &mut dyn ObjectSource,
    ) {
        self.arrange_objects(scene, is_deferred, margins, registry, objects);
    }

    fn arrange_terrain(
        &mut self,
        scene: &Scene,
        is_deferred: bool,
        terrain: &mut dyn TerrainSource,
        registry: &mut ShaderVariantRegistry,
    ) {
        self.terrain = scene
            .chunks
            .iter()
            .map(|chunk| {
                let model = Translation3::new(chunk.x, 0.0, chunk.z).to_homogeneous();

                let mesh = terrain.rendering_data(&chunk.name).unwrap_or_else(|| {
                    error!("chunk \"{}\" isn't found", chunk.name);
                    MeshHandles::default()
                });

                let shader_index = match registry.index_for_features(
                    &scene.terrain_texturing,
                    scene.fog.enabled,
                    is_deferred,
                ) {
                    Ok(index) => index,
                    Err(err) => {
                        error!("can't require shader for terrain: {err}");
                        0
                    }
                };

                TerrainEntry {
                    shader_index,
                    mesh,
                    model,
                }
            })
            .collect();
    }

    fn arrange_objects(
        &mut self,
        scene: &Scene,
        is_deferred: bool,
        margins: &[ChunkMargins],
        registry: &mut ShaderVariantRegistry,
        objects: &mut dyn ObjectSource,
    ) {
        let chunk_count = scene.chunks.len();
        let mut opaque = vec![ObjectQuadrants::default(); chunk_count];
        let mut transparent: Option<Vec<ObjectQuadrants>> = None;

        for (chunk_index, groups) in scene.instances.iter().enumerate() {
            for group in groups {
                // Classify every instance of the group into its quadrant
                let mut placements: [Vec<Mat4>; 4] = Default::default();
                let mut rotations: [Vec<Mat3>; 4] = Default::default();

                for quad in group.placements.chunks_exact(FLOATS_PER_INSTANCE) {
                    let rotation =
                        Rotation3::from_axis_angle(&Vec3::y_axis(), deg_to_rad(quad[3]));
                    let translation = Translation3::new(quad[0], quad[1], quad[2]);

                    let quadrant = quadrant_of(&margins[chunk_index], quad[0], quad[2]);

                    placements[quadrant]
                        .push(translation.to_homogeneous() * rotation.to_homogeneous());
                    rotations[quadrant].push(*rotation.matrix());
                }

                let Some(mesh) = objects.rendering_data(&group.name) else {
                    error!("can't create object \"{}\"", group.name);
                    continue;
                };

                let has_transparent_texture = objects.is_texture_transparent(&group.name);
                // Transparent geometry is never deferred-shaded
                let use_deferred_shader = is_deferred && !has_transparent_texture;

                let shader_index = match registry.index_for_features(
                    &group.shader_feature,
                    scene.fog.enabled,
                    use_deferred_shader,
                ) {
                    Ok(index) => index,
                    Err(err) => {
                        error!(
                            "can't find shader with property \"{}\" for object: {err}",
                            group.shader_feature
                        );
                        continue;
                    }
                };

                let destination = if has_transparent_texture {
                    &mut transparent
                        .get_or_insert_with(|| vec![ObjectQuadrants::default(); chunk_count])
                        [chunk_index]
                } else {
                    &mut opaque[chunk_index]
                };

                for quadrant in 0..4 {
                    if placements[quadrant].is_empty() {
                        continue;
                    }
                    destination.quadrants[quadrant].push(ObjectBatch {
                        shader_index,
                        mesh: mesh.clone(),
                        placements: std::mem::take(&mut placements[quadrant]),
                        rotations: std::mem::take(&mut rotations[quadrant]),
                    });
                }
            }
        }

        for chunk in &mut opaque {
            for quadrant in &mut chunk.quadrants {
                stable_partition_by_leading_shader(quadrant);
            }
        }
        if let Some(transparent) = &mut transparent {
            for chunk in transparent.iter_mut() {
                for quadrant in &mut chunk.quadrants {
                    stable_partition_by_leading_shader(quadrant);
                }
            }
        }

        self.opaque_objects = opaque;
        self.transparent_objects = transparent;
    }

    fn populate_particles(
        &mut self,
        scene: &Scene,
        is_deferred: bool,
        margins: &[ChunkMargins],
        registry: &mut ShaderVariantRegistry,
        objects: &mut dyn ObjectSource,
        particles: &mut dyn ParticleSource,
    ) {
        let chunk_count = scene.chunks.len();
        self.particles = vec![ParticleQuadrants::default(); chunk_count];

        for (chunk_index, groups) in scene.particles.iter().enumerate() {
            for group in groups {
                let quadrant = quadrant_of(&margins[chunk_index], group.x, group.z);

                let Some(mesh) = objects.rendering_data(&group.name) else {
                    error!("can't create particle object \"{}\"", group.name);
                    continue;
                };
                let Some(data) =
                    particles.rendering_data(group, &scene.chunks[chunk_index], &mesh)
                else {
                    error!("can't realize particle group \"{}\"", group.name);
                    continue;
                };

                let shader_index = match registry.index_for_features(
                    &group.shader_feature,
                    scene.fog.enabled,
                    is_deferred,
                ) {
                    Ok(index) => index,
                    Err(err) => {
                        error!(
                            "can't find shader with property \"{}\" for particle group: {err}",
                            group.shader_feature
                        );
                        continue;
                    }
                };

                let placement = Translation3::new(group.x, 0.0, group.z).to_homogeneous();

                self.particles[chunk_index].quadrants[quadrant].push(ParticleBatch {
                    shader_index,
                    particles: data,
                    placement,
                });
            }
        }
    }

    fn create_sky(&mut self, objects: &mut dyn ObjectSource) {
        self.sky = objects.rendering_data(OBJECT_SKY_NAME).unwrap_or_else(|| {
            error!("sky mesh isn't found");
            MeshHandles::default()
        });
    }
}

/// Stable partition: all batches sharing the first batch's shader index move
/// to the front, relative order preserved within both runs. Keeps program
/// switches to a minimum without reordering draw content.
fn stable_partition_by_leading_shader(batches: &mut Vec<ObjectBatch>) {
    let Some(first) = batches.first() else {
        return;
    };
    let leading = first.shader_index;

    let (mut matching, rest): (Vec<ObjectBatch>, Vec<ObjectBatch>) = batches
        .drain(..)
        .partition(|batch| batch.shader_index == leading);

    matching.extend(rest);
    *batches = matching;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shader::ShaderCatalog;
    use crate::render::test_support::FakeAssets;
    use crate::scene::{compute_chunk_margins, ChunkData, InstanceGroup, ParticleGroup};

    fn registry() -> ShaderVariantRegistry {
        let mut registry = ShaderVariantRegistry::new(ShaderCatalog::standard());
        registry.set_light_model(true);
        registry
    }

    fn one_chunk_scene() -> Scene {
        Scene {
            terrain_texturing: "--".to_string(),
            chunks: vec![ChunkData {
                name: "plain".to_string(),
                x: 0.0,
                z: 0.0,
                side_length: 100.0,
            }],
            instances: vec![Vec::new()],
            particles: vec![Vec::new()],
            ..Scene::default()
        }
    }

    fn batch(shader_index: usize) -> ObjectBatch {
        ObjectBatch {
            shader_index,
            mesh: MeshHandles::default(),
            placements: vec![Mat4::identity()],
            rotations: vec![Mat3::identity()],
        }
    }

    #[test]
    fn test_stable_partition_groups_leading_shader() {
        let mut batches = vec![batch(2), batch(1), batch(2), batch(1)];
        // Tag the instances so order within each run is observable
        batches[0].placements[0][(0, 3)] = 10.0;
        batches[2].placements[0][(0, 3)] = 20.0;
        batches[1].placements[0][(0, 3)] = 30.0;
        batches[3].placements[0][(0, 3)] = 40.0;

        stable_partition_by_leading_shader(&mut batches);

        let order: Vec<usize> = batches.iter().map(|b| b.shader_index).collect();
        assert_eq!(order, vec![2, 2, 1, 1]);
        assert_eq!(batches[0].placements[0][(0, 3)], 10.0);
        assert_eq!(batches[1].placements[0][(0, 3)], 20.0);
        assert_eq!(batches[2].placements[0][(0, 3)], 30.0);
        assert_eq!(batches[3].placements[0][(0, 3)], 40.0);
    }

    #[test]
    fn test_build_places_instances_into_quadrants() {
        let mut scene = one_chunk_scene();
        let mut group = InstanceGroup::new("rock", "--");
        group.push_instance(10.0, 0.0, -10.0, 0.0); // near-left
        group.push_instance(90.0, 0.0, -90.0, 0.0); // far-right
        scene.instances[0].push(group);

        let margins = compute_chunk_margins(&scene.chunks);
        let mut registry = registry();
        let mut assets = FakeAssets::new();
        let mut terrain = FakeAssets::new();
        let mut particles = FakeAssets::new();

        let model = SceneRenderModel::build(
            &scene,
            false,
            &margins,
            &mut registry,
            &mut assets,
            &mut terrain,
            &mut particles,
        );

        assert_eq!(model.chunk_count(), 1);
        assert_eq!(model.opaque_objects[0].quadrants[0].len(), 1);
        assert_eq!(model.opaque_objects[0].quadrants[3].len(), 1);
        assert!(model.opaque_objects[0].quadrants[1].is_empty());
        assert!(model.transparent_objects.is_none());
    }

    #[test]
    fn test_transparent_texture_allocates_transparent_array() {
        let mut scene = one_chunk_scene();
        let mut group = InstanceGroup::new("glass", "--");
        group.push_instance(10.0, 0.0, -10.0, 0.0);
        scene.instances[0].push(group);

        let margins = compute_chunk_margins(&scene.chunks);
        let mut registry = registry();
        let mut assets = FakeAssets::new();
        assets.mark_transparent("glass");
        let mut terrain = FakeAssets::new();
        let mut particles = FakeAssets::new();

        let mut model = SceneRenderModel::build(
            &scene,
            false,
            &margins,
            &mut registry,
            &mut assets,
            &mut terrain,
            &mut particles,
        );

        let transparent = model.transparent_objects.as_ref().expect("allocated");
        assert_eq!(transparent[0].quadrants[0].len(), 1);
        assert!(model.opaque_objects[0].quadrants.iter().all(Vec::is_empty));

        // Removing the instance and rebuilding releases the array again
        scene.instances[0].clear();
        model.rebuild_objects(&scene, false, &margins, &mut registry, &mut assets);
        assert!(model.transparent_objects.is_none());
    }

    #[test]
    fn test_transparent_objects_never_use_deferred_variants() {
        let mut scene = one_chunk_scene();
        let mut group = InstanceGroup::new("glass", "--");
        group.push_instance(10.0, 0.0, -10.0, 0.0);
        scene.instances[0].push(group);

        let margins = compute_chunk_margins(&scene.chunks);
        let mut registry = registry();
        let mut assets = FakeAssets::new();
        assets.mark_transparent("glass");
        let mut terrain = FakeAssets::new();
        let mut particles = FakeAssets::new();

        let model = SceneRenderModel::build(
            &scene,
            true,
            &margins,
            &mut registry,
            &mut assets,
            &mut terrain,
            &mut particles,
        );

        let transparent = model.transparent_objects.as_ref().expect("allocated");
        let shader_index = transparent[0].quadrants[0][0].shader_index;
        let flags = registry.needed_features()[&shader_index];

        assert!(!flags.contains(crate::render::ShaderFeatures::DEFERRED_GEOMETRY));
    }

    #[test]
    fn test_unknown_object_is_skipped_not_fatal() {
        let mut scene = one_chunk_scene();
        let mut group = InstanceGroup::new("missing-object", "--");
        group.push_instance(10.0, 0.0, -10.0, 0.0);
        scene.instances[0].push(group);

        let margins = compute_chunk_margins(&scene.chunks);
        let mut registry = registry();
        let mut assets = FakeAssets::new();
        assets.forget("missing-object");
        let mut terrain = FakeAssets::new();
        let mut particles = FakeAssets::new();

        let model = SceneRenderModel::build(
            &scene,
            false,
            &margins,
            &mut registry,
            &mut assets,
            &mut terrain,
            &mut particles,
        );

        assert!(model.opaque_objects[0].quadrants.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_particles_classified_by_group_center() {
        let mut scene = one_chunk_scene();
        scene.particles[0].push(ParticleGroup {
            name: "grass".to_string(),
            shader_feature: "instancing".to_string(),
            x: 80.0,
            z: -20.0, // near-right quadrant
            radius: 5.0,
            density: 1.0,
        });

        let margins = compute_chunk_margins(&scene.chunks);
        let mut registry = registry();
        let mut assets = FakeAssets::new();
        let mut terrain = FakeAssets::new();
        let mut particles = FakeAssets::new();

        let model = SceneRenderModel::build(
            &scene,
            false,
            &margins,
            &mut registry,
            &mut assets,
            &mut terrain,
            &mut particles,
        );

        assert_eq!(model.particles[0].quadrants[1].len(), 1);
        assert!(model.particles[0].quadrants[0].is_empty());
    }
}
