//! Editor mutation path for the scene description
//!
//! All edits mutate the authoritative [`Scene`] only; after any object
//! mutation the caller rebuilds the render model's object arrays from it
//! (see [`crate::render::scene_model::SceneRenderModel::rebuild_objects`]).

use log::error;
use rand::Rng;

use crate::assets::TerrainSource;
use crate::foundation::math::Vec3;
use crate::scene::margins::find_chunk;
use crate::scene::placement::generate_absolute_positions;
use crate::scene::{CameraPose, InstanceGroup, Scene};

/// Density used for editor-inserted instance groups
const GROUP_INSERTION_DENSITY: f32 = 0.06;

/// Insert a single instance at a world position.
///
/// The owning chunk is located from the position, the instance group from
/// the object name; a missing group is created. Returns false when the
/// position lies outside every chunk.
pub fn insert_instance(
    scene: &mut Scene,
    x: f32,
    y: f32,
    z: f32,
    rotation_degrees: f32,
    object_name: &str,
    shader_feature: &str,
) -> bool {
    let Some(chunk_index) = find_chunk(&scene.chunks, x, z) else {
        error!("no chunk contains ({x}; {z}), instance not inserted");
        return false;
    };

    let groups = &mut scene.instances[chunk_index];
    let group_index = match groups.iter().position(|group| group.name == object_name) {
        Some(index) => index,
        None => {
            groups.push(InstanceGroup::new(object_name, shader_feature));
            groups.len() - 1
        }
    };

    groups[group_index].push_instance(x, y, z, rotation_degrees);
    true
}

/// Write a picked instance's placement back into the scene.
///
/// `offset` is the flat float offset inside the group's packed placement
/// array where the four values are spliced in.
pub fn copy_back_instance(
    scene: &mut Scene,
    chunk_index: usize,
    group_index: usize,
    offset: usize,
    placement: [f32; 4],
) {
    let Some(group) = scene
        .instances
        .get_mut(chunk_index)
        .and_then(|groups| groups.get_mut(group_index))
    else {
        error!("no instance group at chunk {chunk_index}, group {group_index}");
        return;
    };

    let offset = offset.min(group.placements.len());
    group.placements.splice(offset..offset, placement);
}

/// Scatter a generated group of instances on a disc around a world position.
///
/// Instance count follows the disc area at the fixed editor density; each
/// instance sits on the terrain with a random yaw.
pub fn insert_instance_group(
    scene: &mut Scene,
    chunk_index: usize,
    position: Vec3,
    radius: f32,
    terrain: &mut dyn TerrainSource,
    object_name: &str,
    shader_feature: &str,
    rng: &mut impl Rng,
) {
    let Some(chunk) = scene.chunks.get(chunk_index).cloned() else {
        error!("no chunk with index {chunk_index}");
        return;
    };

    let positions = generate_absolute_positions(
        GROUP_INSERTION_DENSITY,
        position,
        radius,
        terrain,
        &chunk,
        rng,
    );

    for triple in positions.chunks_exact(3) {
        let rotation = rng.random_range(0.0..360.0);
        insert_instance(
            scene,
            triple[0],
            triple[1],
            triple[2],
            rotation,
            object_name,
            shader_feature,
        );
    }
}

/// Replace the scene's initial camera pose
pub fn set_camera_pose(scene: &mut Scene, pose: CameraPose) {
    scene.camera = pose;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MeshHandles;
    use crate::scene::ChunkData;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FlatTerrain;

    impl TerrainSource for FlatTerrain {
        fn rendering_data(&mut self, _name: &str) -> Option<MeshHandles> {
            None
        }

        fn chunk_side_length(&mut self, _name: &str) -> f32 {
            100.0
        }

        fn height(&mut self, _ox: f32, _oz: f32, _chunk: &str, _x: f32, _z: f32) -> f32 {
            1.0
        }
    }

    fn scene_with_one_chunk() -> Scene {
        Scene {
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

    #[test]
    fn test_insert_creates_missing_group_and_appends() {
        let mut scene = scene_with_one_chunk();

        assert!(insert_instance(&mut scene, 10.0, 0.0, -10.0, 45.0, "rock", "--"));
        assert!(insert_instance(&mut scene, 20.0, 0.0, -20.0, 90.0, "rock", "--"));

        assert_eq!(scene.instances[0].len(), 1);
        let group = &scene.instances[0][0];
        assert_eq!(group.name, "rock");
        assert_eq!(group.instance_count(), 2);
        assert_eq!(group.placements[4..], [20.0, 0.0, -20.0, 90.0]);
    }

    #[test]
    fn test_insert_outside_all_chunks_is_rejected() {
        let mut scene = scene_with_one_chunk();

        assert!(!insert_instance(&mut scene, 500.0, 0.0, 500.0, 0.0, "rock", "--"));
        assert!(scene.instances[0].is_empty());
    }

    #[test]
    fn test_copy_back_splices_placement() {
        let mut scene = scene_with_one_chunk();
        insert_instance(&mut scene, 10.0, 0.0, -10.0, 0.0, "rock", "--");

        copy_back_instance(&mut scene, 0, 0, 0, [1.0, 2.0, 3.0, 4.0]);

        let group = &scene.instances[0][0];
        assert_eq!(group.instance_count(), 2);
        assert_eq!(group.placements[..4], [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(group.placements[4..], [10.0, 0.0, -10.0, 0.0]);
    }

    #[test]
    fn test_group_insertion_scatters_on_terrain() {
        let mut scene = scene_with_one_chunk();
        let mut rng = StdRng::seed_from_u64(3);

        insert_instance_group(
            &mut scene,
            0,
            Vec3::new(50.0, 0.0, -50.0),
            10.0,
            &mut FlatTerrain,
            "bush",
            "--",
            &mut rng,
        );

        // pi * 10^2 * 0.06 = 18 instances requested; a few may fall outside
        // the chunk only if the disc crosses its border, which this one
        // does not.
        let group = &scene.instances[0][0];
        assert_eq!(group.instance_count(), 18);

        for quad in group.placements.chunks_exact(4) {
            assert!((quad[1] - 1.0).abs() < f32::EPSILON);
            assert!((0.0..360.0).contains(&quad[3]));
        }
    }
}
