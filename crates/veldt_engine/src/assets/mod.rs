//! Asset collaborator interfaces
//!
//! The renderer never touches disk. Meshes, textures and heightmaps arrive
//! as GPU-resident handles through the traits below; loaders and caches live
//! outside this crate. A lookup miss is a skippable condition, never fatal.

pub mod heightmap;

pub use heightmap::Heightmap;

use crate::render::device::{BufferId, TextureId, VertexArrayId};
use crate::scene::{ChunkData, ParticleGroup};

/// GPU-resident handles for one drawable mesh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshHandles {
    /// Vertex array object
    pub vao: VertexArrayId,
    /// Vertex attribute buffers backing the VAO, kept for lifetime tracking
    pub vertex_buffers: Vec<BufferId>,
    /// Number of vertices to draw
    pub vertex_count: u32,
    /// Colour texture
    pub texture: TextureId,
    /// Normal map texture, present for normal-mapped materials only
    pub normal_texture: Option<TextureId>,
}

/// GPU-resident handles for one instanced particle group.
///
/// Per-instance offsets and rotation scalars are generated once at load time
/// and uploaded into the two instancing buffers; they are never re-transformed
/// per frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticleHandles {
    /// The mesh drawn for every particle
    pub object: MeshHandles,
    /// Per-instance offset buffer
    pub offset_buffer: BufferId,
    /// Per-instance rotation scalar buffer
    pub rotation_buffer: BufferId,
    /// Number of instances in the group
    pub particle_count: u32,
}

/// Provider of object meshes and their texture properties
pub trait ObjectSource {
    /// GPU handles for a named object, `None` when unknown
    fn rendering_data(&mut self, name: &str) -> Option<MeshHandles>;

    /// Whether the object's colour texture carries alpha transparency
    fn is_texture_transparent(&mut self, name: &str) -> bool;
}

/// Provider of terrain chunk meshes and height queries
pub trait TerrainSource {
    /// GPU handles for a named chunk, `None` when unknown
    fn rendering_data(&mut self, name: &str) -> Option<MeshHandles>;

    /// Side length of a named chunk in world units
    fn chunk_side_length(&mut self, name: &str) -> f32;

    /// Terrain height under a world position within the named chunk
    fn height(&mut self, origin_x: f32, origin_z: f32, chunk_name: &str, x: f32, z: f32) -> f32;
}

/// Provider of instancing buffers for particle groups
pub trait ParticleSource {
    /// GPU handles for one particle group, `None` when the group's
    /// positions could not be realized
    fn rendering_data(
        &mut self,
        group: &ParticleGroup,
        chunk: &ChunkData,
        object: &MeshHandles,
    ) -> Option<ParticleHandles>;
}

/// Append chunk side lengths from the terrain source to a scene's chunks
pub fn append_chunk_dimensions(
    chunks: &mut [ChunkData],
    terrain: &mut dyn TerrainSource,
) {
    for chunk in chunks {
        chunk.side_length = terrain.chunk_side_length(&chunk.name);
    }
}
