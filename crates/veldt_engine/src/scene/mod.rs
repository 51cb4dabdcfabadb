//! Scene description data model
//!
//! The authoritative description of a loaded scene: camera, light, fog,
//! terrain chunks, object instance groups and particle groups. Loaders
//! populate this structure; the render layer flattens it into a
//! [`crate::render::scene_model::SceneRenderModel`] and the editor mutates it
//! through [`editor::SceneEditor`].

pub mod editor;
pub mod margins;
pub mod placement;
pub mod visibility;

pub use margins::{compute_chunk_margins, find_chunk, quadrant_of, ChunkMargins};
pub use visibility::{recalculate_visibility, VisibilityFlags};

use crate::foundation::math::Vec3;

/// Number of floats per placed instance: x, y, z, rotation in degrees
pub const FLOATS_PER_INSTANCE: usize = 4;

/// Camera position and orientation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraPose {
    /// World-space camera position
    pub position: Vec3,
    /// Rotation around the vertical axis, radians
    pub horizontal_rotation: f32,
    /// Rotation around the horizontal axis, radians
    pub vertical_rotation: f32,
}

impl CameraPose {
    /// Create a pose from a position and the two rotation angles
    pub fn new(position: Vec3, horizontal_rotation: f32, vertical_rotation: f32) -> Self {
        Self {
            position,
            horizontal_rotation,
            vertical_rotation,
        }
    }
}

/// Light model of the scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LightKind {
    /// One infinitely distant light, `coordinates` is its direction
    #[default]
    Directional,
    /// One local light, `coordinates` is its world position
    Point,
}

/// The single light source of a scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    /// Which light model the scene uses
    pub kind: LightKind,
    /// Direction for a directional light, world position for a point light
    pub coordinates: Vec3,
}

impl LightSource {
    /// Directional light shining along `direction`
    pub fn directional(direction: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            coordinates: direction,
        }
    }

    /// Point light at `position`
    pub fn point(position: Vec3) -> Self {
        Self {
            kind: LightKind::Point,
            coordinates: position,
        }
    }

    /// True for the directional light model
    pub fn is_directional(&self) -> bool {
        self.kind == LightKind::Directional
    }
}

impl Default for LightSource {
    fn default() -> Self {
        Self::directional(Vec3::new(0.0, -1.0, 0.0))
    }
}

/// Fog settings, colour components in `0..=255`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fog {
    /// Whether fog-enabled shader variants are requested
    pub enabled: bool,
    /// Red component
    pub red: u8,
    /// Green component
    pub green: u8,
    /// Blue component
    pub blue: u8,
}

/// Which pipeline the scene asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RendererKind {
    /// Single-pass forward shading
    #[default]
    Forward,
    /// Geometry buffer plus light accumulation passes
    Deferred,
}

/// One terrain chunk: name plus its near-left corner on the XZ plane.
///
/// `side_length` is appended from the terrain asset once it is known;
/// the chunk spans `[x, x + side_length] x [z - side_length, z]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkData {
    /// Terrain asset name
    pub name: String,
    /// Near-left corner X
    pub x: f32,
    /// Near-left corner Z
    pub z: f32,
    /// Chunk side length in world units
    pub side_length: f32,
}

impl ChunkData {
    /// Chunk at the given near-left corner, side length not yet known
    pub fn new(name: impl Into<String>, x: f32, z: f32) -> Self {
        Self {
            name: name.into(),
            x,
            z,
            side_length: 0.0,
        }
    }
}

/// All placed instances of one object within one chunk.
///
/// Placements are packed as x/y/z/rotation-degrees quads, matching the order
/// the scene text format lists them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceGroup {
    /// Object asset name
    pub name: String,
    /// Symbolic shader property, e.g. "normalmap" or "--"
    pub shader_feature: String,
    /// Packed x/y/z/rotation quads, length = 4 * instance count
    pub placements: Vec<f32>,
}

impl InstanceGroup {
    /// Empty group for the given object and shader property
    pub fn new(name: impl Into<String>, shader_feature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader_feature: shader_feature.into(),
            placements: Vec::new(),
        }
    }

    /// Number of placed instances
    pub fn instance_count(&self) -> usize {
        self.placements.len() / FLOATS_PER_INSTANCE
    }

    /// Append one instance placement
    pub fn push_instance(&mut self, x: f32, y: f32, z: f32, rotation_degrees: f32) {
        self.placements.push(x);
        self.placements.push(y);
        self.placements.push(z);
        self.placements.push(rotation_degrees);
    }
}

/// One GPU-instanced particle group, placed by its disc center
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleGroup {
    /// Object asset name rendered for each particle
    pub name: String,
    /// Symbolic shader property, normally "instancing"
    pub shader_feature: String,
    /// Disc center X
    pub x: f32,
    /// Disc center Z
    pub z: f32,
    /// Disc radius
    pub radius: f32,
    /// Particles per square unit
    pub density: f32,
}

/// A complete loaded scene
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Initial camera pose
    pub camera: CameraPose,
    /// The single scene light
    pub light: LightSource,
    /// Forward or deferred rendering
    pub renderer: RendererKind,
    /// Fog settings
    pub fog: Fog,
    /// Post-processing effect name, `None` when the scene asks for "--"
    pub post_effect: Option<String>,
    /// Symbolic shader property used by all terrain chunks
    pub terrain_texturing: String,
    /// Terrain chunks
    pub chunks: Vec<ChunkData>,
    /// Object instance groups, outer index = chunk index
    pub instances: Vec<Vec<InstanceGroup>>,
    /// Particle groups, outer index = chunk index
    pub particles: Vec<Vec<ParticleGroup>>,
}

impl Scene {
    /// True when the scene asks for the deferred pipeline
    pub fn is_deferred(&self) -> bool {
        self.renderer == RendererKind::Deferred
    }
}
