//! Chunk footprints and quadrant classification
//!
//! Each terrain chunk covers a rectangle on the XZ plane, split into four
//! quadrants by its center lines:
//!
//! ```text
//!            farZ
//!       +---+---+ rightX
//! leftX | 2 | 3 |
//!       +---+---+ centerZ
//!       | 0 | 1 |
//!       +---+---+
//!           centerX
//!           nearZ
//! ```
//!
//! Near is the larger Z; chunks extend from `z` towards `z - side_length`.

use log::error;

use crate::scene::ChunkData;

/// Rectangular bounds of one chunk plus the derived center lines
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChunkMargins {
    /// Z bound closest to the viewer (largest Z)
    pub near_z: f32,
    /// Z bound farthest from the viewer (smallest Z)
    pub far_z: f32,
    /// Smallest X bound
    pub left_x: f32,
    /// Largest X bound
    pub right_x: f32,
    /// Center line between `left_x` and `right_x`
    pub center_x: f32,
    /// Center line between `near_z` and `far_z`
    pub center_z: f32,
}

impl ChunkMargins {
    /// Margins for a chunk anchored at its near-left corner
    pub fn from_corner(x: f32, z: f32, side_length: f32) -> Self {
        let left_x = x;
        let right_x = x + side_length;
        let near_z = z;
        let far_z = z - side_length;

        Self {
            near_z,
            far_z,
            left_x,
            right_x,
            center_x: (left_x + right_x) / 2.0,
            center_z: (near_z + far_z) / 2.0,
        }
    }
}

/// Compute margins for every chunk of a scene, indexed like `chunks`
pub fn compute_chunk_margins(chunks: &[ChunkData]) -> Vec<ChunkMargins> {
    chunks
        .iter()
        .map(|chunk| ChunkMargins::from_corner(chunk.x, chunk.z, chunk.side_length))
        .collect()
}

/// Quadrant index for a world position inside the chunk rectangle.
///
/// Total over the rectangle: boundary points on the center lines belong to
/// the lower-indexed quadrant. Out-of-bounds coordinates log an error and
/// degrade to quadrant 0 so a stray instance stays renderable.
pub fn quadrant_of(margins: &ChunkMargins, x: f32, z: f32) -> usize {
    if (x >= margins.left_x) && (x <= margins.center_x) {
        if (z <= margins.near_z) && (z >= margins.center_z) {
            return 0;
        } else if (z <= margins.center_z) && (z >= margins.far_z) {
            return 2;
        }

        error!("quadrant not found for ({x}; {z})");
        return 0;
    }
    if (x >= margins.center_x) && (x <= margins.right_x) {
        if (z <= margins.near_z) && (z >= margins.center_z) {
            return 1;
        } else if (z <= margins.center_z) && (z >= margins.far_z) {
            return 3;
        }

        error!("quadrant not found for ({x}; {z})");
        return 0;
    }

    error!("quadrant not found for ({x}; {z})");
    0
}

/// Index of the chunk containing a world position, if any
pub fn find_chunk(chunks: &[ChunkData], x: f32, z: f32) -> Option<usize> {
    chunks.iter().position(|chunk| {
        (chunk.x <= x)
            && (x <= chunk.x + chunk.side_length)
            && (chunk.z - chunk.side_length <= z)
            && (z <= chunk.z)
    })
}
