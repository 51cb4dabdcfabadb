//! Per-frame chunk and quadrant visibility
//!
//! A chunk (or one of its quadrants) is visible while the camera stays
//! within its bounds expanded by the visibility distance on every side.
//! Recomputed at least once per second and after any camera teleport;
//! cheap enough to run every frame.

use crate::scene::margins::ChunkMargins;

/// Visibility of one chunk and its four quadrants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityFlags {
    /// Whole-chunk visibility
    pub chunk_visible: bool,
    /// One bit per quadrant, [`VisibilityFlags::QUADRANT_MASKS`] order
    pub quadrant_mask: u8,
}

impl VisibilityFlags {
    /// Bit masks for quadrants 0..4
    pub const QUADRANT_MASKS: [u8; 4] = [0x1, 0x2, 0x4, 0x8];

    /// Whether the given quadrant bit is set
    pub fn quadrant_visible(&self, quadrant: usize) -> bool {
        self.quadrant_mask & Self::QUADRANT_MASKS[quadrant] != 0
    }
}

fn within(
    x: f32,
    z: f32,
    left: f32,
    right: f32,
    near: f32,
    far: f32,
    distance: f32,
) -> bool {
    (x > left - distance) && (x < right + distance) && (z < near + distance) && (z > far - distance)
}

/// Recompute visibility for every chunk from the camera XZ position
pub fn recalculate_visibility(
    margins: &[ChunkMargins],
    x: f32,
    z: f32,
    visibility_distance: f32,
) -> Vec<VisibilityFlags> {
    margins
        .iter()
        .map(|m| {
            let chunk_visible =
                within(x, z, m.left_x, m.right_x, m.near_z, m.far_z, visibility_distance);

            let mut quadrant_mask = 0u8;
            if within(x, z, m.left_x, m.center_x, m.near_z, m.center_z, visibility_distance) {
                quadrant_mask |= VisibilityFlags::QUADRANT_MASKS[0];
            }
            if within(x, z, m.center_x, m.right_x, m.near_z, m.center_z, visibility_distance) {
                quadrant_mask |= VisibilityFlags::QUADRANT_MASKS[1];
            }
            if within(x, z, m.left_x, m.center_x, m.center_z, m.far_z, visibility_distance) {
                quadrant_mask |= VisibilityFlags::QUADRANT_MASKS[2];
            }
            if within(x, z, m.center_x, m.right_x, m.center_z, m.far_z, visibility_distance) {
                quadrant_mask |= VisibilityFlags::QUADRANT_MASKS[3];
            }

            VisibilityFlags {
                chunk_visible,
                quadrant_mask,
            }
        })
        .collect()
}
