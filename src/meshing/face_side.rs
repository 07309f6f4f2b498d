//! # Face Side Module
//!
//! The six faces of a voxel cube. The discriminants are the renderer's
//! normal table indices, so a face side is stored in a vertex as-is.

use cgmath::Vector3;
use num_derive::FromPrimitive;

/// One of the six faces of a voxel.
///
/// The order is the normal table: `[+X, +Y, -X, -Y, +Z, -Z]`.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum FaceSide {
    /// Facing positive X
    EAST = 0,
    /// Facing positive Y
    NORTH = 1,
    /// Facing negative X
    WEST = 2,
    /// Facing negative Y
    SOUTH = 3,
    /// Facing positive Z
    TOP = 4,
    /// Facing negative Z
    BOTTOM = 5,
}

/// Unit normals indexed by [`FaceSide`].
pub const NORMAL_TABLE: [[f32; 3]; 6] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];

impl FaceSide {
    /// All six faces in normal table order. Extraction emits faces in this
    /// order for every voxel.
    pub fn all() -> [FaceSide; 6] {
        [
            FaceSide::EAST,
            FaceSide::NORTH,
            FaceSide::WEST,
            FaceSide::SOUTH,
            FaceSide::TOP,
            FaceSide::BOTTOM,
        ]
    }

    /// Decodes a normal table index.
    pub fn from_index(index: u32) -> Option<FaceSide> {
        num_traits::FromPrimitive::from_u32(index)
    }

    /// Offset from a voxel to the neighbour this face looks at.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            FaceSide::EAST => Vector3::new(1, 0, 0),
            FaceSide::NORTH => Vector3::new(0, 1, 0),
            FaceSide::WEST => Vector3::new(-1, 0, 0),
            FaceSide::SOUTH => Vector3::new(0, -1, 0),
            FaceSide::TOP => Vector3::new(0, 0, 1),
            FaceSide::BOTTOM => Vector3::new(0, 0, -1),
        }
    }

    /// Outward unit normal.
    pub fn normal(self) -> Vector3<f32> {
        NORMAL_TABLE[self as usize].into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_round_trip_through_the_normal_table() {
        for side in FaceSide::all() {
            assert_eq!(FaceSide::from_index(side as u32), Some(side));
            assert_eq!(side.normal(), side.offset().cast::<f32>().unwrap());
        }
        assert_eq!(FaceSide::from_index(6), None);
    }
}
