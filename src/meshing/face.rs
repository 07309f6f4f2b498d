use cgmath::Point3;

use super::face_side::FaceSide;
use crate::voxels::voxel::MaterialIndex;

/// A single quad face of a voxel.
///
/// The four corners are named as seen from outside the voxel looking at the
/// face. Together with the index pattern from
/// [`Mesh::generate_face_indices`](super::mesh::Mesh::generate_face_indices)
/// they give counter-clockwise triangles whose normal points away from the
/// voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    /// Lower-left corner in mesh-local coordinates
    pub ll: Point3<i32>,
    /// Lower-right corner in mesh-local coordinates
    pub lr: Point3<i32>,
    /// Upper-left corner in mesh-local coordinates
    pub ul: Point3<i32>,
    /// Upper-right corner in mesh-local coordinates
    pub ur: Point3<i32>,
    /// Material of the voxel this face belongs to
    pub material: MaterialIndex,
    /// Which side of the voxel this face represents
    pub side: FaceSide,
}

impl Face {
    /// Creates the face on `side` of the voxel at mesh-local `(i, j, k)`.
    pub fn new(i: i32, j: i32, k: i32, material: MaterialIndex, side: FaceSide) -> Self {
        let (ll, lr, ul, ur) = match side {
            FaceSide::EAST => (
                Point3::new(i + 1, j, k),
                Point3::new(i + 1, j + 1, k),
                Point3::new(i + 1, j, k + 1),
                Point3::new(i + 1, j + 1, k + 1),
            ),
            FaceSide::NORTH => (
                Point3::new(i + 1, j + 1, k),
                Point3::new(i, j + 1, k),
                Point3::new(i + 1, j + 1, k + 1),
                Point3::new(i, j + 1, k + 1),
            ),
            FaceSide::WEST => (
                Point3::new(i, j + 1, k),
                Point3::new(i, j, k),
                Point3::new(i, j + 1, k + 1),
                Point3::new(i, j, k + 1),
            ),
            FaceSide::SOUTH => (
                Point3::new(i, j, k),
                Point3::new(i + 1, j, k),
                Point3::new(i, j, k + 1),
                Point3::new(i + 1, j, k + 1),
            ),
            FaceSide::TOP => (
                Point3::new(i, j, k + 1),
                Point3::new(i + 1, j, k + 1),
                Point3::new(i, j + 1, k + 1),
                Point3::new(i + 1, j + 1, k + 1),
            ),
            FaceSide::BOTTOM => (
                Point3::new(i, j, k),
                Point3::new(i, j + 1, k),
                Point3::new(i + 1, j, k),
                Point3::new(i + 1, j + 1, k),
            ),
        };
        Face {
            ll,
            lr,
            ul,
            ur,
            material,
            side,
        }
    }
}
