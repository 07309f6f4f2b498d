//! Vertex layout shared with the renderer.

use cgmath::{Point3, Vector3};

use super::face_side::FaceSide;
use crate::voxels::voxel::MaterialIndex;

/// A mesh vertex.
///
/// # Memory Layout
/// - Position: 3x i32 (12 bytes), voxel-local to the mesh origin
/// - Normal: u32 (4 bytes), index into the normal table
/// - Material: u32 (4 bytes), palette index of the solid voxel
///
/// Total size: 20 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position relative to the mesh origin.
    pub position: [i32; 3],
    /// Normal table index, see [`FaceSide`].
    pub normal: u32,
    /// Palette material.
    pub material: u32,
}

impl Vertex {
    /// Creates a vertex for a corner of a face.
    pub fn new(position: Point3<i32>, side: FaceSide, material: MaterialIndex) -> Self {
        Vertex {
            position: position.into(),
            normal: side as u32,
            material: u32::from(material),
        }
    }

    /// The face side encoded in [`Vertex::normal`].
    pub fn side(&self) -> Option<FaceSide> {
        FaceSide::from_index(self.normal)
    }

    /// The decoded unit normal, or `None` for an invalid normal index.
    pub fn normal_vector(&self) -> Option<Vector3<f32>> {
        self.side().map(FaceSide::normal)
    }

    /// Position as a point.
    pub fn point(&self) -> Point3<i32> {
        self.position.into()
    }
}
