//! # Voxel Field Module
//!
//! A dense voxel array covering one [`Region`]. It is what a pager produces on
//! page-in and what a resident chunk stores.
//!
//! ## Layout
//!
//! Voxels are stored x fastest, then y, then z, matching [`Region::iter`]:
//! `index = x + width * (y + depth * z)` with positions relative to
//! `region.lower`.

use cgmath::Point3;

use super::region::Region;
use super::voxel::Voxel;
use super::{VoxelSink, VoxelVolume};
use crate::error::TerrainResult;

/// Dense voxel storage for a region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelField {
    region: Region,
    voxels: Box<[Voxel]>,
}

impl VoxelField {
    /// Creates a field covering `region` with every voxel empty.
    pub fn empty(region: Region) -> Self {
        Self::filled(region, Voxel::EMPTY)
    }

    /// Creates a field covering `region` with every voxel set to `voxel`.
    pub fn filled(region: Region, voxel: Voxel) -> Self {
        Self {
            region,
            voxels: vec![voxel; region.volume()].into_boxed_slice(),
        }
    }

    /// The region covered by this field.
    pub fn region(&self) -> Region {
        self.region
    }

    /// All voxels in storage order.
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// The voxels viewed as raw `material, density` byte pairs.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.voxels)
    }

    /// Heap bytes used by the voxel array.
    pub fn size_in_bytes(&self) -> usize {
        std::mem::size_of_val::<[Voxel]>(&self.voxels)
    }

    fn index_of(&self, position: Point3<i32>) -> Option<usize> {
        if !self.region.contains(position) {
            return None;
        }
        let size = self.region.size();
        let local = position - self.region.lower;
        Some(local.x as usize + size.x as usize * (local.y as usize + size.y as usize * local.z as usize))
    }

    /// The voxel at a global position, or `None` outside the field.
    pub fn get(&self, position: Point3<i32>) -> Option<Voxel> {
        self.index_of(position).map(|i| self.voxels[i])
    }

    /// Writes the voxel at a global position. Returns `false` and writes
    /// nothing if the position lies outside the field.
    pub fn set(&mut self, position: Point3<i32>, voxel: Voxel) -> bool {
        match self.index_of(position) {
            Some(i) => {
                self.voxels[i] = voxel;
                true
            }
            None => false,
        }
    }
}

impl VoxelVolume for VoxelField {
    fn bounds(&self) -> Option<Region> {
        Some(self.region)
    }

    fn voxel(&self, position: Point3<i32>) -> Voxel {
        self.get(position).unwrap_or(Voxel::EMPTY)
    }
}

impl VoxelSink for VoxelField {
    fn set_voxel(&mut self, position: Point3<i32>, voxel: Voxel) -> TerrainResult<()> {
        self.set(position, voxel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::voxel::materials;

    #[test]
    fn indexes_relative_to_lower_corner() {
        let region = Region::from_bounds(-2, -2, -2, 1, 1, 1).unwrap();
        let mut field = VoxelField::empty(region);
        assert_eq!(field.voxels().len(), 64);

        assert!(field.set(Point3::new(-2, -2, -2), Voxel::solid(materials::SOLID)));
        assert!(field.set(Point3::new(1, 1, 1), Voxel::solid(materials::TRUNK)));
        assert_eq!(field.voxels()[0].material, materials::SOLID);
        assert_eq!(field.voxels()[63].material, materials::TRUNK);
    }

    #[test]
    fn writes_outside_are_clipped() {
        let region = Region::from_bounds(0, 0, 0, 3, 3, 3).unwrap();
        let mut field = VoxelField::empty(region);
        assert!(!field.set(Point3::new(4, 0, 0), Voxel::solid(1)));
        assert!(field.set_voxel(Point3::new(-1, 0, 0), Voxel::solid(1)).is_ok());
        assert!(field.voxels().iter().all(|v| v.is_empty()));
        assert_eq!(field.voxel(Point3::new(100, 0, 0)), Voxel::EMPTY);
    }

    #[test]
    fn size_counts_two_bytes_per_voxel() {
        let region = Region::from_bounds(0, 0, 0, 7, 7, 7).unwrap();
        let field = VoxelField::empty(region);
        assert_eq!(field.size_in_bytes(), 512 * 2);
        assert_eq!(field.as_bytes().len(), 1024);
    }
}
