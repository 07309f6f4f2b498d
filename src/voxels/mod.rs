//! # Voxels Module
//!
//! Voxel storage and generation: the voxel and region value types, chunks,
//! the paged chunk cache and the procedural provider that fills it.
//!
//! Two small traits connect storage to its consumers:
//! - [`VoxelVolume`] is read access, used by surface extraction and surface
//!   searches.
//! - [`VoxelSink`] is write access, used by the stamping primitives.
//!
//! Both are implemented by [`VoxelField`](field::VoxelField) and by the
//! cache's views ([`RegionLease`](cache::RegionLease) and
//! [`CacheWriter`](cache::CacheWriter)).

use cgmath::Point3;

use crate::error::TerrainResult;

use region::Region;
use voxel::Voxel;

pub mod cache;
pub mod chunk;
pub mod field;
pub mod provider;
pub mod region;
pub mod voxel;

/// Read access to voxels by global position.
pub trait VoxelVolume {
    /// Hard bounds of the volume. Positions outside are empty. `None` means
    /// the volume is unbounded.
    fn bounds(&self) -> Option<Region>;

    /// The voxel at `position`. Positions outside [`VoxelVolume::bounds`]
    /// return [`Voxel::EMPTY`].
    fn voxel(&self, position: Point3<i32>) -> Voxel;
}

/// Write access to voxels by global position.
///
/// Writes outside the sink's area are silently clipped.
pub trait VoxelSink {
    /// Writes one voxel.
    ///
    /// # Errors
    /// Sinks backed by the cache report paging failures.
    fn set_voxel(&mut self, position: Point3<i32>, voxel: Voxel) -> TerrainResult<()>;
}
