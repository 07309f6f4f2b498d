//! # Chunk Module
//!
//! Chunks are the unit of storage, paging and generation. A chunk covers a
//! fixed `xy * xy * z` block of voxels addressed by a [`ChunkCoordinate`] in
//! chunk-grid space.
//!
//! ## Coordinate Mapping
//!
//! A global voxel position maps to its chunk with Euclidean division, so
//! negative positions land in the chunk below zero rather than in chunk `0`:
//!
//! | voxel x | chunk x (`xy = 32`) | local x |
//! |---------|---------------------|---------|
//! | `0`     | `0`                 | `0`     |
//! | `31`    | `0`                 | `31`    |
//! | `-1`    | `-1`                | `31`    |
//! | `-32`   | `-1`                | `0`     |
//! | `-33`   | `-2`                | `31`    |

use std::fmt;

use cgmath::{Point3, Vector3};

use super::field::VoxelField;
use super::region::Region;

/// Size of every chunk in voxels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkDimensions {
    /// Width and depth.
    pub xy: i32,
    /// Height.
    pub z: i32,
}

impl ChunkDimensions {
    /// Creates chunk dimensions. Both values must be positive; this is
    /// enforced by [`TerrainConfig::validate`](crate::config::TerrainConfig::validate).
    pub const fn new(xy: i32, z: i32) -> Self {
        Self { xy, z }
    }

    /// Number of voxels in one chunk.
    pub const fn voxel_count(&self) -> usize {
        self.xy as usize * self.xy as usize * self.z as usize
    }

    /// Chunk dimensions as a vector.
    pub fn as_vector(&self) -> Vector3<i32> {
        Vector3::new(self.xy, self.xy, self.z)
    }
}

/// Position of a chunk in chunk-grid space. Unique key of the cache.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoordinate {
    /// Chunk index along x.
    pub x: i32,
    /// Chunk index along y.
    pub y: i32,
    /// Chunk index along z.
    pub z: i32,
}

impl ChunkCoordinate {
    /// Creates a chunk coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The chunk containing the global voxel `position`.
    pub fn containing(position: Point3<i32>, dimensions: ChunkDimensions) -> Self {
        Self {
            x: position.x.div_euclid(dimensions.xy),
            y: position.y.div_euclid(dimensions.xy),
            z: position.z.div_euclid(dimensions.z),
        }
    }

    /// Offset of the global voxel `position` inside its chunk.
    pub fn local_offset(position: Point3<i32>, dimensions: ChunkDimensions) -> Point3<i32> {
        Point3::new(
            position.x.rem_euclid(dimensions.xy),
            position.y.rem_euclid(dimensions.xy),
            position.z.rem_euclid(dimensions.z),
        )
    }

    /// The coordinate as a point in chunk-grid space.
    pub fn position(&self) -> Point3<i32> {
        Point3::new(self.x, self.y, self.z)
    }

    /// The voxel region this chunk covers.
    pub fn region(&self, dimensions: ChunkDimensions) -> Region {
        let size = dimensions.as_vector();
        let lower = Point3::new(self.x * size.x, self.y * size.y, self.z * size.z);
        Region {
            lower,
            upper: lower + (size - Vector3::new(1, 1, 1)),
        }
    }
}

impl From<Point3<i32>> for ChunkCoordinate {
    fn from(position: Point3<i32>) -> Self {
        Self::new(position.x, position.y, position.z)
    }
}

impl fmt::Display for ChunkCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Lifecycle of a chunk as seen through the cache.
///
/// ```text
/// Unloaded -> Paging -> Resident -> Evicting -> Unloaded
///                 \
///                  -> Failed -> Paging (retry on next access)
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Not in the cache.
    Unloaded,
    /// A thread is generating the chunk's data.
    Paging,
    /// Data is installed and readable.
    Resident,
    /// The pager is being notified before the chunk is freed.
    Evicting,
    /// The last page-in failed.
    Failed,
}

/// A dense block of voxels keyed by its chunk coordinate.
///
/// The field's region is always exactly `coord.region(dimensions)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelChunk {
    /// Position of this chunk in chunk-grid space.
    pub coord: ChunkCoordinate,
    /// The chunk's voxels.
    pub field: VoxelField,
}

impl VoxelChunk {
    /// Wraps a paged-in field as a chunk.
    pub fn new(coord: ChunkCoordinate, field: VoxelField) -> Self {
        Self { coord, field }
    }

    /// The voxel region covered by this chunk.
    pub fn region(&self) -> Region {
        self.field.region()
    }

    /// Heap bytes held by the chunk's voxels.
    pub fn size_in_bytes(&self) -> usize {
        self.field.size_in_bytes()
    }
}
