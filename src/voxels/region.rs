//! # Region Module
//!
//! Inclusive, axis-aligned integer boxes. The same encoding addresses voxel
//! reads, prefetch requests, extraction requests and the area a chunk covers.

use std::fmt;

use cgmath::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};

use super::chunk::{ChunkCoordinate, ChunkDimensions};

/// Largest magnitude a region corner may have on any axis. Keeps sizes,
/// halos and chunk arithmetic inside `i32`.
pub const MAX_COORDINATE: i32 = 1 << 29;

/// An inclusive box of voxel positions, `lower..=upper` on every axis.
///
/// A region is never empty: [`Region::new`] rejects `lower > upper`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Smallest corner, inclusive.
    pub lower: Point3<i32>,
    /// Largest corner, inclusive.
    pub upper: Point3<i32>,
}

impl Region {
    /// Creates a region from its two inclusive corners.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidRegion`] if `lower` exceeds `upper` on
    /// any axis.
    pub fn new(lower: Point3<i32>, upper: Point3<i32>) -> TerrainResult<Self> {
        let region = Self { lower, upper };
        region.validate()?;
        Ok(region)
    }

    /// Creates a region from `(x0, y0, z0)-(x1, y1, z1)`.
    ///
    /// # Errors
    /// Same as [`Region::new`].
    pub fn from_bounds(x0: i32, y0: i32, z0: i32, x1: i32, y1: i32, z1: i32) -> TerrainResult<Self> {
        Self::new(Point3::new(x0, y0, z0), Point3::new(x1, y1, z1))
    }

    /// Creates a region of `size` voxels per axis starting at `lower`.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidRegion`] if any size is not positive.
    pub fn with_size(lower: Point3<i32>, size: Vector3<i32>) -> TerrainResult<Self> {
        if size.x <= 0 || size.y <= 0 || size.z <= 0 {
            return Err(TerrainError::InvalidRegion(format!(
                "size must be positive, got {}x{}x{}",
                size.x, size.y, size.z
            )));
        }
        Self::new(lower, lower + (size - Vector3::new(1, 1, 1)))
    }

    /// Checks the non-empty invariant. Needed for regions that were
    /// deserialized rather than constructed.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidRegion`] if the region is empty or a
    /// corner lies beyond [`MAX_COORDINATE`].
    pub fn validate(&self) -> TerrainResult<()> {
        if self.lower.x > self.upper.x || self.lower.y > self.upper.y || self.lower.z > self.upper.z {
            return Err(TerrainError::InvalidRegion(format!(
                "lower corner {self} exceeds upper corner"
            )));
        }
        let corners = [self.lower, self.upper];
        if corners
            .iter()
            .any(|c| [c.x, c.y, c.z].iter().any(|v| v.unsigned_abs() > MAX_COORDINATE as u32))
        {
            return Err(TerrainError::InvalidRegion(format!(
                "{self} reaches beyond +-{MAX_COORDINATE}"
            )));
        }
        Ok(())
    }

    /// Number of voxels along each axis, saturating at `i32::MAX`.
    pub fn size(&self) -> Vector3<i32> {
        let axis = |lower: i32, upper: i32| {
            let width = i64::from(upper) - i64::from(lower) + 1;
            width.clamp(0, i64::from(i32::MAX)) as i32
        };
        Vector3::new(
            axis(self.lower.x, self.upper.x),
            axis(self.lower.y, self.upper.y),
            axis(self.lower.z, self.upper.z),
        )
    }

    /// Total number of voxels in the region.
    pub fn volume(&self) -> usize {
        let size = self.size();
        size.x as usize * size.y as usize * size.z as usize
    }

    /// Returns `true` if `position` lies inside the region.
    pub fn contains(&self, position: Point3<i32>) -> bool {
        (self.lower.x..=self.upper.x).contains(&position.x)
            && (self.lower.y..=self.upper.y).contains(&position.y)
            && (self.lower.z..=self.upper.z).contains(&position.z)
    }

    /// Returns `true` if `other` lies entirely inside this region.
    pub fn contains_region(&self, other: &Region) -> bool {
        self.contains(other.lower) && self.contains(other.upper)
    }

    /// The overlap of two regions, if any.
    pub fn intersection(&self, other: &Region) -> Option<Region> {
        let lower = Point3::new(
            self.lower.x.max(other.lower.x),
            self.lower.y.max(other.lower.y),
            self.lower.z.max(other.lower.z),
        );
        let upper = Point3::new(
            self.upper.x.min(other.upper.x),
            self.upper.y.min(other.upper.y),
            self.upper.z.min(other.upper.z),
        );
        Region::new(lower, upper).ok()
    }

    /// The region grown by `halo` voxels on every side, saturating at the
    /// `i32` limits.
    pub fn expanded(&self, halo: i32) -> Region {
        let halo = halo.max(0);
        Region {
            lower: self.lower.map(|v| v.saturating_sub(halo)),
            upper: self.upper.map(|v| v.saturating_add(halo)),
        }
    }

    /// Iterates over every voxel position, x fastest, then y, then z.
    pub fn iter(&self) -> RegionIter {
        RegionIter {
            region: *self,
            next: Some(self.lower),
        }
    }

    /// Every chunk coordinate whose chunk intersects this region, in the
    /// same x, y, z order as [`Region::iter`].
    pub fn chunk_coordinates(&self, dimensions: ChunkDimensions) -> impl Iterator<Item = ChunkCoordinate> {
        let lower = ChunkCoordinate::containing(self.lower, dimensions);
        let upper = ChunkCoordinate::containing(self.upper, dimensions);
        Region {
            lower: lower.position(),
            upper: upper.position(),
        }
        .iter()
        .map(ChunkCoordinate::from)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} -> {}:{}:{}",
            self.lower.x, self.lower.y, self.lower.z, self.upper.x, self.upper.y, self.upper.z
        )
    }
}

impl IntoIterator for &Region {
    type Item = Point3<i32>;
    type IntoIter = RegionIter;

    fn into_iter(self) -> RegionIter {
        self.iter()
    }
}

/// Iterator over the voxel positions of a [`Region`].
#[derive(Clone, Debug)]
pub struct RegionIter {
    region: Region,
    next: Option<Point3<i32>>,
}

impl Iterator for RegionIter {
    type Item = Point3<i32>;

    fn next(&mut self) -> Option<Point3<i32>> {
        let current = self.next?;
        let mut following = current;
        following.x += 1;
        if following.x > self.region.upper.x {
            following.x = self.region.lower.x;
            following.y += 1;
            if following.y > self.region.upper.y {
                following.y = self.region.lower.y;
                following.z += 1;
            }
        }
        self.next = (following.z <= self.region.upper.z).then_some(following);
        Some(current)
    }
}
