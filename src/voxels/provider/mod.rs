//! # Provider Module
//!
//! Content providers fill chunks on page-in and are told when a chunk leaves
//! memory. The cache only knows the [`VolumePager`] capability; the one
//! concrete provider is [`ProceduralProvider`], which regenerates terrain
//! from a seed instead of persisting it.
//!
//! The [`stamping`] and [`structures`] modules write parametric solids into
//! any [`VoxelSink`](super::VoxelSink).

pub mod procedural;
pub mod stamping;
pub mod structures;

pub use procedural::ProceduralProvider;

use crate::error::PagingError;

use super::chunk::VoxelChunk;
use super::field::VoxelField;
use super::region::Region;

/// The paging capability the cache calls into.
///
/// Both methods are invoked without the cache's map lock held and may run
/// concurrently for different regions.
pub trait VolumePager: Send + Sync {
    /// Produces voxel data for exactly `region`.
    ///
    /// # Errors
    /// Returns a [`PagingError`] if no data can be produced. The cache marks
    /// the chunk as failed and retries on the next access.
    fn page_in(&self, region: &Region) -> Result<VoxelField, PagingError>;

    /// Notification that `chunk`, covering `region`, is about to be freed.
    fn page_out(&self, region: &Region, chunk: &VoxelChunk);
}
