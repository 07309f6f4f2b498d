//! # Terrain Error Types
//!
//! Every error the streaming core can report. None of them is fatal: each is
//! returned to the immediate caller, which decides whether to retry, skip the
//! request or propagate it further.

use thiserror::Error;

use crate::voxels::chunk::ChunkCoordinate;

/// Errors produced by the cache, the extractor, the slot pool and the streamer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerrainError {
    /// The pager could not produce voxel data for a chunk.
    ///
    /// The chunk is left in the `Failed` state; calling `get` again retries
    /// the page-in, which is always safe because generation is stateless.
    #[error("paging failed for chunk {coord}: {reason}")]
    PagingFailed {
        /// The chunk that failed to page in.
        coord: ChunkCoordinate,
        /// Reason reported by the pager.
        reason: String,
    },

    /// Extraction output would exceed the configured mesh capacity.
    ///
    /// Recovery is to split the region into smaller requests.
    #[error(
        "mesh overflow: {vertices} vertices / {indices} indices exceeds capacity {max_vertices} / {max_indices}"
    )]
    Overflow {
        /// Vertex count the extraction tried to reach.
        vertices: usize,
        /// Index count the extraction tried to reach.
        indices: usize,
        /// Configured vertex capacity.
        max_vertices: usize,
        /// Configured index capacity.
        max_indices: usize,
    },

    /// No free mesh slot was available.
    #[error("mesh slot pool exhausted: all {capacity} slots are in use")]
    Exhausted {
        /// Total number of slots in the pool.
        capacity: usize,
    },

    /// Double release, out-of-range slot index, or access to a free slot.
    ///
    /// This is a caller logic bug.
    #[error("invalid mesh slot state: {0}")]
    InvalidState(String),

    /// A streaming task panicked on its worker. Its request is abandoned.
    #[error("streaming task panicked: {0}")]
    TaskPanicked(String),

    /// A region with `lower > upper` on some axis, or corners out of range.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// Configuration failed to parse or validate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A declared extension point without an implementation.
    #[error("{0} is not implemented")]
    Unsupported(&'static str),
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Result type for terrain operations.
pub type TerrainResult<T> = Result<T, TerrainError>;

/// Failure reported by a [`VolumePager`](crate::voxels::provider::VolumePager)
/// when it cannot produce data for a region.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct PagingError {
    /// Human readable reason.
    pub reason: String,
}

impl PagingError {
    /// Creates a paging error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
