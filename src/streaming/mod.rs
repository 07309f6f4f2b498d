//! # Terrain Streaming
//!
//! Drives the cache, the extractor and the slot pool from a worker pool.
//!
//! ## Request Flow
//! 1. [`TerrainStreamer::request_mesh`] acquires a mesh slot on the calling
//!    thread, so an exhausted pool is reported immediately
//! 2. A [`PrefetchTask`](tasks::PrefetchTask) pages the region and its halo
//!    into the cache on a worker
//! 3. Its result schedules an [`ExtractionTask`](tasks::ExtractionTask) that
//!    leases the region and extracts into the slot
//! 4. [`TerrainStreamer::poll`] or [`TerrainStreamer::finish`] report a
//!    [`StreamEvent`] for the request
//!
//! The caller owns a slot from `request_mesh` until it hands it back with
//! [`TerrainStreamer::release_mesh`]. Failed requests never leave a slot
//! behind: it is released before the failure is reported.
//!
//! ## Example
//! ```rust
//! use voxel_terrain::config::TerrainConfig;
//! use voxel_terrain::streaming::{StreamEvent, TerrainStreamer};
//! use voxel_terrain::voxels::region::Region;
//!
//! let mut streamer = TerrainStreamer::new(TerrainConfig::default()).unwrap();
//! let region = Region::from_bounds(0, 0, 0, 31, 31, 31).unwrap();
//! let slot = streamer.request_mesh(region).unwrap();
//! for event in streamer.finish() {
//!     if let StreamEvent::MeshReady { vertices, .. } = event {
//!         assert_eq!(streamer.mesh(slot).unwrap().vertices().len(), vertices);
//!     }
//! }
//! streamer.release_mesh(slot).unwrap();
//! ```

pub mod task_management;
pub mod tasks;

use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use parking_lot::MutexGuard;

use crate::config::TerrainConfig;
use crate::error::{TerrainError, TerrainResult};
use crate::meshing::{Mesh, MeshLimits, MeshSlotPool, SurfaceExtractor};
use crate::voxels::cache::ChunkedVolumeCache;
use crate::voxels::provider::VolumePager;
use crate::voxels::region::Region;

use task_management::TaskManager;
use tasks::PrefetchTask;

/// How long [`TerrainStreamer::finish`] blocks on one worker before checking
/// the others.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// State shared by the streamer and every task.
pub struct StreamingContext {
    /// Chunk storage, paged on demand.
    pub cache: ChunkedVolumeCache,
    /// Output buffers for extracted meshes.
    pub pool: MeshSlotPool,
    /// Region to mesh conversion.
    pub extractor: SurfaceExtractor,
}

impl StreamingContext {
    /// Turns a failed request into its event, releasing the request's slot
    /// first.
    pub(crate) fn fail_request(
        &self,
        region: Region,
        slot: Option<usize>,
        error: TerrainError,
    ) -> StreamEvent {
        if let Some(slot) = slot {
            if let Err(e) = self.pool.release(slot) {
                error!("Could not release slot {} of failed request: {}", slot, e);
            }
        }
        StreamEvent::RequestFailed {
            region,
            slot,
            error,
        }
    }
}

/// Outcome of a streaming request.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Every chunk of `region` is resident.
    RegionPrefetched {
        /// The prefetched region.
        region: Region,
        /// Number of chunks the region covers within the world bounds.
        chunks: usize,
    },
    /// `slot` holds the mesh of `region`.
    MeshReady {
        /// The extracted region.
        region: Region,
        /// Slot holding the mesh, owned by the caller until released.
        slot: usize,
        /// Vertex count of the mesh.
        vertices: usize,
        /// Index count of the mesh.
        indices: usize,
    },
    /// A prefetch or mesh request failed. Its slot, if any, is already free.
    RequestFailed {
        /// The requested region.
        region: Region,
        /// The slot the request held.
        slot: Option<usize>,
        /// What went wrong.
        error: TerrainError,
    },
}

/// Schedules prefetch and extraction requests onto worker threads.
pub struct TerrainStreamer {
    context: Arc<StreamingContext>,
    task_manager: TaskManager,
}

impl TerrainStreamer {
    /// Creates a streamer over the procedural provider.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: TerrainConfig) -> TerrainResult<Self> {
        config.validate()?;
        let cache = ChunkedVolumeCache::procedural(&config)?;
        Ok(Self::with_cache(cache, &config))
    }

    /// Creates a streamer over a custom pager.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidConfig`] if `config` does not validate.
    pub fn with_pager(pager: Arc<dyn VolumePager>, config: TerrainConfig) -> TerrainResult<Self> {
        config.validate()?;
        let cache = ChunkedVolumeCache::new(pager, &config)?;
        Ok(Self::with_cache(cache, &config))
    }

    fn with_cache(cache: ChunkedVolumeCache, config: &TerrainConfig) -> Self {
        info!(
            "Streaming terrain: seed {}, chunks {}x{}x{}, budget {} bytes, {} slots",
            config.seed,
            config.chunk_size_xy,
            config.chunk_size_xy,
            config.chunk_size_z,
            config.memory_budget_bytes,
            config.num_slots
        );
        let context = StreamingContext {
            cache,
            pool: MeshSlotPool::new(config.num_slots, MeshLimits::from_config(config)),
            extractor: SurfaceExtractor::from_config(config),
        };
        TerrainStreamer {
            context: Arc::new(context),
            task_manager: TaskManager::new(config.worker_threads),
        }
    }

    /// Schedules paging of every chunk covering `region`.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidRegion`] for an inverted region.
    pub fn prefetch(&mut self, region: Region) -> TerrainResult<()> {
        region.validate()?;
        let task = PrefetchTask::new(Arc::clone(&self.context), region, None);
        self.task_manager.publish_task(Box::new(task));
        Ok(())
    }

    /// Schedules extraction of `region` and returns the slot it will land in.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidRegion`] for an inverted region and
    /// [`TerrainError::Exhausted`] if no slot is free.
    pub fn request_mesh(&mut self, region: Region) -> TerrainResult<usize> {
        region.validate()?;
        let slot = self.context.pool.acquire()?;
        let task = PrefetchTask::new(Arc::clone(&self.context), region, Some(slot));
        self.task_manager.publish_task(Box::new(task));
        Ok(slot)
    }

    /// Returns the events of every request that completed since the last
    /// call, without blocking.
    pub fn poll(&mut self) -> Vec<StreamEvent> {
        let events = self.task_manager.process_completed_tasks(&self.context);
        self.task_manager.process_queued_tasks();
        events
    }

    /// Blocks until every scheduled request has completed and returns their
    /// events.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = self.poll();
        while !self.task_manager.is_idle() {
            if !self.task_manager.has_live_workers() {
                error!(
                    "No streaming workers left, abandoning {} queued tasks",
                    self.task_manager.queued_tasks()
                );
                break;
            }
            events.extend(
                self.task_manager
                    .wait_for_completed_task(&self.context, POLL_INTERVAL),
            );
            events.extend(self.poll());
        }
        events
    }

    /// Returns `true` if no request is queued or running.
    pub fn is_idle(&self) -> bool {
        self.task_manager.is_idle()
    }

    /// Locks the mesh held by `slot`.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidState`] if `slot` is not in use.
    pub fn mesh(&self, slot: usize) -> TerrainResult<MutexGuard<'_, Mesh>> {
        self.context.pool.slot(slot)
    }

    /// Hands a consumed slot back to the pool.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidState`] if `slot` is not in use.
    pub fn release_mesh(&self, slot: usize) -> TerrainResult<()> {
        self.context.pool.release(slot)
    }

    /// The chunk cache backing this streamer.
    pub fn cache(&self) -> &ChunkedVolumeCache {
        &self.context.cache
    }

    /// The mesh slot pool.
    pub fn pool(&self) -> &MeshSlotPool {
        &self.context.pool
    }

    /// The extractor used by every request.
    pub fn extractor(&self) -> SurfaceExtractor {
        self.context.extractor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PagingError;
    use crate::voxels::chunk::VoxelChunk;
    use crate::voxels::field::VoxelField;

    struct FailingPager;

    impl VolumePager for FailingPager {
        fn page_in(&self, _region: &Region) -> Result<VoxelField, PagingError> {
            Err(PagingError::new("backing store offline"))
        }

        fn page_out(&self, _region: &Region, _chunk: &VoxelChunk) {}
    }

    fn small_config() -> TerrainConfig {
        TerrainConfig {
            chunk_size_xy: 16,
            chunk_size_z: 16,
            num_slots: 2,
            worker_threads: 2,
            ..TerrainConfig::default()
        }
    }

    fn region(x0: i32, y0: i32, z0: i32, x1: i32, y1: i32, z1: i32) -> Region {
        Region::from_bounds(x0, y0, z0, x1, y1, z1).unwrap()
    }

    #[test]
    fn mesh_request_reports_ready() {
        let mut streamer = TerrainStreamer::new(small_config()).unwrap();
        let area = region(0, 0, 0, 15, 15, 15);
        let slot = streamer.request_mesh(area).unwrap();
        let events = streamer.finish();
        assert!(streamer.is_idle());
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::MeshReady {
                region,
                slot: ready,
                vertices,
                indices,
            } => {
                assert_eq!(*region, area);
                assert_eq!(*ready, slot);
                let mesh = streamer.mesh(slot).unwrap();
                assert_eq!(mesh.vertices().len(), *vertices);
                assert_eq!(mesh.indices().len(), *indices);
                assert!(mesh.indices_are_valid());
            }
            other => panic!("unexpected event {other:?}"),
        }
        streamer.release_mesh(slot).unwrap();
        assert_eq!(streamer.pool().free_count(), 2);
    }

    #[test]
    fn prefetch_reports_chunk_count() {
        let mut streamer = TerrainStreamer::new(small_config()).unwrap();
        streamer.prefetch(region(0, 0, 0, 31, 15, 15)).unwrap();
        let events = streamer.finish();
        assert_eq!(
            events,
            vec![StreamEvent::RegionPrefetched {
                region: region(0, 0, 0, 31, 15, 15),
                chunks: 2,
            }]
        );
        assert_eq!(streamer.cache().resident_chunks(), 2);
    }

    #[test]
    fn exhausted_pool_fails_immediately() {
        let mut streamer = TerrainStreamer::new(small_config()).unwrap();
        let area = region(0, 0, 0, 7, 7, 7);
        streamer.request_mesh(area).unwrap();
        streamer.request_mesh(area).unwrap();
        assert_eq!(
            streamer.request_mesh(area).unwrap_err(),
            TerrainError::Exhausted { capacity: 2 }
        );
        streamer.finish();
    }

    #[test]
    fn failed_requests_release_their_slot() {
        let mut streamer = TerrainStreamer::with_pager(Arc::new(FailingPager), small_config()).unwrap();
        let area = region(0, 0, 0, 7, 7, 7);
        let slot = streamer.request_mesh(area).unwrap();
        let events = streamer.finish();
        assert!(matches!(
            &events[..],
            [StreamEvent::RequestFailed {
                slot: Some(failed),
                error: TerrainError::PagingFailed { .. },
                ..
            }] if *failed == slot
        ));
        assert!(!streamer.pool().is_in_use(slot));
        assert_eq!(streamer.pool().free_count(), 2);
    }

    #[test]
    fn inverted_regions_are_rejected() {
        let mut streamer = TerrainStreamer::new(small_config()).unwrap();
        let inverted = Region {
            lower: cgmath::Point3::new(4, 0, 0),
            upper: cgmath::Point3::new(0, 0, 0),
        };
        assert!(matches!(
            streamer.request_mesh(inverted),
            Err(TerrainError::InvalidRegion(_))
        ));
        assert!(matches!(
            streamer.prefetch(inverted),
            Err(TerrainError::InvalidRegion(_))
        ));
        assert_eq!(streamer.pool().free_count(), 2);
    }

    #[test]
    fn out_of_range_regions_are_rejected() {
        let mut streamer = TerrainStreamer::new(small_config()).unwrap();
        let edge = Region {
            lower: cgmath::Point3::new(i32::MAX - 7, 0, 0),
            upper: cgmath::Point3::new(i32::MAX, 7, 7),
        };
        assert!(matches!(
            streamer.request_mesh(edge),
            Err(TerrainError::InvalidRegion(_))
        ));
        assert!(matches!(streamer.prefetch(edge), Err(TerrainError::InvalidRegion(_))));
        assert_eq!(streamer.pool().free_count(), 2);
    }

    #[test]
    fn failed_tasks_release_their_slot() {
        use crate::streaming::task_management::task::{Task, TaskResult};
        use crate::streaming::tasks::ExtractionTask;

        let streamer = TerrainStreamer::new(small_config()).unwrap();
        let context = Arc::clone(&streamer.context);
        let area = region(0, 0, 0, 7, 7, 7);

        let slot = context.pool.acquire().unwrap();
        let failed = PrefetchTask::new(Arc::clone(&context), area, Some(slot))
            .fail(TerrainError::TaskPanicked("boom".to_string()));
        let (follow_ups, events) = failed.handle_result(&context);
        assert!(follow_ups.is_empty());
        assert!(matches!(
            &events[..],
            [StreamEvent::RequestFailed { slot: Some(s), error: TerrainError::TaskPanicked(_), .. }] if *s == slot
        ));
        assert!(!context.pool.is_in_use(slot));

        let slot = context.pool.acquire().unwrap();
        let failed = ExtractionTask::new(Arc::clone(&context), area, slot)
            .fail(TerrainError::TaskPanicked("boom".to_string()));
        let (_, events) = failed.handle_result(&context);
        assert!(matches!(&events[..], [StreamEvent::RequestFailed { .. }]));
        assert!(!context.pool.is_in_use(slot));
    }

    #[test]
    fn many_requests_drain_through_few_workers() {
        let config = TerrainConfig {
            num_slots: 8,
            ..small_config()
        };
        let mut streamer = TerrainStreamer::new(config).unwrap();
        let mut slots = Vec::new();
        for i in 0..8 {
            slots.push(streamer.request_mesh(region(i * 8, 0, 0, i * 8 + 7, 7, 7)).unwrap());
        }
        let events = streamer.finish();
        assert_eq!(events.len(), 8);
        assert!(events
            .iter()
            .all(|event| matches!(event, StreamEvent::MeshReady { .. })));
        for slot in slots {
            streamer.release_mesh(slot).unwrap();
        }
    }
}
