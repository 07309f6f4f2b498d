//! # Chunked Volume Cache
//!
//! A sparse map from [`ChunkCoordinate`] to resident chunk, bounded by a
//! memory budget. Chunks are paged in through a [`VolumePager`] on first
//! access and evicted least-recently-used first once resident memory exceeds
//! the budget.
//!
//! ## Locking
//!
//! - One mutex guards the chunk map, the recency list and the byte count. It is
//!   held only for lookups and state transitions, never while the pager runs.
//! - Every resident chunk sits behind its own [`MtResource`], so extraction on
//!   several workers reads concurrently while writes take the chunk
//!   exclusively.
//! - Threads asking for a chunk another thread is paging in or evicting wait
//!   on a condition variable until that transition finishes.
//!
//! ## Pinning
//!
//! A [`ChunkRef`] or [`RegionLease`] pins the chunks it refers to. Pin counts
//! only grow while the map lock is held and only chunks with a zero count are
//! considered for eviction, so a pinned chunk is never freed under a reader.
//! If every resident chunk is pinned the cache stays over budget until
//! [`ChunkedVolumeCache::trim`] or the next page-in runs the check again.
//!
//! ## Example
//! ```rust
//! use cgmath::Point3;
//! use voxel_terrain::config::TerrainConfig;
//! use voxel_terrain::voxels::cache::ChunkedVolumeCache;
//!
//! let cache = ChunkedVolumeCache::procedural(&TerrainConfig::default()).unwrap();
//! let voxel = cache.read_voxel(Point3::new(0, 0, 0)).unwrap();
//! assert!(!voxel.is_empty());
//! ```

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cgmath::Point3;
use log::{debug, error, info, warn};
use lru::LruCache;
use parking_lot::{Condvar, Mutex, MutexGuard, RwLockReadGuard, RwLockWriteGuard};
use web_time::Instant;

use crate::config::TerrainConfig;
use crate::core::MtResource;
use crate::error::{panic_message, TerrainError, TerrainResult};

use super::chunk::{ChunkCoordinate, ChunkDimensions, ChunkState, VoxelChunk};
use super::provider::{ProceduralProvider, VolumePager};
use super::region::Region;
use super::voxel::Voxel;
use super::{VoxelSink, VoxelVolume};

/// A chunk that finished paging in.
struct ResidentChunk {
    data: MtResource<VoxelChunk>,
    pins: Arc<AtomicUsize>,
    size_in_bytes: usize,
}

impl ResidentChunk {
    /// Must only be called with the map lock held.
    fn pin(&self, coord: ChunkCoordinate) -> ChunkRef {
        self.pins.fetch_add(1, Ordering::AcqRel);
        ChunkRef {
            coord,
            data: self.data.clone(),
            pins: self.pins.clone(),
        }
    }

    fn is_pinned(&self) -> bool {
        self.pins.load(Ordering::Acquire) > 0
    }
}

enum ChunkEntry {
    Paging,
    Resident(ResidentChunk),
    Evicting,
    Failed,
}

struct CacheState {
    chunks: HashMap<ChunkCoordinate, ChunkEntry>,
    /// Resident coordinates only, most recently used first.
    recency: LruCache<ChunkCoordinate, ()>,
    resident_bytes: usize,
}

impl CacheState {
    /// Picks the least recently used unpinned chunk and marks it `Evicting`.
    fn take_eviction_candidate(&mut self) -> Option<(ChunkCoordinate, ResidentChunk)> {
        let coord = self.recency.iter().rev().map(|(coord, _)| *coord).find(|coord| {
            matches!(self.chunks.get(coord), Some(ChunkEntry::Resident(resident)) if !resident.is_pinned())
        })?;
        self.recency.pop(&coord);
        match self.chunks.insert(coord, ChunkEntry::Evicting) {
            Some(ChunkEntry::Resident(resident)) => {
                self.resident_bytes -= resident.size_in_bytes;
                Some((coord, resident))
            }
            other => {
                // Recency only ever lists resident chunks.
                if let Some(entry) = other {
                    self.chunks.insert(coord, entry);
                }
                None
            }
        }
    }
}

/// Paged, memory-bounded chunk storage shared by every reader and writer.
pub struct ChunkedVolumeCache {
    pager: Arc<dyn VolumePager>,
    dimensions: ChunkDimensions,
    memory_budget: usize,
    world_bounds: Option<Region>,
    state: Mutex<CacheState>,
    transition: Condvar,
}

impl ChunkedVolumeCache {
    /// Creates an empty cache paging through `pager`.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn new(pager: Arc<dyn VolumePager>, config: &TerrainConfig) -> TerrainResult<Self> {
        config.validate()?;
        Ok(Self {
            pager,
            dimensions: config.chunk_dimensions(),
            memory_budget: config.memory_budget_bytes,
            world_bounds: config.world_bounds,
            state: Mutex::new(CacheState {
                chunks: HashMap::new(),
                recency: LruCache::unbounded(),
                resident_bytes: 0,
            }),
            transition: Condvar::new(),
        })
    }

    /// Creates an empty cache backed by a [`ProceduralProvider`] built from
    /// the same configuration.
    ///
    /// # Errors
    /// Same as [`ChunkedVolumeCache::new`].
    pub fn procedural(config: &TerrainConfig) -> TerrainResult<Self> {
        Self::new(Arc::new(ProceduralProvider::from_config(config)), config)
    }

    /// Size of every chunk.
    pub fn dimensions(&self) -> ChunkDimensions {
        self.dimensions
    }

    /// Configured hard bounds of the world, if any.
    pub fn world_bounds(&self) -> Option<Region> {
        self.world_bounds
    }

    /// Resident memory above which eviction starts.
    pub fn memory_budget(&self) -> usize {
        self.memory_budget
    }

    /// Bytes currently held by resident chunks.
    pub fn resident_bytes(&self) -> usize {
        self.state.lock().resident_bytes
    }

    /// Number of resident chunks.
    pub fn resident_chunks(&self) -> usize {
        self.state.lock().recency.len()
    }

    /// Current lifecycle state of a chunk.
    pub fn state(&self, coord: ChunkCoordinate) -> ChunkState {
        match self.state.lock().chunks.get(&coord) {
            None => ChunkState::Unloaded,
            Some(ChunkEntry::Paging) => ChunkState::Paging,
            Some(ChunkEntry::Resident(_)) => ChunkState::Resident,
            Some(ChunkEntry::Evicting) => ChunkState::Evicting,
            Some(ChunkEntry::Failed) => ChunkState::Failed,
        }
    }

    /// Returns the chunk at `coord`, paging it in if needed. The chunk stays
    /// pinned until the returned handle is dropped.
    ///
    /// # Errors
    /// Returns [`TerrainError::PagingFailed`] if the pager fails. The chunk is
    /// left `Failed` and the next call retries.
    pub fn get(&self, coord: ChunkCoordinate) -> TerrainResult<ChunkRef> {
        let mut guard = self.state.lock();
        loop {
            let state = &mut *guard;
            let in_transition = match state.chunks.get(&coord) {
                Some(ChunkEntry::Resident(resident)) => {
                    let chunk = resident.pin(coord);
                    state.recency.get(&coord);
                    return Ok(chunk);
                }
                Some(ChunkEntry::Paging | ChunkEntry::Evicting) => true,
                Some(ChunkEntry::Failed) | None => false,
            };
            if !in_transition {
                break;
            }
            self.transition.wait(&mut guard);
        }

        guard.chunks.insert(coord, ChunkEntry::Paging);
        let region = coord.region(self.dimensions);
        let start = Instant::now();
        let paged = MutexGuard::unlocked(&mut guard, || {
            panic::catch_unwind(AssertUnwindSafe(|| self.pager.page_in(&region)))
        });

        let field = match paged {
            Ok(Ok(field)) if field.region() == region => field,
            Ok(Ok(field)) => {
                let reason = format!("pager returned region {} instead of {}", field.region(), region);
                return Err(self.fail_paging(guard, coord, reason));
            }
            Ok(Err(e)) => return Err(self.fail_paging(guard, coord, e.reason)),
            Err(payload) => {
                let reason = format!("pager panicked: {}", panic_message(payload.as_ref()));
                return Err(self.fail_paging(guard, coord, reason));
            }
        };

        let chunk = VoxelChunk::new(coord, field);
        let resident = ResidentChunk {
            size_in_bytes: chunk.size_in_bytes(),
            data: MtResource::new(chunk),
            pins: Arc::new(AtomicUsize::new(0)),
        };
        let chunk_ref = resident.pin(coord);
        guard.resident_bytes += resident.size_in_bytes;
        guard.chunks.insert(coord, ChunkEntry::Resident(resident));
        guard.recency.push(coord, ());
        self.transition.notify_all();
        debug!(
            "Paged in chunk {} in {:?}, {} bytes resident",
            coord,
            start.elapsed(),
            guard.resident_bytes
        );

        self.enforce_budget(guard);
        Ok(chunk_ref)
    }

    fn fail_paging(
        &self,
        mut guard: MutexGuard<'_, CacheState>,
        coord: ChunkCoordinate,
        reason: String,
    ) -> TerrainError {
        warn!("Paging failed for chunk {}: {}", coord, reason);
        guard.chunks.insert(coord, ChunkEntry::Failed);
        self.transition.notify_all();
        TerrainError::PagingFailed { coord, reason }
    }

    /// Evicts unpinned chunks, least recently used first, until resident
    /// memory is within budget or only pinned chunks remain.
    fn enforce_budget(&self, mut guard: MutexGuard<'_, CacheState>) -> usize {
        let mut evicted = 0;
        while guard.resident_bytes > self.memory_budget {
            let Some((coord, resident)) = guard.take_eviction_candidate() else {
                debug!(
                    "Cache over budget ({} > {} bytes) with every chunk pinned",
                    guard.resident_bytes, self.memory_budget
                );
                break;
            };
            let paged_out = MutexGuard::unlocked(&mut guard, || {
                panic::catch_unwind(AssertUnwindSafe(|| {
                    let chunk = resident.data.get();
                    self.pager.page_out(&chunk.region(), &chunk);
                }))
            });
            if let Err(payload) = paged_out {
                error!("Pager panicked unloading chunk {}: {}", coord, panic_message(payload.as_ref()));
            }
            guard.chunks.remove(&coord);
            self.transition.notify_all();
            evicted += 1;
        }
        if evicted > 0 {
            info!(
                "Evicted {} chunks, {} bytes resident of {} budget",
                evicted, guard.resident_bytes, self.memory_budget
            );
        }
        evicted
    }

    /// Re-runs the budget check. Returns how many chunks were evicted.
    pub fn trim(&self) -> usize {
        self.enforce_budget(self.state.lock())
    }

    /// Ensures every chunk intersecting `region` (within the world bounds) is
    /// resident. Returns how many chunks were touched.
    ///
    /// # Errors
    /// Stops at the first chunk that fails to page in.
    pub fn prefetch(&self, region: &Region) -> TerrainResult<usize> {
        let Some(region) = self.clip(region) else {
            return Ok(0);
        };
        let mut touched = 0;
        for coord in region.chunk_coordinates(self.dimensions) {
            self.get(coord)?;
            touched += 1;
        }
        debug!("Prefetched region {} ({} chunks)", region, touched);
        Ok(touched)
    }

    /// Reads the voxel at a global position, paging its chunk in if needed.
    /// Positions outside the world bounds are empty.
    ///
    /// # Errors
    /// Returns [`TerrainError::PagingFailed`] if the chunk cannot be paged in.
    pub fn read_voxel(&self, position: Point3<i32>) -> TerrainResult<Voxel> {
        if !self.in_bounds(position) {
            return Ok(Voxel::EMPTY);
        }
        let chunk = self.get(ChunkCoordinate::containing(position, self.dimensions))?;
        let voxel = chunk.read().field.get(position).unwrap_or(Voxel::EMPTY);
        Ok(voxel)
    }

    /// Writes the voxel at a global position, paging its chunk in if needed.
    /// Writes outside the world bounds are dropped.
    ///
    /// Written voxels live only as long as the chunk stays resident.
    ///
    /// # Errors
    /// Returns [`TerrainError::PagingFailed`] if the chunk cannot be paged in.
    pub fn write_voxel(&self, position: Point3<i32>, voxel: Voxel) -> TerrainResult<()> {
        if !self.in_bounds(position) {
            return Ok(());
        }
        let chunk = self.get(ChunkCoordinate::containing(position, self.dimensions))?;
        chunk.write().field.set(position, voxel);
        Ok(())
    }

    /// Pins every chunk covering `region` for the lifetime of the returned
    /// read-only view.
    ///
    /// # Errors
    /// Returns [`TerrainError::PagingFailed`] if any chunk cannot be paged in.
    /// Chunks pinned so far are released.
    pub fn lease(&self, region: &Region) -> TerrainResult<RegionLease<'_>> {
        let mut chunks = HashMap::new();
        if let Some(clipped) = self.clip(region) {
            for coord in clipped.chunk_coordinates(self.dimensions) {
                chunks.insert(coord, self.get(coord)?);
            }
        }
        Ok(RegionLease {
            cache: self,
            region: *region,
            chunks,
        })
    }

    /// A sink writing through [`ChunkedVolumeCache::write_voxel`].
    pub fn writer(&self) -> CacheWriter<'_> {
        CacheWriter { cache: self }
    }

    fn in_bounds(&self, position: Point3<i32>) -> bool {
        self.world_bounds.map_or(true, |bounds| bounds.contains(position))
    }

    fn clip(&self, region: &Region) -> Option<Region> {
        match &self.world_bounds {
            Some(bounds) => bounds.intersection(region),
            None => Some(*region),
        }
    }
}

/// A pinned handle to a resident chunk.
///
/// The chunk cannot be evicted while any handle to it exists.
pub struct ChunkRef {
    coord: ChunkCoordinate,
    data: MtResource<VoxelChunk>,
    pins: Arc<AtomicUsize>,
}

impl ChunkRef {
    /// Coordinate of the pinned chunk.
    pub fn coord(&self) -> ChunkCoordinate {
        self.coord
    }

    /// Shared access to the chunk.
    pub fn read(&self) -> RwLockReadGuard<'_, VoxelChunk> {
        self.data.get()
    }

    /// Exclusive access to the chunk.
    pub fn write(&self) -> RwLockWriteGuard<'_, VoxelChunk> {
        self.data.get_mut()
    }
}

impl Drop for ChunkRef {
    fn drop(&mut self) {
        self.pins.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Read-only view over the cache that keeps a region's chunks pinned.
///
/// Positions inside the world bounds but outside the leased chunks are read
/// through the cache, paging in as needed.
pub struct RegionLease<'a> {
    cache: &'a ChunkedVolumeCache,
    region: Region,
    chunks: HashMap<ChunkCoordinate, ChunkRef>,
}

impl RegionLease<'_> {
    /// The region this lease was taken for.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Number of chunks pinned by this lease.
    pub fn pinned_chunks(&self) -> usize {
        self.chunks.len()
    }
}

impl VoxelVolume for RegionLease<'_> {
    fn bounds(&self) -> Option<Region> {
        self.cache.world_bounds
    }

    fn voxel(&self, position: Point3<i32>) -> Voxel {
        if !self.cache.in_bounds(position) {
            return Voxel::EMPTY;
        }
        let coord = ChunkCoordinate::containing(position, self.cache.dimensions);
        if let Some(chunk) = self.chunks.get(&coord) {
            return chunk.read().field.get(position).unwrap_or(Voxel::EMPTY);
        }
        self.cache.read_voxel(position).unwrap_or_else(|e| {
            warn!("Reading {:?} outside lease {}: {}", position, self.region, e);
            Voxel::EMPTY
        })
    }
}

/// Stamping sink that writes through the cache.
pub struct CacheWriter<'a> {
    cache: &'a ChunkedVolumeCache,
}

impl VoxelSink for CacheWriter<'_> {
    fn set_voxel(&mut self, position: Point3<i32>, voxel: Voxel) -> TerrainResult<()> {
        self.cache.write_voxel(position, voxel)
    }
}

impl VoxelVolume for ChunkedVolumeCache {
    fn bounds(&self) -> Option<Region> {
        self.world_bounds
    }

    fn voxel(&self, position: Point3<i32>) -> Voxel {
        self.read_voxel(position).unwrap_or_else(|e| {
            warn!("Reading {:?} failed: {}", position, e);
            Voxel::EMPTY
        })
    }
}
