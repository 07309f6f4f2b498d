#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Terrain
//!
//! A streaming voxel terrain core: procedurally generated chunks paged into a
//! memory-bounded cache, turned into triangle meshes on worker threads and
//! handed out through a fixed pool of mesh slots.
//!
//! ## Key Modules
//!
//! * `voxels` - Voxel data, regions, chunks, the chunk cache and the providers
//!   that fill it
//! * `meshing` - Surface extraction and the mesh slot pool
//! * `streaming` - Worker pool driving prefetch and extraction requests
//! * `config` - Serde-backed configuration
//! * `error` - The crate-wide error type
//! * `core` - Shared resource wrapper used across threads
//!
//! ## Architecture
//!
//! The crate keeps a clear separation between:
//! * Voxel generation (`VolumePager` implementations)
//! * Voxel storage and paging (`ChunkedVolumeCache`)
//! * Geometry generation (`SurfaceExtractor`)
//! * Output memory (`MeshSlotPool`)
//! * Scheduling (`TerrainStreamer`)
//!
//! Terrain is regenerated deterministically from the seed instead of being
//! persisted, so an evicted chunk reads back exactly as it was generated.
//!
//! ## Usage
//!
//! ```rust
//! use voxel_terrain::config::TerrainConfig;
//! use voxel_terrain::streaming::TerrainStreamer;
//! use voxel_terrain::voxels::region::Region;
//!
//! voxel_terrain::init_logging();
//! let mut streamer = TerrainStreamer::new(TerrainConfig::default()).unwrap();
//! let slot = streamer
//!     .request_mesh(Region::from_bounds(0, 0, 224, 31, 31, 255).unwrap())
//!     .unwrap();
//! let events = streamer.finish();
//! assert_eq!(events.len(), 1);
//! streamer.release_mesh(slot).unwrap();
//! ```

use cgmath::Point3;
use log::{info, warn};
use web_time::Instant;

pub mod config;
pub mod core;
pub mod error;
pub mod meshing;
pub mod streaming;
pub mod voxels;

use config::TerrainConfig;
use error::TerrainResult;
use streaming::{StreamEvent, TerrainStreamer};
use voxels::provider::structures::{add_clouds, plant_forest};
use voxels::region::Region;

/// Name of the timer logged around the demo run.
pub const STREAMING_DEMO_STOPWATCH: &str = "Streaming Demo";

/// Seed of the demo forest.
const DEMO_FOREST_SEED: u64 = 0x5eed;

/// Initialises `env_logger`, writing to stdout and filtered by `RUST_LOG`.
///
/// Calling it more than once is harmless.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    let _ = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init();
}

/// Streams a column of terrain with the default configuration and logs what
/// happened.
///
/// # Errors
/// Returns the first error that prevents a request from being scheduled.
/// Failures of individual requests are logged and do not stop the run.
pub fn run() -> TerrainResult<()> {
    init_logging();
    info!("Logger initialized");

    let start = Instant::now();
    let config = TerrainConfig::default();
    let chunk_xy = config.chunk_size_xy;
    let chunk_z = config.chunk_size_z;
    let column_height = config.max_height as i32;
    let mut streamer = TerrainStreamer::new(config)?;

    let forest_area = Region::from_bounds(0, 0, 0, 2 * chunk_xy - 1, 2 * chunk_xy - 1, column_height)?;
    let planted = plant_forest(streamer.cache(), &forest_area, 8, DEMO_FOREST_SEED)?;
    add_clouds(
        &mut streamer.cache().writer(),
        Point3::new(chunk_xy, chunk_xy, column_height - 12),
    )?;
    info!("Planted {} trees and one cloud in {}", planted, forest_area);

    streamer.prefetch(Region::from_bounds(
        2 * chunk_xy,
        0,
        0,
        3 * chunk_xy - 1,
        chunk_xy - 1,
        column_height,
    )?)?;

    let mut z = 0;
    while z <= column_height {
        let region = Region::from_bounds(0, 0, z, chunk_xy - 1, chunk_xy - 1, z + chunk_z - 1)?;
        match streamer.request_mesh(region) {
            Ok(slot) => info!("Requested mesh of {} into slot {}", region, slot),
            Err(e) => warn!("Could not request mesh of {}: {}", region, e),
        }
        z += chunk_z;
    }

    for event in streamer.finish() {
        match event {
            StreamEvent::RegionPrefetched { region, chunks } => {
                info!("Prefetched {} ({} chunks)", region, chunks)
            }
            StreamEvent::MeshReady {
                region,
                slot,
                vertices,
                indices,
            } => {
                info!(
                    "Mesh of {} ready in slot {}: {} vertices, {} indices",
                    region, slot, vertices, indices
                );
                streamer.release_mesh(slot)?;
            }
            StreamEvent::RequestFailed { region, slot, error } => {
                warn!("Request for {} (slot {:?}) failed: {}", region, slot, error)
            }
        }
    }

    info!(
        "{}: {} chunks resident, {} bytes, finished in {:?}",
        STREAMING_DEMO_STOPWATCH,
        streamer.cache().resident_chunks(),
        streamer.cache().resident_bytes(),
        start.elapsed()
    );
    Ok(())
}
