//! # Structures
//!
//! Trees and clouds assembled from the stamping primitives. None of this runs
//! during page-in; callers opt in by writing structures through a sink, for
//! example [`ChunkedVolumeCache::writer`].
//!
//! Structures written into the cache are not persisted. Once the chunks
//! holding them are evicted they regenerate as plain terrain.

use cgmath::{Point3, Vector3};
use log::debug;

use crate::error::{TerrainError, TerrainResult};
use crate::voxels::cache::ChunkedVolumeCache;
use crate::voxels::region::Region;
use crate::voxels::voxel::{materials, Voxel};
use crate::voxels::{VoxelSink, VoxelVolume};

use super::stamping::{stamp_cone, stamp_dome, stamp_ellipsoid};

/// Crown width of every tree.
pub const CROWN_WIDTH: i32 = 16;
/// Crown depth of every tree.
pub const CROWN_DEPTH: i32 = 16;
/// Crown height of every tree.
pub const CROWN_HEIGHT: i32 = 12;

/// Shape of a tree crown.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TreeType {
    /// Ellipsoid centred above the trunk.
    ELLIPSOID,
    /// Cone standing on the trunk.
    CONE,
    /// Dome standing on the trunk. Not implemented.
    DOME,
}

impl TreeType {
    /// The shapes that can currently be stamped.
    pub fn supported() -> [TreeType; 2] {
        [TreeType::ELLIPSOID, TreeType::CONE]
    }
}

/// Stamps a tree whose trunk starts at `base`.
///
/// The trunk tapers from a 6x6 cross (corners left out) to a single column
/// over its first few voxels and is `trunk_height` voxels tall.
///
/// # Errors
/// Returns [`TerrainError::Unsupported`] for [`TreeType::DOME`] before
/// writing anything, or whatever the sink reports.
pub fn add_tree<S: VoxelSink + ?Sized>(
    sink: &mut S,
    base: Point3<i32>,
    tree_type: TreeType,
    trunk_height: i32,
) -> TerrainResult<()> {
    if tree_type == TreeType::DOME {
        return Err(TerrainError::Unsupported("dome tree crowns"));
    }
    debug!("Generating {:?} tree at {:?}", tree_type, base);

    let trunk = Voxel::solid(materials::TRUNK);
    let top = base.z + trunk_height;
    for z in base.z..top {
        let width = (3 - (z - base.z)).max(1);
        for y in base.y - width..base.y + width {
            for x in base.x - width..base.x + width {
                let outside_x = x >= base.x + 1 || x < base.x - 1;
                let outside_y = y >= base.y + 1 || y < base.y - 1;
                if outside_x && outside_y {
                    continue;
                }
                sink.set_voxel(Point3::new(x, y, z), trunk)?;
            }
        }
    }

    let leaves = Voxel::solid(materials::LEAVES);
    match tree_type {
        TreeType::ELLIPSOID => {
            let center = Point3::new(base.x, base.y, top + CROWN_HEIGHT / 2);
            stamp_ellipsoid(sink, center, CROWN_WIDTH, CROWN_HEIGHT, CROWN_DEPTH, leaves)
        }
        TreeType::CONE => {
            let crown_base = Point3::new(base.x, base.y, top);
            stamp_cone(sink, crown_base, CROWN_WIDTH, CROWN_HEIGHT, CROWN_DEPTH, leaves)
        }
        TreeType::DOME => {
            let crown_base = Point3::new(base.x, base.y, top);
            stamp_dome(sink, crown_base, CROWN_WIDTH, CROWN_HEIGHT, CROWN_DEPTH, leaves)
        }
    }
}

/// Stamps a cloud: a small ellipsoid at `center` and a wider, flatter one
/// offset diagonally from it.
pub fn add_clouds<S: VoxelSink + ?Sized>(sink: &mut S, center: Point3<i32>) -> TerrainResult<()> {
    const HEIGHT: i32 = 10;
    let cloud = Voxel::solid(materials::CLOUD);
    debug!("Generating clouds at {:?}", center);
    stamp_ellipsoid(sink, center, 10, HEIGHT, 10, cloud)?;
    stamp_ellipsoid(sink, center - Vector3::new(5, 5, 0), 20, HEIGHT, 35, cloud)
}

/// Scans column `(x, y)` from `z_top` down to `z_bottom` and returns the
/// position just above the first non-empty voxel, or `None` if the column is
/// empty.
pub fn find_surface<V: VoxelVolume + ?Sized>(
    volume: &V,
    x: i32,
    y: i32,
    z_top: i32,
    z_bottom: i32,
) -> Option<i32> {
    (z_bottom..=z_top)
        .rev()
        .find(|z| !volume.voxel(Point3::new(x, y, *z)).is_empty())
        .map(|z| z + 1)
}

/// Plants `count` trees at seeded random columns of `region`, each standing
/// on the terrain surface found between `region.upper.z` and
/// `region.lower.z`. Columns without a surface are skipped.
///
/// Returns how many trees were planted.
///
/// # Errors
/// Returns [`TerrainError::PagingFailed`] if a chunk cannot be paged in.
pub fn plant_forest(
    cache: &ChunkedVolumeCache,
    region: &Region,
    count: usize,
    seed: u64,
) -> TerrainResult<usize> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut planted = 0;
    for _ in 0..count {
        let x = rng.i32(region.lower.x..=region.upper.x);
        let y = rng.i32(region.lower.y..=region.upper.y);
        let shapes = TreeType::supported();
        let tree_type = shapes[rng.usize(..shapes.len())];
        let trunk_height = rng.i32(4..=8);

        let column = Region::new(
            Point3::new(x, y, region.lower.z),
            Point3::new(x, y, region.upper.z),
        )?;
        let surface = {
            let lease = cache.lease(&column)?;
            find_surface(&lease, x, y, region.upper.z, region.lower.z)
        };
        let Some(z) = surface else {
            continue;
        };
        add_tree(&mut cache.writer(), Point3::new(x, y, z), tree_type, trunk_height)?;
        planted += 1;
    }
    debug!("Planted {} of {} trees in {}", planted, count, region);
    Ok(planted)
}
