use cgmath::Point3;
use voxel_terrain::config::TerrainConfig;
use voxel_terrain::meshing::{FaceSide, Mesh, SurfaceExtractor};
use voxel_terrain::streaming::{StreamEvent, TerrainStreamer};
use voxel_terrain::voxels::cache::ChunkedVolumeCache;
use voxel_terrain::voxels::chunk::{ChunkCoordinate, ChunkState};
use voxel_terrain::voxels::region::Region;

fn region(x0: i32, y0: i32, z0: i32, x1: i32, y1: i32, z1: i32) -> Region {
    Region::from_bounds(x0, y0, z0, x1, y1, z1).unwrap()
}

fn extract(cache: &ChunkedVolumeCache, extractor: &SurfaceExtractor, area: &Region) -> Mesh {
    let lease = cache.lease(&area.expanded(1)).unwrap();
    extractor.extract(&lease, area).unwrap()
}

/// Budget for exactly `chunks` resident 16x16x16 chunks of two-byte voxels.
fn tight_config(chunks: usize) -> TerrainConfig {
    TerrainConfig {
        chunk_size_xy: 16,
        chunk_size_z: 16,
        memory_budget_bytes: chunks * 16 * 16 * 16 * 2,
        ..TerrainConfig::default()
    }
}

#[test]
fn same_region_extracts_identically() {
    let area = region(0, 0, 0, 31, 31, 31);
    // Bounding the world to the region exposes its faces; unbounded, the
    // block is buried in solid ground and meshes to nothing.
    let config = TerrainConfig {
        seed: 234,
        chunk_size_xy: 32,
        world_bounds: Some(area),
        ..TerrainConfig::default()
    };
    let cache = ChunkedVolumeCache::procedural(&config).unwrap();
    let extractor = SurfaceExtractor::from_config(&config);

    let first = extract(&cache, &extractor, &area);
    let second = extract(&cache, &extractor, &area);
    assert!(!first.is_empty());
    assert!(first.vertices().iter().any(|v| v.side() == Some(FaceSide::BOTTOM)));
    assert_eq!(first.vertices(), second.vertices());
    assert_eq!(first.indices(), second.indices());
    assert!(first.indices_are_valid());
}

#[test]
fn separate_caches_with_one_seed_agree() {
    let config = TerrainConfig::default();
    let extractor = SurfaceExtractor::from_config(&config);
    let area = region(-40, 17, 96, -9, 48, 127);

    let a = ChunkedVolumeCache::procedural(&config).unwrap();
    let b = ChunkedVolumeCache::procedural(&config).unwrap();
    assert_eq!(extract(&a, &extractor, &area), extract(&b, &extractor, &area));
}

#[test]
fn eviction_does_not_change_extracted_geometry() {
    let config = tight_config(4);
    let cache = ChunkedVolumeCache::procedural(&config).unwrap();
    let extractor = SurfaceExtractor::from_config(&config);
    let area = region(0, 0, 112, 15, 15, 127);

    let before = extract(&cache, &extractor, &area);
    cache.prefetch(&region(1024, 0, 0, 1024 + 8 * 16 - 1, 15, 15)).unwrap();
    assert_eq!(cache.state(ChunkCoordinate::new(0, 0, 7)), ChunkState::Unloaded);
    assert!(cache.resident_bytes() <= cache.memory_budget());

    let after = extract(&cache, &extractor, &area);
    assert_eq!(before.vertices(), after.vertices());
    assert_eq!(before.indices(), after.indices());
}

#[test]
fn space_above_the_terrain_is_empty() {
    let config = TerrainConfig::default();
    let cache = ChunkedVolumeCache::procedural(&config).unwrap();
    let extractor = SurfaceExtractor::from_config(&config);
    let above = region(0, 0, 256, 31, 31, 287);

    for position in above.iter().step_by(97) {
        assert!(cache.read_voxel(position).unwrap().is_empty());
    }
    assert!(extract(&cache, &extractor, &above).is_empty());
}

#[test]
fn extracted_meshes_have_valid_indices() {
    let config = tight_config(64);
    let cache = ChunkedVolumeCache::procedural(&config).unwrap();
    let extractor = SurfaceExtractor::from_config(&config);

    let mut non_empty = 0;
    for z in (0..256).step_by(16) {
        let area = region(-8, -8, z, 7, 7, z + 15);
        let mesh = extract(&cache, &extractor, &area);
        assert!(mesh.indices_are_valid());
        assert_eq!(mesh.indices().len() % 6, 0);
        assert_eq!(mesh.vertices().len() / 4 * 6, mesh.indices().len());
        if !mesh.is_empty() {
            non_empty += 1;
        }
    }
    assert!(non_empty > 0, "the surface crosses at least one slice");
}

#[test]
fn streamed_meshes_match_direct_extraction() {
    let config = TerrainConfig {
        chunk_size_xy: 16,
        chunk_size_z: 16,
        worker_threads: 3,
        num_slots: 8,
        ..TerrainConfig::default()
    };
    let reference = ChunkedVolumeCache::procedural(&config).unwrap();
    let extractor = SurfaceExtractor::from_config(&config);
    let mut streamer = TerrainStreamer::new(config).unwrap();

    let areas: Vec<Region> = (0..8)
        .map(|i| region(i * 16, 0, 96 + (i % 4) * 16, i * 16 + 15, 15, 111 + (i % 4) * 16))
        .collect();
    let slots: Vec<usize> = areas
        .iter()
        .map(|area| streamer.request_mesh(*area).unwrap())
        .collect();

    let events = streamer.finish();
    assert_eq!(events.len(), areas.len());
    for event in events {
        let StreamEvent::MeshReady { region, slot, .. } = event else {
            panic!("unexpected event {event:?}");
        };
        let expected = extract(&reference, &extractor, &region);
        let streamed = streamer.mesh(slot).unwrap();
        assert_eq!(streamed.origin(), region.lower);
        assert_eq!(streamed.vertices(), expected.vertices());
        assert_eq!(streamed.indices(), expected.indices());
    }

    for slot in slots {
        streamer.release_mesh(slot).unwrap();
    }
    assert_eq!(streamer.pool().free_count(), 8);
}

#[test]
fn stamped_structures_show_up_in_streamed_meshes() {
    let config = TerrainConfig {
        chunk_size_xy: 16,
        chunk_size_z: 16,
        ..TerrainConfig::default()
    };
    let mut streamer = TerrainStreamer::new(config).unwrap();
    let sky = region(0, 0, 400, 15, 15, 415);

    streamer
        .cache()
        .write_voxel(Point3::new(8, 8, 408), voxel_terrain::voxels::voxel::Voxel::solid(7))
        .unwrap();
    let slot = streamer.request_mesh(sky).unwrap();
    let events = streamer.finish();
    assert!(matches!(
        &events[..],
        [StreamEvent::MeshReady { vertices: 24, indices: 36, .. }]
    ));
    assert!(streamer
        .mesh(slot)
        .unwrap()
        .vertices()
        .iter()
        .all(|v| v.material == 7));
}
