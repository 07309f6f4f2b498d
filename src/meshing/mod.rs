//! Surface extraction: turning voxel regions into renderable meshes.
//!
//! The extractor walks every voxel of a region and emits one quad per exposed
//! face of each solid voxel. Output goes into a [`Mesh`] with a hard
//! capacity, usually a slot borrowed from the [`MeshSlotPool`].
//!
//! # Architecture
//! - `SurfaceExtractor`: stateless `(volume, region) -> mesh` conversion
//! - `MeshSlotPool`: fixed set of pre-sized output buffers
//! - `Mesh`, `Face`, `Vertex`: the geometry itself
//!
//! # Face Emission
//! A face is emitted when the neighbour it looks at is not solid or lies
//! outside the volume's bounds. Neighbours outside the region but inside the
//! volume are read from the volume, so adjacent regions of an unbounded
//! volume mesh without seams between them.
//!
//! Faces are emitted x fastest, then y, then z, and per voxel in the
//! [`FaceSide::all`] order. Extraction is deterministic: the same voxels
//! always produce the same vertex and index sequences.
//!
//! # Overflow
//! Exceeding the vertex or index capacity aborts the extraction. The output
//! mesh is cleared rather than left truncated.

use cgmath::Point3;
use log::{debug, warn};
use web_time::Instant;

use crate::config::TerrainConfig;
use crate::error::TerrainResult;
use crate::voxels::region::Region;
use crate::voxels::VoxelVolume;

mod face;
mod face_side;
mod mesh;
mod slot_pool;
mod vertex;

pub use face::Face;
pub use face_side::{FaceSide, NORMAL_TABLE};
pub use mesh::{Mesh, MeshLimits};
pub use slot_pool::MeshSlotPool;
pub use vertex::Vertex;

/// Converts voxel regions into indexed triangle meshes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SurfaceExtractor {
    limits: MeshLimits,
    solidity_threshold: u8,
}

impl SurfaceExtractor {
    /// Creates an extractor with explicit capacity and solidity threshold.
    pub fn new(limits: MeshLimits, solidity_threshold: u8) -> Self {
        SurfaceExtractor {
            limits,
            solidity_threshold,
        }
    }

    /// Creates an extractor from the configured capacity and threshold.
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(MeshLimits::from_config(config), config.solidity_threshold)
    }

    /// Capacity enforced on every extraction.
    pub fn limits(&self) -> MeshLimits {
        self.limits
    }

    /// Extracts `region` of `volume` into a new mesh.
    ///
    /// # Errors
    /// Returns [`TerrainError::Overflow`](crate::error::TerrainError::Overflow)
    /// if the surface needs more vertices or indices than the limits allow.
    pub fn extract<V: VoxelVolume + ?Sized>(&self, volume: &V, region: &Region) -> TerrainResult<Mesh> {
        let mut mesh = Mesh::new(self.limits);
        self.extract_into(volume, region, &mut mesh)?;
        Ok(mesh)
    }

    /// Extracts `region` of `volume` into `mesh`, replacing its contents and
    /// reusing its buffers. The tighter of the extractor's and the mesh's
    /// limits applies.
    ///
    /// # Errors
    /// Returns [`TerrainError::Overflow`](crate::error::TerrainError::Overflow)
    /// on overflow, leaving `mesh` empty.
    pub fn extract_into<V: VoxelVolume + ?Sized>(
        &self,
        volume: &V,
        region: &Region,
        mesh: &mut Mesh,
    ) -> TerrainResult<()> {
        let start = Instant::now();
        mesh.reset(region.lower);

        for position in region.iter() {
            let voxel = volume.voxel(position);
            if !voxel.is_solid(self.solidity_threshold) {
                continue;
            }
            let local = position - region.lower;
            for side in FaceSide::all() {
                if self.is_occluded(volume, position, side) {
                    continue;
                }
                let face = Face::new(local.x, local.y, local.z, voxel.material, side);
                if let Err(e) = mesh.push_quad(&face, self.limits) {
                    warn!("Extraction of region {} aborted: {}", region, e);
                    mesh.clear();
                    return Err(e);
                }
            }
        }

        debug!(
            "Extracted region {}: {} vertices, {} indices in {:?}",
            region,
            mesh.vertices().len(),
            mesh.indices().len(),
            start.elapsed()
        );
        Ok(())
    }

    /// Returns `true` if the face on `side` of `position` is hidden by a solid
    /// neighbour.
    fn is_occluded<V: VoxelVolume + ?Sized>(&self, volume: &V, position: Point3<i32>, side: FaceSide) -> bool {
        let neighbour = position + side.offset();
        if volume.bounds().is_some_and(|bounds| !bounds.contains(neighbour)) {
            return false;
        }
        volume.voxel(neighbour).is_solid(self.solidity_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerrainError;
    use crate::voxels::field::VoxelField;
    use crate::voxels::voxel::{materials, Voxel};

    fn extractor() -> SurfaceExtractor {
        SurfaceExtractor::from_config(&TerrainConfig::default())
    }

    fn region(x0: i32, y0: i32, z0: i32, x1: i32, y1: i32, z1: i32) -> Region {
        Region::from_bounds(x0, y0, z0, x1, y1, z1).unwrap()
    }

    #[test]
    fn single_voxel_yields_six_outward_quads() {
        let area = region(0, 0, 0, 2, 2, 2);
        let mut field = VoxelField::empty(area);
        field.set(Point3::new(1, 1, 1), Voxel::solid(materials::SOLID));

        let mesh = extractor().extract(&field, &area).unwrap();
        assert_eq!(mesh.vertices().len(), 24);
        assert_eq!(mesh.indices().len(), 36);
        assert!(mesh.indices_are_valid());
        assert_eq!(mesh.origin(), area.lower);

        for (quad, side) in mesh.vertices().chunks(4).zip(FaceSide::all()) {
            assert!(quad.iter().all(|v| v.side() == Some(side)));
            assert!(quad.iter().all(|v| v.material == u32::from(materials::SOLID)));
        }
    }

    #[test]
    fn touching_voxels_hide_shared_faces() {
        let area = region(0, 0, 0, 3, 3, 3);
        let mut field = VoxelField::empty(area);
        field.set(Point3::new(1, 1, 1), Voxel::solid(1));
        field.set(Point3::new(2, 1, 1), Voxel::solid(2));

        let mesh = extractor().extract(&field, &area).unwrap();
        assert_eq!(mesh.vertices().len(), 10 * 4);
        assert!(!mesh
            .vertices()
            .iter()
            .any(|v| v.material == 1 && v.side() == Some(FaceSide::EAST)));
    }

    #[test]
    fn density_threshold_decides_solidity() {
        let area = region(0, 0, 0, 1, 1, 1);
        let mut field = VoxelField::empty(area);
        field.set(Point3::new(0, 0, 0), Voxel::new(materials::SOLID, 127));
        assert!(extractor().extract(&field, &area).unwrap().is_empty());

        field.set(Point3::new(0, 0, 0), Voxel::new(materials::SOLID, 128));
        assert_eq!(extractor().extract(&field, &area).unwrap().vertices().len(), 24);
    }

    #[test]
    fn field_bounds_always_emit_faces() {
        let area = region(0, 0, 0, 1, 1, 1);
        let field = VoxelField::filled(area, Voxel::solid(materials::SOLID));
        let mesh = extractor().extract(&field, &area).unwrap();
        // A solid 2x2x2 block shows 4 quads per side.
        assert_eq!(mesh.vertices().len(), 6 * 4 * 4);
    }

    #[test]
    fn sub_region_reads_neighbours_outside_itself() {
        let area = region(0, 0, 0, 3, 3, 3);
        let field = VoxelField::filled(area, Voxel::solid(materials::SOLID));
        let inner = region(1, 1, 1, 2, 2, 2);
        assert!(extractor().extract(&field, &inner).unwrap().is_empty());
    }

    #[test]
    fn positions_are_local_to_the_region() {
        let area = region(-10, 20, -5, -9, 21, -4);
        let mut field = VoxelField::empty(area);
        field.set(Point3::new(-10, 20, -5), Voxel::solid(1));
        let mesh = extractor().extract(&field, &area).unwrap();
        assert!(mesh
            .vertices()
            .iter()
            .all(|v| v.position.iter().all(|c| (0..=1).contains(c))));
    }

    #[test]
    fn overflow_is_reported_not_truncated() {
        let area = region(0, 0, 0, 7, 7, 7);
        let mut field = VoxelField::empty(area);
        for position in area.iter() {
            if (position.x + position.y + position.z) % 2 == 0 {
                field.set(position, Voxel::solid(materials::SOLID));
            }
        }
        let small = SurfaceExtractor::new(MeshLimits::new(1024, 1536), 127);
        let mut mesh = Mesh::new(MeshLimits::new(1 << 16, 1 << 17));
        let err = small.extract_into(&field, &area, &mut mesh).unwrap_err();
        assert!(matches!(err, TerrainError::Overflow { max_vertices: 1024, .. }));
        assert!(mesh.is_empty());
        assert!(mesh.vertices().is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let area = region(0, 0, 0, 5, 5, 5);
        let mut field = VoxelField::empty(area);
        for position in area.iter().filter(|p| p.z <= p.x) {
            field.set(position, Voxel::solid(materials::SOLID));
        }
        let first = extractor().extract(&field, &area).unwrap();
        let mut second = Mesh::with_capacity(extractor().limits());
        extractor().extract_into(&field, &area, &mut second).unwrap();
        assert_eq!(first.vertices(), second.vertices());
        assert_eq!(first.indices(), second.indices());
        assert!(first.indices_are_valid());
    }
}
