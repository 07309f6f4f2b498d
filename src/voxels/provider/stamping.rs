//! # Stamping Primitives
//!
//! Parametric solids written voxel by voxel into any [`VoxelSink`]. Writes
//! that fall outside the sink are clipped by the sink itself, so a solid may
//! straddle a field's border or span several chunks of the cache.
//!
//! Horizontal cross-sections are built from [`stamp_circle_plane`]; the
//! ellipsoid and the cone only differ in how the slice radius changes with
//! height. Fractional sample positions are floored onto the voxel grid.

use cgmath::{Point3, Vector3};

use crate::error::{TerrainError, TerrainResult};
use crate::voxels::voxel::Voxel;
use crate::voxels::VoxelSink;

/// Fills the box of `extents` voxels whose lowest corner is `origin`.
pub fn stamp_cube<S: VoxelSink + ?Sized>(
    sink: &mut S,
    origin: Point3<i32>,
    extents: Vector3<i32>,
    voxel: Voxel,
) -> TerrainResult<()> {
    for z in 0..extents.z {
        for y in 0..extents.y {
            for x in 0..extents.x {
                sink.set_voxel(origin + Vector3::new(x, y, z), voxel)?;
            }
        }
    }
    Ok(())
}

/// Fills a one-voxel-thick horizontal slab of `width x depth` voxels.
pub fn stamp_plane<S: VoxelSink + ?Sized>(
    sink: &mut S,
    origin: Point3<i32>,
    width: i32,
    depth: i32,
    voxel: Voxel,
) -> TerrainResult<()> {
    stamp_cube(sink, origin, Vector3::new(width, depth, 1), voxel)
}

/// Fills a horizontal disk at `center.z`.
///
/// The sample grid spans `width x depth` voxels around `center`. Distances
/// are measured after squeezing the longer axis by the aspect ratio, so a
/// `radius` of half the shorter side yields an ellipse touching all four
/// edges. Samples strictly closer than `radius` are written.
pub fn stamp_circle_plane<S: VoxelSink + ?Sized>(
    sink: &mut S,
    center: Point3<i32>,
    width: i32,
    depth: i32,
    radius: f64,
    voxel: Voxel,
) -> TerrainResult<()> {
    if width <= 0 || depth <= 0 || !(radius > 0.0) {
        return Ok(());
    }
    let x_radius = f64::from(width - 1) / 2.0;
    let y_radius = f64::from(depth - 1) / 2.0;
    let min_radius = x_radius.min(y_radius);
    let (x_ratio, y_ratio) = if min_radius > 0.0 {
        (x_radius / min_radius, y_radius / min_radius)
    } else {
        (1.0, 1.0)
    };

    let mut y = -y_radius;
    while y <= y_radius {
        let mut x = -x_radius;
        while x <= x_radius {
            let distance = (x / x_ratio).hypot(y / y_ratio);
            if distance < radius {
                let position = Point3::new(
                    center.x + x.floor() as i32,
                    center.y + y.floor() as i32,
                    center.z,
                );
                sink.set_voxel(position, voxel)?;
            }
            x += 1.0;
        }
        y += 1.0;
    }
    Ok(())
}

/// Fills an ellipsoid of `width x depth` voxels horizontally and `height`
/// voxels vertically, centred on `origin`.
pub fn stamp_ellipsoid<S: VoxelSink + ?Sized>(
    sink: &mut S,
    origin: Point3<i32>,
    width: i32,
    height: i32,
    depth: i32,
    voxel: Voxel,
) -> TerrainResult<()> {
    if width <= 0 || height <= 0 || depth <= 0 {
        return Ok(());
    }
    let height_radius = f64::from(height - 1) / 2.0;
    let min_radius = f64::from(width.min(depth) - 1) / 2.0;
    let height_factor = height_radius / min_radius;

    let mut z = -height_radius;
    while z <= height_radius {
        let adjusted_height = if height_factor.is_finite() && height_factor > 0.0 {
            (z / height_factor).abs()
        } else {
            0.0
        };
        let slice_radius = ((min_radius + 0.5).powi(2) - adjusted_height.powi(2)).max(0.0).sqrt();
        let slice_center = Point3::new(origin.x, origin.y, origin.z + z.floor() as i32);
        stamp_circle_plane(sink, slice_center, width, depth, slice_radius, voxel)?;
        z += 1.0;
    }
    Ok(())
}

/// Fills a cone standing on `origin` whose radius shrinks linearly from half
/// the shorter of `width` and `depth` at the base to zero at `height`.
pub fn stamp_cone<S: VoxelSink + ?Sized>(
    sink: &mut S,
    origin: Point3<i32>,
    width: i32,
    height: i32,
    depth: i32,
    voxel: Voxel,
) -> TerrainResult<()> {
    if width <= 0 || height <= 0 || depth <= 0 {
        return Ok(());
    }
    let base_radius = f64::from(width.min(depth)) / 2.0;
    let height = f64::from(height);

    let mut z = 0.5;
    while z <= height - 0.5 {
        let slice_radius = (1.0 - z / height) * base_radius;
        let slice_center = Point3::new(origin.x, origin.y, origin.z + z.floor() as i32);
        stamp_circle_plane(sink, slice_center, width, depth, slice_radius, voxel)?;
        z += 1.0;
    }
    Ok(())
}

/// Dome stamping has no geometry yet.
///
/// # Errors
/// Always returns [`TerrainError::Unsupported`].
pub fn stamp_dome<S: VoxelSink + ?Sized>(
    _sink: &mut S,
    _origin: Point3<i32>,
    _width: i32,
    _height: i32,
    _depth: i32,
    _voxel: Voxel,
) -> TerrainResult<()> {
    Err(TerrainError::Unsupported("dome stamping"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::field::VoxelField;
    use crate::voxels::region::Region;
    use crate::voxels::voxel::materials;

    const LEAF: Voxel = Voxel::solid(materials::LEAVES);

    fn field() -> VoxelField {
        VoxelField::empty(Region::from_bounds(-16, -16, -16, 15, 15, 15).unwrap())
    }

    fn solid_count(field: &VoxelField) -> usize {
        field.voxels().iter().filter(|v| !v.is_empty()).count()
    }

    fn layer_count(field: &VoxelField, z: i32) -> usize {
        let region = field.region();
        Region::from_bounds(region.lower.x, region.lower.y, z, region.upper.x, region.upper.y, z)
            .unwrap()
            .iter()
            .filter(|p| field.get(*p).is_some_and(|v| !v.is_empty()))
            .count()
    }

    #[test]
    fn cube_fills_its_extents() {
        let mut field = field();
        stamp_cube(&mut field, Point3::new(0, 0, 0), Vector3::new(2, 3, 4), LEAF).unwrap();
        assert_eq!(solid_count(&field), 24);
        assert_eq!(field.get(Point3::new(1, 2, 3)), Some(LEAF));
        assert_eq!(field.get(Point3::new(2, 2, 3)), Some(Voxel::EMPTY));
    }

    #[test]
    fn plane_is_one_voxel_thick() {
        let mut field = field();
        stamp_plane(&mut field, Point3::new(-2, -2, 5), 4, 6, LEAF).unwrap();
        assert_eq!(solid_count(&field), 24);
        assert_eq!(layer_count(&field, 5), 24);
    }

    #[test]
    fn circle_plane_is_a_disk() {
        let mut field = field();
        stamp_circle_plane(&mut field, Point3::new(0, 0, 0), 5, 5, 2.5, LEAF).unwrap();
        // Lattice points with x^2 + y^2 < 6.25.
        assert_eq!(solid_count(&field), 21);
        assert_eq!(field.get(Point3::new(2, 2, 0)), Some(Voxel::EMPTY));
        assert_eq!(field.get(Point3::new(2, 1, 0)), Some(LEAF));
    }

    #[test]
    fn circle_plane_handles_degenerate_sizes() {
        let mut field = field();
        stamp_circle_plane(&mut field, Point3::new(0, 0, 0), 1, 1, 0.5, LEAF).unwrap();
        assert_eq!(solid_count(&field), 1);
        stamp_circle_plane(&mut field, Point3::new(3, 3, 3), 0, 4, 3.0, LEAF).unwrap();
        assert_eq!(solid_count(&field), 1);
    }

    #[test]
    fn ellipsoid_is_symmetric_and_bounded() {
        let mut field = field();
        stamp_ellipsoid(&mut field, Point3::new(0, 0, 0), 9, 5, 9, LEAF).unwrap();
        assert_eq!(field.get(Point3::new(0, 0, 0)), Some(LEAF));
        assert_eq!(layer_count(&field, -2), layer_count(&field, 2));
        assert!(layer_count(&field, 0) > layer_count(&field, 2));
        assert_eq!(layer_count(&field, 3), 0);
        assert_eq!(layer_count(&field, -3), 0);
    }

    #[test]
    fn cone_narrows_towards_the_apex() {
        let mut field = field();
        stamp_cone(&mut field, Point3::new(0, 0, 0), 8, 4, 8, LEAF).unwrap();
        let layers: Vec<_> = (0..4).map(|z| layer_count(&field, z)).collect();
        assert!(layers[0] > 0);
        assert!(layers.windows(2).all(|pair| pair[0] >= pair[1]), "{layers:?}");
        assert_eq!(layer_count(&field, -1), 0);
    }

    #[test]
    fn stamps_are_clipped_by_the_sink() {
        let mut field = field();
        stamp_cube(&mut field, Point3::new(14, 14, 14), Vector3::new(4, 4, 4), LEAF).unwrap();
        assert_eq!(solid_count(&field), 8);
    }

    #[test]
    fn dome_is_unsupported() {
        let mut field = field();
        let err = stamp_dome(&mut field, Point3::new(0, 0, 0), 4, 4, 4, LEAF).unwrap_err();
        assert!(matches!(err, TerrainError::Unsupported(_)));
        assert_eq!(solid_count(&field), 0);
    }
}
