//! # Procedural Provider
//!
//! Deterministic height-field terrain. For a fixed seed, paging the same
//! region always produces the same voxels, which is what lets the cache throw
//! chunks away under memory pressure and regenerate them later.
//!
//! ## Generation
//!
//! For every column `(x, y)`:
//! 1. Sample 2D fractal Perlin noise (2 octaves, base frequency 2.0) at
//!    `(x / noise_width, y / noise_width)`.
//! 2. Map the sample from `[-1, 1]` to `[0, max_height]`.
//! 3. Every `z` below that height is solid, except inside a tunnel running
//!    along the y axis at `x = 50, z = 100`.

use log::{debug, info};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::config::TerrainConfig;
use crate::error::PagingError;
use crate::voxels::chunk::VoxelChunk;
use crate::voxels::field::VoxelField;
use crate::voxels::region::Region;
use crate::voxels::voxel::{materials, Voxel};

use super::VolumePager;

/// Number of fBm octaves summed per sample.
pub const NOISE_OCTAVES: usize = 2;
/// Base frequency of the first octave.
pub const NOISE_FREQUENCY: f64 = 2.0;

/// Tunnel centre on the x axis.
pub const TUNNEL_X: i32 = 50;
/// Tunnel centre on the z axis.
pub const TUNNEL_Z: i32 = 100;
/// Squared tunnel radius. Positions strictly closer are carved out.
pub const TUNNEL_RADIUS_SQUARED: i64 = 200;

/// Pager producing seeded Perlin height-field terrain.
pub struct ProceduralProvider {
    noise: Fbm<Perlin>,
    seed: u32,
    max_height: f64,
    noise_width: f64,
}

impl ProceduralProvider {
    /// Creates a provider for `seed` with the default height and noise width.
    pub fn new(seed: u32) -> Self {
        let defaults = TerrainConfig::default();
        Self::with_shape(seed, defaults.max_height, defaults.noise_width)
    }

    /// Creates a provider from the terrain options of a configuration.
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::with_shape(config.seed, config.max_height, config.noise_width)
    }

    fn with_shape(seed: u32, max_height: f64, noise_width: f64) -> Self {
        let noise = Fbm::<Perlin>::new(seed)
            .set_octaves(NOISE_OCTAVES)
            .set_frequency(NOISE_FREQUENCY);
        Self {
            noise,
            seed,
            max_height,
            noise_width,
        }
    }

    /// The seed this provider was built with.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Terrain height of column `(x, y)`. Voxels with `z < height` are solid.
    ///
    /// # Errors
    /// Returns a [`PagingError`] if the noise sample is not a finite number.
    pub fn height_at(&self, x: i32, y: i32) -> Result<f64, PagingError> {
        let sample = self
            .noise
            .get([x as f64 / self.noise_width, y as f64 / self.noise_width]);
        if !sample.is_finite() {
            return Err(PagingError::new(format!(
                "noise sample at column ({x}, {y}) is not finite"
            )));
        }
        Ok((sample.clamp(-1.0, 1.0) + 1.0) * 0.5 * self.max_height)
    }

    /// Returns `true` if `(x, z)` lies inside the tunnel.
    pub fn in_tunnel(x: i32, z: i32) -> bool {
        let dx = i64::from(x) - i64::from(TUNNEL_X);
        let dz = i64::from(z) - i64::from(TUNNEL_Z);
        (dx * dx).saturating_add(dz * dz) < TUNNEL_RADIUS_SQUARED
    }

    /// The voxel at `(x, z)` of a column whose terrain reaches `height`.
    fn column_voxel(x: i32, z: i32, height: f64) -> Voxel {
        if (z as f64) < height && !Self::in_tunnel(x, z) {
            Voxel::solid(materials::SOLID)
        } else {
            Voxel::EMPTY
        }
    }
}

impl VolumePager for ProceduralProvider {
    fn page_in(&self, region: &Region) -> Result<VoxelField, PagingError> {
        let mut field = VoxelField::empty(*region);
        for y in region.lower.y..=region.upper.y {
            for x in region.lower.x..=region.upper.x {
                let height = self.height_at(x, y)?;
                if (region.lower.z as f64) >= height {
                    // Whole column segment is above the surface.
                    continue;
                }
                for z in region.lower.z..=region.upper.z {
                    field.set(cgmath::Point3::new(x, y, z), Self::column_voxel(x, z, height));
                }
            }
        }
        debug!("Paged in region {}", region);
        Ok(field)
    }

    fn page_out(&self, region: &Region, chunk: &VoxelChunk) {
        info!("Unloading region {} (chunk {})", region, chunk.coord);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::VoxelVolume;
    use cgmath::Point3;

    fn region(x0: i32, y0: i32, z0: i32, x1: i32, y1: i32, z1: i32) -> Region {
        Region::from_bounds(x0, y0, z0, x1, y1, z1).unwrap()
    }

    #[test]
    fn page_in_is_deterministic() {
        let provider = ProceduralProvider::new(234);
        let area = region(0, 0, 0, 15, 15, 63);
        let first = provider.page_in(&area).unwrap();
        let second = ProceduralProvider::new(234).page_in(&area).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn heights_stay_in_range() {
        let provider = ProceduralProvider::new(234);
        for y in (-300..300).step_by(37) {
            for x in (-300..300).step_by(41) {
                let height = provider.height_at(x, y).unwrap();
                assert!((0.0..=255.0).contains(&height), "height {height} at {x},{y}");
            }
        }
    }

    #[test]
    fn empty_above_max_height() {
        let provider = ProceduralProvider::new(234);
        let field = provider.page_in(&region(0, 0, 256, 7, 7, 300)).unwrap();
        assert!(field.voxels().iter().all(|v| v.is_empty()));
    }

    #[test]
    fn columns_are_solid_up_to_height() {
        let provider = ProceduralProvider::new(234);
        let (x, y) = (5, 9);
        let height = provider.height_at(x, y).unwrap();
        let field = provider.page_in(&region(x, y, 0, x, y, 255)).unwrap();
        for z in 0..=255 {
            let voxel = field.voxel(Point3::new(x, y, z));
            assert_eq!(voxel.is_empty(), (z as f64) >= height, "z = {z}");
            if !voxel.is_empty() {
                assert_eq!(voxel, Voxel::solid(materials::SOLID));
            }
        }
    }

    #[test]
    fn tunnel_is_carved_out() {
        assert!(ProceduralProvider::in_tunnel(TUNNEL_X, TUNNEL_Z));
        assert!(ProceduralProvider::in_tunnel(TUNNEL_X + 14, TUNNEL_Z));
        assert!(!ProceduralProvider::in_tunnel(TUNNEL_X + 15, TUNNEL_Z));

        let provider = ProceduralProvider::new(234);
        let field = provider
            .page_in(&region(TUNNEL_X, 0, TUNNEL_Z, TUNNEL_X, 3, TUNNEL_Z))
            .unwrap();
        assert!(field.voxels().iter().all(|v| v.is_empty()));
    }

    #[test]
    fn far_columns_are_solid_below_the_surface() {
        let provider = ProceduralProvider::new(234);
        assert!(!ProceduralProvider::in_tunnel(50_000, 0));
        assert!(!ProceduralProvider::in_tunnel(i32::MIN, i32::MIN));
        assert!(!ProceduralProvider::in_tunnel(TUNNEL_X, -60_000));

        let (x, y) = (50_000, 0);
        let height = provider.height_at(x, y).unwrap();
        let field = provider.page_in(&region(x, y, 0, x, y, 10)).unwrap();
        for z in 0..=10 {
            let voxel = field.voxel(Point3::new(x, y, z));
            assert_eq!(voxel.is_empty(), (z as f64) >= height, "z = {z}");
        }
    }

    #[test]
    fn deep_voxels_are_solid() {
        let provider = ProceduralProvider::new(234);
        let field = provider.page_in(&region(0, 0, -60_000, 3, 3, -59_990)).unwrap();
        assert!(field
            .voxels()
            .iter()
            .all(|v| *v == Voxel::solid(materials::SOLID)));
    }

    #[test]
    fn different_seeds_differ() {
        let area = region(0, 0, 0, 31, 31, 255);
        let a = ProceduralProvider::new(234).page_in(&area).unwrap();
        let b = ProceduralProvider::new(7).page_in(&area).unwrap();
        assert_ne!(a, b);
    }
}
