//! # Voxel Module
//!
//! The dual material/density voxel stored in every chunk, plus the material
//! palette indices used by terrain generation and structure stamping.

/// Underlying integer type of a material palette index.
pub type MaterialIndex = u8;

/// Material palette indices used by the procedural provider.
pub mod materials {
    use super::MaterialIndex;

    /// Material written into empty voxels.
    pub const NONE: MaterialIndex = 0;
    /// Bulk terrain below the height field.
    pub const SOLID: MaterialIndex = 245;
    /// Tree trunks.
    pub const TRUNK: MaterialIndex = 96;
    /// Tree crowns.
    pub const LEAVES: MaterialIndex = 32;
    /// Clouds.
    pub const CLOUD: MaterialIndex = 255;
}

/// A single voxel: a palette material and a solidity density.
///
/// Density `0` is fully empty and `255` fully solid. The material only has a
/// meaning while the density is above the minimum, so the constructors always
/// set both together.
///
/// # Memory Layout
/// `#[repr(C)]` keeps the two bytes packed so a chunk's voxel array can be
/// viewed as raw bytes with `bytemuck`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Voxel {
    /// Palette index of the voxel's material.
    pub material: MaterialIndex,
    /// Solidity, from [`Voxel::MIN_DENSITY`] to [`Voxel::MAX_DENSITY`].
    pub density: u8,
}

impl Voxel {
    /// Density of a fully empty voxel.
    pub const MIN_DENSITY: u8 = u8::MIN;
    /// Density of a fully solid voxel.
    pub const MAX_DENSITY: u8 = u8::MAX;

    /// The empty voxel.
    pub const EMPTY: Self = Self {
        material: materials::NONE,
        density: Self::MIN_DENSITY,
    };

    /// Creates a voxel from a material and a density.
    pub const fn new(material: MaterialIndex, density: u8) -> Self {
        Self { material, density }
    }

    /// Creates a fully solid voxel of the given material.
    pub const fn solid(material: MaterialIndex) -> Self {
        Self {
            material,
            density: Self::MAX_DENSITY,
        }
    }

    /// Returns `true` when the density is at its minimum, whatever the material.
    pub const fn is_empty(self) -> bool {
        self.density == Self::MIN_DENSITY
    }

    /// Returns `true` when the density is above `threshold`.
    pub const fn is_solid(self, threshold: u8) -> bool {
        self.density > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ignores_material() {
        assert!(Voxel::new(17, Voxel::MIN_DENSITY).is_empty());
        assert!(!Voxel::solid(materials::SOLID).is_empty());
        assert_eq!(Voxel::default(), Voxel::EMPTY);
    }

    #[test]
    fn solidity_threshold_is_exclusive() {
        let voxel = Voxel::new(materials::SOLID, 127);
        assert!(!voxel.is_solid(127));
        assert!(voxel.is_solid(126));
    }

    #[test]
    fn voxel_is_two_bytes() {
        assert_eq!(std::mem::size_of::<Voxel>(), 2);
        let voxels = [Voxel::solid(3), Voxel::EMPTY];
        let bytes: &[u8] = bytemuck::cast_slice(&voxels);
        assert_eq!(bytes, &[3, 255, 0, 0]);
    }
}
