//! # Terrain Configuration
//!
//! All options recognised by the streaming core. Every field has a default, so
//! a JSON document only needs to name the values it changes:
//!
//! ```json
//! { "seed": 234, "chunk_size_xy": 32, "memory_budget_bytes": 8388608 }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};
use crate::voxels::chunk::ChunkDimensions;
use crate::voxels::region::Region;

/// Largest chunk edge length accepted by [`TerrainConfig::validate`].
pub const MAX_CHUNK_SIZE: i32 = 1024;

/// Configuration for the chunk cache, the procedural provider, the extractor
/// and the mesh slot pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Chunk width and depth in voxels.
    pub chunk_size_xy: i32,
    /// Chunk height in voxels.
    pub chunk_size_z: i32,
    /// Resident voxel memory above which the cache starts evicting.
    pub memory_budget_bytes: usize,
    /// Vertex capacity of one extraction and of one mesh slot.
    pub max_vertices: usize,
    /// Index capacity of one extraction and of one mesh slot.
    pub max_indices: usize,
    /// Number of mesh slots, i.e. how many meshes can be in flight at once.
    pub num_slots: usize,
    /// Determinism key for the procedural provider.
    pub seed: u32,
    /// Terrain height reached by a noise sample of `1.0`.
    pub max_height: f64,
    /// Horizontal normalisation width applied before sampling noise.
    pub noise_width: f64,
    /// Voxels with a density above this value count as solid when meshing.
    pub solidity_threshold: u8,
    /// Number of worker threads used by the streamer.
    pub worker_threads: usize,
    /// Optional hard bounds of the world. Extraction treats everything
    /// outside as empty. `None` means the world is unbounded.
    pub world_bounds: Option<Region>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            chunk_size_xy: 32,
            chunk_size_z: 32,
            memory_budget_bytes: 256 * 1024 * 1024,
            max_vertices: 1 << 16,
            max_indices: (1 << 16) * 3 / 2,
            num_slots: 32,
            seed: 234,
            max_height: 255.0,
            noise_width: 254.0,
            solidity_threshold: 127,
            worker_threads: 4,
            world_bounds: None,
        }
    }
}

impl TerrainConfig {
    /// Parses a configuration from JSON and validates it.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidConfig`] if the document does not parse
    /// or holds values that fail [`TerrainConfig::validate`].
    pub fn from_json_str(json: &str) -> TerrainResult<Self> {
        let config: TerrainConfig =
            serde_json::from_str(json).map_err(|e| TerrainError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every option is usable.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidConfig`] naming the first bad option.
    pub fn validate(&self) -> TerrainResult<()> {
        if self.chunk_size_xy <= 0 || self.chunk_size_z <= 0 {
            return Err(TerrainError::InvalidConfig(format!(
                "chunk dimensions must be positive, got {}x{}x{}",
                self.chunk_size_xy, self.chunk_size_xy, self.chunk_size_z
            )));
        }
        if self.chunk_size_xy > MAX_CHUNK_SIZE || self.chunk_size_z > MAX_CHUNK_SIZE {
            return Err(TerrainError::InvalidConfig(format!(
                "chunk dimensions are limited to {MAX_CHUNK_SIZE} voxels per axis"
            )));
        }
        if self.max_vertices < 4 || self.max_indices < 6 {
            return Err(TerrainError::InvalidConfig(format!(
                "mesh capacity {} vertices / {} indices cannot hold a single quad",
                self.max_vertices, self.max_indices
            )));
        }
        if self.max_vertices > u32::MAX as usize {
            return Err(TerrainError::InvalidConfig(
                "max_vertices must fit in a u32 index".to_string(),
            ));
        }
        if self.num_slots == 0 {
            return Err(TerrainError::InvalidConfig(
                "num_slots must be at least 1".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(TerrainError::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if !(self.noise_width.is_finite() && self.noise_width > 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "noise_width must be a positive number, got {}",
                self.noise_width
            )));
        }
        if !(self.max_height.is_finite() && self.max_height >= 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "max_height must be a non-negative number, got {}",
                self.max_height
            )));
        }
        if let Some(bounds) = &self.world_bounds {
            bounds
                .validate()
                .map_err(|e| TerrainError::InvalidConfig(format!("world_bounds: {e}")))?;
        }
        Ok(())
    }

    /// The chunk dimensions described by this configuration.
    pub fn chunk_dimensions(&self) -> ChunkDimensions {
        ChunkDimensions::new(self.chunk_size_xy, self.chunk_size_z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TerrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seed, 234);
        assert_eq!(config.chunk_size_xy, 32);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            TerrainConfig::from_json_str(r#"{ "seed": 7, "num_slots": 3 }"#).expect("valid config");
        assert_eq!(config.seed, 7);
        assert_eq!(config.num_slots, 3);
        assert_eq!(config.chunk_size_z, TerrainConfig::default().chunk_size_z);
    }

    #[test]
    fn world_bounds_parse_from_json() {
        let config = TerrainConfig::from_json_str(
            r#"{ "world_bounds": { "lower": { "x": 0, "y": 0, "z": 0 }, "upper": { "x": 63, "y": 63, "z": 31 } } }"#,
        )
        .expect("valid config");
        let bounds = config.world_bounds.expect("bounds present");
        assert_eq!(bounds.upper.x, 63);
        assert_eq!(bounds.upper.z, 31);
    }

    #[test]
    fn rejects_bad_values() {
        let err = TerrainConfig::from_json_str(r#"{ "chunk_size_xy": 0 }"#).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidConfig(_)));

        let err = TerrainConfig::from_json_str(r#"{ "num_slots": 0 }"#).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidConfig(_)));

        let err = TerrainConfig::from_json_str(r#"{ "max_vertices": 3 }"#).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidConfig(_)));

        let err = TerrainConfig::from_json_str(r#"{ "chunk_size_z": 4096 }"#).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidConfig(_)));

        let err = TerrainConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, TerrainError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_inverted_world_bounds() {
        let err = TerrainConfig::from_json_str(
            r#"{ "world_bounds": { "lower": { "x": 5, "y": 0, "z": 0 }, "upper": { "x": 1, "y": 1, "z": 1 } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, TerrainError::InvalidConfig(_)));
    }
}
