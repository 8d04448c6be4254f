//! Generation configuration and builder
//!
//! All thresholds the terrain passes consult live here. The same
//! configuration with the same diagram and elevation field always produces
//! the identical graph.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Configuration for one terrain generation run
///
/// Construct through [`GenerationConfigBuilder`]; the defaults produce a
/// sensible map for elevation fields in roughly the 0..15 range.
///
/// # Example
///
/// ```
/// use voronoi_terrain::GenerationConfigBuilder;
///
/// let config = GenerationConfigBuilder::new()
///     .water_cutoff(0.5)
///     .snap_distance(1.0)
///     .unwrap()
///     .build()
///     .unwrap();
/// assert_eq!(config.water_cutoff, 0.5);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    /// Cells at or below this elevation (center and all corners) seed as
    /// fresh water
    pub water_cutoff: f32,

    /// Edges shorter than this are collapsed after graph construction;
    /// 0 disables the snapping pass
    pub snap_distance: f32,

    /// Cells above this elevation spawn a river
    pub river_source_elevation: f32,

    /// Rocky terrain: elevation threshold
    pub min_rocky_elevation: f32,
    /// Rocky terrain: corner height spread threshold
    pub min_rocky_height_difference: f32,
    /// Mountain terrain: elevation threshold
    pub min_mountain_elevation: f32,
    /// Mountain terrain: corner height spread threshold
    pub min_mountain_height_difference: f32,
    /// Snow overrides mountain/rocky above this elevation
    pub min_snow_elevation: f32,

    /// Tall grass: elevation threshold
    pub tall_grass_elevation: f32,
    /// Tall grass: corner height spread threshold
    pub tall_grass_height_difference: f32,

    /// Edge-visit budget per river, shared across its re-passes
    pub river_max_checks: usize,
    /// How many times one river is re-walked after a carve lowered terrain
    pub river_max_repasses: usize,
    /// Water count from which an edge counts as carrying a river
    pub min_river_water: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfigBuilder::new().build().unwrap()
    }
}

/// Builder for [`GenerationConfig`] with validation
#[derive(Debug, Clone)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    /// Create a builder with the default thresholds
    pub fn new() -> Self {
        Self {
            config: GenerationConfig {
                water_cutoff: 0.4,
                snap_distance: 0.0,
                river_source_elevation: 12.0,
                min_rocky_elevation: 4.5,
                min_rocky_height_difference: 5.0,
                min_mountain_elevation: 8.0,
                min_mountain_height_difference: 6.5,
                min_snow_elevation: 11.5,
                tall_grass_elevation: 2.0,
                tall_grass_height_difference: 2.5,
                river_max_checks: 100,
                river_max_repasses: 1,
                min_river_water: 1,
            },
        }
    }

    /// Set the fresh water seeding cutoff
    pub fn water_cutoff(mut self, cutoff: f32) -> Self {
        self.config.water_cutoff = cutoff;
        self
    }

    /// Set the vertex snapping distance
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the distance is negative.
    pub fn snap_distance(mut self, distance: f32) -> Result<Self> {
        if distance < 0.0 {
            return Err(TerrainError::InvalidConfig(format!(
                "snap distance must be >= 0 (got {})",
                distance
            )));
        }
        self.config.snap_distance = distance;
        Ok(self)
    }

    /// Set the minimum elevation for river sources
    pub fn river_source_elevation(mut self, elevation: f32) -> Self {
        self.config.river_source_elevation = elevation;
        self
    }

    /// Set the rocky terrain thresholds (elevation, corner height spread)
    pub fn rocky_thresholds(mut self, elevation: f32, height_difference: f32) -> Self {
        self.config.min_rocky_elevation = elevation;
        self.config.min_rocky_height_difference = height_difference;
        self
    }

    /// Set the mountain terrain thresholds (elevation, corner height spread)
    pub fn mountain_thresholds(mut self, elevation: f32, height_difference: f32) -> Self {
        self.config.min_mountain_elevation = elevation;
        self.config.min_mountain_height_difference = height_difference;
        self
    }

    /// Set the snow elevation threshold
    pub fn snow_elevation(mut self, elevation: f32) -> Self {
        self.config.min_snow_elevation = elevation;
        self
    }

    /// Set the tall grass thresholds (elevation, corner height spread)
    pub fn tall_grass_thresholds(mut self, elevation: f32, height_difference: f32) -> Self {
        self.config.tall_grass_elevation = elevation;
        self.config.tall_grass_height_difference = height_difference;
        self
    }

    /// Set the per-river edge-visit budget
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the budget is zero.
    pub fn river_max_checks(mut self, checks: usize) -> Result<Self> {
        if checks == 0 {
            return Err(TerrainError::InvalidConfig(
                "river check budget must be positive".to_string(),
            ));
        }
        self.config.river_max_checks = checks;
        Ok(self)
    }

    /// Set how often one river is re-walked after carving
    pub fn river_max_repasses(mut self, repasses: usize) -> Self {
        self.config.river_max_repasses = repasses;
        self
    }

    /// Set the water count from which an edge counts as a river
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the count is zero.
    pub fn min_river_water(mut self, water: u32) -> Result<Self> {
        if water == 0 {
            return Err(TerrainError::InvalidConfig(
                "minimum river water must be positive".to_string(),
            ));
        }
        self.config.min_river_water = water;
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<GenerationConfig> {
        Ok(self.config)
    }
}

impl Default for GenerationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
