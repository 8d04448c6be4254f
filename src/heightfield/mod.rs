//! Elevation field input
//!
//! The graph builder samples elevation on the integer (x, z) grid through
//! the [`HeightField`] trait. Any grid or function can back it; a
//! noise-based [`HeightMap`] producer is provided for convenience.

mod noise;

pub use noise::sample_fbm;

use glam::Vec2;

use crate::error::{Result, TerrainError};

/// A scalar elevation field over integer planar coordinates
///
/// Out-of-range queries must return 0; vertices outside the sampled domain
/// keep elevation 0.
pub trait HeightField {
    /// Elevation at the integer grid point (x, z)
    fn height_at(&self, x: i32, z: i32) -> f32;
}

/// Adapter turning any `Fn(x, z) -> height` closure into a height field
///
/// ```
/// use voronoi_terrain::{FnHeightField, HeightField};
///
/// let ramp = FnHeightField(|x: i32, _z: i32| x as f32);
/// assert_eq!(ramp.height_at(3, 0), 3.0);
/// ```
pub struct FnHeightField<F>(pub F);

impl<F> HeightField for FnHeightField<F>
where
    F: Fn(i32, i32) -> f32,
{
    fn height_at(&self, x: i32, z: i32) -> f32 {
        (self.0)(x, z)
    }
}

/// Settings for noise-based height map generation
///
/// # Example
///
/// ```
/// use voronoi_terrain::{HeightMap, NoiseSettings};
///
/// let settings = NoiseSettings::with_seed(42);
/// let map = HeightMap::generate(64, 64, &settings);
/// assert_eq!(map.width(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoiseSettings {
    /// Seed for the noise lattice
    pub seed: u32,
    /// Feature size in grid units (larger = broader hills)
    pub scale: f32,
    /// Number of fractal detail layers
    pub octaves: usize,
    /// Amplitude decay per octave
    pub persistence: f32,
    /// Frequency multiplier per octave
    pub lacunarity: f32,
    /// Multiplier applied to the normalized [0, 1] noise output
    pub height_multiplier: f32,
}

impl NoiseSettings {
    /// Settings with a random seed
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Settings with an explicit seed, for reproducible maps
    pub fn with_seed(seed: u32) -> Self {
        Self {
            seed,
            scale: 50.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            height_multiplier: 15.0,
        }
    }
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// A grid of elevation samples
#[derive(Debug, Clone)]
pub struct HeightMap {
    width: usize,
    depth: usize,
    values: Vec<f32>,
}

impl HeightMap {
    /// Create a flat (all-zero) height map
    pub fn new(width: usize, depth: usize) -> Self {
        Self {
            width,
            depth,
            values: vec![0.0; width * depth],
        }
    }

    /// Create a height map from row-major samples (x fastest)
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the sample count does not match the
    /// dimensions.
    pub fn from_values(width: usize, depth: usize, values: Vec<f32>) -> Result<Self> {
        if values.len() != width * depth {
            return Err(TerrainError::InvalidConfig(format!(
                "height map expects {} samples, got {}",
                width * depth,
                values.len()
            )));
        }
        Ok(Self {
            width,
            depth,
            values,
        })
    }

    /// Generate a height map from layered noise
    pub fn generate(width: usize, depth: usize, settings: &NoiseSettings) -> Self {
        let mut map = Self::new(width, depth);
        let scale = settings.scale.max(f32::EPSILON);

        for z in 0..depth {
            for x in 0..width {
                let position = Vec2::new(x as f32, z as f32) / scale;
                let sample = noise::sample_fbm(
                    position,
                    settings.seed,
                    settings.octaves,
                    settings.persistence,
                    settings.lacunarity,
                );
                map.values[x + z * width] = sample * settings.height_multiplier;
            }
        }

        map
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Overwrite one sample; out-of-range coordinates are ignored
    pub fn set(&mut self, x: usize, z: usize, height: f32) {
        if x < self.width && z < self.depth {
            self.values[x + z * self.width] = height;
        }
    }
}

impl HeightField for HeightMap {
    fn height_at(&self, x: i32, z: i32) -> f32 {
        if x < 0 || z < 0 {
            return 0.0;
        }
        let (x, z) = (x as usize, z as usize);
        if x >= self.width || z >= self.depth {
            return 0.0;
        }
        self.values[x + z * self.width]
    }
}
