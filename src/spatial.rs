//! Spatial indexing for fast position-to-cell lookups
//!
//! This module is only available with the `spatial-index` feature.

#[cfg(feature = "spatial-index")]
use glam::Vec2;
#[cfg(feature = "spatial-index")]
use kiddo::immutable::float::kdtree::ImmutableKdTree;
#[cfg(feature = "spatial-index")]
use kiddo::SquaredEuclidean;

/// Wrapper around a KD-tree for planar spatial queries
///
/// Converts planar (x, z) positions into cell IDs in O(log n), which is
/// what downstream spawn and picking layers need when turning a world
/// position into a map cell.
#[cfg(feature = "spatial-index")]
#[derive(Clone)]
pub struct SpatialIndex {
    tree: ImmutableKdTree<f32, usize, 2, 32>,
}

#[cfg(feature = "spatial-index")]
impl SpatialIndex {
    /// Build a spatial index from cell center positions
    ///
    /// # Example
    ///
    /// ```
    /// use glam::Vec2;
    /// use voronoi_terrain::SpatialIndex;
    ///
    /// let centers = vec![
    ///     Vec2::new(0.5, 0.5),
    ///     Vec2::new(1.5, 0.5),
    /// ];
    /// let index = SpatialIndex::new(&centers);
    /// assert_eq!(index.find_nearest(Vec2::new(0.4, 0.6)), 0);
    /// ```
    pub fn new(centers: &[Vec2]) -> Self {
        let points: Vec<[f32; 2]> = centers.iter().map(|c| [c.x, c.y]).collect();
        Self {
            tree: ImmutableKdTree::new_from_slice(&points),
        }
    }

    /// Find the cell whose center is nearest to a planar position
    pub fn find_nearest(&self, position: Vec2) -> usize {
        let query = [position.x, position.y];
        let result = self.tree.nearest_one::<SquaredEuclidean>(&query);
        result.item
    }
}
