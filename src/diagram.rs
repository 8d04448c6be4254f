//! Geometry input adapter
//!
//! Wraps the externally produced cell diagram: a bounding rectangle and,
//! per site, the boundary line segments of that site's Voronoi-like cell.
//! The diagram is pure input data; all topology is derived from it by the
//! graph builder.

use glam::Vec2;

use crate::error::{Result, TerrainError};

/// Segments shorter than this are dropped on ingestion; the surrounding
/// boundary absorbs the gap they leave.
pub(crate) const MIN_SEGMENT_LENGTH: f32 = 0.001;

/// Axis-aligned bounding rectangle of the diagram, in planar (x, z)
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    /// Minimum corner (x_min, z_min)
    pub min: Vec2,
    /// Maximum corner (x_max, z_max)
    pub max: Vec2,
}

impl Bounds {
    /// Create bounds from min/max corners
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Width along the x axis
    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Depth along the z axis
    #[inline]
    pub fn depth(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Center point of the rectangle
    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn bottom_left(&self) -> Vec2 {
        self.min
    }

    #[inline]
    pub fn bottom_right(&self) -> Vec2 {
        Vec2::new(self.max.x, self.min.y)
    }

    #[inline]
    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.min.x, self.max.y)
    }

    #[inline]
    pub fn top_right(&self) -> Vec2 {
        self.max
    }
}

/// One boundary segment of a cell, an ordered pair of planar points
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSegment {
    pub p0: Vec2,
    pub p1: Vec2,
}

impl LineSegment {
    pub fn new(p0: Vec2, p1: Vec2) -> Self {
        Self { p0, p1 }
    }

    /// Planar length of the segment
    #[inline]
    pub fn length(&self) -> f32 {
        self.p0.distance(self.p1)
    }

    /// The same segment traversed in the opposite direction
    #[inline]
    pub fn reversed(&self) -> Self {
        Self {
            p0: self.p1,
            p1: self.p0,
        }
    }
}

/// A Voronoi-style cell diagram: sites plus per-site boundary segments,
/// clipped to a bounding rectangle.
///
/// The diagram does not need to be complete along the outer rectangle —
/// segments the clipping step omitted at the rectangle's corners are
/// reconstructed by the graph builder.
///
/// # Example
///
/// ```
/// use glam::Vec2;
/// use voronoi_terrain::{Bounds, CellDiagram};
///
/// let bounds = Bounds::new(Vec2::ZERO, Vec2::new(2.0, 1.0));
/// let sites = vec![Vec2::new(0.5, 0.5), Vec2::new(1.5, 0.5)];
/// let mut diagram = CellDiagram::new(bounds, sites).unwrap();
///
/// // The shared boundary is registered on both adjacent sites at once.
/// diagram.push_edge(Some(0), Some(1), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0));
/// assert_eq!(diagram.segments(0).len(), 1);
/// assert_eq!(diagram.segments(1).len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CellDiagram {
    bounds: Bounds,
    sites: Vec<Vec2>,
    segments: Vec<Vec<LineSegment>>,
}

impl CellDiagram {
    /// Create a diagram for the given bounds and site coordinates
    ///
    /// # Errors
    ///
    /// Returns `MalformedDiagram` if no sites are supplied or the bounds
    /// rectangle is empty.
    pub fn new(bounds: Bounds, sites: Vec<Vec2>) -> Result<Self> {
        if sites.is_empty() {
            return Err(TerrainError::MalformedDiagram(
                "diagram has no sites".to_string(),
            ));
        }
        if bounds.width() <= 0.0 || bounds.depth() <= 0.0 {
            return Err(TerrainError::MalformedDiagram(format!(
                "bounds rectangle is empty ({} x {})",
                bounds.width(),
                bounds.depth()
            )));
        }

        let segments = vec![Vec::new(); sites.len()];
        Ok(Self {
            bounds,
            sites,
            segments,
        })
    }

    /// Register one boundary segment, shared by up to two sites
    ///
    /// A Voronoi edge separates two sites; edges on the outer rectangle have
    /// only one. The segment is appended to each present site's boundary
    /// list. Segments shorter than the micro-epsilon are dropped here so the
    /// builder never sees them; the neighboring boundary absorbs the gap.
    pub fn push_edge(&mut self, left: Option<usize>, right: Option<usize>, p0: Vec2, p1: Vec2) {
        if p0.distance(p1) < MIN_SEGMENT_LENGTH {
            log::debug!("dropping degenerate segment at {:?}", p0);
            return;
        }

        let segment = LineSegment::new(p0, p1);
        if let Some(site) = left {
            self.segments[site].push(segment);
        }
        if let Some(site) = right {
            self.segments[site].push(segment);
        }
    }

    /// The diagram's bounding rectangle
    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// All site coordinates
    #[inline]
    pub fn sites(&self) -> &[Vec2] {
        &self.sites
    }

    /// Number of sites (= number of cells the builder will produce)
    #[inline]
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Boundary segments registered for one site
    #[inline]
    pub fn segments(&self, site: usize) -> &[LineSegment] {
        &self.segments[site]
    }

    /// Index of the site nearest to a point
    ///
    /// Linear scan; the builder only queries the four bounds corners with
    /// this, so no index structure is warranted.
    pub fn nearest_site(&self, point: Vec2) -> usize {
        let mut best = 0;
        let mut best_distance = f32::INFINITY;
        for (i, site) in self.sites.iter().enumerate() {
            let distance = site.distance_squared(point);
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_accessors() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::new(4.0, 2.0));
        assert_eq!(bounds.width(), 4.0);
        assert_eq!(bounds.depth(), 2.0);
        assert_eq!(bounds.center(), Vec2::new(2.0, 1.0));
        assert_eq!(bounds.bottom_left(), Vec2::ZERO);
        assert_eq!(bounds.top_right(), Vec2::new(4.0, 2.0));
        assert_eq!(bounds.bottom_right(), Vec2::new(4.0, 0.0));
        assert_eq!(bounds.top_left(), Vec2::new(0.0, 2.0));
    }

    #[test]
    fn test_empty_diagram_rejected() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::ONE);
        assert!(CellDiagram::new(bounds, vec![]).is_err());

        let empty = Bounds::new(Vec2::ZERO, Vec2::new(0.0, 1.0));
        assert!(CellDiagram::new(empty, vec![Vec2::ZERO]).is_err());
    }

    #[test]
    fn test_push_edge_registers_both_sides() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::new(2.0, 1.0));
        let sites = vec![Vec2::new(0.5, 0.5), Vec2::new(1.5, 0.5)];
        let mut diagram = CellDiagram::new(bounds, sites).unwrap();

        diagram.push_edge(Some(0), Some(1), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0));
        diagram.push_edge(Some(0), None, Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));

        assert_eq!(diagram.segments(0).len(), 2);
        assert_eq!(diagram.segments(1).len(), 1);
    }

    #[test]
    fn test_degenerate_segment_dropped() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::ONE);
        let mut diagram = CellDiagram::new(bounds, vec![Vec2::new(0.5, 0.5)]).unwrap();

        let p = Vec2::new(0.25, 0.25);
        diagram.push_edge(Some(0), None, p, p + Vec2::splat(0.0001));
        assert!(diagram.segments(0).is_empty());
    }

    #[test]
    fn test_nearest_site() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::new(2.0, 2.0));
        let sites = vec![
            Vec2::new(0.5, 0.5),
            Vec2::new(1.5, 0.5),
            Vec2::new(0.5, 1.5),
            Vec2::new(1.5, 1.5),
        ];
        let diagram = CellDiagram::new(bounds, sites).unwrap();

        assert_eq!(diagram.nearest_site(Vec2::new(0.0, 0.0)), 0);
        assert_eq!(diagram.nearest_site(Vec2::new(2.0, 0.0)), 1);
        assert_eq!(diagram.nearest_site(Vec2::new(0.0, 2.0)), 2);
        assert_eq!(diagram.nearest_site(Vec2::new(2.0, 2.0)), 3);
    }
}
