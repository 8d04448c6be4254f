//! Half-edge terrain graph generation
//!
//! Turns an externally computed Voronoi-style cell diagram and a scalar
//! elevation field into a classified, river-carved map graph, suitable for
//! feeding mesh, texture and spawning layers in any game engine.
//!
//! The pipeline: build a doubly-connected half-edge graph from the diagram
//! (closing gaps against the bounding rectangle and welding duplicate
//! vertices), optionally snap near-coincident vertices, stamp elevations,
//! then classify every cell (ocean, lakes, beaches, grassland, rocky,
//! mountains, snow) and carve rivers downhill to the sea.
//!
//! # Quick Start
//!
//! ```rust
//! use glam::Vec2;
//! use voronoi_terrain::*;
//!
//! // Two cells side by side, sharing one boundary segment; the builder
//! // reconstructs the outer rectangle on its own.
//! let bounds = Bounds::new(Vec2::ZERO, Vec2::new(2.0, 1.0));
//! let sites = vec![Vec2::new(0.5, 0.5), Vec2::new(1.5, 0.5)];
//! let mut diagram = CellDiagram::new(bounds, sites).unwrap();
//! diagram.push_edge(Some(0), Some(1), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0));
//!
//! let heights = HeightMap::generate(2, 1, &NoiseSettings::with_seed(42));
//! let config = GenerationConfigBuilder::new().build().unwrap();
//!
//! let graph = generate(&diagram, &heights, &config).unwrap();
//! assert_eq!(graph.cell_count(), 2);
//!
//! for (_, cell) in graph.cells() {
//!     println!("{:?} at elevation {}", cell.node_type, cell.elevation());
//! }
//! ```
//!
//! # Features
//!
//! - `spatial-index` (default): O(log n) position-to-cell lookups via a KD-tree
//! - `serde`: serialization support for configuration and terrain types

// Modules
pub mod error;
pub mod config;
pub mod diagram;
pub mod heightfield;
pub mod graph;
pub mod terrain;

#[cfg(feature = "spatial-index")]
pub mod spatial;

// Re-export core types for convenience
pub use error::{Result, TerrainError};
pub use config::{GenerationConfig, GenerationConfigBuilder};
pub use diagram::{Bounds, CellDiagram, LineSegment};
pub use heightfield::{sample_fbm, FnHeightField, HeightField, HeightMap, NoiseSettings};
pub use graph::{Cell, CellEdges, HalfEdge, MapGraph, NodeType, Vertex, VertexEdges};
pub use terrain::{shape_terrain, TerrainGenerator};

#[cfg(feature = "spatial-index")]
pub use spatial::SpatialIndex;

// Re-export glam vector types for convenience
pub use glam::{Vec2, Vec3};

/// Run the whole pipeline: build the graph, snap, classify, carve rivers
///
/// Equivalent to [`MapGraph::from_diagram`] followed by [`shape_terrain`].
/// The result is deterministic for identical inputs.
///
/// # Errors
///
/// Returns `MalformedDiagram` when the diagram cannot produce closed cell
/// boundary loops; abandoned rivers are only logged, never errors.
pub fn generate<F: HeightField>(
    diagram: &CellDiagram,
    field: &F,
    config: &GenerationConfig,
) -> Result<MapGraph> {
    let mut graph = MapGraph::from_diagram(diagram, field, config.snap_distance)?;
    shape_terrain(&mut graph, config);
    Ok(graph)
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use glam::Vec2;

    use crate::diagram::{Bounds, CellDiagram};

    /// Grid of 1x1 square cells; sites row-major from the bottom-left.
    pub(crate) fn grid_diagram(cols: usize, rows: usize) -> CellDiagram {
        scaled_grid_diagram(cols, rows, 1.0)
    }

    /// Grid of square cells with the given edge length. Only the interior
    /// boundaries are registered, as a clipped Voronoi diagram would; the
    /// outer rectangle is left to the builder's gap closing.
    pub(crate) fn scaled_grid_diagram(cols: usize, rows: usize, size: f32) -> CellDiagram {
        let bounds = Bounds::new(
            Vec2::ZERO,
            Vec2::new(cols as f32 * size, rows as f32 * size),
        );
        let sites: Vec<Vec2> = (0..rows)
            .flat_map(|j| {
                (0..cols).map(move |i| Vec2::new((i as f32 + 0.5) * size, (j as f32 + 0.5) * size))
            })
            .collect();
        let mut diagram = CellDiagram::new(bounds, sites).unwrap();
        let site = |i: usize, j: usize| j * cols + i;

        for j in 0..rows {
            for i in 0..cols.saturating_sub(1) {
                let x = (i + 1) as f32 * size;
                diagram.push_edge(
                    Some(site(i, j)),
                    Some(site(i + 1, j)),
                    Vec2::new(x, j as f32 * size),
                    Vec2::new(x, (j + 1) as f32 * size),
                );
            }
        }
        for j in 0..rows.saturating_sub(1) {
            for i in 0..cols {
                let z = (j + 1) as f32 * size;
                diagram.push_edge(
                    Some(site(i, j)),
                    Some(site(i, j + 1)),
                    Vec2::new(i as f32 * size, z),
                    Vec2::new((i + 1) as f32 * size, z),
                );
            }
        }

        diagram
    }

    pub(crate) fn flat_field() -> impl crate::HeightField {
        crate::FnHeightField(|_x: i32, _z: i32| 0.0f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::grid_diagram;

    fn rolling_field() -> FnHeightField<fn(i32, i32) -> f32> {
        // Deterministic but varied: a ridge rising to the north-east.
        FnHeightField(|x, z| (x as f32 * 0.9 + z as f32 * 1.3).max(0.0))
    }

    #[test]
    fn test_full_pipeline_runs() {
        let diagram = grid_diagram(6, 6);
        let config = GenerationConfigBuilder::new().build().unwrap();
        let graph = generate(&diagram, &rolling_field(), &config).unwrap();

        assert_eq!(graph.cell_count(), 36);
        for (cell, _) in graph.cells() {
            assert!(graph.cell_edge_count(cell) >= 3);
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let diagram = grid_diagram(6, 6);
        let config = GenerationConfigBuilder::new()
            .river_source_elevation(8.0)
            .build()
            .unwrap();

        let first = generate(&diagram, &rolling_field(), &config).unwrap();
        let second = generate(&diagram, &rolling_field(), &config).unwrap();

        for (id, cell) in first.cells() {
            let other = second.cell(id).unwrap();
            assert_eq!(cell.node_type, other.node_type);
            assert_eq!(cell.elevation(), other.elevation());
        }
        for (id, edge) in first.half_edges() {
            assert_eq!(edge.water, second.edge(id).unwrap().water);
        }
    }

    #[test]
    fn test_elevations_stay_non_negative() {
        let diagram = grid_diagram(6, 6);
        let config = GenerationConfigBuilder::new()
            .river_source_elevation(6.0)
            .build()
            .unwrap();
        let graph = generate(&diagram, &rolling_field(), &config).unwrap();

        for (_, vertex) in graph.vertices() {
            assert!(vertex.elevation() >= 0.0);
        }
        for (_, cell) in graph.cells() {
            assert!(cell.elevation() >= 0.0);
        }
    }

    #[test]
    fn test_malformed_diagram_is_fatal() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::new(2.0, 1.0));
        let sites = vec![Vec2::new(0.5, 0.5), Vec2::new(1.5, 0.5)];
        let diagram = CellDiagram::new(bounds, sites).unwrap();
        // No segments registered at all.

        let config = GenerationConfigBuilder::new().build().unwrap();
        let result = generate(&diagram, &test_fixtures::flat_field(), &config);
        assert!(matches!(result, Err(TerrainError::MalformedDiagram(_))));
    }
}
