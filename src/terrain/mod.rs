//! Terrain classification
//!
//! Assigns a [`NodeType`] to every cell of a built graph and carves rivers
//! through it. The passes run in a fixed order; each scans all cells once
//! and later passes depend on the earlier ones (beaches need the ocean
//! fill, tall grass needs lakes, mountains need post-carving heights).

mod rivers;

use log::debug;

use crate::config::GenerationConfig;
use crate::graph::{MapGraph, NodeType};

/// Cells with more river-carrying edges than this become lakes.
const MAX_WET_EDGES: usize = 3;

/// Run the full classification pipeline over a graph
pub fn shape_terrain(graph: &mut MapGraph, config: &GenerationConfig) {
    TerrainGenerator::new(graph, config).run();
}

/// One terrain generation run over one graph
///
/// Owns nothing but borrows: the graph being classified and the
/// configuration. Construct it at the start of a run, call
/// [`TerrainGenerator::run`], and drop it; the mutated graph is the output.
pub struct TerrainGenerator<'a> {
    graph: &'a mut MapGraph,
    config: &'a GenerationConfig,
}

impl<'a> TerrainGenerator<'a> {
    pub fn new(graph: &'a mut MapGraph, config: &'a GenerationConfig) -> Self {
        Self { graph, config }
    }

    /// Apply every pass in order
    pub fn run(mut self) {
        self.reset_to_grass();
        self.seed_low_water();
        self.fill_ocean();
        self.set_beaches();
        rivers::carve_rivers(self.graph, self.config);
        self.create_lakes();

        // Carving and lake flattening edited corner elevations; height
        // differences must be refreshed before the passes that read them.
        self.graph.compute_height_differences();
        self.add_mountains();
        self.add_tall_grass();
        self.relevel_centers();
    }

    fn reset_to_grass(&mut self) {
        for cell in self.graph.cells.iter_mut() {
            cell.node_type = NodeType::Grass;
        }
    }

    /// A cell becomes fresh water only when its center and every corner sit
    /// at or below the cutoff; a single raised corner keeps it dry, which
    /// prevents puddles on sloped cells.
    fn seed_low_water(&mut self) {
        let cutoff = self.config.water_cutoff;
        for cell in 0..self.graph.cell_count() {
            if self.graph.cells[cell].center.y > cutoff {
                continue;
            }
            let submerged = self
                .graph
                .cell_corners(cell)
                .all(|corner| self.graph.vertices[corner].position.y <= cutoff);
            if submerged {
                self.graph.cells[cell].node_type = NodeType::FreshWater;
            }
        }
    }

    /// Reclassify all fresh water reachable from the map boundary as ocean
    ///
    /// Worklist traversal; the result is independent of visit order.
    fn fill_ocean(&mut self) {
        let seed = self
            .graph
            .cells()
            .find(|&(id, cell)| {
                cell.node_type == NodeType::FreshWater && self.graph.cell_is_boundary(id)
            })
            .map(|(id, _)| id);
        let Some(seed) = seed else {
            debug!("no boundary fresh water; map has no ocean");
            return;
        };

        let mut pending = vec![seed];
        let mut filled = 0usize;
        while let Some(cell) = pending.pop() {
            if self.graph.cells[cell].node_type != NodeType::FreshWater {
                continue;
            }
            self.graph.cells[cell].node_type = NodeType::SaltWater;
            filled += 1;
            pending.extend(self.graph.cell_neighbors(cell));
        }
        debug!("ocean fill converted {} cells", filled);
    }

    fn set_beaches(&mut self) {
        for cell in 0..self.graph.cell_count() {
            if self.graph.cells[cell].node_type != NodeType::Grass {
                continue;
            }
            let coastal = self
                .graph
                .cell_neighbors(cell)
                .any(|neighbor| self.graph.cells[neighbor].node_type == NodeType::SaltWater);
            if coastal {
                self.graph.cells[cell].node_type = NodeType::Beach;
            }
        }
    }

    /// Turn river confluences into lakes: a cell with no dry edge, or with
    /// more than [`MAX_WET_EDGES`] river edges, floods and is flattened to
    /// its lowest corner so the lake surface is level.
    fn create_lakes(&mut self) {
        let minimum = self.config.min_river_water;
        for cell in 0..self.graph.cell_count() {
            let mut dry = 0usize;
            let mut wet = 0usize;
            for edge in self.graph.cell_edges(cell) {
                if self.graph.edges[edge].water == 0 {
                    dry += 1;
                }
                if self.graph.edges[edge].has_river(minimum) {
                    wet += 1;
                }
            }
            if dry == 0 || wet > MAX_WET_EDGES {
                if let Some(lowest) = self.graph.cell_lowest_corner(cell) {
                    self.graph.cells[cell].node_type = NodeType::FreshWater;
                    self.graph.set_cell_height_to_corner(cell, lowest);
                }
            }
        }
    }

    fn add_mountains(&mut self) {
        let config = self.config;
        for cell in 0..self.graph.cell_count() {
            let elevation = self.graph.cells[cell].elevation();
            let difference = self.graph.cell_height_difference(cell);

            if elevation > config.min_mountain_elevation
                || difference > config.min_mountain_height_difference
            {
                self.graph.cells[cell].node_type = NodeType::Mountain;
            } else if elevation > config.min_rocky_elevation
                || difference > config.min_rocky_height_difference
            {
                self.graph.cells[cell].node_type = NodeType::Rocky;
            }

            if elevation > config.min_snow_elevation {
                self.graph.cells[cell].node_type = NodeType::Snow;
            }
        }
    }

    fn add_tall_grass(&mut self) {
        let config = self.config;
        for cell in 0..self.graph.cell_count() {
            if self.graph.cells[cell].node_type != NodeType::Grass {
                continue;
            }

            if self.graph.cells[cell].elevation() > config.tall_grass_elevation
                || self.graph.cell_height_difference(cell) > config.tall_grass_height_difference
            {
                self.graph.cells[cell].node_type = NodeType::TallGrass;
                continue;
            }

            let lakeside = self
                .graph
                .cell_neighbors(cell)
                .any(|neighbor| self.graph.cells[neighbor].node_type == NodeType::FreshWater);
            if lakeside {
                self.graph.cells[cell].node_type = NodeType::TallGrass;
            }
        }
    }

    /// Pull each center back to the mean of its corners, reflecting any
    /// carving-induced corner edits
    fn relevel_centers(&mut self) {
        for cell in 0..self.graph.cell_count() {
            let mut sum = 0.0f32;
            let mut count = 0usize;
            for corner in self.graph.cell_corners(cell) {
                sum += self.graph.vertices[corner].position.y;
                count += 1;
            }
            if count > 0 {
                self.graph.cells[cell].center.y = sum / count as f32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfigBuilder;
    use crate::test_fixtures::grid_diagram;
    use crate::MapGraph;

    // 5x5 unit grid: the left column and an interior 1x1 pond at cell
    // (3, 3) sit at elevation 0, everything else at 1.
    fn pond_field(x: i32, z: i32) -> f32 {
        if x <= 1 || ((3..=4).contains(&x) && (3..=4).contains(&z)) {
            0.0
        } else {
            1.0
        }
    }

    fn classified_pond_graph() -> MapGraph {
        let diagram = grid_diagram(5, 5);
        let field = crate::FnHeightField(pond_field);
        let mut graph = MapGraph::from_diagram(&diagram, &field, 0.0).unwrap();
        let config = GenerationConfigBuilder::new().build().unwrap();
        shape_terrain(&mut graph, &config);
        graph
    }

    fn site(i: usize, j: usize) -> usize {
        j * 5 + i
    }

    #[test]
    fn test_boundary_water_becomes_ocean() {
        let graph = classified_pond_graph();
        for j in 0..5 {
            assert_eq!(
                graph.cell(site(0, j)).unwrap().node_type,
                NodeType::SaltWater,
                "left column cell (0, {})",
                j
            );
        }
    }

    #[test]
    fn test_enclosed_pond_stays_fresh() {
        let graph = classified_pond_graph();
        assert_eq!(
            graph.cell(site(3, 3)).unwrap().node_type,
            NodeType::FreshWater
        );
    }

    #[test]
    fn test_flood_fill_completeness() {
        let graph = classified_pond_graph();
        // After the fill, no fresh water cell may neighbor salt water:
        // anything connected to the ocean must have been converted.
        for (cell, _) in graph.filter_cells(NodeType::FreshWater) {
            let touches_ocean = graph
                .cell_neighbors(cell)
                .any(|n| graph.cell(n).unwrap().node_type == NodeType::SaltWater);
            assert!(!touches_ocean, "fresh water cell {} touches ocean", cell);
        }
    }

    #[test]
    fn test_coastal_grass_becomes_beach() {
        let graph = classified_pond_graph();
        for j in 0..5 {
            assert_eq!(
                graph.cell(site(1, j)).unwrap().node_type,
                NodeType::Beach,
                "cell (1, {}) borders the ocean",
                j
            );
        }
    }

    #[test]
    fn test_lakeside_grass_becomes_tall() {
        let graph = classified_pond_graph();
        for (i, j) in [(2, 3), (4, 3), (3, 2), (3, 4)] {
            assert_eq!(
                graph.cell(site(i, j)).unwrap().node_type,
                NodeType::TallGrass,
                "cell ({}, {}) borders the pond",
                i,
                j
            );
        }
    }

    #[test]
    fn test_inland_cells_stay_grass() {
        let graph = classified_pond_graph();
        assert_eq!(graph.cell(site(2, 0)).unwrap().node_type, NodeType::Grass);
        assert_eq!(graph.cell(site(4, 0)).unwrap().node_type, NodeType::Grass);
    }

    #[test]
    fn test_centers_releveled_to_corner_mean() {
        let graph = classified_pond_graph();
        // Cell (1, 2) has two corners at 0 (x = 1) and two at 1 (x = 2).
        let elevation = graph.cell(site(1, 2)).unwrap().elevation();
        assert!((elevation - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mountains_and_snow_thresholds() {
        let diagram = grid_diagram(3, 1);
        // Vertex columns at 0 / 6 / 12 / 12.
        let field = crate::FnHeightField(|x: i32, _z: i32| match x {
            0 => 0.0,
            1 => 6.0,
            _ => 12.0,
        });
        let mut graph = MapGraph::from_diagram(&diagram, &field, 0.0).unwrap();
        let config = GenerationConfigBuilder::new().build().unwrap();
        shape_terrain(&mut graph, &config);

        // Middle cell: elevation 6 exceeds the rocky cutoff but neither
        // mountain threshold.
        assert_eq!(graph.cell(1).unwrap().node_type, NodeType::Rocky);
        // Right cell: elevation 12 beats both the mountain and the snow
        // thresholds; snow wins.
        assert_eq!(graph.cell(2).unwrap().node_type, NodeType::Snow);
    }
}
