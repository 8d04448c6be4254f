//! Graph construction from a cell diagram
//!
//! Per site: order the boundary segments clockwise, drop slivers, build the
//! half-edge loop while closing gaps the clipping step left at the bounds
//! rectangle, then pair opposite half-edges globally across all cells.
//!
//! Coordinates are quantized to 3 decimals on ingestion and vertices are
//! welded through a rounded-position key, so independently traversed cell
//! boundaries land on the same vertex objects.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use glam::{Vec2, Vec3};

use crate::diagram::{CellDiagram, LineSegment, MIN_SEGMENT_LENGTH};
use crate::error::{Result, TerrainError};

use super::{Cell, HalfEdge, MapGraph, NodeType, Vertex};

const UNSET: usize = usize::MAX;

/// Opposite half-edges are matched when their endpoints coincide within
/// this distance on both planar axes. Looser than the weld quantum to
/// absorb float jitter between independent cell traversals.
const OPPOSITE_TOLERANCE: f32 = 0.5;

#[inline]
fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

/// Planar diagram point lifted into the graph's coordinate space
#[inline]
fn to_vec3(p: Vec2) -> Vec3 {
    Vec3::new(round3(p.x), 0.0, round3(p.y))
}

/// Weld key: millimeter-quantized planar position
#[inline]
fn position_key(p: Vec3) -> (i32, i32) {
    ((p.x * 1000.0).round() as i32, (p.z * 1000.0).round() as i32)
}

/// The bounds rectangle's corner points and which site owns each
struct BoundsCorners {
    top_left: Vec3,
    top_right: Vec3,
    bottom_left: Vec3,
    bottom_right: Vec3,
    top_left_site: usize,
    top_right_site: usize,
    bottom_left_site: usize,
    bottom_right_site: usize,
    x_min: f32,
    x_max: f32,
    z_min: f32,
    z_max: f32,
}

impl BoundsCorners {
    fn new(diagram: &CellDiagram) -> Self {
        let bounds = diagram.bounds();
        Self {
            top_left: to_vec3(bounds.top_left()),
            top_right: to_vec3(bounds.top_right()),
            bottom_left: to_vec3(bounds.bottom_left()),
            bottom_right: to_vec3(bounds.bottom_right()),
            top_left_site: diagram.nearest_site(bounds.top_left()),
            top_right_site: diagram.nearest_site(bounds.top_right()),
            bottom_left_site: diagram.nearest_site(bounds.bottom_left()),
            bottom_right_site: diagram.nearest_site(bounds.bottom_right()),
            x_min: round3(bounds.min.x),
            x_max: round3(bounds.max.x),
            z_min: round3(bounds.min.y),
            z_max: round3(bounds.max.y),
        }
    }
}

struct Builder {
    graph: MapGraph,
    vertex_by_position: HashMap<(i32, i32), usize>,
    edges_by_start: HashMap<(i32, i32), Vec<usize>>,
}

pub(crate) fn from_diagram(diagram: &CellDiagram) -> Result<MapGraph> {
    let corners = BoundsCorners::new(diagram);

    let mut builder = Builder {
        graph: MapGraph {
            bounds: diagram.bounds(),
            vertices: Vec::new(),
            edges: Vec::new(),
            cells: Vec::new(),
        },
        vertex_by_position: HashMap::new(),
        edges_by_start: HashMap::new(),
    };

    for (site_index, &site) in diagram.sites().iter().enumerate() {
        let boundaries = boundaries_for_site(diagram, site_index, site)?;
        builder.build_cell(site_index, site, &boundaries, &corners)?;
    }

    builder.connect_opposites();
    Ok(builder.graph)
}

/// Collect one site's boundary segments in clockwise traversal order
fn boundaries_for_site(
    diagram: &CellDiagram,
    site_index: usize,
    site: Vec2,
) -> Result<Vec<LineSegment>> {
    let mut boundaries = diagram.segments(site_index).to_vec();

    flip_clockwise(&mut boundaries, site);
    sort_clockwise(&mut boundaries, site);
    drop_slivers(&mut boundaries, MIN_SEGMENT_LENGTH);

    if boundaries.is_empty() {
        return Err(TerrainError::MalformedDiagram(format!(
            "site {} at {:?} has no usable boundary segments",
            site_index, site
        )));
    }

    Ok(boundaries)
}

/// Orient every segment so that walking p0 -> p1 goes clockwise around the site
fn flip_clockwise(segments: &mut [LineSegment], site: Vec2) {
    for segment in segments.iter_mut() {
        let first = segment.p0 - site;
        let second = segment.p1 - site;
        if first.perp_dot(second) > 0.0 {
            *segment = segment.reversed();
        }
    }
}

/// Sort segments into a clockwise ring around the site
///
/// Keyed on the angle of each start point; descending angle is clockwise.
/// The ring's rotation (which segment comes first) is irrelevant to the
/// loop builder.
fn sort_clockwise(segments: &mut [LineSegment], site: Vec2) {
    segments.sort_by(|a, b| {
        let first = a.p0 - site;
        let second = b.p0 - site;
        let angle_a = first.y.atan2(first.x);
        let angle_b = second.y.atan2(second.x);
        angle_b.partial_cmp(&angle_a).unwrap_or(Ordering::Equal)
    });
}

/// Remove segments below the micro-epsilon, re-joining the neighbors so the
/// removal leaves no crack in the boundary
fn drop_slivers(boundaries: &mut Vec<LineSegment>, epsilon: f32) {
    let mut i = boundaries.len();
    while i > 0 {
        i -= 1;
        if boundaries[i].length() >= epsilon {
            continue;
        }

        let previous = if i == 0 { boundaries.len() - 1 } else { i - 1 };
        let next = if i + 1 >= boundaries.len() { 0 } else { i + 1 };

        if boundaries[previous].p1.distance(boundaries[next].p0) < epsilon {
            boundaries[previous].p1 = boundaries[next].p0;
        }

        log::debug!("dropping sliver segment at {:?}", boundaries[i].p0);
        boundaries.remove(i);
    }
}

impl Builder {
    fn build_cell(
        &mut self,
        site_index: usize,
        site: Vec2,
        boundaries: &[LineSegment],
        corners: &BoundsCorners,
    ) -> Result<()> {
        let cell_index = self.graph.cells.len();
        self.graph.cells.push(Cell {
            center: to_vec3(site),
            node_type: NodeType::default(),
            start_edge: UNSET,
            occupied: false,
            height_difference: 0.0,
        });

        let mut first_edge: Option<usize> = None;
        let mut first_start = Vec3::ZERO;
        let mut previous_edge: Option<usize> = None;

        for i in 0..boundaries.len() {
            let start = to_vec3(boundaries[i].p0);
            let end = to_vec3(boundaries[i].p1);
            if start == end {
                continue;
            }

            let edge = self.add_edge(previous_edge, start, end, cell_index)?;
            previous_edge = Some(edge);
            if first_edge.is_none() {
                first_edge = Some(edge);
                first_start = start;
            }
            if self.graph.cells[cell_index].start_edge == UNSET {
                self.graph.cells[cell_index].start_edge = edge;
            }

            // Where this segment ends and the next begins; a mismatch is a
            // gap the diagram omitted along the bounds rectangle.
            let gap_start = end;
            let gap_end = to_vec3(boundaries[(i + 1) % boundaries.len()].p0);
            if gap_start != gap_end {
                let bridged =
                    self.close_gap(gap_start, gap_end, site_index, cell_index, edge, corners)?;
                previous_edge = Some(bridged);
            }
        }

        let first = first_edge.ok_or_else(|| {
            TerrainError::MalformedDiagram(format!(
                "site {} at {:?} collapsed to zero-length boundary",
                site_index, site
            ))
        })?;
        let previous = previous_edge.unwrap_or(first);

        let loop_end = self.graph.vertices[self.graph.edges[previous].destination].position;
        if position_key(loop_end) != position_key(first_start) {
            return Err(TerrainError::MalformedDiagram(format!(
                "site {} boundary loop does not close: ends at {:?}, started at {:?}",
                site_index, loop_end, first_start
            )));
        }

        self.graph.edges[previous].next = first;
        self.graph.edges[first].previous = previous;
        self.add_leaving_edge(first);

        Ok(())
    }

    /// Close a gap between two boundary points, inserting the bounds
    /// corners this cell owns along the way
    ///
    /// A cell owns a corner when it is the nearest site to that corner and
    /// the gap does not already start there. Corners are inserted clockwise
    /// starting from the bounds edge the gap begins on, then a final edge
    /// bridges to the next real segment.
    fn close_gap(
        &mut self,
        gap_start: Vec3,
        gap_end: Vec3,
        site_index: usize,
        cell_index: usize,
        mut previous: usize,
        corners: &BoundsCorners,
    ) -> Result<usize> {
        let start_is_top = gap_start.z == corners.z_max;
        let start_is_bottom = gap_start.z == corners.z_min;
        let start_is_left = gap_start.x == corners.x_min;
        let start_is_right = gap_start.x == corners.x_max;

        let has_top_left =
            corners.top_left_site == site_index && !(start_is_top && start_is_left);
        let has_top_right =
            corners.top_right_site == site_index && !(start_is_top && start_is_right);
        let has_bottom_left =
            corners.bottom_left_site == site_index && !(start_is_bottom && start_is_left);
        let has_bottom_right =
            corners.bottom_right_site == site_index && !(start_is_bottom && start_is_right);

        let top_left = (has_top_left, corners.top_left);
        let top_right = (has_top_right, corners.top_right);
        let bottom_left = (has_bottom_left, corners.bottom_left);
        let bottom_right = (has_bottom_right, corners.bottom_right);

        let insertion_order = if start_is_top {
            [top_right, bottom_right, bottom_left, top_left]
        } else if start_is_right {
            [bottom_right, bottom_left, top_left, top_right]
        } else if start_is_bottom {
            [bottom_left, top_left, top_right, bottom_right]
        } else if start_is_left {
            [top_left, top_right, bottom_right, bottom_left]
        } else {
            // Gap away from the rectangle: nothing to insert, bridge directly.
            [(false, Vec3::ZERO); 4]
        };

        for (owned, corner) in insertion_order {
            if owned {
                let from = self.edge_destination_position(previous);
                previous = self.add_edge(Some(previous), from, corner, cell_index)?;
            }
        }

        let from = self.edge_destination_position(previous);
        self.add_edge(Some(previous), from, gap_end, cell_index)
    }

    fn edge_destination_position(&self, edge: usize) -> Vec3 {
        self.graph.vertices[self.graph.edges[edge].destination].position
    }

    fn add_edge(
        &mut self,
        previous: Option<usize>,
        start: Vec3,
        end: Vec3,
        cell: usize,
    ) -> Result<usize> {
        if start == end {
            return Err(TerrainError::MalformedDiagram(format!(
                "degenerate edge at {:?} while building cell {}",
                start, cell
            )));
        }

        let edge_index = self.graph.edges.len();

        // A brand-new start vertex gets this edge as its leaving edge;
        // existing vertices keep theirs.
        if let Entry::Vacant(entry) = self.vertex_by_position.entry(position_key(start)) {
            entry.insert(self.graph.vertices.len());
            self.graph.vertices.push(Vertex {
                position: start,
                leaving_edge: Some(edge_index),
                removed: false,
            });
        }
        let end_vertex = self.intern_vertex(end);

        self.graph.edges.push(HalfEdge {
            destination: end_vertex,
            cell,
            next: UNSET,
            previous: UNSET,
            opposite: None,
            water: 0,
            removed: false,
        });
        self.edges_by_start
            .entry(position_key(start))
            .or_default()
            .push(edge_index);

        if let Some(prev) = previous {
            self.graph.edges[prev].next = edge_index;
            self.graph.edges[edge_index].previous = prev;
            self.add_leaving_edge(edge_index);
        }

        Ok(edge_index)
    }

    fn intern_vertex(&mut self, position: Vec3) -> usize {
        match self.vertex_by_position.entry(position_key(position)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let index = self.graph.vertices.len();
                entry.insert(index);
                self.graph.vertices.push(Vertex {
                    position,
                    leaving_edge: None,
                    removed: false,
                });
                index
            }
        }
    }

    fn add_leaving_edge(&mut self, edge: usize) {
        let start = self.graph.edges[self.graph.edges[edge].previous].destination;
        if self.graph.vertices[start].leaving_edge.is_none() {
            self.graph.vertices[start].leaving_edge = Some(edge);
        }
    }

    /// Pair each half-edge with the reverse half-edge of the neighboring
    /// cell: a candidate starting at this edge's end whose destination
    /// falls within tolerance of this edge's start
    fn connect_opposites(&mut self) {
        for edge in 0..self.graph.edges.len() {
            if self.graph.edges[edge].opposite.is_some() {
                continue;
            }

            let start_position = self.graph.edge_start_position(edge);
            let end_position = self.graph.edge_end_position(edge);

            let Some(candidates) = self.edges_by_start.get(&position_key(end_position)) else {
                continue;
            };

            let mut opposite = None;
            for &candidate in candidates {
                let destination = self.graph.edge_end_position(candidate);
                if (destination.x - start_position.x).abs() < OPPOSITE_TOLERANCE
                    && (destination.z - start_position.z).abs() < OPPOSITE_TOLERANCE
                {
                    opposite = Some(candidate);
                }
            }

            if let Some(o) = opposite {
                self.graph.edges[edge].opposite = Some(o);
                self.graph.edges[o].opposite = Some(edge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{flat_field, grid_diagram};
    use crate::MapGraph;

    #[test]
    fn test_grid_cells_close_in_four_steps() {
        let diagram = grid_diagram(3, 3);
        let graph = MapGraph::from_diagram(&diagram, &flat_field(), 0.0).unwrap();

        assert_eq!(graph.cell_count(), 9);
        for (cell, _) in graph.cells() {
            assert_eq!(graph.cell_edge_count(cell), 4, "cell {} loop", cell);
        }
    }

    #[test]
    fn test_vertices_are_welded() {
        let diagram = grid_diagram(3, 2);
        let graph = MapGraph::from_diagram(&diagram, &flat_field(), 0.0).unwrap();

        // A grid of w x h unit cells has (w + 1) * (h + 1) distinct corners.
        assert_eq!(graph.vertices().count(), 4 * 3);
    }

    #[test]
    fn test_opposite_symmetry() {
        let diagram = grid_diagram(3, 3);
        let graph = MapGraph::from_diagram(&diagram, &flat_field(), 0.0).unwrap();

        for (id, edge) in graph.half_edges() {
            if let Some(opposite) = edge.opposite {
                let back = graph.edge(opposite).unwrap();
                assert_eq!(back.opposite, Some(id), "asymmetric pair {} / {}", id, opposite);
                assert_ne!(back.cell, edge.cell);
                // Reverse direction along the shared boundary.
                assert_eq!(graph.edge_start(id), back.destination);
                assert_eq!(graph.edge_start(opposite), edge.destination);
            }
        }
    }

    #[test]
    fn test_boundary_exemption() {
        let diagram = grid_diagram(3, 3);
        let graph = MapGraph::from_diagram(&diagram, &flat_field(), 0.0).unwrap();

        let mut unpaired = 0;
        for (id, edge) in graph.half_edges() {
            let start = graph.edge_start_position(id);
            let end = graph.edge_end_position(id);
            let on_rim = (start.x == 0.0 && end.x == 0.0)
                || (start.x == 3.0 && end.x == 3.0)
                || (start.z == 0.0 && end.z == 0.0)
                || (start.z == 3.0 && end.z == 3.0);
            assert_eq!(edge.opposite.is_none(), on_rim, "edge {}", id);
            if edge.opposite.is_none() {
                unpaired += 1;
            }
        }
        // One outer edge per perimeter cell side.
        assert_eq!(unpaired, 12);
    }

    #[test]
    fn test_corner_cells_pick_up_bounds_corners() {
        let diagram = grid_diagram(2, 2);
        let graph = MapGraph::from_diagram(&diagram, &flat_field(), 0.0).unwrap();

        // Cell 0 sits at the bottom-left; its loop must pass through (0, 0).
        let has_origin = graph
            .cell_corners(0)
            .any(|v| graph.vertex(v).unwrap().position == Vec3::ZERO);
        assert!(has_origin, "bottom-left cell misses the bounds corner");
    }

    #[test]
    fn test_heights_stamped_from_field() {
        let diagram = grid_diagram(2, 2);
        let field = crate::FnHeightField(|x: i32, z: i32| (x + 10 * z) as f32);
        let graph = MapGraph::from_diagram(&diagram, &field, 0.0).unwrap();

        // Center of cell 0 is (0.5, 0.5) -> floors to (0, 0).
        assert_eq!(graph.cell(0).unwrap().elevation(), 0.0);
        // Center of the top-right cell is (1.5, 1.5) -> floors to (1, 1).
        assert_eq!(graph.cell(3).unwrap().elevation(), 11.0);

        for (_, vertex) in graph.vertices() {
            let expected = vertex.position.x.floor() as i32 + 10 * vertex.position.z.floor() as i32;
            assert_eq!(vertex.position.y, expected as f32);
        }
    }

    #[test]
    fn test_site_without_segments_fails_fast() {
        use crate::diagram::{Bounds, CellDiagram};
        use glam::Vec2;

        let bounds = Bounds::new(Vec2::ZERO, Vec2::new(2.0, 1.0));
        let sites = vec![Vec2::new(0.5, 0.5), Vec2::new(1.5, 0.5)];
        let mut diagram = CellDiagram::new(bounds, sites).unwrap();
        // Only site 0 gets its shared edge registered; site 1 stays empty.
        diagram.push_edge(Some(0), None, Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0));

        let result = MapGraph::from_diagram(&diagram, &flat_field(), 0.0);
        assert!(matches!(result, Err(TerrainError::MalformedDiagram(_))));
    }

    #[test]
    fn test_leaving_edges_cover_all_vertices() {
        let diagram = grid_diagram(3, 3);
        let graph = MapGraph::from_diagram(&diagram, &flat_field(), 0.0).unwrap();

        for (id, vertex) in graph.vertices() {
            let leaving = vertex.leaving_edge.expect("vertex without leaving edge");
            assert_eq!(graph.edge_start(leaving), id);
        }
    }

    #[test]
    fn test_flip_and_sort_produce_clockwise_ring() {
        let site = Vec2::new(0.5, 0.5);
        let mut segments = vec![
            LineSegment::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)),
            LineSegment::new(Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)),
            LineSegment::new(Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)),
            LineSegment::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.0)),
        ];
        flip_clockwise(&mut segments, site);
        sort_clockwise(&mut segments, site);

        // Each segment's end must meet the next segment's start.
        for i in 0..segments.len() {
            let next = (i + 1) % segments.len();
            assert_eq!(segments[i].p1, segments[next].p0);
        }
        // Clockwise: walking the ring keeps the site on the left in the
        // (x, z) plane, i.e. each sweep has negative cross product.
        for segment in &segments {
            let first = segment.p0 - site;
            let second = segment.p1 - site;
            assert!(first.perp_dot(second) < 0.0);
        }
    }

    #[test]
    fn test_drop_slivers_rejoins_neighbors() {
        let mut boundaries = vec![
            LineSegment::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)),
            LineSegment::new(Vec2::new(1.0, 0.0), Vec2::new(1.0005, 0.0)),
            LineSegment::new(Vec2::new(1.0005, 0.0), Vec2::new(2.0, 0.0)),
        ];
        drop_slivers(&mut boundaries, 0.001);

        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].p1, boundaries[1].p0);
    }
}
