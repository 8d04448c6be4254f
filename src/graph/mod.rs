//! Half-edge map graph
//!
//! The graph is a doubly-connected edge list over the input cell diagram:
//! every cell owns a closed, clockwise loop of half-edges; every half-edge
//! is paired with the reverse half-edge of the neighboring cell (or with
//! nothing on the outer rectangle); every vertex knows one edge leaving it.
//!
//! All entities live in arenas and reference each other by index, so
//! in-place mutation (vertex snapping, river leveling) never invalidates a
//! handle. Collapsed entities are flagged `removed` and skipped by the
//! iteration helpers rather than shifted out of the arenas.

mod build;
mod snap;

use glam::Vec3;

use crate::diagram::{Bounds, CellDiagram};
use crate::error::{Result, TerrainError};
use crate::heightfield::HeightField;

/// Cap on the `opposite -> next` fan walk around one vertex. Boundary
/// vertices break the cycle; the cap guards against corrupt topology.
pub(crate) const MAX_VERTEX_EDGES: usize = 20;

/// Terrain category assigned to each cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeType {
    /// Ocean connected to the map boundary
    SaltWater,
    /// Enclosed ponds and lakes
    FreshWater,
    Beach,
    #[default]
    Grass,
    TallGrass,
    Rocky,
    Mountain,
    Snow,
}

impl NodeType {
    /// Check if this terrain is water
    pub fn is_water(&self) -> bool {
        matches!(self, NodeType::SaltWater | NodeType::FreshWater)
    }

    /// Check if this terrain is land
    pub fn is_land(&self) -> bool {
        !self.is_water()
    }
}

/// A corner point shared by the cells meeting there
///
/// Elevation is carried on the Y axis of `position`; x/z are the planar
/// diagram coordinates.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub position: Vec3,
    /// One half-edge whose implicit start is this vertex
    pub leaving_edge: Option<usize>,
    pub(crate) removed: bool,
}

impl Vertex {
    #[inline]
    pub fn elevation(&self) -> f32 {
        self.position.y
    }
}

/// One directed boundary segment of a cell
///
/// The start vertex is implicit: it is the destination of `previous`.
#[derive(Debug, Clone)]
pub struct HalfEdge {
    /// Vertex this edge points at
    pub destination: usize,
    /// Cell whose boundary loop this edge belongs to
    pub cell: usize,
    pub next: usize,
    pub previous: usize,
    /// Reverse half-edge owned by the neighboring cell; `None` on the
    /// outer map boundary
    pub opposite: Option<usize>,
    /// Number of river passes flowing along this edge
    pub water: u32,
    pub(crate) removed: bool,
}

impl HalfEdge {
    /// Whether this edge carries at least `minimum` river passes
    #[inline]
    pub fn has_river(&self, minimum: u32) -> bool {
        self.water >= minimum
    }
}

/// One polygonal map cell
#[derive(Debug, Clone)]
pub struct Cell {
    /// Center point; `center.y` is the cell's elevation
    pub center: Vec3,
    pub node_type: NodeType,
    /// Entry point into the cell's boundary loop
    pub start_edge: usize,
    /// Set by downstream spawners once content is placed here; the
    /// generator itself never reads it
    pub occupied: bool,
    pub(crate) height_difference: f32,
}

impl Cell {
    #[inline]
    pub fn elevation(&self) -> f32 {
        self.center.y
    }
}

/// The finished half-edge graph: cells, shared corner vertices, and
/// directed boundary edges with paired opposites.
///
/// Built once per generation run from a [`CellDiagram`] and a
/// [`HeightField`], mutated in place by the terrain passes, and replaced
/// wholesale on the next run.
#[derive(Debug, Clone)]
pub struct MapGraph {
    bounds: Bounds,
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) edges: Vec<HalfEdge>,
    pub(crate) cells: Vec<Cell>,
}

impl MapGraph {
    /// Build the graph from a cell diagram and an elevation field
    ///
    /// Constructs every cell's half-edge loop (closing gaps against the
    /// bounds corners), pairs opposite edges across shared boundaries,
    /// optionally merges near-coincident vertices, and stamps elevations.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDiagram` if a site has no usable boundary
    /// segments or a boundary loop cannot close.
    pub fn from_diagram<F: HeightField>(
        diagram: &CellDiagram,
        field: &F,
        snap_distance: f32,
    ) -> Result<Self> {
        let mut graph = build::from_diagram(diagram)?;

        if snap_distance > 0.0 {
            snap::snap_vertices(&mut graph, snap_distance);
        }

        graph.update_heights(field);
        Ok(graph)
    }

    /// The diagram bounds this graph was built from
    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Center of the map at elevation 0
    #[inline]
    pub fn center(&self) -> Vec3 {
        let c = self.bounds.center();
        Vec3::new(c.x, 0.0, c.y)
    }

    /// Number of cells
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Get a cell by ID
    #[inline]
    pub fn cell(&self, id: usize) -> Option<&Cell> {
        self.cells.get(id)
    }

    /// Get a vertex by ID (`None` for removed vertices)
    #[inline]
    pub fn vertex(&self, id: usize) -> Option<&Vertex> {
        self.vertices.get(id).filter(|v| !v.removed)
    }

    /// Get a half-edge by ID (`None` for removed edges)
    #[inline]
    pub fn edge(&self, id: usize) -> Option<&HalfEdge> {
        self.edges.get(id).filter(|e| !e.removed)
    }

    /// Iterate over all cells with their IDs
    pub fn cells(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells.iter().enumerate()
    }

    /// Iterate over all live vertices with their IDs
    pub fn vertices(&self) -> impl Iterator<Item = (usize, &Vertex)> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.removed)
    }

    /// Iterate over all live half-edges with their IDs
    pub fn half_edges(&self) -> impl Iterator<Item = (usize, &HalfEdge)> {
        self.edges.iter().enumerate().filter(|(_, e)| !e.removed)
    }

    /// Iterate over cells of one terrain category
    pub fn filter_cells(&self, node_type: NodeType) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells()
            .filter(move |(_, cell)| cell.node_type == node_type)
    }

    /// Mark a cell as occupied (or free) on behalf of a downstream spawner
    pub fn set_occupied(&mut self, cell: usize, occupied: bool) -> Result<()> {
        let cell = self
            .cells
            .get_mut(cell)
            .ok_or(TerrainError::CellNotFound(cell))?;
        cell.occupied = occupied;
        Ok(())
    }

    // === Cell traversal ===

    /// Walk a cell's boundary loop, starting at its start edge
    pub fn cell_edges(&self, cell: usize) -> CellEdges<'_> {
        let start = self.cells[cell].start_edge;
        CellEdges {
            graph: self,
            start,
            next: Some(start),
        }
    }

    /// The corner vertices of a cell, in boundary order
    pub fn cell_corners(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        self.cell_edges(cell).map(move |e| self.edges[e].destination)
    }

    /// The cells sharing a boundary with this cell
    pub fn cell_neighbors(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        self.cell_edges(cell)
            .filter_map(move |e| self.edges[e].opposite)
            .map(move |o| self.edges[o].cell)
    }

    /// Number of boundary edges of a cell
    pub fn cell_edge_count(&self, cell: usize) -> usize {
        self.cell_edges(cell).count()
    }

    /// Whether any of the cell's edges lies on the outer map boundary
    pub fn cell_is_boundary(&self, cell: usize) -> bool {
        self.cell_edges(cell)
            .any(|e| self.edges[e].opposite.is_none())
    }

    /// The cell's lowest corner vertex
    pub fn cell_lowest_corner(&self, cell: usize) -> Option<usize> {
        let mut lowest: Option<usize> = None;
        for corner in self.cell_corners(cell) {
            match lowest {
                Some(best) if self.vertices[corner].position.y >= self.vertices[best].position.y => {}
                _ => lowest = Some(corner),
            }
        }
        lowest
    }

    /// Spread between the cell's highest and lowest corner (center included)
    ///
    /// Valid after [`MapGraph::compute_height_differences`]; the terrain
    /// passes refresh it once carving has finished editing corners.
    #[inline]
    pub fn cell_height_difference(&self, cell: usize) -> f32 {
        self.cells[cell].height_difference
    }

    /// Recompute every cell's height difference from its current corners
    pub fn compute_height_differences(&mut self) {
        for cell in 0..self.cells.len() {
            let center_y = self.cells[cell].center.y;
            let mut lowest = center_y;
            let mut highest = center_y;
            for corner in self.cell_corners(cell) {
                let y = self.vertices[corner].position.y;
                if y > highest {
                    highest = y;
                }
                if y < lowest {
                    lowest = y;
                }
            }
            self.cells[cell].height_difference = highest - lowest;
        }
    }

    /// Flatten a cell to one corner's elevation (corners and center)
    pub fn set_cell_height_to_corner(&mut self, cell: usize, corner: usize) {
        let target_y = self.vertices[corner].position.y;
        let corners: Vec<usize> = self.cell_corners(cell).collect();
        for c in corners {
            self.vertices[c].position.y = target_y;
        }
        self.cells[cell].center.y = target_y;
    }

    // === Vertex traversal ===

    /// Walk the edges leaving a vertex via `opposite -> next`
    ///
    /// Map-boundary vertices break the cycle; the walk is additionally
    /// capped at 20 iterations against corrupt topology.
    pub fn vertex_edges(&self, vertex: usize) -> VertexEdges<'_> {
        let first = self.vertices[vertex].leaving_edge;
        VertexEdges {
            graph: self,
            first: first.unwrap_or(usize::MAX),
            next: first,
            iterations: 0,
        }
    }

    /// The lowest outgoing edge at a vertex that does not flow uphill
    ///
    /// Used to pick where a river leaves its source cell.
    pub fn vertex_down_slope_edge(&self, vertex: usize) -> Option<usize> {
        let origin_y = self.vertices[vertex].position.y;
        let mut best: Option<usize> = None;
        for edge in self.vertex_edges(vertex) {
            let dest_y = self.vertices[self.edges[edge].destination].position.y;
            if dest_y > origin_y {
                continue;
            }
            match best {
                Some(b) if self.vertices[self.edges[b].destination].position.y <= dest_y => {}
                _ => best = Some(edge),
            }
        }
        best
    }

    // === Edge geometry ===

    /// The implicit start vertex of an edge
    #[inline]
    pub fn edge_start(&self, edge: usize) -> usize {
        self.edges[self.edges[edge].previous].destination
    }

    /// Position of the edge's start vertex
    #[inline]
    pub fn edge_start_position(&self, edge: usize) -> Vec3 {
        self.vertices[self.edge_start(edge)].position
    }

    /// Position of the edge's destination vertex
    #[inline]
    pub fn edge_end_position(&self, edge: usize) -> Vec3 {
        self.vertices[self.edges[edge].destination].position
    }

    /// Inclination of the edge against the horizontal plane, in radians
    pub fn edge_slope_angle(&self, edge: usize) -> f32 {
        let v = self.edge_end_position(edge) - self.edge_start_position(edge);
        let flat = Vec3::new(v.x, 0.0, v.z);
        if flat.length_squared() <= f32::EPSILON || v.length_squared() <= f32::EPSILON {
            return 0.0;
        }
        flat.angle_between(v)
    }

    /// Sample every vertex and cell center from the elevation field
    ///
    /// Positions are floored to the field's integer grid; points outside
    /// the sampled domain keep elevation 0.
    fn update_heights<F: HeightField>(&mut self, field: &F) {
        for cell in self.cells.iter_mut() {
            let p = cell.center;
            cell.center.y = field.height_at(p.x.floor() as i32, p.z.floor() as i32);
        }
        for vertex in self.vertices.iter_mut() {
            if vertex.removed {
                continue;
            }
            let p = vertex.position;
            vertex.position.y = field.height_at(p.x.floor() as i32, p.z.floor() as i32);
        }
    }

    /// Build a KD-tree over cell centers for position-to-cell lookups
    #[cfg(feature = "spatial-index")]
    pub fn build_spatial_index(&self) -> crate::spatial::SpatialIndex {
        let centers: Vec<glam::Vec2> = self
            .cells
            .iter()
            .map(|c| glam::Vec2::new(c.center.x, c.center.z))
            .collect();
        crate::spatial::SpatialIndex::new(&centers)
    }
}

/// Iterator over one cell's boundary loop
pub struct CellEdges<'a> {
    graph: &'a MapGraph,
    start: usize,
    next: Option<usize>,
}

impl<'a> Iterator for CellEdges<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        let following = self.graph.edges[current].next;
        self.next = (following != self.start).then_some(following);
        Some(current)
    }
}

/// Iterator over the edges leaving one vertex
pub struct VertexEdges<'a> {
    graph: &'a MapGraph,
    first: usize,
    next: Option<usize>,
    iterations: usize,
}

impl<'a> Iterator for VertexEdges<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.iterations += 1;

        let following = self.graph.edges[current]
            .opposite
            .map(|o| self.graph.edges[o].next);
        self.next = match following {
            Some(f) if f != self.first && self.iterations < MAX_VERTEX_EDGES => Some(f),
            _ => None,
        };

        Some(current)
    }
}
