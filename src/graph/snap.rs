//! Vertex snapping
//!
//! Cleanup pass that merges the endpoints of edges shorter than the snap
//! distance, removing sliver boundaries the diagram produced. A merge is
//! skipped when it would reduce either touching cell below three edges or
//! when either endpoint's fan reaches the outer map boundary.

use super::MapGraph;

pub(crate) fn snap_vertices(graph: &mut MapGraph, snap_distance: f32) {
    for vertex in 0..graph.vertices.len() {
        // May have been merged away by an earlier snap.
        if graph.vertices[vertex].removed {
            continue;
        }

        let fan: Vec<usize> = graph.vertex_edges(vertex).collect();
        for edge in fan {
            if graph.edges[edge].removed {
                continue;
            }
            let destination = graph.edges[edge].destination;
            let length = graph.vertices[vertex]
                .position
                .distance(graph.vertices[destination].position);
            if length < snap_distance {
                snap_edge(graph, vertex, edge);
            }
        }
    }
}

/// Collapse `edge` by merging its destination vertex into `point`
fn snap_edge(graph: &mut MapGraph, point: usize, edge: usize) {
    // Neither touching cell may drop below three boundary edges.
    if graph.cell_edge_count(graph.edges[edge].cell) <= 3 {
        return;
    }
    let Some(opposite) = graph.edges[edge].opposite else {
        return;
    };
    if graph.cell_edge_count(graph.edges[opposite].cell) <= 3 {
        return;
    }

    // Snapping a fan that touches the map boundary would tear the rim.
    let destination = graph.edges[edge].destination;
    if graph
        .vertex_edges(point)
        .any(|e| graph.edges[e].opposite.is_none())
        || graph
            .vertex_edges(destination)
            .any(|e| graph.edges[e].opposite.is_none())
    {
        return;
    }

    graph.edges[edge].removed = true;
    graph.vertices[destination].removed = true;

    // Everything leaving the dead vertex, captured before relinking.
    let other_edges: Vec<usize> = graph.vertex_edges(destination).collect();

    if graph.vertices[point].leaving_edge == Some(edge) {
        graph.vertices[point].leaving_edge = Some(graph.edges[opposite].next);
    }

    let cell = graph.edges[edge].cell;
    if graph.cells[cell].start_edge == edge {
        graph.cells[cell].start_edge = graph.edges[edge].previous;
    }

    let previous = graph.edges[edge].previous;
    let next = graph.edges[edge].next;
    graph.edges[next].previous = previous;
    graph.edges[previous].next = next;

    // The reverse half-edge collapses with it as long as its own cell can
    // spare an edge.
    if graph.cell_edge_count(graph.edges[opposite].cell) > 3 {
        graph.edges[opposite].removed = true;

        let opposite_previous = graph.edges[opposite].previous;
        let opposite_next = graph.edges[opposite].next;
        graph.edges[opposite_next].previous = opposite_previous;
        graph.edges[opposite_previous].next = opposite_next;

        let opposite_cell = graph.edges[opposite].cell;
        if graph.cells[opposite_cell].start_edge == opposite {
            graph.cells[opposite_cell].start_edge = opposite_previous;
        }
    }

    // Re-point every edge that arrived at the dead vertex.
    for other in other_edges {
        if let Some(into) = graph.edges[other].opposite {
            graph.edges[into].destination = point;
        }
    }
}
