//! River carving
//!
//! Every cell above the source elevation spawns a river at its lowest
//! corner. The river walks edge to edge, always taking the steepest
//! unvisited downhill edge, merging into existing rivers when it meets
//! them, and stopping at salt water. When no downhill edge exists the
//! carver tunnels: it picks a candidate edge (backtracking along the path
//! when even that fails) and levels the candidate's far vertex down to cut
//! a channel, then re-walks the river once to see whether the new
//! elevation opened a genuine downhill route.

use glam::Vec3;
use log::{debug, warn};

use crate::config::GenerationConfig;
use crate::graph::{MapGraph, NodeType};

pub(crate) fn carve_rivers(graph: &mut MapGraph, config: &GenerationConfig) {
    let mut carved = 0usize;
    for cell in 0..graph.cell_count() {
        if graph.cells[cell].elevation() <= config.river_source_elevation {
            continue;
        }
        let Some(source) = graph.cell_lowest_corner(cell) else {
            continue;
        };
        let Some(start_edge) = graph.vertex_down_slope_edge(source) else {
            continue;
        };

        carve_river(graph, config, start_edge);
        carved += 1;
    }
    debug!("carved {} rivers", carved);
}

fn carve_river(graph: &mut MapGraph, config: &GenerationConfig, start_edge: usize) {
    let center = graph.center();

    let mut repasses = 0usize;
    let mut checks = 0usize;
    let mut previous_river_edges: Vec<usize> = Vec::new();

    loop {
        let mut height_updated = false;
        let mut river_edges: Vec<usize> = Vec::new();
        let mut next_edge = Some(start_edge);

        while let Some(current) = next_edge {
            if checks >= config.river_max_checks {
                warn!(
                    "river abandoned: no route within {} checks",
                    config.river_max_checks
                );
                return;
            }
            checks += 1;

            // Flowing back onto itself ends the river.
            if river_edges.contains(&current)
                || graph.edges[current]
                    .opposite
                    .is_some_and(|o| river_edges.contains(&o))
            {
                break;
            }

            river_edges.push(current);
            graph.edges[current].water += 1;

            // Done once the destination touches the sea.
            let destination = graph.edges[current].destination;
            let reached_sea = graph
                .vertex_edges(destination)
                .any(|e| graph.cells[graph.edges[e].cell].node_type == NodeType::SaltWater);
            if reached_sea {
                break;
            }

            next_edge = down_slope_edge(graph, current, &river_edges);
            if next_edge.is_none() {
                // No downhill continuation; find a channel to carve,
                // backtracking along the path when the current vertex has
                // nothing left to offer.
                let mut candidate =
                    candidate_edge(graph, center, current, &river_edges, &previous_river_edges);
                while candidate.is_none() {
                    if river_edges.len() <= 1 {
                        warn!("river abandoned: backtracking exhausted the path");
                        for &edge in &river_edges {
                            graph.edges[edge].water = graph.edges[edge].water.saturating_sub(1);
                        }
                        return;
                    }

                    let popped = river_edges.pop().expect("path is non-empty");
                    graph.edges[popped].water -= 1;
                    let retry_from = *river_edges.last().expect("path retains its first edge");
                    candidate = candidate_edge(
                        graph,
                        center,
                        retry_from,
                        &river_edges,
                        &previous_river_edges,
                    );
                }

                let carved = candidate.expect("loop exits only with a candidate");
                let channel_floor = graph.edge_start_position(carved).y;
                let destination = graph.edges[carved].destination;
                if graph.vertices[destination].position.y != channel_floor {
                    graph.vertices[destination].position.y = channel_floor;
                    height_updated = true;
                }
                next_edge = Some(carved);
            }
        }

        if repasses >= config.river_max_repasses {
            break;
        }
        repasses += 1;

        if !height_updated {
            break;
        }

        // The carve lowered terrain; withdraw this pass's water and walk
        // the river again against the new elevations.
        for &edge in &river_edges {
            if graph.edges[edge].water > 0 {
                graph.edges[edge].water -= 1;
            }
        }
        previous_river_edges = river_edges;
    }
}

/// The steepest unvisited strictly-downhill edge out of `current`'s
/// destination, avoiding fresh water on either side; an edge that already
/// carries a river wins outright.
fn down_slope_edge(graph: &MapGraph, current: usize, seen: &[usize]) -> Option<usize> {
    let origin = graph.edges[current].destination;
    let origin_y = graph.vertices[origin].position.y;

    let mut steepest: Option<(usize, f32)> = None;
    for edge in graph.vertex_edges(origin) {
        let Some(opposite) = graph.edges[edge].opposite else {
            continue;
        };
        if seen.contains(&edge) || seen.contains(&opposite) {
            continue;
        }
        if graph.vertices[graph.edges[edge].destination].position.y >= origin_y {
            continue;
        }
        if graph.cells[graph.edges[edge].cell].node_type == NodeType::FreshWater
            || graph.cells[graph.edges[opposite].cell].node_type == NodeType::FreshWater
        {
            continue;
        }

        if graph.edges[edge].water > 0 {
            return Some(edge);
        }

        let angle = graph.edge_slope_angle(edge);
        match steepest {
            Some((_, best)) if best >= angle => {}
            _ => steepest = Some((edge, angle)),
        }
    }

    steepest.map(|(edge, _)| edge)
}

/// A channel to carve from `source`'s destination when no downhill edge
/// exists: prefer an existing river, then an edge used by the previous
/// pass over this river, then edges heading away from the map center, and
/// finally the lowest remaining destination.
fn candidate_edge(
    graph: &MapGraph,
    center: Vec3,
    source: usize,
    seen: &[usize],
    previous: &[usize],
) -> Option<usize> {
    let corner = graph.edges[source].destination;

    let candidates: Vec<usize> = graph
        .vertex_edges(corner)
        .filter(|&edge| {
            graph.edges[edge]
                .opposite
                .is_some_and(|o| !seen.contains(&o))
                && !seen.contains(&edge)
        })
        .collect();

    if let Some(&edge) = candidates.iter().find(|&&e| graph.edges[e].water > 0) {
        return Some(edge);
    }
    if let Some(&edge) = candidates.iter().find(|&&e| previous.contains(&e)) {
        return Some(edge);
    }

    let outward: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&edge| {
            let direction = graph.edge_end_position(edge) - graph.edge_start_position(edge);
            let from_center = graph.edge_end_position(edge) - center;
            direction.dot(from_center) >= 0.0
        })
        .collect();
    let pool = if outward.is_empty() { candidates } else { outward };

    let mut lowest: Option<(usize, f32)> = None;
    for edge in pool {
        let y = graph.edge_end_position(edge).y;
        match lowest {
            Some((_, best)) if best <= y => {}
            _ => lowest = Some((edge, y)),
        }
    }
    lowest.map(|(edge, _)| edge)
}
