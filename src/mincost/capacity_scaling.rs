//! Capacity Scaling min-cost flow (spec §4.9)
//!
//! Preferred over plain SSP when the largest forward-edge capacity exceeds
//! 1e6: each scaling phase restricts Dijkstra-with-potentials to the
//! *delta-network* (edges with residual >= delta), halving delta until it
//! drops below 1, then finishing with plain SSP over whatever flow remains.

use super::{path_cost, ssp};
use crate::cancel::CancellationToken;
use crate::graph::bellman_ford::{self, ShortestPathResult};
use crate::graph::dijkstra;
use crate::graph::ResidualGraph;
use crate::supervisor::options::SolverOptions;
use crate::types::{Cost, Flow, NodeId, RecordedPath, SolverResult, SolverStatus};
use std::collections::HashMap;
use std::time::Instant;

/// Threshold above which capacity scaling is the recommended engine over
/// plain SSP (spec §4.9).
pub const CAPACITY_SCALING_THRESHOLD: Flow = 1_000_000.0;

/// Run Capacity Scaling from `source` to `sink`. `required` caps how much
/// flow to push; `None` pushes until no delta-network path remains at any
/// scale (min-cost max-flow).
pub fn solve(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    required: Option<Flow>,
    options: &SolverOptions,
    token: &CancellationToken,
) -> SolverResult {
    let start = Instant::now();
    let span = tracing::info_span!("capacity_scaling", ?source, ?sink, ?required);
    let _guard = span.enter();

    let nodes = graph.sorted_nodes();
    let n = nodes.len();
    let required = required.unwrap_or(Flow::INFINITY);

    let bf_init = bellman_ford::bellman_ford(graph, source, options.epsilon, token);
    if bf_init.has_negative_cycle {
        tracing::warn!("capacity_scaling: negative cycle reachable from source, min-cost flow is undefined");
        return SolverResult {
            max_flow: 0.0,
            total_cost: 0.0,
            iterations: 0,
            paths: Vec::new(),
            status: SolverStatus::Optimal,
            error: None,
            error_kind: None,
            duration_seconds: start.elapsed().as_secs_f64(),
            canceled: false,
        };
    }
    let mut potentials: HashMap<NodeId, Cost> = nodes
        .iter()
        .map(|&v| (v, bf_init.get_distance(v).filter(|d| d.is_finite()).unwrap_or(0.0)))
        .collect();

    let max_capacity = nodes
        .iter()
        .flat_map(|&u| graph.neighbours_ordered(u).into_iter().map(move |v| (u, v)))
        .filter_map(|(u, v)| graph.get_edge(u, v).map(|e| e.original_capacity))
        .fold(0.0_f64, f64::max);

    let mut delta = largest_power_of_two_at_most(max_capacity);
    let mut total_flow: Flow = 0.0;
    let mut total_cost: Cost = 0.0;
    let mut iterations = 0usize;
    let mut paths = Vec::new();
    let safety_limit = n.saturating_mul(n).max(1);

    while delta >= 1.0 {
        if total_flow >= required - options.epsilon {
            break;
        }
        let mut phase_iterations = 0usize;
        loop {
            if iterations % 50 == 0 && token.is_cancelled() {
                tracing::warn!("capacity_scaling: cancelled mid-run");
                return SolverResult::canceled_partial(total_flow, total_cost, iterations, start.elapsed().as_secs_f64());
            }
            if options.iteration_cap_reached(iterations) {
                tracing::warn!(iterations, "capacity_scaling: iteration cap reached");
                return finish(total_flow, total_cost, iterations, paths, start);
            }
            if phase_iterations >= safety_limit || total_flow >= required - options.epsilon {
                break;
            }

            let restricted = restrict_to_delta_network(graph, delta);
            let outcome = dijkstra::dijkstra_with_potentials(&restricted, source, &potentials, options.epsilon, token, options.negative_edge_fallback_threshold);
            let Some(dist_sink) = outcome.get_distance(sink).filter(|d| d.is_finite()) else {
                break;
            };
            let _ = dist_sink;
            let parent: HashMap<NodeId, NodeId> = nodes.iter().filter_map(|&v| outcome.get_parent(v).map(|p| (v, p))).collect();
            let Some(path) = bellman_ford::reconstruct_path(&parent, source, sink) else {
                break;
            };
            for &v in &nodes {
                if let Some(d) = outcome.get_distance(v) {
                    *potentials.entry(v).or_insert(0.0) += d;
                }
            }

            let remaining = required - total_flow;
            let path_residual = path
                .windows(2)
                .map(|w| graph.get_edge(w[0], w[1]).map_or(0.0, |e| e.residual))
                .fold(f64::INFINITY, f64::min);
            // Round down to a multiple of delta, never adding epsilon first
            // (spec §4.9): adding epsilon before flooring can overshoot.
            let bounded = path_residual.min(remaining);
            let flow = (bounded / delta).floor() * delta;
            if flow <= 0.0 {
                break;
            }

            let cost = path_cost(graph, &path) * flow;
            super::augment(graph, &path, flow);
            total_flow += flow;
            total_cost += cost;
            iterations += 1;
            phase_iterations += 1;
            if options.return_paths {
                paths.push(RecordedPath { nodes: path.into(), flow });
            }
        }
        delta /= 2.0;
    }

    if total_flow < required - options.epsilon {
        let remaining = if required.is_finite() { Some(required - total_flow) } else { None };
        let tail = ssp::solve(graph, source, sink, remaining, options, token);
        total_flow += tail.max_flow;
        total_cost += tail.total_cost;
        iterations += tail.iterations;
        paths.extend(tail.paths);
        if tail.canceled {
            return SolverResult::canceled_partial(total_flow, total_cost, iterations, start.elapsed().as_secs_f64());
        }
    }

    finish(total_flow, total_cost, iterations, paths, start)
}

fn finish(max_flow: Flow, total_cost: Cost, iterations: usize, paths: Vec<RecordedPath>, start: Instant) -> SolverResult {
    SolverResult {
        max_flow,
        total_cost,
        iterations,
        paths,
        status: SolverStatus::Optimal,
        error: None,
        error_kind: None,
        duration_seconds: start.elapsed().as_secs_f64(),
        canceled: false,
    }
}

fn largest_power_of_two_at_most(value: Flow) -> Flow {
    if value < 1.0 {
        return 1.0;
    }
    let mut delta = 1.0_f64;
    while delta * 2.0 <= value {
        delta *= 2.0;
    }
    delta
}

/// Build a graph view containing only edges with residual capacity at
/// least `delta`. A fresh clone is cheap relative to the O(V) work per
/// scaling iteration and keeps the delta filter out of the hot traversal
/// loops in `graph`/`dijkstra`.
fn restrict_to_delta_network(graph: &ResidualGraph, delta: Flow) -> ResidualGraph {
    let mut restricted = ResidualGraph::new();
    for &u in &graph.sorted_nodes() {
        restricted.add_node(u);
        for v in graph.neighbours_ordered(u) {
            if let Some(edge) = graph.get_edge(u, v) {
                if edge.residual >= delta {
                    restricted.add_edge(u, v, edge.residual, edge.cost);
                }
            }
        }
    }
    restricted
}
