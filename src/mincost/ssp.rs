//! Successive Shortest Paths min-cost flow (spec §4.8)
//!
//! Maintains Johnson potentials so each iteration's Dijkstra-with-potentials
//! sees non-negative reduced costs, falling back to Bellman-Ford only when
//! that invariant is violated by more than the configured tolerance.

use super::{augment, bottleneck, path_cost, potential_refresh_period};
use crate::cancel::CancellationToken;
use crate::graph::bellman_ford::{self, ShortestPathResult};
use crate::graph::dijkstra::{self, DijkstraOutcome};
use crate::graph::ResidualGraph;
use crate::supervisor::options::SolverOptions;
use crate::types::{Cost, Flow, NodeId, RecordedPath, SolverResult, SolverStatus};
use std::collections::HashMap;
use std::time::Instant;

/// Run Successive Shortest Paths from `source` to `sink`. `required` caps
/// how much flow to push; `None` runs to min-cost max-flow (push until no
/// augmenting path remains).
pub fn solve(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    required: Option<Flow>,
    options: &SolverOptions,
    token: &CancellationToken,
) -> SolverResult {
    let start = Instant::now();
    let span = tracing::info_span!("ssp_min_cost", ?source, ?sink, ?required);
    let _guard = span.enter();

    let nodes = graph.sorted_nodes();
    let n = nodes.len();
    let refresh_period = potential_refresh_period(n);
    let required = required.unwrap_or(Flow::INFINITY);

    let bf_init = bellman_ford::bellman_ford(graph, source, options.epsilon, token);
    if bf_init.has_negative_cycle {
        tracing::warn!("ssp_min_cost: negative cycle reachable from source, min-cost flow is undefined");
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

    let mut total_flow: Flow = 0.0;
    let mut total_cost: Cost = 0.0;
    let mut iterations = 0usize;
    let mut paths = Vec::new();
    let mut iters_since_refresh = 0usize;

    loop {
        if iterations % 50 == 0 && token.is_cancelled() {
            tracing::warn!("ssp_min_cost: cancelled mid-run");
            return SolverResult::canceled_partial(total_flow, total_cost, iterations, start.elapsed().as_secs_f64());
        }
        if options.iteration_cap_reached(iterations) {
            tracing::warn!(iterations, "ssp_min_cost: iteration cap reached");
            break;
        }
        if total_flow >= required - options.epsilon {
            break;
        }

        let outcome = dijkstra::dijkstra_with_potentials(graph, source, &potentials, options.epsilon, token, options.negative_edge_fallback_threshold);
        let Some(dist_sink) = outcome.get_distance(sink) else {
            break;
        };
        if !dist_sink.is_finite() {
            break;
        }

        for &v in &nodes {
            if let Some(d) = outcome.get_distance(v) {
                *potentials.entry(v).or_insert(0.0) += d;
            }
        }

        let parent = parent_map(&outcome, &nodes);
        let Some(path) = bellman_ford::reconstruct_path(&parent, source, sink) else {
            break;
        };

        let remaining = required - total_flow;
        let flow = bottleneck(graph, &path, remaining);
        if flow <= options.epsilon {
            break;
        }

        let cost = path_cost(graph, &path) * flow;
        augment(graph, &path, flow);
        total_flow += flow;
        total_cost += cost;
        iterations += 1;
        iters_since_refresh += 1;
        if options.return_paths {
            paths.push(RecordedPath { nodes: path.into(), flow });
        }

        if iters_since_refresh >= refresh_period {
            let bf = bellman_ford::bellman_ford_with_potentials(graph, source, &potentials, options.epsilon, token);
            for &v in &nodes {
                if let Some(d) = bf.get_distance(v) {
                    *potentials.entry(v).or_insert(0.0) += d;
                }
            }
            iters_since_refresh = 0;
        }
    }

    SolverResult {
        max_flow: total_flow,
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

/// Reference/debug path (spec §9 open question): plain Bellman-Ford every
/// iteration instead of Dijkstra-with-potentials. Slower, but useful to
/// cross-check the potential-based engine above.
pub fn solve_bellman_ford_only(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    required: Option<Flow>,
    options: &SolverOptions,
    token: &CancellationToken,
) -> SolverResult {
    let start = Instant::now();
    let required = required.unwrap_or(Flow::INFINITY);

    let mut total_flow: Flow = 0.0;
    let mut total_cost: Cost = 0.0;
    let mut iterations = 0usize;
    let mut paths = Vec::new();

    loop {
        if iterations % 50 == 0 && token.is_cancelled() {
            return SolverResult::canceled_partial(total_flow, total_cost, iterations, start.elapsed().as_secs_f64());
        }
        if options.iteration_cap_reached(iterations) || total_flow >= required - options.epsilon {
            break;
        }

        let result = bellman_ford::bellman_ford(graph, source, options.epsilon, token);
        if result.has_negative_cycle {
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
        let Some(dist_sink) = result.get_distance(sink).filter(|d| d.is_finite()) else {
            break;
        };
        let _ = dist_sink;
        let Some(path) = bellman_ford::reconstruct_path(&result.parent, source, sink) else {
            break;
        };

        let remaining = required - total_flow;
        let flow = bottleneck(graph, &path, remaining);
        if flow <= options.epsilon {
            break;
        }
        let cost = path_cost(graph, &path) * flow;
        augment(graph, &path, flow);
        total_flow += flow;
        total_cost += cost;
        iterations += 1;
        if options.return_paths {
            paths.push(RecordedPath { nodes: path.into(), flow });
        }
    }

    SolverResult {
        max_flow: total_flow,
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

fn parent_map(outcome: &DijkstraOutcome, nodes: &[NodeId]) -> HashMap<NodeId, NodeId> {
    nodes.iter().filter_map(|&v| outcome.get_parent(v).map(|p| (v, p))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two parallel source->mid->sink paths with different unit costs;
    /// SSP should saturate the cheap path before touching the expensive one.
    fn parallel_path_graph() -> ResidualGraph {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(0, 1, 10.0, 1.0);
        g.add_edge_with_reverse(1, 3, 10.0, 1.0);
        g.add_edge_with_reverse(0, 2, 10.0, 5.0);
        g.add_edge_with_reverse(2, 3, 10.0, 5.0);
        g
    }

    #[test]
    fn prefers_cheap_path_first() {
        let mut g = parallel_path_graph();
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = solve(&mut g, 0, 3, Some(15.0), &options, &token);
        assert_eq!(result.max_flow, 15.0);
        // 10 units at cost 2/unit + 5 units at cost 10/unit = 20 + 50 = 70
        assert_eq!(result.total_cost, 70.0);
    }

    #[test]
    fn unbounded_required_pushes_until_no_path() {
        let mut g = parallel_path_graph();
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = solve(&mut g, 0, 3, None, &options, &token);
        assert_eq!(result.max_flow, 20.0);
    }

    #[test]
    fn negative_cycle_yields_zero_flow() {
        let mut g = ResidualGraph::new();
        g.add_edge(0, 1, 10.0, 1.0);
        g.add_edge(1, 2, 10.0, -5.0);
        g.add_edge(2, 1, 10.0, -5.0);
        g.add_edge(2, 3, 10.0, 1.0);
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = solve(&mut g, 0, 3, Some(5.0), &options, &token);
        assert_eq!(result.max_flow, 0.0);
        assert_eq!(result.status, SolverStatus::Optimal);
    }

    #[test]
    fn bellman_ford_only_variant_agrees_with_potentials_variant() {
        let options = SolverOptions::default();
        let token = CancellationToken::new();

        let mut g1 = parallel_path_graph();
        let r1 = solve(&mut g1, 0, 3, None, &options, &token);

        let mut g2 = parallel_path_graph();
        let r2 = solve_bellman_ford_only(&mut g2, 0, 3, None, &options, &token);

        assert_eq!(r1.max_flow, r2.max_flow);
        assert_eq!(r1.total_cost, r2.total_cost);
    }
}
