//! Ford-Fulkerson max flow (spec §4.5)
//!
//! Two implementations that must agree on the max-flow value: an iterative
//! DFS (the safe default — stack depth bounded by the graph, not the call
//! stack) and a recursive DFS kept for comparison, with a safety cap since
//! pathological capacities can produce unboundedly many small augmenting
//! rounds.

use super::{augment, bottleneck, is_traversable};
use crate::cancel::{CancelCheck, CancellationToken};
use crate::graph::ResidualGraph;
use crate::supervisor::options::SolverOptions;
use crate::types::{Flow, NodeId, PathNodes, RecordedPath, SolverResult, SolverStatus};
use bitvec::vec::BitVec;
use std::collections::HashMap;
use std::time::Instant;

/// Marks `node` visited in a dense `BitVec` keyed through `index`.
fn mark_visited(visited: &mut BitVec, index: &HashMap<NodeId, usize>, node: NodeId) {
    visited.set(index[&node], true);
}

fn is_visited(visited: &BitVec, index: &HashMap<NodeId, usize>, node: NodeId) -> bool {
    *visited.get(index[&node]).unwrap()
}

/// Safety cap on augmenting-path rounds for the recursive variant (spec
/// §4.5): pathological capacities can otherwise loop effectively forever.
const RECURSIVE_SAFETY_CAP: usize = 1_000_000;

/// Iterative-DFS Ford-Fulkerson — the safe default.
pub fn solve_iterative(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    options: &SolverOptions,
    token: &CancellationToken,
) -> SolverResult {
    run(graph, source, sink, options, token, Strategy::Iterative)
}

/// Recursive-DFS Ford-Fulkerson, semantically equivalent to
/// [`solve_iterative`] but rebuilding a fresh `visited` set on every path
/// search via true recursion.
pub fn solve_recursive(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    options: &SolverOptions,
    token: &CancellationToken,
) -> SolverResult {
    run(graph, source, sink, options, token, Strategy::Recursive)
}

enum Strategy {
    Iterative,
    Recursive,
}

fn run(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    options: &SolverOptions,
    token: &CancellationToken,
    strategy: Strategy,
) -> SolverResult {
    let start = Instant::now();
    let span = tracing::info_span!("ford_fulkerson", ?source, ?sink);
    let _guard = span.enter();

    let mut max_flow: Flow = 0.0;
    let mut iterations = 0usize;
    let mut paths = Vec::new();
    let mut check = CancelCheck::new(token, 100);
    let index = graph.node_index();
    let n = graph.num_nodes();

    loop {
        if check.tick() {
            tracing::warn!("ford_fulkerson: cancelled mid-run");
            return SolverResult::canceled_partial(max_flow, graph.total_cost(), iterations, start.elapsed().as_secs_f64());
        }
        if options.iteration_cap_reached(iterations) {
            tracing::warn!(iterations, "ford_fulkerson: iteration cap reached");
            break;
        }
        if matches!(strategy, Strategy::Recursive) && iterations >= RECURSIVE_SAFETY_CAP {
            tracing::warn!("ford_fulkerson: recursive safety cap reached");
            break;
        }

        let path = match strategy {
            Strategy::Iterative => find_path_iterative(graph, source, sink, options.epsilon, &index, n),
            Strategy::Recursive => find_path_recursive(graph, source, sink, options.epsilon, &index, n),
        };
        let Some(path) = path else { break };

        let flow = bottleneck(graph, &path);
        if flow <= 0.0 || flow <= options.epsilon {
            break;
        }
        augment(graph, &path, flow);
        max_flow += flow;
        iterations += 1;
        if options.return_paths {
            paths.push(RecordedPath { nodes: path, flow });
        }
    }

    SolverResult {
        max_flow,
        total_cost: graph.total_cost(),
        iterations,
        paths,
        status: SolverStatus::Optimal,
        error: None,
        error_kind: None,
        duration_seconds: start.elapsed().as_secs_f64(),
        canceled: false,
    }
}

/// Explicit stack of `{node, next-edge-index}` frames. On backtracking the
/// popped frame's index has already advanced past the exhausted child, so
/// resuming the parent frame continues from the next neighbour.
fn find_path_iterative(graph: &ResidualGraph, source: NodeId, sink: NodeId, epsilon: f64, index: &HashMap<NodeId, usize>, n: usize) -> Option<PathNodes> {
    struct Frame {
        neighbours: Vec<NodeId>,
        idx: usize,
    }

    let mut visited: BitVec = BitVec::repeat(false, n);
    mark_visited(&mut visited, index, source);
    let mut stack = vec![Frame {
        neighbours: graph.neighbours_ordered(source),
        idx: 0,
    }];
    let mut path: PathNodes = PathNodes::from_slice(&[source]);

    while let Some(frame) = stack.last_mut() {
        if frame.idx >= frame.neighbours.len() {
            stack.pop();
            path.pop();
            continue;
        }
        let v = frame.neighbours[frame.idx];
        frame.idx += 1;
        if is_visited(&visited, index, v) {
            continue;
        }
        let Some(edge) = graph.get_edge(*path.last().unwrap(), v) else {
            continue;
        };
        if !is_traversable(edge.residual, epsilon) {
            continue;
        }
        mark_visited(&mut visited, index, v);
        path.push(v);
        if v == sink {
            return Some(path);
        }
        stack.push(Frame {
            neighbours: graph.neighbours_ordered(v),
            idx: 0,
        });
    }
    None
}

fn find_path_recursive(graph: &ResidualGraph, source: NodeId, sink: NodeId, epsilon: f64, index: &HashMap<NodeId, usize>, n: usize) -> Option<PathNodes> {
    let mut visited: BitVec = BitVec::repeat(false, n);
    mark_visited(&mut visited, index, source);
    let mut path: PathNodes = PathNodes::from_slice(&[source]);
    if dfs(graph, source, sink, epsilon, index, &mut visited, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn dfs(graph: &ResidualGraph, u: NodeId, sink: NodeId, epsilon: f64, index: &HashMap<NodeId, usize>, visited: &mut BitVec, path: &mut PathNodes) -> bool {
    if u == sink {
        return true;
    }
    for v in graph.neighbours_ordered(u) {
        if is_visited(visited, index, v) {
            continue;
        }
        let Some(edge) = graph.get_edge(u, v) else { continue };
        if !is_traversable(edge.residual, epsilon) {
            continue;
        }
        mark_visited(visited, index, v);
        path.push(v);
        if dfs(graph, v, sink, epsilon, index, visited, path) {
            return true;
        }
        path.pop();
    }
    false
}
