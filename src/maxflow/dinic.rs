//! Dinic's max flow (spec §4.6): level graph via BFS + blocking flow via
//! current-arc iterative DFS. Phases alternate until the sink is no longer
//! reachable in the level graph.

use super::is_traversable;
use crate::cancel::CancellationToken;
use crate::graph::ResidualGraph;
use crate::supervisor::options::SolverOptions;
use crate::types::{Flow, NodeId, PathNodes, RecordedPath, SolverResult, SolverStatus};
use bitvec::vec::BitVec;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// Run Dinic's algorithm from `source` to `sink`.
pub fn solve(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    options: &SolverOptions,
    token: &CancellationToken,
) -> SolverResult {
    solve_with_callback(graph, source, sink, options, token, None)
}

/// Same as [`solve`] but invokes `on_path(path, flow)` for every augmenting
/// path pushed during blocking-flow search, for streaming progress (spec
/// §4.6, §6). Cancellation is checked more often (every 50 DFS steps
/// instead of 100) since callers that want streaming output also tend to
/// want faster cancellation response.
pub fn solve_with_callback(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    options: &SolverOptions,
    token: &CancellationToken,
    mut on_path: Option<&mut dyn FnMut(&[NodeId], Flow)>,
) -> SolverResult {
    let start = Instant::now();
    let span = tracing::info_span!("dinic", ?source, ?sink);
    let _guard = span.enter();

    let check_period = if on_path.is_some() { 50 } else { 100 };
    let mut max_flow: Flow = 0.0;
    let mut iterations = 0usize;
    let mut phase = 0usize;
    let mut paths = Vec::new();
    let mut step_count: u64 = 0;
    let index = graph.node_index();
    let n = graph.num_nodes();

    loop {
        if options.iteration_cap_reached(iterations) {
            tracing::warn!(iterations, "dinic: iteration cap reached");
            break;
        }
        let Some(level) = bfs_level_graph(graph, source, sink, options.epsilon) else {
            break;
        };
        phase += 1;
        let mut current: HashMap<NodeId, usize> = HashMap::new();
        let mut dead_end: BitVec = BitVec::repeat(false, n);

        loop {
            step_count += 1;
            if step_count % check_period == 0 && token.is_cancelled() {
                tracing::warn!(phase, "dinic: cancelled mid-run");
                return SolverResult::canceled_partial(max_flow, graph.total_cost(), iterations, start.elapsed().as_secs_f64());
            }
            if options.iteration_cap_reached(iterations) {
                break;
            }
            let Some((path, flow)) = dfs_blocking(graph, source, sink, &level, &index, &mut dead_end, &mut current, options.epsilon) else {
                break;
            };
            if flow <= 0.0 || flow <= options.epsilon {
                break;
            }
            max_flow += flow;
            iterations += 1;
            if let Some(cb) = on_path.as_deref_mut() {
                cb(&path, flow);
            }
            if options.return_paths {
                paths.push(RecordedPath { nodes: path, flow });
            }
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

/// BFS from `source`, assigning each reachable node its hop-distance.
/// `None` if `sink` is unreachable (max flow reached).
fn bfs_level_graph(graph: &ResidualGraph, source: NodeId, sink: NodeId, epsilon: f64) -> Option<HashMap<NodeId, usize>> {
    let mut level = HashMap::new();
    level.insert(source, 0);
    let mut queue = VecDeque::new();
    queue.push_back(source);

    while let Some(u) = queue.pop_front() {
        let du = level[&u];
        for v in graph.neighbours_ordered(u) {
            if level.contains_key(&v) {
                continue;
            }
            let Some(edge) = graph.get_edge(u, v) else { continue };
            if !is_traversable(edge.residual, epsilon) {
                continue;
            }
            level.insert(v, du + 1);
            queue.push_back(v);
        }
    }

    if level.contains_key(&sink) {
        Some(level)
    } else {
        None
    }
}

/// Current-arc iterative DFS for one blocking-flow augmenting path. Nodes
/// whose neighbour list is exhausted without reaching the sink are flagged
/// in `dead_end` so later searches in the same phase skip them immediately
/// (the standard "dead end" pruning).
fn dfs_blocking(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    level: &HashMap<NodeId, usize>,
    index: &HashMap<NodeId, usize>,
    dead_end: &mut BitVec,
    current: &mut HashMap<NodeId, usize>,
    epsilon: f64,
) -> Option<(PathNodes, Flow)> {
    let mut path: PathNodes = PathNodes::from_slice(&[source]);

    while let Some(&u) = path.last() {
        if u == sink {
            let flow = super::bottleneck(graph, &path);
            super::augment(graph, &path, flow);
            return Some((path, flow));
        }
        if !level.contains_key(&u) || *dead_end.get(index[&u]).unwrap() {
            path.pop();
            continue;
        }

        let neighbours = graph.neighbours_ordered(u);
        let idx = current.entry(u).or_insert(0);
        let mut advanced = false;

        let u_level = level[&u];
        while *idx < neighbours.len() {
            let v = neighbours[*idx];
            let Some(edge) = graph.get_edge(u, v) else {
                *idx += 1;
                continue;
            };
            if *dead_end.get(index[&v]).unwrap() {
                *idx += 1;
                continue;
            }
            let level_ok = level.get(&v).is_some_and(|&lv| lv == u_level + 1);
            if !is_traversable(edge.residual, epsilon) || !level_ok {
                *idx += 1;
                continue;
            }
            // idx is left pointing at this arc; if it turns into a dead end
            // the next call resumes past it instead of re-scanning.
            path.push(v);
            advanced = true;
            break;
        }

        if !advanced {
            dead_end.set(index[&u], true);
            path.pop();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clrs_graph() -> ResidualGraph {
        let mut g = ResidualGraph::new();
        let edges = [
            (0, 1, 16.0),
            (0, 2, 13.0),
            (1, 2, 10.0),
            (1, 3, 12.0),
            (2, 1, 4.0),
            (2, 4, 14.0),
            (3, 2, 9.0),
            (3, 5, 20.0),
            (4, 3, 7.0),
            (4, 5, 4.0),
        ];
        for (u, v, c) in edges {
            g.add_edge_with_reverse(u, v, c, 0.0);
        }
        g
    }

    #[test]
    fn clrs_graph_max_flow_is_23() {
        let mut g = clrs_graph();
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = solve(&mut g, 0, 5, &options, &token);
        assert_eq!(result.max_flow, 23.0);
    }

    #[test]
    fn disconnected_graph_yields_zero() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 2, 10.0, 0.0);
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = solve(&mut g, 1, 99, &options, &token);
        assert_eq!(result.max_flow, 0.0);
    }

    #[test]
    fn streams_paths_via_callback() {
        let mut g = clrs_graph();
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let mut seen = Vec::new();
        let mut cb = |path: &[NodeId], flow: Flow| seen.push((path.to_vec(), flow));
        let result = solve_with_callback(&mut g, 0, 5, &options, &token, Some(&mut cb));
        assert_eq!(result.max_flow, 23.0);
        assert!(!seen.is_empty());
        let total: Flow = seen.iter().map(|(_, f)| f).sum();
        assert_eq!(total, 23.0);
    }

    #[test]
    fn bfs_level_graph_assigns_hop_distances() {
        let g = clrs_graph();
        let level = bfs_level_graph(&g, 0, 5, 1e-9).unwrap();
        assert_eq!(level[&0], 0);
        assert_eq!(level[&1], 1);
        assert_eq!(level[&5], 3);
    }
}
