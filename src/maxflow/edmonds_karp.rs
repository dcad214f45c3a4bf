//! Edmonds-Karp max flow (spec §4.4): Ford-Fulkerson specialized to BFS
//! augmenting paths, guaranteeing O(VE^2) instead of depending on capacity
//! magnitudes.

use super::{augment, bottleneck, is_traversable};
use crate::cancel::{CancelCheck, CancellationToken};
use crate::graph::ResidualGraph;
use crate::supervisor::options::SolverOptions;
use crate::types::{Flow, NodeId, PathNodes, RecordedPath, SolverResult, SolverStatus};
use bitvec::vec::BitVec;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// Run Edmonds-Karp from `source` to `sink`, mutating `graph` in place.
pub fn solve(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    options: &SolverOptions,
    token: &CancellationToken,
) -> SolverResult {
    let start = Instant::now();
    let span = tracing::info_span!("edmonds_karp", ?source, ?sink);
    let _guard = span.enter();

    let mut max_flow: Flow = 0.0;
    let mut iterations = 0usize;
    let mut paths = Vec::new();
    let mut check = CancelCheck::new(token, 100);

    loop {
        if check.tick() {
            tracing::warn!("edmonds_karp: cancelled mid-run");
            return SolverResult::canceled_partial(max_flow, graph.total_cost(), iterations, start.elapsed().as_secs_f64());
        }
        if options.iteration_cap_reached(iterations) {
            tracing::warn!(iterations, "edmonds_karp: iteration cap reached");
            break;
        }

        let Some(path) = bfs_path(graph, source, sink, options.epsilon) else {
            break;
        };
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

/// Shortest (fewest-edges) augmenting path from `source` to `sink`.
fn bfs_path(graph: &ResidualGraph, source: NodeId, sink: NodeId, epsilon: f64) -> Option<PathNodes> {
    let index = graph.node_index();
    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut visited: BitVec = BitVec::repeat(false, graph.num_nodes());
    visited.set(index[&source], true);
    let mut queue = VecDeque::new();
    queue.push_back(source);

    while let Some(u) = queue.pop_front() {
        if u == sink {
            break;
        }
        for v in graph.neighbours_ordered(u) {
            if *visited.get(index[&v]).unwrap() {
                continue;
            }
            let Some(edge) = graph.get_edge(u, v) else { continue };
            if !is_traversable(edge.residual, epsilon) {
                continue;
            }
            visited.set(index[&v], true);
            parent.insert(v, u);
            queue.push_back(v);
        }
    }

    if !*visited.get(index[&sink]).unwrap() {
        return None;
    }
    let mut path: PathNodes = PathNodes::from_slice(&[sink]);
    let mut current = sink;
    while current != source {
        let p = *parent.get(&current)?;
        path.push(p);
        current = p;
    }
    path.reverse();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clrs_graph_max_flow_is_23() {
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
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = solve(&mut g, 0, 5, &options, &token);
        assert_eq!(result.max_flow, 23.0);
    }

    #[test]
    fn bottleneck_chain_caps_flow_at_one() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 2, 10.0, 0.0);
        g.add_edge_with_reverse(2, 3, 1.0, 0.0);
        g.add_edge_with_reverse(3, 4, 10.0, 0.0);
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = solve(&mut g, 1, 4, &options, &token);
        assert_eq!(result.max_flow, 1.0);
    }

    #[test]
    fn finds_shortest_augmenting_path_first() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 2, 5.0, 0.0);
        g.add_edge_with_reverse(1, 3, 5.0, 0.0);
        g.add_edge_with_reverse(3, 2, 5.0, 0.0);
        g.add_edge_with_reverse(2, 4, 5.0, 0.0);
        let path = bfs_path(&g, 1, 4, 1e-9).unwrap();
        assert_eq!(path.as_slice(), &[1, 2, 4]);
    }
}
