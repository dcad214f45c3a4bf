//! Bellman-Ford shortest paths (spec §4.2)
//!
//! Handles negative edge costs (the reason Dijkstra can't be used
//! unconditionally once reduced costs or raw costs go negative) and
//! detects a negative cycle reachable from the source.

use super::{approx_zero, ResidualGraph};
use crate::cancel::{CancelCheck, CancellationToken};
use crate::types::{Cost, NodeId};
use std::collections::HashMap;

/// How far a shortest-path call got.
#[derive(Debug, Clone, PartialEq)]
pub struct BellmanFordResult {
    /// Shortest distance from the source to each reachable node.
    pub dist: HashMap<NodeId, Cost>,
    /// BFS/shortest-path parent pointers, for path reconstruction.
    pub parent: HashMap<NodeId, NodeId>,
    /// True iff a negative cycle reachable from the source was detected.
    pub has_negative_cycle: bool,
    /// True iff cancellation fired before the relaxation phase finished.
    pub canceled: bool,
}

/// The capability design-note §9 asks for: SSP can accept either a
/// Bellman-Ford or a Dijkstra result without caring which kernel produced
/// it.
pub trait ShortestPathResult {
    /// Distance to `node`, or `None` if unreached.
    fn get_distance(&self, node: NodeId) -> Option<Cost>;
    /// Parent of `node` on the shortest-path tree, or `None` at the source
    /// or if unreached.
    fn get_parent(&self, node: NodeId) -> Option<NodeId>;
}

impl ShortestPathResult for BellmanFordResult {
    fn get_distance(&self, node: NodeId) -> Option<Cost> {
        self.dist.get(&node).copied()
    }
    fn get_parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent.get(&node).copied()
    }
}

/// Plain Bellman-Ford from `source` over edges with residual capacity
/// `> epsilon`, using raw edge costs.
#[must_use]
pub fn bellman_ford(
    graph: &ResidualGraph,
    source: NodeId,
    epsilon: f64,
    token: &CancellationToken,
) -> BellmanFordResult {
    run(graph, source, epsilon, token, None, None)
}

/// Bellman-Ford relaxing the reduced cost `c(u,v) + pi(u) - pi(v)` instead
/// of the raw cost — used to bootstrap / refresh Johnson potentials for
/// min-cost flow (spec §4.8).
#[must_use]
pub fn bellman_ford_with_potentials(
    graph: &ResidualGraph,
    source: NodeId,
    potentials: &HashMap<NodeId, Cost>,
    epsilon: f64,
    token: &CancellationToken,
) -> BellmanFordResult {
    run(graph, source, epsilon, token, Some(potentials), None)
}

/// Bellman-Ford that only cares about `dist[sink]`: it stops two
/// consecutive outer iterations after `dist[sink]` last improved, even if
/// interior nodes could still relax further. This is a heuristic (spec
/// §4.2) — only use it when the caller discards every distance but the
/// sink's.
#[must_use]
pub fn bellman_ford_to_sink(
    graph: &ResidualGraph,
    source: NodeId,
    sink: NodeId,
    epsilon: f64,
    token: &CancellationToken,
) -> BellmanFordResult {
    run(graph, source, epsilon, token, None, Some(sink))
}

fn run(
    graph: &ResidualGraph,
    source: NodeId,
    epsilon: f64,
    token: &CancellationToken,
    potentials: Option<&HashMap<NodeId, Cost>>,
    to_sink: Option<NodeId>,
) -> BellmanFordResult {
    let nodes = graph.sorted_nodes();
    let n = nodes.len();
    let mut dist: HashMap<NodeId, Cost> = nodes.iter().map(|&v| (v, f64::INFINITY)).collect();
    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    dist.insert(source, 0.0);

    let reduced_cost = |u: NodeId, v: NodeId, raw: Cost| -> Cost {
        match potentials {
            Some(pi) => raw + pi.get(&u).copied().unwrap_or(0.0) - pi.get(&v).copied().unwrap_or(0.0),
            None => raw,
        }
    };

    let mut check = CancelCheck::new(token, 100);
    let mut sink_stable_rounds = 0u32;
    let mut prev_sink_dist = to_sink.map(|_| f64::INFINITY);

    let mut pass = 0usize;
    while pass < n {
        pass += 1;
        if check.tick() {
            return BellmanFordResult {
                dist,
                parent,
                has_negative_cycle: false,
                canceled: true,
            };
        }

        let mut changed = false;
        for &u in &nodes {
            let du = dist[&u];
            if !du.is_finite() {
                continue;
            }
            for v in graph.neighbours_ordered(u) {
                let edge = graph.get_edge(u, v).expect("neighbours_ordered target must exist");
                if approx_zero(edge.residual, epsilon) || edge.residual < 0.0 {
                    continue;
                }
                let candidate = du + reduced_cost(u, v, edge.cost);
                if candidate < dist[&v] - epsilon {
                    dist.insert(v, candidate);
                    parent.insert(v, u);
                    changed = true;
                }
            }
        }

        if let Some(sink) = to_sink {
            let sink_dist = dist[&sink];
            if sink_dist >= prev_sink_dist.unwrap() - epsilon {
                sink_stable_rounds += 1;
            } else {
                sink_stable_rounds = 0;
            }
            prev_sink_dist = Some(sink_dist);
            if sink_stable_rounds >= 2 {
                break;
            }
        }

        if !changed {
            break;
        }
    }

    // One more relaxation pass: any further improvement means a reachable
    // negative cycle.
    let mut has_negative_cycle = false;
    for &u in &nodes {
        let du = dist[&u];
        if !du.is_finite() {
            continue;
        }
        for v in graph.neighbours_ordered(u) {
            let edge = graph.get_edge(u, v).expect("neighbours_ordered target must exist");
            if approx_zero(edge.residual, epsilon) || edge.residual < 0.0 {
                continue;
            }
            let candidate = du + reduced_cost(u, v, edge.cost);
            if candidate < dist[&v] - epsilon {
                has_negative_cycle = true;
                break;
            }
        }
        if has_negative_cycle {
            break;
        }
    }

    BellmanFordResult {
        dist,
        parent,
        has_negative_cycle,
        canceled: false,
    }
}

#[must_use]
pub(crate) fn reconstruct_path(
    parent: &HashMap<NodeId, NodeId>,
    source: NodeId,
    target: NodeId,
) -> Option<Vec<NodeId>> {
    if source == target {
        return Some(vec![source]);
    }
    let mut path = vec![target];
    let mut current = target;
    while current != source {
        match parent.get(&current) {
            Some(&p) => {
                path.push(p);
                current = p;
            }
            None => return None,
        }
    }
    path.reverse();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> ResidualGraph {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(0, 1, 10.0, 1.0);
        g.add_edge_with_reverse(1, 2, 10.0, 2.0);
        g.add_edge_with_reverse(0, 2, 10.0, 100.0);
        g
    }

    #[test]
    fn finds_shortest_path_by_cost() {
        let g = sample_graph();
        let token = CancellationToken::new();
        let result = bellman_ford(&g, 0, 1e-9, &token);
        assert_eq!(result.dist[&2], 3.0);
        assert_eq!(reconstruct_path(&result.parent, 0, 2), Some(vec![0, 1, 2]));
    }

    #[test]
    fn detects_negative_cycle() {
        let mut g = ResidualGraph::new();
        g.add_edge(0, 1, 10.0, 1.0);
        g.add_edge(1, 2, 10.0, -5.0);
        g.add_edge(2, 1, 10.0, -5.0);
        let token = CancellationToken::new();
        let result = bellman_ford(&g, 0, 1e-9, &token);
        assert!(result.has_negative_cycle);
    }

    #[test]
    fn to_sink_variant_matches_plain_sink_distance() {
        let g = sample_graph();
        let token = CancellationToken::new();
        let plain = bellman_ford(&g, 0, 1e-9, &token);
        let to_sink = bellman_ford_to_sink(&g, 0, 2, 1e-9, &token);
        assert_eq!(plain.dist[&2], to_sink.dist[&2]);
    }

    #[test]
    fn cancellation_returns_partial_result() {
        // A chain relaxed against sorted-node order so convergence takes
        // one pass per hop, forcing the loop past the period-100 check.
        let mut g = ResidualGraph::new();
        for u in 1..150 {
            g.add_edge(u, u - 1, 10.0, 1.0);
        }
        let token = CancellationToken::new();
        token.cancel();
        let result = bellman_ford(&g, 149, 1e-9, &token);
        assert!(result.canceled);
    }
}
