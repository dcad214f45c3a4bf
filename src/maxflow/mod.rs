//! Max-flow engines (spec §4.4-§4.6): Ford-Fulkerson, Edmonds-Karp, Dinic.
//!
//! Every engine here must agree on the max-flow *value* for the same input
//! (spec §8, testable property 4) even though the specific flow
//! decomposition they land on may differ.

pub mod dinic;
pub mod edmonds_karp;
pub mod ford_fulkerson;

use crate::graph::{approx_zero, ResidualGraph};
use crate::types::{Flow, NodeId};

/// Minimum residual capacity along a node-to-node path (consecutive pairs).
pub(crate) fn bottleneck(graph: &ResidualGraph, path: &[NodeId]) -> Flow {
    path.windows(2)
        .map(|w| graph.get_edge(w[0], w[1]).map_or(0.0, |e| e.residual))
        .fold(f64::INFINITY, f64::min)
}

/// Push `amount` along every consecutive pair of `path`.
pub(crate) fn augment(graph: &mut ResidualGraph, path: &[NodeId], amount: Flow) {
    for w in path.windows(2) {
        graph.update_flow(w[0], w[1], amount);
    }
}

pub(crate) fn is_traversable(residual: Flow, epsilon: f64) -> bool {
    residual > 0.0 && !approx_zero(residual, epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottleneck_is_the_minimum_residual() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 2, 10.0, 0.0);
        g.add_edge_with_reverse(2, 3, 4.0, 0.0);
        assert_eq!(bottleneck(&g, &[1, 2, 3]), 4.0);
    }

    #[test]
    fn augment_updates_every_edge_on_path() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 2, 10.0, 0.0);
        g.add_edge_with_reverse(2, 3, 10.0, 0.0);
        augment(&mut g, &[1, 2, 3], 5.0);
        assert_eq!(g.get_edge(1, 2).unwrap().residual, 5.0);
        assert_eq!(g.get_edge(2, 3).unwrap().residual, 5.0);
    }
}
