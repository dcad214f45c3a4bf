//! Min-cost flow engines (spec §4.8-§4.9): Successive Shortest Paths with
//! Johnson potentials, and Capacity Scaling for large-capacity graphs.

pub mod capacity_scaling;
pub mod ssp;

use crate::graph::ResidualGraph;
use crate::types::{Flow, NodeId};

/// Minimum residual capacity along a node-to-node path, capped by
/// `required` flow still needed.
pub(crate) fn bottleneck(graph: &ResidualGraph, path: &[NodeId], required: Flow) -> Flow {
    path.windows(2)
        .map(|w| graph.get_edge(w[0], w[1]).map_or(0.0, |e| e.residual))
        .fold(required, f64::min)
}

pub(crate) fn augment(graph: &mut ResidualGraph, path: &[NodeId], amount: Flow) {
    for w in path.windows(2) {
        graph.update_flow(w[0], w[1], amount);
    }
}

/// Sum of `edge.cost * path_flow` over the forward-augmentation edges of
/// `path`, using original (not reduced) costs.
pub(crate) fn path_cost(graph: &ResidualGraph, path: &[NodeId]) -> crate::types::Cost {
    path.windows(2)
        .map(|w| graph.get_edge(w[0], w[1]).map_or(0.0, |e| e.cost))
        .sum()
}

/// `R(|V|)` adaptive potential re-initialisation period (spec §4.8).
pub(crate) fn potential_refresh_period(num_nodes: usize) -> usize {
    if num_nodes < 50 {
        100
    } else if num_nodes < 500 {
        200
    } else {
        500
    }
}
