//! Algorithm dispatch (spec §4.10): maps the [`Algorithm`] enum to an
//! engine function, and recommends one when the caller leaves it
//! unspecified.

use crate::cancel::CancellationToken;
use crate::graph::ResidualGraph;
use crate::maxflow::{dinic, edmonds_karp, ford_fulkerson};
use crate::mincost::{capacity_scaling, ssp};
use crate::push_relabel::{self, Variant};
use crate::types::{Algorithm, NodeId, SolverResult};

use super::options::SolverOptions;

/// Run `algorithm` from `source` to `sink`, resolving [`Algorithm::Unspecified`]
/// via [`recommend`] first.
pub fn dispatch(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    algorithm: Algorithm,
    options: &SolverOptions,
    token: &CancellationToken,
) -> SolverResult {
    let resolved = if algorithm == Algorithm::Unspecified {
        recommend(graph, options)
    } else {
        algorithm
    };

    match resolved {
        Algorithm::Unspecified => dinic::solve(graph, source, sink, options, token),
        Algorithm::FordFulkerson => ford_fulkerson::solve_iterative(graph, source, sink, options, token),
        Algorithm::EdmondsKarp => edmonds_karp::solve(graph, source, sink, options, token),
        Algorithm::Dinic => dinic::solve(graph, source, sink, options, token),
        Algorithm::PushRelabel => push_relabel::solve(graph, source, sink, Variant::Fifo, options, token),
        Algorithm::MinCost => {
            if graph.max_capacity() > capacity_scaling::CAPACITY_SCALING_THRESHOLD {
                capacity_scaling::solve(graph, source, sink, None, options, token)
            } else {
                ssp::solve(graph, source, sink, None, options, token)
            }
        }
    }
}

/// Recommendation heuristic (spec §4.10):
/// - Needs min-cost or has any negative edge cost -> `MinCost`.
/// - Dense (`edges / (n(n-1)) > 0.5`) and `n > 100` -> `PushRelabel`.
/// - `n > 100` -> `Dinic`.
/// - Otherwise -> `EdmondsKarp`.
#[must_use]
pub fn recommend(graph: &ResidualGraph, options: &SolverOptions) -> Algorithm {
    if graph.has_nonzero_cost(options.epsilon) {
        return Algorithm::MinCost;
    }

    let n = graph.num_nodes();
    let e = graph.num_edges();
    if n > 100 {
        let density = if n > 1 { e as f64 / (n as f64 * (n as f64 - 1.0)) } else { 0.0 };
        if density > 0.5 {
            return Algorithm::PushRelabel;
        }
        return Algorithm::Dinic;
    }
    Algorithm::EdmondsKarp
}
