//! End-to-end invariant and scenario tests that exercise the public API
//! the way a caller embedding this crate would: build a graph, run an
//! engine, check the result and the mutated residual graph.

use flowcore::cancel::CancellationToken;
use flowcore::graph::{DEFAULT_EPSILON, ResidualGraph};
use flowcore::maxflow::{dinic, edmonds_karp, ford_fulkerson};
use flowcore::mincost::ssp;
use flowcore::push_relabel::{self, Variant};
use flowcore::supervisor::options::SolverOptions;
use approx::assert_abs_diff_eq;
use proptest::prelude::*;

fn token() -> CancellationToken {
    CancellationToken::new()
}

fn options() -> SolverOptions {
    SolverOptions::default()
}

/// Every non-source, non-sink node has balanced in/out flow (invariant 1).
fn assert_flow_conservation(graph: &ResidualGraph, source: usize, sink: usize) {
    for &v in &graph.sorted_nodes() {
        if v == source || v == sink {
            continue;
        }
        let mut inflow = 0.0;
        let mut outflow = 0.0;
        for &u in &graph.sorted_nodes() {
            if let Some(edge) = graph.get_edge(u, v) {
                if !edge.is_reverse {
                    inflow += edge.flow;
                }
            }
        }
        if let Some(neighbours) = graph.neighbours(v) {
            for edge in neighbours.values() {
                if !edge.is_reverse {
                    outflow += edge.flow;
                }
            }
        }
        assert_abs_diff_eq!(inflow, outflow, epsilon = 1e-6);
    }
}

/// Every forward edge's flow sits within `[0, original_capacity]`
/// (invariant 2) and the residual/flow/capacity triangle holds
/// (invariant 3).
fn assert_capacity_and_residual_consistency(graph: &ResidualGraph) {
    for &u in &graph.sorted_nodes() {
        let Some(neighbours) = graph.neighbours(u) else { continue };
        for edge in neighbours.values() {
            if edge.is_reverse {
                continue;
            }
            assert!(edge.flow >= -1e-6, "negative flow on ({u}, {})", edge.to);
            assert!(edge.flow <= edge.original_capacity + 1e-6, "flow exceeds capacity on ({u}, {})", edge.to);
            assert_abs_diff_eq!(edge.residual + edge.flow, edge.original_capacity, epsilon = 1e-6);
            if let Some(reverse) = graph.get_edge(edge.to, u) {
                if reverse.is_reverse {
                    assert_abs_diff_eq!(reverse.residual, edge.flow, epsilon = 1e-6);
                }
            }
        }
    }
}

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
    for (u, v, cap) in edges {
        g.add_edge_with_reverse(u, v, cap, 0.0);
    }
    g
}

// --- Scenario table (spec §8) ---

#[test]
fn scenario_single_edge() {
    let mut g = ResidualGraph::new();
    g.add_edge_with_reverse(1, 2, 10.0, 5.0);
    let result = edmonds_karp::solve(&mut g, 1, 2, &options(), &token());
    assert_eq!(result.max_flow, 10.0);
    assert_flow_conservation(&g, 1, 2);
    assert_capacity_and_residual_consistency(&g);
}

#[test]
fn scenario_diamond() {
    let mut g = ResidualGraph::new();
    for (u, v) in [(1, 2), (1, 3), (2, 4), (3, 4)] {
        g.add_edge_with_reverse(u, v, 10.0, 1.0);
    }
    let result = dinic::solve(&mut g, 1, 4, &options(), &token());
    assert_eq!(result.max_flow, 20.0);
}

#[test]
fn scenario_clrs_dinic() {
    let mut g = clrs_graph();
    let result = dinic::solve(&mut g, 0, 5, &options(), &token());
    assert_eq!(result.max_flow, 23.0);
    assert_flow_conservation(&g, 0, 5);
    assert_capacity_and_residual_consistency(&g);
}

#[test]
fn scenario_two_parallel_paths_min_cost() {
    let mut g = ResidualGraph::new();
    g.add_edge_with_reverse(1, 2, 10.0, 1.0);
    g.add_edge_with_reverse(2, 4, 10.0, 1.0);
    g.add_edge_with_reverse(1, 3, 10.0, 10.0);
    g.add_edge_with_reverse(3, 4, 10.0, 10.0);
    let result = ssp::solve(&mut g, 1, 4, None, &options(), &token());
    assert_eq!(result.max_flow, 20.0);
    assert_eq!(result.total_cost, 220.0);
}

#[test]
fn scenario_bottleneck_chain() {
    let mut g = ResidualGraph::new();
    g.add_edge_with_reverse(1, 2, 100.0, 0.0);
    g.add_edge_with_reverse(2, 3, 1.0, 0.0);
    g.add_edge_with_reverse(3, 4, 100.0, 0.0);
    let result = edmonds_karp::solve(&mut g, 1, 4, &options(), &token());
    assert_eq!(result.max_flow, 1.0);
}

#[test]
fn scenario_disconnected() {
    let mut g = ResidualGraph::new();
    g.add_edge_with_reverse(1, 2, 10.0, 0.0);
    g.add_edge_with_reverse(3, 4, 10.0, 0.0);
    let result = dinic::solve(&mut g, 1, 4, &options(), &token());
    assert_eq!(result.max_flow, 0.0);
    assert_eq!(result.total_cost, 0.0);
}

// --- Universal invariants (spec §8) ---

#[test]
fn all_max_flow_engines_agree_on_clrs_graph() {
    let mut g1 = clrs_graph();
    let mut g2 = clrs_graph();
    let mut g3 = clrs_graph();
    let mut g4 = clrs_graph();

    let r1 = ford_fulkerson::solve_iterative(&mut g1, 0, 5, &options(), &token());
    let r2 = edmonds_karp::solve(&mut g2, 0, 5, &options(), &token());
    let r3 = dinic::solve(&mut g3, 0, 5, &options(), &token());
    let r4 = push_relabel::solve(&mut g4, 0, 5, Variant::Fifo, &options(), &token());

    assert_abs_diff_eq!(r1.max_flow, 23.0, epsilon = 1e-6);
    assert_abs_diff_eq!(r2.max_flow, r1.max_flow, epsilon = 1e-6);
    assert_abs_diff_eq!(r3.max_flow, r1.max_flow, epsilon = 1e-6);
    assert_abs_diff_eq!(r4.max_flow, r1.max_flow, epsilon = 1e-6);
}

#[test]
fn determinism_two_runs_on_equal_inputs_agree() {
    let mut g1 = clrs_graph();
    let mut g2 = clrs_graph();
    let r1 = dinic::solve(&mut g1, 0, 5, &options(), &token());
    let r2 = dinic::solve(&mut g2, 0, 5, &options(), &token());
    assert_eq!(r1.max_flow, r2.max_flow);
    assert_eq!(r1.total_cost, r2.total_cost);
    assert_eq!(r1.iterations, r2.iterations);
}

#[test]
fn negative_cycle_yields_zero_flow_without_looping() {
    let mut g = ResidualGraph::new();
    g.add_edge_with_reverse(1, 2, 10.0, -5.0);
    g.add_edge_with_reverse(2, 1, 10.0, -5.0);
    g.add_edge_with_reverse(1, 3, 10.0, 1.0);
    let result = ssp::solve(&mut g, 1, 3, None, &options(), &token());
    assert_eq!(result.max_flow, 0.0);
}

#[test]
fn cancellation_yields_a_valid_partial_flow() {
    // A long chain forces Dinic's DFS past the 100-step cancellation
    // check boundary before it can finish, so an already-cancelled token
    // is guaranteed to be observed mid-phase.
    let mut g = ResidualGraph::new();
    for i in 0..300 {
        g.add_edge_with_reverse(i, i + 1, 5.0, 0.0);
    }
    let t = token();
    t.cancel();
    let result = dinic::solve(&mut g, 0, 300, &options(), &t);
    assert!(result.canceled);
    assert!(result.max_flow <= 5.0 + 1e-6);
    assert_capacity_and_residual_consistency(&g);
}

#[test]
fn zero_capacity_and_self_loop_edges_are_inert() {
    let mut g = ResidualGraph::new();
    g.add_edge_with_reverse(1, 1, 5.0, 0.0);
    g.add_edge_with_reverse(1, 2, 0.0, 0.0);
    g.add_edge_with_reverse(1, 3, 10.0, 0.0);
    g.add_edge_with_reverse(3, 2, 10.0, 0.0);
    let result = edmonds_karp::solve(&mut g, 1, 2, &options(), &token());
    assert_eq!(result.max_flow, 10.0);
}

proptest! {
    /// Randomized layered graphs: whatever max flow Edmonds-Karp finds,
    /// the mutated graph still satisfies conservation and residual
    /// consistency (invariants 1-3), regardless of the random topology.
    #[test]
    fn random_layered_graphs_preserve_flow_invariants(
        layer_width in 2usize..5,
        num_layers in 2usize..4,
        seed in 0u64..1000,
    ) {
        let mut g = ResidualGraph::new();
        let mut rng_state = seed.wrapping_mul(2654435761).wrapping_add(1);
        let mut next = move || {
            rng_state ^= rng_state << 13;
            rng_state ^= rng_state >> 7;
            rng_state ^= rng_state << 17;
            rng_state
        };

        let source = 0usize;
        let sink = num_layers * layer_width + 1;
        for layer in 0..num_layers {
            for w in 0..layer_width {
                let u = if layer == 0 { source } else { (layer - 1) * layer_width + w + 1 };
                for w2 in 0..layer_width {
                    let v = if layer == num_layers - 1 { sink } else { layer * layer_width + w2 + 1 };
                    let capacity = (next() % 20 + 1) as f64;
                    g.add_edge_with_reverse(u, v, capacity, 0.0);
                }
            }
        }

        let result = edmonds_karp::solve(&mut g, source, sink, &options(), &token());
        prop_assert!(result.max_flow >= 0.0);
        assert_flow_conservation(&g, source, sink);
        assert_capacity_and_residual_consistency(&g);
    }
}

#[test]
fn epsilon_tolerant_conservation_check_does_not_false_positive() {
    let mut g = ResidualGraph::new();
    g.add_edge_with_reverse(1, 2, 10.0 + DEFAULT_EPSILON / 2.0, 0.0);
    let _ = edmonds_karp::solve(&mut g, 1, 2, &options(), &token());
    assert_flow_conservation(&g, 1, 2);
}
