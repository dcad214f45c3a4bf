//! Dijkstra's shortest path algorithm (spec §4.3)
//!
//! Correct only when every relaxed edge has non-negative effective cost.
//! Both the raw-cost and reduced-cost (potentials) variants fall back to
//! Bellman-Ford when that assumption breaks, rather than producing a wrong
//! answer.

use super::approx_zero;
use super::bellman_ford::{self, BellmanFordResult, ShortestPathResult};
use super::ResidualGraph;
use crate::cancel::CancellationToken;
use crate::types::{Cost, NodeId};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Dijkstra's result, or the Bellman-Ford result it fell back to.
#[derive(Debug, Clone, PartialEq)]
pub enum DijkstraOutcome {
    /// Dijkstra completed without hitting a negative effective cost.
    Dijkstra(DijkstraResult),
    /// A negative effective cost was seen; Bellman-Ford's result is
    /// authoritative instead.
    FellBackToBellmanFord(BellmanFordResult),
}

impl DijkstraOutcome {
    /// True iff this outcome is the fallback branch.
    #[must_use]
    pub fn fell_back(&self) -> bool {
        matches!(self, Self::FellBackToBellmanFord(_))
    }
}

impl ShortestPathResult for DijkstraOutcome {
    fn get_distance(&self, node: NodeId) -> Option<Cost> {
        match self {
            Self::Dijkstra(r) => r.get_distance(node),
            Self::FellBackToBellmanFord(r) => r.get_distance(node),
        }
    }
    fn get_parent(&self, node: NodeId) -> Option<NodeId> {
        match self {
            Self::Dijkstra(r) => r.get_parent(node),
            Self::FellBackToBellmanFord(r) => r.get_parent(node),
        }
    }
}

/// Plain Dijkstra result.
#[derive(Debug, Clone, PartialEq)]
pub struct DijkstraResult {
    /// Shortest distance from the source to each reachable node.
    pub dist: HashMap<NodeId, Cost>,
    /// Shortest-path parent pointers.
    pub parent: HashMap<NodeId, NodeId>,
    /// True iff cancellation fired before completion.
    pub canceled: bool,
}

impl ShortestPathResult for DijkstraResult {
    fn get_distance(&self, node: NodeId) -> Option<Cost> {
        self.dist.get(&node).copied()
    }
    fn get_parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent.get(&node).copied()
    }
}

/// Raw-cost mode: on the first edge with cost `< -epsilon`, abort and
/// delegate to plain Bellman-Ford.
#[must_use]
pub fn dijkstra(
    graph: &ResidualGraph,
    source: NodeId,
    epsilon: f64,
    token: &CancellationToken,
) -> DijkstraOutcome {
    run(graph, source, epsilon, token, None, 0)
}

/// Potentials mode: relax the reduced cost `c(u,v) + pi(u) - pi(v)`. A
/// reduced cost in `(-epsilon, 0]` is clamped to 0 (numerical noise); one
/// below `-epsilon` delegates to Bellman-Ford-with-potentials.
///
/// `fallback_threshold` is how many negative-reduced-cost sightings are
/// tolerated before falling back (spec §9 open question — this crate
/// honours the option as a counter; pass `1` to fall back on the first
/// sighting).
#[must_use]
pub fn dijkstra_with_potentials(
    graph: &ResidualGraph,
    source: NodeId,
    potentials: &HashMap<NodeId, Cost>,
    epsilon: f64,
    token: &CancellationToken,
    fallback_threshold: u32,
) -> DijkstraOutcome {
    run(graph, source, epsilon, token, Some(potentials), fallback_threshold.max(1))
}

fn run(
    graph: &ResidualGraph,
    source: NodeId,
    epsilon: f64,
    token: &CancellationToken,
    potentials: Option<&HashMap<NodeId, Cost>>,
    fallback_threshold: u32,
) -> DijkstraOutcome {
    let reduced_cost = |u: NodeId, v: NodeId, raw: Cost| -> Cost {
        match potentials {
            Some(pi) => raw + pi.get(&u).copied().unwrap_or(0.0) - pi.get(&v).copied().unwrap_or(0.0),
            None => raw,
        }
    };

    let mut dist: HashMap<NodeId, Cost> = HashMap::new();
    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, NodeId)>> = BinaryHeap::new();
    dist.insert(source, 0.0);
    heap.push(Reverse((OrderedFloat(0.0), source)));

    let mut negative_sightings: u32 = 0;
    let mut check_count: u64 = 0;

    while let Some(Reverse((OrderedFloat(d), u))) = heap.pop() {
        check_count += 1;
        if check_count % 100 == 0 && token.is_cancelled() {
            return DijkstraOutcome::Dijkstra(DijkstraResult {
                dist,
                parent,
                canceled: true,
            });
        }

        if d > dist.get(&u).copied().unwrap_or(f64::INFINITY) + epsilon {
            continue; // stale heap entry
        }

        for v in graph.neighbours_ordered(u) {
            let edge = graph.get_edge(u, v).expect("neighbours_ordered target must exist");
            if approx_zero(edge.residual, epsilon) || edge.residual < 0.0 {
                continue;
            }
            let mut weight = reduced_cost(u, v, edge.cost);
            if potentials.is_some() && weight < 0.0 && weight > -epsilon {
                weight = 0.0; // numerical noise
            }
            if weight < -epsilon {
                negative_sightings += 1;
                if negative_sightings >= fallback_threshold {
                    return fall_back(graph, source, epsilon, token, potentials);
                }
                continue;
            }

            let candidate = d + weight;
            let better = dist.get(&v).map_or(true, |&best| candidate < best - epsilon);
            if better {
                dist.insert(v, candidate);
                parent.insert(v, u);
                heap.push(Reverse((OrderedFloat(candidate), v)));
            }
        }
    }

    DijkstraOutcome::Dijkstra(DijkstraResult {
        dist,
        parent,
        canceled: false,
    })
}

fn fall_back(
    graph: &ResidualGraph,
    source: NodeId,
    epsilon: f64,
    token: &CancellationToken,
    potentials: Option<&HashMap<NodeId, Cost>>,
) -> DijkstraOutcome {
    tracing::warn!(source, "dijkstra: negative reduced cost detected, falling back to bellman-ford");
    let result = match potentials {
        Some(pi) => bellman_ford::bellman_ford_with_potentials(graph, source, pi, epsilon, token),
        None => bellman_ford::bellman_ford(graph, source, epsilon, token),
    };
    DijkstraOutcome::FellBackToBellmanFord(result)
}

/// Pre-scan every edge in sorted order; if any has a raw cost `< -epsilon`,
/// skip Dijkstra entirely and go straight to Bellman-Ford. Useful when the
/// caller already suspects negative costs and wants to avoid the wasted
/// partial Dijkstra run.
#[must_use]
pub fn dijkstra_with_prescan(
    graph: &ResidualGraph,
    source: NodeId,
    epsilon: f64,
    token: &CancellationToken,
) -> DijkstraOutcome {
    for u in graph.sorted_nodes() {
        for v in graph.neighbours_ordered(u) {
            if let Some(edge) = graph.get_edge(u, v) {
                if edge.cost < -epsilon {
                    return fall_back(graph, source, epsilon, token, None);
                }
            }
        }
    }
    dijkstra(graph, source, epsilon, token)
}
