//! The residual graph data model shared by every engine in this crate.
//!
//! - [`ResidualGraph`] — in-memory directed multigraph with forward/reverse
//!   edges, residual capacities, costs, and running flow (spec §3/§4.1).
//! - [`bellman_ford`] / [`dijkstra`] — shortest-path kernels the max-flow
//!   and min-cost-flow engines share (spec §4.2/§4.3).
//!
//! ## Determinism
//!
//! Every algorithm in this crate iterates edges via
//! [`ResidualGraph::neighbours_ordered`] and nodes via
//! [`ResidualGraph::sorted_nodes`]. Neither is allowed to be replaced by a
//! plain `HashMap` iteration on a hot path whose output must be
//! reproducible (spec §3, "Determinism rule").

pub mod bellman_ford;
pub mod dijkstra;

use crate::types::{Cost, Flow, NodeId};
use crate::Result;
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};

/// Numerical slack below which a value is treated as zero.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// `true` iff `value` is within `epsilon` of zero.
#[must_use]
pub fn approx_zero(value: f64, epsilon: f64) -> bool {
    value.abs() <= epsilon
}

/// A residual edge: either an original forward edge or its synthetic
/// reverse (spec §3 "Residual edge").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Target node of this edge.
    pub to: NodeId,
    /// Remaining capacity that can still be pushed.
    pub residual: Flow,
    /// Cost per unit of flow (negative on the reverse edge).
    pub cost: Cost,
    /// Flow currently carried. Always 0 on a reverse edge — the reverse
    /// edge's residual carries the returnable amount instead.
    pub flow: Flow,
    /// Original capacity. 0 for a synthetic reverse edge.
    pub original_capacity: Flow,
    /// True if this is the synthesized reverse counterpart of a forward edge.
    pub is_reverse: bool,
}

impl Edge {
    fn forward(to: NodeId, capacity: Flow, cost: Cost) -> Self {
        Self {
            to,
            residual: capacity,
            cost,
            flow: 0.0,
            original_capacity: capacity,
            is_reverse: false,
        }
    }

    fn reverse(to: NodeId, cost: Cost) -> Self {
        Self {
            to,
            residual: 0.0,
            cost,
            flow: 0.0,
            original_capacity: 0.0,
            is_reverse: true,
        }
    }
}

/// A directed, capacitated, costed multigraph plus the residual state the
/// flow algorithms mutate in place.
///
/// Node ids need not be contiguous; anything orderable by `usize` is
/// accepted. Parallel edges between the same `(u, v)` collapse into one
/// edge at insertion (capacities add). Self-loops are accepted but never
/// carry flow.
#[derive(Debug, Clone, Default)]
pub struct ResidualGraph {
    nodes: BTreeSet<NodeId>,
    adj: HashMap<NodeId, IndexMap<NodeId, Edge>>,
    incoming_cache: Option<HashMap<NodeId, Vec<NodeId>>>,
    /// Designated source for the current problem, if set.
    pub source: Option<NodeId>,
    /// Designated sink for the current problem, if set.
    pub sink: Option<NodeId>,
}

impl ResidualGraph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent node insertion.
    pub fn add_node(&mut self, id: NodeId) {
        self.nodes.insert(id);
        self.adj.entry(id).or_default();
        self.incoming_cache = None;
    }

    /// Number of distinct nodes.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of forward edges (reverse edges not counted).
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.adj.values().flat_map(IndexMap::values).filter(|e| !e.is_reverse).count()
    }

    /// Node ids in ascending order — the deterministic node-iteration view
    /// required by spec §3.
    #[must_use]
    pub fn sorted_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().copied().collect()
    }

    /// Dense `0..num_nodes` index for each node, in the same order as
    /// [`Self::sorted_nodes`]. Hot loops back per-node scratch state with a
    /// `Vec`/`BitVec` keyed through this map instead of a `HashMap` keyed
    /// directly by (possibly sparse) node id.
    #[must_use]
    pub fn node_index(&self) -> HashMap<NodeId, usize> {
        self.nodes.iter().enumerate().map(|(i, &id)| (id, i)).collect()
    }

    /// Largest forward-edge original capacity in the graph, or `0.0` if
    /// there are no edges. Used to pick capacity scaling's initial delta.
    #[must_use]
    pub fn max_capacity(&self) -> Flow {
        self.adj
            .values()
            .flat_map(IndexMap::values)
            .filter(|e| !e.is_reverse)
            .map(|e| e.original_capacity)
            .fold(0.0_f64, f64::max)
    }

    /// `true` iff any forward edge has a cost outside `[-epsilon, epsilon]`.
    /// Used by the dispatch heuristic: a graph with real costs needs a
    /// min-cost engine, not a pure max-flow one.
    #[must_use]
    pub fn has_nonzero_cost(&self, epsilon: f64) -> bool {
        self.adj
            .values()
            .flat_map(IndexMap::values)
            .filter(|e| !e.is_reverse)
            .any(|e| !approx_zero(e.cost, epsilon))
    }

    /// Create a forward edge with no paired reverse edge. Negative capacity
    /// is clamped to 0 rather than rejected (spec §4.1). A self-loop is
    /// accepted but silently contributes no edge, since it could never
    /// carry flow anyway.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, capacity: Flow, cost: Cost) {
        if from == to {
            self.add_node(from);
            return;
        }
        let capacity = capacity.max(0.0);
        self.add_node(from);
        self.add_node(to);
        self.incoming_cache = None;
        let entry = self.adj.entry(from).or_default();
        match entry.get_mut(&to) {
            Some(existing) if !existing.is_reverse => {
                existing.residual += capacity;
                existing.original_capacity += capacity;
            }
            _ => {
                entry.insert(to, Edge::forward(to, capacity, cost));
            }
        }
    }

    /// Create a forward edge of capacity `C` and cost `cost`, plus a
    /// reverse edge of capacity 0 and cost `-cost` (spec §4.1).
    pub fn add_edge_with_reverse(&mut self, from: NodeId, to: NodeId, capacity: Flow, cost: Cost) {
        if from == to {
            self.add_node(from);
            return;
        }
        self.add_edge(from, to, capacity, cost);
        self.add_node(to);
        self.incoming_cache = None;
        let entry = self.adj.entry(to).or_default();
        entry.entry(from).or_insert_with(|| Edge::reverse(from, -cost));
    }

    /// The edge `u -> v`, if any.
    #[must_use]
    pub fn get_edge(&self, u: NodeId, v: NodeId) -> Option<&Edge> {
        self.adj.get(&u).and_then(|m| m.get(&v))
    }

    /// Keyed-by-target map view of `u`'s outgoing edges. Backed by an
    /// [`IndexMap`], so iterating it already yields insertion order — but
    /// callers that only need *some* edge of `u`'s should prefer this over
    /// [`Self::neighbours_ordered`] only when order genuinely does not
    /// matter to the caller, per the determinism rule in spec §3.
    #[must_use]
    pub fn neighbours(&self, u: NodeId) -> Option<&IndexMap<NodeId, Edge>> {
        self.adj.get(&u)
    }

    /// Ordered list of `u`'s outgoing neighbour ids, insertion order. This
    /// is the view every algorithm in this crate uses on hot paths.
    #[must_use]
    pub fn neighbours_ordered(&self, u: NodeId) -> Vec<NodeId> {
        self.adj
            .get(&u)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// `(from, edge)` pairs for every edge that targets `u`, ordered by
    /// ascending `from`. Computed on demand unless [`Self::build_incoming_cache`]
    /// was called first.
    #[must_use]
    pub fn get_incoming_edges_list(&self, u: NodeId) -> Vec<(NodeId, Edge)> {
        if let Some(cache) = &self.incoming_cache {
            return cache
                .get(&u)
                .map(|froms| {
                    froms
                        .iter()
                        .filter_map(|&from| self.get_edge(from, u).map(|e| (from, *e)))
                        .collect()
                })
                .unwrap_or_default();
        }
        self.sorted_nodes()
            .into_iter()
            .filter_map(|from| self.get_edge(from, u).map(|e| (from, *e)))
            .collect()
    }

    /// Precompute the incoming-edge index so repeated
    /// [`Self::get_incoming_edges_list`] calls are O(1) amortised instead of
    /// O(V) each. Invalidated automatically by any topology mutation.
    pub fn build_incoming_cache(&mut self) {
        let mut cache: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for &from in &self.nodes {
            for to in self.neighbours_ordered(from) {
                cache.entry(to).or_default().push(from);
            }
        }
        self.incoming_cache = Some(cache);
    }

    /// Push `delta` units of flow along `u -> v`: decrement residual of
    /// `u -> v`, increment residual of `v -> u`, increase `u -> v`'s flow.
    /// Synthesizes the reverse edge if it is missing (spec §4.1).
    pub fn update_flow(&mut self, u: NodeId, v: NodeId, delta: Flow) {
        if delta == 0.0 {
            return;
        }
        let cost = self
            .adj
            .get(&u)
            .and_then(|m| m.get(&v))
            .map(|e| e.cost)
            .unwrap_or(0.0);
        self.adj.entry(v).or_default().entry(u).or_insert_with(|| Edge::reverse(u, -cost));

        if let Some(edge) = self.adj.get_mut(&u).and_then(|m| m.get_mut(&v)) {
            edge.residual -= delta;
            edge.flow += delta;
        }
        if let Some(rev) = self.adj.get_mut(&v).and_then(|m| m.get_mut(&u)) {
            rev.residual += delta;
        }
    }

    /// Sum of flow on forward edges leaving `source`.
    #[must_use]
    pub fn total_flow_from(&self, source: NodeId) -> Flow {
        self.adj
            .get(&source)
            .map(|m| m.values().filter(|e| !e.is_reverse).map(|e| e.flow).sum())
            .unwrap_or(0.0)
    }

    /// Sum over forward edges of `cost * flow`.
    #[must_use]
    pub fn total_cost(&self) -> Cost {
        self.adj
            .values()
            .flat_map(IndexMap::values)
            .filter(|e| !e.is_reverse)
            .map(|e| e.cost * e.flow)
            .sum()
    }

    /// Reset every edge's flow/residual back to its original, zero-flow
    /// state, leaving topology (nodes, edges, capacities, costs)
    /// untouched. Used when handing a graph back to a
    /// [`crate::supervisor::pool::GraphPool`] (spec §4.1 "Lifecycle").
    pub fn reset_flows(&mut self) {
        for edges in self.adj.values_mut() {
            for edge in edges.values_mut() {
                if edge.is_reverse {
                    edge.residual = 0.0;
                    edge.flow = 0.0;
                } else {
                    edge.residual = edge.original_capacity;
                    edge.flow = 0.0;
                }
            }
        }
    }

    /// Empty the graph back to its just-constructed state while retaining
    /// the underlying map allocations, for reuse from a
    /// [`crate::supervisor::pool::GraphPool`] free list.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.adj.clear();
        self.incoming_cache = None;
        self.source = None;
        self.sink = None;
    }

    /// Validate that `source`/`sink` are (a) both present in the node set
    /// and (b) distinct, per spec §6's input-validation rules.
    pub fn validate_source_sink(&self, source: NodeId, sink: NodeId) -> Result<()> {
        if !self.nodes.contains(&source) {
            return Err(crate::Error::InvalidSource(source));
        }
        if !self.nodes.contains(&sink) {
            return Err(crate::Error::InvalidSink(sink));
        }
        if source == sink {
            return Err(crate::Error::SourceEqualsSink(source));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_edge_with_reverse_sets_up_residuals() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 2, 10.0, 5.0);
        let fwd = g.get_edge(1, 2).unwrap();
        assert_eq!(fwd.residual, 10.0);
        assert_eq!(fwd.original_capacity, 10.0);
        let rev = g.get_edge(2, 1).unwrap();
        assert_eq!(rev.residual, 0.0);
        assert_eq!(rev.cost, -5.0);
    }

    #[test]
    fn update_flow_maintains_invariant() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 2, 10.0, 1.0);
        g.update_flow(1, 2, 4.0);
        let fwd = g.get_edge(1, 2).unwrap();
        let rev = g.get_edge(2, 1).unwrap();
        assert_eq!(fwd.flow, 4.0);
        assert_eq!(fwd.residual, 6.0);
        assert_eq!(rev.residual, 4.0);
        assert!(approx_zero(fwd.flow + fwd.residual - fwd.original_capacity, 1e-12));
    }

    #[test]
    fn node_index_matches_sorted_nodes_order() {
        let mut g = ResidualGraph::new();
        g.add_edge(7, 3, 1.0, 0.0);
        g.add_edge(3, 9, 1.0, 0.0);
        let index = g.node_index();
        for (i, id) in g.sorted_nodes().into_iter().enumerate() {
            assert_eq!(index[&id], i);
        }
    }

    #[test]
    fn parallel_edges_collapse_and_add_capacity() {
        let mut g = ResidualGraph::new();
        g.add_edge(1, 2, 5.0, 1.0);
        g.add_edge(1, 2, 3.0, 1.0);
        let edge = g.get_edge(1, 2).unwrap();
        assert_eq!(edge.original_capacity, 8.0);
    }

    #[test]
    fn self_loop_is_ignored() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 1, 5.0, 1.0);
        assert!(g.get_edge(1, 1).is_none());
        assert_eq!(g.num_nodes(), 1);
    }

    #[test]
    fn negative_capacity_clamped_to_zero() {
        let mut g = ResidualGraph::new();
        g.add_edge(1, 2, -5.0, 1.0);
        assert_eq!(g.get_edge(1, 2).unwrap().residual, 0.0);
    }

    #[test]
    fn sorted_nodes_are_ascending() {
        let mut g = ResidualGraph::new();
        for id in [5, 1, 3, 2, 4] {
            g.add_node(id);
        }
        assert_eq!(g.sorted_nodes(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn incoming_edges_list_matches_cache_and_live() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 3, 5.0, 1.0);
        g.add_edge_with_reverse(2, 3, 7.0, 1.0);
        let live = g.get_incoming_edges_list(3);
        g.build_incoming_cache();
        let cached = g.get_incoming_edges_list(3);
        assert_eq!(live.iter().map(|(f, _)| *f).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(cached.iter().map(|(f, _)| *f).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn reset_flows_restores_zero_flow_state() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 2, 10.0, 1.0);
        g.update_flow(1, 2, 6.0);
        g.reset_flows();
        let fwd = g.get_edge(1, 2).unwrap();
        let rev = g.get_edge(2, 1).unwrap();
        assert_eq!(fwd.flow, 0.0);
        assert_eq!(fwd.residual, 10.0);
        assert_eq!(rev.residual, 0.0);
    }
}
