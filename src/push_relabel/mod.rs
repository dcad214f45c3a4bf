//! Push-Relabel max flow (spec §4.7): FIFO, Highest-Label, and Lowest-Label
//! variants sharing a single state machine (height / excess / current-arc),
//! gap heuristic, and periodic global relabel.

use crate::cancel::CancellationToken;
use crate::graph::ResidualGraph;
use crate::supervisor::options::SolverOptions;
use crate::types::{Flow, NodeId, SolverResult, SolverStatus};
use bitvec::vec::BitVec;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// Which active-node selection strategy `discharge` order follows. All
/// three must converge to the same max-flow value (`excess[sink]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Active-node FIFO queue (front pop, back push).
    #[default]
    Fifo,
    /// Bucket array indexed by height; always discharge the highest active
    /// node.
    HighestLabel,
    /// Bucket array indexed by height; always discharge the lowest active
    /// node.
    LowestLabel,
}

/// Height/excess/current-arc kept as dense `Vec<T>`s indexed through `index`
/// instead of `HashMap<NodeId, _>`, so the discharge/relabel hot loops only
/// ever do a `Vec` index after one hash lookup per node per outer step.
struct State {
    index: HashMap<NodeId, usize>,
    height: Vec<usize>,
    excess: Vec<Flow>,
    current_arc: Vec<usize>,
    height_count: Vec<usize>,
    max_height: usize,
}

impl State {
    fn i(&self, v: NodeId) -> usize {
        self.index[&v]
    }

    fn height(&self, v: NodeId) -> usize {
        self.height[self.i(v)]
    }

    fn set_height(&mut self, v: NodeId, h: usize) {
        let i = self.i(v);
        self.height[i] = h;
    }

    fn excess(&self, v: NodeId) -> Flow {
        self.excess[self.i(v)]
    }

    fn add_excess(&mut self, v: NodeId, amount: Flow) {
        let i = self.i(v);
        self.excess[i] += amount;
    }

    fn current_arc(&self, v: NodeId) -> usize {
        self.current_arc[self.i(v)]
    }

    fn set_current_arc(&mut self, v: NodeId, idx: usize) {
        let i = self.i(v);
        self.current_arc[i] = idx;
    }
}

/// Run Push-Relabel with the given [`Variant`] from `source` to `sink`.
pub fn solve(
    graph: &mut ResidualGraph,
    source: NodeId,
    sink: NodeId,
    variant: Variant,
    options: &SolverOptions,
    token: &CancellationToken,
) -> SolverResult {
    let start = Instant::now();
    let span = tracing::info_span!("push_relabel", ?source, ?sink, ?variant);
    let _guard = span.enter();

    let nodes = graph.sorted_nodes();
    let n = nodes.len();
    let max_height = 2 * n.max(1) - 1;
    let index = graph.node_index();
    let mut state = State {
        index: index.clone(),
        height: vec![0; n],
        excess: vec![0.0; n],
        current_arc: vec![0; n],
        height_count: vec![0; max_height + 2],
        max_height,
    };
    state.set_height(source, n);
    state.height_count[0] = n.saturating_sub(1);
    state.height_count[n.min(max_height + 1)] += 1;

    let mut active: ActiveSet = ActiveSet::new(variant, max_height, index);

    // Saturate every forward edge out of source.
    for v in graph.neighbours_ordered(source) {
        let residual = graph.get_edge(source, v).map_or(0.0, |e| e.residual);
        if residual > options.epsilon {
            graph.update_flow(source, v, residual);
            state.add_excess(v, residual);
            state.add_excess(source, -residual);
            if v != sink && v != source {
                active.push(v, state.height(v));
            }
        }
    }

    global_relabel(graph, source, sink, &mut state, options.epsilon);

    let mut iterations = 0usize;
    let mut relabels_since_global = 0usize;
    let global_relabel_period = n.max(1);
    let mut step: u64 = 0;

    while let Some(u) = active.pop() {
        step += 1;
        if step % 100 == 0 && token.is_cancelled() {
            tracing::warn!("push_relabel: cancelled mid-run");
            let max_flow = state.excess(sink);
            return SolverResult::canceled_partial(max_flow, graph.total_cost(), iterations, start.elapsed().as_secs_f64());
        }
        if options.iteration_cap_reached(iterations) {
            tracing::warn!(iterations, "push_relabel: iteration cap reached");
            break;
        }

        let relabeled = discharge(graph, u, source, sink, &mut state, &mut active, options.epsilon);
        iterations += 1;
        if relabeled {
            relabels_since_global += 1;
            if relabels_since_global >= global_relabel_period {
                global_relabel(graph, source, sink, &mut state, options.epsilon);
                relabels_since_global = 0;
            }
        }
    }

    let max_flow = state.excess(sink);
    SolverResult {
        max_flow,
        total_cost: graph.total_cost(),
        iterations,
        paths: Vec::new(),
        status: SolverStatus::Optimal,
        error: None,
        error_kind: None,
        duration_seconds: start.elapsed().as_secs_f64(),
        canceled: false,
    }
}

/// Discharge `u` until its excess is drained or it is deactivated. Returns
/// `true` iff `u` was relabelled at least once.
fn discharge(graph: &mut ResidualGraph, u: NodeId, source: NodeId, sink: NodeId, state: &mut State, active: &mut ActiveSet, epsilon: f64) -> bool {
    let mut relabeled = false;
    loop {
        let excess_u = state.excess(u);
        if excess_u <= epsilon {
            return relabeled;
        }
        let neighbours = graph.neighbours_ordered(u);
        let idx = state.current_arc(u);

        if idx < neighbours.len() {
            let v = neighbours[idx];
            let residual = graph.get_edge(u, v).map_or(0.0, |e| e.residual);
            let height_u = state.height(u);
            let height_v = state.height(v);
            if residual > epsilon && height_u == height_v + 1 {
                let amount = excess_u.min(residual);
                graph.update_flow(u, v, amount);
                state.add_excess(u, -amount);
                state.add_excess(v, amount);
                if v != sink && v != source && state.excess(v) > epsilon {
                    active.push(v, state.height(v));
                }
                continue;
            }
            state.set_current_arc(u, idx + 1);
            continue;
        }

        // Current arc list exhausted: relabel.
        relabeled = true;
        let new_height = neighbours
            .iter()
            .filter_map(|&v| {
                let residual = graph.get_edge(u, v).map_or(0.0, |e| e.residual);
                (residual > epsilon).then(|| state.height(v))
            })
            .min()
            .map(|h| h + 1);

        let old_height = state.height(u);
        decrement_height_count(state, old_height);
        match new_height {
            Some(h) if h <= state.max_height => {
                state.set_height(u, h);
                increment_height_count(state, h);
                check_gap(state, active, old_height);
            }
            _ => {
                state.set_height(u, state.max_height + 1);
                increment_height_count(state, state.max_height + 1);
                check_gap(state, active, old_height);
                return relabeled;
            }
        }
        state.set_current_arc(u, 0);
        active.push(u, state.height(u));
        return relabeled;
    }
}

fn decrement_height_count(state: &mut State, h: usize) {
    let idx = h.min(state.height_count.len() - 1);
    if state.height_count[idx] > 0 {
        state.height_count[idx] -= 1;
    }
}

fn increment_height_count(state: &mut State, h: usize) {
    let idx = h.min(state.height_count.len() - 1);
    state.height_count[idx] += 1;
}

/// Gap heuristic: if height `h` became empty (and 0 < h < n), every node
/// above it jumps straight to `max_height + 1`, removing it from further
/// discharge consideration.
fn check_gap(state: &mut State, active: &mut ActiveSet, h: usize) {
    let n = state.height.len();
    if h == 0 || h >= n {
        return;
    }
    if state.height_count.get(h).copied().unwrap_or(0) != 0 {
        return;
    }
    let raised: Vec<NodeId> = state
        .index
        .iter()
        .filter(|&(_, &i)| state.height[i] > h && state.height[i] <= state.max_height)
        .map(|(&node, _)| node)
        .collect();
    for node in raised {
        let old = state.height(node);
        decrement_height_count(state, old);
        state.set_height(node, state.max_height + 1);
        increment_height_count(state, state.max_height + 1);
        active.remove(node);
    }
}

/// Reverse BFS from `sink` over edges with residual capacity, assigning
/// heights as BFS distance. Unreachable nodes (besides `source`) become
/// `max_height + 1`; `source` is forced back to `n`.
fn global_relabel(graph: &ResidualGraph, source: NodeId, sink: NodeId, state: &mut State, epsilon: f64) {
    let n = state.height.len();
    state.height_count.iter_mut().for_each(|c| *c = 0);

    let mut new_height: HashMap<NodeId, usize> = state.index.keys().map(|&v| (v, state.max_height + 1)).collect();
    new_height.insert(sink, 0);
    let mut queue = VecDeque::new();
    queue.push_back(sink);

    while let Some(u) = queue.pop_front() {
        let du = new_height[&u];
        for (v, edge) in graph.get_incoming_edges_list(u) {
            if edge.residual <= epsilon {
                continue;
            }
            if new_height.get(&v).copied().unwrap_or(state.max_height + 1) > du + 1 {
                new_height.insert(v, du + 1);
                queue.push_back(v);
            }
        }
    }
    new_height.insert(source, n);

    for (&node, &h) in &new_height {
        state.set_height(node, h);
        increment_height_count(state, h);
        state.set_current_arc(node, 0);
    }
}

/// Active-node container abstracting over the three variants. FIFO uses a
/// plain deque; Highest/Lowest-Label use bucket arrays indexed by height.
/// `present` is a dense in-queue flag per node (keyed through `index`)
/// rather than a `HashSet`, since it is read on every push/pop.
struct ActiveSet {
    index: HashMap<NodeId, usize>,
    present: BitVec,
    queue: ActiveQueue,
}

enum ActiveQueue {
    Fifo(VecDeque<NodeId>),
    HighestLabel(Vec<Vec<NodeId>>),
    LowestLabel(Vec<Vec<NodeId>>),
}

impl ActiveSet {
    fn new(variant: Variant, max_height: usize, index: HashMap<NodeId, usize>) -> Self {
        let present = BitVec::repeat(false, index.len());
        let queue = match variant {
            Variant::Fifo => ActiveQueue::Fifo(VecDeque::new()),
            Variant::HighestLabel => ActiveQueue::HighestLabel(vec![Vec::new(); max_height + 2]),
            Variant::LowestLabel => ActiveQueue::LowestLabel(vec![Vec::new(); max_height + 2]),
        };
        Self { index, present, queue }
    }

    fn push(&mut self, node: NodeId, height: usize) {
        let Self { index, present, queue } = self;
        let i = index[&node];
        if *present.get(i).unwrap() {
            return;
        }
        present.set(i, true);
        match queue {
            ActiveQueue::Fifo(q) => q.push_back(node),
            ActiveQueue::HighestLabel(buckets) | ActiveQueue::LowestLabel(buckets) => {
                let idx = height.min(buckets.len() - 1);
                buckets[idx].push(node);
            }
        }
    }

    fn remove(&mut self, node: NodeId) {
        let i = self.index[&node];
        self.present.set(i, false);
    }

    fn pop(&mut self) -> Option<NodeId> {
        let Self { index, present, queue } = self;
        match queue {
            ActiveQueue::Fifo(q) => loop {
                let node = q.pop_front()?;
                let i = index[&node];
                if *present.get(i).unwrap() {
                    present.set(i, false);
                    return Some(node);
                }
            },
            ActiveQueue::HighestLabel(buckets) => {
                for bucket in buckets.iter_mut().rev() {
                    while let Some(node) = bucket.pop() {
                        let i = index[&node];
                        if *present.get(i).unwrap() {
                            present.set(i, false);
                            return Some(node);
                        }
                    }
                }
                None
            }
            ActiveQueue::LowestLabel(buckets) => {
                for bucket in buckets.iter_mut() {
                    while let Some(node) = bucket.pop() {
                        let i = index[&node];
                        if *present.get(i).unwrap() {
                            present.set(i, false);
                            return Some(node);
                        }
                    }
                }
                None
            }
        }
    }
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
        g.source = Some(0);
        g.sink = Some(5);
        g
    }

    #[test]
    fn all_variants_agree_on_clrs_graph() {
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        for variant in [Variant::Fifo, Variant::HighestLabel, Variant::LowestLabel] {
            let mut g = clrs_graph();
            let result = solve(&mut g, 0, 5, variant, &options, &token);
            assert_eq!(result.max_flow, 23.0, "variant {variant:?} disagreed");
        }
    }

    #[test]
    fn disconnected_graph_yields_zero() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 2, 10.0, 0.0);
        g.add_node(99);
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = solve(&mut g, 1, 99, Variant::Fifo, &options, &token);
        assert_eq!(result.max_flow, 0.0);
    }

    #[test]
    fn single_edge_saturates_directly() {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 2, 7.0, 0.0);
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = solve(&mut g, 1, 2, Variant::Fifo, &options, &token);
        assert_eq!(result.max_flow, 7.0);
    }
}
