//! Common types shared across the flow-solver modules

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Node identifier. Nodes are dense `0..num_nodes`, assigned by insertion
/// order into a [`crate::graph::ResidualGraph`].
pub type NodeId = usize;

/// Real-valued capacity/flow/cost type. The spec calls these "reals";
/// `f64` plus epsilon-aware comparisons (see
/// [`crate::graph::ResidualGraph::eq_zero`]) is the concrete realization.
pub type Flow = f64;

/// Cost-per-unit-flow type, may be negative.
pub type Cost = f64;

/// Solver status after a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    /// A self-consistent optimal flow/cost was produced.
    Optimal,
    /// Validation or resource failure; see the accompanying [`crate::Error`].
    Error,
}

impl SolverStatus {
    /// Returns true if a usable flow value was produced (even on
    /// cancellation the partial flow is usable — see spec §7).
    #[must_use]
    pub fn has_solution(self) -> bool {
        matches!(self, Self::Optimal)
    }
}

/// Which max-flow / min-cost-flow algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Let the supervisor pick via [`crate::supervisor::dispatch::recommend`].
    #[default]
    Unspecified,
    /// Ford-Fulkerson (iterative DFS by default).
    FordFulkerson,
    /// Edmonds-Karp (BFS augmenting paths).
    EdmondsKarp,
    /// Dinic (level graph + blocking flow).
    Dinic,
    /// Push-Relabel (FIFO selection).
    PushRelabel,
    /// Min-cost max-flow (Successive Shortest Paths / Capacity Scaling).
    MinCost,
}

/// Node list for one augmenting path. Most paths in practice are short
/// relative to the graph (a handful of hops), so this stays inline instead
/// of heap-allocating like a bare `Vec` would for every recorded path.
pub type PathNodes = SmallVec<[NodeId; 8]>;

/// One augmenting path recorded when `return_paths` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordedPath {
    /// Nodes visited, source first, sink last.
    pub nodes: PathNodes,
    /// Flow pushed along this path.
    pub flow: Flow,
}

/// Result bundle produced by every engine (spec §3 SolverResult).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverResult {
    /// Maximum flow value (or flow satisfying the min-cost demand).
    pub max_flow: Flow,
    /// Total cost (0 for pure max-flow algorithms).
    pub total_cost: Cost,
    /// Number of augmentation iterations performed.
    pub iterations: usize,
    /// Augmenting paths found, populated only when requested.
    pub paths: Vec<RecordedPath>,
    /// Overall status.
    pub status: SolverStatus,
    /// Structured error, set iff `status == Error`.
    pub error: Option<String>,
    /// Error taxonomy for `error`, set iff `status == Error`.
    pub error_kind: Option<crate::error::ErrorKind>,
    /// Wall-clock time spent in the engine.
    pub duration_seconds: f64,
    /// Set when the engine returned early due to cancellation or timeout;
    /// `max_flow`/`total_cost`/`iterations` are still the best partial
    /// values observed (spec §7, "failure semantics").
    pub canceled: bool,
}

impl SolverResult {
    /// Build a canceled partial result from whatever accumulators the
    /// engine had at the point cancellation was observed.
    #[must_use]
    pub fn canceled_partial(
        max_flow: Flow,
        total_cost: Cost,
        iterations: usize,
        duration_seconds: f64,
    ) -> Self {
        Self {
            max_flow,
            total_cost,
            iterations,
            paths: Vec::new(),
            status: SolverStatus::Optimal,
            error: None,
            error_kind: None,
            duration_seconds,
            canceled: true,
        }
    }
}
