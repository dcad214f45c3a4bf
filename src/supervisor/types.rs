//! External request/response types (spec §6) — the shapes a transport
//! layer built on top of this crate serializes over the wire.

use super::options::SolverOptions;
use crate::types::{Algorithm, Cost, Flow, NodeId, RecordedPath, SolverResult};
use serde::{Deserialize, Serialize};

/// One node in a wire-format graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSpec {
    /// Node identifier.
    pub id: NodeId,
}

/// One edge in a wire-format graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeSpec {
    /// Tail node.
    pub from: NodeId,
    /// Head node.
    pub to: NodeId,
    /// Forward capacity.
    pub capacity: Flow,
    /// Per-unit cost.
    pub cost: Cost,
    /// Flow currently assigned to this edge, filled in on the response
    /// (`solved_graph`); absent on a request.
    #[serde(default)]
    pub current_flow: Option<Flow>,
}

/// Wire-format graph: a request carries one of these in, a response
/// carries one back out with `current_flow` populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GraphSpec {
    /// Human-readable label, not interpreted by the solver.
    pub name: Option<String>,
    /// Node set.
    pub nodes: Vec<NodeSpec>,
    /// Edge set.
    pub edges: Vec<EdgeSpec>,
    /// Source node id.
    pub source_id: NodeId,
    /// Sink node id.
    pub sink_id: NodeId,
}

/// A solve request (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolveRequest {
    /// The graph to solve over, or `None` for a nil-graph validation
    /// error.
    pub graph: Option<GraphSpec>,
    /// Which engine to run; `Unspecified` defers to
    /// [`super::dispatch::recommend`].
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Tunables; normalized before dispatch.
    #[serde(default)]
    pub options: SolverOptions,
}

/// Computation metrics attached to a response (spec §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Metrics {
    /// Wall-clock solve time in milliseconds.
    pub computation_time_ms: f64,
    /// Augmentation iterations performed.
    pub iterations: usize,
    /// Number of augmenting paths found (0 if `return_paths` was unset).
    pub augmenting_paths_found: usize,
    /// Best-effort resident memory estimate at solve time.
    pub memory_used_bytes: u64,
}

/// A solve response (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolveResponse {
    /// `true` iff `result.status == Optimal` and no error occurred.
    pub success: bool,
    /// The solver's result bundle.
    pub result: SolverResult,
    /// Original graph with `current_flow` filled in on every edge.
    pub solved_graph: Option<GraphSpec>,
    /// Computation metrics.
    pub metrics: Metrics,
}

/// A streaming progress update (spec §6). Emitted no more than once per
/// 200ms except for the first and final update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressUpdate {
    /// Augmentation iteration this update was taken at.
    pub iteration: usize,
    /// Flow value so far.
    pub current_flow: Flow,
    /// Cost so far, for min-cost engines.
    pub current_cost: Option<Cost>,
    /// Human-readable status (`"running"`, `"completed"`, `"canceled"`).
    pub status: String,
    /// Last augmenting path found, if any.
    pub last_path: Option<RecordedPath>,
    /// Estimated completion percentage, `0..=100`. Engines without a
    /// reliable completion estimate report `0` until the final update.
    pub progress_percent: u8,
    /// Wall-clock time elapsed so far, in milliseconds.
    pub computation_time_ms: f64,
    /// Best-effort resident memory estimate at this point.
    pub memory_used_bytes: u64,
}
