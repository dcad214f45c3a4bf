//! Supervisor layer (spec §4.10, §5, §6): validates requests, picks or
//! honours the requested algorithm, composes cancellation with a wall-clock
//! deadline, and exposes pooled/batch solving plus a cooperative shutdown
//! signal.

pub mod dispatch;
pub mod memory;
pub mod options;
pub mod pool;
pub mod progress;
pub mod types;
pub mod validate;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::error::Error;
use crate::graph::ResidualGraph;
use crate::types::{NodeId, SolverStatus};

use self::memory::MemoryStats;
use self::options::SolverOptions;
use self::pool::SolverPool;
use self::types::{EdgeSpec, GraphSpec, Metrics, SolveRequest, SolveResponse};

/// Top-level entry point: validates and dispatches solve requests, owns
/// the graph/worker pools and the memory-statistics cache, and honours a
/// cooperative shutdown signal (spec §5).
pub struct Supervisor {
    pool: SolverPool,
    memory: MemoryStats,
    shutting_down: AtomicBool,
    inflight: AtomicUsize,
    drain: (Mutex<()>, Condvar),
}

impl Supervisor {
    /// Build a supervisor with `max_concurrent_solves` worker slots (`0`
    /// defaults to `2 * available_parallelism`, per spec §5).
    ///
    /// # Errors
    /// Propagates [`pool::SolverPool::new`]'s error if the thread pool
    /// fails to build.
    pub fn new(max_concurrent_solves: usize) -> crate::error::Result<Self> {
        Ok(Self {
            pool: SolverPool::new(max_concurrent_solves)?,
            memory: MemoryStats::new(),
            shutting_down: AtomicBool::new(false),
            inflight: AtomicUsize::new(0),
            drain: (Mutex::new(()), Condvar::new()),
        })
    }

    /// Run one solve request to completion (spec §6).
    pub fn solve(&self, request: &SolveRequest) -> SolveResponse {
        if self.shutting_down.load(Ordering::SeqCst) {
            return error_response(Error::ResourceExhausted("supervisor is shutting down".into()));
        }

        let options = request.options.normalize();
        let Some(graph_spec) = request.graph.as_ref() else {
            return error_response(Error::NilGraph);
        };
        let mut graph = match build_graph(graph_spec) {
            Ok(g) => g,
            Err(e) => return error_response(e),
        };

        if let Err(e) = validate::validate(&graph, graph_spec.source_id, graph_spec.sink_id) {
            return error_response(e);
        }

        self.inflight.fetch_add(1, Ordering::SeqCst);
        let _guard = InflightGuard(self);

        let token = CancellationToken::with_deadline(options.timeout);
        let mut result = match self.pool.solve_in_place(&mut graph, graph_spec.source_id, graph_spec.sink_id, request.algorithm, &options, &token) {
            Ok(result) => result,
            Err(e) => return error_response(e),
        };

        if result.canceled {
            // The engine itself leaves `status == Optimal` so the partial
            // numbers stay usable; the supervisor is what decides whether
            // that counts as a response-level success (spec §7).
            result.status = SolverStatus::Error;
            let kind = if token.deadline_elapsed() {
                crate::error::ErrorKind::Timeout
            } else {
                crate::error::ErrorKind::Canceled
            };
            result.error_kind = Some(kind);
            result.error = Some(
                if kind == crate::error::ErrorKind::Timeout {
                    Error::timeout(options.timeout.as_secs_f64()).to_string()
                } else {
                    Error::Canceled.to_string()
                },
            );
        }

        let success = result.status == SolverStatus::Optimal;
        let metrics = Metrics {
            computation_time_ms: result.duration_seconds * 1000.0,
            iterations: result.iterations,
            augmenting_paths_found: result.paths.len(),
            memory_used_bytes: self.memory.current_bytes(),
        };
        let solved_graph = Some(solved_graph_spec(graph_spec, &graph));

        SolveResponse {
            success,
            result,
            solved_graph,
            metrics,
        }
    }

    /// Set the shutdown signal: no further `solve` calls are admitted.
    /// In-flight solves are left to finish on their own.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    /// Block until every in-flight solve finishes or `timeout` elapses.
    /// Returns `true` iff the drain completed before the timeout.
    #[must_use]
    pub fn wait_for_drain(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &self.drain;
        let guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (_guard, result) = cvar
            .wait_timeout_while(guard, timeout, |_| self.inflight.load(Ordering::SeqCst) > 0)
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        !result.timed_out()
    }
}

struct InflightGuard<'a>(&'a Supervisor);

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.0.inflight.fetch_sub(1, Ordering::SeqCst);
        let (_lock, cvar) = &self.0.drain;
        cvar.notify_all();
    }
}

fn build_graph(spec: &GraphSpec) -> crate::error::Result<ResidualGraph> {
    let mut graph = ResidualGraph::new();
    for node in &spec.nodes {
        graph.add_node(node.id);
    }
    for edge in &spec.edges {
        graph.add_edge_with_reverse(edge.from, edge.to, edge.capacity, edge.cost);
    }
    graph.source = Some(spec.source_id);
    graph.sink = Some(spec.sink_id);
    Ok(graph)
}

fn solved_graph_spec(original: &GraphSpec, graph: &ResidualGraph) -> GraphSpec {
    let edges = original
        .edges
        .iter()
        .map(|e| {
            let current_flow = graph.get_edge(e.from, e.to).map(|edge| edge.flow);
            EdgeSpec {
                from: e.from,
                to: e.to,
                capacity: e.capacity,
                cost: e.cost,
                current_flow,
            }
        })
        .collect();
    GraphSpec {
        name: original.name.clone(),
        nodes: original.nodes.clone(),
        edges,
        source_id: original.source_id,
        sink_id: original.sink_id,
    }
}

fn error_response(error: Error) -> SolveResponse {
    let kind = error.kind();
    SolveResponse {
        success: false,
        result: crate::types::SolverResult {
            max_flow: 0.0,
            total_cost: 0.0,
            iterations: 0,
            paths: Vec::new(),
            status: SolverStatus::Error,
            error: Some(error.to_string()),
            error_kind: Some(kind),
            duration_seconds: 0.0,
            canceled: false,
        },
        solved_graph: None,
        metrics: Metrics::default(),
    }
}

/// Re-exported so callers needing a bare `(source, sink)` validation
/// without building a full [`Supervisor`] don't have to reach into
/// [`validate`] directly.
#[must_use]
pub fn validate_request(graph: &ResidualGraph, source: NodeId, sink: NodeId) -> crate::error::Result<()> {
    validate::validate(graph, source, sink)
}
