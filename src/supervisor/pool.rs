//! Graph pool and solver worker pool (spec §4.10, §5).
//!
//! `GraphPool` is a free-list of reusable [`ResidualGraph`] buffers so
//! repeated solves don't pay for a fresh allocation each time. `SolverPool`
//! bounds how many solves run concurrently via a `rayon` thread pool sized
//! like a counting semaphore.

use std::sync::Mutex;

use rayon::{ThreadPool, ThreadPoolBuilder};

use super::dispatch;
use super::options::SolverOptions;
use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::graph::ResidualGraph;
use crate::types::{Algorithm, NodeId, SolverResult};

/// A free-list of [`ResidualGraph`] buffers. `acquire` hands out an empty,
/// reset graph (reusing an existing allocation when one is free); `release`
/// returns it to the pool after clearing it.
#[derive(Default)]
pub struct GraphPool {
    free: Mutex<Vec<ResidualGraph>>,
}

impl GraphPool {
    /// An empty pool; the first few `acquire` calls allocate fresh graphs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a graph from the free list, or allocate a new one.
    #[must_use]
    pub fn acquire(&self) -> ResidualGraph {
        self.free.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pop().unwrap_or_default()
    }

    /// Return `graph` to the free list after clearing its contents so the
    /// next `acquire` sees an empty graph.
    pub fn release(&self, mut graph: ResidualGraph) {
        graph.clear();
        self.free.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(graph);
    }

    /// Number of graphs currently sitting idle in the pool.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.free.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }
}

/// Bounds the number of solves running concurrently, like a counting
/// semaphore, by running every solve as a task on a fixed-size `rayon`
/// thread pool.
pub struct SolverPool {
    pool: ThreadPool,
    graphs: GraphPool,
}

impl SolverPool {
    /// `max_concurrent_solves` of `0` defaults to `2 * available_parallelism`
    /// (spec §5).
    ///
    /// # Errors
    /// Returns [`Error::Internal`] if the underlying `rayon` pool fails to
    /// build (starved thread-spawn resources).
    pub fn new(max_concurrent_solves: usize) -> Result<Self> {
        let workers = if max_concurrent_solves == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1) * 2
        } else {
            max_concurrent_solves
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| Error::internal(format!("failed to build solver pool: {e}")))?;
        Ok(Self {
            pool,
            graphs: GraphPool::new(),
        })
    }

    /// Run one solve on the pool: clone `graph` into a pool-owned buffer,
    /// dispatch `algorithm`, release the buffer back to the graph pool.
    /// Blocks the calling thread until a worker slot is free or `token` is
    /// cancelled. The caller's `graph` is left untouched — use
    /// [`Self::solve_in_place`] when the mutated residual graph (final
    /// per-edge flow) is needed back.
    pub fn solve_pooled(
        &self,
        graph: &ResidualGraph,
        source: NodeId,
        sink: NodeId,
        algorithm: Algorithm,
        options: &SolverOptions,
        token: &CancellationToken,
    ) -> Result<SolverResult> {
        if token.is_cancelled() {
            return Err(Error::Canceled);
        }
        super::validate::validate(graph, source, sink)?;

        let mut buffer = self.graphs.acquire();
        buffer.clone_from(graph);

        let result = self.pool.install(|| dispatch::dispatch(&mut buffer, source, sink, algorithm, options, token));
        self.graphs.release(buffer);
        Ok(result)
    }

    /// Same worker-semaphore/validation behaviour as [`Self::solve_pooled`],
    /// but dispatches directly on the caller's own `graph` instead of a
    /// pool-owned buffer, so the mutated residual state (final flow per
    /// edge) is visible to the caller afterwards. Used by
    /// [`super::Supervisor::solve`], which needs to report `solved_graph`.
    pub fn solve_in_place(
        &self,
        graph: &mut ResidualGraph,
        source: NodeId,
        sink: NodeId,
        algorithm: Algorithm,
        options: &SolverOptions,
        token: &CancellationToken,
    ) -> Result<SolverResult> {
        if token.is_cancelled() {
            return Err(Error::Canceled);
        }
        super::validate::validate(graph, source, sink)?;
        Ok(self.pool.install(|| dispatch::dispatch(graph, source, sink, algorithm, options, token)))
    }

    /// Fan N solve requests out across the pool, returning results in
    /// input order (spec §4.10 "batch solve").
    pub fn solve_batch(&self, requests: &[BatchRequest], token: &CancellationToken) -> Vec<Result<SolverResult>> {
        self.pool.install(|| {
            use rayon::prelude::*;
            requests
                .par_iter()
                .map(|req| self.solve_pooled(&req.graph, req.source, req.sink, req.algorithm, &req.options, token))
                .collect()
        })
    }
}

/// One request in a [`SolverPool::solve_batch`] call.
pub struct BatchRequest {
    /// Graph to solve over (cloned into a pool buffer, never mutated here).
    pub graph: ResidualGraph,
    /// Source node.
    pub source: NodeId,
    /// Sink node.
    pub sink: NodeId,
    /// Algorithm to run.
    pub algorithm: Algorithm,
    /// Tunables for this request.
    pub options: SolverOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> ResidualGraph {
        let mut g = ResidualGraph::new();
        g.add_edge_with_reverse(1, 2, 10.0, 0.0);
        g
    }

    #[test]
    fn graph_pool_round_trips() {
        let pool = GraphPool::new();
        assert_eq!(pool.idle_count(), 0);
        let g = pool.acquire();
        pool.release(g);
        assert_eq!(pool.idle_count(), 1);
        let _ = pool.acquire();
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn solve_pooled_runs_and_returns_to_pool() {
        let pool = SolverPool::new(2).unwrap();
        let g = sample_graph();
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = pool.solve_pooled(&g, 1, 2, Algorithm::EdmondsKarp, &options, &token).unwrap();
        assert_eq!(result.max_flow, 10.0);
    }

    #[test]
    fn solve_in_place_mutates_the_callers_graph() {
        let pool = SolverPool::new(2).unwrap();
        let mut g = sample_graph();
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = pool.solve_in_place(&mut g, 1, 2, Algorithm::EdmondsKarp, &options, &token).unwrap();
        assert_eq!(result.max_flow, 10.0);
        assert_eq!(g.get_edge(1, 2).unwrap().flow, 10.0);
    }

    #[test]
    fn solve_batch_preserves_input_order() {
        let pool = SolverPool::new(4).unwrap();
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let requests: Vec<BatchRequest> = (1..=5)
            .map(|cap| BatchRequest {
                graph: {
                    let mut g = ResidualGraph::new();
                    g.add_edge_with_reverse(1, 2, cap as f64, 0.0);
                    g
                },
                source: 1,
                sink: 2,
                algorithm: Algorithm::EdmondsKarp,
                options,
            })
            .collect();
        let results = pool.solve_batch(&requests, &token);
        let flows: Vec<f64> = results.into_iter().map(|r| r.unwrap().max_flow).collect();
        assert_eq!(flows, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn rejects_invalid_graph_before_dispatch() {
        let pool = SolverPool::new(1).unwrap();
        let g = ResidualGraph::new();
        let options = SolverOptions::default();
        let token = CancellationToken::new();
        let result = pool.solve_pooled(&g, 1, 2, Algorithm::EdmondsKarp, &options, &token);
        assert!(matches!(result, Err(Error::EmptyGraph)));
    }
}
