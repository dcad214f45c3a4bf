//! Solver options (spec §3 "Solver options")

use crate::graph::DEFAULT_EPSILON;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MIN_EPSILON: f64 = 1e-15;
const MAX_EPSILON: f64 = 1e-3;
const MIN_TIMEOUT_SECONDS: f64 = 0.1;
const MAX_TIMEOUT_SECONDS: f64 = 3600.0;
const MIN_MAX_ITERATIONS: usize = 10;
/// Default fallback threshold for [`SolverOptions::negative_edge_fallback_threshold`].
pub const DEFAULT_FALLBACK_THRESHOLD: u32 = 3;

/// Tunables shared by every engine. Construct with [`Default::default`] and
/// adjust fields, then call [`Self::normalize`] (the supervisor always
/// does this before dispatch) to apply the clamps described in spec §3 —
/// clamping never happens silently inside a setter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Numerical tolerance for "zero" comparisons. Default `1e-9`, clamped
    /// to `[1e-15, 1e-3]`.
    pub epsilon: f64,
    /// Upper bound on augmentation iterations. `0` = unbounded; once
    /// specified, clamped to a floor of 10.
    pub max_iterations: usize,
    /// Wall-clock budget. `0` = rely on cancellation only; clamped to
    /// `[0.1s, 3600s]` when nonzero.
    pub timeout: Duration,
    /// Whether to collect augmenting paths with their flow values.
    pub return_paths: bool,
    /// How many negative reduced costs Dijkstra tolerates before falling
    /// back to Bellman-Ford (default 3). See SPEC_FULL.md §9 — honoured as
    /// a counter, not "first sighting".
    pub negative_edge_fallback_threshold: u32,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            max_iterations: 0,
            timeout: Duration::ZERO,
            return_paths: false,
            negative_edge_fallback_threshold: DEFAULT_FALLBACK_THRESHOLD,
        }
    }
}

impl SolverOptions {
    /// Apply the spec's clamping rules, returning a normalized copy.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        self.epsilon = self.epsilon.clamp(MIN_EPSILON, MAX_EPSILON);
        if self.max_iterations != 0 {
            self.max_iterations = self.max_iterations.max(MIN_MAX_ITERATIONS);
        }
        if !self.timeout.is_zero() {
            let seconds = self.timeout.as_secs_f64().clamp(MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS);
            self.timeout = Duration::from_secs_f64(seconds);
        }
        if self.negative_edge_fallback_threshold == 0 {
            self.negative_edge_fallback_threshold = 1;
        }
        self
    }

    /// `true` iff `max_iterations` is set and `iterations` has reached it.
    #[must_use]
    pub fn iteration_cap_reached(&self, iterations: usize) -> bool {
        self.max_iterations != 0 && iterations >= self.max_iterations
    }
}
