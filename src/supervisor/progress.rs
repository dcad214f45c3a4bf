//! Streaming progress reporting (spec §6): rate-limited so long solves
//! don't flood a transport layer with an update per augmenting path.

use super::types::ProgressUpdate;
use crate::types::{Cost, Flow, RecordedPath};
use std::time::{Duration, Instant};

/// Minimum spacing between emitted updates, except for the first and the
/// final one.
pub const MIN_INTERVAL: Duration = Duration::from_millis(200);

/// Tracks when the next progress update is due and builds [`ProgressUpdate`]
/// values from the engine's running state.
pub struct ProgressReporter {
    start: Instant,
    last_emitted: Option<Instant>,
    emitted_any: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    /// A reporter whose clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last_emitted: None,
            emitted_any: false,
        }
    }

    /// `true` iff enough time has passed since the last emission to emit
    /// another one. Always `true` for the very first call.
    #[must_use]
    pub fn should_emit(&self) -> bool {
        match self.last_emitted {
            None => true,
            Some(last) => last.elapsed() >= MIN_INTERVAL,
        }
    }

    /// Build an update and record that one was just emitted. `final_update`
    /// forces emission regardless of [`Self::should_emit`] and sets
    /// `status="completed"`, `progress_percent=100`.
    pub fn emit(
        &mut self,
        iteration: usize,
        current_flow: Flow,
        current_cost: Option<Cost>,
        last_path: Option<RecordedPath>,
        progress_percent: u8,
        memory_used_bytes: u64,
        final_update: bool,
    ) -> ProgressUpdate {
        let now = Instant::now();
        self.last_emitted = Some(now);
        self.emitted_any = true;
        let (status, percent) = if final_update {
            ("completed".to_string(), 100)
        } else {
            ("running".to_string(), progress_percent)
        };
        ProgressUpdate {
            iteration,
            current_flow,
            current_cost,
            status,
            last_path,
            progress_percent: percent,
            computation_time_ms: self.start.elapsed().as_secs_f64() * 1000.0,
            memory_used_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_always_emits() {
        let reporter = ProgressReporter::new();
        assert!(reporter.should_emit());
    }

    #[test]
    fn rapid_successive_calls_are_rate_limited() {
        let mut reporter = ProgressReporter::new();
        let _ = reporter.emit(1, 5.0, None, None, 10, 0, false);
        assert!(!reporter.should_emit());
    }

    #[test]
    fn final_update_reports_completed_and_100_percent() {
        let mut reporter = ProgressReporter::new();
        let update = reporter.emit(10, 42.0, Some(7.0), None, 50, 0, true);
        assert_eq!(update.status, "completed");
        assert_eq!(update.progress_percent, 100);
    }
}
