//! Cooperative cancellation (spec §5)
//!
//! Every long-running engine loop takes a [`CancellationToken`] and polls it
//! at a bounded period instead of being killed asynchronously. A timeout is
//! just a token with a deadline composed in — see
//! [`CancellationToken::with_deadline`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cooperative cancellation signal, cheaply cloneable and shareable
/// across threads.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// A token that is never cancelled unless [`Self::cancel`] is called.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// A token that also cancels itself once `timeout` has elapsed.
    /// `timeout == Duration::ZERO` disables the deadline (spec: "0 = rely
    /// on cancellation only").
    #[must_use]
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: if timeout.is_zero() {
                None
            } else {
                Some(Instant::now() + timeout)
            },
        }
    }

    /// True if the token was explicitly cancelled or its deadline passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// True specifically because the deadline elapsed (used to distinguish
    /// `Error::Timeout` from `Error::Canceled` at the supervisor layer).
    #[must_use]
    pub fn deadline_elapsed(&self) -> bool {
        !self.flag.load(Ordering::Relaxed) && self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Explicitly cancel the token. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// A never-cancelling token for call sites that don't expose
    /// cancellation yet (tests, internal helpers).
    #[must_use]
    pub fn none() -> Self {
        Self::new()
    }
}

/// A counter that checks `token` every `period` calls to [`Self::tick`],
/// matching the spec's "checked every N iterations/outer loops" language
/// without spelling out a manual `i % period == 0` at every call site.
#[derive(Debug)]
pub struct CancelCheck<'a> {
    token: &'a CancellationToken,
    period: u64,
    count: u64,
}

impl<'a> CancelCheck<'a> {
    /// `period` must be nonzero; the spec's typical periods are 100 for
    /// most loops, 20-50 for streaming/SSP-style loops.
    #[must_use]
    pub fn new(token: &'a CancellationToken, period: u64) -> Self {
        debug_assert!(period > 0, "cancellation check period must be nonzero");
        Self {
            token,
            period: period.max(1),
            count: 0,
        }
    }

    /// Call once per loop iteration. Returns `true` when this call landed
    /// on a check boundary *and* the token is cancelled.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        self.count % self.period == 0 && self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn explicit_cancel() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let token = CancellationToken::with_deadline(Duration::ZERO);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn deadline_fires() {
        let token = CancellationToken::with_deadline(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(20));
        assert!(token.is_cancelled());
        assert!(token.deadline_elapsed());
    }

    #[test]
    fn check_only_fires_on_period_boundary() {
        let token = CancellationToken::new();
        token.cancel();
        let mut check = CancelCheck::new(&token, 3);
        assert!(!check.tick());
        assert!(!check.tick());
        assert!(check.tick());
    }
}
