//! Best-effort memory-usage statistics (spec §5): thread-safe, read-mostly,
//! refreshed no more than once per second so per-request probes stay cheap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// A process-wide, periodically refreshed estimate of resident memory
/// usage, shared by every in-flight solve so the probe itself stays cheap.
pub struct MemoryStats {
    cached_bytes: AtomicU64,
    last_refresh: Mutex<Option<Instant>>,
}

impl Default for MemoryStats {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStats {
    /// A tracker with no cached reading yet — the first call to
    /// [`Self::current_bytes`] always refreshes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cached_bytes: AtomicU64::new(0),
            last_refresh: Mutex::new(None),
        }
    }

    /// Best-effort resident memory in bytes, refreshing the cache if it's
    /// older than [`MIN_REFRESH_INTERVAL`].
    #[must_use]
    pub fn current_bytes(&self) -> u64 {
        let mut guard = self.last_refresh.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let needs_refresh = match *guard {
            Some(last) => last.elapsed() >= MIN_REFRESH_INTERVAL,
            None => true,
        };
        if needs_refresh {
            let sampled = sample_resident_bytes();
            self.cached_bytes.store(sampled, Ordering::Relaxed);
            *guard = Some(Instant::now());
        }
        self.cached_bytes.load(Ordering::Relaxed)
    }
}

/// Read resident memory from `/proc/self/statm` on Linux (pages * page
/// size); `0` anywhere the probe isn't available, since it's advisory-only
/// (spec §6 `memory_used_bytes`, not used in any invariant check).
fn sample_resident_bytes() -> u64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(contents) = std::fs::read_to_string("/proc/self/statm") {
            if let Some(resident_pages) = contents.split_whitespace().nth(1) {
                if let Ok(pages) = resident_pages.parse::<u64>() {
                    return pages * 4096;
                }
            }
        }
        0
    }
    #[cfg(not(target_os = "linux"))]
    {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_bytes_does_not_panic() {
        let stats = MemoryStats::new();
        let _ = stats.current_bytes();
    }

    #[test]
    fn second_call_within_interval_reuses_cache() {
        let stats = MemoryStats::new();
        let first = stats.current_bytes();
        let second = stats.current_bytes();
        assert_eq!(first, second);
    }
}
