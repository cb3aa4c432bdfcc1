//! Duplicate-event suppression.

use std::collections::HashSet;
use std::sync::Mutex;

/// Short-lived cache of processed event ids.
///
/// The chat transport delivers at-least-once: an id observed twice within
/// the retention window must be processed only the first time. The cache is
/// self-bounding: the sender may redeliver indefinitely and there is no
/// external expiry signal, so [`IdempotencyGuard::sweep`] clears the set
/// once it grows past `max_entries`. Best-effort, not linearizable: after a
/// sweep an old id would be accepted again.
#[derive(Debug)]
pub struct IdempotencyGuard {
    entries: Mutex<HashSet<i64>>,
    max_entries: usize,
}

impl IdempotencyGuard {
    /// Create a guard that sweeps past `max_entries` ids.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashSet::new()),
            max_entries,
        }
    }

    /// Whether `id` has already been observed.
    #[must_use]
    pub fn seen(&self, id: i64) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains(&id))
            .unwrap_or(false)
    }

    /// Record `id` as observed.
    pub fn mark(&self, id: i64) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(id);
        }
    }

    /// Atomically check and record `id` under one lock.
    ///
    /// Returns true exactly once per id within a retention window. The
    /// combined form exists because a separate seen-then-mark would race
    /// between concurrent deliveries of the same id.
    #[must_use]
    pub fn check_and_mark(&self, id: i64) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.insert(id))
            .unwrap_or(true)
    }

    /// Clear the cache if it has grown past the size bound.
    ///
    /// Called by the periodic sweep task.
    pub fn sweep(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() > self.max_entries {
                tracing::debug!(evicted = entries.len(), "Idempotency cache swept");
                entries.clear();
            }
        }
    }

    /// Number of ids currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delivery_passes_second_is_dropped() {
        let guard = IdempotencyGuard::new(100);

        assert!(guard.check_and_mark(42));
        assert!(!guard.check_and_mark(42));
        assert!(guard.check_and_mark(43));
    }

    #[test]
    fn seen_and_mark_agree_with_check_and_mark() {
        let guard = IdempotencyGuard::new(100);

        assert!(!guard.seen(7));
        guard.mark(7);
        assert!(guard.seen(7));
        assert!(!guard.check_and_mark(7));
    }

    #[test]
    fn sweep_clears_only_past_bound() {
        let guard = IdempotencyGuard::new(3);

        for id in 0..3 {
            guard.mark(id);
        }
        guard.sweep();
        assert_eq!(guard.len(), 3);

        guard.mark(3);
        guard.sweep();
        assert!(guard.is_empty());
    }
}
