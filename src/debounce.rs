//! Repeated-trigger suppression.

use std::sync::atomic::{AtomicU64, Ordering};

/// Default minimum spacing between accepted triggers.
pub const DEFAULT_WINDOW_MS: u64 = 500;

const NEVER: u64 = u64::MAX;

/// Accepts a trigger only if the previous accepted one is old enough.
///
/// Owned by whatever receives the triggers; there is no shared clock.
#[derive(Debug)]
pub struct Debouncer {
    last_ms: AtomicU64,
}

impl Debouncer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_ms: AtomicU64::new(NEVER),
        }
    }

    /// Returns true and records `now_ms` when at least `window_ms` passed
    /// since the last accepted trigger, or none was accepted yet.
    pub fn try_acquire(&self, now_ms: u64, window_ms: u64) -> bool {
        let mut last = self.last_ms.load(Ordering::Acquire);
        loop {
            if last != NEVER && now_ms.saturating_sub(last) < window_ms {
                return false;
            }
            match self
                .last_ms
                .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(current) => last = current,
            }
        }
    }

    /// [`try_acquire`](Self::try_acquire) with [`DEFAULT_WINDOW_MS`].
    pub fn try_acquire_default(&self, now_ms: u64) -> bool {
        self.try_acquire(now_ms, DEFAULT_WINDOW_MS)
    }

    /// Forgets the last accepted trigger.
    pub fn reset(&self) {
        self.last_ms.store(NEVER, Ordering::Release);
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}
