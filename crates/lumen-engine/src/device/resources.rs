use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts live GPU allocations made against one context.
///
/// Every texture, pipeline set, and scratch buffer holds a [`ResourceToken`];
/// the count drops when the token does. Tests use [`live`](Self::live) to
/// assert that stopping a compositor releases everything it allocated.
#[derive(Clone, Default)]
pub struct ResourceTracker {
    live: Arc<AtomicUsize>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one allocation. `what` only feeds trace logging.
    pub fn acquire(&self, what: &'static str) -> ResourceToken {
        let n = self.live.fetch_add(1, Ordering::AcqRel) + 1;
        log::trace!("gpu resource acquired: {what} (live: {n})");
        ResourceToken { live: Arc::clone(&self.live), what }
    }

    /// Number of allocations currently alive.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ResourceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTracker").field("live", &self.live()).finish()
    }
}

/// Proof of one tracked allocation; releases it on drop.
pub struct ResourceToken {
    live: Arc<AtomicUsize>,
    what: &'static str,
}

impl Drop for ResourceToken {
    fn drop(&mut self) {
        let n = self.live.fetch_sub(1, Ordering::AcqRel) - 1;
        log::trace!("gpu resource released: {} (live: {n})", self.what);
    }
}

impl fmt::Debug for ResourceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceToken").field(&self.what).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_count_up_and_down() {
        let tracker = ResourceTracker::new();
        let a = tracker.acquire("a");
        let b = tracker.clone().acquire("b");
        assert_eq!(tracker.live(), 2);
        drop(a);
        assert_eq!(tracker.live(), 1);
        drop(b);
        assert_eq!(tracker.live(), 0);
    }
}
