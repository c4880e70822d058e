//! Mutation feed observed by the sync coordinator.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Shared counter bumped on every persisted domain mutation.
///
/// Reloads never mark the feed: only user-driven mutations count as local
/// changes.
#[derive(Debug, Clone, Default)]
pub struct ChangeFeed {
    inner: Arc<ChangeFeedInner>,
}

#[derive(Debug, Default)]
struct ChangeFeedInner {
    generation: AtomicU64,
    last_change_ms: AtomicI64,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one mutation at `now_ms`.
    pub fn mark(&self, now_ms: i64) {
        self.inner.last_change_ms.store(now_ms, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    pub fn last_change_ms(&self) -> i64 {
        self.inner.last_change_ms.load(Ordering::SeqCst)
    }
}
