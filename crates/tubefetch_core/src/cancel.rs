use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-way cooperative stop signal scoped to a single batch.
///
/// Clones share the flag. Once cancelled it stays cancelled; start a new batch
/// with a fresh token instead of resetting.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
