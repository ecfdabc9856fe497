use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Pointer to the index currently being served.
///
/// Readers take an `Arc` snapshot and keep it for the whole request; a
/// rebuild constructs the replacement off to the side and swaps it in, so a
/// reader never sees a half-built value.
pub struct IndexHandle<T> {
    current: RwLock<Option<Arc<T>>>,
    generation: AtomicU64,
}

impl<T> IndexHandle<T> {
    pub fn new() -> Self {
        Self { current: RwLock::new(None), generation: AtomicU64::new(0) }
    }

    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.current.read().clone()
    }

    /// Install `next` and return the value it replaced.
    pub fn swap(&self, next: T) -> Option<Arc<T>> {
        let previous = self.current.write().replace(Arc::new(next));
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "active index swapped");
        previous
    }

    /// Number of swaps so far; 0 while nothing has been installed.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl<T> Default for IndexHandle<T> {
    fn default() -> Self { Self::new() }
}
