use std::sync::{Arc, Mutex, MutexGuard};

/// Cached value plus validity bookkeeping, shared between a source, its
/// background work and any readers held by the rendering layer.
#[derive(Debug)]
pub(crate) struct SourceCell<T> {
    pub value: Option<T>,
    pub valid: bool,
    pub in_flight: usize,
    /// Bumped on every invalidation; results from older requests are kept
    /// out of the cache's validity.
    pub generation: u64,
}

impl<T> Default for SourceCell<T> {
    fn default() -> Self {
        Self {
            value: None,
            valid: false,
            in_flight: 0,
            generation: 0,
        }
    }
}

pub(crate) type SharedCell<T> = Arc<Mutex<SourceCell<T>>>;

pub(crate) fn lock<T>(cell: &SharedCell<T>) -> MutexGuard<'_, SourceCell<T>> {
    // A poisoned cell only means a fetch task panicked mid-update; the data is
    // still a plain value.
    match cell.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Read-only view of a source's cached value.
///
/// Views keep a reader so they can render whatever the source holds at
/// display time.
#[derive(Debug)]
pub struct SourceReader<T> {
    cell: SharedCell<T>,
}

impl<T> Clone for SourceReader<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Clone> SourceReader<T> {
    pub(crate) fn new(cell: SharedCell<T>) -> Self {
        Self { cell }
    }

    pub fn get(&self) -> Option<T> {
        lock(&self.cell).value.clone()
    }

    pub fn is_valid(&self) -> bool {
        lock(&self.cell).valid
    }
}
