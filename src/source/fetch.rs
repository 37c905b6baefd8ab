//! Asynchronous data source backed by the tokio runtime.
//!
//! Each load spawns a task that runs the source's [`Fetcher`], stores the
//! result in the shared cell and posts the outcome through a
//! [`ListenerSlot`]. The slot is what makes detach and `stop_loading`
//! effective: clearing it means the task finishes silently.

use super::cell::{lock, SharedCell, SourceReader};
use super::{
    DataSource, DeferredListener, ListenerSlot, LoadId, LoadListener, LoadOutcome, PersistableSource, SourceError,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Produces a value for a [`FetchSource`].
#[async_trait]
pub trait Fetcher<T>: Send + Sync {
    async fn fetch(&self) -> Result<T, SourceError>;
}

struct InFlight {
    handle: JoinHandle<()>,
    slot: ListenerSlot,
}

pub struct FetchSource<T> {
    name: String,
    fetcher: Arc<dyn Fetcher<T>>,
    cell: SharedCell<T>,
    requests: Vec<InFlight>,
    persist: bool,
}

impl<T> FetchSource<T>
where
    T: Clone + Send + Serialize + DeserializeOwned + 'static,
{
    pub fn new<F>(name: impl Into<String>, fetcher: F) -> Self
    where
        F: Fetcher<T> + 'static,
    {
        Self::from_arc(name, Arc::new(fetcher))
    }

    pub fn from_arc(name: impl Into<String>, fetcher: Arc<dyn Fetcher<T>>) -> Self {
        Self {
            name: name.into(),
            fetcher,
            cell: SharedCell::default(),
            requests: Vec::new(),
            persist: false,
        }
    }

    /// Include the cached value in saved host state
    pub fn persistent(mut self) -> Self {
        self.persist = true;
        self
    }

    pub fn reader(&self) -> SourceReader<T> {
        SourceReader::new(Arc::clone(&self.cell))
    }

    /// Number of requests whose task has not finished yet
    pub fn in_flight(&self) -> usize {
        self.requests.iter().filter(|request| !request.handle.is_finished()).count()
    }

    fn prune_finished(&mut self) {
        self.requests.retain(|request| !request.handle.is_finished());
    }

    fn spawn_request(&mut self, listener: Option<DeferredListener>) -> Result<(), SourceError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| SourceError::Other(format!("'{}' needs a tokio runtime to load", self.name)))?;

        let slot = ListenerSlot::new(listener);
        let task_slot = slot.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let cell = Arc::clone(&self.cell);
        let name = self.name.clone();

        let generation = {
            let mut cell = lock(&self.cell);
            cell.in_flight += 1;
            cell.generation
        };

        let handle = runtime.spawn(async move {
            let result = fetcher.fetch().await;

            let outcome = {
                let mut cell = lock(&cell);
                cell.in_flight = cell.in_flight.saturating_sub(1);
                match result {
                    Ok(value) => {
                        cell.value = Some(value);
                        // An invalidation while this request ran leaves the cache invalid.
                        if cell.generation == generation {
                            cell.valid = true;
                        }
                        LoadOutcome::Loaded
                    }
                    Err(e) => {
                        log::warn!("Source '{}' failed to load: {}", name, e);
                        LoadOutcome::Failed(e)
                    }
                }
            };

            if !task_slot.notify(outcome) {
                log::debug!("Source '{}' finished with no listener attached", name);
            }
        });

        self.requests.push(InFlight { handle, slot });
        Ok(())
    }
}

impl<T> DataSource for FetchSource<T>
where
    T: Clone + Send + Serialize + DeserializeOwned + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        lock(&self.cell).valid
    }

    fn is_loading(&self) -> bool {
        lock(&self.cell).in_flight > 0
    }

    fn load_if_needed(&mut self, listener: &mut dyn LoadListener, load_id: LoadId) -> bool {
        if self.is_valid() {
            return false;
        }

        self.prune_finished();
        let deferred = listener.deferred(load_id);
        if deferred.is_none() {
            log::warn!("Source '{}' loading without a deferred listener", self.name);
        }

        match self.spawn_request(deferred) {
            Ok(()) => {
                listener.on_data_load_start(load_id);
                true
            }
            Err(e) => {
                listener.on_data_load_failed(load_id, e);
                false
            }
        }
    }

    fn invalidate(&mut self) {
        let mut cell = lock(&self.cell);
        cell.valid = false;
        cell.generation += 1;
    }

    fn stop_loading(&mut self) {
        for request in self.requests.drain(..) {
            request.slot.clear();
            request.handle.abort();
        }
        lock(&self.cell).in_flight = 0;
    }

    fn detach_listener(&mut self) {
        for request in &self.requests {
            request.slot.clear();
        }
    }

    fn attach_listener(&mut self, listener: DeferredListener) {
        self.prune_finished();
        for request in &self.requests {
            request.slot.set(Some(listener.clone()));
        }
    }

    fn persistable(&mut self) -> Option<&mut dyn PersistableSource> {
        if self.persist {
            Some(self)
        } else {
            None
        }
    }
}

impl<T> PersistableSource for FetchSource<T>
where
    T: Clone + Send + Serialize + DeserializeOwned + 'static,
{
    fn save(&self) -> Result<serde_json::Value, SourceError> {
        let cell = lock(&self.cell);
        match (&cell.value, cell.valid) {
            (Some(value), true) => serde_json::to_value(value).map_err(|e| SourceError::Decode(e.to_string())),
            _ => Ok(serde_json::Value::Null),
        }
    }

    fn restore(&mut self, value: serde_json::Value) -> Result<(), SourceError> {
        if value.is_null() {
            return Ok(());
        }
        let value: T = serde_json::from_value(value).map_err(|e| SourceError::Decode(e.to_string()))?;
        let mut cell = lock(&self.cell);
        cell.value = Some(value);
        cell.valid = true;
        Ok(())
    }
}

impl<T> Drop for FetchSource<T> {
    fn drop(&mut self) {
        // Cancel outstanding requests when the source is dropped
        for request in self.requests.drain(..) {
            request.slot.clear();
            request.handle.abort();
        }
    }
}
