//! Synchronous, cache-backed data source.

use super::cell::{lock, SharedCell, SourceReader};
use super::{DataSource, LoadId, LoadListener, PersistableSource, SourceError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

type Loader<T> = Box<dyn FnMut() -> Result<T, SourceError>>;

/// A source whose load completes inside `load_if_needed`.
///
/// Models a cache hit or any cheap in-process computation: the listener is
/// notified inline and `load_if_needed` always returns false.
pub struct MemorySource<T> {
    name: String,
    cell: SharedCell<T>,
    loader: Loader<T>,
    persist: bool,
}

impl<T> MemorySource<T>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
{
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: FnMut() -> Result<T, SourceError> + 'static,
    {
        Self {
            name: name.into(),
            cell: SharedCell::default(),
            loader: Box::new(loader),
            persist: false,
        }
    }

    /// A source that is already valid with `value`
    pub fn ready(name: impl Into<String>, value: T) -> Self {
        let reload = value.clone();
        let source = Self::new(name, move || Ok(reload.clone()));
        {
            let mut cell = lock(&source.cell);
            cell.value = Some(value);
            cell.valid = true;
        }
        source
    }

    /// Include the cached value in saved host state
    pub fn persistent(mut self) -> Self {
        self.persist = true;
        self
    }

    pub fn reader(&self) -> SourceReader<T> {
        SourceReader::new(Arc::clone(&self.cell))
    }
}

impl<T> DataSource for MemorySource<T>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        lock(&self.cell).valid
    }

    fn is_loading(&self) -> bool {
        false
    }

    fn load_if_needed(&mut self, listener: &mut dyn LoadListener, load_id: LoadId) -> bool {
        if self.is_valid() {
            return false;
        }

        match (self.loader)() {
            Ok(value) => {
                {
                    let mut cell = lock(&self.cell);
                    cell.value = Some(value);
                    cell.valid = true;
                }
                listener.on_data_loaded(load_id);
            }
            Err(e) => {
                log::warn!("Source '{}' failed to load: {}", self.name, e);
                listener.on_data_load_failed(load_id, e);
            }
        }
        false
    }

    fn invalidate(&mut self) {
        let mut cell = lock(&self.cell);
        cell.valid = false;
        cell.generation += 1;
    }

    fn stop_loading(&mut self) {}

    fn persistable(&mut self) -> Option<&mut dyn PersistableSource> {
        if self.persist {
            Some(self)
        } else {
            None
        }
    }
}

impl<T> PersistableSource for MemorySource<T>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
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
