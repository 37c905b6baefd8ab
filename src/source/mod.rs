//! Data source contracts.
//!
//! A [`DataSource`] is one unit of cacheable, possibly asynchronous data owned
//! by a panel. It reports progress to its owner through a [`LoadListener`]:
//! synchronously, while still inside [`DataSource::load_if_needed`], or later
//! through a [`DeferredListener`] that posts a [`LoadEvent`] back onto the UI
//! thread's event queue.
//!
//! # Module Components
//!
//! - [`memory`] - synchronous, cache-backed source that resolves inline
//! - [`fetch`] - tokio-backed source driven by an async [`Fetcher`]

mod cell;
pub mod fetch;
pub mod memory;

pub use cell::SourceReader;
pub use fetch::{FetchSource, Fetcher};
pub use memory::MemorySource;

use crate::panel::PanelKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Identifies a source within its owning panel.
///
/// Static sources are addressed by their index in the panel's ordered source
/// list and take part in aggregate completion. Ad-hoc sources get a unique
/// token and never affect the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadId {
    Static(usize),
    Adhoc(u64),
}

impl fmt::Display for LoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadId::Static(index) => write!(f, "#{}", index),
            LoadId::Adhoc(token) => write!(f, "adhoc:{}", token),
        }
    }
}

/// Why a single source failed to load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Load cancelled")]
    Cancelled,

    #[error("Invalid data: {0}")]
    Decode(String),

    #[error("Source error: {0}")]
    Other(String),
}

/// Terminal or progress outcome carried by a deferred callback.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Started,
    Loaded,
    Failed(SourceError),
    Interrupted,
}

/// A callback posted from a source back to its panel.
#[derive(Debug, Clone)]
pub struct LoadEvent {
    pub panel: PanelKey,
    pub epoch: u64,
    pub load_id: LoadId,
    pub outcome: LoadOutcome,
}

/// Callback contract a [`DataSource`] uses to report progress to its owner.
pub trait LoadListener {
    fn on_data_load_start(&mut self, load_id: LoadId);
    fn on_data_loaded(&mut self, load_id: LoadId);
    fn on_data_load_failed(&mut self, load_id: LoadId, error: SourceError);
    fn on_data_load_interrupted(&mut self, load_id: LoadId);

    /// A handle that can deliver callbacks for `load_id` after
    /// `load_if_needed` has returned, or `None` if the listener cannot be
    /// reached asynchronously.
    fn deferred(&self, load_id: LoadId) -> Option<DeferredListener>;
}

/// Handle kept by an asynchronous source to call its panel back later.
///
/// Delivery goes through the host's event queue, so callbacks always land on
/// the UI thread regardless of where the work ran.
#[derive(Debug, Clone)]
pub struct DeferredListener {
    panel: PanelKey,
    epoch: u64,
    load_id: LoadId,
    sender: mpsc::UnboundedSender<LoadEvent>,
}

impl DeferredListener {
    pub(crate) fn new(panel: PanelKey, epoch: u64, load_id: LoadId, sender: mpsc::UnboundedSender<LoadEvent>) -> Self {
        Self {
            panel,
            epoch,
            load_id,
            sender,
        }
    }

    pub fn load_id(&self) -> LoadId {
        self.load_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn started(&self) -> bool {
        self.send(LoadOutcome::Started)
    }

    pub fn loaded(&self) -> bool {
        self.send(LoadOutcome::Loaded)
    }

    pub fn failed(&self, error: SourceError) -> bool {
        self.send(LoadOutcome::Failed(error))
    }

    pub fn interrupted(&self) -> bool {
        self.send(LoadOutcome::Interrupted)
    }

    /// Post an outcome; returns false if the host is gone.
    pub fn send(&self, outcome: LoadOutcome) -> bool {
        self.sender
            .send(LoadEvent {
                panel: self.panel,
                epoch: self.epoch,
                load_id: self.load_id,
                outcome,
            })
            .is_ok()
    }
}

/// Shared, nullable listener slot.
///
/// Background work holds a clone of the slot rather than the listener itself,
/// so detaching (or stopping) the source suppresses late callbacks by
/// clearing the slot.
#[derive(Debug, Clone, Default)]
pub struct ListenerSlot {
    inner: Arc<Mutex<Option<DeferredListener>>>,
}

impl ListenerSlot {
    pub fn new(listener: Option<DeferredListener>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(listener)),
        }
    }

    pub fn set(&self, listener: Option<DeferredListener>) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = listener;
        }
    }

    pub fn clear(&self) {
        self.set(None);
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Deliver through the current listener, if any is attached
    pub fn notify(&self, outcome: LoadOutcome) -> bool {
        match self.inner.lock() {
            Ok(slot) => slot.as_ref().map(|listener| listener.send(outcome)).unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// Capability for sources whose cached value survives a save/restore cycle.
pub trait PersistableSource {
    fn save(&self) -> Result<serde_json::Value, SourceError>;
    fn restore(&mut self, value: serde_json::Value) -> Result<(), SourceError>;
}

/// A single unit of asynchronous, cacheable data.
pub trait DataSource {
    /// Short name used in logs and by the inspector
    fn name(&self) -> &str;

    /// True if the cached result can be reused without reloading
    fn is_valid(&self) -> bool;

    fn is_loading(&self) -> bool;

    /// Start loading unless the cached value is valid.
    ///
    /// Returns true if a load is now in flight and `listener` will be called
    /// back later. Returns false if nothing was needed, or if the load
    /// resolved synchronously, in which case `listener` has already been
    /// notified inline.
    fn load_if_needed(&mut self, listener: &mut dyn LoadListener, load_id: LoadId) -> bool;

    /// Drop cached validity so the next `load_if_needed` reloads
    fn invalidate(&mut self);

    /// Best-effort cancellation; late callbacks are suppressed
    fn stop_loading(&mut self);

    /// Stop reporting to the current listener; cached state is kept
    fn detach_listener(&mut self) {}

    /// Resume reporting in-flight results to `listener`
    fn attach_listener(&mut self, _listener: DeferredListener) {}

    fn persistable(&mut self) -> Option<&mut dyn PersistableSource> {
        None
    }
}
