//! Panels and the coordinator state machine.
//!
//! A [`Panel`] is one node of the UI tree. It owns an ordered list of static
//! data sources, a collection of ad-hoc sources registered at runtime, a
//! [`LoadTracker`] holding its aggregate [`DataState`], and the
//! [`PanelView`] that renders it. Panels live in a [`PanelTree`], which
//! applies the per-panel operations hierarchically.
//!
//! # Module Components
//!
//! - [`state`] - the aggregate data state and its legal transitions
//! - [`pending`] - growable bitset of sources awaiting a callback
//! - [`tracker`] - the load/display state machine
//! - [`tree`] - arena of panels, propagation and lifecycle recovery
//! - [`view`] - the rendering-layer contract

pub mod pending;
pub mod state;
pub mod tracker;
pub mod tree;
pub mod view;

pub use pending::PendingSet;
pub use state::DataState;
pub use tracker::LoadTracker;
pub use tree::{PanelKey, PanelTree};
pub use view::{DisplayFrame, NullView, PanelView};

use crate::error::{EngineError, EngineResult};
use crate::host::context::EngineContext;
use crate::source::{DataSource, LoadId, LoadListener, LoadOutcome, SourceError};
use std::collections::BTreeMap;
use tracker::ListenerLink;

/// A source registered at runtime, tracked outside the aggregate.
struct AdhocSource {
    token: u64,
    source: Box<dyn DataSource>,
}

pub struct Panel {
    id: String,
    key: Option<PanelKey>,
    sources: Vec<Box<dyn DataSource>>,
    adhoc: Vec<AdhocSource>,
    next_adhoc: u64,
    tracker: LoadTracker,
    view: Box<dyn PanelView>,
    /// Wants to be active whenever its parent is
    selected: bool,
    /// Currently wired to its sources and allowed to display
    active: bool,
    restored_adhoc: Vec<serde_json::Value>,
}

impl Panel {
    pub fn new(id: impl Into<String>, view: impl PanelView + 'static) -> Self {
        Self {
            id: id.into(),
            key: None,
            sources: Vec::new(),
            adhoc: Vec::new(),
            next_adhoc: 0,
            tracker: LoadTracker::new(),
            view: Box::new(view),
            selected: true,
            active: false,
            restored_adhoc: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl DataSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Append a static source; it takes part in the next load pass
    pub fn add_source(&mut self, source: Box<dyn DataSource>) -> LoadId {
        self.sources.push(source);
        LoadId::Static(self.sources.len() - 1)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> Option<PanelKey> {
        self.key
    }

    pub fn state(&self) -> DataState {
        self.tracker.state()
    }

    pub fn is_loading(&self) -> bool {
        self.tracker.state() == DataState::Loading
    }

    pub fn can_load_data(&self) -> bool {
        self.tracker.state() == DataState::Invalid
    }

    pub fn can_display(&self) -> bool {
        self.tracker.state() != DataState::Displayed
    }

    pub fn pending(&self) -> &PendingSet {
        self.tracker.pending()
    }

    pub fn epoch(&self) -> u64 {
        self.tracker.epoch()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn source(&self, index: usize) -> Option<&dyn DataSource> {
        self.sources.get(index).map(|source| source.as_ref())
    }

    pub fn adhoc_count(&self) -> usize {
        self.adhoc.len()
    }

    pub fn source_failed(&self, index: usize) -> bool {
        self.tracker.failures().contains_key(&index)
    }

    pub fn source_error(&self, index: usize) -> Option<&SourceError> {
        self.tracker.failures().get(&index)
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = usize> + '_ {
        self.tracker.failures().keys().copied()
    }

    pub fn has_failures(&self) -> bool {
        !self.tracker.failures().is_empty()
    }

    /// Ad-hoc payloads handed back by the last state restore
    pub fn take_restored_adhoc(&mut self) -> Vec<serde_json::Value> {
        std::mem::take(&mut self.restored_adhoc)
    }

    pub(crate) fn bind(&mut self, key: PanelKey, ctx: &EngineContext) {
        self.key = Some(key);
        self.tracker.set_link(Some(ListenerLink {
            key,
            sender: ctx.sender(),
        }));
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Run a load pass; returns true if the data is complete on return.
    ///
    /// Valid sources and sources that resolve inside `load_if_needed` are
    /// cleared during the pass. Aggregate completion is evaluated once, after
    /// the loop, no matter how many sources resolved synchronously.
    pub(crate) fn load_data(&mut self, ctx: &mut EngineContext) -> bool {
        self.tracker.begin_pass(self.sources.len());

        for (index, source) in self.sources.iter_mut().enumerate() {
            let load_id = LoadId::Static(index);
            if source.is_valid() || !source.load_if_needed(&mut self.tracker, load_id) {
                self.tracker.resolve(index);
            }
        }

        let completed = self.tracker.end_pass();
        self.flush(ctx);
        completed
    }

    /// Render if loaded; returns true if the view was rendered by this call
    pub(crate) fn display(&mut self, ctx: &mut EngineContext) -> EngineResult<bool> {
        match self.tracker.state() {
            DataState::Displayed => Ok(false),
            DataState::Loaded => {
                let frame = DisplayFrame {
                    panel_id: &self.id,
                    source_count: self.sources.len(),
                    failures: self.tracker.failures(),
                };
                self.view.render(&frame);
                self.tracker.mark_displayed();
                self.flush(ctx);
                Ok(true)
            }
            state => Err(EngineError::NotLoaded {
                panel: self.id.clone(),
                state,
            }),
        }
    }

    pub(crate) fn invalidate_data(&mut self, ctx: &mut EngineContext) {
        for source in &mut self.sources {
            source.invalidate();
        }
        self.tracker.invalidate();
        self.flush(ctx);
    }

    pub(crate) fn invalidate_display(&mut self, ctx: &mut EngineContext) -> bool {
        let stepped_back = self.tracker.invalidate_display();
        self.flush(ctx);
        stepped_back
    }

    pub(crate) fn reset(&mut self, ctx: &mut EngineContext) {
        self.invalidate_data(ctx);
        self.release_adhoc();
        self.restored_adhoc.clear();
        self.view.reset();
        self.flush(ctx);
    }

    /// Register a one-shot source; returns its ad-hoc token
    pub(crate) fn load_adhoc(&mut self, ctx: &mut EngineContext, mut source: Box<dyn DataSource>) -> u64 {
        let token = self.next_adhoc;
        self.next_adhoc += 1;

        if source.load_if_needed(&mut self.tracker, LoadId::Adhoc(token)) {
            self.adhoc.push(AdhocSource { token, source });
        } else {
            log::debug!("Panel '{}': ad-hoc source '{}' resolved immediately", self.id, source.name());
        }
        self.flush(ctx);
        token
    }

    /// Apply a deferred callback; returns true on aggregate completion
    pub(crate) fn handle_event(&mut self, ctx: &mut EngineContext, load_id: LoadId, outcome: LoadOutcome) -> bool {
        match outcome {
            LoadOutcome::Started => self.tracker.on_data_load_start(load_id),
            LoadOutcome::Loaded => self.tracker.on_data_loaded(load_id),
            LoadOutcome::Failed(error) => self.tracker.on_data_load_failed(load_id, error),
            LoadOutcome::Interrupted => self.tracker.on_data_load_interrupted(load_id),
        }
        self.flush(ctx);
        self.tracker.take_completed()
    }

    pub(crate) fn detach_listeners(&mut self) {
        for source in &mut self.sources {
            source.detach_listener();
        }
        for adhoc in &mut self.adhoc {
            adhoc.source.detach_listener();
        }
    }

    pub(crate) fn attach_listeners(&mut self) {
        for (index, source) in self.sources.iter_mut().enumerate() {
            if let Some(listener) = self.tracker.deferred(LoadId::Static(index)) {
                source.attach_listener(listener);
            }
        }
        for adhoc in &mut self.adhoc {
            if let Some(listener) = self.tracker.deferred(LoadId::Adhoc(adhoc.token)) {
                adhoc.source.attach_listener(listener);
            }
        }
    }

    /// Stop everything in flight, invalidate sources and unbind the panel
    pub(crate) fn teardown(&mut self, ctx: &mut EngineContext) {
        self.tracker.begin_teardown();

        for (index, source) in self.sources.iter_mut().enumerate() {
            if self.tracker.pending().contains(index) || source.is_loading() {
                source.stop_loading();
                self.tracker.on_data_load_interrupted(LoadId::Static(index));
            }
            source.detach_listener();
            source.invalidate();
        }
        self.release_adhoc();

        self.tracker.invalidate();
        self.tracker.end_teardown();
        self.flush(ctx);

        self.view.reset();
        self.active = false;
        self.key = None;
        self.tracker.set_link(None);
    }

    /// Drop ad-hoc sources that are no longer in flight; returns how many
    pub(crate) fn release_settled_adhoc(&mut self) -> usize {
        let before = self.adhoc.len();
        self.adhoc.retain(|adhoc| adhoc.source.is_loading());
        before - self.adhoc.len()
    }

    fn release_adhoc(&mut self) {
        for mut adhoc in self.adhoc.drain(..) {
            adhoc.source.stop_loading();
            self.tracker.on_data_load_interrupted(LoadId::Adhoc(adhoc.token));
        }
        self.tracker.take_finished_adhoc();
    }

    /// Payloads of persistable static sources, keyed by source index
    pub(crate) fn save_sources(&mut self) -> BTreeMap<usize, serde_json::Value> {
        let mut saved = BTreeMap::new();
        for (index, source) in self.sources.iter_mut().enumerate() {
            let name = source.name().to_string();
            if let Some(persistable) = source.persistable() {
                match persistable.save() {
                    Ok(value) if !value.is_null() => {
                        saved.insert(index, value);
                    }
                    Ok(_) => {}
                    Err(e) => log::warn!("Panel '{}': could not save source '{}': {}", self.id, name, e),
                }
            }
        }
        saved
    }

    /// Save persistable ad-hoc sources; stop and drop the rest
    pub(crate) fn save_adhoc(&mut self, ctx: &mut EngineContext) -> Vec<serde_json::Value> {
        let mut saved = Vec::new();
        let mut kept = Vec::new();

        for mut adhoc in self.adhoc.drain(..) {
            let payload = adhoc.source.persistable().map(|persistable| persistable.save());
            match payload {
                Some(Ok(value)) => {
                    saved.push(value);
                    kept.push(adhoc);
                }
                Some(Err(e)) => {
                    log::warn!("Panel '{}': could not save ad-hoc source: {}", self.id, e);
                    kept.push(adhoc);
                }
                None => {
                    adhoc.source.stop_loading();
                    self.tracker.on_data_load_interrupted(LoadId::Adhoc(adhoc.token));
                }
            }
        }

        self.adhoc = kept;
        self.tracker.take_finished_adhoc();
        self.flush(ctx);
        saved
    }

    /// Restore persisted static payloads; returns how many were applied
    pub(crate) fn restore_sources(&mut self, saved: &BTreeMap<usize, serde_json::Value>) -> usize {
        let mut restored = 0;
        for (index, value) in saved {
            let Some(source) = self.sources.get_mut(*index) else {
                log::warn!("Panel '{}': snapshot names missing source #{}", self.id, index);
                continue;
            };
            let name = source.name().to_string();
            let Some(persistable) = source.persistable() else {
                continue;
            };
            match persistable.restore(value.clone()) {
                Ok(()) => restored += 1,
                Err(e) => log::warn!("Panel '{}': could not restore source '{}': {}", self.id, name, e),
            }
        }
        restored
    }

    pub(crate) fn set_restored_adhoc(&mut self, payloads: Vec<serde_json::Value>) {
        self.restored_adhoc = payloads;
    }

    pub(crate) fn all_sources_valid(&self) -> bool {
        self.sources.iter().all(|source| source.is_valid())
    }

    fn flush(&mut self, ctx: &mut EngineContext) {
        for (from, to) in self.tracker.take_transitions() {
            ctx.record(&self.id, from, to);
        }
        let finished = self.tracker.take_finished_adhoc();
        if !finished.is_empty() {
            self.adhoc.retain(|adhoc| !finished.contains(&adhoc.token));
        }
    }
}

impl std::fmt::Debug for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Panel")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("state", &self.tracker.state())
            .field("pending", &self.tracker.pending())
            .field("sources", &self.sources.len())
            .field("adhoc", &self.adhoc.len())
            .field("active", &self.active)
            .field("selected", &self.selected)
            .finish()
    }
}
