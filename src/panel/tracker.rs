//! The load/display state machine of a single panel.
//!
//! [`LoadTracker`] owns everything the coordinator needs to decide when a
//! panel's data has fully arrived: the aggregate [`DataState`], the set of
//! static sources still awaiting a callback, the re-entrancy guard covering a
//! synchronous load pass, and the epoch that tags deferred callbacks. It is
//! the [`LoadListener`] handed to every source the panel owns.
//!
//! Transitions are buffered and drained by the panel into the engine journal.

use super::pending::PendingSet;
use super::state::DataState;
use super::tree::PanelKey;
use crate::source::{DeferredListener, LoadEvent, LoadId, LoadListener, SourceError};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Route from a tracker back to the host's event queue.
#[derive(Debug, Clone)]
pub(crate) struct ListenerLink {
    pub key: PanelKey,
    pub sender: mpsc::UnboundedSender<LoadEvent>,
}

#[derive(Debug, Default)]
pub struct LoadTracker {
    state: DataState,
    pending: PendingSet,
    in_load_pass: bool,
    tearing_down: bool,
    epoch: u64,
    failures: BTreeMap<usize, SourceError>,
    completed: bool,
    finished_adhoc: Vec<u64>,
    transitions: Vec<(DataState, DataState)>,
    link: Option<ListenerLink>,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DataState {
        self.state
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn in_load_pass(&self) -> bool {
        self.in_load_pass
    }

    pub fn failures(&self) -> &BTreeMap<usize, SourceError> {
        &self.failures
    }

    pub(crate) fn set_link(&mut self, link: Option<ListenerLink>) {
        self.link = link;
    }

    fn transition(&mut self, next: DataState) {
        if self.state == next {
            return;
        }
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        self.transitions.push((self.state, next));
        self.state = next;
    }

    /// Start a load pass over `source_count` static sources.
    ///
    /// Every index starts pending; the pass clears the ones that resolve
    /// synchronously. Re-entering from `Loading` restarts tracking under a
    /// fresh epoch, which is how a panel recovers listener wiring lost while
    /// it was detached.
    pub(crate) fn begin_pass(&mut self, source_count: usize) {
        self.epoch += 1;
        self.in_load_pass = true;
        self.completed = false;
        self.failures.clear();
        self.pending.fill(source_count);
        self.transition(DataState::Loading);
    }

    /// Clear a source that was valid or resolved inside `load_if_needed`
    pub(crate) fn resolve(&mut self, index: usize) {
        self.pending.remove(index);
    }

    /// Close the pass; returns true if every source already resolved
    pub(crate) fn end_pass(&mut self) -> bool {
        self.in_load_pass = false;
        self.settle();
        self.take_completed()
    }

    fn settle(&mut self) {
        if self.state == DataState::Loading && self.pending.is_empty() && !self.in_load_pass && !self.tearing_down {
            self.transition(DataState::Loaded);
            self.completed = true;
        }
    }

    /// Whether aggregate completion happened since the last call
    pub(crate) fn take_completed(&mut self) -> bool {
        std::mem::take(&mut self.completed)
    }

    pub(crate) fn take_finished_adhoc(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.finished_adhoc)
    }

    pub(crate) fn take_transitions(&mut self) -> Vec<(DataState, DataState)> {
        std::mem::take(&mut self.transitions)
    }

    pub(crate) fn mark_displayed(&mut self) {
        self.transition(DataState::Displayed);
    }

    /// Step back from `Displayed` to `Loaded`; data is kept
    pub(crate) fn invalidate_display(&mut self) -> bool {
        if self.state == DataState::Displayed {
            self.transition(DataState::Loaded);
            true
        } else {
            false
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.epoch += 1;
        self.pending.clear();
        self.failures.clear();
        self.in_load_pass = false;
        self.completed = false;
        self.transition(DataState::Invalid);
    }

    /// Suppress aggregate completion while sources are being interrupted
    pub(crate) fn begin_teardown(&mut self) {
        self.tearing_down = true;
    }

    pub(crate) fn end_teardown(&mut self) {
        self.tearing_down = false;
    }
}

impl LoadListener for LoadTracker {
    fn on_data_load_start(&mut self, load_id: LoadId) {
        let LoadId::Static(index) = load_id else {
            return;
        };
        // A source starting on its own outside a pass does not reopen a
        // resolved aggregate.
        if self.state != DataState::Loading {
            log::debug!("Ignoring load start for {} while {}", load_id, self.state);
            return;
        }
        self.failures.remove(&index);
        self.pending.insert(index);
    }

    fn on_data_loaded(&mut self, load_id: LoadId) {
        match load_id {
            LoadId::Static(index) => {
                self.failures.remove(&index);
                self.pending.remove(index);
                self.settle();
            }
            LoadId::Adhoc(token) => self.finished_adhoc.push(token),
        }
    }

    fn on_data_load_failed(&mut self, load_id: LoadId, error: SourceError) {
        match load_id {
            LoadId::Static(index) => {
                if self.state == DataState::Loading {
                    self.failures.insert(index, error);
                }
                self.pending.remove(index);
                self.settle();
            }
            LoadId::Adhoc(token) => {
                log::warn!("Ad-hoc source {} failed: {}", token, error);
                self.finished_adhoc.push(token);
            }
        }
    }

    fn on_data_load_interrupted(&mut self, load_id: LoadId) {
        match load_id {
            LoadId::Static(index) => {
                self.pending.remove(index);
                self.settle();
            }
            LoadId::Adhoc(token) => self.finished_adhoc.push(token),
        }
    }

    fn deferred(&self, load_id: LoadId) -> Option<DeferredListener> {
        self.link
            .as_ref()
            .map(|link| DeferredListener::new(link.key, self.epoch, load_id, link.sender.clone()))
    }
}
