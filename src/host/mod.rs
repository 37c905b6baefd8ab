//! The top-level container driving panels through load/display cycles.
//!
//! A [`Host`] owns the [`PanelTree`], the [`EngineContext`] and the receiving
//! end of the callback queue. It reacts to lifecycle signals:
//!
//! 1. **become_visible** - top-level panels are activated (listeners
//!    reattached, interrupted load passes re-issued, invalid panels loaded),
//!    then everything loaded is displayed top-down
//! 2. **become_hidden** - panels detach from their sources and keep their
//!    cached state
//! 3. **destroy** - every panel is torn down and the registry is cleared
//!
//! Deferred callbacks posted by data sources are applied on the caller's
//! thread by [`Host::pump`] or [`Host::next_event`].

pub mod context;
pub mod snapshot;

pub use context::{EngineContext, EngineSettings, Transition};
pub use snapshot::{HostSnapshot, PanelSnapshot};

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::logger::Logger;
use crate::panel::{DataState, Panel, PanelKey, PanelTree};
use crate::source::{DataSource, LoadEvent, LoadId, LoadOutcome};
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct Host {
    id: Uuid,
    ctx: EngineContext,
    tree: PanelTree,
    registry: HashMap<String, PanelKey>,
    events: mpsc::UnboundedReceiver<LoadEvent>,
    visible: bool,
    destroyed: bool,
}

impl Host {
    pub fn new(settings: EngineSettings, logger: Logger) -> Self {
        let (ctx, events) = EngineContext::new(settings, logger);

        Self {
            id: Uuid::new_v4(),
            ctx,
            tree: PanelTree::new(),
            registry: HashMap::new(),
            events,
            visible: false,
            destroyed: false,
        }
    }

    pub fn from_config(config: &Config, logger: Logger) -> Self {
        Self::new(EngineSettings::from(&config.engine), logger)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn tree(&self) -> &PanelTree {
        &self.tree
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    pub fn logger(&self) -> &Logger {
        self.ctx.logger()
    }

    /// Key of a top-level panel
    pub fn panel_key(&self, id: &str) -> Option<PanelKey> {
        self.registry.get(id).copied()
    }

    /// Top-level panel by id
    pub fn panel(&self, id: &str) -> Option<&Panel> {
        self.panel_key(id).and_then(|key| self.tree.get(key))
    }

    /// Any panel by `/`-separated id path
    pub fn resolve(&self, path: &str) -> Option<PanelKey> {
        self.tree.resolve_path(path)
    }

    pub fn get(&self, key: PanelKey) -> Option<&Panel> {
        self.tree.get(key)
    }

    pub fn get_mut(&mut self, key: PanelKey) -> Option<&mut Panel> {
        self.tree.get_mut(key)
    }

    pub fn state(&self, key: PanelKey) -> Option<DataState> {
        self.tree.state(key)
    }

    fn ensure_alive(&self) -> EngineResult<()> {
        if self.destroyed {
            Err(EngineError::HostDestroyed)
        } else {
            Ok(())
        }
    }

    /// Register a top-level panel under its id
    pub fn attach_panel(&mut self, panel: Panel) -> EngineResult<PanelKey> {
        self.ensure_alive()?;
        let id = panel.id().to_string();
        if self.registry.contains_key(&id) {
            return Err(EngineError::DuplicatePanelId(id));
        }

        let selected = panel.is_selected();
        let key = self.tree.insert_root(&self.ctx, panel)?;
        self.registry.insert(id.clone(), key);
        self.ctx.logger().log(format!("Host: attached panel '{}'", id));

        if self.visible && selected {
            self.tree.activate(&mut self.ctx, key)?;
        }
        Ok(key)
    }

    /// Attach a child panel under `parent`
    pub fn attach_child(&mut self, parent: PanelKey, panel: Panel) -> EngineResult<PanelKey> {
        self.ensure_alive()?;
        let selected = panel.is_selected();
        let key = self.tree.insert_child(&self.ctx, parent, panel)?;

        let parent_active = self.tree.get(parent).map(|panel| panel.is_active()).unwrap_or(false);
        if parent_active && selected {
            self.tree.activate(&mut self.ctx, key)?;
        }
        Ok(key)
    }

    /// Tear down a top-level panel and its subtree
    pub fn detach_panel(&mut self, id: &str) -> EngineResult<()> {
        let key = self
            .registry
            .remove(id)
            .ok_or_else(|| EngineError::UnknownPanel(id.to_string()))?;
        self.tree.remove(&mut self.ctx, key)?;
        self.ctx.logger().log(format!("Host: detached panel '{}'", id));
        Ok(())
    }

    /// Tear down any panel (and its subtree) by key
    pub fn remove(&mut self, key: PanelKey) -> EngineResult<()> {
        if self.tree.parent(key).is_none() {
            self.registry.retain(|_, root| *root != key);
        }
        self.tree.remove(&mut self.ctx, key)
    }

    fn selected_roots(&self) -> Vec<PanelKey> {
        self.tree
            .roots()
            .iter()
            .copied()
            .filter(|key| self.tree.get(*key).map(|panel| panel.is_selected()).unwrap_or(false))
            .collect()
    }

    /// Lifecycle: the host is now on screen
    pub fn become_visible(&mut self) -> EngineResult<()> {
        self.ensure_alive()?;
        self.visible = true;
        self.ctx.logger().log("Host: visible".to_string());

        let roots = self.selected_roots();
        for key in &roots {
            self.tree.activate(&mut self.ctx, *key)?;
        }
        for key in &roots {
            self.tree.display_subtree(&mut self.ctx, *key);
        }
        Ok(())
    }

    /// Lifecycle: the host left the screen
    pub fn become_hidden(&mut self) -> EngineResult<()> {
        self.ensure_alive()?;
        self.visible = false;
        self.ctx.logger().log("Host: hidden".to_string());

        for key in self.tree.roots().to_vec() {
            self.tree.deactivate(&mut self.ctx, key)?;
        }
        Ok(())
    }

    /// Lifecycle: tear everything down; the host cannot be used afterwards
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        for key in self.tree.roots().to_vec() {
            if let Err(e) = self.tree.remove(&mut self.ctx, key) {
                log::error!("Failed to tear down panel {}: {}", key, e);
            }
        }
        self.registry.clear();
        self.visible = false;
        self.destroyed = true;

        let mut dropped = 0;
        while self.events.try_recv().is_ok() {
            dropped += 1;
        }
        self.ctx
            .logger()
            .log(format!("Host: destroyed ({} queued callbacks dropped)", dropped));
    }

    /// Apply every queued callback without waiting; returns how many were applied
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            if self.tree.deliver(&mut self.ctx, event) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next callback and apply it; returns whether it was applied
    pub async fn next_event(&mut self) -> bool {
        match self.events.recv().await {
            Some(event) => self.tree.deliver(&mut self.ctx, event),
            None => false,
        }
    }

    /// Deliver a callback directly, as if `load_id` reported `outcome` now
    pub fn dispatch(&mut self, key: PanelKey, load_id: LoadId, outcome: LoadOutcome) -> EngineResult<bool> {
        let epoch = self.tree.get(key).ok_or(EngineError::StaleKey)?.epoch();
        Ok(self.tree.deliver(
            &mut self.ctx,
            LoadEvent {
                panel: key,
                epoch,
                load_id,
                outcome,
            },
        ))
    }

    pub fn load_data(&mut self, key: PanelKey) -> EngineResult<()> {
        self.tree.load_data(&mut self.ctx, key)
    }

    pub fn display(&mut self, key: PanelKey) -> EngineResult<()> {
        self.tree.display(&mut self.ctx, key)
    }

    pub fn invalidate_data(&mut self, key: PanelKey) -> EngineResult<()> {
        self.tree.invalidate_data(&mut self.ctx, key)
    }

    pub fn invalidate_display(&mut self, key: PanelKey) -> EngineResult<bool> {
        self.tree.invalidate_display(&mut self.ctx, key)
    }

    pub fn reset(&mut self, key: PanelKey) -> EngineResult<()> {
        self.tree.reset(&mut self.ctx, key)
    }

    pub fn load_adhoc(&mut self, key: PanelKey, source: Box<dyn DataSource>) -> EngineResult<u64> {
        self.tree.load_adhoc(&mut self.ctx, key, source)
    }

    /// Select or deselect a panel; top-level panels follow host visibility
    pub fn set_selected(&mut self, key: PanelKey, selected: bool) -> EngineResult<()> {
        if self.tree.parent(key).is_some() {
            return self.tree.set_selected(&mut self.ctx, key, selected);
        }

        self.tree
            .get_mut(key)
            .ok_or(EngineError::StaleKey)?
            .set_selected(selected);
        match (self.visible, selected) {
            (true, true) => self.tree.activate(&mut self.ctx, key),
            (true, false) => self.tree.deactivate(&mut self.ctx, key),
            _ => Ok(()),
        }
    }

    /// Explicit retry: invalidate everything, then load and display again
    pub fn reload(&mut self) -> EngineResult<()> {
        self.ensure_alive()?;
        for key in self.tree.roots().to_vec() {
            self.tree.invalidate_data(&mut self.ctx, key)?;
        }
        if self.visible {
            let roots = self.selected_roots();
            for key in &roots {
                self.tree.load_data(&mut self.ctx, *key)?;
            }
            for key in &roots {
                self.tree.display_subtree(&mut self.ctx, *key);
            }
        }
        Ok(())
    }

    /// Re-render everything with the data already loaded
    pub fn redraw(&mut self) -> EngineResult<()> {
        self.ensure_alive()?;
        for key in self.tree.roots().to_vec() {
            self.tree.invalidate_display_subtree(&mut self.ctx, key)?;
        }
        if self.visible {
            for key in self.selected_roots() {
                self.tree.display_subtree(&mut self.ctx, key);
            }
        }
        Ok(())
    }

    /// Capture `(id, data state)` for every panel, plus persistable source data.
    ///
    /// Ad-hoc sources that cannot be persisted are stopped first.
    pub fn save_state(&mut self) -> HostSnapshot {
        let panels = self
            .tree
            .roots()
            .to_vec()
            .into_iter()
            .filter_map(|key| self.save_panel(key))
            .collect();

        HostSnapshot {
            host_id: self.id,
            saved_at: chrono::Utc::now(),
            visible: self.visible,
            panels,
        }
    }

    fn save_panel(&mut self, key: PanelKey) -> Option<PanelSnapshot> {
        let children = self.tree.children(key).to_vec();
        let panel = self.tree.get_mut(key)?;

        let mut snapshot = PanelSnapshot {
            id: panel.id().to_string(),
            data_state: panel.state(),
            selected: panel.is_selected(),
            sources: panel.save_sources(),
            adhoc: panel.save_adhoc(&mut self.ctx),
            children: Vec::new(),
        };
        snapshot.children = children.into_iter().filter_map(|child| self.save_panel(child)).collect();
        Some(snapshot)
    }

    /// Re-apply a saved snapshot to the panels registered under the same ids.
    ///
    /// Persisted source data is restored first; a panel saved as loaded or
    /// displayed whose sources are all valid again is brought back to
    /// `Loaded` without issuing any load. Everything else stays invalid and
    /// loads on the next activation. Returns the number of panels restored to
    /// `Loaded`.
    pub fn restore_state(&mut self, snapshot: &HostSnapshot) -> EngineResult<usize> {
        self.ensure_alive()?;
        let mut restored = 0;
        for saved in &snapshot.panels {
            match self.panel_key(&saved.id) {
                Some(key) => restored += self.restore_panel(key, saved)?,
                None => log::warn!("Snapshot names unknown panel '{}'", saved.id),
            }
        }
        self.ctx.logger().log(format!(
            "Host: restored {} of {} panels from snapshot {}",
            restored,
            snapshot.panel_count(),
            snapshot.host_id
        ));
        Ok(restored)
    }

    fn restore_panel(&mut self, key: PanelKey, saved: &PanelSnapshot) -> EngineResult<usize> {
        let mut restored = 0;
        let selection_changed = {
            let panel = self.tree.get_mut(key).ok_or(EngineError::StaleKey)?;
            panel.restore_sources(&saved.sources);
            panel.set_restored_adhoc(saved.adhoc.clone());

            let was_loaded = matches!(saved.data_state, DataState::Loaded | DataState::Displayed);
            if was_loaded && panel.can_load_data() && panel.all_sources_valid() {
                panel.load_data(&mut self.ctx);
                restored += 1;
            }
            panel.is_selected() != saved.selected
        };

        // Selection goes through activation so wiring follows the flag
        if selection_changed {
            self.set_selected(key, saved.selected)?;
        }
        let display_now = self
            .tree
            .get(key)
            .map(|panel| panel.is_active() && panel.state() == DataState::Loaded)
            .unwrap_or(false);
        if display_now {
            self.tree.display_subtree(&mut self.ctx, key);
        }

        for child in &saved.children {
            match self.tree.find_child(key, &child.id) {
                Some(child_key) => restored += self.restore_panel(child_key, child)?,
                None => log::warn!("Snapshot names unknown child panel '{}'", child.id),
            }
        }
        Ok(restored)
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.destroy();
    }
}
