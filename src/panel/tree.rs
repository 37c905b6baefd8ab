//! Arena of panels and hierarchical propagation.
//!
//! Panels are stored in generational slots and addressed by [`PanelKey`].
//! A node owns its children (removing a node tears down its subtree) and
//! keeps only a non-owning key to its parent, used for lookups.
//!
//! Propagation rules:
//! - `load_data` and `display` recurse into *selected* children, and only
//!   act on a child whose own state permits the operation.
//! - `invalidate_data` and `reset` reach every attached child.
//! - Aggregate completion displays a panel automatically only while it is
//!   *active*.

use super::state::DataState;
use super::Panel;
use crate::constants::{LOG_DISCARDED_STALE, LOG_IGNORED_DETACHED, LOG_IGNORED_REMOVED, LOG_RECOVERING_LOAD};
use crate::error::{EngineError, EngineResult};
use crate::host::context::EngineContext;
use crate::source::{DataSource, LoadEvent, LoadId};
use std::fmt;

/// Stable handle to a panel in a [`PanelTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelKey {
    index: u32,
    generation: u32,
}

impl fmt::Display for PanelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Node {
    panel: Panel,
    parent: Option<PanelKey>,
    children: Vec<PanelKey>,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Default)]
pub struct PanelTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<PanelKey>,
}

impl PanelTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: PanelKey) -> bool {
        self.node(key).is_some()
    }

    fn node(&self, key: PanelKey) -> Option<&Node> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, key: PanelKey) -> Option<&mut Node> {
        self.slots
            .get_mut(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn get(&self, key: PanelKey) -> Option<&Panel> {
        self.node(key).map(|node| &node.panel)
    }

    pub fn get_mut(&mut self, key: PanelKey) -> Option<&mut Panel> {
        self.node_mut(key).map(|node| &mut node.panel)
    }

    fn panel_mut(&mut self, key: PanelKey) -> EngineResult<&mut Panel> {
        self.get_mut(key).ok_or(EngineError::StaleKey)
    }

    pub fn state(&self, key: PanelKey) -> Option<DataState> {
        self.get(key).map(|panel| panel.state())
    }

    pub fn parent(&self, key: PanelKey) -> Option<PanelKey> {
        self.node(key).and_then(|node| node.parent)
    }

    pub fn children(&self, key: PanelKey) -> &[PanelKey] {
        self.node(key).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn roots(&self) -> &[PanelKey] {
        &self.roots
    }

    pub fn find_root(&self, id: &str) -> Option<PanelKey> {
        self.roots
            .iter()
            .copied()
            .find(|key| self.get(*key).map(|panel| panel.id() == id).unwrap_or(false))
    }

    pub fn find_child(&self, parent: PanelKey, id: &str) -> Option<PanelKey> {
        self.children(parent)
            .iter()
            .copied()
            .find(|key| self.get(*key).map(|panel| panel.id() == id).unwrap_or(false))
    }

    /// Resolve a `/`-separated id path starting at a root, e.g. `inbox/unread`
    pub fn resolve_path(&self, path: &str) -> Option<PanelKey> {
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let mut key = self.find_root(segments.next()?)?;
        for segment in segments {
            key = self.find_child(key, segment)?;
        }
        Some(key)
    }

    /// `/`-separated id path of a panel
    pub fn path_of(&self, key: PanelKey) -> Option<String> {
        let mut segments = vec![self.get(key)?.id().to_string()];
        let mut current = self.parent(key);
        while let Some(parent) = current {
            segments.push(self.get(parent)?.id().to_string());
            current = self.parent(parent);
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    /// Pre-order walk of every panel with its depth
    pub fn walk(&self) -> Vec<(PanelKey, usize)> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<(PanelKey, usize)> = self.roots.iter().rev().map(|key| (*key, 0)).collect();
        while let Some((key, depth)) = stack.pop() {
            out.push((key, depth));
            for child in self.children(key).iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }

    fn allocate(&mut self, node: Node) -> PanelKey {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            PanelKey {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            PanelKey { index, generation: 0 }
        }
    }

    pub fn insert_root(&mut self, ctx: &EngineContext, panel: Panel) -> EngineResult<PanelKey> {
        if self.find_root(panel.id()).is_some() {
            return Err(EngineError::DuplicatePanelId(panel.id().to_string()));
        }
        let key = self.allocate(Node {
            panel,
            parent: None,
            children: Vec::new(),
        });
        self.panel_mut(key)?.bind(key, ctx);
        self.roots.push(key);
        Ok(key)
    }

    pub fn insert_child(&mut self, ctx: &EngineContext, parent: PanelKey, panel: Panel) -> EngineResult<PanelKey> {
        if !self.contains(parent) {
            return Err(EngineError::StaleKey);
        }
        if self.find_child(parent, panel.id()).is_some() {
            let path = self.path_of(parent).unwrap_or_default();
            return Err(EngineError::DuplicatePanelId(format!("{}/{}", path, panel.id())));
        }
        let key = self.allocate(Node {
            panel,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.panel_mut(key)?.bind(key, ctx);
        if let Some(node) = self.node_mut(parent) {
            node.children.push(key);
        }
        Ok(key)
    }

    /// Tear down a subtree, children first, and free its slots
    pub fn remove(&mut self, ctx: &mut EngineContext, key: PanelKey) -> EngineResult<()> {
        if !self.contains(key) {
            return Err(EngineError::StaleKey);
        }
        for child in self.children(key).to_vec() {
            self.remove(ctx, child)?;
        }

        let parent = self.parent(key);
        let slot = &mut self.slots[key.index as usize];
        if let Some(mut node) = slot.node.take() {
            node.panel.teardown(ctx);
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);

        match parent {
            Some(parent) => {
                if let Some(node) = self.node_mut(parent) {
                    node.children.retain(|child| *child != key);
                }
            }
            None => self.roots.retain(|root| *root != key),
        }
        Ok(())
    }

    fn selected_children(&self, key: PanelKey) -> Vec<PanelKey> {
        self.children(key)
            .iter()
            .copied()
            .filter(|child| self.get(*child).map(|panel| panel.is_selected()).unwrap_or(false))
            .collect()
    }

    /// Load this panel if it is invalid, then every selected child that is
    pub fn load_data(&mut self, ctx: &mut EngineContext, key: PanelKey) -> EngineResult<()> {
        let display_now = {
            let panel = self.panel_mut(key)?;
            panel.can_load_data() && panel.load_data(ctx) && panel.is_active()
        };
        if display_now {
            self.display_subtree(ctx, key);
        }

        for child in self.selected_children(key) {
            self.load_data(ctx, child)?;
        }
        Ok(())
    }

    /// Display this panel, then any loaded selected descendants.
    ///
    /// Calling it on a panel that has not finished loading is a contract
    /// violation. Calling it again once displayed has no effect.
    pub fn display(&mut self, ctx: &mut EngineContext, key: PanelKey) -> EngineResult<()> {
        self.panel_mut(key)?.display(ctx)?;
        for child in self.selected_children(key) {
            self.display_subtree(ctx, child);
        }
        Ok(())
    }

    /// Display whatever in the subtree is loaded and not yet displayed
    pub fn display_subtree(&mut self, ctx: &mut EngineContext, key: PanelKey) {
        if let Some(panel) = self.get_mut(key) {
            if panel.state() == DataState::Loaded {
                if let Err(e) = panel.display(ctx) {
                    log::error!("Display failed for '{}': {}", panel.id(), e);
                }
            }
        }
        for child in self.selected_children(key) {
            self.display_subtree(ctx, child);
        }
    }

    /// Invalidate this panel and every attached descendant
    pub fn invalidate_data(&mut self, ctx: &mut EngineContext, key: PanelKey) -> EngineResult<()> {
        self.panel_mut(key)?.invalidate_data(ctx);
        for child in self.children(key).to_vec() {
            self.invalidate_data(ctx, child)?;
        }
        Ok(())
    }

    /// Step a displayed panel back to loaded; returns true if it was displayed
    pub fn invalidate_display(&mut self, ctx: &mut EngineContext, key: PanelKey) -> EngineResult<bool> {
        Ok(self.panel_mut(key)?.invalidate_display(ctx))
    }

    /// Invalidate display for the whole subtree
    pub fn invalidate_display_subtree(&mut self, ctx: &mut EngineContext, key: PanelKey) -> EngineResult<()> {
        self.panel_mut(key)?.invalidate_display(ctx);
        for child in self.children(key).to_vec() {
            self.invalidate_display_subtree(ctx, child)?;
        }
        Ok(())
    }

    /// Invalidate and release ad-hoc sources and view state for the subtree
    pub fn reset(&mut self, ctx: &mut EngineContext, key: PanelKey) -> EngineResult<()> {
        self.panel_mut(key)?.reset(ctx);
        for child in self.children(key).to_vec() {
            self.reset(ctx, child)?;
        }
        Ok(())
    }

    /// Register a one-shot source on a panel; returns its ad-hoc token
    pub fn load_adhoc(
        &mut self,
        ctx: &mut EngineContext,
        key: PanelKey,
        source: Box<dyn DataSource>,
    ) -> EngineResult<u64> {
        Ok(self.panel_mut(key)?.load_adhoc(ctx, source))
    }

    /// Wire a panel and its selected descendants to their sources.
    ///
    /// A panel coming back while `Loading` lost its listener wiring, so it
    /// re-runs its load pass; an invalid panel loads; a loaded one displays.
    /// Ad-hoc sources that settled while detached are released, since their
    /// one-shot callback was dropped.
    pub fn activate(&mut self, ctx: &mut EngineContext, key: PanelKey) -> EngineResult<()> {
        let display_now = {
            let panel = self.panel_mut(key)?;
            let was_active = panel.is_active();
            panel.set_active(true);

            let display_now = match panel.state() {
                DataState::Loading if !was_active => {
                    log::info!("{} for '{}'", LOG_RECOVERING_LOAD, panel.id());
                    panel.load_data(ctx)
                }
                DataState::Invalid => panel.load_data(ctx),
                DataState::Loaded => true,
                _ => false,
            };

            // After any re-issued pass, so listeners carry the current epoch
            if !was_active {
                panel.attach_listeners();
                let released = panel.release_settled_adhoc();
                if released > 0 {
                    log::debug!("Panel '{}': released {} settled ad-hoc sources", panel.id(), released);
                }
            }
            display_now
        };
        if display_now {
            self.display_subtree(ctx, key);
        }

        for child in self.selected_children(key) {
            self.activate(ctx, child)?;
        }
        Ok(())
    }

    /// Detach a panel and all its descendants from their sources.
    ///
    /// Cached state and validity are kept; callbacks arriving while detached
    /// are ignored.
    pub fn deactivate(&mut self, ctx: &mut EngineContext, key: PanelKey) -> EngineResult<()> {
        {
            let panel = self.panel_mut(key)?;
            if panel.is_active() {
                panel.set_active(false);
                panel.detach_listeners();
                ctx.logger()
                    .log(format!("Panel '{}' detached while {}", panel.id(), panel.state()));
            }
        }
        for child in self.children(key).to_vec() {
            self.deactivate(ctx, child)?;
        }
        Ok(())
    }

    /// Change whether a child should be active along with its parent
    pub fn set_selected(&mut self, ctx: &mut EngineContext, key: PanelKey, selected: bool) -> EngineResult<()> {
        self.panel_mut(key)?.set_selected(selected);

        let parent_active = self
            .parent(key)
            .and_then(|parent| self.get(parent))
            .map(|parent| parent.is_active())
            .unwrap_or(false);
        if !parent_active {
            return Ok(());
        }
        if selected {
            self.activate(ctx, key)
        } else {
            self.deactivate(ctx, key)
        }
    }

    /// Route a deferred callback to its panel.
    ///
    /// Returns false if the callback was dropped: the panel is gone, it is
    /// detached, or the callback belongs to an earlier load pass.
    pub fn deliver(&mut self, ctx: &mut EngineContext, event: LoadEvent) -> bool {
        let discard_stale = ctx.settings().discard_stale_callbacks;
        let Some(panel) = self.get_mut(event.panel) else {
            log::debug!("{} {} ({})", LOG_IGNORED_REMOVED, event.panel, event.load_id);
            return false;
        };
        if !panel.is_active() {
            log::debug!("{} '{}' ({})", LOG_IGNORED_DETACHED, panel.id(), event.load_id);
            return false;
        }
        if discard_stale && matches!(event.load_id, LoadId::Static(_)) && event.epoch != panel.epoch() {
            log::debug!(
                "{} for '{}' ({}, epoch {} != {})",
                LOG_DISCARDED_STALE,
                panel.id(),
                event.load_id,
                event.epoch,
                panel.epoch()
            );
            return false;
        }

        let completed = panel.handle_event(ctx, event.load_id, event.outcome);
        if completed && panel.is_active() {
            self.display_subtree(ctx, event.panel);
        }
        true
    }
}
