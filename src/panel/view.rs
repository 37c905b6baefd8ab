use crate::source::SourceError;
use std::collections::BTreeMap;

/// What a view is told when its panel displays.
#[derive(Debug, Clone, Copy)]
pub struct DisplayFrame<'a> {
    pub panel_id: &'a str,
    pub source_count: usize,
    pub failures: &'a BTreeMap<usize, SourceError>,
}

impl DisplayFrame<'_> {
    /// Whether source `index` failed and should show its error affordance
    pub fn source_failed(&self, index: usize) -> bool {
        self.failures.contains_key(&index)
    }

    pub fn error(&self, index: usize) -> Option<&SourceError> {
        self.failures.get(&index)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Rendering-layer collaborator of a panel.
pub trait PanelView {
    /// Render the panel's current data
    fn render(&mut self, frame: &DisplayFrame<'_>);

    /// Drop any adapter state built from previous data
    fn reset(&mut self) {}
}

/// A view that renders nothing, for purely structural panels
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl PanelView for NullView {
    fn render(&mut self, _frame: &DisplayFrame<'_>) {}
}
