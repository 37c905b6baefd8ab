use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate data state of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataState {
    /// Needs a load pass
    #[default]
    Invalid,
    /// Load pass started, sources outstanding
    Loading,
    /// All sources resolved, not rendered yet
    Loaded,
    /// Rendered with the current data
    Displayed,
}

impl DataState {
    /// Whether the state machine may move from `self` to `next`.
    ///
    /// Forward steps only, plus the two explicit resets: any state may return
    /// to `Invalid` (data invalidation) and `Displayed` may step back to
    /// `Loaded` (display invalidation).
    pub fn can_transition_to(self, next: DataState) -> bool {
        matches!(
            (self, next),
            (DataState::Invalid, DataState::Loading)
                | (DataState::Loading, DataState::Loaded)
                | (DataState::Loaded, DataState::Displayed)
                | (DataState::Displayed, DataState::Loaded)
                | (_, DataState::Invalid)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataState::Invalid => "INVALID",
            DataState::Loading => "LOADING",
            DataState::Loaded => "LOADED",
            DataState::Displayed => "DISPLAYED",
        }
    }
}

impl fmt::Display for DataState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
