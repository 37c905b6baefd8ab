//! Error types for engine contract violations.
//!
//! Data-source failures are never reported through these errors; they are
//! folded into per-source flags on the owning panel (see
//! [`crate::source::SourceError`]). An [`EngineError`] means the integration
//! itself is broken: a panel was asked to do something its state forbids, or
//! the tree was given an inconsistent shape.

use crate::panel::DataState;

/// Contract violations raised by the panel tree and the host.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Panel '{panel}' cannot display while {state}")]
    NotLoaded { panel: String, state: DataState },

    #[error("Duplicate panel id: {0}")]
    DuplicatePanelId(String),

    #[error("Unknown panel: {0}")]
    UnknownPanel(String),

    #[error("Panel key no longer refers to a live panel")]
    StaleKey,

    #[error("Host has been destroyed")]
    HostDestroyed,
}

pub type EngineResult<T> = Result<T, EngineError>;
