//! Stageload - asynchronous data coordination for panel trees
//!
//! This library tracks, for a tree of panels each owning any number of
//! independent asynchronous data sources, when loading started, when every
//! source has resolved (successfully or not) and when it is safe to render.
//! Loading propagates through the tree, re-entry is idempotent, and panels
//! recover cleanly from being hidden and shown again mid-load.
//!
//! # Modules
//!
//! The library is organized into several key modules:
//!
//! * [`source`] - Data source and load listener contracts, plus ready-made sources
//! * [`panel`] - The per-panel state machine and the panel tree
//! * [`host`] - Lifecycle driver, callback pump and save/restore
//! * [`config`] - Engine and inspector configuration
//! * [`inspector`] - Terminal UI that drives a demo host

/// Configuration module for engine and inspector settings
pub mod config;

/// Application constants and default values
pub mod constants;

/// Contract-violation errors raised by the engine
pub mod error;

/// Top-level container driving panels through load/display cycles
pub mod host;

/// Terminal inspector built on ratatui
pub mod inspector;

/// Logging utilities for debugging and the inspector log pane
pub mod logger;

/// Panels, the coordinator state machine and the panel tree
pub mod panel;

/// Data source contracts and implementations
pub mod source;

pub use error::{EngineError, EngineResult};
pub use host::{Host, HostSnapshot};
pub use panel::{DataState, Panel, PanelKey, PanelView};
pub use source::{DataSource, LoadId, LoadListener, SourceError};
