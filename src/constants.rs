//! Constants used throughout the engine and the inspector
//!
//! This module centralizes log strings, file names, and default values
//! to keep them consistent between the library and the binary.

// Configuration
pub const CONFIG_FILE_NAME: &str = "stageload.toml";
pub const CONFIG_DIR_NAME: &str = "stageload";
pub const CONFIG_GENERATED: &str = "✅ Generated default configuration file";

// Logging
pub const LOG_FILE_NAME: &str = "stageload.log";
/// Maximum number of lines kept in the in-memory log buffer
pub const LOG_BUFFER_CAPACITY: usize = 1000;
pub const LOG_TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

// Engine defaults
pub const DEFAULT_JOURNAL_CAPACITY: usize = 256;
pub const MAX_JOURNAL_CAPACITY: usize = 65_536;

// Inspector defaults
pub const DEFAULT_TICK_RATE_MS: u64 = 100;
pub const MIN_TICK_RATE_MS: u64 = 10;
pub const MAX_TICK_RATE_MS: u64 = 1000;
pub const DEFAULT_MIN_DELAY_MS: u64 = 300;
pub const DEFAULT_MAX_DELAY_MS: u64 = 2500;
pub const MAX_SIMULATED_DELAY_MS: u64 = 60_000;
pub const DEFAULT_FAILURE_EVERY: u32 = 5;
pub const SNAPSHOT_FILE_NAME: &str = "stageload-snapshot.json";

// Log messages
pub const LOG_DISCARDED_STALE: &str = "⏭️ Discarded stale callback";
pub const LOG_IGNORED_DETACHED: &str = "🔌 Ignored callback for detached panel";
pub const LOG_IGNORED_REMOVED: &str = "🗑️ Ignored callback for removed panel";
pub const LOG_RECOVERING_LOAD: &str = "♻️ Re-issuing load pass after reattach";

// Inspector UI text
pub const INSPECTOR_TITLE: &str = "🧭 Panels";
pub const INSPECTOR_DETAIL_TITLE: &str = "🔎 Panel";
pub const INSPECTOR_LOG_TITLE: &str = "📜 Log";
pub const INSPECTOR_HELP: &str =
    "v visible · i invalidate · r reload · x reset · space select · a ad-hoc · s save · l restore · j/k move · q quit";
