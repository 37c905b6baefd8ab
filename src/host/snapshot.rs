//! Serializable host state for the save/restore boundary.

use crate::panel::DataState;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// Saved state of one host: every top-level panel, recursively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub host_id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub visible: bool,
    pub panels: Vec<PanelSnapshot>,
}

/// Saved state of one panel and its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSnapshot {
    pub id: String,
    pub data_state: DataState,
    #[serde(default = "default_selected")]
    pub selected: bool,
    /// Payloads of persistable static sources, keyed by source index
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<usize, serde_json::Value>,
    /// Payloads of persistable ad-hoc sources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adhoc: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PanelSnapshot>,
}

fn default_selected() -> bool {
    true
}

impl HostSnapshot {
    pub fn find(&self, id: &str) -> Option<&PanelSnapshot> {
        self.panels.iter().find(|panel| panel.id == id)
    }

    /// Total number of panels recorded, children included
    pub fn panel_count(&self) -> usize {
        self.panels.iter().map(PanelSnapshot::subtree_len).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize host snapshot")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse host snapshot")
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create snapshot directory: {}", parent.display()))?;
        }
        std::fs::write(&path, self.to_json()?)
            .with_context(|| format!("Failed to write snapshot: {}", path.as_ref().display()))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read snapshot: {}", path.as_ref().display()))?;
        Self::from_json(&content)
    }
}

impl PanelSnapshot {
    pub fn child(&self, id: &str) -> Option<&PanelSnapshot> {
        self.children.iter().find(|child| child.id == id)
    }

    fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(PanelSnapshot::subtree_len).sum::<usize>()
    }
}
