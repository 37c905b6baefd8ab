//! Inspector state and action handling

use super::actions::Action;
use super::demo::{self, DemoSettings, Screen};
use crate::config::Config;
use crate::constants::{CONFIG_DIR_NAME, SNAPSHOT_FILE_NAME};
use crate::host::{EngineSettings, Host, HostSnapshot};
use crate::logger::Logger;
use crate::panel::{Panel, PanelKey};
use anyhow::{Context, Result};
use crossterm::event::KeyEvent;
use std::path::PathBuf;

pub struct InspectorApp {
    pub host: Host,
    pub screen: Screen,
    pub demo: DemoSettings,
    pub selected: usize,
    pub status: String,
    pub should_quit: bool,
    pub snapshot_path: PathBuf,
    settings: EngineSettings,
    logger: Logger,
    adhoc_fired: u32,
}

impl InspectorApp {
    pub fn new(config: &Config, logger: Logger) -> Result<Self> {
        let settings = EngineSettings::from(&config.engine);
        let demo = DemoSettings::from(&config.inspector);
        let screen = Screen::default();
        let host = Self::build_host(settings, &logger, &demo, &screen)?;

        Ok(Self {
            host,
            screen,
            demo,
            selected: 0,
            status: "Host hidden. Press v to show it.".to_string(),
            should_quit: false,
            snapshot_path: Self::default_snapshot_path(),
            settings,
            logger,
            adhoc_fired: 0,
        })
    }

    fn build_host(settings: EngineSettings, logger: &Logger, demo: &DemoSettings, screen: &Screen) -> Result<Host> {
        let mut host = Host::new(settings, logger.clone());
        demo::populate(&mut host, demo, screen).context("Failed to build demo panels")?;
        Ok(host)
    }

    fn default_snapshot_path() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(SNAPSHOT_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(SNAPSHOT_FILE_NAME))
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Panels in display order, with their depth
    pub fn rows(&self) -> Vec<(PanelKey, usize)> {
        self.host.tree().walk()
    }

    pub fn selected_key(&self) -> Option<PanelKey> {
        self.rows().get(self.selected).map(|(key, _)| *key)
    }

    pub fn selected_panel(&self) -> Option<&Panel> {
        self.selected_key().and_then(|key| self.host.get(key))
    }

    pub fn selected_path(&self) -> Option<String> {
        self.selected_key().and_then(|key| self.host.tree().path_of(key))
    }

    pub fn handle_key(&self, key: KeyEvent) -> Action {
        Action::from_key(key)
    }

    /// Deliver callbacks posted by sources since the last tick
    pub fn tick(&mut self) -> usize {
        self.host.pump()
    }

    pub fn apply(&mut self, action: Action) -> Result<()> {
        match action {
            Action::SelectNext => {
                let rows = self.rows().len();
                if rows > 0 {
                    self.selected = (self.selected + 1) % rows;
                }
            }
            Action::SelectPrevious => {
                let rows = self.rows().len();
                if rows > 0 {
                    self.selected = (self.selected + rows - 1) % rows;
                }
            }
            Action::ToggleVisible => {
                if self.host.is_visible() {
                    self.host.become_hidden()?;
                    self.status = "Host hidden; in-flight callbacks will be ignored".to_string();
                } else {
                    self.host.become_visible()?;
                    self.status = "Host visible".to_string();
                }
            }
            Action::ReloadAll => {
                self.host.reload()?;
                self.status = "Reloading every panel".to_string();
            }
            Action::InvalidateSelected => {
                if let Some(key) = self.selected_key() {
                    self.host.invalidate_data(key)?;
                    let active = self.host.get(key).map(|panel| panel.is_active()).unwrap_or(false);
                    if active {
                        self.host.load_data(key)?;
                    }
                    self.status = format!("Invalidated {}", self.selected_path().unwrap_or_default());
                }
            }
            Action::ResetSelected => {
                if let Some(key) = self.selected_key() {
                    self.host.reset(key)?;
                    self.status = format!("Reset {}", self.selected_path().unwrap_or_default());
                }
            }
            Action::ToggleSelected => {
                if let Some(key) = self.selected_key() {
                    let selected = self.host.get(key).map(|panel| panel.is_selected()).unwrap_or(false);
                    self.host.set_selected(key, !selected)?;
                    self.status = format!(
                        "{} {}",
                        if selected { "Deselected" } else { "Selected" },
                        self.selected_path().unwrap_or_default()
                    );
                }
            }
            Action::LoadAdhoc => {
                if let Some(key) = self.selected_key() {
                    self.adhoc_fired += 1;
                    let token = self.host.load_adhoc(key, self.demo.adhoc_source(self.adhoc_fired))?;
                    self.status = format!(
                        "Ad-hoc source #{} sent to {}",
                        token,
                        self.selected_path().unwrap_or_default()
                    );
                }
            }
            Action::SaveSnapshot => {
                let snapshot = self.host.save_state();
                snapshot.save_to_file(&self.snapshot_path)?;
                self.status = format!(
                    "Saved {} panels to {}",
                    snapshot.panel_count(),
                    self.snapshot_path.display()
                );
            }
            Action::RestoreSnapshot => self.restore_snapshot()?,
            Action::Quit => self.should_quit = true,
            Action::None => {}
        }

        Ok(())
    }

    /// Replace the host with a fresh one and re-apply the saved snapshot
    fn restore_snapshot(&mut self) -> Result<()> {
        let snapshot = HostSnapshot::load_from_file(&self.snapshot_path)?;

        self.host.destroy();
        self.screen.borrow_mut().clear();
        self.host = Self::build_host(self.settings, &self.logger, &self.demo, &self.screen)?;

        let restored = self.host.restore_state(&snapshot)?;
        if snapshot.visible {
            self.host.become_visible()?;
        }

        self.selected = self.selected.min(self.rows().len().saturating_sub(1));
        self.status = format!(
            "Restored {} of {} panels from {}",
            restored,
            snapshot.panel_count(),
            snapshot.saved_at.format("%H:%M:%S")
        );
        Ok(())
    }
}
