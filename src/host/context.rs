//! Explicit engine context.
//!
//! Everything a panel operation needs beyond the panel itself travels in an
//! [`EngineContext`] passed by the caller: the queue deferred callbacks are
//! posted to, engine settings, the transition journal and the logger. There
//! is no process-wide "current host".

use crate::config::EngineConfig;
use crate::logger::Logger;
use crate::panel::DataState;
use crate::source::LoadEvent;
use std::collections::VecDeque;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub discard_stale_callbacks: bool,
    pub record_transitions: bool,
    pub journal_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            discard_stale_callbacks: config.discard_stale_callbacks,
            record_transitions: config.record_transitions,
            journal_capacity: config.journal_capacity.max(1),
        }
    }
}

/// One recorded state change of one panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub panel: String,
    pub from: DataState,
    pub to: DataState,
}

pub struct EngineContext {
    settings: EngineSettings,
    sender: mpsc::UnboundedSender<LoadEvent>,
    journal: VecDeque<Transition>,
    logger: Logger,
}

impl EngineContext {
    /// Create a context and the receiving end of its callback queue
    pub fn new(settings: EngineSettings, logger: Logger) -> (Self, mpsc::UnboundedReceiver<LoadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        (
            Self {
                settings,
                sender: tx,
                journal: VecDeque::new(),
                logger,
            },
            rx,
        )
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut EngineSettings {
        &mut self.settings
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<LoadEvent> {
        self.sender.clone()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub(crate) fn record(&mut self, panel: &str, from: DataState, to: DataState) {
        self.logger.log(format!("Panel '{}': {} -> {}", panel, from, to));

        if !self.settings.record_transitions {
            return;
        }
        if self.journal.len() >= self.settings.journal_capacity {
            self.journal.pop_front();
        }
        self.journal.push_back(Transition {
            panel: panel.to_string(),
            from,
            to,
        });
    }

    /// Recorded transitions, oldest first
    pub fn journal(&self) -> impl Iterator<Item = &Transition> {
        self.journal.iter()
    }

    pub fn take_journal(&mut self) -> Vec<Transition> {
        self.journal.drain(..).collect()
    }
}
