//! Simulated panels and sources the inspector drives.
//!
//! Fetches sleep on the tokio runtime for a configurable latency and every
//! Nth request fails, so the tree shows loading, partial failure and
//! recovery without any real backend.

use crate::config::InspectorConfig;
use crate::error::EngineResult;
use crate::host::Host;
use crate::panel::{DisplayFrame, Panel, PanelKey, PanelView};
use crate::source::{DataSource, FetchSource, Fetcher, MemorySource, SourceError, SourceReader};
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Rendered output of every panel, keyed by panel path
pub type Screen = Rc<RefCell<BTreeMap<String, Vec<String>>>>;

type Items = Vec<String>;

#[derive(Debug, Clone)]
pub struct DemoSettings {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub failure_every: u32,
    /// Shared across fetchers so failures spread over the whole tree
    attempts: Arc<AtomicU32>,
}

impl From<&InspectorConfig> for DemoSettings {
    fn from(config: &InspectorConfig) -> Self {
        Self {
            min_delay_ms: config.min_delay_ms,
            max_delay_ms: config.max_delay_ms,
            failure_every: config.failure_every,
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl DemoSettings {
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    fn fetcher(&self, label: &str, items: &[&str]) -> SimulatedFetcher {
        SimulatedFetcher {
            label: label.to_string(),
            items: items.iter().map(|item| item.to_string()).collect(),
            min_delay_ms: self.min_delay_ms,
            max_delay_ms: self.max_delay_ms,
            failure_every: self.failure_every,
            attempts: Arc::clone(&self.attempts),
        }
    }

    /// An asynchronous source that keeps its value across save/restore
    fn fetched(&self, name: &str, items: &[&str]) -> (Box<dyn DataSource>, SourceReader<Items>) {
        let source: FetchSource<Items> = FetchSource::new(name, self.fetcher(name, items)).persistent();
        let reader = source.reader();
        let source: Box<dyn DataSource> = Box::new(source);
        (source, reader)
    }

    /// A source answered from an in-process cache
    fn cached(&self, name: &str, items: &[&str]) -> (Box<dyn DataSource>, SourceReader<Items>) {
        let items: Items = items.iter().map(|item| item.to_string()).collect();
        let source = MemorySource::new(name, move || Ok(items.clone()));
        let reader = source.reader();
        let source: Box<dyn DataSource> = Box::new(source);
        (source, reader)
    }

    /// One-shot preview fetch fired by the `a` key
    pub fn adhoc_source(&self, sequence: u32) -> Box<dyn DataSource> {
        let name = format!("preview-{}", sequence);
        Box::new(FetchSource::<Items>::new(name.clone(), self.fetcher(&name, &["thumbnail", "summary"])).persistent())
    }
}

/// Fetcher that sleeps, then returns its items or fails on cadence.
pub struct SimulatedFetcher {
    label: String,
    items: Items,
    min_delay_ms: u64,
    max_delay_ms: u64,
    failure_every: u32,
    attempts: Arc<AtomicU32>,
}

impl SimulatedFetcher {
    fn delay_for(&self, attempt: u32) -> Duration {
        let span = self.max_delay_ms.saturating_sub(self.min_delay_ms);
        let jitter = if span == 0 { 0 } else { (u64::from(attempt) * 7_919) % (span + 1) };
        Duration::from_millis(self.min_delay_ms + jitter)
    }
}

#[async_trait]
impl Fetcher<Items> for SimulatedFetcher {
    async fn fetch(&self) -> Result<Items, SourceError> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        tokio::time::sleep(self.delay_for(attempt)).await;

        if self.failure_every > 0 && attempt % self.failure_every == 0 {
            return Err(SourceError::Fetch(format!(
                "{} request #{} timed out",
                self.label, attempt
            )));
        }
        Ok(self
            .items
            .iter()
            .map(|item| format!("{} #{}", item, attempt))
            .collect())
    }
}

/// Writes one line per source into the shared [`Screen`].
pub struct TextView {
    path: String,
    sources: Vec<(String, SourceReader<Items>)>,
    screen: Screen,
    renders: u32,
}

impl TextView {
    pub fn new(path: impl Into<String>, sources: Vec<(String, SourceReader<Items>)>, screen: Screen) -> Self {
        Self {
            path: path.into(),
            sources,
            screen,
            renders: 0,
        }
    }
}

impl PanelView for TextView {
    fn render(&mut self, frame: &DisplayFrame<'_>) {
        self.renders += 1;
        let mut lines = vec![format!("render #{}", self.renders)];

        for (index, (name, reader)) in self.sources.iter().enumerate() {
            if let Some(error) = frame.error(index) {
                lines.push(format!("⚠️ {}: {}", name, error));
                continue;
            }
            match reader.get() {
                Some(items) => lines.push(format!("{}: {}", name, items.join(", "))),
                None => lines.push(format!("{}: (empty)", name)),
            }
        }

        self.screen.borrow_mut().insert(self.path.clone(), lines);
    }

    fn reset(&mut self) {
        self.renders = 0;
        self.screen.borrow_mut().remove(&self.path);
    }
}

fn demo_panel(path: &str, sources: Vec<(Box<dyn DataSource>, SourceReader<Items>)>, screen: &Screen) -> Panel {
    let id = path.rsplit('/').next().unwrap_or(path);
    let readers = sources
        .iter()
        .map(|(source, reader)| (source.name().to_string(), reader.clone()))
        .collect();

    let mut panel = Panel::new(id, TextView::new(path, readers, Rc::clone(screen)));
    for (source, _) in sources {
        panel.add_source(source);
    }
    panel
}

/// Attach the demo tree to `host`:
///
/// ```text
/// inbox       folders (cached), messages
/// ├─ unread   unread
/// └─ starred  starred             (not selected)
/// calendar    events
/// ├─ month    holidays (cached), agenda
/// └─ week     agenda              (not selected)
/// settings    (no sources)
/// ```
pub fn populate(host: &mut Host, settings: &DemoSettings, screen: &Screen) -> EngineResult<()> {
    let inbox = host.attach_panel(demo_panel(
        "inbox",
        vec![
            settings.cached("folders", &["Inbox", "Archive", "Sent"]),
            settings.fetched("messages", &["Standup notes", "Invoice", "Release plan"]),
        ],
        screen,
    ))?;
    host.attach_child(
        inbox,
        demo_panel("inbox/unread", vec![settings.fetched("unread", &["Invoice"])], screen),
    )?;
    host.attach_child(
        inbox,
        demo_panel("inbox/starred", vec![settings.fetched("starred", &["Release plan"])], screen).with_selected(false),
    )?;

    let calendar = host.attach_panel(demo_panel(
        "calendar",
        vec![settings.fetched("events", &["Retro", "Planning"])],
        screen,
    ))?;
    attach_calendar_views(host, calendar, settings, screen)?;

    host.attach_panel(demo_panel("settings", Vec::new(), screen))?;
    Ok(())
}

fn attach_calendar_views(
    host: &mut Host,
    calendar: PanelKey,
    settings: &DemoSettings,
    screen: &Screen,
) -> EngineResult<()> {
    host.attach_child(
        calendar,
        demo_panel(
            "calendar/month",
            vec![
                settings.cached("holidays", &["New Year", "Labour Day"]),
                settings.fetched("agenda", &["Dentist", "Flight"]),
            ],
            screen,
        ),
    )?;
    host.attach_child(
        calendar,
        demo_panel("calendar/week", vec![settings.fetched("agenda", &["Gym"])], screen).with_selected(false),
    )?;
    Ok(())
}
