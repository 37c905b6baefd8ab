//! Terminal inspector for a demo [`Host`](crate::host::Host).
//!
//! Shows every panel with its data state, the selected panel's sources and
//! rendered output, and the engine log. Simulated sources make the load
//! cycle visible in real time.

pub mod actions;
pub mod app;
pub mod demo;
pub mod widgets;

pub use actions::Action;
pub use app::InspectorApp;

use crate::config::Config;
use crate::logger::Logger;
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::time::Duration;
use widgets::{DetailPane, LogPane, ScreenLayout, StatusBar, TreePane};

/// Run the inspector until the user quits
pub async fn run_app(config: &Config, logger: Logger) -> Result<()> {
    let mut app = InspectorApp::new(config, logger)?;

    // Terminal initialization
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_ui(&mut terminal, &mut app, Duration::from_millis(config.inspector.tick_rate_ms)).await;

    // Cleanup
    app.host.destroy();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut InspectorApp,
    tick_rate: Duration,
) -> Result<()> {
    loop {
        terminal.draw(|f| render_ui(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let action = app.handle_key(key);
                    if let Err(e) = app.apply(action) {
                        app.status = format!("⚠️ {:#}", e);
                        app.logger().log(format!("Inspector: {:?} failed: {:#}", action, e));
                    }
                }
            }
        }

        app.tick();
        tokio::task::yield_now().await;

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render_ui(f: &mut ratatui::Frame, app: &InspectorApp) {
    let (tree, detail, log, status) = ScreenLayout::split(f.area());

    TreePane::render(f, tree, app);
    DetailPane::render(f, detail, app);
    LogPane::render(f, log, app);
    StatusBar::render(f, status, app);
}
