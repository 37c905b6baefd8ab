//! Panes of the inspector screen

use super::app::InspectorApp;
use crate::constants::{INSPECTOR_DETAIL_TITLE, INSPECTOR_HELP, INSPECTOR_LOG_TITLE, INSPECTOR_TITLE};
use crate::panel::{DataState, Panel};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

fn state_color(state: DataState) -> Color {
    match state {
        DataState::Invalid => Color::DarkGray,
        DataState::Loading => Color::Yellow,
        DataState::Loaded => Color::Cyan,
        DataState::Displayed => Color::Green,
    }
}

fn state_icon(state: DataState) -> &'static str {
    match state {
        DataState::Invalid => "○",
        DataState::Loading => "◐",
        DataState::Loaded => "●",
        DataState::Displayed => "✔",
    }
}

pub struct ScreenLayout;

impl ScreenLayout {
    /// Tree on the left; detail over log on the right; status line below
    #[must_use]
    pub fn split(area: Rect) -> (Rect, Rect, Rect, Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        let tree_width = std::cmp::min(rows[0].width / 3, 36);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(tree_width), Constraint::Min(0)])
            .split(rows[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[1]);

        (columns[0], right[0], right[1], rows[1])
    }
}

/// Panel tree with one row per panel
pub struct TreePane;

impl TreePane {
    pub fn render(f: &mut Frame, area: Rect, app: &InspectorApp) {
        let tree = app.host.tree();
        let items: Vec<ListItem> = app
            .rows()
            .into_iter()
            .filter_map(|(key, depth)| tree.get(key).map(|panel| (panel, depth)))
            .map(|(panel, depth)| {
                let state = panel.state();
                let mut spans = vec![
                    Span::raw("  ".repeat(depth)),
                    Span::styled(
                        format!("{} ", state_icon(state)),
                        Style::default().fg(state_color(state)),
                    ),
                    Span::raw(panel.id().to_string()),
                ];
                if !panel.is_selected() {
                    spans.push(Span::styled(" (unselected)", Style::default().fg(Color::DarkGray)));
                } else if !panel.is_active() {
                    spans.push(Span::styled(" (detached)", Style::default().fg(Color::DarkGray)));
                }
                if panel.has_failures() {
                    spans.push(Span::styled(" ⚠️", Style::default().fg(Color::Red)));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let title = if app.host.is_visible() {
            format!("{} (visible)", INSPECTOR_TITLE)
        } else {
            format!("{} (hidden)", INSPECTOR_TITLE)
        };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(Color::Blue).add_modifier(Modifier::BOLD));

        let mut state = ListState::default().with_selected(Some(app.selected));
        f.render_stateful_widget(list, area, &mut state);
    }
}

/// State, sources and rendered output of the selected panel
pub struct DetailPane;

impl DetailPane {
    pub fn render(f: &mut Frame, area: Rect, app: &InspectorApp) {
        let block = Block::default().borders(Borders::ALL).title(INSPECTOR_DETAIL_TITLE);
        let lines = match (app.selected_panel(), app.selected_path()) {
            (Some(panel), Some(path)) => Self::lines(panel, &path, app),
            _ => vec![Line::from("No panel selected")],
        };

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn lines(panel: &Panel, path: &str, app: &InspectorApp) -> Vec<Line<'static>> {
        let state = panel.state();
        let pending: Vec<String> = panel.pending().iter().map(|index| format!("#{}", index)).collect();

        let mut lines = vec![
            Line::from(vec![
                Span::styled(path.to_string(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw("  "),
                Span::styled(state.to_string(), Style::default().fg(state_color(state))),
            ]),
            Line::from(format!(
                "epoch {} · pending [{}] · ad-hoc {} · {}",
                panel.epoch(),
                pending.join(", "),
                panel.adhoc_count(),
                if panel.is_active() { "active" } else { "inactive" }
            )),
            Line::from(""),
        ];

        for index in 0..panel.source_count() {
            let Some(source) = panel.source(index) else {
                continue;
            };
            let (status, color) = if let Some(error) = panel.source_error(index) {
                (format!("failed: {}", error), Color::Red)
            } else if source.is_loading() {
                ("loading".to_string(), Color::Yellow)
            } else if source.is_valid() {
                ("valid".to_string(), Color::Green)
            } else {
                ("invalid".to_string(), Color::DarkGray)
            };
            lines.push(Line::from(vec![
                Span::raw(format!("#{} {} ", index, source.name())),
                Span::styled(status, Style::default().fg(color)),
            ]));
        }

        lines.push(Line::from(""));
        match app.screen.borrow().get(path) {
            Some(rendered) => lines.extend(rendered.iter().map(|line| Line::from(line.clone()))),
            None => lines.push(Line::styled("(not rendered)", Style::default().fg(Color::DarkGray))),
        }
        lines
    }
}

/// Newest log lines first
pub struct LogPane;

impl LogPane {
    pub fn render(f: &mut Frame, area: Rect, app: &InspectorApp) {
        let visible_rows = area.height.saturating_sub(2) as usize;
        let lines: Vec<Line> = app
            .logger()
            .get_logs()
            .into_iter()
            .take(visible_rows)
            .map(Line::from)
            .collect();

        let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(INSPECTOR_LOG_TITLE));
        f.render_widget(paragraph, area);
    }
}

pub struct StatusBar;

impl StatusBar {
    pub fn render(f: &mut Frame, area: Rect, app: &InspectorApp) {
        let text = if app.status.is_empty() {
            INSPECTOR_HELP.to_string()
        } else {
            format!("{} │ {}", app.status, INSPECTOR_HELP)
        };
        let color = if app.status.starts_with('⚠') {
            Color::Red
        } else {
            Color::Gray
        };

        let status_bar = Paragraph::new(text)
            .block(Block::default())
            .alignment(Alignment::Center)
            .style(Style::default().fg(color));
        f.render_widget(status_bar, area);
    }
}
