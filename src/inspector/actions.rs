use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Navigation
    SelectNext,
    SelectPrevious,

    // Host lifecycle
    ToggleVisible,
    ReloadAll,
    SaveSnapshot,
    RestoreSnapshot,

    // Panel operations
    InvalidateSelected,
    ResetSelected,
    ToggleSelected,
    LoadAdhoc,

    // App control
    Quit,
    None,
}

impl Action {
    /// Map a key press to an action
    pub fn from_key(key: KeyEvent) -> Self {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('j') | KeyCode::Down => Action::SelectNext,
            KeyCode::Char('k') | KeyCode::Up => Action::SelectPrevious,
            KeyCode::Char('v') => Action::ToggleVisible,
            KeyCode::Char('r') => Action::ReloadAll,
            KeyCode::Char('s') => Action::SaveSnapshot,
            KeyCode::Char('l') => Action::RestoreSnapshot,
            KeyCode::Char('i') => Action::InvalidateSelected,
            KeyCode::Char('x') => Action::ResetSelected,
            KeyCode::Char(' ') => Action::ToggleSelected,
            KeyCode::Char('a') => Action::LoadAdhoc,
            _ => Action::None,
        }
    }
}
