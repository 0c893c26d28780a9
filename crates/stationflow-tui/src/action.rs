//! Key bindings. Every key press becomes at most one `Action`; the app
//! applies actions to the shell.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Where keys go right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Map,
    List,
    /// Typing into a text field (search, report, add-station form).
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    /// Pan by whole terminal cells.
    Pan(i16, i16),
    Zoom(i8),
    ToggleFocus,
    /// Enter: select what is under the crosshair or highlighted, or drop
    /// the pick location.
    Activate,
    ListMove(i32),
    /// Esc: close the popup, stop picking, or leave the list.
    Dismiss,
    ToggleRoute,
    StartPicking,
    CycleFilter,
    OpenSearch,
    Report,

    // ── Text input ───────────────────────────────────────────────────
    Type(char),
    Backspace,
    /// Tab inside a form.
    NextField,
    /// Left/right inside a form's choice field.
    Cycle(i8),
    Submit,
    Cancel,
}

pub fn map_key(mode: Mode, key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(Action::Quit);
    }

    if mode == Mode::Input {
        return match key.code {
            KeyCode::Esc => Some(Action::Cancel),
            KeyCode::Enter => Some(Action::Submit),
            KeyCode::Backspace => Some(Action::Backspace),
            KeyCode::Tab => Some(Action::NextField),
            KeyCode::Left => Some(Action::Cycle(-1)),
            KeyCode::Right => Some(Action::Cycle(1)),
            KeyCode::Char(c) => Some(Action::Type(c)),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Tab => Action::ToggleFocus,
        KeyCode::Enter => Action::Activate,
        KeyCode::Esc => Action::Dismiss,
        KeyCode::Char('r') => Action::ToggleRoute,
        KeyCode::Char('p') => Action::StartPicking,
        KeyCode::Char('f') => Action::CycleFilter,
        KeyCode::Char('/') => Action::OpenSearch,
        KeyCode::Char('R') => Action::Report,
        KeyCode::Char('+' | '=') => Action::Zoom(1),
        KeyCode::Char('-') => Action::Zoom(-1),

        KeyCode::Up | KeyCode::Char('k') if mode == Mode::List => Action::ListMove(-1),
        KeyCode::Down | KeyCode::Char('j') if mode == Mode::List => Action::ListMove(1),
        KeyCode::PageUp if mode == Mode::List => Action::ListMove(-10),
        KeyCode::PageDown if mode == Mode::List => Action::ListMove(10),

        KeyCode::Left | KeyCode::Char('h') => Action::Pan(-1, 0),
        KeyCode::Right | KeyCode::Char('l') => Action::Pan(1, 0),
        KeyCode::Up | KeyCode::Char('k') => Action::Pan(0, -1),
        KeyCode::Down | KeyCode::Char('j') => Action::Pan(0, 1),
        _ => return None,
    };
    Some(action)
}
