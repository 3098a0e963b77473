// SPDX-License-Identifier: MIT
use crossterm::event::{KeyCode, KeyModifiers};

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    PanelUp,
    PanelDown,
    ToggleCollapse,
    None,
}

pub fn handle_key(key: KeyCode, modifiers: KeyModifiers) -> Action {
    match key {
        // Raw mode swallows SIGINT, so Ctrl-C arrives as a key.
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Up => Action::PanelUp,
        KeyCode::Down => Action::PanelDown,
        KeyCode::Right | KeyCode::Enter => Action::ToggleCollapse,
        _ => Action::None,
    }
}
