// SPDX-License-Identifier: MIT
use ratatui::style::{Color, Modifier, Style};

use crate::capture::SessionState;

pub struct Theme {
    pub healthy: Style,
    pub degraded: Style,
    pub failed: Style,
    pub chart: Style,
    pub border_normal: Style,
    pub border_selected: Style,
    pub title: Style,
    pub status_bar: Style,
    pub recording_indicator: Style,
    pub event_warn: Style,
    pub event_error: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            healthy: Style::default().fg(Color::Green),
            degraded: Style::default().fg(Color::Yellow),
            failed: Style::default().fg(Color::Red),
            chart: Style::default().fg(Color::Cyan),
            border_normal: Style::default().fg(Color::White),
            border_selected: Style::default().fg(Color::Cyan),
            title: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            status_bar: Style::default().fg(Color::Black).bg(Color::White),
            recording_indicator: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            event_warn: Style::default().fg(Color::Yellow),
            event_error: Style::default().fg(Color::Red),
        }
    }
}

impl Theme {
    #[must_use]
    pub fn state(&self, state: SessionState) -> Style {
        match state {
            SessionState::Open => self.healthy,
            SessionState::Reconnecting | SessionState::Closed => self.degraded,
            SessionState::Exhausted => self.failed,
        }
    }
}

pub const BLOCK_CHARS: [char; 9] = [
    ' ', '\u{2581}', '\u{2582}', '\u{2583}', '\u{2584}', '\u{2585}', '\u{2586}', '\u{2587}',
    '\u{2588}',
];
pub const SELECTED_MARKER: [char; 2] = ['\u{2610}', '\u{2611}'];
pub const COLLAPSED_MARKER: [char; 2] = ['\u{25BC}', '\u{25BA}'];
