// SPDX-License-Identifier: MIT
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::display::tui::app::{App, RecorderState};
use crate::display::tui::theme::Theme;

pub fn render(frame: &mut ratatui::Frame, area: Rect, app: &App, theme: &Theme) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let version = env!("CARGO_PKG_VERSION");
    let (backend, state) = app.latest.as_ref().map_or(("-", "waiting".to_string()), |s| {
        (s.backend.unwrap_or("-"), s.state.to_string())
    });

    let text = format!(
        "streamprobe v{version} | {} | via {backend} | {state} | q to quit",
        app.source
    );

    let recording = matches!(
        app.latest.as_ref().map(|s| s.recorder),
        Some(RecorderState::Active { .. })
    );
    let mut spans = Vec::with_capacity(2);
    let mut width = area.width as usize;
    if recording {
        let marker = " \u{25CF} REC ";
        width = width.saturating_sub(marker.chars().count());
        spans.push(Span::styled(marker, theme.recording_indicator));
    }
    spans.insert(0, Span::styled(format!("{text:<width$}"), theme.status_bar));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
