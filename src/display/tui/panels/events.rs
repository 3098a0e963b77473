// SPDX-License-Identifier: MIT
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::display::tui::theme::Theme;

pub fn render(frame: &mut ratatui::Frame, area: Rect, events: &[String], theme: &Theme) {
    if events.is_empty() {
        frame.render_widget(Paragraph::new("No events"), area);
        return;
    }

    let visible = events.len().min(area.height as usize);
    let lines: Vec<Line> = events[events.len() - visible..]
        .iter()
        .map(|event| {
            let style = if event.contains("ERROR") {
                theme.event_error
            } else if event.contains("WARN") {
                theme.event_warn
            } else {
                ratatui::style::Style::default()
            };
            Line::from(Span::styled(event.as_str(), style))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}
