// SPDX-License-Identifier: MIT
use std::path::Path;

use num_format::{Locale, ToFormattedString};
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::display::tui::app::{RecorderState, Snapshot};
use crate::display::tui::theme::Theme;

fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

fn recorder_line(recorder: RecorderState, path: Option<&Path>) -> String {
    match (recorder, path) {
        (RecorderState::Active { frames }, Some(path)) => format!(
            "Recording: {} frames to {}",
            frames.to_formatted_string(&Locale::en),
            path.display()
        ),
        (RecorderState::Active { frames }, None) => format!(
            "Recording: {} frames",
            frames.to_formatted_string(&Locale::en)
        ),
        (RecorderState::Disabled, _) => "Recording: disabled".to_string(),
        (RecorderState::Off, _) => "Recording: off".to_string(),
    }
}

pub fn render(
    frame: &mut ratatui::Frame,
    area: Rect,
    snapshot: &Snapshot,
    recording_path: Option<&Path>,
    theme: &Theme,
) {
    if area.height < 2 || area.width < 10 {
        return;
    }

    let overlay = &snapshot.overlay;
    let bad_style = if overlay.bad_reads == 0 {
        theme.healthy
    } else {
        theme.degraded
    };
    let nominal = if snapshot.nominal_fps > 0.0 {
        format!("{:.2}", snapshot.nominal_fps)
    } else {
        "unknown".to_string()
    };

    let lines = vec![
        Line::from(format!(
            "Frames: {}",
            overlay.frames.to_formatted_string(&Locale::en)
        )),
        Line::from(format!("Realtime FPS: {:.2}", overlay.realtime_fps)),
        Line::from(Span::styled(
            format!(
                "Bad reads: {}",
                overlay.bad_reads.to_formatted_string(&Locale::en)
            ),
            bad_style,
        )),
        Line::from(""),
        Line::from(format!(
            "Frame size: {}x{} ({} bytes)",
            snapshot.width,
            snapshot.height,
            snapshot.frame_bytes.to_formatted_string(&Locale::en)
        )),
        Line::from(format!("Nominal FPS: {nominal}")),
        Line::from(vec![
            Span::raw("State: "),
            Span::styled(snapshot.state.to_string(), theme.state(snapshot.state)),
            Span::raw(format!("  Reconnects: {}", snapshot.reconnects)),
        ]),
        Line::from(format!(
            "Elapsed: {}",
            format_elapsed(snapshot.elapsed.as_secs())
        )),
        Line::from(recorder_line(snapshot.recorder, recording_path)),
    ];

    frame.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_clock_formatted() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(3725), "01:02:05");
    }

    #[test]
    fn recorder_line_uses_grouped_counts() {
        let line = recorder_line(
            RecorderState::Active { frames: 12_345 },
            Some(Path::new("out.sprb")),
        );
        assert_eq!(line, "Recording: 12,345 frames to out.sprb");
        assert_eq!(
            recorder_line(RecorderState::Disabled, None),
            "Recording: disabled"
        );
    }
}
