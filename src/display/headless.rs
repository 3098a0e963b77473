// SPDX-License-Identifier: MIT
use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::{AnnotatedFrame, Display, Overlay, RecordingStatus, StreamStatus};
use crate::capture::SessionState;

/// Prints a one-line status every `interval` instead of drawing frames.
/// A change of session state is printed straight away.
pub struct HeadlessDisplay<W> {
    out: W,
    interval: Duration,
    last_status: Option<Instant>,
    last_state: Option<SessionState>,
}

impl<W: Write> HeadlessDisplay<W> {
    pub fn new(out: W, interval: Duration) -> Self {
        Self {
            out,
            interval,
            last_status: None,
            last_state: None,
        }
    }

    fn due(&self, now: Instant, state: SessionState) -> bool {
        self.last_state != Some(state)
            || self
                .last_status
                .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    fn print(&mut self, line: &str, state: SessionState) -> Result<()> {
        let now = Instant::now();
        if !self.due(now, state) {
            return Ok(());
        }
        self.last_status = Some(now);
        self.last_state = Some(state);
        writeln!(self.out, "{line}").context("failed to write status")
    }
}

/// `size` is the frame dimensions when a frame was read this tick; without
/// one the session state is reported instead.
fn status_line(overlay: &Overlay, status: &StreamStatus<'_>, size: Option<(u32, u32)>) -> String {
    let [frames, fps, bad] = overlay.lines();
    let recording = match status.recording {
        RecordingStatus::Off => String::new(),
        RecordingStatus::Active { path, frames } => {
            format!(", recorded {frames} to {}", path.display())
        }
        RecordingStatus::Disabled => ", recording disabled".to_string(),
    };
    let detail = match size {
        Some((width, height)) => format!("{frames}, {fps}, {bad}, {width}x{height}"),
        None => format!("{}, {frames}, {fps}, {bad}", status.state),
    };
    format!(
        "[{:.0}s] {}: {detail}{recording}",
        status.elapsed.as_secs_f64(),
        status.source,
    )
}

impl<W: Write> Display for HeadlessDisplay<W> {
    fn show(&mut self, annotated: &AnnotatedFrame<'_>) -> Result<()> {
        let size = (annotated.frame.width, annotated.frame.height);
        let line = status_line(&annotated.overlay, &annotated.status, Some(size));
        self.print(&line, annotated.status.state)
    }

    fn show_status(&mut self, overlay: Overlay, status: &StreamStatus<'_>) -> Result<()> {
        self.print(&status_line(&overlay, status, None), status.state)
    }

    fn cancel_requested(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().context("failed to flush status output")
    }
}
