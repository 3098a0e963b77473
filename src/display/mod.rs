// SPDX-License-Identifier: MIT
pub mod headless;
pub mod tui;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::backend::Frame;
use crate::capture::SessionState;

/// The three counters drawn over every displayed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Overlay {
    pub frames: u64,
    pub realtime_fps: f64,
    pub bad_reads: u64,
}

impl Overlay {
    #[must_use]
    pub fn lines(&self) -> [String; 3] {
        [
            format!("Frames: {}", self.frames),
            format!("Realtime FPS: {:.2}", self.realtime_fps),
            format!("Bad reads: {}", self.bad_reads),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingStatus<'a> {
    Off,
    Active { path: &'a Path, frames: u64 },
    Disabled,
}

#[derive(Clone, Copy, Debug)]
pub struct StreamStatus<'a> {
    pub source: &'a str,
    pub backend: Option<&'static str>,
    pub state: SessionState,
    /// Rate advertised by the backend; 0 when unknown.
    pub nominal_fps: f64,
    pub reconnects: u32,
    pub elapsed: Duration,
    pub recording: RecordingStatus<'a>,
}

/// A frame on its way to the screen, with the counters to draw over it.
pub struct AnnotatedFrame<'a> {
    pub frame: &'a Frame,
    pub overlay: Overlay,
    /// Set when this frame closed a rate window.
    pub fps_updated: bool,
    pub status: StreamStatus<'a>,
}

/// Where annotated frames are shown.
pub trait Display {
    /// # Errors
    ///
    /// Returns an error if the output device fails.
    fn show(&mut self, annotated: &AnnotatedFrame<'_>) -> Result<()>;

    /// Called on ticks that produced no frame (reconnecting, gave up) so the
    /// stream state stays visible while frames are not arriving.
    ///
    /// # Errors
    ///
    /// Returns an error if the output device fails.
    fn show_status(&mut self, _overlay: Overlay, _status: &StreamStatus<'_>) -> Result<()> {
        Ok(())
    }

    /// Polled once per tick; must not block.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be polled.
    fn cancel_requested(&mut self) -> Result<bool>;

    /// Releases the output device.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be restored.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_lines_match_expected_text() {
        let overlay = Overlay {
            frames: 120,
            realtime_fps: 29.456,
            bad_reads: 3,
        };
        assert_eq!(
            overlay.lines(),
            [
                "Frames: 120".to_string(),
                "Realtime FPS: 29.46".to_string(),
                "Bad reads: 3".to_string(),
            ]
        );
    }
}
