// SPDX-License-Identifier: MIT
//! Deterministic test-pattern source, `synthetic:?fps=30&width=640&...`.
//!
//! Recognised parameters:
//! - `fps`: pacing of reads, 0 for unpaced (default 30)
//! - `width`, `height`: frame size (default 320x240, overridden by the hint)
//! - `frames`: frames per open before end of stream (default unlimited)
//! - `fail_after`, `fail_count`: after `fail_after` frames, the next
//!   `fail_count` reads fail (default 1)
//! - `refuse_opens`: the first N opens of this backend fail

use std::thread;
use std::time::{Duration, Instant};

use super::{Frame, OpenHint, StreamHandle};
use crate::error::StreamError;

#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticConfig {
    pub fps: f64,
    /// Time between reads; `None` when unpaced.
    pub period: Option<Duration>,
    pub width: u32,
    pub height: u32,
    pub frames: Option<u64>,
    pub fail_after: Option<u64>,
    pub fail_count: u64,
    pub refuse_opens: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            period: Some(Duration::from_secs(1) / 30),
            width: 320,
            height: 240,
            frames: None,
            fail_after: None,
            fail_count: 1,
            refuse_opens: 0,
        }
    }
}

impl SyntheticConfig {
    /// Parses `key=value` pairs separated by `&`, with an optional leading `?`.
    ///
    /// # Errors
    ///
    /// Returns an error on unknown keys or unparsable values.
    pub fn parse(query: &str) -> Result<Self, StreamError> {
        let mut config = Self::default();
        let query = query.trim_start_matches('?');

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| StreamError::Format(format!("expected key=value, got '{pair}'")))?;
            let bad = || StreamError::Format(format!("invalid value for {key}: '{value}'"));
            match key {
                "fps" => {
                    let fps: f64 = value.parse().map_err(|_| bad())?;
                    if !fps.is_finite() || fps < 0.0 {
                        return Err(StreamError::Format(format!("fps must be >= 0, got {value}")));
                    }
                    config.period = if fps > 0.0 {
                        let period = Duration::try_from_secs_f64(1.0 / fps).map_err(|_| {
                            StreamError::Format(format!("fps {value} is too low to pace"))
                        })?;
                        Some(period)
                    } else {
                        None
                    };
                    config.fps = fps;
                }
                "width" => config.width = value.parse().map_err(|_| bad())?,
                "height" => config.height = value.parse().map_err(|_| bad())?,
                "frames" => config.frames = Some(value.parse().map_err(|_| bad())?),
                "fail_after" => config.fail_after = Some(value.parse().map_err(|_| bad())?),
                "fail_count" => config.fail_count = value.parse().map_err(|_| bad())?,
                "refuse_opens" => config.refuse_opens = value.parse().map_err(|_| bad())?,
                other => {
                    return Err(StreamError::Format(format!(
                        "unknown synthetic parameter '{other}'"
                    )));
                }
            }
        }

        Ok(config)
    }
}

pub struct SyntheticHandle {
    config: SyntheticConfig,
    produced: u64,
    failures_left: u64,
    next_due: Instant,
    closed: bool,
}

impl SyntheticHandle {
    /// Opens a generator; `open_count` is the 1-based number of opens so far
    /// on the owning backend, used by `refuse_opens`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is malformed or the open is refused.
    pub fn open(query: &str, hint: &OpenHint, open_count: u32) -> Result<Self, StreamError> {
        let mut config = SyntheticConfig::parse(query)?;
        if open_count <= config.refuse_opens {
            return Err(StreamError::NotOpened(format!(
                "synthetic:{query} (refused open {open_count}/{})",
                config.refuse_opens
            )));
        }
        if let Some(w) = hint.width {
            config.width = w;
        }
        if let Some(h) = hint.height {
            config.height = h;
        }
        Ok(Self::with_config(config))
    }

    #[must_use]
    pub fn with_config(config: SyntheticConfig) -> Self {
        Self {
            failures_left: config.fail_count,
            config,
            produced: 0,
            next_due: Instant::now(),
            closed: false,
        }
    }

    fn pace(&mut self) {
        let Some(period) = self.config.period else {
            return;
        };
        let now = Instant::now();
        if self.next_due > now {
            thread::sleep(self.next_due - now);
        }
        self.next_due = self.next_due.max(now) + period;
    }

    fn pattern(&self) -> Vec<u8> {
        let (w, h) = (self.config.width as usize, self.config.height as usize);
        #[allow(clippy::cast_possible_truncation)]
        let shift = self.produced as usize;
        (0..w * h)
            .map(|i| {
                let (x, y) = (i % w.max(1), i / w.max(1));
                #[allow(clippy::cast_possible_truncation)]
                let v = (x + y + shift) as u8;
                v
            })
            .collect()
    }
}

impl StreamHandle for SyntheticHandle {
    fn read_frame(&mut self) -> Result<Frame, StreamError> {
        if self.closed {
            return Err(StreamError::Read("handle is closed".into()));
        }
        if self.config.frames.is_some_and(|limit| self.produced >= limit) {
            return Err(StreamError::EndOfStream);
        }
        if self.config.fail_after.is_some_and(|n| self.produced >= n) && self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(StreamError::Read("injected read failure".into()));
        }

        self.pace();
        let frame = Frame {
            data: self.pattern(),
            width: self.config.width,
            height: self.config.height,
            captured_at: Instant::now(),
            sequence: self.produced,
        };
        self.produced += 1;
        Ok(frame)
    }

    fn nominal_fps(&self) -> f64 {
        self.config.fps
    }

    fn backend_name(&self) -> &'static str {
        "synthetic"
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
