// SPDX-License-Identifier: MIT
//! Plays back a file written by the recorder, as fast as it can be read.

use std::path::Path;
use std::time::Instant;

use super::{Frame, StreamHandle};
use crate::error::StreamError;
use crate::recording::reader::RecordingReader;

/// True when `path` starts with a readable recording header.
#[must_use]
pub fn is_recording(path: &Path) -> bool {
    RecordingReader::open(path).is_ok()
}

pub struct ReplayHandle {
    reader: Option<RecordingReader>,
    fps: f64,
    sequence: u64,
}

impl ReplayHandle {
    /// # Errors
    ///
    /// Returns an error if the path does not exist or is not a recording.
    pub fn open(path: &Path) -> Result<Self, StreamError> {
        if !path.is_file() {
            return Err(StreamError::NotOpened(path.display().to_string()));
        }
        let reader =
            RecordingReader::open(path).map_err(|e| StreamError::Format(format!("{e:#}")))?;
        let fps = reader.info().fps;
        Ok(Self {
            reader: Some(reader),
            fps,
            sequence: 0,
        })
    }
}

impl StreamHandle for ReplayHandle {
    fn read_frame(&mut self) -> Result<Frame, StreamError> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| StreamError::Read("handle is closed".into()))?;
        let record = reader
            .next_frame()
            .map_err(|e| StreamError::Read(format!("{e:#}")))?
            .ok_or(StreamError::EndOfStream)?;

        let frame = Frame {
            data: record.data,
            width: record.width,
            height: record.height,
            captured_at: Instant::now(),
            sequence: self.sequence,
        };
        self.sequence += 1;
        Ok(frame)
    }

    fn nominal_fps(&self) -> f64 {
        self.fps
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }

    fn close(&mut self) {
        self.reader = None;
    }
}
