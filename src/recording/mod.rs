// SPDX-License-Identifier: MIT
pub mod format;
pub mod reader;
pub mod writer;

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use crate::backend::Frame;
use crate::error::ProbeError;
use format::{FALLBACK_FPS, FrameRecordRef, StreamInfo};
use writer::RecordingWriter;

/// Forwards frames to a recording file whose parameters are taken from the
/// first frame it is started with.
pub struct Recorder {
    writer: RecordingWriter,
    path: PathBuf,
    info: StreamInfo,
    origin: Instant,
    frames_written: u64,
    size_mismatch_reported: bool,
}

impl Recorder {
    /// Creates the sink. `first` only fixes the parameters; it is written
    /// when it is passed to [`Recorder::record`] like any other frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::SinkUnavailable`] when there is no frame to
    /// infer parameters from or the file cannot be created.
    pub fn start(
        path: &Path,
        source: &str,
        nominal_fps: f64,
        first: Option<&Frame>,
    ) -> Result<Self, ProbeError> {
        let first = first.ok_or_else(|| {
            ProbeError::SinkUnavailable("first frame could not be read".to_string())
        })?;

        let fps = if nominal_fps.is_finite() && nominal_fps > 0.0 {
            nominal_fps
        } else {
            FALLBACK_FPS
        };
        let info = StreamInfo {
            source: source.to_string(),
            fps,
            width: first.width,
            height: first.height,
            recording_start: SystemTime::now(),
        };

        let writer = RecordingWriter::create(path, &info)
            .map_err(|e| ProbeError::SinkUnavailable(format!("{e:#}")))?;

        log::info!(
            "recording to {} (fps={fps}, size={}x{})",
            path.display(),
            info.width,
            info.height
        );

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            info,
            origin: first.captured_at,
            frames_written: 0,
            size_mismatch_reported: false,
        })
    }

    /// Appends one frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::SinkUnavailable`] if the write fails; the
    /// recorder should not be used afterwards.
    pub fn record(&mut self, frame: &Frame) -> Result<(), ProbeError> {
        if (frame.width, frame.height) != (self.info.width, self.info.height)
            && !self.size_mismatch_reported
        {
            log::warn!(
                "frame size changed to {}x{}; recording keeps its {}x{} parameters",
                frame.width,
                frame.height,
                self.info.width,
                self.info.height
            );
            self.size_mismatch_reported = true;
        }

        #[allow(clippy::cast_possible_truncation)]
        let offset_ns = frame.captured_at.saturating_duration_since(self.origin).as_nanos() as u64;
        let record = FrameRecordRef {
            offset_ns,
            width: frame.width,
            height: frame.height,
            data: &frame.data,
        };
        self.writer
            .write_frame(&record)
            .map_err(|e| ProbeError::SinkUnavailable(format!("{e:#}")))?;
        self.frames_written += 1;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Closes the file, returning the number of frames written.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::SinkUnavailable`] if the file cannot be finalized.
    pub fn finish(self) -> Result<u64, ProbeError> {
        let frames = self.frames_written;
        self.writer
            .finish()
            .map_err(|e| ProbeError::SinkUnavailable(format!("{e:#}")))?;
        log::info!("wrote {frames} frames to {}", self.path.display());
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::recording::reader::RecordingReader;

    fn make_frame(sequence: u64, captured_at: Instant, width: u32) -> Frame {
        Frame {
            data: vec![u8::try_from(sequence % 256).unwrap(); (width * 2) as usize],
            width,
            height: 2,
            captured_at,
            sequence,
        }
    }

    #[test]
    fn recorder_writes_frames_readable_by_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.sprb");
        let t0 = Instant::now();
        let frames: Vec<Frame> = (0..4)
            .map(|i| make_frame(i, t0 + Duration::from_millis(40 * i), 3))
            .collect();

        let mut recorder = Recorder::start(&path, "synthetic:", 0.0, Some(&frames[0])).unwrap();
        for frame in &frames {
            recorder.record(frame).unwrap();
        }
        assert_eq!(recorder.frames_written(), 4);
        assert_eq!(recorder.finish().unwrap(), 4);

        let mut reader = RecordingReader::open(&path).unwrap();
        assert_eq!(reader.info().source, "synthetic:");
        assert!((reader.info().fps - FALLBACK_FPS).abs() < f64::EPSILON);
        assert_eq!((reader.info().width, reader.info().height), (3, 2));

        let mut count = 0;
        while let Some(record) = reader.next_frame().unwrap() {
            assert_eq!(record.offset_ns, 40_000_000 * count);
            assert_eq!(record.data, frames[usize::try_from(count).unwrap()].data);
            count += 1;
        }
        assert_eq!(count, 4);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn parameters_stay_fixed_when_frame_size_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resized.sprb");
        let t0 = Instant::now();

        let first = make_frame(0, t0, 4);
        let mut recorder = Recorder::start(&path, "cam", 30.0, Some(&first)).unwrap();
        recorder.record(&first).unwrap();
        recorder.record(&make_frame(1, t0, 8)).unwrap();
        recorder.finish().unwrap();

        let mut reader = RecordingReader::open(&path).unwrap();
        assert_eq!(reader.info().width, 4);
        assert!((reader.info().fps - 30.0).abs() < f64::EPSILON);
        reader.next_frame().unwrap();
        let resized = reader.next_frame().unwrap().expect("second frame");
        assert_eq!(resized.width, 8);
    }

    #[test]
    fn missing_first_frame_makes_sink_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.sprb");
        let result = Recorder::start(&path, "cam", 30.0, None);
        assert!(matches!(result, Err(ProbeError::SinkUnavailable(_))));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_path_makes_sink_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("out.sprb");
        let frame = make_frame(0, Instant::now(), 2);
        let result = Recorder::start(&path, "cam", 30.0, Some(&frame));
        assert!(matches!(result, Err(ProbeError::SinkUnavailable(_))));
    }

    #[test]
    fn reader_rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.sprb");
        std::fs::write(&path, b"not a recording").unwrap();
        assert!(RecordingReader::open(&path).is_err());
    }
}
