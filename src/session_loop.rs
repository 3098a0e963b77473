// SPDX-License-Identifier: MIT
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::backend::{Frame, StreamBackend};
use crate::capture::{CaptureSession, Pause, ReadOutcome};
use crate::display::{AnnotatedFrame, Display, Overlay, RecordingStatus, StreamStatus};
use crate::error::ProbeError;
use crate::metrics::{MetricsTracker, SessionSummary};
use crate::recording::Recorder;

pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_millis(200);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopOptions {
    /// Stop once this much time has passed. `None` runs until cancelled.
    pub duration: Option<Duration>,
    /// Sleep after a reconnect whose first read failed.
    pub retry_pause: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            duration: None,
            retry_pause: DEFAULT_RETRY_PAUSE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecorderOptions {
    pub path: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    DurationReached,
    Unrecoverable,
    /// The display could not show a frame or poll for input.
    DisplayFailed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cancelled => "cancelled",
            Self::DurationReached => "duration reached",
            Self::Unrecoverable => "unrecoverable stream failure",
            Self::DisplayFailed => "display failed",
        })
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: SessionSummary,
    pub stop_reason: StopReason,
    /// Frames written by the recorder, if it was running at the end.
    pub frames_recorded: Option<u64>,
    /// Set when `stop_reason` is [`StopReason::DisplayFailed`].
    pub display_error: Option<anyhow::Error>,
}

enum RecorderSlot {
    Off,
    Active(Recorder),
    Disabled,
}

impl RecorderSlot {
    fn status(&self) -> RecordingStatus<'_> {
        match self {
            Self::Off => RecordingStatus::Off,
            Self::Active(recorder) => RecordingStatus::Active {
                path: recorder.path(),
                frames: recorder.frames_written(),
            },
            Self::Disabled => RecordingStatus::Disabled,
        }
    }
}

/// Drives one capture session: reads, counts, records, displays, and
/// decides when to stop.
pub struct SessionLoop<B, P> {
    session: CaptureSession<B, P>,
    metrics: MetricsTracker,
    recorder: RecorderSlot,
    options: LoopOptions,
}

impl<B: StreamBackend, P: Pause> SessionLoop<B, P> {
    #[must_use]
    pub fn new(session: CaptureSession<B, P>, options: LoopOptions) -> Self {
        Self {
            session,
            metrics: MetricsTracker::new(Instant::now()),
            recorder: RecorderSlot::Off,
            options,
        }
    }

    /// Buffers the first frame and, if asked to, starts the recorder with
    /// parameters taken from it. A recorder that cannot start is disabled
    /// and the session carries on without it.
    pub fn prime(&mut self, recorder: Option<&RecorderOptions>) {
        self.session.prefetch();

        let Some(options) = recorder else {
            return;
        };
        let nominal_fps = self.session.nominal_fps().unwrap_or(0.0);
        match Recorder::start(
            &options.path,
            self.session.source(),
            nominal_fps,
            self.session.peek(),
        ) {
            Ok(recorder) => self.recorder = RecorderSlot::Active(recorder),
            Err(err) => {
                log::warn!("{err}; continuing without recording");
                self.recorder = RecorderSlot::Disabled;
            }
        }
    }

    /// Runs until cancelled, out of time, the stream is lost for good, or
    /// the display fails. The recorder and the stream handle are released
    /// and the run summarized on every path out.
    pub fn run(&mut self, display: &mut dyn Display, shutdown: &AtomicBool) -> RunReport {
        let started = Instant::now();
        self.metrics = MetricsTracker::new(started);

        let outcome = self.tick_until_stopped(display, shutdown, started);
        let elapsed = started.elapsed();
        let frames_recorded = self.finalize();

        let (stop_reason, display_error) = match outcome {
            Ok(reason) => (reason, None),
            Err(err) => {
                log::error!("display failed: {err:#}");
                (StopReason::DisplayFailed, Some(err))
            }
        };
        log::info!("session stopped: {stop_reason}");
        RunReport {
            summary: self.metrics.summarize(elapsed),
            stop_reason,
            frames_recorded,
            display_error,
        }
    }

    #[cfg(test)]
    pub(crate) fn recording_path(&self) -> Option<&std::path::Path> {
        match &self.recorder {
            RecorderSlot::Active(recorder) => Some(recorder.path()),
            RecorderSlot::Off | RecorderSlot::Disabled => None,
        }
    }

    /// Why the stream was given up on, if it was.
    #[must_use]
    pub fn exhaustion(&self) -> Option<&ProbeError> {
        self.session.exhaustion()
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> &CaptureSession<B, P> {
        &self.session
    }

    fn tick_until_stopped(
        &mut self,
        display: &mut dyn Display,
        shutdown: &AtomicBool,
        started: Instant,
    ) -> Result<StopReason> {
        loop {
            let outcome = self.session.read_next();
            if self.session.last_read_failed() {
                self.metrics.on_bad_read();
            }

            match outcome {
                ReadOutcome::Exhausted => {
                    if let Err(err) = display.show_status(self.overlay(), &self.status(started)) {
                        log::warn!("could not show final state: {err:#}");
                    }
                    return Ok(StopReason::Unrecoverable);
                }
                ReadOutcome::Retrying => {
                    display.show_status(self.overlay(), &self.status(started))?;
                    self.session.pause(self.options.retry_pause);
                }
                ReadOutcome::Frame(frame) => {
                    let fps_updated = self.metrics.on_frame(Instant::now());
                    self.record(&frame);

                    let annotated = AnnotatedFrame {
                        frame: &frame,
                        overlay: self.overlay(),
                        fps_updated,
                        status: self.status(started),
                    };
                    display.show(&annotated)?;
                    drop(frame);

                    self.session.prefetch();
                }
            }

            if shutdown.load(Ordering::Relaxed) || display.cancel_requested()? {
                return Ok(StopReason::Cancelled);
            }
            if let Some(limit) = self.options.duration
                && started.elapsed() >= limit
            {
                return Ok(StopReason::DurationReached);
            }
        }
    }

    fn overlay(&self) -> Overlay {
        Overlay {
            frames: self.metrics.frame_count(),
            realtime_fps: self.metrics.realtime_fps(),
            bad_reads: self.metrics.bad_reads(),
        }
    }

    fn status(&self, started: Instant) -> StreamStatus<'_> {
        StreamStatus {
            source: self.session.source(),
            backend: self.session.backend_name(),
            state: self.session.state(),
            nominal_fps: self.session.nominal_fps().unwrap_or(0.0),
            reconnects: self.session.reconnects(),
            elapsed: started.elapsed(),
            recording: self.recorder.status(),
        }
    }

    fn record(&mut self, frame: &Frame) {
        let RecorderSlot::Active(recorder) = &mut self.recorder else {
            return;
        };
        if let Err(err) = recorder.record(frame) {
            log::error!("{err}; recording stopped");
            if let RecorderSlot::Active(recorder) =
                std::mem::replace(&mut self.recorder, RecorderSlot::Disabled)
            {
                let path = recorder.path().to_path_buf();
                if let Err(err) = recorder.finish() {
                    log::warn!("could not finalize {}: {err}", path.display());
                }
            }
        }
    }

    fn finalize(&mut self) -> Option<u64> {
        let frames = match std::mem::replace(&mut self.recorder, RecorderSlot::Off) {
            RecorderSlot::Active(recorder) => {
                let path = recorder.path().to_path_buf();
                match recorder.finish() {
                    Ok(frames) => Some(frames),
                    Err(err) => {
                        log::error!("could not finalize {}: {err}", path.display());
                        None
                    }
                }
            }
            RecorderSlot::Disabled => {
                self.recorder = RecorderSlot::Disabled;
                None
            }
            RecorderSlot::Off => None,
        };
        self.session.close();
        frames
    }
}
