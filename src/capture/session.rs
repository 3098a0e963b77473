// SPDX-License-Identifier: MIT
use std::fmt;
use std::time::Duration;

use super::reconnect::{Pause, ReconnectPolicy};
use crate::backend::{Frame, OpenHint, StreamBackend, StreamHandle};
use crate::error::ProbeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    Reconnecting,
    /// Terminal: reconnection ran out of attempts.
    Exhausted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Reconnecting => "reconnecting",
            Self::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

pub enum ReadOutcome {
    Frame(Frame),
    /// Reconnected, but the first read on the new handle failed. Poll again
    /// after pacing.
    Retrying,
    Exhausted,
}

/// Owns at most one open handle and a one-frame look-ahead slot.
pub struct CaptureSession<B, P> {
    backend: B,
    pause: P,
    source: String,
    hint: OpenHint,
    policy: ReconnectPolicy,
    handle: Option<Box<dyn StreamHandle>>,
    lookahead: Option<Frame>,
    state: SessionState,
    last_read_failed: bool,
    reconnects: u32,
    exhaustion: Option<ProbeError>,
}

impl<B: StreamBackend, P: Pause> CaptureSession<B, P> {
    #[must_use]
    pub fn new(backend: B, pause: P, source: &str, policy: ReconnectPolicy, hint: OpenHint) -> Self {
        Self {
            backend,
            pause,
            source: source.to_string(),
            hint,
            policy,
            handle: None,
            lookahead: None,
            state: SessionState::Closed,
            last_read_failed: false,
            reconnects: 0,
            exhaustion: None,
        }
    }

    /// Acquires the initial handle through the reconnect policy.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::ReconnectExhausted`] if no attempt succeeded; the
    /// session is then permanently exhausted.
    pub fn open(&mut self) -> Result<(), ProbeError> {
        if self.state == SessionState::Exhausted {
            return Err(self.exhausted_error());
        }
        self.release_handle();
        match self.acquire() {
            Ok(handle) => {
                log::info!("opened {} via {}", self.source, handle.backend_name());
                self.handle = Some(handle);
                self.state = SessionState::Open;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Exhausted;
                let reported = self.exhausted_error_from(&err);
                self.exhaustion = Some(err);
                Err(reported)
            }
        }
    }

    /// Returns the look-ahead frame if one is buffered, otherwise reads
    /// from the handle, reconnecting on failure.
    pub fn read_next(&mut self) -> ReadOutcome {
        self.last_read_failed = false;

        if let Some(frame) = self.lookahead.take() {
            return ReadOutcome::Frame(frame);
        }

        match self.state {
            SessionState::Exhausted => return ReadOutcome::Exhausted,
            SessionState::Closed => {
                if self.open().is_err() {
                    return ReadOutcome::Exhausted;
                }
            }
            SessionState::Open | SessionState::Reconnecting => {}
        }

        let result = match self.handle.as_mut() {
            Some(handle) => handle.read_frame(),
            None => return self.reconnect(),
        };

        match result {
            Ok(frame) => {
                self.state = SessionState::Open;
                ReadOutcome::Frame(frame)
            }
            Err(cause) => {
                self.last_read_failed = true;
                let failure = ProbeError::ReadFailure {
                    stream: self.source.clone(),
                    cause,
                };
                log::warn!("{failure}; reconnecting");
                self.reconnect()
            }
        }
    }

    /// Reads one extra frame into the look-ahead slot, replacing whatever
    /// it held. A failed read leaves the slot empty.
    pub fn prefetch(&mut self) {
        self.lookahead = None;
        if self.state != SessionState::Open {
            return;
        }
        if let Some(handle) = self.handle.as_mut() {
            match handle.read_frame() {
                Ok(frame) => self.lookahead = Some(frame),
                Err(e) => log::debug!("prefetch from {} failed: {e}", self.source),
            }
        }
    }

    /// Releases the handle and drops any buffered frame.
    pub fn close(&mut self) {
        self.lookahead = None;
        self.release_handle();
        if self.state != SessionState::Exhausted {
            self.state = SessionState::Closed;
        }
    }

    /// Blocks through the session's pause source.
    pub fn pause(&mut self, duration: Duration) {
        self.pause.pause(duration);
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the most recent [`CaptureSession::read_next`] hit a read failure.
    #[must_use]
    pub fn last_read_failed(&self) -> bool {
        self.last_read_failed
    }

    /// Number of successful reconnections so far.
    #[must_use]
    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }

    #[must_use]
    pub fn peek(&self) -> Option<&Frame> {
        self.lookahead.as_ref()
    }

    #[must_use]
    pub fn nominal_fps(&self) -> Option<f64> {
        self.handle.as_ref().map(|h| h.nominal_fps())
    }

    #[must_use]
    pub fn backend_name(&self) -> Option<&'static str> {
        self.handle.as_ref().map(|h| h.backend_name())
    }

    /// The failure that exhausted the session, if it is exhausted.
    #[must_use]
    pub fn exhaustion(&self) -> Option<&ProbeError> {
        self.exhaustion.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub(crate) fn pauser(&self) -> &P {
        &self.pause
    }

    fn acquire(&mut self) -> Result<Box<dyn StreamHandle>, ProbeError> {
        self.policy
            .acquire(&mut self.backend, &self.source, &self.hint, &mut self.pause)
    }

    fn reconnect(&mut self) -> ReadOutcome {
        self.state = SessionState::Reconnecting;
        self.release_handle();

        match self.acquire() {
            Ok(handle) => {
                self.reconnects += 1;
                log::info!("reconnected to {} (reconnect #{})", self.source, self.reconnects);
                let handle = self.handle.insert(handle);
                match handle.read_frame() {
                    Ok(frame) => {
                        self.state = SessionState::Open;
                        ReadOutcome::Frame(frame)
                    }
                    Err(e) => {
                        log::warn!("first read after reconnecting to {} failed: {e}", self.source);
                        ReadOutcome::Retrying
                    }
                }
            }
            Err(err) => {
                log::error!("{err}");
                self.state = SessionState::Exhausted;
                self.exhaustion = Some(err);
                ReadOutcome::Exhausted
            }
        }
    }

    fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
    }

    fn exhausted_error(&self) -> ProbeError {
        match &self.exhaustion {
            Some(err) => self.exhausted_error_from(err),
            None => ProbeError::ReconnectExhausted {
                stream: self.source.clone(),
                attempts: 0,
                waited: Duration::ZERO,
            },
        }
    }

    fn exhausted_error_from(&self, err: &ProbeError) -> ProbeError {
        let (attempts, waited) = match err {
            ProbeError::ReconnectExhausted {
                attempts, waited, ..
            } => (*attempts, *waited),
            _ => (self.policy.max_attempts.max(1), Duration::ZERO),
        };
        ProbeError::ReconnectExhausted {
            stream: self.source.clone(),
            attempts,
            waited,
        }
    }
}

impl<B, P> Drop for CaptureSession<B, P> {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
    }
}
