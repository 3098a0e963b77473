// SPDX-License-Identifier: MIT
use std::thread;
use std::time::Duration;

use crate::backend::{OpenHint, StreamBackend, StreamHandle};
use crate::error::ProbeError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// A place where the capture path may block for a while.
///
/// Every deliberate wait in a session goes through this, so tests can
/// observe waits instead of sleeping.
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay between every pair of attempts.
    Fixed,
    /// Delay doubles after every failed attempt, up to `max_delay`.
    Exponential { max_delay: Duration },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
            backoff: Backoff::Fixed,
        }
    }
}

impl ReconnectPolicy {
    /// Wait that follows failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => {
                let factor = 1u32
                    .checked_shl(attempt.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                self.delay.saturating_mul(factor).min(max_delay)
            }
        }
    }

    /// Upper bound on time spent waiting by one [`ReconnectPolicy::acquire`].
    #[must_use]
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.attempts())
            .map(|attempt| self.delay_after(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Tries to open `source` until it succeeds or attempts run out,
    /// waiting between attempts.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::ReconnectExhausted`] when every attempt failed.
    pub fn acquire(
        &self,
        backend: &mut dyn StreamBackend,
        source: &str,
        hint: &OpenHint,
        pause: &mut dyn Pause,
    ) -> Result<Box<dyn StreamHandle>, ProbeError> {
        let max_attempts = self.attempts();
        let mut waited = Duration::ZERO;

        for attempt in 1..=max_attempts {
            match backend.open(source, hint) {
                Ok(handle) => {
                    if attempt > 1 {
                        log::info!("opened {source} on attempt {attempt}/{max_attempts}");
                    }
                    return Ok(handle);
                }
                Err(cause) => {
                    let failure = ProbeError::OpenFailure {
                        stream: source.to_string(),
                        attempt,
                        max_attempts,
                        cause,
                    };
                    if attempt < max_attempts {
                        let delay = self.delay_after(attempt);
                        log::warn!("{failure}; retrying in {:.1}s", delay.as_secs_f64());
                        pause.pause(delay);
                        waited += delay;
                    } else {
                        log::warn!("{failure}");
                    }
                }
            }
        }

        Err(ProbeError::ReconnectExhausted {
            stream: source.to_string(),
            attempts: max_attempts,
            waited,
        })
    }
}
