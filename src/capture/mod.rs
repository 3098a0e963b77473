// SPDX-License-Identifier: MIT
pub mod reconnect;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use reconnect::{Backoff, Pause, ReconnectPolicy, ThreadPause};
pub use session::{CaptureSession, ReadOutcome, SessionState};
