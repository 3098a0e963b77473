// SPDX-License-Identifier: MIT
use std::time::Duration;

use thiserror::Error;

/// Failures reported by a stream backend for a single operation.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("no backend can open '{0}'")]
    Unsupported(String),
    #[error("source '{0}' could not be opened")]
    NotOpened(String),
    #[error("frame read failed: {0}")]
    Read(String),
    #[error("end of stream")]
    EndOfStream,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("malformed stream data: {0}")]
    Format(String),
}

/// Session-level failure taxonomy.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A single open attempt failed; absorbed by the reconnect policy.
    #[error("open attempt {attempt}/{max_attempts} for '{stream}' failed: {cause}")]
    OpenFailure {
        stream: String,
        attempt: u32,
        max_attempts: u32,
        cause: StreamError,
    },
    /// Every bounded attempt failed. Terminal for the session.
    #[error("could not open '{stream}' after {attempts} attempts ({waited:?} spent waiting)")]
    ReconnectExhausted {
        stream: String,
        attempts: u32,
        waited: Duration,
    },
    /// A read failed on an otherwise open handle; triggers reconnection.
    #[error("read from '{stream}' failed: {cause}")]
    ReadFailure { stream: String, cause: StreamError },
    /// The recorder could not be started or kept running.
    #[error("recording disabled: {0}")]
    SinkUnavailable(String),
}
