// SPDX-License-Identifier: MIT
//! Routes `log` records either to stderr or, while the terminal UI owns the
//! screen, into an in-memory event list (and optionally a file).

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use env_logger::{Env, Target, WriteStyle};

const EVENT_CAPACITY: usize = 200;

enum Sink {
    Stderr,
    Capture { file: Option<File> },
}

struct RouterState {
    sink: Sink,
    events: VecDeque<String>,
    partial: Vec<u8>,
}

impl RouterState {
    fn push_event(&mut self, line: String) {
        if self.events.len() >= EVENT_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(line);
    }
}

#[derive(Clone)]
pub struct LogRouter {
    state: Arc<Mutex<RouterState>>,
}

impl Default for LogRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl LogRouter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RouterState {
                sink: Sink::Stderr,
                events: VecDeque::with_capacity(EVENT_CAPACITY),
                partial: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Keeps records off the terminal until [`LogRouter::release`].
    pub fn capture(&self, file: Option<File>) {
        self.lock().sink = Sink::Capture { file };
    }

    /// Sends records back to stderr.
    pub fn release(&self) {
        let mut state = self.lock();
        if let Sink::Capture { file: Some(file) } = &mut state.sink {
            let _ = file.flush();
        }
        state.sink = Sink::Stderr;
    }

    /// The most recent `count` records, oldest first.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<String> {
        let state = self.lock();
        let skip = state.events.len().saturating_sub(count);
        state.events.iter().skip(skip).cloned().collect()
    }

    #[must_use]
    pub fn pipe(&self) -> LogPipe {
        LogPipe {
            router: self.clone(),
        }
    }
}

/// The writer handed to `env_logger`.
pub struct LogPipe {
    router: LogRouter,
}

impl Write for LogPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.router.lock();
        let state = &mut *guard;
        match &mut state.sink {
            Sink::Stderr => io::stderr().write_all(buf)?,
            Sink::Capture { file } => {
                if let Some(file) = file {
                    file.write_all(buf)?;
                }
                state.partial.extend_from_slice(buf);
                while let Some(end) = state.partial.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = state.partial.drain(..=end).collect();
                    let text = String::from_utf8_lossy(&line).trim_end().to_string();
                    if !text.is_empty() {
                        state.push_event(text);
                    }
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.router.lock();
        match &mut state.sink {
            Sink::Stderr => io::stderr().flush(),
            Sink::Capture { file: Some(file) } => file.flush(),
            Sink::Capture { file: None } => Ok(()),
        }
    }
}

/// Installs the global logger. `RUST_LOG` overrides the default `info`.
///
/// # Errors
///
/// Returns an error if a logger is already installed.
pub fn init(router: &LogRouter) -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(router.pipe())))
        .write_style(WriteStyle::Never)
        .format_timestamp_millis()
        .try_init()
        .context("failed to initialise logging")
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn captured_records_become_events() {
        let router = LogRouter::new();
        router.capture(None);
        let mut pipe = router.pipe();
        pipe.write_all(b"[INFO] opened cam\n[WARN] ret").unwrap();
        pipe.write_all(b"rying\n").unwrap();

        assert_eq!(
            router.recent(10),
            vec!["[INFO] opened cam".to_string(), "[WARN] retrying".to_string()]
        );
        assert_eq!(router.recent(1), vec!["[WARN] retrying".to_string()]);
    }

    #[test]
    fn event_list_is_bounded() {
        let router = LogRouter::new();
        router.capture(None);
        let mut pipe = router.pipe();
        for i in 0..EVENT_CAPACITY + 10 {
            writeln!(pipe, "record {i}").unwrap();
        }
        let events = router.recent(usize::MAX);
        assert_eq!(events.len(), EVENT_CAPACITY);
        assert_eq!(events[0], "record 10");
    }

    #[test]
    fn captured_records_also_reach_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.log");
        let router = LogRouter::new();
        router.capture(Some(File::create(&path).unwrap()));
        writeln!(router.pipe(), "[ERROR] gone").unwrap();
        router.release();

        let mut text = String::new();
        File::open(&path).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "[ERROR] gone\n");
    }

    #[test]
    fn released_router_stops_collecting() {
        let router = LogRouter::new();
        router.release();
        writeln!(router.pipe(), "to stderr").unwrap();
        assert!(router.recent(5).is_empty());
    }
}
