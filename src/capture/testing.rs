// SPDX-License-Identifier: MIT
//! Scripted backend used by the capture and session-loop tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::reconnect::Pause;
use crate::backend::{Frame, OpenHint, StreamBackend, StreamHandle};
use crate::error::StreamError;

/// Records requested waits instead of sleeping.
#[derive(Default)]
pub(crate) struct RecordedPause {
    pub waits: Vec<Duration>,
}

impl Pause for RecordedPause {
    fn pause(&mut self, duration: Duration) {
        self.waits.push(duration);
    }
}

struct Script {
    steps: VecDeque<bool>,
    then: bool,
}

impl Script {
    fn always(outcome: bool) -> Self {
        Self {
            steps: VecDeque::new(),
            then: outcome,
        }
    }

    fn next(&mut self) -> bool {
        self.steps.pop_front().unwrap_or(self.then)
    }
}

#[derive(Default)]
struct SourceState {
    frames_produced: u64,
    reads: u64,
    closes: u32,
    hints: Vec<OpenHint>,
}

/// A fake source: open and read outcomes follow scripts that continue
/// across reconnections, as a real flaky stream would.
pub(crate) struct ScriptedBackend {
    opens_script: Script,
    reads_script: Rc<RefCell<Script>>,
    state: Rc<RefCell<SourceState>>,
    pub opens: u32,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self {
            opens_script: Script::always(true),
            reads_script: Rc::new(RefCell::new(Script::always(true))),
            state: Rc::new(RefCell::new(SourceState::default())),
            opens: 0,
        }
    }

    pub(crate) fn always_failing() -> Self {
        Self::new().with_opens([], false)
    }

    pub(crate) fn with_opens(mut self, steps: impl IntoIterator<Item = bool>, then: bool) -> Self {
        self.opens_script = Script {
            steps: steps.into_iter().collect(),
            then,
        };
        self
    }

    pub(crate) fn with_reads(self, steps: impl IntoIterator<Item = bool>, then: bool) -> Self {
        *self.reads_script.borrow_mut() = Script {
            steps: steps.into_iter().collect(),
            then,
        };
        self
    }

    /// Number of read calls made on any handle from this backend.
    pub(crate) fn reads(&self) -> u64 {
        self.state.borrow().reads
    }

    pub(crate) fn closes(&self) -> u32 {
        self.state.borrow().closes
    }

    pub(crate) fn hints(&self) -> Vec<OpenHint> {
        self.state.borrow().hints.clone()
    }
}

impl StreamBackend for ScriptedBackend {
    fn open(&mut self, source: &str, hint: &OpenHint) -> Result<Box<dyn StreamHandle>, StreamError> {
        self.opens += 1;
        self.state.borrow_mut().hints.push(*hint);
        if !self.opens_script.next() {
            return Err(StreamError::NotOpened(source.to_string()));
        }
        Ok(Box::new(ScriptedHandle {
            reads: Rc::clone(&self.reads_script),
            state: Rc::clone(&self.state),
            closed: false,
        }))
    }
}

struct ScriptedHandle {
    reads: Rc<RefCell<Script>>,
    state: Rc<RefCell<SourceState>>,
    closed: bool,
}

impl StreamHandle for ScriptedHandle {
    fn read_frame(&mut self) -> Result<Frame, StreamError> {
        if self.closed {
            return Err(StreamError::Read("closed".into()));
        }
        let mut state = self.state.borrow_mut();
        state.reads += 1;
        if !self.reads.borrow_mut().next() {
            return Err(StreamError::Read("scripted failure".into()));
        }
        let sequence = state.frames_produced;
        state.frames_produced += 1;
        Ok(Frame {
            data: sequence.to_le_bytes().to_vec(),
            width: 4,
            height: 2,
            captured_at: Instant::now(),
            sequence,
        })
    }

    fn nominal_fps(&self) -> f64 {
        30.0
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.borrow_mut().closes += 1;
        }
    }
}
