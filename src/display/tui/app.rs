// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::input::Action;
use super::layout::{Panel, PanelState, build_layout};
use super::panels::{events, fps_history, header, stats};
use super::theme::{COLLAPSED_MARKER, SELECTED_MARKER, Theme};
use crate::capture::SessionState;
use crate::display::{AnnotatedFrame, Overlay, RecordingStatus, StreamStatus};

const FPS_HISTORY_CAPACITY: usize = 240;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderState {
    Off,
    Active { frames: u64 },
    Disabled,
}

/// Owned copy of what the last frame reported.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub overlay: Overlay,
    pub width: u32,
    pub height: u32,
    pub frame_bytes: usize,
    pub backend: Option<&'static str>,
    pub state: SessionState,
    pub nominal_fps: f64,
    pub reconnects: u32,
    pub elapsed: Duration,
    pub recorder: RecorderState,
}

impl Snapshot {
    fn from_annotated(annotated: &AnnotatedFrame<'_>) -> Self {
        let frame = annotated.frame;
        Self::from_status(
            annotated.overlay,
            &annotated.status,
            (frame.width, frame.height, frame.data.len()),
        )
    }

    fn from_status(overlay: Overlay, status: &StreamStatus<'_>, frame: (u32, u32, usize)) -> Self {
        let recorder = match status.recording {
            RecordingStatus::Off => RecorderState::Off,
            RecordingStatus::Active { frames, .. } => RecorderState::Active { frames },
            RecordingStatus::Disabled => RecorderState::Disabled,
        };
        let (width, height, frame_bytes) = frame;
        Self {
            overlay,
            width,
            height,
            frame_bytes,
            backend: status.backend,
            state: status.state,
            nominal_fps: status.nominal_fps,
            reconnects: status.reconnects,
            elapsed: status.elapsed,
            recorder,
        }
    }
}

pub struct App {
    pub panels: Vec<PanelState>,
    pub selected_panel: usize,
    pub source: String,
    pub recording_path: Option<PathBuf>,
    pub latest: Option<Snapshot>,
    pub fps_history: VecDeque<f64>,
    pub events: Vec<String>,
    pub should_quit: bool,
    pub theme: Theme,
}

impl App {
    #[must_use]
    pub fn new(source: &str, recording_path: Option<PathBuf>) -> Self {
        let panels = Panel::ALL.into_iter().map(PanelState::new).collect();

        Self {
            panels,
            selected_panel: 0,
            source: source.to_string(),
            recording_path,
            latest: None,
            fps_history: VecDeque::with_capacity(FPS_HISTORY_CAPACITY),
            events: Vec::new(),
            should_quit: false,
            theme: Theme::default(),
        }
    }

    pub fn update(&mut self, annotated: &AnnotatedFrame<'_>) {
        let snapshot = Snapshot::from_annotated(annotated);

        if annotated.fps_updated {
            if self.fps_history.len() >= FPS_HISTORY_CAPACITY {
                self.fps_history.pop_front();
            }
            self.fps_history.push_back(snapshot.overlay.realtime_fps);
        }
        self.latest = Some(snapshot);
    }

    /// Refreshes state and counters on a tick without a frame. Frame size
    /// stays at the last frame's.
    pub fn update_status(&mut self, overlay: Overlay, status: &StreamStatus<'_>) {
        let previous = self.latest.as_ref();
        let frame = previous.map_or((0, 0, 0), |s| (s.width, s.height, s.frame_bytes));
        let mut snapshot = Snapshot::from_status(overlay, status, frame);
        if snapshot.backend.is_none() {
            snapshot.backend = previous.and_then(|s| s.backend);
        }
        self.latest = Some(snapshot);
    }

    pub fn set_events(&mut self, events: Vec<String>) {
        self.events = events;
    }

    pub fn handle_action(&mut self, action: &Action) {
        match *action {
            Action::Quit => self.should_quit = true,
            Action::PanelUp => {
                self.selected_panel = self.selected_panel.saturating_sub(1);
            }
            Action::PanelDown => {
                if self.selected_panel + 1 < self.panels.len() {
                    self.selected_panel += 1;
                }
            }
            Action::ToggleCollapse => {
                if let Some(panel) = self.panels.get_mut(self.selected_panel) {
                    panel.collapsed = !panel.collapsed;
                }
            }
            Action::None => {}
        }
    }

    pub fn render(&self, frame: &mut ratatui::Frame) {
        let outer = frame.area();
        if outer.height < 2 || outer.width < 5 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(outer);

        header::render(frame, vertical[0], self, &self.theme);

        let areas = build_layout(&self.panels, vertical[1]);

        for (i, (panel, area)) in self.panels.iter().zip(areas.iter()).enumerate() {
            let is_selected = i == self.selected_panel;

            let sel_mark = SELECTED_MARKER[usize::from(is_selected)];
            let col_mark = COLLAPSED_MARKER[usize::from(panel.collapsed)];
            let title = format!("{sel_mark} {col_mark} {}", panel.panel.title());

            let border_style = if is_selected {
                self.theme.border_selected
            } else {
                self.theme.border_normal
            };

            let block = Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style)
                .title_style(self.theme.title);

            if panel.collapsed {
                frame.render_widget(block, *area);
                continue;
            }

            let inner = block.inner(*area);
            frame.render_widget(block, *area);
            if inner.width < 2 || inner.height < 1 {
                continue;
            }

            match (panel.panel, &self.latest) {
                (Panel::Stream, Some(snapshot)) => {
                    stats::render(frame, inner, snapshot, self.recording_path.as_deref(), &self.theme);
                }
                (Panel::Stream, None) => {
                    frame.render_widget(Paragraph::new("Waiting for frames..."), inner);
                }
                (Panel::FpsHistory, _) => {
                    fps_history::render(frame, inner, &self.fps_history, &self.theme);
                }
                (Panel::Events, _) => events::render(frame, inner, &self.events, &self.theme),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::backend::Frame;

    fn annotated(frame: &Frame, fps: f64, fps_updated: bool) -> AnnotatedFrame<'_> {
        AnnotatedFrame {
            frame,
            overlay: Overlay {
                frames: frame.sequence + 1,
                realtime_fps: fps,
                bad_reads: 0,
            },
            fps_updated,
            status: StreamStatus {
                source: "synthetic:",
                backend: Some("synthetic"),
                state: SessionState::Open,
                nominal_fps: 30.0,
                reconnects: 0,
                elapsed: Duration::from_secs(1),
                recording: RecordingStatus::Off,
            },
        }
    }

    fn frame(sequence: u64) -> Frame {
        Frame {
            data: vec![0; 16],
            width: 4,
            height: 4,
            captured_at: Instant::now(),
            sequence,
        }
    }

    #[test]
    fn history_grows_only_when_window_closes() {
        let mut app = App::new("synthetic:", None);
        app.update(&annotated(&frame(0), 0.0, false));
        app.update(&annotated(&frame(1), 29.5, true));
        app.update(&annotated(&frame(2), 29.5, false));
        assert_eq!(app.fps_history.len(), 1);
        assert_eq!(app.latest.as_ref().map(|s| s.overlay.frames), Some(3));
    }

    #[test]
    fn history_is_bounded() {
        let mut app = App::new("synthetic:", None);
        let f = frame(0);
        for i in 0..FPS_HISTORY_CAPACITY + 5 {
            #[allow(clippy::cast_precision_loss)]
            app.update(&annotated(&f, i as f64, true));
        }
        assert_eq!(app.fps_history.len(), FPS_HISTORY_CAPACITY);
        assert!((app.fps_history[0] - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn panel_navigation_stays_in_range() {
        let mut app = App::new("synthetic:", None);
        app.handle_action(&Action::PanelUp);
        assert_eq!(app.selected_panel, 0);
        for _ in 0..5 {
            app.handle_action(&Action::PanelDown);
        }
        assert_eq!(app.selected_panel, 2);
        app.handle_action(&Action::ToggleCollapse);
        assert!(app.panels[2].collapsed);
        app.handle_action(&Action::Quit);
        assert!(app.should_quit);
    }

    #[test]
    fn status_update_keeps_last_frame_size() {
        let mut app = App::new("synthetic:", None);
        let f = frame(4);
        app.update(&annotated(&f, 30.0, true));

        let shown = annotated(&f, 30.0, false);
        let mut status = shown.status;
        status.state = SessionState::Reconnecting;
        status.backend = None;
        status.reconnects = 1;
        let overlay = Overlay {
            bad_reads: 1,
            ..shown.overlay
        };
        app.update_status(overlay, &status);

        let latest = app.latest.as_ref().expect("snapshot");
        assert_eq!(latest.state, SessionState::Reconnecting);
        assert_eq!((latest.width, latest.height, latest.frame_bytes), (4, 4, 16));
        assert_eq!(latest.backend, Some("synthetic"));
        assert_eq!(latest.overlay.bad_reads, 1);
        assert_eq!(latest.reconnects, 1);
        assert_eq!(app.fps_history.len(), 1);
    }
}
