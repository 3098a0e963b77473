// SPDX-License-Identifier: MIT
use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Rows drawn by the stats panel.
pub const STATS_ROWS: u16 = 9;
const BORDER_ROWS: u16 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panel {
    Stream,
    FpsHistory,
    Events,
}

impl Panel {
    pub const ALL: [Self; 3] = [Self::Stream, Self::FpsHistory, Self::Events];

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Stream => "Stream",
            Self::FpsHistory => "Realtime FPS",
            Self::Events => "Events",
        }
    }

    fn expanded(self) -> Constraint {
        match self {
            Self::Stream => Constraint::Length(STATS_ROWS + BORDER_ROWS),
            Self::FpsHistory => Constraint::Min(8),
            Self::Events => Constraint::Min(5),
        }
    }
}

pub struct PanelState {
    pub panel: Panel,
    pub collapsed: bool,
}

impl PanelState {
    #[must_use]
    pub fn new(panel: Panel) -> Self {
        Self {
            panel,
            collapsed: false,
        }
    }
}

/// The stats panel is sized to its rows, the chart and the event log share
/// the rest. A collapsed panel keeps only its border.
pub fn build_layout(panels: &[PanelState], area: Rect) -> Vec<Rect> {
    let constraints: Vec<Constraint> = panels
        .iter()
        .map(|p| {
            if p.collapsed {
                Constraint::Length(BORDER_ROWS)
            } else {
                p.panel.expanded()
            }
        })
        .collect();

    Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area)
        .to_vec()
}
