// SPDX-License-Identifier: MIT
pub mod app;
pub mod input;
pub mod layout;
pub mod panels;
pub mod theme;

use std::fs::File;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use super::{AnnotatedFrame, Display, Overlay, StreamStatus};
use crate::logging::LogRouter;
use app::App;
use input::handle_key;

/// Frames tick at full rate; the screen is redrawn at most this often.
const MIN_REDRAW_INTERVAL: Duration = Duration::from_millis(33);
const EVENT_LINES: usize = 64;

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("failed to create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

pub struct TuiDisplay {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    app: App,
    router: LogRouter,
    last_draw: Option<Instant>,
    restored: bool,
}

impl TuiDisplay {
    /// Takes over the terminal and diverts log records into the events panel.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be put in raw/alternate mode.
    pub fn start(
        source: &str,
        recording_path: Option<PathBuf>,
        router: LogRouter,
        log_file: Option<File>,
    ) -> Result<Self> {
        let terminal = setup_terminal()?;
        router.capture(log_file);
        Ok(Self {
            terminal,
            app: App::new(source, recording_path),
            router,
            last_draw: None,
            restored: false,
        })
    }

    fn draw(&mut self) -> Result<()> {
        self.app.set_events(self.router.recent(EVENT_LINES));
        let app = &self.app;
        self.terminal
            .draw(|f| app.render(f))
            .context("failed to draw frame")?;
        self.last_draw = Some(Instant::now());
        Ok(())
    }

    fn draw_if_due(&mut self) -> Result<()> {
        let due = self
            .last_draw
            .is_none_or(|last| last.elapsed() >= MIN_REDRAW_INTERVAL);
        if due { self.draw() } else { Ok(()) }
    }

    fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        self.router.release();
        restore_terminal(&mut self.terminal)
    }
}

impl Display for TuiDisplay {
    fn show(&mut self, annotated: &AnnotatedFrame<'_>) -> Result<()> {
        self.app.update(annotated);
        self.draw_if_due()
    }

    fn show_status(&mut self, overlay: Overlay, status: &StreamStatus<'_>) -> Result<()> {
        self.app.update_status(overlay, status);
        self.draw_if_due()
    }

    fn cancel_requested(&mut self) -> Result<bool> {
        let mut handled = false;
        while event::poll(Duration::ZERO).context("failed to poll events")? {
            if let Event::Key(key) = event::read().context("failed to read event")?
                && key.kind == KeyEventKind::Press
            {
                self.app.handle_action(&handle_key(key.code, key.modifiers));
                handled = true;
            }
        }
        if handled && !self.app.should_quit {
            self.draw()?;
        }
        Ok(self.app.should_quit)
    }

    fn finish(&mut self) -> Result<()> {
        self.restore()
    }
}

impl Drop for TuiDisplay {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}
