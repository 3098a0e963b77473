// SPDX-License-Identifier: MIT
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod backend;
mod capture;
mod display;
mod error;
mod geometry;
mod logging;
mod metrics;
mod recording;
mod session_loop;

use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use crate::backend::{DefaultBackend, OpenHint, StreamBackend};
use crate::capture::{Backoff, CaptureSession, Pause, ReconnectPolicy, ThreadPause};
use crate::display::Display;
use crate::display::headless::HeadlessDisplay;
use crate::display::tui::TuiDisplay;
use crate::logging::LogRouter;
use crate::session_loop::{LoopOptions, RecorderOptions, SessionLoop, StopReason};

const EXIT_OPEN_FAILED: u8 = 2;
const EXIT_LOST_BEFORE_FIRST_FRAME: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackoffKind {
    /// Same delay between every attempt
    Fixed,
    /// Delay doubles after each failed attempt
    Exponential,
}

#[derive(Parser, Debug)]
#[command(
    name = "streamprobe",
    version,
    about = "streamprobe: video stream health probe with reconnection and recording"
)]
struct Cli {
    /// Camera index, file path, or URL (http://, rtsp://, synthetic:)
    source: String,

    /// Stop after this many seconds (0 runs until interrupted)
    #[arg(long, default_value = "0", value_parser = parse_seconds)]
    duration: Duration,

    /// Record frames to this file (empty disables recording)
    #[arg(long, default_value = "")]
    save: String,

    /// Open attempts before the stream is given up on
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    max_reconnect: u32,

    /// Seconds between open attempts
    #[arg(long, default_value = "1.0", value_parser = parse_seconds)]
    reconnect_delay: Duration,

    #[arg(long, value_enum, default_value = "fixed")]
    backoff: BackoffKind,

    /// Upper bound for exponential backoff, in seconds
    #[arg(long, default_value = "30", value_parser = parse_seconds)]
    max_reconnect_delay: Duration,

    /// Pause after a reconnect whose first read failed
    #[arg(long, default_value = "200")]
    retry_pause_ms: u64,

    /// Requested capture width (0 keeps the source's)
    #[arg(long, default_value = "0")]
    width: u32,

    /// Requested capture height (0 keeps the source's)
    #[arg(long, default_value = "0")]
    height: u32,

    /// Print periodic status lines instead of the terminal UI
    #[arg(long)]
    headless: bool,

    /// Seconds between headless status lines
    #[arg(long, default_value = "5", value_parser = parse_seconds)]
    status_interval: Duration,

    /// Also write log records here while the terminal UI is active
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| format!("'{value}' must be a non-negative number of seconds in range"))
}

impl Cli {
    fn reconnect_policy(&self) -> ReconnectPolicy {
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential {
                max_delay: self.max_reconnect_delay,
            },
        };
        ReconnectPolicy {
            max_attempts: self.max_reconnect,
            delay: self.reconnect_delay,
            backoff,
        }
    }

    fn loop_options(&self) -> LoopOptions {
        LoopOptions {
            duration: (!self.duration.is_zero()).then_some(self.duration),
            retry_pause: Duration::from_millis(self.retry_pause_ms),
        }
    }

    fn recorder_options(&self) -> Option<RecorderOptions> {
        (!self.save.is_empty()).then(|| RecorderOptions {
            path: PathBuf::from(&self.save),
        })
    }

    fn open_hint(&self) -> OpenHint {
        OpenHint::from_dimensions(self.width, self.height)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let router = LogRouter::new();
    logging::init(&router)?;
    run(&cli, &router)
}

// ---------------------------------------------------------------------------
// Signal handling
// ---------------------------------------------------------------------------

fn install_signal_handler() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("failed to register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("failed to register SIGTERM handler")?;
    Ok(shutdown)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

fn open_display(cli: &Cli, router: &LogRouter) -> Result<Box<dyn Display>> {
    if cli.headless || !io::stdout().is_terminal() {
        return Ok(Box::new(HeadlessDisplay::new(io::stderr(), cli.status_interval)));
    }

    let log_file = cli
        .log_file
        .as_ref()
        .map(|path| {
            File::create(path).with_context(|| format!("failed to create {}", path.display()))
        })
        .transpose()?;
    let recording_path = cli.recorder_options().map(|options| options.path);
    let tui = TuiDisplay::start(&cli.source, recording_path, router.clone(), log_file)?;
    Ok(Box::new(tui))
}

fn run(cli: &Cli, router: &LogRouter) -> Result<ExitCode> {
    let shutdown = install_signal_handler()?;
    run_session(
        cli,
        DefaultBackend::new(),
        ThreadPause,
        &shutdown,
        || open_display(cli, router),
        &mut io::stdout(),
    )
}

/// Opens the source, runs the loop and prints the summary to `out`.
/// The display is only opened once the source is.
fn run_session<B: StreamBackend, P: Pause>(
    cli: &Cli,
    backend: B,
    pause: P,
    shutdown: &AtomicBool,
    open_display: impl FnOnce() -> Result<Box<dyn Display>>,
    out: &mut dyn Write,
) -> Result<ExitCode> {
    let mut session = CaptureSession::new(
        backend,
        pause,
        &cli.source,
        cli.reconnect_policy(),
        cli.open_hint(),
    );
    if let Err(err) = session.open() {
        eprintln!("streamprobe: {err}");
        return Ok(ExitCode::from(EXIT_OPEN_FAILED));
    }

    let recorder = cli.recorder_options();
    let mut session_loop = SessionLoop::new(session, cli.loop_options());
    let mut display = open_display()?;
    session_loop.prime(recorder.as_ref());

    let report = session_loop.run(display.as_mut(), shutdown);
    let restored = display.finish();

    if report.stop_reason == StopReason::Unrecoverable
        && let Some(err) = session_loop.exhaustion()
    {
        eprintln!("streamprobe: {err}");
    }

    writeln!(out, "{}", report.summary).context("failed to print summary")?;
    if let (Some(frames), Some(options)) = (report.frames_recorded, recorder.as_ref()) {
        writeln!(out, "  recorded frames: {frames} ({})", options.path.display())
            .context("failed to print summary")?;
    }

    if let Some(err) = report.display_error {
        return Err(err.context("display failed"));
    }
    restored.context("failed to restore the terminal")?;

    if report.stop_reason == StopReason::Unrecoverable && report.summary.total_frames == 0 {
        return Ok(ExitCode::from(EXIT_LOST_BEFORE_FIRST_FRAME));
    }
    Ok(ExitCode::SUCCESS)
}
