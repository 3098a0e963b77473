// SPDX-License-Identifier: MIT
use std::time::{Duration, Instant};

use super::summary::SessionSummary;

/// Length of the non-overlapping window used for the realtime rate.
pub const FPS_WINDOW: Duration = Duration::from_millis(500);

/// Frame and failure counters for one session, plus a realtime frame rate
/// sampled over fixed windows.
#[derive(Debug)]
pub struct MetricsTracker {
    window_start: Instant,
    frames_in_window: u64,
    frame_count: u64,
    bad_reads: u64,
    realtime_fps: f64,
}

impl MetricsTracker {
    #[must_use]
    pub fn new(start: Instant) -> Self {
        Self {
            window_start: start,
            frames_in_window: 0,
            frame_count: 0,
            bad_reads: 0,
            realtime_fps: 0.0,
        }
    }

    /// Counts one frame arriving at `now`. Returns `true` when this frame
    /// closed a window and the realtime rate was recomputed.
    pub fn on_frame(&mut self, now: Instant) -> bool {
        self.frame_count += 1;
        self.frames_in_window += 1;

        let span = now.saturating_duration_since(self.window_start);
        if span < FPS_WINDOW {
            return false;
        }

        #[allow(clippy::cast_precision_loss)]
        let frames = self.frames_in_window as f64;
        self.realtime_fps = frames / span.as_secs_f64();
        self.window_start = now;
        self.frames_in_window = 0;
        true
    }

    pub fn on_bad_read(&mut self) {
        self.bad_reads += 1;
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[must_use]
    pub fn bad_reads(&self) -> u64 {
        self.bad_reads
    }

    /// 0 until the first window closes.
    #[must_use]
    pub fn realtime_fps(&self) -> f64 {
        self.realtime_fps
    }

    #[must_use]
    pub fn summarize(&self, elapsed: Duration) -> SessionSummary {
        SessionSummary::new(self.frame_count, self.bad_reads, elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    #[test]
    fn counts_frames_without_bad_reads() {
        let start = Instant::now();
        let mut tracker = MetricsTracker::new(start);
        for i in 0..10 {
            tracker.on_frame(at(start, i * 10));
        }
        assert_eq!(tracker.frame_count(), 10);
        assert_eq!(tracker.bad_reads(), 0);
    }

    #[test]
    fn bad_reads_do_not_touch_frame_count() {
        let mut tracker = MetricsTracker::new(Instant::now());
        tracker.on_bad_read();
        tracker.on_bad_read();
        assert_eq!(tracker.bad_reads(), 2);
        assert_eq!(tracker.frame_count(), 0);
    }

    #[test]
    fn realtime_rate_is_zero_until_first_window_closes() {
        let start = Instant::now();
        let mut tracker = MetricsTracker::new(start);
        for i in 1..=12 {
            assert!(!tracker.on_frame(at(start, i * 40)));
            assert!(tracker.realtime_fps().abs() < f64::EPSILON);
        }
        assert!(tracker.on_frame(at(start, 520)));
        assert!((tracker.realtime_fps() - 13.0 / 0.52).abs() < 1e-9);
    }

    #[test]
    fn realtime_rate_holds_between_windows() {
        // 20 fps: one frame every 50 ms.
        let start = Instant::now();
        let mut tracker = MetricsTracker::new(start);
        for i in 1..=10 {
            tracker.on_frame(at(start, i * 50));
        }
        let first = tracker.realtime_fps();
        assert!((first - 20.0).abs() < 1e-9);

        for i in 11..=19 {
            assert!(!tracker.on_frame(at(start, i * 50)));
            assert!((tracker.realtime_fps() - first).abs() < f64::EPSILON);
        }
        assert!(tracker.on_frame(at(start, 20 * 50)));
        assert!((tracker.realtime_fps() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn slow_stream_reports_rate_over_long_window() {
        let start = Instant::now();
        let mut tracker = MetricsTracker::new(start);
        assert!(tracker.on_frame(at(start, 2000)));
        assert!((tracker.realtime_fps() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn summary_uses_cumulative_counts() {
        let start = Instant::now();
        let mut tracker = MetricsTracker::new(start);
        for i in 0..30 {
            tracker.on_frame(at(start, i * 33));
        }
        tracker.on_bad_read();
        let summary = tracker.summarize(Duration::from_secs(2));
        assert_eq!(summary.total_frames, 30);
        assert_eq!(summary.bad_reads, 1);
        assert!((summary.average_fps - 15.0).abs() < 1e-9);
    }
}
