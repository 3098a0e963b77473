// SPDX-License-Identifier: MIT
use std::fmt;
use std::time::Duration;

/// Final figures for one run. Built once, when the loop stops.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub total_frames: u64,
    pub bad_reads: u64,
    pub elapsed: Duration,
    pub average_fps: f64,
}

impl SessionSummary {
    #[must_use]
    pub fn new(total_frames: u64, bad_reads: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        #[allow(clippy::cast_precision_loss)]
        let average_fps = if secs > 0.0 {
            total_frames as f64 / secs
        } else {
            0.0
        };
        Self {
            total_frames,
            bad_reads,
            elapsed,
            average_fps,
        }
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session summary")?;
        writeln!(f, "  total frames:    {}", self.total_frames)?;
        writeln!(f, "  bad reads:       {}", self.bad_reads)?;
        writeln!(f, "  elapsed seconds: {:.2}", self.elapsed_seconds())?;
        write!(f, "  average fps:     {:.2}", self.average_fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_elapsed_gives_zero_average() {
        let summary = SessionSummary::new(42, 0, Duration::ZERO);
        assert!(summary.average_fps.abs() < f64::EPSILON);
    }

    #[test]
    fn average_is_frames_over_seconds() {
        let summary = SessionSummary::new(250, 3, Duration::from_millis(10_000));
        assert!((summary.average_fps - 25.0).abs() < 1e-9);
    }

    #[test]
    fn display_lists_every_figure() {
        let summary = SessionSummary::new(10, 2, Duration::from_millis(2500));
        let text = summary.to_string();
        assert!(text.contains("total frames:    10"));
        assert!(text.contains("bad reads:       2"));
        assert!(text.contains("elapsed seconds: 2.50"));
        assert!(text.contains("average fps:     4.00"));
    }
}
