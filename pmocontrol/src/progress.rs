//! Elapsed time of the current track.
//!
//! The tracker counts only the time spent playing: pausing freezes the
//! counter, resuming restarts it from where it stopped. The running total is
//! kept as a [`Duration`] so repeated pause/resume cycles never drift.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    /// Set while running.
    started_at: Option<Instant>,
    /// Time accumulated before the last pause.
    accumulated: Duration,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting from zero.
    pub fn start(&mut self) {
        self.accumulated = Duration::ZERO;
        self.started_at = Some(Instant::now());
    }

    pub fn pause(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.accumulated += started_at.elapsed();
        }
    }

    pub fn resume(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Total playing time.
    pub fn elapsed(&self) -> Duration {
        self.accumulated
            + self
                .started_at
                .map(|started_at| started_at.elapsed())
                .unwrap_or_default()
    }

    /// Total playing time in whole seconds.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed().as_secs()
    }
}

/// Formats a duration in seconds as MM:SS, or HH:MM:SS from one hour on.
///
/// # Examples
/// ```
/// # use pmocontrol::format_duration;
/// assert_eq!(format_duration(0), "00:00");
/// assert_eq!(format_duration(245), "04:05");
/// assert_eq!(format_duration(3661), "01:01:01");
/// ```
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_tracker_counts_only_playing_time() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.elapsed_secs(), 0);

        tracker.start();
        advance(Duration::from_secs(10)).await;
        assert_eq!(tracker.elapsed_secs(), 10);

        tracker.pause();
        advance(Duration::from_secs(30)).await;
        assert_eq!(tracker.elapsed_secs(), 10);
        assert!(!tracker.is_running());

        tracker.resume();
        advance(Duration::from_secs(5)).await;
        assert_eq!(tracker.elapsed_secs(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracker_does_not_drift() {
        let mut tracker = ProgressTracker::new();
        tracker.start();
        // 1000 cycles of 700 ms playing then a pause
        for _ in 0..1000 {
            advance(Duration::from_millis(700)).await;
            tracker.pause();
            advance(Duration::from_secs(3)).await;
            tracker.resume();
        }
        assert_eq!(tracker.elapsed_secs(), 700);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracker_restart_and_reset() {
        let mut tracker = ProgressTracker::new();
        tracker.start();
        advance(Duration::from_secs(42)).await;

        tracker.start();
        assert_eq!(tracker.elapsed_secs(), 0);

        advance(Duration::from_secs(3)).await;
        tracker.reset();
        assert_eq!(tracker.elapsed_secs(), 0);
        assert!(!tracker.is_running());

        // resume twice keeps the first start
        tracker.resume();
        advance(Duration::from_secs(2)).await;
        tracker.resume();
        assert_eq!(tracker.elapsed_secs(), 2);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(59), "00:59");
        assert_eq!(format_duration(61), "01:01");
        assert_eq!(format_duration(3599), "59:59");
        assert_eq!(format_duration(3600), "01:00:00");
        assert_eq!(format_duration(36_000 + 62), "10:01:02");
    }
}
