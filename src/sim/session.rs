/// Session clock and scoring.
///
/// The clock starts on a new game and freezes when the game ends (death or
/// win). It is read-only wall time: nothing in turn resolution looks at it
/// except the win score.
///
/// Score = whole elapsed seconds / 5, awarded only on a win.

use std::time::{Duration, Instant};

const SECONDS_PER_POINT: u64 = 5;

#[derive(Clone, Debug)]
pub struct Session {
    started: Instant,
    /// Set once the game ends; elapsed time stops here.
    finished: Option<Duration>,
}

impl Session {
    pub fn start() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started: Instant) -> Self {
        Session { started, finished: None }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_running(&self) -> bool {
        self.finished.is_none()
    }

    pub fn elapsed(&self) -> Duration {
        self.finished.unwrap_or_else(|| self.started.elapsed())
    }

    /// Freeze the clock. Later calls keep the first stop time.
    pub fn stop(&mut self) -> Duration {
        *self.finished.get_or_insert_with(|| self.started.elapsed())
    }
}

pub fn score_for(elapsed: Duration) -> u64 {
    elapsed.as_secs() / SECONDS_PER_POINT
}

pub fn format_clock(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_counts_five_second_blocks() {
        assert_eq!(score_for(Duration::from_secs(0)), 0);
        assert_eq!(score_for(Duration::from_millis(4_999)), 0);
        assert_eq!(score_for(Duration::from_secs(5)), 1);
        assert_eq!(score_for(Duration::from_secs(63)), 12);
    }

    #[test]
    fn clock_pads_seconds() {
        assert_eq!(format_clock(Duration::from_secs(0)), "0:00");
        assert_eq!(format_clock(Duration::from_secs(9)), "0:09");
        assert_eq!(format_clock(Duration::from_secs(75)), "1:15");
        assert_eq!(format_clock(Duration::from_secs(3600)), "60:00");
    }

    #[test]
    fn stop_freezes_elapsed() {
        let t0 = Instant::now() - Duration::from_secs(30);
        let mut s = Session::started_at(t0);
        assert!(s.is_running());
        let stopped = s.stop();
        assert!(stopped >= Duration::from_secs(30));
        assert!(!s.is_running());
        assert_eq!(s.elapsed(), stopped);
        // second stop keeps the first time
        assert_eq!(s.stop(), stopped);
    }
}
