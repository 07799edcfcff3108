//! Response timeout supervision
//!
//! A single-shot deadline armed when a request frame is written and
//! disarmed when a well-shaped response arrives or the link closes.

use std::time::{Duration, Instant};

use super::DEFAULT_TIMEOUT_MS;

/// Single-shot response timer
#[derive(Debug, Clone)]
pub struct TimeoutSupervisor {
    interval: Duration,
    deadline: Option<Instant>,
}

impl TimeoutSupervisor {
    /// Create a stopped supervisor with the given interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// The configured interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm the timer; does nothing if it is already running
    pub fn start(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.interval);
        }
    }

    /// Disarm the timer
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    /// Check if the timer is armed
    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Check if the timer is armed and its deadline has passed
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Time left before expiry, if armed
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

impl Default for TimeoutSupervisor {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_after_interval() {
        let start = Instant::now();
        let mut timer = TimeoutSupervisor::new(Duration::from_millis(1000));
        assert!(!timer.is_running());
        assert!(!timer.is_expired(start + Duration::from_secs(5)));

        timer.start(start);
        assert!(timer.is_running());
        assert!(!timer.is_expired(start + Duration::from_millis(999)));
        assert!(timer.is_expired(start + Duration::from_millis(1000)));
    }

    #[test]
    fn test_start_does_not_restart() {
        let start = Instant::now();
        let mut timer = TimeoutSupervisor::new(Duration::from_millis(100));
        timer.start(start);
        timer.start(start + Duration::from_millis(90));
        assert!(timer.is_expired(start + Duration::from_millis(100)));
    }

    #[test]
    fn test_stop() {
        let start = Instant::now();
        let mut timer = TimeoutSupervisor::default();
        timer.start(start);
        assert_eq!(timer.remaining(start), Some(Duration::from_millis(1000)));
        timer.stop();
        assert!(!timer.is_running());
        assert_eq!(timer.remaining(start), None);
    }
}
