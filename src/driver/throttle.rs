//! Leading-and-trailing edge rate limiter.
//!
//! The first request in a burst fires immediately; further requests
//! inside the window set a pending flag that the driver's `poll` drains
//! once the window elapses. Cooperative: no timers or threads, just a
//! state machine fed the current instant.

use std::time::{Duration, Instant};

/// Redraw rate limiter with a fixed window.
#[derive(Debug)]
pub struct Throttle {
    window: Duration,
    last_fire: Option<Instant>,
    pending: bool,
}

impl Throttle {
    /// Create a limiter with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fire: None,
            pending: false,
        }
    }

    /// Request a fire at `now`. Returns `true` when the caller should
    /// fire immediately (leading edge); otherwise the request is
    /// recorded for the trailing edge.
    pub fn request(&mut self, now: Instant) -> bool {
        match self.last_fire {
            Some(last) if now.duration_since(last) < self.window => {
                self.pending = true;
                false
            }
            _ => {
                self.last_fire = Some(now);
                self.pending = false;
                true
            }
        }
    }

    /// Drain the trailing edge: returns `true` exactly once after the
    /// window has elapsed past a deferred request.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }
        match self.last_fire {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.pending = false;
                self.last_fire = Some(now);
                true
            }
        }
    }

    /// Whether a trailing-edge fire is owed.
    #[must_use]
    pub fn pending(&self) -> bool {
        self.pending
    }

    /// When the trailing edge becomes due, if one is owed.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending
            .then(|| self.last_fire.map(|last| last + self.window))
            .flatten()
    }

    /// Drop any owed trailing edge (unmount path).
    pub fn cancel(&mut self) {
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(32);

    #[test]
    fn test_leading_edge_fires_immediately() {
        let mut throttle = Throttle::new(WINDOW);
        let t0 = Instant::now();
        assert!(throttle.request(t0));
    }

    #[test]
    fn test_burst_coalesces_to_one_pending() {
        let mut throttle = Throttle::new(WINDOW);
        let t0 = Instant::now();
        assert!(throttle.request(t0));
        assert!(!throttle.request(t0 + Duration::from_millis(1)));
        assert!(!throttle.request(t0 + Duration::from_millis(10)));
        assert!(throttle.pending());

        // Trailing edge fires once after the window.
        assert!(!throttle.poll(t0 + Duration::from_millis(20)));
        assert!(throttle.poll(t0 + WINDOW));
        assert!(!throttle.poll(t0 + WINDOW + Duration::from_millis(1)));
    }

    #[test]
    fn test_request_after_window_is_leading_again() {
        let mut throttle = Throttle::new(WINDOW);
        let t0 = Instant::now();
        assert!(throttle.request(t0));
        assert!(throttle.request(t0 + WINDOW));
    }

    #[test]
    fn test_deadline_reported_while_pending() {
        let mut throttle = Throttle::new(WINDOW);
        let t0 = Instant::now();
        throttle.request(t0);
        assert_eq!(throttle.deadline(), None);
        throttle.request(t0 + Duration::from_millis(1));
        assert_eq!(throttle.deadline(), Some(t0 + WINDOW));
    }

    #[test]
    fn test_cancel_drops_trailing_edge() {
        let mut throttle = Throttle::new(WINDOW);
        let t0 = Instant::now();
        throttle.request(t0);
        throttle.request(t0 + Duration::from_millis(1));
        throttle.cancel();
        assert!(!throttle.poll(t0 + WINDOW + WINDOW));
    }
}
