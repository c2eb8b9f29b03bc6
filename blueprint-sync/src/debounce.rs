//! Cancellable delayed delivery of the latest value.

use std::time::Duration;

use tokio::time::Instant;

/// Holds at most one pending value and the instant it becomes due.
///
/// Scheduling again replaces the value and restarts the delay, so a burst
/// of schedules delivers only the last value, once, after the burst goes
/// quiet.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    /// Create an idle debouncer with the given quiescence delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// The quiescence delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending value with `value`, due `delay` after `now`.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Drop the pending value, returning it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// When the pending value is due, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    /// Whether a value is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending value if it is due at `now`.
    pub fn fire(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, due)) if *due <= now => self.cancel(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(100);

    #[test]
    fn fires_once_after_delay() {
        let t0 = Instant::now();
        let mut d = Debounce::new(DELAY);
        d.schedule("a", t0);
        assert_eq!(d.deadline(), Some(t0 + DELAY));
        assert_eq!(d.fire(t0 + Duration::from_millis(99)), None);
        assert_eq!(d.fire(t0 + DELAY), Some("a"));
        assert_eq!(d.fire(t0 + DELAY * 2), None);
        assert!(!d.is_pending());
    }

    #[test]
    fn reschedule_keeps_latest_and_restarts_delay() {
        let t0 = Instant::now();
        let mut d = Debounce::new(DELAY);
        d.schedule(1, t0);
        d.schedule(2, t0 + Duration::from_millis(60));
        assert_eq!(d.fire(t0 + DELAY), None);
        assert_eq!(d.fire(t0 + Duration::from_millis(160)), Some(2));
    }

    #[test]
    fn cancel_clears_pending() {
        let t0 = Instant::now();
        let mut d = Debounce::new(DELAY);
        d.schedule("x", t0);
        assert_eq!(d.cancel(), Some("x"));
        assert_eq!(d.deadline(), None);
        assert_eq!(d.fire(t0 + DELAY), None);
    }
}
