//! Cancelable tick scheduling
//!
//! The meter runs on the host's event loop rather than on a thread of its
//! own. Instead of a callback that reschedules itself, it holds at most one
//! explicit [`TimerHandle`]. The host polls the meter; a handle fires once
//! its due time has passed. Cancelling the handle guarantees the tick never
//! runs, which is what teardown relies on.

use std::time::{Duration, Instant};

/// Source of the current time
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A scheduled tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerHandle {
    id: u64,
    due: Instant,
}

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn due(&self) -> Instant {
        self.due
    }
}

/// Issues timer handles at a fixed period, at most one pending at a time
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next_id: u64,
    pending: Option<TimerHandle>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_id: 1,
            pending: None,
        }
    }

    /// Schedule the next tick one period after `base`
    ///
    /// Replaces (and thereby invalidates) any pending handle.
    pub fn schedule_after(&mut self, base: Instant) -> TimerHandle {
        let handle = TimerHandle {
            id: self.next_id,
            due: base + self.period,
        };
        self.next_id += 1;
        self.pending = Some(handle);
        handle
    }

    /// Invalidate the pending handle, if any
    pub fn cancel(&mut self) -> Option<TimerHandle> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<TimerHandle> {
        self.pending
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending handle if it is due at `now`
    pub fn take_due(&mut self, now: Instant) -> Option<TimerHandle> {
        match self.pending {
            Some(handle) if handle.due <= now => self.pending.take(),
            _ => None,
        }
    }
}

/// Manually advanced clock for deterministic tests
#[cfg(test)]
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: std::rc::Rc<std::cell::Cell<Instant>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: std::rc::Rc::new(std::cell::Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_fires_when_due() {
        let clock = ManualClock::new();
        let mut ticker = Ticker::new(Duration::from_millis(10));

        let handle = ticker.schedule_after(clock.now());
        assert_eq!(ticker.take_due(clock.now()), None);

        clock.advance(Duration::from_millis(10));
        assert_eq!(ticker.take_due(clock.now()), Some(handle));
        assert!(!ticker.is_pending());
    }

    #[test]
    fn test_cancelled_handle_never_fires() {
        let clock = ManualClock::new();
        let mut ticker = Ticker::new(Duration::from_millis(10));

        let handle = ticker.schedule_after(clock.now());
        assert_eq!(ticker.cancel(), Some(handle));

        clock.advance(Duration::from_secs(1));
        assert_eq!(ticker.take_due(clock.now()), None);
    }

    #[test]
    fn test_reschedule_replaces_handle() {
        let clock = ManualClock::new();
        let mut ticker = Ticker::new(Duration::from_millis(10));

        let first = ticker.schedule_after(clock.now());
        let second = ticker.schedule_after(clock.now());
        assert_ne!(first.id(), second.id());
        assert_eq!(ticker.pending(), Some(second));
    }
}
