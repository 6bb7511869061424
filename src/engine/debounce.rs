//! Delay-coalescing primitive for keystroke-driven searches.
//!
//! Each trigger resets the timer; the deadline fires once after the quiet
//! period elapses. Framework-independent: the caller polls [`Debouncer::fire_at`]
//! from its own tick loop.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Starts or restarts the quiet period.
    pub fn trigger(&mut self) {
        self.trigger_at(Instant::now());
    }

    pub fn trigger_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// Returns true exactly once per elapsed quiet period, then disarms.
    pub fn fire(&mut self) -> bool {
        self.fire_at(Instant::now())
    }

    pub fn fire_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
