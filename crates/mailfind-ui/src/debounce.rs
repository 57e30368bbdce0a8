//! Debounced search triggering
//!
//! Every fired search is stamped with a [`Generation`]. Only the newest
//! generation may update the displayed results; anything older that
//! completes later is stale.

use std::time::Duration;

use tokio::time::Instant;

/// Monotonic stamp of a fired search
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

/// Trailing-edge debouncer with a generation counter
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
    generation: Generation,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            generation: Generation(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the quiet period from `now`
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fire if the quiet period has elapsed
    pub fn fire_if_due(&mut self, now: Instant) -> Option<Generation> {
        match self.deadline {
            Some(deadline) if deadline <= now => Some(self.fire_now()),
            _ => None,
        }
    }

    /// Fire immediately, dropping any pending trigger
    pub fn fire_now(&mut self) -> Generation {
        self.deadline = None;
        self.generation.0 += 1;
        self.generation
    }

    /// Make every in-flight generation stale without firing
    pub fn invalidate(&mut self) {
        self.deadline = None;
        self.generation.0 += 1;
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }
}
