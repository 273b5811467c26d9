//! Collapse-latest buffer for bursty notifications (gizmo drag updates).
//!
//! One slot, last write wins: scheduling replaces any pending value and restarts the delay.
//! Time is supplied by the caller (milliseconds on any monotonic clock), so the buffer never
//! owns a timer and stays usable from a render loop.

/// Single-slot debouncer with a generation guard.
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    delay_ms: f64,
    slot: Option<Pending<T>>,
    generation: u64,
}

#[derive(Clone, Debug)]
struct Pending<T> {
    value: T,
    due_ms: f64,
    generation: u64,
}

impl<T> Debouncer<T> {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms: delay_ms.max(0.0),
            slot: None,
            generation: 0,
        }
    }

    pub fn delay_ms(&self) -> f64 {
        self.delay_ms
    }

    /// Replace the pending value; it becomes due `delay_ms` after `now_ms`.
    /// Returns the generation id of this schedule.
    pub fn schedule(&mut self, now_ms: f64, value: T) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.slot = Some(Pending {
            value,
            due_ms: now_ms + self.delay_ms,
            generation: self.generation,
        });
        self.generation
    }

    /// Take the pending value if it is due.
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        let due = matches!(
            &self.slot,
            Some(p) if p.due_ms <= now_ms && p.generation == self.generation
        );
        if due {
            self.slot.take().map(|p| p.value)
        } else {
            None
        }
    }

    /// Take the pending value regardless of its due time.
    pub fn flush(&mut self) -> Option<T> {
        self.slot.take().map(|p| p.value)
    }

    pub fn cancel(&mut self) {
        self.slot = None;
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Generation id of the latest schedule.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
