//! Scheduling primitives driven by host time.
//!
//! Nothing here reads a clock; the host passes `now_ms` (its animation
//! frame or event timestamp) into every call.
//!
//! - [`FrameSlot`]: work deferred to the next animation frame. At most one
//!   request is pending; a newer one supersedes it.
//! - [`Throttle`]: wall-clock gate, fires at most once per interval.
//! - [`Timer`]: a restartable one-shot deadline.

/// One pending piece of next-frame work.
#[derive(Debug, Clone)]
pub struct FrameSlot<T> {
    pending: Option<T>,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request work for the next frame. Returns `true` if an unprocessed
    /// request was superseded.
    pub fn schedule(&mut self, value: T) -> bool {
        self.pending.replace(value).is_some()
    }

    /// Claim the pending request, if any.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Allows an action when more than `interval_ms` has passed since it last
/// fired. The first call always fires.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: f64,
    last: Option<f64>,
}

impl Throttle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms: interval_ms.max(0.0),
            last: None,
        }
    }

    pub fn is_ready(&self, now_ms: f64) -> bool {
        self.last.is_none_or(|last| now_ms - last > self.interval_ms)
    }

    /// Record that the action ran at `now_ms`.
    pub fn mark(&mut self, now_ms: f64) {
        self.last = Some(now_ms);
    }

    /// Fire if ready; marks on success.
    pub fn try_fire(&mut self, now_ms: f64) -> bool {
        let ready = self.is_ready(now_ms);
        if ready {
            self.mark(now_ms);
        }
        ready
    }
}

/// One-shot deadline; starting it again replaces the old deadline.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    deadline: Option<f64>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start so the timer expires `delay_ms` after `now_ms`.
    pub fn start(&mut self, now_ms: f64, delay_ms: f64) {
        self.deadline = Some(now_ms + delay_ms.max(0.0));
    }

    /// Started and not yet expired at `now_ms`.
    pub fn is_active(&self, now_ms: f64) -> bool {
        self.deadline.is_some_and(|d| now_ms < d)
    }
}
