//! Scheduler capability traits.

use chrono::{DateTime, TimeDelta, Utc};
use takt_core::Handle;

/// Zero-argument unit of work.
///
/// An action may call back into any scheduler, including the one that is
/// currently invoking it.
pub type Action = Box<dyn FnOnce() + Send>;

/// Body of a repeating registration; invoked once per occurrence.
pub type RepeatAction = Box<dyn FnMut() + Send>;

/// Capability to enqueue an action for execution as soon as this
/// scheduler's ordering allows.
///
/// Two calls against the *same* scheduler instance are totally ordered
/// relative to each other. Ordering across different instances is undefined.
pub trait Scheduler: Send + Sync {
    /// Enqueue `action`.
    ///
    /// Returns a handle usable to withdraw the action before it runs, or
    /// `None` when withdrawal is structurally meaningless (the action
    /// already ran synchronously). Callers must tolerate a missing handle.
    fn schedule(&self, action: Action) -> Option<Handle>;
}

/// A scheduler that also understands absolute time.
pub trait DateScheduler: Scheduler {
    /// The scheduler's notion of the current instant: wall clock for the
    /// production schedulers, the virtual clock for the test scheduler.
    fn now(&self) -> DateTime<Utc>;

    /// Enqueue `action` to run at or after the absolute instant `at`.
    fn schedule_at(&self, at: DateTime<Utc>, action: Action) -> Option<Handle>;

    /// Enqueue `action` to run at `start` and every `interval` thereafter.
    ///
    /// `leeway` is a tolerance window the substrate may use to coalesce
    /// timer fires; deterministic schedulers accept and ignore it. A single
    /// withdrawal via the returned handle stops the entire remaining series.
    ///
    /// # Panics
    /// Panics if `interval` is not strictly positive.
    fn schedule_repeating(
        &self,
        start: DateTime<Utc>,
        interval: TimeDelta,
        leeway: TimeDelta,
        action: RepeatAction,
    ) -> Option<Handle>;
}
