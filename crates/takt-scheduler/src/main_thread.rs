//! Scheduler pinned to the designated main worker.

use chrono::{DateTime, TimeDelta, Utc};
use takt_core::Handle;

use crate::queue::main_queue;
use crate::scheduler::{Action, DateScheduler, RepeatAction, Scheduler};
use crate::serial::SerialScheduler;

/// Date-aware scheduler guaranteed to target the process-wide main worker.
///
/// Pure composition over a [`SerialScheduler`] bound to the main queue: it
/// adds no behavior of its own and exists to name the binding. Every
/// instance targets the same fixed thread, so cross-call ordering and
/// single-owner execution both hold across instances.
#[derive(Clone)]
pub struct MainScheduler {
    inner: SerialScheduler,
}

impl MainScheduler {
    pub fn new() -> Self {
        Self {
            inner: SerialScheduler::from_queue(main_queue().clone()),
        }
    }
}

impl Default for MainScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for MainScheduler {
    fn schedule(&self, action: Action) -> Option<Handle> {
        self.inner.schedule(action)
    }
}

impl DateScheduler for MainScheduler {
    fn now(&self) -> DateTime<Utc> {
        self.inner.now()
    }

    fn schedule_at(&self, at: DateTime<Utc>, action: Action) -> Option<Handle> {
        self.inner.schedule_at(at, action)
    }

    fn schedule_repeating(
        &self,
        start: DateTime<Utc>,
        interval: TimeDelta,
        leeway: TimeDelta,
        action: RepeatAction,
    ) -> Option<Handle> {
        self.inner.schedule_repeating(start, interval, leeway, action)
    }
}
