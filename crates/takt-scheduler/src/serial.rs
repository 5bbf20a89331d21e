//! Scheduler over one native serial work queue.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use takt_core::{clamp_to_delay, delay_between, Cancel, CancelFlag, Handle, TaskCancel};
use tracing::debug;

use crate::queue::{default_queue, Job, Priority, WorkQueue};
use crate::scheduler::{Action, DateScheduler, RepeatAction, Scheduler};

/// Asynchronous scheduler delegating to a [`WorkQueue`].
///
/// `schedule*` calls return immediately; execution happens on whatever
/// thread the queue's runtime selects, but all submissions through one
/// `SerialScheduler` are totally ordered against each other.
#[derive(Clone)]
pub struct SerialScheduler {
    queue: WorkQueue,
}

impl SerialScheduler {
    /// Bind to the process-wide default-priority queue.
    pub fn new() -> Self {
        Self::with_priority(Priority::Default)
    }

    /// Bind to the process-wide default queue for `priority`.
    pub fn with_priority(priority: Priority) -> Self {
        debug!(?priority, "serial scheduler on default queue");
        Self {
            queue: default_queue(priority).clone(),
        }
    }

    /// Bind to an existing queue.
    ///
    /// The queue serializes against itself by construction, so work
    /// scheduled here is totally ordered with any other work submitted to
    /// the same queue directly.
    pub fn from_queue(queue: WorkQueue) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// Wrap an action so the withdrawal flag is read immediately before the
    /// body runs. A cancel that lands after submission but before execution
    /// still suppresses the body.
    fn guarded(flag: &Arc<CancelFlag>, action: Action) -> Job {
        let flag = flag.clone();
        Box::new(move || {
            if !flag.is_cancelled() {
                action();
            }
        })
    }
}

impl Default for SerialScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for SerialScheduler {
    fn schedule(&self, action: Action) -> Option<Handle> {
        let flag = CancelFlag::new();
        self.queue.submit(Self::guarded(&flag, action));
        let handle: Handle = flag;
        Some(handle)
    }
}

impl DateScheduler for SerialScheduler {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn schedule_at(&self, at: DateTime<Utc>, action: Action) -> Option<Handle> {
        let flag = CancelFlag::new();
        let delay = delay_between(self.now(), at);
        self.queue.submit_after(delay, Self::guarded(&flag, action));
        let handle: Handle = flag;
        Some(handle)
    }

    fn schedule_repeating(
        &self,
        start: DateTime<Utc>,
        interval: TimeDelta,
        leeway: TimeDelta,
        mut action: RepeatAction,
    ) -> Option<Handle> {
        assert!(
            interval > TimeDelta::zero(),
            "repeat interval must be positive, got {interval}"
        );
        let flag = CancelFlag::new();
        let guard = flag.clone();
        let abort = self.queue.submit_periodic(
            delay_between(self.now(), start),
            clamp_to_delay(interval),
            clamp_to_delay(leeway),
            move || {
                // The timer source is cancelled as a whole; this guard only
                // stops fires that were queued before the abort landed.
                if !guard.is_cancelled() {
                    action();
                }
            },
        );
        let handle: Handle = TaskCancel::new(flag, abort);
        Some(handle)
    }
}
