//! Native serial work queue on top of tokio.
//!
//! One consumer task drains an unbounded channel in FIFO order, so every
//! submission against the same [`WorkQueue`] executes serially even when the
//! backing runtime multiplexes tasks across worker threads. Delayed and
//! periodic submission are built from the runtime's timer and feed the same
//! channel, keeping timer fires serialized with ordinary work.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle as RuntimeHandle};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Boxed job submitted to a queue.
pub type Job = Box<dyn FnOnce() + Send>;

// ── Priority classes ─────────────────────────────────────────────────

/// Priority class mapped to a process-wide default queue.
///
/// Each class owns one lazily started dedicated queue; all schedulers
/// constructed for the same class share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Default,
    Low,
}

impl Priority {
    fn label(self) -> &'static str {
        match self {
            Priority::High => "takt-high",
            Priority::Default => "takt-default",
            Priority::Low => "takt-low",
        }
    }
}

/// Process-wide default queue for a priority class.
pub fn default_queue(priority: Priority) -> &'static WorkQueue {
    static HIGH: OnceLock<WorkQueue> = OnceLock::new();
    static DEFAULT: OnceLock<WorkQueue> = OnceLock::new();
    static LOW: OnceLock<WorkQueue> = OnceLock::new();

    let slot = match priority {
        Priority::High => &HIGH,
        Priority::Default => &DEFAULT,
        Priority::Low => &LOW,
    };
    slot.get_or_init(|| WorkQueue::dedicated(priority.label()))
}

/// Process-wide queue pinned to the designated main worker.
///
/// Everything submitted here runs on one fixed named thread, which makes it
/// the conventional home for UI/event-loop-owned state.
pub fn main_queue() -> &'static WorkQueue {
    static MAIN: OnceLock<WorkQueue> = OnceLock::new();
    MAIN.get_or_init(|| WorkQueue::dedicated("takt-main"))
}

// ── WorkQueue ────────────────────────────────────────────────────────

/// FIFO-serial work queue.
///
/// Cloning yields another sender onto the same queue; all clones share the
/// single consumer, so submissions from any clone stay totally ordered.
#[derive(Clone)]
pub struct WorkQueue {
    label: String,
    tx: UnboundedSender<Job>,
    runtime: RuntimeHandle,
}

impl WorkQueue {
    /// Create a queue whose consumer runs on the ambient tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime. A missing runtime is a
    /// process-level configuration failure, not a recoverable error.
    pub fn new(label: impl Into<String>) -> Self {
        Self::on_runtime(label.into(), RuntimeHandle::current())
    }

    fn on_runtime(label: String, runtime: RuntimeHandle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        debug!(queue = %label, "starting serial work queue");
        runtime.spawn(async move {
            while let Some(job) = rx.recv().await {
                job();
            }
        });
        Self { label, tx, runtime }
    }

    /// Create a queue backed by its own dedicated worker thread.
    ///
    /// The process-wide default queues are built this way: they must exist
    /// with no ambient runtime and stay pinned to one fixed logical worker.
    pub fn dedicated(label: &str) -> Self {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("work queue runtime");
        let handle = runtime.handle().clone();
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        debug!(queue = label, "starting dedicated work queue thread");
        std::thread::Builder::new()
            .name(label.to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    while let Some(job) = rx.recv().await {
                        job();
                    }
                });
            })
            .expect("work queue thread");
        Self {
            label: label.to_string(),
            tx,
            runtime: handle,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Submit a job for FIFO execution. Never blocks the caller.
    pub fn submit(&self, job: Job) {
        trace!(queue = %self.label, "submit");
        // The consumer lives as long as any sender; send only fails during
        // process teardown, at which point the job is moot.
        let _ = self.tx.send(job);
    }

    /// Submit a job after `delay`. The job joins the FIFO order at the
    /// moment the delay elapses, not at submission time.
    pub fn submit_after(&self, delay: Duration, job: Job) {
        trace!(queue = %self.label, ?delay, "submit after delay");
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(job);
        });
    }

    /// Start a periodic timer anchored `start_delay` from now, firing every
    /// `period`. Each fire is submitted onto the queue, so fires serialize
    /// with ordinary work. A positive `leeway` lets the timer coalesce: ticks
    /// it missed are skipped instead of replayed in a burst.
    ///
    /// Aborting the returned handle stops all future fires; a fire already
    /// handed to the queue still runs unless the caller guards it.
    ///
    /// # Panics
    /// Panics if `period` is zero.
    pub fn submit_periodic(
        &self,
        start_delay: Duration,
        period: Duration,
        leeway: Duration,
        fire: impl FnMut() + Send + 'static,
    ) -> AbortHandle {
        assert!(period > Duration::ZERO, "periodic timer requires a positive period");
        trace!(queue = %self.label, ?start_delay, ?period, ?leeway, "starting periodic timer");
        let tx = self.tx.clone();
        let fire = Arc::new(Mutex::new(fire));
        let task = self.runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + start_delay, period);
            if leeway > Duration::ZERO {
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            }
            loop {
                ticker.tick().await;
                let fire = fire.clone();
                let _ = tx.send(Box::new(move || (&mut *fire.lock())()));
            }
        });
        task.abort_handle()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
