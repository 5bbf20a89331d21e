//! Cancellation handles for pending work.
//!
//! A handle represents one pending unit of work owned by a scheduler: it can
//! be withdrawn before it runs ([`Cancel::cancel`]) and queried
//! ([`Cancel::is_cancelled`]). [`SwapCancel`] lets one handle track a moving
//! target, which repeating registrations need because every repetition
//! produces a fresh pending entry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tracing::trace;

/// Capability to withdraw a previously scheduled action.
pub trait Cancel: Send + Sync {
    /// Withdraw the pending work. Idempotent.
    ///
    /// Once this returns, the guarded action body will never start executing.
    /// A body already running cannot be aborted mid-execution.
    fn cancel(&self);

    /// Whether this handle has been withdrawn.
    fn is_cancelled(&self) -> bool;
}

/// Shared handle type returned by schedulers.
pub type Handle = Arc<dyn Cancel>;

// ── CancelFlag ───────────────────────────────────────────────────────

/// Plain boolean withdrawal flag for one-shot work.
///
/// The scheduler wrapper reads the flag immediately before invoking the
/// action body, so a cancel that lands after submission to the underlying
/// queue but before execution still suppresses the body.
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
}

impl CancelFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl Cancel for CancelFlag {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ── SwapCancel ───────────────────────────────────────────────────────

/// Handle over a replaceable inner handle.
///
/// A repeating registration re-arms itself after every fire, producing a new
/// pending entry each time. The chain shares one `SwapCancel` and points it
/// at the newest entry via [`SwapCancel::replace`], so a single withdrawal
/// at any point cancels the entire remaining series.
#[derive(Default)]
pub struct SwapCancel {
    cancelled: AtomicBool,
    inner: Mutex<Option<Handle>>,
}

impl SwapCancel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Point this handle at the next pending entry in the chain.
    ///
    /// If the handle was already cancelled, the incoming entry is cancelled
    /// on the spot: a withdrawal racing a re-arm must still stop the chain.
    /// The previously held inner (already fired or superseded) is cancelled
    /// as it is released, which closes the same race from the other side.
    pub fn replace(&self, next: Handle) {
        let mut inner = self.inner.lock();
        if self.cancelled.load(Ordering::SeqCst) {
            drop(inner);
            next.cancel();
            return;
        }
        let prev = inner.replace(next);
        drop(inner);
        if let Some(prev) = prev {
            prev.cancel();
        }
    }
}

impl Cancel for SwapCancel {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let taken = self.inner.lock().take();
        if let Some(inner) = taken {
            inner.cancel();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ── TaskCancel ───────────────────────────────────────────────────────

/// Handle over a live periodic timer task.
///
/// Periodic timers are only withdrawable as a whole: cancelling aborts the
/// backing task so no further fires are produced. The shared flag
/// additionally guards fires that were already queued but have not run yet.
pub struct TaskCancel {
    flag: Arc<CancelFlag>,
    abort: AbortHandle,
}

impl TaskCancel {
    /// `flag` is shared with the timer's fire guard so a withdrawal also
    /// suppresses fires that were submitted before the abort landed.
    pub fn new(flag: Arc<CancelFlag>, abort: AbortHandle) -> Arc<Self> {
        Arc::new(Self { flag, abort })
    }
}

impl Cancel for TaskCancel {
    fn cancel(&self) {
        self.flag.cancel();
        trace!("aborting periodic timer task");
        self.abort.abort();
    }

    fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
