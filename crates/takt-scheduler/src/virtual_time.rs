//! Deterministic virtual-time scheduler.
//!
//! Time is a value advanced explicitly by the caller, never by the wall
//! clock. Pending actions sit in a queue ordered by execute-at instant with
//! submission order breaking ties, and are drained synchronously inside
//! [`TestScheduler::advance_to`]. The same sequence of advances always
//! produces the same sequence of executions, which is what makes this the
//! substrate of choice for tests: production code written against
//! [`DateScheduler`] runs unmodified under a clock the test controls.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::{Mutex, ReentrantMutex};
use takt_core::{Cancel, Handle, SwapCancel, FAR_FUTURE};
use tracing::trace;

use crate::scheduler::{Action, DateScheduler, RepeatAction, Scheduler};

type EntryKey = (DateTime<Utc>, u64);

struct State {
    now: DateTime<Utc>,
    next_seq: u64,
    pending: BTreeMap<EntryKey, Action>,
}

/// The re-entrant lock lets an action body call back into the scheduler it
/// is running on; the `RefCell` borrow is released around each body so those
/// calls can re-borrow without panicking.
type Shared = Arc<ReentrantMutex<RefCell<State>>>;

/// Date-aware scheduler over an explicitly advanced virtual clock.
///
/// Clones share the same clock and pending queue. All entry points serialize
/// on one re-entrant lock: callers from other threads contend for it, and
/// actions execute synchronously inside whichever caller invoked
/// `advance_to`/`advance_by`/`run`.
#[derive(Clone)]
pub struct TestScheduler {
    state: Shared,
}

impl TestScheduler {
    /// Scheduler whose clock starts at the Unix epoch.
    pub fn new() -> Self {
        Self::starting_at(DateTime::UNIX_EPOCH)
    }

    /// Scheduler whose clock starts at `epoch`.
    pub fn starting_at(epoch: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(ReentrantMutex::new(RefCell::new(State {
                now: epoch,
                next_seq: 0,
                pending: BTreeMap::new(),
            }))),
        }
    }

    /// Move the virtual clock forward to `to`, executing every pending
    /// action whose instant has been reached, in execute-at order with
    /// submission order breaking ties. Entries inserted while draining are
    /// executed in the same pass once their instant is reached in sorted
    /// order. On return, every remaining entry is strictly in the future.
    ///
    /// Actions run synchronously on the calling thread and may re-enter this
    /// scheduler, including nested `advance_to` calls, which observe and
    /// extend the updated clock.
    ///
    /// # Panics
    /// Panics if `to` is earlier than the current virtual time. The clock is
    /// monotonic; moving it backward is a programming error.
    pub fn advance_to(&self, to: DateTime<Utc>) {
        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            assert!(
                to >= state.now,
                "virtual clock cannot move backward (now {}, requested {})",
                state.now,
                to
            );
            state.now = to;
        }
        loop {
            // Peek under a short borrow, then release it before running the
            // body so the body can re-enter.
            let due = {
                let state = guard.borrow();
                match state.pending.first_key_value() {
                    Some((&(at, seq), _)) if at <= state.now => Some((at, seq)),
                    _ => None,
                }
            };
            let Some((at, seq)) = due else { break };
            let action = guard.borrow_mut().pending.remove(&(at, seq));
            if let Some(action) = action {
                trace!(%at, seq, "virtual drain");
                action();
            }
        }
    }

    /// Equivalent to `advance_to(now() + interval)`.
    ///
    /// # Panics
    /// Panics if `interval` is negative (the clock would move backward).
    pub fn advance_by(&self, interval: TimeDelta) {
        let guard = self.state.lock();
        let target = guard.borrow().now + interval;
        drop(guard);
        self.advance_to(target);
    }

    /// Drain everything ever scheduled by advancing to the farthest
    /// representable instant.
    ///
    /// A live repeating registration re-arms itself inside the drained
    /// horizon forever, so `run` does not return while one exists. Withdraw
    /// repeating work first, or advance to an explicit date instead.
    pub fn run(&self) {
        self.advance_to(FAR_FUTURE);
    }
}

impl Default for TestScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TestScheduler {
    fn schedule(&self, action: Action) -> Option<Handle> {
        // Runs at the current virtual instant once drained.
        let guard = self.state.lock();
        let now = guard.borrow().now;
        Some(insert(&self.state, now, action))
    }
}

impl DateScheduler for TestScheduler {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().borrow().now
    }

    fn schedule_at(&self, at: DateTime<Utc>, action: Action) -> Option<Handle> {
        Some(insert(&self.state, at, action))
    }

    /// Leeway has no effect under virtual time: a deterministic clock has no
    /// tolerance concept. It is accepted for interface compatibility.
    fn schedule_repeating(
        &self,
        start: DateTime<Utc>,
        interval: TimeDelta,
        _leeway: TimeDelta,
        action: RepeatAction,
    ) -> Option<Handle> {
        assert!(
            interval > TimeDelta::zero(),
            "repeat interval must be positive, got {interval}"
        );
        let chain = SwapCancel::new();
        arm(&self.state, &chain, Arc::new(Mutex::new(action)), start, interval);
        let handle: Handle = chain;
        Some(handle)
    }
}

/// Insert one pending entry and hand back a handle that removes exactly that
/// entry by identity.
fn insert(state: &Shared, at: DateTime<Utc>, action: Action) -> Handle {
    let guard = state.lock();
    let seq = {
        let mut st = guard.borrow_mut();
        let seq = st.next_seq;
        st.next_seq += 1;
        st.pending.insert((at, seq), action);
        seq
    };
    trace!(%at, seq, "virtual schedule");
    Arc::new(EntryCancel {
        state: Arc::downgrade(state),
        key: (at, seq),
        cancelled: AtomicBool::new(false),
    })
}

/// Schedule the next occurrence of a repeating registration and point the
/// shared chain handle at it.
///
/// Each occurrence's wrapper runs the body, then re-arms at `at + interval`
/// through this same path, so one withdrawal of `chain` at any time cancels
/// the entire remaining series.
fn arm(
    state: &Shared,
    chain: &Arc<SwapCancel>,
    action: Arc<Mutex<RepeatAction>>,
    at: DateTime<Utc>,
    interval: TimeDelta,
) {
    let next_state = state.clone();
    let next_chain = chain.clone();
    let next_action = action.clone();
    let wrapper: Action = Box::new(move || {
        {
            let mut body = next_action.lock();
            (&mut *body)();
        }
        if !next_chain.is_cancelled() {
            arm(&next_state, &next_chain, next_action, at + interval, interval);
        }
    });
    chain.replace(insert(state, at, wrapper));
}

/// Handle removing one exact pending entry.
struct EntryCancel {
    state: Weak<ReentrantMutex<RefCell<State>>>,
    key: EntryKey,
    cancelled: AtomicBool,
}

impl Cancel for EntryCancel {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(state) = self.state.upgrade() {
            let guard = state.lock();
            let removed = guard.borrow_mut().pending.remove(&self.key).is_some();
            trace!(at = %self.key.0, seq = self.key.1, removed, "virtual cancel");
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
