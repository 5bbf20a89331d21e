//! Synchronous baseline scheduler.

use takt_core::Handle;

use crate::scheduler::{Action, Scheduler};

/// Executes every action synchronously on the caller's thread.
///
/// Returns no handle: by the time `schedule` returns the action has already
/// completed, so withdrawal is meaningless.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, action: Action) -> Option<Handle> {
        action();
        None
    }
}
