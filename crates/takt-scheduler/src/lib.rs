//! Substrate-independent work scheduling.
//!
//! Clients hold a [`Scheduler`] or [`DateScheduler`] and enqueue zero-argument
//! actions; where and when the action runs is the concrete scheduler's
//! business. The same client code can be driven by a real serial work queue
//! in production ([`SerialScheduler`], [`MainScheduler`]) and by an
//! explicitly advanced virtual clock in tests ([`TestScheduler`]), with
//! identical ordering and cancellation semantics.

pub mod immediate;
pub mod main_thread;
pub mod queue;
pub mod scheduler;
pub mod serial;
pub mod virtual_time;

pub use immediate::ImmediateScheduler;
pub use main_thread::MainScheduler;
pub use queue::{Job, Priority, WorkQueue};
pub use scheduler::{Action, DateScheduler, RepeatAction, Scheduler};
pub use serial::SerialScheduler;
pub use virtual_time::TestScheduler;

pub use takt_core::{Cancel, CancelFlag, Handle, SwapCancel};
