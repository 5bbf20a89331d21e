pub mod cancel;
pub mod clock;

pub use cancel::{Cancel, CancelFlag, Handle, SwapCancel, TaskCancel};
pub use clock::{clamp_to_delay, delay_between, FAR_FUTURE};
