//! Absolute-time to delay conversion.
//!
//! Schedulers take absolute [`DateTime<Utc>`] targets; the underlying work
//! queue takes relative [`std::time::Duration`] delays. The conversion keeps
//! integral seconds and fractional nanoseconds separate so that repeated
//! conversions (every fire of a repeating registration) cannot accumulate
//! rounding drift.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Farthest representable instant. Draining to this horizon executes
/// everything a scheduler will ever hold.
pub const FAR_FUTURE: DateTime<Utc> = DateTime::<Utc>::MAX_UTC;

/// Delay from `from` until `to`, clamped to zero for targets that are
/// already due. Sub-second precision is preserved exactly.
pub fn delay_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    clamp_to_delay(to - from)
}

/// Non-negative substrate duration for a signed delta, clamped at zero.
pub fn clamp_to_delay(delta: TimeDelta) -> Duration {
    if delta <= TimeDelta::zero() {
        return Duration::ZERO;
    }
    Duration::new(delta.num_seconds() as u64, delta.subsec_nanos() as u32)
}
