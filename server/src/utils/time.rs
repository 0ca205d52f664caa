//! Time utility functions

use chrono::Utc;

/// Number of digits at which an epoch value is treated as microseconds
/// rather than seconds
const MICROS_MIN_DIGITS: usize = 16;

/// Convert nanoseconds since Unix epoch to microseconds since Unix epoch
///
/// Negative inputs clamp to zero.
pub fn nanos_to_micros(nanos: i64) -> u64 {
    if nanos <= 0 {
        return 0;
    }
    (nanos / 1_000) as u64
}

/// Current time as microseconds since Unix epoch
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

/// Interpret an epoch value whose unit depends on its magnitude
///
/// Values with fewer than 16 digits are seconds, anything longer is
/// microseconds. Returns microseconds.
pub fn epoch_to_micros(value: i64) -> i64 {
    if value.unsigned_abs().to_string().len() < MICROS_MIN_DIGITS {
        value.saturating_mul(1_000_000)
    } else {
        value
    }
}
