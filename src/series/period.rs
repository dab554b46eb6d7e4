//! Period bucketing.

use crate::core::{Result, RustleError};

/// Start of the `period`-wide bucket containing `epoch_seconds`.
///
/// This is the greatest multiple of `period` not exceeding the timestamp,
/// including for timestamps before the epoch. Timestamps so close to
/// `i64::MIN` that the bucket start is not representable are rejected.
pub fn bucket_start(epoch_seconds: i64, period: i64) -> Result<i64> {
    let period = check_period(period)?;
    epoch_seconds
        .checked_sub(epoch_seconds.rem_euclid(period))
        .ok_or_else(|| {
            RustleError::timestamp(format!(
                "{epoch_seconds} has no representable bucket start for period {period}"
            ))
        })
}

/// Rejects non-positive periods.
pub fn check_period(period: i64) -> Result<i64> {
    if period <= 0 {
        return Err(RustleError::InvalidPeriod(period));
    }
    Ok(period)
}
