//! Dense range reconstruction.
//!
//! The store only holds buckets that were incremented at least once. A range
//! materializes every bucket between two bounds, with zero for the ones the
//! store never saw.

use super::period::{bucket_start, check_period};
use crate::core::{Bucket, Result, RustleError};
use std::collections::HashMap;

/// Upper bound on the number of buckets a single range may materialize.
pub const MAX_RANGE_STEPS: u64 = 10_000_000;

/// Builds a gap-filled range from sparse, ascending buckets.
///
/// `from` defaults to the earliest stored bucket and `to` to the latest. A
/// bound of 0 counts as unset and falls back the same way. `from > to` yields
/// an empty range; otherwise `from` is snapped down to its bucket start.
/// Empty input yields an empty range whatever the bounds. When the same `ts`
/// appears twice the later value wins.
pub fn build_range(
    sparse: &[Bucket],
    from: Option<i64>,
    to: Option<i64>,
    period: i64,
) -> Result<Vec<Bucket>> {
    let period = check_period(period)?;
    let (Some(min_ts), Some(max_ts)) = (
        sparse.iter().map(|b| b.ts).min(),
        sparse.iter().map(|b| b.ts).max(),
    ) else {
        return Ok(Vec::new());
    };

    let from = from.filter(|&t| t != 0).unwrap_or(min_ts);
    let to = to.filter(|&t| t != 0).unwrap_or(max_ts);
    if from > to {
        return Ok(Vec::new());
    }
    let from = bucket_start(from, period)?;

    let steps = (i128::from(to) - i128::from(from)) / i128::from(period) + 1;
    if steps > i128::from(MAX_RANGE_STEPS) {
        return Err(RustleError::InvalidRange {
            from,
            to,
            period,
            max_steps: MAX_RANGE_STEPS,
        });
    }

    let lookup: HashMap<i64, i64> = sparse.iter().map(|b| (b.ts, b.val)).collect();
    let mut dense = Vec::with_capacity(usize::try_from(steps).unwrap_or(0));
    let mut ts = from;
    loop {
        dense.push(Bucket::new(ts, lookup.get(&ts).copied().unwrap_or(0)));
        match ts.checked_add(period) {
            Some(next) if next <= to => ts = next,
            _ => break,
        }
    }
    Ok(dense)
}
