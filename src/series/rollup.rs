//! Rollup of fine buckets into coarser ones.

use super::period::{bucket_start, check_period};
use crate::core::{AggregationKind, Bucket, Result, RustleError};
use std::fmt;
use std::sync::Arc;

/// How two values landing in the same bucket combine.
///
/// Range building and rollup are written against this trait, so a new kind
/// only needs a new implementation and an [`AggregationKind`] variant.
pub trait Aggregation: Send + Sync + fmt::Debug {
    /// The kind reported in series descriptions
    fn kind(&self) -> AggregationKind;

    /// Combines an accumulated value with the next one
    fn fold(&self, acc: i64, val: i64) -> i64;
}

/// Additive aggregation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumAggregation;

impl Aggregation for SumAggregation {
    fn kind(&self) -> AggregationKind {
        AggregationKind::Sum
    }

    #[inline]
    fn fold(&self, acc: i64, val: i64) -> i64 {
        acc.saturating_add(val)
    }
}

/// Returns the implementation for `kind`.
pub fn aggregation_for(kind: AggregationKind) -> Arc<dyn Aggregation> {
    match kind {
        AggregationKind::Sum => Arc::new(SumAggregation),
    }
}

/// Sums ascending buckets of width `native_period` into `target_period` buckets.
pub fn rollup(pairs: &[Bucket], native_period: i64, target_period: i64) -> Result<Vec<Bucket>> {
    rollup_with(&SumAggregation, pairs, native_period, target_period)
}

/// Groups ascending buckets into `target_period` buckets using `aggregation`.
///
/// Consecutive inputs whose coarse bucket start matches are folded together;
/// a change of coarse bucket emits the running value. The last group is
/// always emitted, so one input gives exactly one output and empty input
/// gives empty output. Output order follows input order.
pub fn rollup_with(
    aggregation: &dyn Aggregation,
    pairs: &[Bucket],
    native_period: i64,
    target_period: i64,
) -> Result<Vec<Bucket>> {
    let native_period = check_period(native_period)?;
    let target_period = check_period(target_period)?;
    if target_period % native_period != 0 {
        return Err(RustleError::IncompatiblePeriod {
            native: native_period,
            target: target_period,
        });
    }

    let Some((first, rest)) = pairs.split_first() else {
        return Ok(Vec::new());
    };

    let mut rolled = Vec::new();
    let mut current_start = bucket_start(first.ts, target_period)?;
    let mut total = first.val;

    for pair in rest {
        let this_start = bucket_start(pair.ts, target_period)?;
        if this_start == current_start {
            total = aggregation.fold(total, pair.val);
        } else {
            rolled.push(Bucket::new(current_start, total));
            current_start = this_start;
            total = pair.val;
        }
    }
    rolled.push(Bucket::new(current_start, total));

    Ok(rolled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buckets(pairs: &[(i64, i64)]) -> Vec<Bucket> {
        pairs.iter().copied().map(Bucket::from).collect()
    }

    #[test]
    fn test_rollup_groups_by_coarse_bucket() {
        let dense = buckets(&[(60, 2), (120, 0), (180, 1), (240, 0)]);
        assert_eq!(
            rollup(&dense, 60, 120).unwrap(),
            buckets(&[(0, 2), (120, 1), (240, 0)])
        );
    }

    #[test]
    fn test_rollup_hourly_into_daily() {
        let hourly: Vec<Bucket> = (0..48).map(|h| Bucket::new(h * 3600, 1)).collect();
        assert_eq!(
            rollup(&hourly, 3600, 86_400).unwrap(),
            buckets(&[(0, 24), (86_400, 24)])
        );
    }

    #[test]
    fn test_single_input_yields_single_output() {
        for target in [60, 120, 3600, 86_400] {
            assert_eq!(
                rollup(&buckets(&[(1_700_000_040, 9)]), 60, target).unwrap(),
                vec![Bucket::new(bucket_start(1_700_000_040, target).unwrap(), 9)]
            );
        }
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(rollup(&[], 60, 120).unwrap().is_empty());
    }

    #[test]
    fn test_sparse_input_skips_missing_groups() {
        let sparse = buckets(&[(60, 2), (600, 3), (660, 4)]);
        assert_eq!(rollup(&sparse, 60, 300).unwrap(), buckets(&[(0, 2), (600, 7)]));
    }

    #[test]
    fn test_rollup_preserves_sum() {
        let dense: Vec<Bucket> = (0..500).map(|i| Bucket::new(i * 60, (i * 7) % 13)).collect();
        let input_sum: i64 = dense.iter().map(|b| b.val).sum();
        for target in [60, 120, 300, 3600, 86_400] {
            let rolled = rollup(&dense, 60, target).unwrap();
            assert_eq!(rolled.iter().map(|b| b.val).sum::<i64>(), input_sum, "target={target}");
        }
    }

    #[test]
    fn test_same_period_is_identity_for_dense_input() {
        let dense = buckets(&[(60, 2), (120, 0), (180, 1)]);
        assert_eq!(rollup(&dense, 60, 60).unwrap(), dense);
    }

    #[test]
    fn test_incompatible_period_rejected() {
        let dense = buckets(&[(60, 2)]);
        assert!(matches!(
            rollup(&dense, 60, 90),
            Err(RustleError::IncompatiblePeriod { native: 60, target: 90 })
        ));
        assert!(matches!(rollup(&dense, 60, 30), Err(RustleError::IncompatiblePeriod { .. })));
    }

    #[test]
    fn test_invalid_periods_rejected() {
        assert!(matches!(rollup(&[], 0, 60), Err(RustleError::InvalidPeriod(0))));
        assert!(matches!(rollup(&[], 60, -120), Err(RustleError::InvalidPeriod(-120))));
    }

    #[derive(Debug)]
    struct MaxAggregation;

    impl Aggregation for MaxAggregation {
        fn kind(&self) -> AggregationKind {
            AggregationKind::Sum
        }

        fn fold(&self, acc: i64, val: i64) -> i64 {
            acc.max(val)
        }
    }

    #[test]
    fn test_rollup_with_custom_aggregation() {
        let dense = buckets(&[(0, 3), (60, 9), (120, 4), (180, 1)]);
        assert_eq!(
            rollup_with(&MaxAggregation, &dense, 60, 120).unwrap(),
            buckets(&[(0, 9), (120, 4)])
        );
    }

    #[test]
    fn test_aggregation_for_sum() {
        let agg = aggregation_for(AggregationKind::Sum);
        assert_eq!(agg.kind(), AggregationKind::Sum);
        assert_eq!(agg.fold(2, 3), 5);
    }
}
