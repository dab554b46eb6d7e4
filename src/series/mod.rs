//! Bucketed counter series.
//!
//! - `period`: maps a timestamp to the start of its bucket
//! - `range`: turns sparse stored buckets into a dense, zero-filled range
//! - `rollup`: re-aggregates a range into coarser buckets
//! - `counter`: the per-series handle tying these to a store
//! - `registry`: handles for every configured series

pub mod counter;
pub mod period;
pub mod range;
pub mod registry;
pub mod rollup;

pub use counter::{AggregateOptions, Counter, RangeOptions};
pub use period::bucket_start;
pub use range::{build_range, MAX_RANGE_STEPS};
pub use registry::CounterRegistry;
pub use rollup::{aggregation_for, rollup, rollup_with, Aggregation, SumAggregation};
