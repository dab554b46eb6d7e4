//! Series handle.
//!
//! A [`Counter`] is an immutable view of one series: its key, bucket width
//! and retention, plus a shared reference to the store. It holds no mutable
//! state of its own, so handles for different series never contend.

use super::period::bucket_start;
use super::range::build_range;
use super::rollup::{aggregation_for, rollup_with, Aggregation};
use crate::core::time::{now_epoch_seconds, resolve_optional, TimeInput};
use crate::core::{
    Bucket, IncrementReceipt, Result, RustleError, SeriesConfig, SeriesInfo, SeriesKey,
    SeriesStats,
};
use crate::store::{CounterStore, StoreError, StoreOp, StoreReply};
use std::fmt;
use std::sync::Arc;

/// Optional bounds of a range read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeOptions {
    /// First bucket to include, defaults to the earliest stored bucket when unset or 0
    pub from: Option<TimeInput>,
    /// Last instant to include, defaults to the latest stored bucket when unset or 0
    pub to: Option<TimeInput>,
}

impl RangeOptions {
    /// Unbounded range
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lower bound
    pub fn from(mut self, from: impl Into<TimeInput>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Sets the upper bound
    pub fn to(mut self, to: impl Into<TimeInput>) -> Self {
        self.to = Some(to.into());
        self
    }
}

/// Bounds and target width of an aggregate read.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    /// Bounds of the underlying range read
    pub range: RangeOptions,
    /// Target bucket width in seconds, a multiple of the series period
    pub period: i64,
}

impl AggregateOptions {
    /// Unbounded aggregate into `period` wide buckets
    pub fn new(period: i64) -> Self {
        AggregateOptions {
            range: RangeOptions::default(),
            period,
        }
    }

    /// Sets the lower bound
    pub fn from(mut self, from: impl Into<TimeInput>) -> Self {
        self.range = self.range.from(from);
        self
    }

    /// Sets the upper bound
    pub fn to(mut self, to: impl Into<TimeInput>) -> Self {
        self.range = self.range.to(to);
        self
    }
}

/// Handle on one bucketed counter series.
pub struct Counter {
    key: SeriesKey,
    set_name: String,
    period: i64,
    retention: i64,
    aggregation: Arc<dyn Aggregation>,
    store: Arc<dyn CounterStore>,
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("key", &self.key)
            .field("period", &self.period)
            .field("retention", &self.retention)
            .field("aggregation", &self.aggregation.kind())
            .field("store", &self.store.backend_name())
            .finish()
    }
}

impl Counter {
    /// Creates a handle after validating `options`.
    pub fn new(store: Arc<dyn CounterStore>, options: &SeriesConfig) -> Result<Self> {
        let (key, kind) = options.validate()?;
        Ok(Counter {
            set_name: key.set_name(),
            key,
            period: options.period,
            retention: options.retention,
            aggregation: aggregation_for(kind),
            store,
        })
    }

    /// Series identifier
    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    /// Bucket width in seconds
    pub fn period(&self) -> i64 {
        self.period
    }

    /// Number of periods to keep
    pub fn retention(&self) -> i64 {
        self.retention
    }

    /// Static metadata about this series.
    pub fn describe(&self) -> SeriesInfo {
        SeriesInfo {
            aggregation: self.aggregation.kind(),
            name: self.key.name().to_string(),
            domain: self.key.domain().to_string(),
            category: self.key.category().to_string(),
            period: self.period,
            retention: self.retention,
            total_capacity_seconds: self.retention.saturating_mul(self.period),
        }
    }

    /// Counts one event at `at`, or now when `at` is `None`.
    ///
    /// The index entry and the counter increment go to the store as one
    /// atomic batch.
    pub async fn increment(&self, at: Option<TimeInput>) -> Result<IncrementReceipt> {
        let timestamp = match at {
            Some(input) => input.to_epoch_seconds()?,
            None => now_epoch_seconds(),
        };
        let bucket = bucket_start(timestamp, self.period)?;
        let bucket_key = self.key.bucket_key(bucket);

        let ops = vec![
            StoreOp::OrderedSetAdd {
                set: self.set_name.clone(),
                score: bucket,
                member: bucket_key.clone(),
            },
            StoreOp::CounterIncrement { key: bucket_key },
        ];

        let replies = self.store.atomic_batch(ops).await.map_err(|e| {
            let err = RustleError::from(e);
            tracing::warn!(
                category = err.category(),
                recoverable = err.is_recoverable(),
                "Increment of {} at {} failed: {}",
                self.key,
                timestamp,
                err
            );
            err
        })?;

        let receipt = match replies.as_slice() {
            [StoreReply::Added(newly_indexed), StoreReply::Counter(count)] => IncrementReceipt {
                bucket,
                count: *count,
                newly_indexed: *newly_indexed,
            },
            other => {
                return Err(StoreError::Backend(format!(
                    "unexpected replies to increment batch: {other:?}"
                ))
                .into())
            },
        };

        tracing::debug!(
            "Incremented {} bucket {} to {} (timestamp {})",
            self.key,
            bucket,
            receipt.count,
            timestamp
        );
        Ok(receipt)
    }

    /// Period starts of every stored bucket, ascending.
    pub async fn timestamps(&self) -> Result<Vec<i64>> {
        let members = self.store.ordered_set_range(&self.set_name, 0, -1).await?;
        members.iter().map(|member| self.parse_member(member)).collect()
    }

    /// Every stored bucket with its value, ascending.
    pub async fn values(&self) -> Result<Vec<Bucket>> {
        let pairs = self.store.sort_by_external_scores(&self.set_name).await?;
        let values = pairs
            .iter()
            .map(|(member, val)| -> Result<Bucket> {
                Ok(Bucket::new(self.parse_member(member)?, val.unwrap_or(0)))
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Read {} buckets of {}", values.len(), self.key);
        Ok(values)
    }

    /// Gap-filled buckets between the optional bounds.
    pub async fn range(&self, options: &RangeOptions) -> Result<Vec<Bucket>> {
        let from = resolve_optional(options.from.as_ref())?;
        let to = resolve_optional(options.to.as_ref())?;
        let values = self.values().await?;
        build_range(&values, from, to, self.period)
    }

    /// Gap-filled range re-aggregated into `options.period` wide buckets.
    pub async fn aggregate(&self, options: &AggregateOptions) -> Result<Vec<Bucket>> {
        let dense = self.range(&options.range).await?;
        rollup_with(self.aggregation.as_ref(), &dense, self.period, options.period)
    }

    /// Bucket count, total and extent of the stored data.
    pub async fn stats(&self) -> Result<SeriesStats> {
        let values = self.values().await?;
        Ok(SeriesStats::from_buckets(&values))
    }

    fn parse_member(&self, member: &str) -> Result<i64> {
        self.key.parse_bucket_key(member).ok_or_else(|| {
            StoreError::CorruptMember {
                set: self.set_name.clone(),
                member: member.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use pretty_assertions::assert_eq;

    fn counter(store: &Arc<InMemoryStore>, period: i64) -> Counter {
        let key = SeriesKey::new("web", "hits", "homepage").unwrap();
        let store: Arc<dyn CounterStore> = Arc::clone(store) as Arc<dyn CounterStore>;
        Counter::new(store, &SeriesConfig::sum(&key, period, 1440)).unwrap()
    }

    #[test]
    fn test_describe() {
        let store = Arc::new(InMemoryStore::new());
        let info = counter(&store, 60).describe();
        assert_eq!(info.aggregation.as_str(), "sum");
        assert_eq!(info.domain, "web");
        assert_eq!(info.category, "hits");
        assert_eq!(info.name, "homepage");
        assert_eq!(info.period, 60);
        assert_eq!(info.retention, 1440);
        assert_eq!(info.total_capacity_seconds, 86_400);
    }

    #[test]
    fn test_new_rejects_bad_options() {
        let store: Arc<dyn CounterStore> = Arc::new(InMemoryStore::new());
        let key = SeriesKey::new("web", "hits", "homepage").unwrap();
        let mut options = SeriesConfig::sum(&key, 60, 10);
        options.aggregation = "median".to_string();
        assert!(matches!(
            Counter::new(store, &options),
            Err(RustleError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_increment_writes_index_and_counter() {
        let store = Arc::new(InMemoryStore::new());
        let counter = counter(&store, 60);

        let first = counter.increment(Some(100_i64.into())).await.unwrap();
        assert_eq!(first, IncrementReceipt { bucket: 60, count: 1, newly_indexed: true });

        let second = counter.increment(Some(105_i64.into())).await.unwrap();
        assert_eq!(second, IncrementReceipt { bucket: 60, count: 2, newly_indexed: false });

        assert_eq!(store.counter("web:hits:homepage:60"), Some(2));
        assert_eq!(counter.timestamps().await.unwrap(), vec![60]);
    }

    #[tokio::test]
    async fn test_increment_defaults_to_now() {
        let store = Arc::new(InMemoryStore::new());
        let counter = counter(&store, 60);
        let before = bucket_start(now_epoch_seconds(), 60).unwrap();
        let receipt = counter.increment(None).await.unwrap();
        assert!(receipt.bucket >= before);
        assert_eq!(receipt.bucket % 60, 0);
    }

    #[tokio::test]
    async fn test_bad_timestamp_touches_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let counter = counter(&store, 60);
        let err = counter.increment(Some("not a date".into())).await.unwrap_err();
        assert!(matches!(err, RustleError::InvalidTimestampFormat(_)));
        assert_eq!(store.stats().ops_applied, 0);
    }

    #[tokio::test]
    async fn test_values_range_and_aggregate() {
        let store = Arc::new(InMemoryStore::new());
        let counter = counter(&store, 60);
        for ts in [100_i64, 105, 200] {
            counter.increment(Some(ts.into())).await.unwrap();
        }

        assert_eq!(
            counter.values().await.unwrap(),
            vec![Bucket::new(60, 2), Bucket::new(180, 1)]
        );
        assert_eq!(
            counter.range(&RangeOptions::new().to(240_i64)).await.unwrap(),
            vec![Bucket::new(60, 2), Bucket::new(120, 0), Bucket::new(180, 1), Bucket::new(240, 0)]
        );
        assert_eq!(
            counter.aggregate(&AggregateOptions::new(120).to(240_i64)).await.unwrap(),
            vec![Bucket::new(0, 2), Bucket::new(120, 1), Bucket::new(240, 0)]
        );
        assert_eq!(
            counter.stats().await.unwrap(),
            SeriesStats { buckets: 2, total: 3, first: Some(60), last: Some(180) }
        );
    }

    #[tokio::test]
    async fn test_aggregate_rejects_incompatible_period() {
        let store = Arc::new(InMemoryStore::new());
        let counter = counter(&store, 60);
        counter.increment(Some(100_i64.into())).await.unwrap();
        assert!(matches!(
            counter.aggregate(&AggregateOptions::new(90)).await,
            Err(RustleError::IncompatiblePeriod { native: 60, target: 90 })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_member_is_reported() {
        let store = Arc::new(InMemoryStore::new());
        let counter = counter(&store, 60);
        store.ordered_set_add("web:hits:homepage", 1, "garbage").await.unwrap();
        let err = counter.values().await.unwrap_err();
        assert!(matches!(err, RustleError::Store(StoreError::CorruptMember { .. })));
    }

    #[tokio::test]
    async fn test_empty_series_reads() {
        let store = Arc::new(InMemoryStore::new());
        let counter = counter(&store, 60);
        assert!(counter.timestamps().await.unwrap().is_empty());
        assert!(counter.values().await.unwrap().is_empty());
        assert!(counter.range(&RangeOptions::new().from(0_i64).to(600_i64)).await.unwrap().is_empty());
        assert!(counter.aggregate(&AggregateOptions::new(120)).await.unwrap().is_empty());
        assert_eq!(counter.stats().await.unwrap(), SeriesStats::default());
    }
}
