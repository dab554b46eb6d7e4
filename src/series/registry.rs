//! Registry of configured series.

use super::counter::Counter;
use crate::core::{Config, Result, RustleError, SeriesInfo, SeriesKey, SeriesStats};
use crate::store::CounterStore;
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent map from series key to handle, built once from configuration.
pub struct CounterRegistry {
    counters: DashMap<SeriesKey, Arc<Counter>>,
}

impl CounterRegistry {
    /// Builds one handle per configured series, failing on the first invalid one.
    pub fn from_config(config: &Config, store: &Arc<dyn CounterStore>) -> Result<Self> {
        config.validate()?;
        let counters = DashMap::with_capacity(config.series.len());
        for options in &config.series {
            let counter = Counter::new(Arc::clone(store), options)?;
            counters.insert(counter.key().clone(), Arc::new(counter));
        }
        tracing::info!(
            "Registered {} series on {} store",
            counters.len(),
            store.backend_name()
        );
        Ok(Self { counters })
    }

    /// Handle for `key`, if configured.
    pub fn get(&self, key: &SeriesKey) -> Option<Arc<Counter>> {
        self.counters.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Handle for a `domain:category:name` string.
    pub fn lookup(&self, key: &str) -> Result<Arc<Counter>> {
        let parsed: SeriesKey = key.parse()?;
        self.get(&parsed)
            .ok_or_else(|| RustleError::UnknownSeries(key.to_string()))
    }

    /// Descriptions of every series, ordered by key.
    pub fn describe_all(&self) -> Vec<SeriesInfo> {
        let mut infos: Vec<SeriesInfo> = self
            .counters
            .iter()
            .map(|entry| entry.value().describe())
            .collect();
        infos.sort_by(|a, b| {
            (&a.domain, &a.category, &a.name).cmp(&(&b.domain, &b.category, &b.name))
        });
        infos
    }

    /// Stats of every series, read concurrently, ordered by key.
    pub async fn stats_all(&self) -> Result<Vec<(SeriesKey, SeriesStats)>> {
        let mut counters: Vec<Arc<Counter>> =
            self.counters.iter().map(|entry| Arc::clone(entry.value())).collect();
        counters.sort_by_key(|c| c.key().to_string());

        let reads = counters.iter().map(|counter| counter.stats());
        let results = futures::future::join_all(reads).await;

        counters
            .iter()
            .zip(results)
            .map(|(counter, stats)| -> Result<(SeriesKey, SeriesStats)> {
                Ok((counter.key().clone(), stats?))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
