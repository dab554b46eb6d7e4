//! Common test utilities and fixtures.

#![allow(dead_code)]

use parking_lot::Mutex;
use rustle_lib::core::{SeriesConfig, SeriesKey};
use rustle_lib::series::Counter;
use rustle_lib::store::{
    CounterStore, InMemoryStore, StoreError, StoreOp, StoreReply, StoreResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Key used by most tests.
pub fn homepage() -> SeriesKey {
    SeriesKey::new("cssminifier", "hits", "homepage").unwrap()
}

/// A sum counter over a fresh in-memory store.
pub fn memory_counter(period: i64) -> (Arc<InMemoryStore>, Counter) {
    let store = Arc::new(InMemoryStore::new());
    let shared: Arc<dyn CounterStore> = Arc::clone(&store) as Arc<dyn CounterStore>;
    let counter = Counter::new(shared, &SeriesConfig::sum(&homepage(), period, 1440)).unwrap();
    (store, counter)
}

/// Increments `counter` once per timestamp.
pub async fn increment_all(counter: &Counter, timestamps: &[i64]) {
    for ts in timestamps {
        counter.increment(Some((*ts).into())).await.unwrap();
    }
}

/// Store that fails every call with the same error.
pub struct FailingStore {
    error: StoreError,
    pub calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(error: StoreError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    fn fail<T>(&self) -> StoreResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

#[async_trait::async_trait]
impl CounterStore for FailingStore {
    async fn ordered_set_add(&self, _set: &str, _score: i64, _member: &str) -> StoreResult<bool> {
        self.fail()
    }

    async fn counter_increment(&self, _key: &str) -> StoreResult<i64> {
        self.fail()
    }

    async fn atomic_batch(&self, _ops: Vec<StoreOp>) -> StoreResult<Vec<StoreReply>> {
        self.fail()
    }

    async fn ordered_set_range(
        &self,
        _set: &str,
        _start: isize,
        _stop: isize,
    ) -> StoreResult<Vec<String>> {
        self.fail()
    }

    async fn sort_by_external_scores(&self, _set: &str) -> StoreResult<Vec<(String, Option<i64>)>> {
        self.fail()
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Store that records every batch before delegating to an in-memory store.
#[derive(Default)]
pub struct RecordingStore {
    inner: InMemoryStore,
    pub batches: Mutex<Vec<Vec<StoreOp>>>,
    pub single_calls: AtomicUsize,
}

#[async_trait::async_trait]
impl CounterStore for RecordingStore {
    async fn ordered_set_add(&self, set: &str, score: i64, member: &str) -> StoreResult<bool> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.ordered_set_add(set, score, member).await
    }

    async fn counter_increment(&self, key: &str) -> StoreResult<i64> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.counter_increment(key).await
    }

    async fn atomic_batch(&self, ops: Vec<StoreOp>) -> StoreResult<Vec<StoreReply>> {
        self.batches.lock().push(ops.clone());
        self.inner.atomic_batch(ops).await
    }

    async fn ordered_set_range(
        &self,
        set: &str,
        start: isize,
        stop: isize,
    ) -> StoreResult<Vec<String>> {
        self.inner.ordered_set_range(set, start, stop).await
    }

    async fn sort_by_external_scores(&self, set: &str) -> StoreResult<Vec<(String, Option<i64>)>> {
        self.inner.sort_by_external_scores(set).await
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}
