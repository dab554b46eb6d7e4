//! In-process counter store.
//!
//! Holds ordered sets and integer counters behind a single lock so a batch
//! is applied all-or-nothing. The whole state can be written to and read
//! back from a JSON snapshot file.

use super::backend::{resolve_ranks, CounterStore, StoreError, StoreOp, StoreReply, StoreResult};
use crate::core::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ffi::OsString;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Ordered set keyed by member, iterated by (score, member).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(i64, String)>", into = "Vec<(i64, String)>")]
struct SortedSet {
    scores: HashMap<String, i64>,
    order: BTreeSet<(i64, String)>,
}

impl SortedSet {
    /// Returns true if the member was not present before.
    fn insert(&mut self, score: i64, member: &str) -> bool {
        match self.scores.insert(member.to_string(), score) {
            Some(previous) if previous == score => false,
            Some(previous) => {
                self.order.remove(&(previous, member.to_string()));
                self.order.insert((score, member.to_string()));
                false
            },
            None => {
                self.order.insert((score, member.to_string()));
                true
            },
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn members(&self) -> impl Iterator<Item = &String> + '_ {
        self.order.iter().map(|(_, member)| member)
    }
}

impl From<Vec<(i64, String)>> for SortedSet {
    fn from(entries: Vec<(i64, String)>) -> Self {
        let mut set = SortedSet::default();
        for (score, member) in entries {
            set.insert(score, &member);
        }
        set
    }
}

impl From<SortedSet> for Vec<(i64, String)> {
    fn from(set: SortedSet) -> Self {
        set.order.into_iter().collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    sets: BTreeMap<String, SortedSet>,
    counters: BTreeMap<String, i64>,
}

impl StoreState {
    fn check(&self, op: &StoreOp) -> StoreResult<()> {
        match op {
            StoreOp::OrderedSetAdd { set, .. } if self.counters.contains_key(set) => {
                Err(StoreError::WrongType { key: set.clone() })
            },
            StoreOp::CounterIncrement { key } if self.sets.contains_key(key) => {
                Err(StoreError::WrongType { key: key.clone() })
            },
            StoreOp::CounterIncrement { key } => {
                let current = self.counters.get(key).copied().unwrap_or(0);
                current
                    .checked_add(1)
                    .map(|_| ())
                    .ok_or_else(|| StoreError::Overflow { key: key.clone() })
            },
            StoreOp::OrderedSetAdd { .. } => Ok(()),
        }
    }

    /// Applies an operation that already passed `check`.
    fn apply(&mut self, op: StoreOp) -> StoreReply {
        match op {
            StoreOp::OrderedSetAdd { set, score, member } => {
                StoreReply::Added(self.sets.entry(set).or_default().insert(score, &member))
            },
            StoreOp::CounterIncrement { key } => {
                let counter = self.counters.entry(key).or_insert(0);
                *counter = counter.saturating_add(1);
                StoreReply::Counter(*counter)
            },
        }
    }
}

/// Point-in-time figures about the store contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of ordered sets
    pub sets: usize,
    /// Number of counters
    pub counters: usize,
    /// Batches executed since creation
    pub batches_executed: u64,
    /// Operations applied since creation, batched or not
    pub ops_applied: u64,
}

/// Counter store kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    batches_executed: AtomicU64,
    ops_applied: AtomicU64,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a snapshot written by [`InMemoryStore::save_snapshot`].
    pub async fn load_snapshot(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let state: StoreState = serde_json::from_slice(&bytes)?;
        tracing::info!(
            "Loaded snapshot from {:?}: {} sets, {} counters",
            path,
            state.sets.len(),
            state.counters.len()
        );
        Ok(Self {
            state: RwLock::new(state),
            ..Self::default()
        })
    }

    /// Load a snapshot if the file exists, otherwise start empty.
    pub async fn open(path: &Path) -> Result<Self> {
        match tokio::fs::try_exists(path).await? {
            true => Self::load_snapshot(path).await,
            false => {
                tracing::debug!("No snapshot at {:?}, starting empty", path);
                Ok(Self::new())
            },
        }
    }

    /// Write the full store contents to `path` as JSON.
    ///
    /// The snapshot goes to a `.tmp` sibling first and is renamed over `path`,
    /// so a crash mid-write leaves the previous snapshot intact.
    pub async fn save_snapshot(&self, path: &Path) -> Result<()> {
        let bytes = {
            let state = self.state.read();
            serde_json::to_vec_pretty(&*state)?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp_name = path.file_name().map(OsString::from).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);
        tokio::fs::write(&tmp_path, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        tracing::info!("Saved snapshot to {:?}", path);
        Ok(())
    }

    /// Current store statistics.
    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        StoreStats {
            sets: state.sets.len(),
            counters: state.counters.len(),
            batches_executed: self.batches_executed.load(Ordering::Relaxed),
            ops_applied: self.ops_applied.load(Ordering::Relaxed),
        }
    }

    /// Raw counter value, mostly useful in tests.
    pub fn counter(&self, key: &str) -> Option<i64> {
        self.state.read().counters.get(key).copied()
    }

    fn execute(&self, ops: Vec<StoreOp>) -> StoreResult<Vec<StoreReply>> {
        let mut state = self.state.write();
        for op in &ops {
            state.check(op)?;
        }
        self.ops_applied.fetch_add(ops.len() as u64, Ordering::Relaxed);
        Ok(ops.into_iter().map(|op| state.apply(op)).collect())
    }
}

#[async_trait::async_trait]
impl CounterStore for InMemoryStore {
    async fn ordered_set_add(&self, set: &str, score: i64, member: &str) -> StoreResult<bool> {
        let op = StoreOp::OrderedSetAdd {
            set: set.to_string(),
            score,
            member: member.to_string(),
        };
        match self.execute(vec![op])?.as_slice() {
            [StoreReply::Added(added)] => Ok(*added),
            other => Err(StoreError::Backend(format!("unexpected reply {other:?}"))),
        }
    }

    async fn counter_increment(&self, key: &str) -> StoreResult<i64> {
        let op = StoreOp::CounterIncrement {
            key: key.to_string(),
        };
        match self.execute(vec![op])?.as_slice() {
            [StoreReply::Counter(value)] => Ok(*value),
            other => Err(StoreError::Backend(format!("unexpected reply {other:?}"))),
        }
    }

    async fn atomic_batch(&self, ops: Vec<StoreOp>) -> StoreResult<Vec<StoreReply>> {
        let replies = self.execute(ops)?;
        self.batches_executed.fetch_add(1, Ordering::Relaxed);
        Ok(replies)
    }

    async fn ordered_set_range(
        &self,
        set: &str,
        start: isize,
        stop: isize,
    ) -> StoreResult<Vec<String>> {
        let state = self.state.read();
        if state.counters.contains_key(set) {
            return Err(StoreError::WrongType { key: set.to_string() });
        }
        let Some(sorted) = state.sets.get(set) else {
            return Ok(Vec::new());
        };
        let Some((first, last)) = resolve_ranks(sorted.len(), start, stop) else {
            return Ok(Vec::new());
        };
        Ok(sorted
            .members()
            .skip(first)
            .take(last - first + 1)
            .cloned()
            .collect())
    }

    async fn sort_by_external_scores(&self, set: &str) -> StoreResult<Vec<(String, Option<i64>)>> {
        let state = self.state.read();
        if state.counters.contains_key(set) {
            return Err(StoreError::WrongType { key: set.to_string() });
        }
        let Some(sorted) = state.sets.get(set) else {
            return Ok(Vec::new());
        };
        Ok(sorted
            .members()
            .map(|member| (member.clone(), state.counters.get(member).copied()))
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
