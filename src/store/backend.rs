//! Counter store trait and the operations it executes.

use thiserror::Error;

/// Failure reported by a counter store.
///
/// The series layer never inspects these beyond logging; they reach the
/// caller exactly as the store produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("WRONGTYPE operation against key {key:?} holding the wrong kind of value")]
    WrongType { key: String },

    #[error("increment or decrement would overflow for key {key:?}")]
    Overflow { key: String },

    #[error("corrupt member {member:?} in ordered set {set:?}")]
    CorruptMember { set: String, member: String },

    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true if the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// Result type alias for store calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A single command inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Add `member` with `score` to the ordered set `set`
    OrderedSetAdd {
        set: String,
        score: i64,
        member: String,
    },
    /// Increment the counter at `key` by one
    CounterIncrement { key: String },
}

/// Reply to one [`StoreOp`], in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreReply {
    /// Whether the member was newly added
    Added(bool),
    /// Counter value after the increment
    Counter(i64),
}

/// Trait for ordered key-value stores that can hold bucketed counters.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    /// Add a member to an ordered set. Re-adding the same (score, member) is a no-op.
    async fn ordered_set_add(&self, set: &str, score: i64, member: &str) -> StoreResult<bool>;

    /// Atomically increment a counter, creating it at 0 first if absent.
    async fn counter_increment(&self, key: &str) -> StoreResult<i64>;

    /// Execute all operations as one indivisible unit.
    ///
    /// Either every operation is applied and one reply per operation is
    /// returned, or none is applied and the error is returned.
    async fn atomic_batch(&self, ops: Vec<StoreOp>) -> StoreResult<Vec<StoreReply>>;

    /// Members of an ordered set between two inclusive ranks, ascending by score.
    ///
    /// Negative ranks count from the end, so `(0, -1)` is the whole set.
    async fn ordered_set_range(&self, set: &str, start: isize, stop: isize)
        -> StoreResult<Vec<String>>;

    /// Every member of an ordered set, ascending by score, paired with the
    /// counter stored under the member's own key.
    async fn sort_by_external_scores(&self, set: &str) -> StoreResult<Vec<(String, Option<i64>)>>;

    /// Short name of the backend for logs.
    fn backend_name(&self) -> &'static str;
}

/// Resolves Redis-style inclusive ranks against a collection of `len` items.
pub(crate) fn resolve_ranks(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = isize::try_from(len).ok()?;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}
