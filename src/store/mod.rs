//! Counter store adapters.
//!
//! The series layer talks to storage only through [`CounterStore`]; any
//! ordered key-value store with sorted sets and atomic counters can sit
//! behind it.

pub mod backend;
pub mod memory;

pub use backend::{CounterStore, StoreError, StoreOp, StoreReply, StoreResult};
pub use memory::{InMemoryStore, StoreStats};
