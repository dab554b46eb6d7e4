//! Rustle - time-bucketed counters over an ordered key-value store.
//!
//! Counters are appended into fixed-width time buckets held in a store that
//! offers sorted sets and atomic increments. Reads rebuild a dense,
//! zero-filled series and can roll it up into coarser buckets.
//!
//! # Architecture
//!
//! - `core`: errors, configuration, series keys and timestamp normalization
//! - `series`: bucketing, range building, rollup and the `Counter` handle
//! - `store`: the `CounterStore` contract and an in-memory implementation
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use rustle_lib::core::{SeriesConfig, SeriesKey};
//! use rustle_lib::series::{AggregateOptions, Counter};
//! use rustle_lib::store::{CounterStore, InMemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store: Arc<dyn CounterStore> = Arc::new(InMemoryStore::new());
//!     let key = SeriesKey::new("cssminifier", "hits", "homepage")?;
//!     let hits = Counter::new(store, &SeriesConfig::sum(&key, 60, 1440))?;
//!
//!     hits.increment(None).await?;
//!     let hourly = hits.aggregate(&AggregateOptions::new(3600)).await?;
//!     println!("{hourly:?}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod core;
pub mod series;
pub mod store;

// Re-export core types for convenience
pub use crate::core::{Config, Result, RustleError};
pub use crate::series::Counter;
