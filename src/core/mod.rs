//! Core domain models for rustle.
//!
//! Errors, configuration, series identifiers and timestamp normalization.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, LogLevel, SeriesConfig};
pub use error::{Result, RustleError};
pub use time::{now_epoch_seconds, to_epoch_seconds, TimeInput};
pub use types::{AggregationKind, Bucket, IncrementReceipt, SeriesInfo, SeriesKey, SeriesStats};
