use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RustleError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown format for converting to epoch seconds: {0}")]
    InvalidTimestampFormat(String),

    #[error("Period must be a positive number of seconds, got {0}")]
    InvalidPeriod(i64),

    #[error("Range {from}..={to} with period {period} exceeds {max_steps} buckets")]
    InvalidRange {
        from: i64,
        to: i64,
        period: i64,
        max_steps: u64,
    },

    #[error("Target period {target}s is not a multiple of the series period {native}s")]
    IncompatiblePeriod { native: i64, target: i64 },

    #[error("Unknown series: {0}")]
    UnknownSeries(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for rustle operations
pub type Result<T> = std::result::Result<T, RustleError>;

impl RustleError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new timestamp format error
    pub fn timestamp<S: Into<String>>(msg: S) -> Self {
        Self::InvalidTimestampFormat(msg.into())
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Only the store can report transient failures; validation errors never are.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration(_) | Self::UnknownSeries(_) => "config",
            Self::InvalidTimestampFormat(_) => "timestamp",
            Self::InvalidPeriod(_) | Self::InvalidRange { .. } | Self::IncompatiblePeriod { .. } => {
                "validation"
            },
            Self::Store(_) => "store",
            Self::Io(_) => "io",
            Self::Serialization(_) | Self::Yaml(_) => "serialization",
        }
    }
}
