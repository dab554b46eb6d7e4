use crate::core::error::{Result, RustleError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between key components in store keys.
pub const KEY_SEPARATOR: char = ':';

/// Composite identifier of a series: `domain:category:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    domain: String,
    category: String,
    name: String,
}

impl SeriesKey {
    /// Creates a new SeriesKey after validating each component
    pub fn new(
        domain: impl Into<String>,
        category: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let key = SeriesKey {
            domain: domain.into(),
            category: category.into(),
            name: name.into(),
        };
        for (label, value) in [
            ("domain", &key.domain),
            ("category", &key.category),
            ("name", &key.name),
        ] {
            if value.is_empty() {
                return Err(RustleError::config(format!("Provide a valid {label}")));
            }
            if value.contains(KEY_SEPARATOR) {
                return Err(RustleError::config(format!(
                    "{label} {value:?} must not contain '{KEY_SEPARATOR}'"
                )));
            }
        }
        Ok(key)
    }

    /// Top-level grouping, e.g. an application
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Kind of event within the domain
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Series name within the category
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of the ordered set indexing this series' buckets
    pub fn set_name(&self) -> String {
        self.to_string()
    }

    /// Key of the counter holding the bucket starting at `period_start`
    pub fn bucket_key(&self, period_start: i64) -> String {
        format!("{}{KEY_SEPARATOR}{period_start}", self)
    }

    /// Recovers the period start from a bucket key of this series.
    pub fn parse_bucket_key(&self, member: &str) -> Option<i64> {
        let mut bits = member.split(KEY_SEPARATOR);
        let (domain, category, name) = (bits.next()?, bits.next()?, bits.next()?);
        if domain != self.domain || category != self.category || name != self.name {
            return None;
        }
        let ts = bits.next()?.parse().ok()?;
        if bits.next().is_some() {
            return None;
        }
        Some(ts)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
            self.domain, self.category, self.name
        )
    }
}

impl FromStr for SeriesKey {
    type Err = RustleError;

    fn from_str(s: &str) -> Result<Self> {
        let mut bits = s.splitn(3, KEY_SEPARATOR);
        match (bits.next(), bits.next(), bits.next()) {
            (Some(domain), Some(category), Some(name)) => SeriesKey::new(domain, category, name),
            _ => Err(RustleError::config(format!(
                "series must be written as domain:category:name, got {s:?}"
            ))),
        }
    }
}

/// One fixed-width time slot and its accumulated count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bucket {
    /// Period start in epoch seconds
    pub ts: i64,
    /// Accumulated value
    pub val: i64,
}

impl Bucket {
    /// Creates a bucket
    pub const fn new(ts: i64, val: i64) -> Self {
        Bucket { ts, val }
    }
}

impl From<(i64, i64)> for Bucket {
    fn from((ts, val): (i64, i64)) -> Self {
        Bucket { ts, val }
    }
}

/// How values within a bucket combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    /// Values add up
    Sum,
}

impl AggregationKind {
    /// Name used in config files and descriptions
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::Sum => "sum",
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationKind {
    type Err = RustleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(AggregationKind::Sum),
            other => Err(RustleError::config(format!("Unknown aggregation type : {other}"))),
        }
    }
}

/// Static description of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesInfo {
    /// How bucket values combine
    pub aggregation: AggregationKind,
    /// Series name
    pub name: String,
    /// Series domain
    pub domain: String,
    /// Series category
    pub category: String,
    /// Bucket width in seconds
    pub period: i64,
    /// Number of periods the series is meant to keep
    pub retention: i64,
    /// `retention * period`, the span of time the series is meant to cover
    pub total_capacity_seconds: i64,
}

/// Summary computed from the stored buckets of a series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesStats {
    /// Number of stored buckets
    pub buckets: usize,
    /// Saturating sum of all bucket values
    pub total: i64,
    /// Earliest stored period start
    pub first: Option<i64>,
    /// Latest stored period start
    pub last: Option<i64>,
}

impl SeriesStats {
    /// Summarizes ascending buckets
    pub fn from_buckets(buckets: &[Bucket]) -> Self {
        SeriesStats {
            buckets: buckets.len(),
            total: buckets.iter().fold(0_i64, |acc, b| acc.saturating_add(b.val)),
            first: buckets.first().map(|b| b.ts),
            last: buckets.last().map(|b| b.ts),
        }
    }
}

/// What a single increment did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementReceipt {
    /// Period start the increment landed in
    pub bucket: i64,
    /// Counter value after the increment
    pub count: i64,
    /// Whether this increment created the index entry
    pub newly_indexed: bool,
}
