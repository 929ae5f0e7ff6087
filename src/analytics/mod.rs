//! Read-side aggregation over the outcome log: overview stats, failure
//! time series and top-trigger rankings for dashboards.

mod engine;

pub use engine::AggregationEngine;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::logs::LogStoreError;

/// Analytics-domain error type.
///
/// Store failures propagate as query failures; the engine never returns
/// zeroed statistics in their place.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Invalid bucket size: {0}")]
    InvalidBucket(String),

    #[error(transparent)]
    Store(#[from] LogStoreError),
}

/// A half-open time range [from, until) scoping an aggregation query.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(from: DateTime<Utc>, until: DateTime<Utc>) -> Result<Self, AnalyticsError> {
        if from >= until {
            return Err(AnalyticsError::InvalidWindow(
                "Window start must be before its end".to_string(),
            ));
        }
        Ok(Self { from, until })
    }

    /// The trailing window ending now.
    pub fn trailing(length: Duration) -> Result<Self, AnalyticsError> {
        let until = Utc::now();
        Self::new(until - length, until)
    }
}

/// Aggregate counts over a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverviewStats {
    pub total_sent: u64,
    pub total_failed: u64,
    /// failed / (sent + failed), 0 when nothing was dispatched
    pub failure_rate: f64,
}

/// One bucket of the failure time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub bucket_start: DateTime<Utc>,
    pub sent_count: u64,
    pub failed_count: u64,
}

/// One entry of the top-trigger ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerCount {
    pub trigger: String,
    pub count: u64,
}
