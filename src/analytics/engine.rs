//! Full-scan aggregation engine over the log store's query interface.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;

use crate::logs::{LogEntry, LogFilter, LogStatus, LogStoreBackend, Pagination};

use super::{AnalyticsError, OverviewStats, SeriesPoint, TimeWindow, TriggerCount};

/// Rows fetched per page while scanning a window.
const SCAN_PAGE_SIZE: usize = 500;

/// Computes dashboard statistics from the outcome log.
///
/// All computations are full scans over the backend's query interface,
/// so they stay consistent with the raw log no matter which backend is
/// in use, and run concurrently with ongoing dispatches without pausing
/// writers.
pub struct AggregationEngine {
    logs: Arc<dyn LogStoreBackend>,
}

impl AggregationEngine {
    pub fn new(logs: Arc<dyn LogStoreBackend>) -> Self {
        Self { logs }
    }

    /// Fetch every log row inside the window, page by page.
    async fn scan(&self, window: &TimeWindow) -> Result<Vec<LogEntry>, AnalyticsError> {
        let filter = LogFilter {
            from: Some(window.from),
            until: Some(window.until),
            ..Default::default()
        };

        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .logs
                .query(&filter, &Pagination::new(SCAN_PAGE_SIZE, offset))
                .await?;
            let page_len = page.len();
            rows.extend(page);
            if page_len < SCAN_PAGE_SIZE {
                break;
            }
            offset += page_len;
        }
        Ok(rows)
    }

    /// Total sent/failed counts and the failure rate for a window.
    pub async fn overview_stats(&self, window: TimeWindow) -> Result<OverviewStats, AnalyticsError> {
        let base = LogFilter {
            from: Some(window.from),
            until: Some(window.until),
            ..Default::default()
        };

        let total_sent = self
            .logs
            .count(&LogFilter {
                status: Some(LogStatus::Sent),
                ..base.clone()
            })
            .await?;
        let total_failed = self
            .logs
            .count(&LogFilter {
                status: Some(LogStatus::Failed),
                ..base
            })
            .await?;

        let denominator = total_sent + total_failed;
        let failure_rate = if denominator == 0 {
            0.0
        } else {
            total_failed as f64 / denominator as f64
        };

        Ok(OverviewStats {
            total_sent,
            total_failed,
            failure_rate,
        })
    }

    /// Sent/failed counts per bucket, covering the whole window with no
    /// gaps. Empty buckets are included at zero; the last bucket may
    /// cover less than `bucket_size` when the window is not divisible.
    pub async fn failure_series(
        &self,
        window: TimeWindow,
        bucket_size: Duration,
    ) -> Result<Vec<SeriesPoint>, AnalyticsError> {
        if bucket_size <= Duration::zero() {
            return Err(AnalyticsError::InvalidBucket(
                "Bucket size must be positive".to_string(),
            ));
        }

        let window_ms = (window.until - window.from).num_milliseconds();
        let bucket_ms = bucket_size.num_milliseconds();
        let bucket_count = (window_ms + bucket_ms - 1) / bucket_ms;

        let mut series: Vec<SeriesPoint> = (0..bucket_count)
            .map(|i| SeriesPoint {
                bucket_start: window.from + Duration::milliseconds(i * bucket_ms),
                sent_count: 0,
                failed_count: 0,
            })
            .collect();

        for entry in self.scan(&window).await? {
            let offset_ms = (entry.created_at - window.from).num_milliseconds();
            let index = (offset_ms / bucket_ms) as usize;
            // Row timestamps are already bounded by the scan filter
            if let Some(point) = series.get_mut(index) {
                match entry.status {
                    LogStatus::Sent => point.sent_count += 1,
                    LogStatus::Failed => point.failed_count += 1,
                }
            }
        }

        Ok(series)
    }

    /// Triggers ranked by row count, descending; ties break on trigger
    /// name ascending. At most `limit` entries.
    pub async fn top_triggers(
        &self,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<TriggerCount>, AnalyticsError> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for entry in self.scan(&window).await? {
            *counts.entry(entry.trigger).or_insert(0) += 1;
        }

        let mut ranked: Vec<TriggerCount> = counts
            .into_iter()
            .map(|(trigger, count)| TriggerCount { trigger, count })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.trigger.cmp(&b.trigger)));
        ranked.truncate(limit);

        Ok(ranked)
    }
}
