//! Multi-series economic metrics fetcher
//!
//! Each configured FRED series is fetched independently through the retrying
//! fetcher; one series failing never aborts its siblings. After all series
//! are attempted the failure ratio decides the log severity: more than half
//! failed is an error, any failure at all is a warning.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use hdp_common::{HdpError, Result};
use serde::Deserialize;
use tracing::{debug, error, info, warn, Level};

use crate::records::Observation;
use crate::retry::{with_retry, RetryPolicy};

/// Failure ratio above which the aggregate log escalates to error severity.
const FAILURE_RATIO_ERROR: f64 = 0.5;

/// Severity of the aggregate failure report. Strictly more than half of the
/// series failing is an error; anything up to and including half is a warning.
fn failure_level(failed: usize, total: usize) -> Level {
    if failed as f64 / total as f64 > FAILURE_RATIO_ERROR {
        Level::ERROR
    } else {
        Level::WARN
    }
}

/// Observations endpoint response.
#[derive(Debug, Deserialize)]
struct SeriesResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

/// FRED encodes every value as a string; "." marks a missing observation.
#[derive(Debug, Deserialize)]
struct RawObservation {
    date: NaiveDate,
    value: String,
}

/// Result of one multi-series fetch: whatever was collected plus the metric
/// names that failed after retries.
#[derive(Debug, Default)]
pub struct MetricsBatch {
    pub observations: Vec<Observation>,
    pub failed_series: Vec<String>,
}

/// Client for the FRED observations API.
pub struct FredClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FredClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("hdp-etl/0.1")
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    /// Fetch one series over a date range.
    async fn fetch_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>> {
        let url = format!("{}/fred/series/observations", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("series_id", series_id),
                ("api_key", &self.api_key),
                ("file_type", "json"),
                ("observation_start", &start.to_string()),
                ("observation_end", &end.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: SeriesResponse = response
            .json()
            .await
            .map_err(|e| HdpError::Decode(e.to_string()))?;

        Ok(body.observations)
    }

    /// Fetch every configured series over the lookback window ending today.
    ///
    /// Requires a non-empty api key, checked once before any series is
    /// attempted. Per-series failures are recorded and tolerated; the
    /// returned batch may be empty if every series failed.
    pub async fn fetch_all(
        &self,
        series: &BTreeMap<String, String>,
        lookback_years: u32,
        policy: &RetryPolicy,
    ) -> Result<MetricsBatch> {
        if self.api_key.is_empty() {
            return Err(HdpError::MissingCredentials("FRED_API_KEY".to_string()));
        }

        let end = chrono::Utc::now().date_naive();
        let start = end - chrono::Duration::days(i64::from(lookback_years) * 365);

        let mut batch = MetricsBatch::default();

        for (metric_name, series_id) in series {
            let result = with_retry(policy, || self.fetch_series(series_id, start, end)).await;

            match result {
                Ok(raw) => {
                    let before = batch.observations.len();
                    for obs in raw {
                        // "." is FRED's missing-value marker
                        if obs.value == "." {
                            continue;
                        }
                        match obs.value.parse::<f64>() {
                            Ok(value) => batch.observations.push(Observation {
                                date: obs.date,
                                metric_name: metric_name.clone(),
                                series_id: series_id.clone(),
                                value,
                            }),
                            Err(_) => {
                                debug!(series_id = series_id.as_str(), date = %obs.date, raw = %obs.value,
                                    "Skipping unparseable observation value");
                            },
                        }
                    }
                    info!(
                        metric = metric_name.as_str(),
                        series_id = series_id.as_str(),
                        count = batch.observations.len() - before,
                        "Fetched series"
                    );
                },
                Err(e) => {
                    warn!(metric = metric_name.as_str(), series_id = series_id.as_str(), error = %e,
                        "Series fetch failed, continuing with remaining series");
                    batch.failed_series.push(metric_name.clone());
                },
            }
        }

        let total = series.len();
        let failed = batch.failed_series.len();
        if total > 0 && failed > 0 {
            if failure_level(failed, total) == Level::ERROR {
                error!(
                    failed,
                    total,
                    series = ?batch.failed_series,
                    "More than half of the metric series failed"
                );
            } else {
                warn!(failed, total, series = ?batch.failed_series, "Some metric series failed");
            }
        }

        Ok(batch)
    }
}
