///! Upstream catalog client for fetching raw element set records
use crate::errors::{Result, TrackerError};
use serde_json::Value;
use std::time::Duration;

/// Default upstream catalog endpoint
pub const DEFAULT_CATALOG_URL: &str = "https://api.keeptrack.space/v2/sats";

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_SECONDS: u64 = 2;
const REQUEST_TIMEOUT_SECONDS: u64 = 8;

/// Fetch the raw satellite catalog for an observer location
///
/// # Arguments
/// * `base_url` - Catalog endpoint URL
/// * `lat` / `lon` - Observer geodetic coordinates in degrees (altitude is
///   always sent as 0, ground level)
///
/// # Returns
/// The raw JSON payload on success (its shape varies between upstream
/// revisions, see the extractor), `UpstreamUnavailable` on timeout or
/// non-2xx status.
pub async fn fetch_catalog(base_url: &str, lat: f64, lon: f64) -> Result<Value> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
        .build()
        .map_err(|e| TrackerError::UpstreamUnavailable(format!("failed to build HTTP client: {e}")))?;

    let mut last_error = TrackerError::UpstreamUnavailable("no attempt made".to_string());

    for attempt in 1..=MAX_RETRIES {
        if attempt > 1 {
            let delay = Duration::from_secs(RETRY_DELAY_SECONDS * attempt as u64);
            tracing::debug!(
                "Retrying catalog fetch after {:?} (attempt {}/{})",
                delay,
                attempt,
                MAX_RETRIES
            );
            tokio::time::sleep(delay).await;
        }

        match fetch_attempt(&client, base_url, lat, lon).await {
            Ok(payload) => {
                tracing::debug!("Successfully fetched catalog for ({:.3}, {:.3})", lat, lon);
                return Ok(payload);
            }
            Err(e) => {
                if attempt == MAX_RETRIES {
                    tracing::error!("Failed to fetch catalog after {} attempts: {}", MAX_RETRIES, e);
                } else {
                    tracing::warn!("Attempt {}/{} failed: {}", attempt, MAX_RETRIES, e);
                }
                last_error = e;
            }
        }
    }

    Err(last_error)
}

/// Single fetch attempt
async fn fetch_attempt(client: &reqwest::Client, base_url: &str, lat: f64, lon: f64) -> Result<Value> {
    let response = client
        .get(base_url)
        .query(&[("lat", lat), ("lon", lon), ("alt", 0.0)])
        .send()
        .await
        .map_err(|e| TrackerError::UpstreamUnavailable(format!("request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(TrackerError::UpstreamUnavailable(format!(
            "HTTP error {}",
            response.status()
        )));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| TrackerError::UpstreamUnavailable(format!("failed to parse JSON response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires network connection
    async fn test_fetch_catalog() {
        let result = fetch_catalog(DEFAULT_CATALOG_URL, 40.0, -74.0).await;
        assert!(result.is_ok() || result.is_err()); // Just test it can run
    }

    #[tokio::test]
    async fn test_unreachable_host_is_upstream_unavailable() {
        let result = fetch_catalog("http://127.0.0.1:1/v2/sats", 0.0, 0.0).await;
        match result {
            Err(TrackerError::UpstreamUnavailable(_)) => {}
            other => panic!("expected UpstreamUnavailable, got {:?}", other.map(|_| ())),
        }
    }
}
