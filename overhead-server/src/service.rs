///! HTTP surface over the tracking core
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use overhead_core::sat::{Observer, PositionSample, SatelliteManager};
use overhead_core::TrackerError;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SatelliteManager>,
    pub maps_api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ObserverQuery {
    lat: Option<String>,
    lon: Option<String>,
}

impl ObserverQuery {
    /// Missing, unparsable or non-finite coordinates are treated as absent
    fn observer(&self) -> Option<Observer> {
        let lat: f64 = self.lat.as_deref()?.parse().ok()?;
        let lon: f64 = self.lon.as_deref()?.parse().ok()?;
        (lat.is_finite() && lon.is_finite()).then_some(Observer {
            latitude_deg: lat,
            longitude_deg: lon,
        })
    }
}

pub fn router(state: AppState, static_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/satellites", get(satellites))
        .route("/api/positions", get(positions))
        .route("/api/maps/key", get(maps_key))
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Proxy of the raw upstream catalog. Doubles as the refresh trigger: a
/// successful fetch is ingested into the working set before returning.
async fn satellites(State(state): State<AppState>, Query(query): Query<ObserverQuery>) -> Response {
    let Some(observer) = query.observer() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Latitude and longitude are required" })),
        )
            .into_response();
    };

    let payload = match state.manager.raw_catalog(observer).await {
        Ok(payload) => payload,
        Err(e) => return error_response(e),
    };

    // ingest failure must not fail the proxy response
    if let Err(e) = state.manager.ingest_payload(&payload, observer).await {
        warn!("Catalog ingest failed after successful fetch: {}", e);
    }

    Json(payload).into_response()
}

/// Position query surface: served from the snapshot, recomputed from the
/// selection when the snapshot is unusable.
async fn positions(State(state): State<AppState>, Query(query): Query<ObserverQuery>) -> Response {
    if query.observer().is_none() {
        // absent observer coordinates yield an empty list, not an error
        return Json(json!({ "positions": [] })).into_response();
    }

    match state.manager.positions().await {
        Ok(samples) => Json(positions_json(&samples)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn maps_key(State(state): State<AppState>) -> Response {
    match &state.maps_api_key {
        Some(key) => Json(json!({ "key": key })).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Google Maps API key not configured" })),
        )
            .into_response(),
    }
}

fn positions_json(samples: &[PositionSample]) -> Value {
    let positions: Vec<Value> = samples
        .iter()
        .map(|s| {
            json!({
                "index": s.index,
                "catalog_id": s.catalog_id,
                "name": s.name,
                "lat": s.latitude_deg,
                "lng": s.longitude_deg,
                "altitude": s.altitude_m,
            })
        })
        .collect();
    json!({ "positions": positions })
}

fn error_response(error: TrackerError) -> Response {
    let status = match &error {
        TrackerError::NotFound => StatusCode::NOT_FOUND,
        TrackerError::UpstreamUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = match &error {
        TrackerError::NotFound => json!({
            "error": "No satellite data available yet",
            "message": "Trigger a catalog refresh via /api/satellites first",
        }),
        TrackerError::UpstreamUnavailable(message) => json!({
            "error": "Failed to fetch satellite data",
            "message": message,
        }),
        other => json!({
            "error": "Internal server error",
            "message": other.to_string(),
        }),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn query(lat: Option<&str>, lon: Option<&str>) -> ObserverQuery {
        ObserverQuery {
            lat: lat.map(String::from),
            lon: lon.map(String::from),
        }
    }

    fn state(temp_dir: &TempDir) -> AppState {
        AppState {
            manager: Arc::new(SatelliteManager::new(
                temp_dir.path(),
                2,
                "http://unused.invalid",
            )),
            maps_api_key: None,
        }
    }

    #[test]
    fn test_observer_query_parsing() {
        assert!(query(Some("40.7"), Some("-74.0")).observer().is_some());
        assert!(query(None, Some("-74.0")).observer().is_none());
        assert!(query(Some("40.7"), None).observer().is_none());
        assert!(query(Some("abc"), Some("-74.0")).observer().is_none());
        assert!(query(Some("NaN"), Some("-74.0")).observer().is_none());
        assert!(query(Some("inf"), Some("0")).observer().is_none());
    }

    #[tokio::test]
    async fn test_positions_without_observer_is_empty_list() {
        let temp_dir = TempDir::new().unwrap();
        let response = positions(State(state(&temp_dir)), Query(query(None, None)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_positions_without_state_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let response = positions(State(state(&temp_dir)), Query(query(Some("0"), Some("0"))))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_maps_key_unconfigured_is_500() {
        let temp_dir = TempDir::new().unwrap();
        let response = maps_key(State(state(&temp_dir))).await.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_maps_key_configured() {
        let temp_dir = TempDir::new().unwrap();
        let mut app_state = state(&temp_dir);
        app_state.maps_api_key = Some("test-key".to_string());
        let response = maps_key(State(app_state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
