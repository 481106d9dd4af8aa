//! REST API route handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::web::AppState;

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Accept either a JSON string (`"$GPGGA,..."`) or the raw sentence text.
fn sentence_from_body(body: &str) -> String {
    serde_json::from_str::<String>(body).unwrap_or_else(|_| body.to_string())
}

/// POST /api/nmea/decode: one sentence in, decoded document out.
pub async fn api_decode(body: String) -> impl IntoResponse {
    let sentence = sentence_from_body(&body);
    match nmea_core::decode_document(&sentence) {
        Ok(doc) => (StatusCode::OK, Json(doc)),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// GET /api/health: 200 while the relay runs, 503 otherwise.
pub async fn api_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.health.report(&state.clock);
    let status = if report.relay {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::health::Health;
    use nmea_core::SharedClock;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            clock: SharedClock::new(),
            health: Arc::new(Health::new()),
        })
    }

    async fn post_decode(state: Arc<AppState>, body: String) -> (StatusCode, Value) {
        let app = crate::web::build_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/nmea/decode")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_sentence_from_body() {
        assert_eq!(sentence_from_body(&format!("\"{GGA}\"")), GGA);
        assert_eq!(sentence_from_body(GGA), GGA);
    }

    #[tokio::test]
    async fn test_api_decode_gga() {
        let (status, json) = post_decode(test_state(), json!(GGA).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["Time"], "123519");
        assert_eq!(json["Latitude"], "4807.038");
        assert_eq!(json["NumSatellites"], 8);
        assert_eq!(json["HorizontalDilution"], json!(0.9));
        assert_eq!(json["Altitude"], json!(545.4));
        assert_eq!(json["GeoidSeparation"], json!(46.9));
        assert_eq!(json["DgpsStationId"], "");
    }

    #[tokio::test]
    async fn test_api_decode_non_finite_is_bad_request() {
        let sentence = nmea_core::checksum::with_checksum("$GPGGA,1,2,N,3,E,1,08,NaN,inf,M");
        let (status, json) = post_decode(test_state(), json!(sentence).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("horizontal dilution"));
    }

    #[tokio::test]
    async fn test_api_decode_raw_text() {
        let (status, json) = post_decode(test_state(), GGA.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["Longitude"], "01131.000");
    }

    #[tokio::test]
    async fn test_api_decode_other_kind_is_empty() {
        let rmc = "$GPRMC,235959,A,4807.038,N,01131.000,E,022.4,084.4,010124,003.1,W*6F";
        let (status, json) = post_decode(test_state(), json!(rmc).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({}));
    }

    #[tokio::test]
    async fn test_api_decode_bad_checksum() {
        let corrupt = GGA.replace("*47", "*48");
        let (status, json) = post_decode(test_state(), json!(corrupt).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("checksum"));
    }

    #[tokio::test]
    async fn test_api_health_down() {
        let app = crate::web::build_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["relay"], false);
        assert!(json["last_fix"].is_null());
    }

    #[tokio::test]
    async fn test_api_health_up() {
        let state = test_state();
        state.health.set_relay(true);
        Health::incr(&state.health.sentences);
        state
            .clock
            .store(Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap());

        let app = crate::web::build_router(state);
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["relay"], true);
        assert_eq!(json["sentences"], 1);
        assert_eq!(json["last_fix"], "2024-01-01T23:59:59+00:00");
    }
}
