use std::future::ready;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use common_types::VehicleLocation;
use health::HealthRegistry;

use crate::api::ApiError;
use crate::sinks::LocationSink;

#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<dyn LocationSink + Send + Sync>,
}

pub async fn index() -> &'static str {
    "vehicle telemetry capture"
}

pub fn router(sink: Arc<dyn LocationSink + Send + Sync>, liveness: HealthRegistry) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/_readiness", get(index))
        .route("/_liveness", get(move || ready(liveness.get_status())))
        .route("/api/vehicles/locations", post(report_location))
        .with_state(AppState { sink })
}

/// Reporting endpoint. Validation stops at the identity field: anything else
/// the device sends is passed through unmodified, and a delivery failure is
/// the device's signal to retry.
async fn report_location(
    State(state): State<AppState>,
    Json(location): Json<VehicleLocation>,
) -> Result<StatusCode, ApiError> {
    if location.vehicle_id.is_empty() {
        return Err(ApiError::EmptyVehicleId);
    }

    state.sink.send(location).await?;
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use common_types::VehicleLocation;
    use health::HealthRegistry;

    use crate::api::ApiError;
    use crate::router::router;
    use crate::sinks::LocationSink;

    #[derive(Default)]
    struct MemorySink {
        sent: Mutex<Vec<VehicleLocation>>,
    }

    #[async_trait]
    impl LocationSink for MemorySink {
        async fn send(&self, location: VehicleLocation) -> Result<(), ApiError> {
            self.sent.lock().unwrap().push(location);
            Ok(())
        }
    }

    struct FailingSink {}

    #[async_trait]
    impl LocationSink for FailingSink {
        async fn send(&self, _location: VehicleLocation) -> Result<(), ApiError> {
            Err(ApiError::DeliveryFailed)
        }
    }

    fn post_report(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/vehicles/locations")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    const VALID_REPORT: &str = r#"{"vehicleId":"V1","timestamp":"2024-01-01T00:00:00Z","latitude":12.9,"longitude":77.6,"speed":40,"fuelLevel":80}"#;

    #[tokio::test]
    async fn accepts_a_valid_report() {
        let sink = Arc::new(MemorySink::default());
        let app = router(sink.clone(), HealthRegistry::new("liveness"));

        let response = app.oneshot(post_report(VALID_REPORT)).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].vehicle_id, "V1");
        assert_eq!(sent[0].speed, 40);
    }

    #[tokio::test]
    async fn rejects_an_empty_vehicle_id() {
        let sink = Arc::new(MemorySink::default());
        let app = router(sink.clone(), HealthRegistry::new("liveness"));

        let body = r#"{"vehicleId":"","timestamp":"2024-01-01T00:00:00Z","latitude":0.0,"longitude":0.0,"speed":0,"fuelLevel":0}"#;
        let response = app.oneshot(post_report(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_maps_to_service_unavailable() {
        let app = router(Arc::new(FailingSink {}), HealthRegistry::new("liveness"));

        let response = app.oneshot(post_report(VALID_REPORT)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
