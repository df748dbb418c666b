use crate::dto::health::HealthResponse;

/// Respond with a static health payload.
pub async fn health_status() -> HealthResponse {
    HealthResponse::ok()
}
