use axum::{Json, extract::State};
use serde_json::json;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, HealthData};

/// GET /health
/// Also pings the database so a wedged pool reports as unhealthy.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthData>>, ApiError> {
    state
        .store()
        .ping()
        .await
        .map_err(|e| ApiError::internal(format!("Database unreachable: {e}")))?;

    Ok(Json(ApiResponse::success(HealthData {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })))
}

/// GET /api
/// Self-describing index so a curl against the root answers something
/// more useful than a 404.
pub async fn index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime_secs = state.start_time.elapsed().as_secs();

    Json(json!({
        "name": "doorman",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSeconds": uptime_secs,
        "endpoints": {
            "auth": ["POST /api/auth/login", "GET /api/auth/verify", "POST /api/auth/logout"],
            "history": [
                "GET /api/history",
                "POST /api/history",
                "DELETE /api/history/{id}",
                "DELETE /api/history",
            ],
            "rfid": [
                "GET /api/rfid/cards",
                "POST /api/rfid/cards",
                "PUT /api/rfid/cards/{id}",
                "DELETE /api/rfid/cards/{id}",
                "POST /api/rfid/verify",
            ],
            "system": ["GET /api/health", "GET /api/metrics"],
        },
    }))
}
