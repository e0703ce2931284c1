use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use tracing::warn;

use crate::api::{state::AppState, types::HealthResponse};

/// GET /health -- lightweight liveness/readiness probe
pub async fn health_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let ok = match state.database.as_ref() {
        Some(db) => match db.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("health probe: database unreachable: {}", e);
                false
            }
        },
        None => true,
    };

    let resp = HealthResponse {
        status: if ok {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    };

    if ok {
        Ok(Json(resp))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(resp)))
    }
}
