use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Json,
};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::api::{
    state::AppState,
    types::{ApiError, SetupStatusQuery},
};
use crate::domain::{SetupStatus, WalletId};
use crate::services::LinkCodeOutcome;

/// GET /api/lazy-trading/setup-status?userWallet=<wallet>
#[instrument(skip_all)]
pub async fn get_setup_status(
    State(state): State<AppState>,
    query: std::result::Result<Query<SetupStatusQuery>, QueryRejection>,
) -> std::result::Result<Json<SetupStatus>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let raw = query
        .user_wallet
        .ok_or_else(|| ApiError::bad_request("userWallet is required"))?;

    let status = state
        .step_resolver
        .status_for(&raw)
        .await
        .map_err(|e| ApiError::from_onboard(e, "Error checking lazy trading setup"))?;

    Ok(Json(status))
}

/// POST /api/lazy-trading/generate-link-code
#[instrument(skip_all)]
pub async fn generate_link_code(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> std::result::Result<Json<LinkCodeOutcome>, ApiError> {
    let Json(body) = body.map_err(|e| {
        debug!("rejected link-code body: {}", e);
        ApiError::bad_request("Request body must be JSON")
    })?;

    let wallet = WalletId::from_json(body.get("userWallet"))
        .map_err(|e| ApiError::from_onboard(e, "Invalid link-code request"))?;

    let outcome = state
        .link_broker
        .generate_code(&wallet)
        .await
        .map_err(|e| ApiError::from_onboard(e, "Error generating link code"))?;

    Ok(Json(outcome))
}
