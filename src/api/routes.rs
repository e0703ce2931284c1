use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Each route registers a single verb; anything else gets 405 from the router.
    Router::new()
        // Onboarding endpoints
        .route(
            "/api/lazy-trading/setup-status",
            get(handlers::get_setup_status),
        )
        .route(
            "/api/lazy-trading/generate-link-code",
            post(handlers::generate_link_code),
        )
        // System endpoints
        .route("/health", get(handlers::health_handler))
        // Add state, tracing and CORS
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
