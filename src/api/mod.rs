// Thin namespace wrapper for API-layer components plus the router
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::AppState;
use crate::vehicle_handler::MAX_CSV_BYTES;

pub mod handlers {
    pub use crate::handlers::*;
}

pub mod vehicle_handler {
    pub use crate::vehicle_handler::*;
}

/// Every `/api/v1` route with the request size limit applied.
///
/// Rate limiting is layered on by the caller so tests can drive the
/// router without a peer address.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/leads",
            post(crate::handlers::create_lead).get(crate::handlers::list_leads),
        )
        .route("/api/v1/leads/:id", patch(crate::handlers::update_lead))
        .route("/api/v1/vehicles", get(crate::vehicle_handler::list_vehicles))
        .route(
            "/api/v1/vehicles/import",
            post(crate::vehicle_handler::import_vehicles),
        )
        // Request size limit: 5MB max payload (prevents memory exhaustion)
        .layer(DefaultBodyLimit::max(MAX_CSV_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_CSV_BYTES))
}

/// Final app: health check (outside any rate limit), the given API routes,
/// tracing and CORS.
pub fn app(api: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::handlers::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
