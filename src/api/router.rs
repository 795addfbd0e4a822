use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Authentication and role checks sit in front of this service.
    let blockchain = Router::new()
        // Run control
        .route("/api/blockchain/scrape", post(handlers::control::trigger_run))
        .route(
            "/api/blockchain/scrape/:network_id",
            post(handlers::control::trigger_network_run),
        )
        .route("/api/blockchain/status", get(handlers::control::status))
        // Summaries
        .route("/api/blockchain/summary", get(handlers::summary::overall))
        .route(
            "/api/blockchain/networks/:network_id/summary",
            get(handlers::summary::network),
        )
        .route(
            "/api/blockchain/managers/:manager_id/total-value",
            get(handlers::summary::manager_total_value),
        )
        // Transactions
        .route(
            "/api/blockchain/networks/:network_id/transactions",
            get(handlers::transactions::list_for_network),
        )
        .route("/api/blockchain/transactions", get(handlers::transactions::recent));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(blockchain)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
