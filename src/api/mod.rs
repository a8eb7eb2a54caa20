//! HTTP surface
//!
//! Every `/bridge/*` route requires a bearer API key whose principal matches
//! the body's `userId`.

pub mod error;
pub mod handlers;
pub mod types;

pub use error::ApiError;

use crate::auth::ApiKeyAuthenticator;
use crate::orchestrator::BridgeServices;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<BridgeServices>,
    pub auth: Arc<ApiKeyAuthenticator>,
    pub enable_metrics: bool,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/bridge/burn", post(handlers::burn))
        .route("/bridge/mint", post(handlers::mint))
        .route("/bridge/broadcast-burn", post(handlers::broadcast_burn_handler))
        .route("/bridge/create-nonce", post(handlers::create_nonce_handler))
        .route("/bridge/vote-mint", post(handlers::vote_mint_handler))
        .layer(cors)
        .with_state(state)
}
