//! API Routes
//!
//! - `/api/premium` - Gated resource, priced by the paywall
//! - `/api/health` - Health check (free)
//!
//! Every `/api/*` route sits behind [`paywall_middleware`]; only priced
//! paths are actually charged.

pub mod health;
pub mod premium;

use axum::middleware::from_fn_with_state;
use axum::Router;
use crate::middleware::{apply_cors, paywall_middleware};
use crate::models::AppState;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let api_router = Router::new()
        .merge(premium::router())
        .merge(health::router(state.clone()))
        .layer(from_fn_with_state(state.paywall.clone(), paywall_middleware));

    let router = Router::new()
        .merge(api_router)
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &state.config.server.cors_allowed_origins)
}
