use axum::{routing::get, Json, Router};
use crate::models::PremiumResponse;
use tracing::info;

pub fn router() -> Router {
    Router::new().route("/api/premium", get(premium))
}

/// Reached only once the paywall has verified payment
async fn premium() -> Json<PremiumResponse> {
    info!("Serving premium content");
    Json(PremiumResponse {
        success: true,
        message: "Checkout complete! Payment received.".to_string(),
        timestamp: chrono::Utc::now().timestamp_millis(),
    })
}
