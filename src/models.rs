use crate::config::Config;
use crate::middleware::{Paywall, PaywallConfig};
use crate::payment::{Facilitator, FacilitatorClient};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub paywall: Arc<Paywall>,
}

impl AppState {
    /// State backed by the configured HTTP facilitator
    pub fn new(config: Config) -> Self {
        let facilitator = Arc::new(FacilitatorClient::new(config.payment.facilitator_url.clone()));
        Self::with_facilitator(config, facilitator)
    }

    pub fn with_facilitator(config: Config, facilitator: Arc<dyn Facilitator>) -> Self {
        let paywall = Arc::new(Paywall::new(PaywallConfig::from_config(&config), facilitator));
        Self { config, paywall }
    }
}

// API Request/Response types

/// Body of the gated resource
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PremiumResponse {
    pub success: bool,
    pub message: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub network: String,
}
