//! x402 Paywall
//!
//! Gates priced `/api/*` routes behind an x402 "exact" payment:
//!
//! 1. No `X-PAYMENT` header: answer `402` with the route's requirements.
//! 2. Decode the proof and check it targets this route's scheme and network.
//! 3. Verify it with the facilitator.
//! 4. Run the handler.
//! 5. Settle only if the handler succeeded, attaching `X-PAYMENT-RESPONSE`.
//!
//! Unpriced paths pass straight through.

use crate::config::Config;
use crate::payment::{
    AssetExtra, Facilitator, Network, PaymentPayload, PaymentRequiredResponse,
    PaymentRequirements, PriceTag, PAYMENT_HEADER, SCHEME_EXACT, USDC_EIP712_NAME,
    USDC_EIP712_VERSION, X402_VERSION,
};
use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use ethers::types::Address;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Lower-case form of the settlement header for the response map
pub const PAYMENT_RESPONSE: HeaderName = HeaderName::from_static("x-payment-response");

/// Price and metadata for one gated path
#[derive(Debug, Clone)]
pub struct RoutePrice {
    pub price: PriceTag,
    pub description: String,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct PaywallConfig {
    pub pay_to: Address,
    pub network: Network,
    pub asset: Address,
    /// Base URL used to build each requirement's `resource`
    pub public_url: String,
    pub max_timeout_seconds: u64,
    routes: HashMap<String, RoutePrice>,
}

impl PaywallConfig {
    pub fn new(pay_to: Address, network: Network, public_url: impl Into<String>) -> Self {
        Self {
            pay_to,
            network,
            asset: network.usdc_address(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
            max_timeout_seconds: 60,
            routes: HashMap::new(),
        }
    }

    /// The shop's paywall: `/api/premium` at the configured price
    pub fn from_config(config: &Config) -> Self {
        let mut paywall = Self::new(
            config.payment.pay_to,
            config.payment.network,
            config.server.public_url.clone(),
        );
        paywall.asset = config.chain.usdc_address;
        paywall.max_timeout_seconds = config.payment.max_timeout_seconds;
        paywall.with_route(
            "/api/premium",
            RoutePrice {
                price: config.payment.price,
                description: config.payment.description.clone(),
                mime_type: "application/json".to_string(),
            },
        )
    }

    pub fn with_route(mut self, path: impl Into<String>, price: RoutePrice) -> Self {
        self.routes.insert(path.into(), price);
        self
    }

    /// Payment requirements for `path`, or `None` if it is free
    pub fn requirements_for(&self, path: &str) -> Option<PaymentRequirements> {
        let route = self.routes.get(path)?;
        Some(PaymentRequirements {
            scheme: SCHEME_EXACT.to_string(),
            network: self.network.as_str().to_string(),
            max_amount_required: route.price.atomic_amount().to_string(),
            resource: format!("{}{}", self.public_url, path),
            description: route.description.clone(),
            mime_type: route.mime_type.clone(),
            pay_to: self.pay_to,
            max_timeout_seconds: self.max_timeout_seconds,
            asset: self.asset,
            extra: Some(AssetExtra {
                name: USDC_EIP712_NAME.to_string(),
                version: USDC_EIP712_VERSION.to_string(),
            }),
        })
    }
}

pub struct Paywall {
    config: PaywallConfig,
    facilitator: Arc<dyn Facilitator>,
}

impl Paywall {
    pub fn new(config: PaywallConfig, facilitator: Arc<dyn Facilitator>) -> Self {
        Self {
            config,
            facilitator,
        }
    }

    pub fn config(&self) -> &PaywallConfig {
        &self.config
    }
}

fn payment_required(error: impl Into<String>, requirements: &PaymentRequirements) -> Response {
    let body = PaymentRequiredResponse {
        x402_version: X402_VERSION,
        error: error.into(),
        accepts: vec![requirements.clone()],
    };
    (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
}

fn facilitator_failure(error: impl std::fmt::Display) -> Response {
    error!("Facilitator unavailable: {}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": format!("Payment processing failed: {}", error) })),
    )
        .into_response()
}

pub async fn paywall_middleware(
    State(paywall): State<Arc<Paywall>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let Some(requirements) = paywall.config.requirements_for(&path) else {
        return next.run(req).await;
    };

    let Some(header) = req.headers().get(PAYMENT_HEADER) else {
        debug!("Unpaid request to {}", path);
        return payment_required("X-PAYMENT header is required", &requirements);
    };

    let payment = match header
        .to_str()
        .map_err(|e| e.to_string())
        .and_then(|value| PaymentPayload::from_header(value).map_err(|e| e.to_string()))
    {
        Ok(payment) => payment,
        Err(e) => {
            warn!("Malformed payment header on {}: {}", path, e);
            return payment_required(format!("Invalid or malformed payment header: {}", e), &requirements);
        }
    };

    if payment.x402_version != X402_VERSION
        || payment.scheme != requirements.scheme
        || payment.network != requirements.network
    {
        return payment_required(
            format!(
                "Unsupported payment: version {} {}/{}",
                payment.x402_version, payment.scheme, payment.network
            ),
            &requirements,
        );
    }

    let verification = match paywall.facilitator.verify(&payment, &requirements).await {
        Ok(verification) => verification,
        Err(e) => return facilitator_failure(e),
    };
    if !verification.is_valid {
        let reason = verification
            .invalid_reason
            .unwrap_or_else(|| "payment verification failed".to_string());
        warn!("Payment for {} rejected: {}", path, reason);
        return payment_required(reason, &requirements);
    }

    let mut response = next.run(req).await;
    if !response.status().is_success() {
        debug!("Handler for {} returned {}, not settling", path, response.status());
        return response;
    }

    let settlement = match paywall.facilitator.settle(&payment, &requirements).await {
        Ok(settlement) => settlement,
        Err(e) => return facilitator_failure(e),
    };
    if !settlement.success {
        let reason = settlement
            .error_reason
            .unwrap_or_else(|| "settlement failed".to_string());
        warn!("Settlement for {} failed: {}", path, reason);
        return payment_required(reason, &requirements);
    }

    info!(
        "Settled {} atomic units for {} in {}",
        requirements.max_amount_required, path, settlement.transaction
    );

    match settlement
        .to_header()
        .map_err(|e| e.to_string())
        .and_then(|encoded| HeaderValue::from_str(&encoded).map_err(|e| e.to_string()))
    {
        Ok(value) => {
            response.headers_mut().insert(PAYMENT_RESPONSE, value);
        }
        Err(e) => warn!("Could not encode settlement header: {}", e),
    }

    response
}
