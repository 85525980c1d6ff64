//! Facilitator Client
//!
//! The resource server never touches the chain itself. Payment proofs are
//! handed to a facilitator service which checks them (`/verify`) and
//! submits the transfer (`/settle`).

use super::x402::{
    FacilitatorRequest, PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse,
    X402_VERSION,
};
use super::PaymentError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_FACILITATOR_URL: &str = "https://x402.org/facilitator";

#[async_trait]
pub trait Facilitator: Send + Sync {
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, PaymentError>;

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, PaymentError>;
}

/// HTTP facilitator
pub struct FacilitatorClient {
    http: reqwest::Client,
    base_url: String,
}

impl FacilitatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self::with_http_client(base_url, http)
    }

    pub fn with_http_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<T, PaymentError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let body = FacilitatorRequest {
            x402_version: X402_VERSION,
            payment_payload: payload.clone(),
            payment_requirements: requirements.clone(),
        };

        debug!("Facilitator request: POST {}", url);
        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Rejections sometimes come back as 4xx with a well-formed body
        match serde_json::from_str::<T>(&text) {
            Ok(parsed) => Ok(parsed),
            Err(e) if status.is_success() => Err(PaymentError::Facilitator(format!(
                "unexpected /{} response: {}",
                endpoint, e
            ))),
            Err(_) => {
                warn!("Facilitator /{} returned {}: {}", endpoint, status, text);
                Err(PaymentError::Facilitator(format!(
                    "/{} returned {}: {}",
                    endpoint, status, text
                )))
            }
        }
    }
}

#[async_trait]
impl Facilitator for FacilitatorClient {
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, PaymentError> {
        self.post("verify", payload, requirements).await
    }

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, PaymentError> {
        self.post("settle", payload, requirements).await
    }
}
