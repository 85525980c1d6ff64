//! Paying HTTP Client
//!
//! Wraps outbound requests so that an x402 `402 Payment Required` challenge
//! is answered automatically: pick an acceptable requirement, sign an
//! EIP-3009 `TransferWithAuthorization` with the session wallet, and retry
//! with the `X-PAYMENT` header attached.

use super::network::{Network, USDC_EIP712_NAME, USDC_EIP712_VERSION};
use super::x402::{
    ExactEvmAuthorization, ExactEvmPayload, PaymentPayload, PaymentRequiredResponse,
    PaymentRequirements, SettleResponse, PAYMENT_HEADER, PAYMENT_RESPONSE_HEADER, SCHEME_EXACT,
    X402_VERSION,
};
use super::PaymentError;
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::TypedData;
use ethers::types::U256;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default spending cap per request: 0.1 USDC
pub const DEFAULT_MAX_PAYMENT: u64 = 100_000;

/// Authorizations are back-dated to tolerate clock skew
const VALID_AFTER_SKEW_SECS: i64 = 600;

/// Response to a (possibly paid) request
#[derive(Debug, Clone)]
pub struct PaidResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    /// Settlement receipt, present when a payment was made and settled
    pub settlement: Option<SettleResponse>,
}

impl PaidResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// A request client that pays for x402-gated resources
#[async_trait]
pub trait PaymentFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<PaidResponse, PaymentError>;
}

/// Builds a paying client bound to a particular wallet
pub trait PaymentConnector: Send + Sync {
    fn connect(&self, signer: &LocalWallet) -> Result<Arc<dyn PaymentFetcher>, PaymentError>;
}

pub struct X402Client {
    http: reqwest::Client,
    signer: LocalWallet,
    network: Network,
    max_value: U256,
}

impl X402Client {
    pub fn new(signer: LocalWallet, network: Network) -> Self {
        Self {
            http: reqwest::Client::new(),
            signer: signer.with_chain_id(network.chain_id()),
            network,
            max_value: U256::from(DEFAULT_MAX_PAYMENT),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_max_value(mut self, max_value: U256) -> Self {
        self.max_value = max_value;
        self
    }

    /// Choose the first "exact" requirement on our network that fits the cap
    pub fn select_requirements<'a>(
        &self,
        accepts: &'a [PaymentRequirements],
    ) -> Result<&'a PaymentRequirements, PaymentError> {
        let candidate = accepts
            .iter()
            .find(|r| r.scheme == SCHEME_EXACT && r.network == self.network.as_str())
            .ok_or_else(|| {
                let offered: Vec<String> = accepts
                    .iter()
                    .map(|r| format!("{}/{}", r.scheme, r.network))
                    .collect();
                PaymentError::NoAcceptableRequirements(format!(
                    "need {}/{}, server offered [{}]",
                    SCHEME_EXACT,
                    self.network,
                    offered.join(", ")
                ))
            })?;

        let required = U256::from_dec_str(&candidate.max_amount_required).map_err(|e| {
            PaymentError::Malformed(format!(
                "maxAmountRequired {:?}: {}",
                candidate.max_amount_required, e
            ))
        })?;
        if required > self.max_value {
            return Err(PaymentError::AmountTooHigh {
                required,
                max: self.max_value,
            });
        }

        Ok(candidate)
    }

    /// Sign a payment authorization for `requirements`
    pub async fn create_payment(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentPayload, PaymentError> {
        let now = chrono::Utc::now().timestamp();
        let nonce: [u8; 32] = rand::random();

        let authorization = ExactEvmAuthorization {
            from: self.signer.address(),
            to: requirements.pay_to,
            value: requirements.max_amount_required.clone(),
            valid_after: (now - VALID_AFTER_SKEW_SECS).max(0).to_string(),
            valid_before: (now + requirements.max_timeout_seconds as i64).to_string(),
            nonce: format!("0x{}", hex::encode(nonce)),
        };

        let typed_data = self.typed_data(requirements, &authorization)?;
        let signature = self
            .signer
            .sign_typed_data(&typed_data)
            .await
            .map_err(|e| PaymentError::Signing(e.to_string()))?;

        Ok(PaymentPayload {
            x402_version: X402_VERSION,
            scheme: SCHEME_EXACT.to_string(),
            network: self.network.as_str().to_string(),
            payload: ExactEvmPayload {
                signature: format!("0x{}", signature),
                authorization,
            },
        })
    }

    /// EIP-712 `TransferWithAuthorization` message for the token contract
    fn typed_data(
        &self,
        requirements: &PaymentRequirements,
        authorization: &ExactEvmAuthorization,
    ) -> Result<TypedData, PaymentError> {
        let (name, version) = requirements
            .extra
            .as_ref()
            .map(|extra| (extra.name.as_str(), extra.version.as_str()))
            .unwrap_or((USDC_EIP712_NAME, USDC_EIP712_VERSION));

        let value = serde_json::json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "TransferWithAuthorization": [
                    { "name": "from", "type": "address" },
                    { "name": "to", "type": "address" },
                    { "name": "value", "type": "uint256" },
                    { "name": "validAfter", "type": "uint256" },
                    { "name": "validBefore", "type": "uint256" },
                    { "name": "nonce", "type": "bytes32" }
                ]
            },
            "primaryType": "TransferWithAuthorization",
            "domain": {
                "name": name,
                "version": version,
                "chainId": self.network.chain_id(),
                "verifyingContract": requirements.asset
            },
            "message": {
                "from": authorization.from,
                "to": authorization.to,
                "value": authorization.value,
                "validAfter": authorization.valid_after,
                "validBefore": authorization.valid_before,
                "nonce": authorization.nonce
            }
        });

        serde_json::from_value(value)
            .map_err(|e| PaymentError::Signing(format!("could not build typed data: {}", e)))
    }

    async fn into_paid_response(response: reqwest::Response) -> Result<PaidResponse, PaymentError> {
        let status = response.status();
        let settlement = response
            .headers()
            .get(PAYMENT_RESPONSE_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| match SettleResponse::from_header(value) {
                Ok(receipt) => Some(receipt),
                Err(e) => {
                    warn!("Ignoring unreadable {} header: {}", PAYMENT_RESPONSE_HEADER, e);
                    None
                }
            });
        let body = response.bytes().await?.to_vec();

        Ok(PaidResponse {
            status,
            body,
            settlement,
        })
    }
}

#[async_trait]
impl PaymentFetcher for X402Client {
    async fn get(&self, url: &str) -> Result<PaidResponse, PaymentError> {
        let response = self
            .http
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        if response.status() != StatusCode::PAYMENT_REQUIRED {
            return Self::into_paid_response(response).await;
        }

        let challenge: PaymentRequiredResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Malformed(format!("402 challenge: {}", e)))?;
        debug!("Payment required for {}: {}", url, challenge.error);

        let requirements = self.select_requirements(&challenge.accepts)?;
        let payment = self.create_payment(requirements).await?;
        info!(
            "Paying {} atomic units to {:?} for {}",
            requirements.max_amount_required, requirements.pay_to, url
        );

        let retry = self
            .http
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(PAYMENT_HEADER, payment.to_header()?)
            .send()
            .await?;

        if retry.status() == StatusCode::PAYMENT_REQUIRED {
            let reason = retry
                .json::<PaymentRequiredResponse>()
                .await
                .map(|c| c.error)
                .unwrap_or_else(|_| "payment was not accepted".to_string());
            return Err(PaymentError::Rejected(reason));
        }

        Self::into_paid_response(retry).await
    }
}

/// Connects session wallets to [`X402Client`]s sharing one HTTP pool
#[derive(Clone)]
pub struct X402Connector {
    http: reqwest::Client,
    network: Network,
    max_value: U256,
}

impl X402Connector {
    pub fn new(network: Network, max_value: U256) -> Self {
        Self {
            http: reqwest::Client::new(),
            network,
            max_value,
        }
    }
}

impl PaymentConnector for X402Connector {
    fn connect(&self, signer: &LocalWallet) -> Result<Arc<dyn PaymentFetcher>, PaymentError> {
        let client = X402Client::new(signer.clone(), self.network)
            .with_http_client(self.http.clone())
            .with_max_value(self.max_value);
        Ok(Arc::new(client))
    }
}
