//! x402 Wire Types
//!
//! Version 1 of the x402 protocol, "exact" scheme on EVM chains.
//!
//! # Protocol Flow
//!
//! ```text
//! ┌─────────────┐                 ┌─────────────┐                ┌─────────────┐
//! │   Client    │                 │  Resource   │                │ Facilitator │
//! └──────┬──────┘                 └──────┬──────┘                └──────┬──────┘
//!        │ GET /api/premium              │                              │
//!        │──────────────────────────────▶│                              │
//!        │ 402 { accepts: [...] }        │                              │
//!        │◀──────────────────────────────│                              │
//!        │ sign EIP-3009 authorization   │                              │
//!        │ GET + X-PAYMENT               │                              │
//!        │──────────────────────────────▶│ POST /verify                 │
//!        │                               │─────────────────────────────▶│
//!        │                               │ POST /settle                 │
//!        │                               │─────────────────────────────▶│
//!        │ 200 + X-PAYMENT-RESPONSE      │                              │
//!        │◀──────────────────────────────│                              │
//! ```
//!
//! Headers carry base64-encoded JSON.

use super::PaymentError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ethers::types::Address;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub const X402_VERSION: u8 = 1;

/// Request header carrying the signed payment
pub const PAYMENT_HEADER: &str = "X-PAYMENT";

/// Response header carrying the settlement receipt
pub const PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

pub const SCHEME_EXACT: &str = "exact";

/// Extra scheme data: the token's EIP-712 domain name and version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetExtra {
    pub name: String,
    pub version: String,
}

/// What a resource server accepts as payment for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    /// Atomic units, decimal string
    pub max_amount_required: String,
    pub resource: String,
    pub description: String,
    pub mime_type: String,
    pub pay_to: Address,
    pub max_timeout_seconds: u64,
    pub asset: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<AssetExtra>,
}

/// Body of a `402 Payment Required` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredResponse {
    pub x402_version: u8,
    pub error: String,
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
}

/// EIP-3009 `transferWithAuthorization` parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmAuthorization {
    pub from: Address,
    pub to: Address,
    pub value: String,
    pub valid_after: String,
    pub valid_before: String,
    /// 32 random bytes, 0x-prefixed hex
    pub nonce: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactEvmPayload {
    pub signature: String,
    pub authorization: ExactEvmAuthorization,
}

/// Decoded `X-PAYMENT` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u8,
    pub scheme: String,
    pub network: String,
    pub payload: ExactEvmPayload,
}

impl PaymentPayload {
    pub fn to_header(&self) -> Result<String, PaymentError> {
        encode_header(self)
    }

    pub fn from_header(value: &str) -> Result<Self, PaymentError> {
        decode_header(value)
    }
}

/// Body sent to the facilitator's `/verify` and `/settle`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorRequest {
    pub x402_version: u8,
    pub payment_payload: PaymentPayload,
    pub payment_requirements: PaymentRequirements,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(default)]
    pub transaction: String,
    #[serde(default)]
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl SettleResponse {
    pub fn to_header(&self) -> Result<String, PaymentError> {
        encode_header(self)
    }

    pub fn from_header(value: &str) -> Result<Self, PaymentError> {
        decode_header(value)
    }
}

fn encode_header<T: Serialize>(value: &T) -> Result<String, PaymentError> {
    let json = serde_json::to_vec(value).map_err(|e| PaymentError::Malformed(e.to_string()))?;
    Ok(BASE64.encode(json))
}

fn decode_header<T: DeserializeOwned>(value: &str) -> Result<T, PaymentError> {
    let json = BASE64
        .decode(value.trim())
        .map_err(|e| PaymentError::Malformed(format!("invalid base64: {}", e)))?;
    serde_json::from_slice(&json).map_err(|e| PaymentError::Malformed(format!("invalid JSON: {}", e)))
}
