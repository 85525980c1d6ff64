// Payment protocol (x402 over Base Sepolia USDC)
//
// Wire types and codecs live in `x402`; `client` pays for requests on behalf
// of a wallet; `facilitator` verifies and settles proofs for the server side.

pub mod client;
pub mod facilitator;
pub mod network;
pub mod x402;

pub use client::*;
pub use facilitator::*;
pub use network::*;
pub use x402::*;

use ethers::types::U256;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Malformed payment data: {0}")]
    Malformed(String),

    #[error("No acceptable payment requirements: {0}")]
    NoAcceptableRequirements(String),

    #[error("Payment of {required} exceeds the allowed maximum of {max}")]
    AmountTooHigh { required: U256, max: U256 },

    #[error("Wallet signing failed: {0}")]
    Signing(String),

    #[error("Payment rejected: {0}")]
    Rejected(String),

    #[error("Facilitator error: {0}")]
    Facilitator(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}
