//! Checkout Flow
//!
//! ```text
//!            ItemAdded (clears messages)
//!                 │
//!   ┌──────┐  Started  ┌────────┐  Succeeded  ┌─────────┐
//!   │ Idle │──────────▶│ Paying │────────────▶│ Success │
//!   └──────┘           └────────┘             └─────────┘
//!      │                   │ Failed           ┌─────────┐
//!      │ Failed            └─────────────────▶│ Failure │
//!      └─────────────────────────────────────▶└─────────┘
//! ```
//!
//! Success and Failure are idle states that carry a message; any of them can
//! start a new attempt. The pure [`transition`] function is the only place
//! state changes are defined; [`Shop`] decides which events to feed it.

pub mod orchestrator;

pub use orchestrator::*;

use rust_decimal::Decimal;

pub const EMPTY_CART_MESSAGE: &str = "Add items to your cart first!";
pub const TIMEOUT_MESSAGE: &str = "Payment timed out. Please try again.";
pub const PAYMENT_FAILED_MESSAGE: &str = "Payment failed.";
pub const FALLBACK_FAILURE_MESSAGE: &str = "Payment failed. Please try again.";
pub const SIGNING_FAILURE_MESSAGE: &str =
    "Wallet signing failed. Please make sure you are paying with the embedded wallet session, not an external wallet.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    /// No wallet session; the caller should surface the connect view
    #[error("No wallet connected")]
    NotConnected,

    #[error("A payment is already in progress")]
    AlreadyPaying,

    #[error("{}", EMPTY_CART_MESSAGE)]
    EmptyCart,

    #[error("Insufficient USDC. You need at least ${:.3}", .required.round_dp(3))]
    InsufficientFunds { required: Decimal },

    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,

    /// Carries the underlying reason for logs; displays the user hint
    #[error("{}", SIGNING_FAILURE_MESSAGE)]
    SigningFailure(String),

    #[error("{0}")]
    GenericPaymentFailure(String),
}

impl CheckoutError {
    /// Whether this failure is shown to the user as a message
    pub fn is_displayed(&self) -> bool {
        !matches!(self, CheckoutError::NotConnected | CheckoutError::AlreadyPaying)
    }
}

/// What the storefront shows about the current checkout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutState {
    pub is_paying: bool,
    pub error: Option<String>,
    pub success: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutPhase {
    Idle,
    Paying,
    Success,
    Failure,
}

impl CheckoutState {
    pub fn phase(&self) -> CheckoutPhase {
        if self.is_paying {
            CheckoutPhase::Paying
        } else if self.success.is_some() {
            CheckoutPhase::Success
        } else if self.error.is_some() {
            CheckoutPhase::Failure
        } else {
            CheckoutPhase::Idle
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    ItemAdded,
    Started,
    Succeeded(String),
    Failed(CheckoutError),
}

pub fn transition(state: &CheckoutState, event: &CheckoutEvent) -> CheckoutState {
    match event {
        CheckoutEvent::ItemAdded => CheckoutState {
            is_paying: state.is_paying,
            error: None,
            success: None,
        },
        CheckoutEvent::Started => CheckoutState {
            is_paying: true,
            error: None,
            success: None,
        },
        CheckoutEvent::Succeeded(message) => CheckoutState {
            is_paying: false,
            error: None,
            success: Some(message.clone()),
        },
        CheckoutEvent::Failed(error) if error.is_displayed() => CheckoutState {
            is_paying: false,
            error: Some(error.to_string()),
            success: None,
        },
        // Guards that never reached the flow leave everything as it was
        CheckoutEvent::Failed(_) => state.clone(),
    }
}

/// Message shown after a successful checkout
pub fn success_message(glyphs: &[&str]) -> String {
    format!("🎉 Checkout complete! Enjoy your {}", glyphs.join(" "))
}
