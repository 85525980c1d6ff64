//! Balance Gate
//!
//! Keeps the payer's last known USDC balance and answers "can this cart be
//! paid for?". A failed refresh keeps the previous value: a flaky RPC node
//! should not stop anyone from browsing.

use super::{usdc_balance, LedgerClient};
use ethers::types::Address;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound on a single `balanceOf` read
pub const BALANCE_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

pub struct BalanceGate {
    ledger: Arc<dyn LedgerClient>,
    balance: Option<Decimal>,
}

impl BalanceGate {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            ledger,
            balance: None,
        }
    }

    /// Last successfully fetched balance
    pub fn balance(&self) -> Option<Decimal> {
        self.balance
    }

    pub fn ledger(&self) -> Arc<dyn LedgerClient> {
        Arc::clone(&self.ledger)
    }

    /// Record a balance fetched elsewhere (e.g. by a background task)
    pub fn record(&mut self, balance: Decimal) {
        self.balance = Some(balance);
    }

    /// Forget the cached balance, e.g. after logout
    pub fn reset(&mut self) {
        self.balance = None;
    }

    /// Re-read the balance for `address`; on failure the stale value stays
    pub async fn refresh_balance(&mut self, address: Address) -> Option<Decimal> {
        if let Some(balance) = fetch_balance(self.ledger.as_ref(), address).await {
            self.balance = Some(balance);
        }
        self.balance
    }

    pub fn can_afford(&self, total: Decimal) -> bool {
        self.balance.unwrap_or(Decimal::ZERO) >= total
    }
}

/// Soft-failing balance read: errors and stalls are logged and mapped to `None`
pub async fn fetch_balance(ledger: &dyn LedgerClient, address: Address) -> Option<Decimal> {
    match tokio::time::timeout(BALANCE_FETCH_TIMEOUT, usdc_balance(ledger, address)).await {
        Ok(Ok(balance)) => {
            info!("USDC balance of {:?}: {}", address, balance);
            Some(balance)
        }
        Ok(Err(e)) => {
            warn!("Failed to fetch balance for {:?}: {}", address, e);
            None
        }
        Err(_) => {
            warn!("Balance read for {:?} timed out after {:?}", address, BALANCE_FETCH_TIMEOUT);
            None
        }
    }
}
