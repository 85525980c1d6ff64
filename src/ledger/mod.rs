//! Ledger Reads
//!
//! Read-only access to the USDC contract: `balanceOf(address)` over JSON-RPC.
//! The [`BalanceGate`] caches the last good answer for affordability checks.

pub mod balance;

pub use balance::*;

use crate::payment::from_atomic;
use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

abigen!(
    Erc20,
    r#"[
        function balanceOf(address account) external view returns (uint256)
    ]"#
);

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Raw token balance in atomic units
    async fn balance_of(&self, owner: Address) -> AppResult<U256>;
}

/// ERC-20 balance reader backed by an HTTP JSON-RPC node
pub struct Erc20Ledger {
    contract: Erc20<Provider<Http>>,
}

impl Erc20Ledger {
    pub fn new(rpc_url: &str, token: Address) -> AppResult<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| AppError::Config(format!("invalid RPC URL {}: {}", rpc_url, e)))?;
        Ok(Self {
            contract: Erc20::new(token, Arc::new(provider)),
        })
    }
}

#[async_trait]
impl LedgerClient for Erc20Ledger {
    async fn balance_of(&self, owner: Address) -> AppResult<U256> {
        debug!("balanceOf({:?}) on {:?}", owner, self.contract.address());
        self.contract
            .balance_of(owner)
            .call()
            .await
            .map_err(|e| AppError::Ledger(e.to_string()))
    }
}

/// Query and convert a USDC balance to a six-decimal amount
pub async fn usdc_balance(ledger: &dyn LedgerClient, owner: Address) -> AppResult<Decimal> {
    let raw = ledger.balance_of(owner).await?;
    from_atomic(raw).map_err(|e| AppError::Ledger(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::Network;
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_balance_of_over_json_rpc() {
        let mut server = mockito::Server::new_async().await;
        // 5_000 atomic units = 0.005 USDC
        let result = format!("0x{:064x}", 5000);
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({ "method": "eth_call" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"jsonrpc":"2.0","id":1,"result":"{}"}}"#, result))
            .create_async()
            .await;

        let ledger = Erc20Ledger::new(&server.url(), Network::BaseSepolia.usdc_address()).unwrap();
        let balance = usdc_balance(&ledger, Address::repeat_byte(0x42)).await.unwrap();

        assert_eq!(balance, dec!(0.005));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rpc_failure_is_ledger_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"execution reverted"}}"#)
            .create_async()
            .await;

        let ledger = Erc20Ledger::new(&server.url(), Network::BaseSepolia.usdc_address()).unwrap();
        let err = ledger.balance_of(Address::zero()).await.unwrap_err();

        assert!(matches!(err, AppError::Ledger(_)));
    }

    #[test]
    fn test_invalid_rpc_url() {
        assert!(matches!(
            Erc20Ledger::new("not a url", Address::zero()),
            Err(AppError::Config(_))
        ));
    }
}
