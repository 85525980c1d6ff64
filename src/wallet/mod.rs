//! Wallet Session
//!
//! The user's embedded-custody identity: a local secp256k1 signer held for
//! the lifetime of the process. Keys are persisted encrypted at rest by
//! [`KeyStorage`].

pub mod storage;

pub use storage::*;

use crate::types::{AppError, AppResult};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct WalletSession {
    signer: Option<LocalWallet>,
}

impl WalletSession {
    /// A session with no wallet connected
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connected(signer: LocalWallet) -> Self {
        Self {
            signer: Some(signer),
        }
    }

    /// Connect using a hex-encoded private key (with or without `0x`)
    pub fn connect_with_key(&mut self, private_key: &str) -> AppResult<Address> {
        let signer: LocalWallet = private_key
            .trim()
            .parse()
            .map_err(|e| AppError::Wallet(format!("invalid private key: {}", e)))?;
        let address = signer.address();
        self.signer = Some(signer);
        info!("Wallet connected: {:?}", address);
        Ok(address)
    }

    /// Create a brand-new wallet and connect it; returns the hex private key
    pub fn create(&mut self) -> String {
        let signer = LocalWallet::new(&mut rand::thread_rng());
        let key = format!("0x{}", hex::encode(signer.signer().to_bytes()));
        info!("Created new wallet: {:?}", signer.address());
        self.signer = Some(signer);
        key
    }

    pub fn logout(&mut self) {
        if let Some(signer) = self.signer.take() {
            info!("Wallet logged out: {:?}", signer.address());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.signer.is_some()
    }

    pub fn address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    pub fn signer(&self) -> Option<&LocalWallet> {
        self.signer.as_ref()
    }

    /// `0x1234...abcd` form for display
    pub fn short_address(&self) -> Option<String> {
        self.address().map(|address| {
            let full = format!("{:?}", address);
            format!("{}...{}", &full[..6], &full[full.len() - 4..])
        })
    }
}
