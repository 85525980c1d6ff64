use crate::payment::{Network, PriceTag, DEFAULT_FACILITATOR_URL, DEFAULT_MAX_PAYMENT};
use anyhow::{Context, Result};
use ethers::types::Address;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Receiving address for shop payments
pub const DEFAULT_PAY_TO: &str = "0x22b9eD19d81Eb11cB9C34afc6FEB0FD911B12DAe";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub payment: PaymentConfig,
    pub chain: ChainConfig,
    pub shop: ShopConfig,
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Base URL advertised as the `resource` in payment challenges
    pub public_url: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub pay_to: Address,
    pub price: PriceTag,
    pub network: Network,
    pub facilitator_url: String,
    pub description: String,
    pub max_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub usdc_address: Address,
}

#[derive(Debug, Clone)]
pub struct ShopConfig {
    pub api_url: String,
    pub checkout_timeout_secs: u64,
    /// Per-request payment cap, atomic units
    pub max_payment: u64,
}

#[derive(Clone)]
pub struct WalletConfig {
    pub private_key: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let network: Network = var("X402_NETWORK", Network::default().as_str())
            .parse()
            .context("X402_NETWORK")?;

        Ok(Self {
            server: ServerConfig {
                port: var("PORT", "3000").parse().context("PORT")?,
                host: var("HOST", "0.0.0.0"),
                public_url: var("PUBLIC_URL", "http://localhost:3000")
                    .trim_end_matches('/')
                    .to_string(),
                cors_allowed_origins: var("ALLOWED_ORIGINS", "http://localhost:3000")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            payment: PaymentConfig {
                pay_to: parse_address(&var("X402_PAY_TO", DEFAULT_PAY_TO)).context("X402_PAY_TO")?,
                price: PriceTag::from_str(&var("X402_PRICE", "$0.005")).context("X402_PRICE")?,
                network,
                facilitator_url: var("X402_FACILITATOR_URL", DEFAULT_FACILITATOR_URL),
                description: var("X402_DESCRIPTION", "Access to protected premium content"),
                max_timeout_seconds: var("X402_MAX_TIMEOUT_SECONDS", "60")
                    .parse()
                    .context("X402_MAX_TIMEOUT_SECONDS")?,
            },
            chain: ChainConfig {
                rpc_url: var("RPC_URL", network.default_rpc_url()),
                usdc_address: match lookup("USDC_ADDRESS") {
                    Some(address) => parse_address(&address).context("USDC_ADDRESS")?,
                    None => network.usdc_address(),
                },
            },
            shop: ShopConfig {
                api_url: var("SHOP_API_URL", "http://localhost:3000")
                    .trim_end_matches('/')
                    .to_string(),
                checkout_timeout_secs: var("CHECKOUT_TIMEOUT_SECS", "60")
                    .parse()
                    .context("CHECKOUT_TIMEOUT_SECS")?,
                max_payment: var("X402_MAX_PAYMENT", &DEFAULT_MAX_PAYMENT.to_string())
                    .parse()
                    .context("X402_MAX_PAYMENT")?,
            },
            wallet: WalletConfig {
                private_key: lookup("WALLET_PRIVATE_KEY").filter(|k| !k.trim().is_empty()),
                data_dir: lookup("SHOP_DATA_DIR").map(PathBuf::from),
            },
        })
    }
}

fn parse_address(value: &str) -> Result<Address> {
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid address {:?}: {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.payment.network, Network::BaseSepolia);
        assert_eq!(config.payment.price.to_string(), "$0.005");
        assert_eq!(config.payment.price.atomic_amount().as_u64(), 5000);
        assert_eq!(config.payment.facilitator_url, "https://x402.org/facilitator");
        assert_eq!(config.payment.max_timeout_seconds, 60);
        assert_eq!(config.chain.rpc_url, "https://sepolia.base.org");
        assert_eq!(config.chain.usdc_address, Network::BaseSepolia.usdc_address());
        assert_eq!(config.shop.checkout_timeout_secs, 60);
        assert_eq!(config.shop.max_payment, 100_000);
        assert!(config.wallet.private_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            ("PORT", "8080"),
            ("X402_PRICE", "0.01"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
            ("SHOP_API_URL", "http://shop.test/"),
            ("WALLET_PRIVATE_KEY", "  "),
        ])
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.payment.price.atomic_amount().as_u64(), 10_000);
        assert_eq!(config.server.cors_allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.shop.api_url, "http://shop.test");
        assert!(config.wallet.private_key.is_none());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config_with(&[("PORT", "eighty")]).is_err());
        assert!(config_with(&[("X402_NETWORK", "solana")]).is_err());
        assert!(config_with(&[("X402_PAY_TO", "0x1234")]).is_err());
        assert!(config_with(&[("X402_PRICE", "$-1")]).is_err());
        assert!(config_with(&[("X402_PRICE", "$79228162514264337593543950335")]).is_err());
    }

    #[test]
    fn test_private_key_is_redacted() {
        let config = config_with(&[("WALLET_PRIVATE_KEY", "0xsecret")]).unwrap();
        assert!(!format!("{:?}", config.wallet).contains("secret"));
    }
}
