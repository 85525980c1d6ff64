//! Network and Money
//!
//! The single chain the shop settles on, and conversions between display
//! prices (`$0.005`) and on-chain atomic units.

use super::PaymentError;
use ethers::types::{Address, U256};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// USDC uses six decimal places on every EVM chain
pub const USDC_DECIMALS: u32 = 6;

/// Circle's USDC deployment on Base Sepolia
pub const BASE_SEPOLIA_USDC: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7e";

/// EIP-712 domain name/version of the USDC contract
pub const USDC_EIP712_NAME: &str = "USDC";
pub const USDC_EIP712_VERSION: &str = "2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    #[default]
    BaseSepolia,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::BaseSepolia => "base-sepolia",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::BaseSepolia => 84532,
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::BaseSepolia => "https://sepolia.base.org",
        }
    }

    pub fn usdc_address(&self) -> Address {
        match self {
            Network::BaseSepolia => Address::from([
                0x03, 0x6c, 0xbd, 0x53, 0x84, 0x2c, 0x54, 0x26, 0x63, 0x4e, 0x79, 0x29, 0x54,
                0x1e, 0xc2, 0x31, 0x8f, 0x3d, 0xcf, 0x7e,
            ]),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Network {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "base-sepolia" => Ok(Network::BaseSepolia),
            other => Err(PaymentError::UnsupportedNetwork(other.to_string())),
        }
    }
}

/// A USD-denominated price such as `$0.005`, paid 1:1 in USDC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceTag(Decimal);

impl PriceTag {
    pub fn new(amount: Decimal) -> Result<Self, PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidPrice(format!("{} must be positive", amount)));
        }
        to_atomic(amount)?;
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Price in USDC atomic units
    pub fn atomic_amount(&self) -> U256 {
        // Validated in `new`
        to_atomic(self.0).unwrap_or_default()
    }
}

impl FromStr for PriceTag {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let amount = Decimal::from_str(digits)
            .map_err(|e| PaymentError::InvalidPrice(format!("{}: {}", s, e)))?;
        Self::new(amount)
    }
}

impl std::fmt::Display for PriceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.0.normalize())
    }
}

/// Convert a decimal USDC amount to atomic units, rejecting sub-unit dust
pub fn to_atomic(amount: Decimal) -> Result<U256, PaymentError> {
    if amount.is_sign_negative() {
        return Err(PaymentError::InvalidPrice(format!("{} is negative", amount)));
    }
    let scaled = amount
        .checked_mul(Decimal::from(10u64.pow(USDC_DECIMALS)))
        .ok_or_else(|| PaymentError::InvalidPrice(format!("{} is out of range", amount)))?;
    if !scaled.fract().is_zero() {
        return Err(PaymentError::InvalidPrice(format!(
            "{} has more than {} decimal places",
            amount, USDC_DECIMALS
        )));
    }
    scaled
        .trunc()
        .to_u128()
        .map(U256::from)
        .ok_or_else(|| PaymentError::InvalidPrice(format!("{} is out of range", amount)))
}

/// Convert atomic units back to a decimal USDC amount
pub fn from_atomic(raw: U256) -> Result<Decimal, PaymentError> {
    if raw > U256::from(i128::MAX as u128) {
        return Err(PaymentError::Malformed(format!("amount {} is out of range", raw)));
    }
    Decimal::try_from_i128_with_scale(raw.as_u128() as i128, USDC_DECIMALS)
        .map_err(|e| PaymentError::Malformed(format!("amount {}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_usdc_address_matches_constant() {
        let parsed: Address = BASE_SEPOLIA_USDC.parse().unwrap();
        assert_eq!(Network::BaseSepolia.usdc_address(), parsed);
    }

    #[test]
    fn test_network_parsing() {
        assert_eq!("base-sepolia".parse::<Network>().unwrap(), Network::BaseSepolia);
        assert_eq!(Network::BaseSepolia.chain_id(), 84532);
        assert!(matches!(
            "base".parse::<Network>(),
            Err(PaymentError::UnsupportedNetwork(_))
        ));
    }

    #[test]
    fn test_price_tag() {
        let price: PriceTag = "$0.005".parse().unwrap();
        assert_eq!(price.amount(), dec!(0.005));
        assert_eq!(price.atomic_amount(), U256::from(5000));
        assert_eq!(price.to_string(), "$0.005");

        let bare: PriceTag = "1".parse().unwrap();
        assert_eq!(bare.atomic_amount(), U256::from(1_000_000));
    }

    #[test]
    fn test_price_tag_rejects_bad_values() {
        assert!("$0".parse::<PriceTag>().is_err());
        assert!("$-1".parse::<PriceTag>().is_err());
        assert!("$0.0000001".parse::<PriceTag>().is_err());
        assert!("five dollars".parse::<PriceTag>().is_err());
        assert!(matches!(
            "$79228162514264337593543950335".parse::<PriceTag>(),
            Err(PaymentError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_atomic_conversion() {
        assert_eq!(from_atomic(U256::from(5000)).unwrap(), dec!(0.005));
        assert_eq!(from_atomic(U256::from(12_345_678)).unwrap(), dec!(12.345678));
        assert!(from_atomic(U256::MAX).is_err());
    }
}
