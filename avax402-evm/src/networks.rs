//! Avalanche networks and their USDC token deployments.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use alloy_primitives::{Address, address};
use serde::{Deserialize, Serialize};

/// Avalanche C-Chain chain ID.
pub const AVALANCHE_MAINNET: u64 = 43114;

/// Avalanche Fuji (testnet) chain ID.
pub const AVALANCHE_FUJI: u64 = 43113;

/// USDC contract address on Avalanche C-Chain.
pub const USDC_AVALANCHE: Address = address!("B97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E");

/// USDC contract address on Avalanche Fuji.
pub const USDC_AVALANCHE_FUJI: Address = address!("5425890298aed601595a70AB815c96711a31Bc65");

/// EIP-712 domain name of the USDC contract.
pub const USDC_EIP712_NAME: &str = "USD Coin";

/// EIP-712 domain version of the USDC contract.
pub const USDC_EIP712_VERSION: &str = "2";

/// USDC decimals.
pub const USDC_DECIMALS: u8 = 6;

/// Token symbol reported by `/supported`.
pub const USDC_SYMBOL: &str = "USDC";

/// A network this facilitator knows how to settle on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvalancheNetwork {
    /// Avalanche C-Chain mainnet.
    #[serde(rename = "avalanche")]
    Mainnet,
    /// Avalanche Fuji testnet.
    #[serde(rename = "avalanche-fuji")]
    Fuji,
}

/// A token contract deployed on an [`AvalancheNetwork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDeployment {
    /// Contract address.
    pub address: Address,
    /// Ticker symbol.
    pub symbol: &'static str,
    /// Decimal places.
    pub decimals: u8,
    /// EIP-712 domain name.
    pub eip712_name: &'static str,
    /// EIP-712 domain version.
    pub eip712_version: &'static str,
}

impl AvalancheNetwork {
    /// All known networks, mainnet first.
    pub const ALL: [Self; 2] = [Self::Mainnet, Self::Fuji];

    /// Wire identifier, e.g. `avalanche-fuji`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "avalanche",
            Self::Fuji => "avalanche-fuji",
        }
    }

    /// EIP-155 chain ID.
    #[must_use]
    pub const fn chain_id(self) -> u64 {
        match self {
            Self::Mainnet => AVALANCHE_MAINNET,
            Self::Fuji => AVALANCHE_FUJI,
        }
    }

    /// Human-readable network name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Mainnet => "Avalanche C-Chain",
            Self::Fuji => "Avalanche Fuji Testnet",
        }
    }

    /// The USDC deployment on this network.
    #[must_use]
    pub const fn usdc(self) -> TokenDeployment {
        let address = match self {
            Self::Mainnet => USDC_AVALANCHE,
            Self::Fuji => USDC_AVALANCHE_FUJI,
        };
        TokenDeployment {
            address,
            symbol: USDC_SYMBOL,
            decimals: USDC_DECIMALS,
            eip712_name: USDC_EIP712_NAME,
            eip712_version: USDC_EIP712_VERSION,
        }
    }
}

impl Display for AvalancheNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The network identifier is not one of the known Avalanche networks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network `{0}`, expected `avalanche` or `avalanche-fuji`")]
pub struct UnknownNetwork(pub String);

impl FromStr for AvalancheNetwork {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| UnknownNetwork(s.to_owned()))
    }
}
