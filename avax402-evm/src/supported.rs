//! Static registry of the payment methods this facilitator accepts.
//!
//! Answers `/supported`. The data never changes at runtime; filters only narrow
//! the list. A filter value that does not parse matches nothing.

use alloy_primitives::Address;
use serde::{Serialize, Serializer};

use crate::networks::{AvalancheNetwork, TokenDeployment};

/// Authorization method name for ERC-3009 transfers.
pub const EIP3009_METHOD: &str = "EIP-3009";

/// A token accepted on a supported network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportedToken {
    /// Contract address, EIP-55 checksummed on the wire.
    #[serde(serialize_with = "serialize_checksummed")]
    pub address: Address,
    /// Ticker symbol.
    pub symbol: &'static str,
    /// Decimal places.
    pub decimals: u8,
}

/// A network entry in the `/supported` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedNetwork {
    /// Wire identifier.
    pub network: AvalancheNetwork,
    /// EIP-155 chain ID.
    pub chain_id: u64,
    /// Human-readable name.
    pub name: &'static str,
    /// Authorization methods accepted.
    pub methods: Vec<&'static str>,
    /// Tokens accepted.
    pub tokens: Vec<SupportedToken>,
}

/// Optional narrowing of the registry, taken from query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedFilter {
    /// Decimal chain ID to keep.
    pub chain_id: Option<String>,
    /// Token contract address to keep, compared case-insensitively.
    pub token_address: Option<String>,
}

impl SupportedFilter {
    fn keeps_chain(&self, network: AvalancheNetwork) -> bool {
        self.chain_id
            .as_deref()
            .is_none_or(|id| id.trim().parse::<u64>() == Ok(network.chain_id()))
    }

    fn keeps_token(&self, token: &TokenDeployment) -> bool {
        self.token_address
            .as_deref()
            .is_none_or(|addr| addr.trim().parse::<Address>() == Ok(token.address))
    }
}

impl From<TokenDeployment> for SupportedToken {
    fn from(token: TokenDeployment) -> Self {
        Self {
            address: token.address,
            symbol: token.symbol,
            decimals: token.decimals,
        }
    }
}

/// Lists supported networks, narrowed by `filter`.
///
/// Networks left without any matching token are dropped.
#[must_use]
pub fn list(filter: &SupportedFilter) -> Vec<SupportedNetwork> {
    AvalancheNetwork::ALL
        .into_iter()
        .filter(|network| filter.keeps_chain(*network))
        .filter_map(|network| {
            let tokens: Vec<SupportedToken> = [network.usdc()]
                .into_iter()
                .filter(|token| filter.keeps_token(token))
                .map(SupportedToken::from)
                .collect();
            (!tokens.is_empty()).then(|| SupportedNetwork {
                network,
                chain_id: network.chain_id(),
                name: network.display_name(),
                methods: vec![EIP3009_METHOD],
                tokens,
            })
        })
        .collect()
}

fn serialize_checksummed<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_checksum(None))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn filter(chain_id: Option<&str>, token_address: Option<&str>) -> SupportedFilter {
        SupportedFilter {
            chain_id: chain_id.map(str::to_owned),
            token_address: token_address.map(str::to_owned),
        }
    }

    #[test]
    fn unfiltered_lists_both_networks() {
        let json = serde_json::to_value(list(&SupportedFilter::default())).unwrap();
        assert_eq!(
            json,
            json!([
                {
                    "network": "avalanche",
                    "chainId": 43114,
                    "name": "Avalanche C-Chain",
                    "methods": ["EIP-3009"],
                    "tokens": [{
                        "address": "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E",
                        "symbol": "USDC",
                        "decimals": 6
                    }]
                },
                {
                    "network": "avalanche-fuji",
                    "chainId": 43113,
                    "name": "Avalanche Fuji Testnet",
                    "methods": ["EIP-3009"],
                    "tokens": [{
                        "address": "0x5425890298aed601595a70AB815c96711a31Bc65",
                        "symbol": "USDC",
                        "decimals": 6
                    }]
                }
            ])
        );
    }

    #[test]
    fn chain_filter_selects_one_network() {
        let networks = list(&filter(Some("43113"), None));
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0].network, AvalancheNetwork::Fuji);
    }

    #[test]
    fn unknown_or_unparsable_chain_yields_empty() {
        assert!(list(&filter(Some("8453"), None)).is_empty());
        assert!(list(&filter(Some("fuji"), None)).is_empty());
    }

    #[test]
    fn token_filter_is_case_insensitive() {
        let networks = list(&filter(None, Some("0xb97ef9ef8734c71904d8002f8b6bc66dd9c48a6e")));
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0].network, AvalancheNetwork::Mainnet);

        let networks = list(&filter(
            Some("43113"),
            Some("0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
        ));
        assert!(networks.is_empty());
        assert!(list(&filter(None, Some("usdc"))).is_empty());
    }
}
