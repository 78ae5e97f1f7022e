//! Normalized results returned by `/verify` and `/settle`.
//!
//! Business failures are values, not errors: a rejected payment is a
//! [`VerificationResult::Invalid`] and a failed transfer is a
//! [`SettlementResult::Failure`], both delivered with HTTP 200.

use alloy_primitives::B256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Outcome of verifying a payment payload.
///
/// Serializes with `invalidReason` always present:
///
/// ```json
/// { "isValid": true, "invalidReason": null }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// The payment satisfies the facilitator's checks.
    Valid,
    /// The payment was rejected.
    Invalid {
        /// Human-readable rejection reason.
        reason: String,
    },
}

impl VerificationResult {
    /// Constructs a rejection.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the payment was accepted.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Returns the rejection reason, if any.
    #[must_use]
    pub fn invalid_reason(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid { reason } => Some(reason),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationResultWire {
    is_valid: bool,
    #[serde(default)]
    invalid_reason: Option<String>,
}

impl Serialize for VerificationResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        VerificationResultWire {
            is_valid: self.is_valid(),
            invalid_reason: self.invalid_reason().map(str::to_owned),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VerificationResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = VerificationResultWire::deserialize(deserializer)?;
        if wire.is_valid {
            Ok(Self::Valid)
        } else {
            let reason = wire
                .invalid_reason
                .ok_or_else(|| serde::de::Error::missing_field("invalidReason"))?;
            Ok(Self::Invalid { reason })
        }
    }
}

/// Outcome of a settlement attempt.
///
/// All four wire keys are always present:
///
/// ```json
/// { "success": false, "error": "Transaction failed", "txHash": "0x...", "networkId": "avalanche-fuji" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResult {
    /// The transfer was mined and succeeded.
    Success {
        /// Hash of the settlement transaction.
        transaction: B256,
        /// Network the transfer was settled on.
        network: String,
    },
    /// The transfer did not complete.
    Failure {
        /// Human-readable failure description.
        error: String,
        /// Hash of the transaction if one reached the chain.
        transaction: Option<B256>,
        /// Network the settlement was attempted on.
        network: String,
    },
}

impl SettlementResult {
    /// Returns `true` if the settlement succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the transaction hash, if one is known.
    #[must_use]
    pub const fn tx_hash(&self) -> Option<&B256> {
        match self {
            Self::Success { transaction, .. } => Some(transaction),
            Self::Failure { transaction, .. } => transaction.as_ref(),
        }
    }

    /// Returns the failure description, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettlementResultWire {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    tx_hash: Option<B256>,
    network_id: String,
}

impl Serialize for SettlementResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            Self::Success {
                transaction,
                network,
            } => SettlementResultWire {
                success: true,
                error: None,
                tx_hash: Some(*transaction),
                network_id: network.clone(),
            },
            Self::Failure {
                error,
                transaction,
                network,
            } => SettlementResultWire {
                success: false,
                error: Some(error.clone()),
                tx_hash: *transaction,
                network_id: network.clone(),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SettlementResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = SettlementResultWire::deserialize(deserializer)?;
        if wire.success {
            let transaction = wire
                .tx_hash
                .ok_or_else(|| serde::de::Error::missing_field("txHash"))?;
            Ok(Self::Success {
                transaction,
                network: wire.network_id,
            })
        } else {
            let error = wire
                .error
                .ok_or_else(|| serde::de::Error::missing_field("error"))?;
            Ok(Self::Failure {
                error,
                transaction: wire.tx_hash,
                network: wire.network_id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn valid_result_has_explicit_null_reason() {
        let json = serde_json::to_value(VerificationResult::Valid).unwrap();
        assert_eq!(json, json!({"isValid": true, "invalidReason": null}));
    }

    #[test]
    fn invalid_result_requires_reason_on_the_wire() {
        let json = serde_json::to_value(VerificationResult::invalid("Network not supported")).unwrap();
        assert_eq!(
            json,
            json!({"isValid": false, "invalidReason": "Network not supported"})
        );
        assert!(serde_json::from_value::<VerificationResult>(json!({"isValid": false})).is_err());
    }

    #[test]
    fn success_serializes_lowercase_hash_and_null_error() {
        let result = SettlementResult::Success {
            transaction: B256::repeat_byte(0xAB),
            network: "avalanche-fuji".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            json!({
                "success": true,
                "error": null,
                "txHash": format!("0x{}", "ab".repeat(32)),
                "networkId": "avalanche-fuji",
            })
        );
    }

    #[test]
    fn failure_without_hash_keeps_all_keys() {
        let result = SettlementResult::Failure {
            error: "Error settling payment: connection refused".into(),
            transaction: None,
            network: "avalanche".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert!(obj["txHash"].is_null());
        assert_eq!(obj["success"], json!(false));
        assert_eq!(serde_json::from_value::<SettlementResult>(json).unwrap(), result);
    }
}
