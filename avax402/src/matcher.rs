//! Checks a payment payload against the facilitator's own configuration.
//!
//! The matcher answers one question: is this payment addressed to us, on our
//! network? It performs no cryptography and no network access.

use alloy_primitives::Address;

use crate::proto::PaymentPayload;

/// Result of matching a payload against the configured network and receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Network and receiver both match.
    Matched,
    /// The payload targets a network this facilitator does not serve.
    NetworkMismatch,
    /// The authorization pays someone other than the configured receiver.
    ReceiverMismatch,
}

impl MatchOutcome {
    /// Rejection reason reported in `invalidReason`, or `None` when matched.
    #[must_use]
    pub const fn reason(self) -> Option<&'static str> {
        match self {
            Self::Matched => None,
            Self::NetworkMismatch => Some("Network not supported"),
            Self::ReceiverMismatch => Some("Invalid receiver address"),
        }
    }

    /// Returns `true` for [`MatchOutcome::Matched`].
    #[must_use]
    pub const fn is_matched(self) -> bool {
        matches!(self, Self::Matched)
    }
}

/// Matches `payload` against the configured network and receiver.
///
/// The network check runs first and short-circuits. Receiver comparison is on
/// the decoded 20 bytes, so addresses differing only in hex case are equal.
#[must_use]
pub fn match_payload(
    payload: &PaymentPayload,
    configured_network: &str,
    configured_receiver: &Address,
) -> MatchOutcome {
    let outcome = if payload.network != configured_network {
        MatchOutcome::NetworkMismatch
    } else if payload.authorization().to != *configured_receiver {
        MatchOutcome::ReceiverMismatch
    } else {
        MatchOutcome::Matched
    };
    #[cfg(feature = "telemetry")]
    {
        if !outcome.is_matched() {
            tracing::debug!(
                network = %payload.network,
                to = %payload.authorization().to,
                ?outcome,
                "payment payload does not match facilitator configuration"
            );
        }
    }
    outcome
}
