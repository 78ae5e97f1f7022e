//! Local pre-validation applied under [`VerificationPolicy::Strict`](super::VerificationPolicy::Strict).
//!
//! Everything here is offline: requirement consistency, amount, time window
//! and EIP-712 signer recovery. Nothing touches the chain.

use alloy_primitives::{Address, B256, Signature, U256};
use alloy_sol_types::{SolStruct, eip712_domain};
use avax402::proto::{EXACT_SCHEME, PaymentAuthorization, PaymentPayload, PaymentRequirement};
use avax402::timestamp::UnixTimestamp;

use super::contract::TransferWithAuthorization;
use crate::networks::AvalancheNetwork;
use crate::signature::SplitSignature;

/// Seconds before `validBefore` at which an authorization is already treated
/// as expired, leaving room for the transaction to be mined.
pub const EXPIRY_BUFFER_SECS: u64 = 6;

/// Why a payment failed local pre-validation.
///
/// The display text is reported verbatim as `invalidReason`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreValidationError {
    /// The payload scheme is not `exact`.
    #[error("Unsupported scheme")]
    UnsupportedScheme,
    /// Payload and requirement name different networks.
    #[error("Payment network does not match payment requirements")]
    RequirementNetworkMismatch,
    /// The requirement's `payTo` is not the configured receiver.
    #[error("Payment recipient is invalid with respect to the payment requirements")]
    RecipientMismatch,
    /// The requirement's `asset` is not USDC on this network.
    #[error("Payment asset is invalid with respect to the payment requirements")]
    AssetMismatch,
    /// The authorized value is below `maxAmountRequired`.
    #[error("Payment amount is invalid with respect to the payment requirements")]
    InsufficientValue,
    /// `validAfter` is in the future.
    #[error("Payment authorization is not yet valid")]
    Early,
    /// `validBefore` has passed or is about to.
    #[error("Payment authorization is expired")]
    Expired,
    /// The signature could not be parsed or recovered.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    /// The recovered signer is not the payer.
    #[error("Signature does not match payer")]
    SignerMismatch,
}

/// Checks the validity window against `now`.
///
/// An authorization is early while `validAfter > now + clock_skew_tolerance`
/// and expired once `validBefore < now + EXPIRY_BUFFER_SECS`.
///
/// # Errors
///
/// Returns [`PreValidationError::Expired`] or [`PreValidationError::Early`].
pub fn assert_time(
    valid_after: U256,
    valid_before: U256,
    now: UnixTimestamp,
    clock_skew_tolerance: u64,
) -> Result<(), PreValidationError> {
    if valid_before < <U256 as From<UnixTimestamp>>::from(now + EXPIRY_BUFFER_SECS) {
        return Err(PreValidationError::Expired);
    }
    if valid_after > <U256 as From<UnixTimestamp>>::from(now + clock_skew_tolerance) {
        return Err(PreValidationError::Early);
    }
    Ok(())
}

/// Checks the payload against the requirement it claims to satisfy.
///
/// # Errors
///
/// Returns the first failed check, in the order scheme, network, recipient,
/// asset, amount, time window.
pub fn assert_requirements(
    payload: &PaymentPayload,
    requirement: &PaymentRequirement,
    network: AvalancheNetwork,
    receiver: &Address,
    now: UnixTimestamp,
    clock_skew_tolerance: u64,
) -> Result<(), PreValidationError> {
    if payload.scheme != EXACT_SCHEME || requirement.scheme != EXACT_SCHEME {
        return Err(PreValidationError::UnsupportedScheme);
    }
    if requirement.network != payload.network {
        return Err(PreValidationError::RequirementNetworkMismatch);
    }
    if requirement.pay_to.is_some_and(|pay_to| pay_to != *receiver) {
        return Err(PreValidationError::RecipientMismatch);
    }
    if requirement
        .asset
        .is_some_and(|asset| asset != network.usdc().address)
    {
        return Err(PreValidationError::AssetMismatch);
    }
    let authorization = payload.authorization();
    if requirement
        .max_amount_required
        .is_some_and(|required| authorization.value < required)
    {
        return Err(PreValidationError::InsufficientValue);
    }
    assert_time(
        authorization.valid_after,
        authorization.valid_before,
        now,
        clock_skew_tolerance,
    )
}

/// EIP-712 signing hash of `authorization` under the USDC domain of `network`.
#[must_use]
pub fn authorization_signing_hash(
    authorization: &PaymentAuthorization,
    network: AvalancheNetwork,
) -> B256 {
    let token = network.usdc();
    let domain = eip712_domain! {
        name: token.eip712_name,
        version: token.eip712_version,
        chain_id: network.chain_id(),
        verifying_contract: token.address,
    };
    TransferWithAuthorization {
        from: authorization.from,
        to: authorization.to,
        value: authorization.value,
        validAfter: authorization.valid_after,
        validBefore: authorization.valid_before,
        nonce: authorization.nonce,
    }
    .eip712_signing_hash(&domain)
}

/// Recovers the address that signed `authorization`.
///
/// # Errors
///
/// Returns [`PreValidationError::InvalidSignature`] if the bytes are not a
/// recoverable secp256k1 signature.
pub fn recover_signer(
    authorization: &PaymentAuthorization,
    signature: &SplitSignature,
    network: AvalancheNetwork,
) -> Result<Address, PreValidationError> {
    let hash = authorization_signing_hash(authorization, network);
    Signature::from_raw(&signature.to_bytes())
        .and_then(|sig| sig.recover_address_from_prehash(&hash))
        .map_err(|e| PreValidationError::InvalidSignature(e.to_string()))
}

/// Requires that `authorization.from` produced `signature`.
///
/// # Errors
///
/// Returns [`PreValidationError::SignerMismatch`] when another key signed, or
/// [`PreValidationError::InvalidSignature`] when nothing can be recovered.
pub fn assert_signer(
    authorization: &PaymentAuthorization,
    signature: &SplitSignature,
    network: AvalancheNetwork,
) -> Result<(), PreValidationError> {
    let signer = recover_signer(authorization, signature, network)?;
    if signer == authorization.from {
        Ok(())
    } else {
        #[cfg(feature = "telemetry")]
        tracing::debug!(recovered = %signer, from = %authorization.from, "signer mismatch");
        Err(PreValidationError::SignerMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: u64) -> U256 {
        U256::from(secs)
    }

    #[test]
    fn time_window_boundaries() {
        let now = UnixTimestamp::from_secs(1_000);
        assert_eq!(assert_time(ts(0), ts(1_006), now, 30), Ok(()));
        assert_eq!(assert_time(ts(0), ts(1_005), now, 30), Err(PreValidationError::Expired));
        assert_eq!(assert_time(ts(1_030), ts(2_000), now, 30), Ok(()));
        assert_eq!(assert_time(ts(1_031), ts(2_000), now, 30), Err(PreValidationError::Early));
        assert_eq!(assert_time(ts(1_001), ts(2_000), now, 0), Err(PreValidationError::Early));
    }

    #[test]
    fn expiry_is_checked_before_early() {
        assert_eq!(
            assert_time(ts(5_000), ts(10), UnixTimestamp::from_secs(1_000), 0),
            Err(PreValidationError::Expired)
        );
    }

    #[test]
    fn far_future_bounds_are_compared_at_full_width() {
        let now = UnixTimestamp::from_secs(1_000);
        let beyond_u64 = U256::from(u64::MAX) + U256::from(1u64);
        assert_eq!(assert_time(ts(0), beyond_u64, now, 30), Ok(()));
        assert_eq!(
            assert_time(beyond_u64, U256::MAX, now, 30),
            Err(PreValidationError::Early)
        );
    }
}
