//! Facilitator-side verification and settlement for the Avalanche exact scheme.
//!
//! [`AvalancheExactFacilitator`] is the explicit context every request runs
//! against: the configured network and receiver, the verification policy, the
//! settlement timeout and a [`SettlementChain`]. It holds no per-request state.
//!
//! Pipeline for `/settle`:
//!
//! 1. [`match_payload`] against network and receiver
//! 2. under [`VerificationPolicy::Strict`], offline pre-validation of the
//!    requirement, time window and EIP-712 signer
//! 3. [`split_signature`] into `(v, r, s)`
//! 4. [`SettlementExecutor`] submits and waits
//! 5. [`settlement_outcome`] maps the result to the wire shape
//!
//! `/verify` runs steps 1 and 2 only.

mod contract;
mod executor;
mod outcome;
mod verify;

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use avax402::matcher::match_payload;
use avax402::proto::{SettleRequest, SettlementResult, VerificationResult, VerifyRequest};
use avax402::timestamp::UnixTimestamp;
pub use contract::{IEIP3009, TransferWithAuthorization};
pub use executor::{ExecutorError, SettlementExecutor, SettlementReceipt};
pub use outcome::{
    INVALID_SIGNATURE_FORMAT, SETTLEMENT_ERROR, TRANSACTION_FAILED, rejected, settlement_outcome,
};
use serde::{Deserialize, Serialize, Serializer};
pub use verify::{
    EXPIRY_BUFFER_SECS, PreValidationError, assert_requirements, assert_signer, assert_time,
    authorization_signing_hash, recover_signer,
};

use crate::chain::{ChainError, SettlementChain};
use crate::networks::AvalancheNetwork;
use crate::signature::split_signature;
use crate::supported::{SupportedFilter, SupportedNetwork, list};

/// Default bound on waiting for a settlement receipt.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default clock skew tolerance in seconds for `validAfter` checks.
pub const DEFAULT_CLOCK_SKEW_TOLERANCE: u64 = 30;

/// How much checking happens before a payment is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationPolicy {
    /// Network and receiver match only.
    #[default]
    Lenient,
    /// Additionally checks the requirement, amount, time window and the
    /// EIP-712 signer, on both verify and settle.
    Strict,
}

/// The value is neither `lenient` nor `strict`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown verification policy `{0}`, expected `lenient` or `strict`")]
pub struct UnknownPolicy(pub String);

impl FromStr for VerificationPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            _ => Err(UnknownPolicy(s.to_owned())),
        }
    }
}

/// Native balance of the facilitator's signing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// Signer address, EIP-55 checksummed.
    #[serde(serialize_with = "serialize_checksummed")]
    pub address: Address,
    /// Balance in wei, as a decimal string.
    #[serde(serialize_with = "serialize_decimal")]
    pub balance: U256,
    /// Network the balance was read on.
    pub network: AvalancheNetwork,
}

/// Exact-scheme facilitator for one Avalanche network.
#[derive(Debug)]
pub struct AvalancheExactFacilitator<C> {
    chain: C,
    network: AvalancheNetwork,
    receiver: Address,
    policy: VerificationPolicy,
    receipt_timeout: Duration,
    clock_skew_tolerance: u64,
}

impl<C> AvalancheExactFacilitator<C> {
    /// Creates a facilitator accepting payments to `receiver` on `network`.
    ///
    /// Uses [`VerificationPolicy::Lenient`], [`DEFAULT_RECEIPT_TIMEOUT`] and
    /// [`DEFAULT_CLOCK_SKEW_TOLERANCE`].
    pub const fn new(chain: C, network: AvalancheNetwork, receiver: Address) -> Self {
        Self {
            chain,
            network,
            receiver,
            policy: VerificationPolicy::Lenient,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            clock_skew_tolerance: DEFAULT_CLOCK_SKEW_TOLERANCE,
        }
    }

    /// Sets the verification policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: VerificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the receipt timeout used when a requirement gives none.
    #[must_use]
    pub const fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Sets the clock skew tolerance (in seconds) for `validAfter` checks.
    #[must_use]
    pub const fn with_clock_skew_tolerance(mut self, seconds: u64) -> Self {
        self.clock_skew_tolerance = seconds;
        self
    }

    /// The configured network.
    #[must_use]
    pub const fn network(&self) -> AvalancheNetwork {
        self.network
    }

    /// The configured receiver.
    #[must_use]
    pub const fn receiver(&self) -> &Address {
        &self.receiver
    }

    /// The active verification policy.
    #[must_use]
    pub const fn policy(&self) -> VerificationPolicy {
        self.policy
    }

    /// The chain backing settlement.
    #[must_use]
    pub const fn chain(&self) -> &C {
        &self.chain
    }

    /// Lists supported networks and tokens.
    #[must_use]
    pub fn supported(&self, filter: &SupportedFilter) -> Vec<SupportedNetwork> {
        list(filter)
    }

    /// Runs the checks shared by verify and settle.
    fn screen(&self, request: &VerifyRequest, now: UnixTimestamp) -> Result<(), String> {
        let payload = &request.payment_payload;
        if let Some(reason) = match_payload(payload, self.network.as_str(), &self.receiver).reason()
        {
            return Err(reason.to_owned());
        }
        if self.policy == VerificationPolicy::Strict {
            assert_requirements(
                payload,
                &request.payment_requirements,
                self.network,
                &self.receiver,
                now,
                self.clock_skew_tolerance,
            )
            .map_err(|e| e.to_string())?;
            let signature = split_signature(&payload.payload.signature)
                .map_err(|_| INVALID_SIGNATURE_FORMAT.to_owned())?;
            assert_signer(payload.authorization(), &signature, self.network)
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    /// Verifies a payment without touching the chain.
    #[must_use]
    pub fn verify(&self, request: &VerifyRequest) -> VerificationResult {
        let result = match self.screen(request, UnixTimestamp::now()) {
            Ok(()) => VerificationResult::Valid,
            Err(reason) => VerificationResult::invalid(reason),
        };
        #[cfg(feature = "telemetry")]
        tracing::info!(
            from = %request.payment_payload.authorization().from,
            valid = result.is_valid(),
            reason = result.invalid_reason(),
            "payment verified"
        );
        result
    }

    fn settle_timeout(&self, request: &SettleRequest) -> Duration {
        request
            .payment_requirements
            .max_timeout_seconds
            .filter(|secs| *secs > 0)
            .map_or(self.receipt_timeout, Duration::from_secs)
    }
}

impl<C: SettlementChain> AvalancheExactFacilitator<C> {
    /// Settles a payment on-chain.
    ///
    /// Never fails: every outcome, including RPC errors, is reported in the
    /// returned [`SettlementResult`].
    pub async fn settle(&self, request: &SettleRequest) -> SettlementResult {
        let payload = &request.payment_payload;
        let network = payload.network.as_str();

        if let Err(reason) = self.screen(request, UnixTimestamp::now()) {
            #[cfg(feature = "telemetry")]
            tracing::warn!(%reason, network, "settlement rejected");
            return rejected(reason, network);
        }
        let Ok(signature) = split_signature(&payload.payload.signature) else {
            return rejected(INVALID_SIGNATURE_FORMAT, network);
        };

        #[cfg(feature = "telemetry")]
        tracing::info!(
            from = %payload.authorization().from,
            to = %payload.authorization().to,
            value = %payload.authorization().value,
            "settling payment"
        );

        let result = SettlementExecutor::new(&self.chain)
            .settle(
                payload.authorization(),
                &signature,
                self.network,
                self.settle_timeout(request),
            )
            .await;

        #[cfg(feature = "telemetry")]
        {
            if let Err(e) = &result {
                tracing::error!(error = %e, "settlement failed");
            }
        }

        settlement_outcome(result, network)
    }

    /// Reads the native balance of the signing account.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] if the RPC call fails.
    pub async fn balance(&self) -> Result<Balance, ChainError> {
        let balance = self.chain.native_balance().await?;
        Ok(Balance {
            address: self.chain.signer_address(),
            balance,
            network: self.network,
        })
    }
}

fn serialize_checksummed<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_checksum(None))
}

fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy_primitives::address;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use avax402::proto::{PaymentRequest, decode_verify_request};
    use serde_json::{Value, json};

    use super::executor::tests::{FakeChain, Script};
    use super::*;

    const RECEIVER: Address = address!("0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB2");

    fn body(network: &str, to: &str, signature: &str) -> Value {
        json!({
            "x402Version": 1,
            "paymentPayload": {
                "x402Version": 1,
                "scheme": "exact",
                "network": network,
                "payload": {
                    "signature": signature,
                    "authorization": {
                        "from": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA1",
                        "to": to,
                        "value": "10000",
                        "validAfter": "0",
                        "validBefore": "9999999999",
                        "nonce": format!("0x{}01", "00".repeat(31)),
                    }
                }
            },
            "paymentRequirements": {
                "scheme": "exact",
                "network": network,
                "maxAmountRequired": "10000",
                "payTo": to,
            }
        })
    }

    fn request(value: &Value) -> PaymentRequest {
        decode_verify_request(&serde_json::to_vec(value).unwrap()).unwrap()
    }

    fn dummy_signature() -> String {
        format!("0x{}{}1b", "11".repeat(32), "22".repeat(32))
    }

    fn facilitator(script: Script) -> AvalancheExactFacilitator<Arc<FakeChain>> {
        AvalancheExactFacilitator::new(
            Arc::new(FakeChain::new(script)),
            AvalancheNetwork::Fuji,
            RECEIVER,
        )
    }

    /// Signs the request's authorization with `signer` and makes it the payer.
    fn signed(signer: &PrivateKeySigner, mut req: PaymentRequest) -> PaymentRequest {
        req.payment_payload.payload.authorization.from = signer.address();
        let hash = authorization_signing_hash(
            &req.payment_payload.payload.authorization,
            AvalancheNetwork::Fuji,
        );
        let sig = signer.sign_hash_sync(&hash).unwrap();
        req.payment_payload.payload.signature =
            format!("0x{}", alloy_primitives::hex::encode(sig.as_bytes()));
        req
    }

    fn test_signer() -> PrivateKeySigner {
        "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
            .parse()
            .unwrap()
    }

    const FUJI_RECEIVER: &str = "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB2";

    #[test]
    fn concrete_fuji_payment_verifies() {
        let req = request(&body("avalanche-fuji", FUJI_RECEIVER, &dummy_signature()));
        assert_eq!(facilitator(Script::Confirm).verify(&req), VerificationResult::Valid);
    }

    #[test]
    fn wrong_network_is_rejected_first() {
        let req = request(&body(
            "avalanche",
            "0xCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC3",
            &dummy_signature(),
        ));
        let result = facilitator(Script::Confirm).verify(&req);
        assert_eq!(result.invalid_reason(), Some("Network not supported"));
    }

    #[test]
    fn lowercase_receiver_verifies() {
        let req = request(&body(
            "avalanche-fuji",
            &FUJI_RECEIVER.to_lowercase(),
            &dummy_signature(),
        ));
        assert!(facilitator(Script::Confirm).verify(&req).is_valid());
    }

    #[test]
    fn wrong_receiver_is_rejected() {
        let req = request(&body(
            "avalanche-fuji",
            "0xCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC3",
            &dummy_signature(),
        ));
        let result = facilitator(Script::Confirm).verify(&req);
        assert_eq!(result.invalid_reason(), Some("Invalid receiver address"));
    }

    #[test]
    fn strict_policy_accepts_a_genuine_signature() {
        let req = signed(
            &test_signer(),
            request(&body("avalanche-fuji", FUJI_RECEIVER, &dummy_signature())),
        );
        let fac = facilitator(Script::Confirm).with_policy(VerificationPolicy::Strict);
        assert_eq!(fac.verify(&req), VerificationResult::Valid);
    }

    #[test]
    fn strict_policy_rejects_forged_signature() {
        let mut req = signed(
            &test_signer(),
            request(&body("avalanche-fuji", FUJI_RECEIVER, &dummy_signature())),
        );
        req.payment_payload.payload.authorization.value = U256::from(20_000u64);
        let fac = facilitator(Script::Confirm).with_policy(VerificationPolicy::Strict);
        assert_eq!(
            fac.verify(&req).invalid_reason(),
            Some("Signature does not match payer")
        );
    }

    #[test]
    fn strict_policy_checks_amount_and_asset() {
        let mut value = body("avalanche-fuji", FUJI_RECEIVER, &dummy_signature());
        value["paymentRequirements"]["maxAmountRequired"] = json!("10001");
        let fac = facilitator(Script::Confirm).with_policy(VerificationPolicy::Strict);
        assert_eq!(
            fac.verify(&request(&value)).invalid_reason(),
            Some("Payment amount is invalid with respect to the payment requirements")
        );

        let mut value = body("avalanche-fuji", FUJI_RECEIVER, &dummy_signature());
        value["paymentRequirements"]["asset"] = json!("0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E");
        assert_eq!(
            fac.verify(&request(&value)).invalid_reason(),
            Some("Payment asset is invalid with respect to the payment requirements")
        );
    }

    #[test]
    fn strict_policy_rejects_short_signature() {
        let req = request(&body("avalanche-fuji", FUJI_RECEIVER, "0x1234"));
        let fac = facilitator(Script::Confirm).with_policy(VerificationPolicy::Strict);
        assert_eq!(fac.verify(&req).invalid_reason(), Some("Invalid signature format"));
    }

    #[tokio::test]
    async fn confirmed_settlement_reports_hash() {
        let req = request(&body("avalanche-fuji", FUJI_RECEIVER, &dummy_signature()));
        let result = facilitator(Script::Confirm).settle(&req).await;
        assert_eq!(
            result,
            SettlementResult::Success {
                transaction: FakeChain::TX_HASH,
                network: "avalanche-fuji".into(),
            }
        );
    }

    #[tokio::test]
    async fn reverted_settlement_keeps_hash() {
        let req = request(&body("avalanche-fuji", FUJI_RECEIVER, &dummy_signature()));
        let result = facilitator(Script::Revert).settle(&req).await;
        assert_eq!(result.error(), Some("Transaction failed"));
        assert_eq!(result.tx_hash(), Some(&FakeChain::TX_HASH));
    }

    #[tokio::test]
    async fn rpc_failure_is_reported_without_hash() {
        let req = request(&body("avalanche-fuji", FUJI_RECEIVER, &dummy_signature()));
        let result = facilitator(Script::RejectSubmission).settle(&req).await;
        assert!(!result.is_success());
        assert_eq!(result.tx_hash(), None);
        assert_eq!(
            result.error(),
            Some("Error settling payment: connection refused")
        );
    }

    #[tokio::test]
    async fn mismatched_settlement_never_reaches_the_chain() {
        let fac = facilitator(Script::Confirm);
        let req = request(&body("avalanche", FUJI_RECEIVER, &dummy_signature()));
        let result = fac.settle(&req).await;
        assert_eq!(result.error(), Some("Network not supported"));
        assert!(fac.chain().submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_signature_fails_before_submission() {
        let fac = facilitator(Script::Confirm);
        let req = request(&body("avalanche-fuji", FUJI_RECEIVER, "0xabcd"));
        let result = fac.settle(&req).await;
        assert_eq!(result.error(), Some("Invalid signature format"));
        assert!(fac.chain().submitted.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn requirement_timeout_bounds_the_wait() {
        let mut value = body("avalanche-fuji", FUJI_RECEIVER, &dummy_signature());
        value["paymentRequirements"]["maxTimeoutSeconds"] = json!(7);
        let result = facilitator(Script::Hang).settle(&request(&value)).await;
        assert_eq!(
            result.error(),
            Some("Timed out after 7s waiting for transaction receipt")
        );
        assert_eq!(result.tx_hash(), Some(&FakeChain::TX_HASH));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_submission_returns_within_the_requirement_timeout() {
        let mut value = body("avalanche-fuji", FUJI_RECEIVER, &dummy_signature());
        value["paymentRequirements"]["maxTimeoutSeconds"] = json!(7);
        let fac = facilitator(Script::HangSubmission);
        let req = request(&value);
        let result = tokio::time::timeout(Duration::from_secs(3600), fac.settle(&req))
            .await
            .expect("settle must return once the requirement timeout passes");
        assert_eq!(
            result.error(),
            Some("Error settling payment: Timed out after 7s submitting transaction")
        );
        assert_eq!(result.tx_hash(), None);
    }

    #[tokio::test]
    async fn balance_is_flat_and_decimal() {
        let fac = facilitator(Script::Confirm);
        let balance = fac.balance().await.unwrap();
        assert_eq!(
            serde_json::to_value(balance).unwrap(),
            json!({
                "address": fac.chain().signer_address().to_checksum(None),
                "balance": "1500000000000000000",
                "network": "avalanche-fuji",
            })
        );
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("STRICT".parse(), Ok(VerificationPolicy::Strict));
        assert_eq!("lenient".parse(), Ok(VerificationPolicy::Lenient));
        assert!("paranoid".parse::<VerificationPolicy>().is_err());
    }
}
