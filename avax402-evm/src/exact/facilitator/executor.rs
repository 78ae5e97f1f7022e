//! Submits an authorization on-chain and waits for the outcome.
//!
//! ```text
//! Submitted ──► Pending ──► Confirmed | Reverted
//!     │
//!     └──► Failed (no transaction hash)
//! ```
//!
//! One deadline covers both steps. Running out of time before the node
//! accepts the transaction drops the submission and reports no hash. A failure
//! after submission, including running out of time while waiting for the
//! receipt, keeps the transaction hash: the transfer may still land. Nothing
//! is retried here.

use std::time::Duration;

use alloy_primitives::TxHash;
use avax402::proto::PaymentAuthorization;
use tokio::time::{Instant, timeout_at};

use crate::chain::{ChainError, ReceiptStatus, SettlementChain, TransferCall};
use crate::networks::AvalancheNetwork;
use crate::signature::SplitSignature;

/// A mined settlement transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementReceipt {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Whether the transfer succeeded.
    pub status: ReceiptStatus,
}

/// Why settlement did not produce a receipt.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The node did not accept the transaction.
    #[error(transparent)]
    Submission(ChainError),
    /// The deadline passed before the node accepted the transaction.
    #[error("Timed out after {timeout_secs}s submitting transaction")]
    SubmissionTimeout {
        /// The bound that was exceeded.
        timeout_secs: u64,
    },
    /// The transaction was accepted but its receipt could not be fetched.
    #[error("Failed to get transaction receipt: {source}")]
    Receipt {
        /// Hash of the submitted transaction.
        tx_hash: TxHash,
        /// Underlying error.
        source: ChainError,
    },
    /// The receipt did not arrive in time.
    #[error("Timed out after {timeout_secs}s waiting for transaction receipt")]
    Timeout {
        /// Hash of the submitted transaction.
        tx_hash: TxHash,
        /// The bound that was exceeded.
        timeout_secs: u64,
    },
}

impl ExecutorError {
    /// The transaction hash, if the transaction reached the node.
    #[must_use]
    pub const fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::Submission(_) | Self::SubmissionTimeout { .. } => None,
            Self::Receipt { tx_hash, .. } | Self::Timeout { tx_hash, .. } => Some(*tx_hash),
        }
    }
}

/// Drives a single `transferWithAuthorization` through a [`SettlementChain`].
#[derive(Debug)]
pub struct SettlementExecutor<'a, C> {
    chain: &'a C,
}

impl<'a, C: SettlementChain> SettlementExecutor<'a, C> {
    /// Creates an executor over `chain`.
    pub const fn new(chain: &'a C) -> Self {
        Self { chain }
    }

    /// Submits the transfer to the USDC contract of `network` and waits for it
    /// to be mined, all within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Submission`] or
    /// [`ExecutorError::SubmissionTimeout`] if the transaction never reached
    /// the node, otherwise [`ExecutorError::Receipt`] or
    /// [`ExecutorError::Timeout`] carrying the hash.
    pub async fn settle(
        &self,
        authorization: &PaymentAuthorization,
        signature: &SplitSignature,
        network: AvalancheNetwork,
        timeout: Duration,
    ) -> Result<SettlementReceipt, ExecutorError> {
        let call = TransferCall {
            token: network.usdc().address,
            from: authorization.from,
            to: authorization.to,
            value: authorization.value,
            valid_after: authorization.valid_after,
            valid_before: authorization.valid_before,
            nonce: authorization.nonce,
            v: signature.v,
            r: signature.r,
            s: signature.s,
        };

        let deadline = Instant::now() + timeout;
        let timeout_secs = timeout.as_secs();

        let tx_hash = timeout_at(deadline, self.chain.submit_transfer(call))
            .await
            .map_err(|_| ExecutorError::SubmissionTimeout { timeout_secs })?
            .map_err(ExecutorError::Submission)?;

        #[cfg(feature = "telemetry")]
        tracing::info!(%tx_hash, %network, from = %call.from, "settlement transaction submitted");

        let status = timeout_at(deadline, self.chain.wait_for_receipt(tx_hash))
            .await
            .map_err(|_| ExecutorError::Timeout {
                tx_hash,
                timeout_secs,
            })?
            .map_err(|source| ExecutorError::Receipt { tx_hash, source })?;

        #[cfg(feature = "telemetry")]
        tracing::info!(%tx_hash, ?status, "settlement transaction mined");

        Ok(SettlementReceipt { tx_hash, status })
    }
}
