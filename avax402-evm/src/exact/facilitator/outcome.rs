//! Maps executor results onto the `/settle` wire shape.

use avax402::proto::SettlementResult;

use super::executor::{ExecutorError, SettlementReceipt};
use crate::chain::ReceiptStatus;

/// Error text for a mined transaction that reverted.
pub const TRANSACTION_FAILED: &str = "Transaction failed";

/// Prefix for failures before the transaction reached the node.
pub const SETTLEMENT_ERROR: &str = "Error settling payment";

/// Error text when the signature cannot be split into `(v, r, s)`.
pub const INVALID_SIGNATURE_FORMAT: &str = "Invalid signature format";

/// Converts the result of [`SettlementExecutor::settle`](super::executor::SettlementExecutor::settle).
#[must_use]
pub fn settlement_outcome(
    result: Result<SettlementReceipt, ExecutorError>,
    network: &str,
) -> SettlementResult {
    let network = network.to_owned();
    match result {
        Ok(SettlementReceipt {
            tx_hash,
            status: ReceiptStatus::Confirmed,
        }) => SettlementResult::Success {
            transaction: tx_hash,
            network,
        },
        Ok(SettlementReceipt {
            tx_hash,
            status: ReceiptStatus::Reverted,
        }) => SettlementResult::Failure {
            error: TRANSACTION_FAILED.to_owned(),
            transaction: Some(tx_hash),
            network,
        },
        Err(e @ (ExecutorError::Submission(_) | ExecutorError::SubmissionTimeout { .. })) => {
            SettlementResult::Failure {
                error: format!("{SETTLEMENT_ERROR}: {e}"),
                transaction: None,
                network,
            }
        }
        Err(e) => SettlementResult::Failure {
            error: e.to_string(),
            transaction: e.tx_hash(),
            network,
        },
    }
}

/// A settlement refused before anything was submitted.
#[must_use]
pub fn rejected(reason: impl Into<String>, network: &str) -> SettlementResult {
    SettlementResult::Failure {
        error: reason.into(),
        transaction: None,
        network: network.to_owned(),
    }
}
