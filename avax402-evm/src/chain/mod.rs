//! The seam between the settlement pipeline and an EVM node.
//!
//! [`SettlementChain`] is everything the facilitator needs from the chain:
//! submit an ERC-3009 transfer, wait for its receipt and read the signer's
//! native balance. [`Eip155ChainProvider`] implements it over alloy; tests
//! implement it with in-memory fakes.

use std::sync::Arc;

use alloy_primitives::{Address, B256, TxHash, U256};
use alloy_provider::PendingTransactionError;
use alloy_transport::TransportError;

mod lane;
mod nonce;
mod provider;

pub use lane::SubmissionLane;
pub use nonce::PendingNonceManager;
pub use provider::{Eip155ChainProvider, InnerFiller, InnerProvider};

/// Arguments of `transferWithAuthorization(from, to, value, validAfter, validBefore, nonce, v, r, s)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCall {
    /// Token contract to call.
    pub token: Address,
    /// Payer.
    pub from: Address,
    /// Payee.
    pub to: Address,
    /// Amount in the token's smallest unit.
    pub value: U256,
    /// Start of the validity window.
    pub valid_after: U256,
    /// End of the validity window.
    pub valid_before: U256,
    /// Authorization nonce.
    pub nonce: B256,
    /// Recovery byte.
    pub v: u8,
    /// Signature `r`.
    pub r: B256,
    /// Signature `s`.
    pub s: B256,
}

/// How a mined transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// The transaction succeeded.
    Confirmed,
    /// The transaction was mined but reverted.
    Reverted,
}

/// Errors talking to the chain.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// RPC transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Error while watching a pending transaction.
    #[error(transparent)]
    PendingTransaction(#[from] PendingTransactionError),
    /// Contract call could not be built or decoded.
    #[error("Contract call failed: {0}")]
    ContractCall(String),
    /// Any other failure.
    #[error("{0}")]
    Custom(String),
}

impl From<alloy_contract::Error> for ChainError {
    fn from(e: alloy_contract::Error) -> Self {
        match e {
            alloy_contract::Error::UnknownFunction(_)
            | alloy_contract::Error::UnknownSelector(_)
            | alloy_contract::Error::NotADeploymentTransaction
            | alloy_contract::Error::ContractNotDeployed
            | alloy_contract::Error::ZeroData(_, _)
            | alloy_contract::Error::AbiError(_) => Self::ContractCall(e.to_string()),
            alloy_contract::Error::TransportError(e) => Self::Transport(e),
            alloy_contract::Error::PendingTransactionError(e) => Self::PendingTransaction(e),
        }
    }
}

/// Chain operations used by the settlement pipeline.
pub trait SettlementChain: Send + Sync {
    /// Address of the account that pays gas for settlements.
    fn signer_address(&self) -> Address;

    /// Submits a `transferWithAuthorization` call and returns its hash once the
    /// node has accepted it.
    fn submit_transfer(
        &self,
        call: TransferCall,
    ) -> impl Future<Output = Result<TxHash, ChainError>> + Send;

    /// Waits until `tx_hash` is mined and reports whether it succeeded.
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<ReceiptStatus, ChainError>> + Send;

    /// Native (AVAX) balance of the signer, in wei.
    fn native_balance(&self) -> impl Future<Output = Result<U256, ChainError>> + Send;
}

impl<T: SettlementChain> SettlementChain for Arc<T> {
    fn signer_address(&self) -> Address {
        (**self).signer_address()
    }

    fn submit_transfer(
        &self,
        call: TransferCall,
    ) -> impl Future<Output = Result<TxHash, ChainError>> + Send {
        (**self).submit_transfer(call)
    }

    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<ReceiptStatus, ChainError>> + Send {
        (**self).wait_for_receipt(tx_hash)
    }

    fn native_balance(&self) -> impl Future<Output = Result<U256, ChainError>> + Send {
        (**self).native_balance()
    }
}
