//! Nonce tracking for the facilitator's signing account.

use std::sync::Arc;

use alloy_network::Network;
use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_provider::fillers::NonceManager;
use alloy_transport::TransportResult;
use dashmap::DashMap;
use tokio::sync::Mutex;

/// Last nonce handed out for an address, `None` until seeded from the node.
type Slot = Arc<Mutex<Option<u64>>>;

/// Nonce manager seeded from the `pending` transaction count.
///
/// The first assignment for an address asks the node for
/// `eth_getTransactionCount(.., "pending")`; later ones count up locally.
/// [`reset_nonce`](Self::reset_nonce) drops the cached value so the next
/// assignment asks the node again.
///
/// Assignments for one address are serialized by a per-address lock, but a
/// reset is not ordered against an assignment in flight. Callers that reset
/// must hold the submission lane, as
/// [`SubmissionLane`](super::SubmissionLane) does.
#[derive(Clone, Debug, Default)]
pub struct PendingNonceManager {
    slots: Arc<DashMap<Address, Slot>>,
}

#[async_trait::async_trait]
impl NonceManager for PendingNonceManager {
    async fn get_next_nonce<P, N>(&self, provider: &P, address: Address) -> TransportResult<u64>
    where
        P: Provider<N>,
        N: Network,
    {
        let slot = self.slot(address);
        let mut last = slot.lock().await;
        let next = match *last {
            Some(assigned) => assigned + 1,
            None => provider.get_transaction_count(address).pending().await?,
        };
        *last = Some(next);

        #[cfg(feature = "telemetry")]
        tracing::trace!(%address, nonce = next, "assigned nonce");

        Ok(next)
    }
}

impl PendingNonceManager {
    fn slot(&self, address: Address) -> Slot {
        Arc::clone(self.slots.entry(address).or_default().value())
    }

    /// Forgets the cached nonce for `address`.
    ///
    /// Synchronous so it can run from a drop guard. An assignment that is
    /// already holding the old slot finishes against it and is discarded.
    pub fn reset_nonce(&self, address: Address) {
        if self.slots.remove(&address).is_some() {
            #[cfg(feature = "telemetry")]
            tracing::debug!(%address, "nonce cache reset");
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{U64, address};
    use alloy_network::Ethereum;
    use alloy_provider::{ProviderBuilder, RootProvider};
    use alloy_transport::mock::Asserter;

    use super::*;

    const SIGNER: Address = address!("0x00000000000000000000000000000000000000fa");

    #[tokio::test]
    async fn seeds_from_node_then_counts_locally() {
        let asserter = Asserter::new();
        let provider: RootProvider<Ethereum> = ProviderBuilder::default().connect_mocked_client(asserter.clone());
        let nonces = PendingNonceManager::default();

        asserter.push_success(&U64::from(7));
        assert_eq!(nonces.get_next_nonce(&provider, SIGNER).await.unwrap(), 7);
        // No second response queued: a re-query would fail.
        assert_eq!(nonces.get_next_nonce(&provider, SIGNER).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn reset_requeries_pending_count() {
        let asserter = Asserter::new();
        let provider: RootProvider<Ethereum> = ProviderBuilder::default().connect_mocked_client(asserter.clone());
        let nonces = PendingNonceManager::default();

        asserter.push_success(&U64::from(7));
        assert_eq!(nonces.get_next_nonce(&provider, SIGNER).await.unwrap(), 7);

        nonces.reset_nonce(SIGNER);
        asserter.push_success(&U64::from(7));
        assert_eq!(nonces.get_next_nonce(&provider, SIGNER).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn concurrent_assignments_are_consecutive() {
        let asserter = Asserter::new();
        let provider: RootProvider<Ethereum> = ProviderBuilder::default().connect_mocked_client(asserter.clone());
        let nonces = PendingNonceManager::default();

        asserter.push_success(&U64::from(3));
        let (a, b) = tokio::join!(
            nonces.get_next_nonce(&provider, SIGNER),
            nonces.get_next_nonce(&provider, SIGNER),
        );
        let mut assigned = [a.unwrap(), b.unwrap()];
        assigned.sort_unstable();
        assert_eq!(assigned, [3, 4]);
    }

    #[tokio::test]
    async fn failed_seed_leaves_nothing_cached() {
        let asserter = Asserter::new();
        let provider: RootProvider<Ethereum> = ProviderBuilder::default().connect_mocked_client(asserter.clone());
        let nonces = PendingNonceManager::default();

        asserter.push_failure_msg("node unavailable");
        assert!(nonces.get_next_nonce(&provider, SIGNER).await.is_err());

        asserter.push_success(&U64::from(12));
        assert_eq!(nonces.get_next_nonce(&provider, SIGNER).await.unwrap(), 12);
    }
}
