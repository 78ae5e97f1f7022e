use alloy_network::EthereumWallet;
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy_provider::{Identity, PendingTransactionBuilder, Provider, ProviderBuilder, RootProvider};
use alloy_rpc_types_eth::TransactionReceipt;
use alloy_signer_local::PrivateKeySigner;
#[cfg(feature = "telemetry")]
use tracing::Instrument;
use url::Url;

use super::{
    ChainError, PendingNonceManager, ReceiptStatus, SettlementChain, SubmissionLane, TransferCall,
};
use crate::exact::facilitator::IEIP3009;

/// Combined filler type for gas, blob gas, nonce, and chain ID.
pub type InnerFiller = JoinFill<
    GasFiller,
    JoinFill<BlobGasFiller, JoinFill<NonceFiller<PendingNonceManager>, ChainIdFiller>>,
>;

/// The composed alloy provider: fillers, wallet signing and an HTTP root provider.
pub type InnerProvider = FillProvider<
    JoinFill<JoinFill<Identity, InnerFiller>, WalletFiller<EthereumWallet>>,
    RootProvider,
>;

/// [`SettlementChain`] over a JSON-RPC endpoint with a single local signer.
///
/// # Submission ordering
///
/// Sends go through a [`SubmissionLane`], held from nonce assignment until
/// the node accepts the raw transaction. Receipt waits run outside it, so
/// confirmations of concurrent settlements overlap while nonces stay gapless.
/// A send that fails or is cancelled resets the cached nonce.
#[derive(Debug)]
pub struct Eip155ChainProvider {
    inner: InnerProvider,
    signer: Address,
    confirmations: u64,
    lane: SubmissionLane,
}

impl Eip155ChainProvider {
    /// Connects to `rpc_url`, signing with `signer`.
    ///
    /// `confirmations` is the number of blocks a receipt must be buried
    /// under before it is reported.
    #[must_use]
    pub fn connect(signer: PrivateKeySigner, rpc_url: Url, confirmations: u64) -> Self {
        let address = signer.address();
        let nonce_manager = PendingNonceManager::default();
        let filler = JoinFill::new(
            GasFiller,
            JoinFill::new(
                BlobGasFiller::default(),
                JoinFill::new(
                    NonceFiller::new(nonce_manager.clone()),
                    ChainIdFiller::default(),
                ),
            ),
        );

        #[cfg(feature = "telemetry")]
        tracing::info!(rpc_url = %rpc_url, signer = %address, "Using EVM provider");

        let inner: InnerProvider = ProviderBuilder::default()
            .filler(filler)
            .wallet(EthereumWallet::from(signer))
            .connect_http(rpc_url);

        Self {
            inner,
            signer: address,
            confirmations: confirmations.max(1),
            lane: SubmissionLane::new(address, nonce_manager),
        }
    }
}

fn classify(receipt: &TransactionReceipt) -> ReceiptStatus {
    if receipt.status() {
        ReceiptStatus::Confirmed
    } else {
        ReceiptStatus::Reverted
    }
}

impl SettlementChain for Eip155ChainProvider {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn submit_transfer(&self, call: TransferCall) -> Result<TxHash, ChainError> {
        let contract = IEIP3009::new(call.token, &self.inner);
        let tx = contract
            .transferWithAuthorization(
                call.from,
                call.to,
                call.value,
                call.valid_after,
                call.valid_before,
                call.nonce,
                call.v,
                call.r,
                call.s,
            )
            .from(self.signer);

        let send = tx.send();
        #[cfg(feature = "telemetry")]
        let send = send.instrument(tracing::info_span!("transferWithAuthorization",
            token = %call.token,
            from = %call.from,
            to = %call.to,
            value = %call.value,
            otel.kind = "client",
        ));

        let pending = self.lane.submit(send).await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ReceiptStatus, ChainError> {
        let receipt = PendingTransactionBuilder::new(self.inner.root().clone(), tx_hash)
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await?;
        Ok(classify(&receipt))
    }

    async fn native_balance(&self) -> Result<U256, ChainError> {
        Ok(self.inner.get_balance(self.signer).await?)
    }
}
