//! Single-writer submission for one signing account.
//!
//! Nonces are assigned inside the alloy filler stack while a send is being
//! polled. If that send fails or its future is dropped (a client disconnect,
//! a settlement deadline), the assigned nonce may never reach the node, and
//! every later transaction would queue behind the gap. The lane runs sends one
//! at a time and forgets the cached nonce whenever a send does not complete
//! successfully, so the next one re-reads the pending count.

use alloy_primitives::Address;
use tokio::sync::Mutex;

use super::PendingNonceManager;

/// Serializes sends from one address and repairs the nonce cache after an
/// incomplete send.
#[derive(Debug)]
pub struct SubmissionLane {
    address: Address,
    nonces: PendingNonceManager,
    turn: Mutex<()>,
}

impl SubmissionLane {
    /// Creates a lane for `address`, sharing `nonces` with the filler stack.
    #[must_use]
    pub fn new(address: Address, nonces: PendingNonceManager) -> Self {
        Self {
            address,
            nonces,
            turn: Mutex::new(()),
        }
    }

    /// Polls `send` to completion while holding the lane.
    ///
    /// `send` must be lazy (an `async` block or an unpolled future) so that
    /// nonce assignment happens after the lane is acquired.
    ///
    /// # Errors
    ///
    /// Returns whatever `send` returns. On error, or if this future is dropped
    /// before `send` finishes, the cached nonce is reset before the lane is
    /// released.
    pub async fn submit<F, T, E>(&self, send: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let _turn = self.turn.lock().await;
        // Declared after `_turn`, so it drops first.
        let mut unsent = Unsent {
            nonces: &self.nonces,
            address: self.address,
            armed: true,
        };
        let result = send.await;
        if result.is_ok() {
            unsent.armed = false;
        }
        result
    }
}

struct Unsent<'a> {
    nonces: &'a PendingNonceManager,
    address: Address,
    armed: bool,
}

impl Drop for Unsent<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.nonces.reset_nonce(self.address);
        }
    }
}
