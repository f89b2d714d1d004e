//! Contract interface consumed by the simulator.
//!
//! Every call is a remote round trip that may fail or time out. Reads are
//! pure; the batch submission is safe to retry because the contract rejects
//! block numbers it has already consumed rather than minting twice.

use async_trait::async_trait;

use crate::address::UserAddress;
use crate::error::GatewayError;

/// Receipt of a mined batch submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub tx_hash: String,
}

/// Calls against the ShareCoin contract.
///
/// Implemented over JSON-RPC by the server binary and in memory by
/// [`crate::testing::MockChain`].
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Whether `user` currently holds an unexpired subscription.
    async fn is_subscription_active(&self, user: &UserAddress) -> Result<bool, GatewayError>;

    /// Raw tier recorded for `user`. Not range-checked here.
    async fn plan_of(&self, user: &UserAddress) -> Result<u64, GatewayError>;

    /// Number of blocks the contract has recorded so far.
    async fn confirmed_block_count(&self) -> Result<u64, GatewayError>;

    /// Whether `block_number` has already been minted for `user`.
    async fn is_block_consumed(
        &self,
        user: &UserAddress,
        block_number: u64,
    ) -> Result<bool, GatewayError>;

    /// Mint `block_numbers` on behalf of `user`, signed by the service key.
    ///
    /// `nonces[i]` accompanies `block_numbers[i]`. Resolves once the
    /// transaction is mined; a reverted transaction is an error.
    async fn submit_batch(
        &self,
        user: &UserAddress,
        block_numbers: &[u64],
        nonces: &[u64],
    ) -> Result<SubmitReceipt, GatewayError>;
}
