//! Batched on-chain settlement of pending pseudo-blocks.
//!
//! Each pass snapshots every non-empty pending list, then per user:
//! 1. asks the contract which snapshot blocks are already consumed (stale),
//! 2. submits the fresh remainder as one batch signed by the service key,
//! 3. removes exactly the snapshot from the pending list and pulls the
//!    block-number counter up to the chain's new count.
//!
//! Blocks discovered while a batch is in flight are not in the snapshot and
//! stay pending for the next pass. Any remote failure leaves that user's
//! list untouched; the next pass redoes the reconciliation from scratch.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::address::UserAddress;
use crate::error::GatewayError;
use crate::gateway::ChainGateway;
use crate::store::SharedState;
use crate::types::PseudoBlock;

/// Outcome counts of one settlement pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementReport {
    /// Users whose fresh blocks were minted.
    pub settled_users: usize,
    pub minted_blocks: usize,
    /// Blocks dropped because the chain already had them.
    pub stale_blocks: usize,
    /// Users left untouched after a remote failure.
    pub failed_users: usize,
}

/// What happened to one user's snapshot.
#[derive(Debug)]
enum UserOutcome {
    Minted { minted: usize, stale: usize },
    AllStale { stale: usize },
}

pub struct SettlementScheduler {
    state: SharedState,
    gateway: Arc<dyn ChainGateway>,
}

impl SettlementScheduler {
    pub fn new(state: SharedState, gateway: Arc<dyn ChainGateway>) -> Self {
        Self { state, gateway }
    }

    /// Run one pass over all users with pending blocks.
    pub async fn run_once(&self) -> SettlementReport {
        let mut report = SettlementReport::default();
        let snapshot = self.state.lock().pending_snapshot();

        for (user, blocks) in snapshot {
            match self.settle_user(&user, &blocks).await {
                Ok(UserOutcome::Minted { minted, stale }) => {
                    report.settled_users += 1;
                    report.minted_blocks += minted;
                    report.stale_blocks += stale;
                }
                Ok(UserOutcome::AllStale { stale }) => report.stale_blocks += stale,
                Err(e) => {
                    warn!(%user, error = %e, "Settlement failed, blocks kept for next run");
                    report.failed_users += 1;
                }
            }
        }

        report
    }

    async fn settle_user(
        &self,
        user: &UserAddress,
        blocks: &[PseudoBlock],
    ) -> Result<UserOutcome, GatewayError> {
        let mut fresh = Vec::with_capacity(blocks.len());
        let mut stale = 0usize;
        for block in blocks {
            if self.gateway.is_block_consumed(user, block.block_number).await? {
                debug!(%user, block_number = block.block_number, "Block already used, skipping");
                stale += 1;
            } else {
                fresh.push(block);
            }
        }

        let evaluated: Vec<u64> = blocks.iter().map(|b| b.block_number).collect();

        if fresh.is_empty() {
            self.state.lock().remove_blocks(user, &evaluated);
            return Ok(UserOutcome::AllStale { stale });
        }

        let block_numbers: Vec<u64> = fresh.iter().map(|b| b.block_number).collect();
        let nonces: Vec<u64> = fresh.iter().map(|b| b.nonce).collect();

        info!(%user, count = block_numbers.len(), "Minting blocks");
        let receipt = self.gateway.submit_batch(user, &block_numbers, &nonces).await?;

        let remaining = self.state.lock().remove_blocks(user, &evaluated);
        info!(
            %user,
            tx = %receipt.tx_hash,
            minted = block_numbers.len(),
            remaining = remaining.unwrap_or(0),
            "Batch minted"
        );

        // The mint already happened; a failed re-sync only delays catching up.
        match self.gateway.confirmed_block_count().await {
            Ok(confirmed) => {
                let mut state = self.state.lock();
                if state.resync_counter(confirmed) {
                    info!(next_block = state.next_block_number(), "Re-synced block counter");
                }
            }
            Err(e) => warn!(error = %e, "Block count re-sync failed"),
        }

        Ok(UserOutcome::Minted {
            minted: block_numbers.len(),
            stale,
        })
    }

    /// Settle forever at `every`.
    pub async fn run(self, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; settlement waits a full period.
        ticker.tick().await;
        info!(interval_secs = every.as_secs(), "Settlement scheduler started");

        loop {
            ticker.tick().await;
            info!("Checking blocks for automatic minting");
            let report = self.run_once().await;
            info!(
                settled_users = report.settled_users,
                minted = report.minted_blocks,
                stale = report.stale_blocks,
                failed_users = report.failed_users,
                "Settlement run complete"
            );
        }
    }
}
