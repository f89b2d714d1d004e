//! Session control operations behind the HTTP API.
//!
//! The service only toggles `active` and sets `plan` on sessions, plus the
//! client acknowledgement path, which removes pending blocks through the same
//! primitive the settlement scheduler uses. The plan always comes from the
//! chain: a client cannot pick its own tier.

use std::sync::Arc;

use tracing::{debug, info};

use crate::address::UserAddress;
use crate::error::ControlError;
use crate::gateway::ChainGateway;
use crate::plan::Plan;
use crate::store::SharedState;
use crate::types::SessionView;

#[derive(Clone)]
pub struct MinerService {
    state: SharedState,
    gateway: Arc<dyn ChainGateway>,
}

impl MinerService {
    pub fn new(state: SharedState, gateway: Arc<dyn ChainGateway>) -> Self {
        Self { state, gateway }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Start mining for `user` on the plan recorded on-chain.
    ///
    /// `requested` is only compared against the chain's answer for logging.
    /// Returns the verified plan.
    pub async fn start(
        &self,
        user: &UserAddress,
        requested: Option<u64>,
    ) -> Result<Plan, ControlError> {
        if !self.gateway.is_subscription_active(user).await? {
            return Err(ControlError::NotSubscribed);
        }

        let raw = self.gateway.plan_of(user).await?;
        let plan = Plan::try_from(raw)
            .ok()
            .filter(|p| p.is_mineable())
            .ok_or(ControlError::InvalidPlan(raw))?;

        if let Some(requested) = requested.filter(|r| *r != raw) {
            debug!(%user, requested, verified = raw, "Requested plan ignored in favour of on-chain plan");
        }

        self.state.lock().activate(user, plan);
        info!(%user, %plan, "Mining started");
        Ok(plan)
    }

    /// Stop mining for `user`. Unknown addresses are a no-op.
    pub fn stop(&self, user: &UserAddress) {
        if self.state.lock().deactivate(user) {
            info!(%user, "Mining stopped");
        }
    }

    pub fn status(&self, user: &UserAddress) -> SessionView {
        self.state.lock().view(user)
    }

    /// Forget blocks the client minted itself so settlement never resubmits
    /// them. Returns the remaining pending count.
    pub fn acknowledge_settled(
        &self,
        user: &UserAddress,
        block_numbers: &[u64],
    ) -> Result<usize, ControlError> {
        let remaining = self
            .state
            .lock()
            .remove_blocks(user, block_numbers)
            .ok_or(ControlError::SessionNotFound)?;
        info!(%user, remaining, "Removed minted blocks");
        Ok(remaining)
    }

    pub fn network_hash_rate(&self) -> u64 {
        self.state.lock().network_hash_rate()
    }

    /// Rolling mean discovery interval: `"N/A"` or seconds with two decimals.
    pub fn average_block_interval(&self) -> String {
        self.state.lock().history().format_average()
    }
}
