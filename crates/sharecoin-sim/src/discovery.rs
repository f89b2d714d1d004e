//! Probabilistic block discovery.
//!
//! Every tick walks the active sessions in a fixed order. Each session's
//! subscription is re-checked on-chain first; a lapsed subscription stops the
//! session without a trial. Otherwise one uniform sample is compared against
//! the tier's probability and, on a hit, a pseudo-block is appended.
//!
//! One pass finishes before the next starts, so ticks for the same address
//! never overlap.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::gateway::ChainGateway;
use crate::plan::ProbabilityTable;
use crate::store::{SharedState, Trial};

/// Outcome counts of one discovery pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Sessions that ran a probability trial.
    pub evaluated: usize,
    pub found: usize,
    /// Sessions stopped because the chain reported no subscription.
    pub lapsed: usize,
    /// Sessions skipped because the subscription check failed.
    pub failed: usize,
}

pub struct DiscoveryScheduler<R = StdRng> {
    state: SharedState,
    gateway: Arc<dyn ChainGateway>,
    probabilities: ProbabilityTable,
    rng: R,
}

impl DiscoveryScheduler<StdRng> {
    pub fn new(state: SharedState, gateway: Arc<dyn ChainGateway>) -> Self {
        Self::with_rng(state, gateway, StdRng::from_entropy())
    }
}

impl<R: Rng + Send> DiscoveryScheduler<R> {
    /// Scheduler drawing from a caller-supplied generator (seeded in tests).
    pub fn with_rng(state: SharedState, gateway: Arc<dyn ChainGateway>, rng: R) -> Self {
        Self {
            state,
            gateway,
            probabilities: ProbabilityTable::default(),
            rng,
        }
    }

    pub fn with_probabilities(mut self, probabilities: ProbabilityTable) -> Self {
        self.probabilities = probabilities;
        self
    }

    /// Run one pass over all active sessions.
    ///
    /// A failed subscription check leaves that session as it was and moves on
    /// to the next one.
    pub async fn tick(&mut self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let candidates = self.state.lock().active_addresses();

        for user in candidates {
            match self.gateway.is_subscription_active(&user).await {
                Ok(true) => {}
                Ok(false) => {
                    if self.state.lock().deactivate(&user) {
                        info!(%user, "Subscription lapsed, mining stopped");
                    }
                    report.lapsed += 1;
                    continue;
                }
                Err(e) => {
                    warn!(%user, error = %e, "Subscription check failed, skipping this tick");
                    report.failed += 1;
                    continue;
                }
            }

            let now_ms = chrono::Utc::now().timestamp_millis();
            let trial = self
                .state
                .lock()
                .record_discovery(&user, &mut self.rng, &self.probabilities, now_ms);

            match trial {
                // Stopped while the subscription read was in flight.
                Trial::Skipped => debug!(%user, "Session stopped mid-tick"),
                Trial::Miss => report.evaluated += 1,
                Trial::Found(block) => {
                    report.evaluated += 1;
                    report.found += 1;
                    info!(%user, block_number = block.block_number, "Found block");
                }
            }
        }

        report
    }

    /// Tick forever at `every`. A slow pass delays the next tick rather than
    /// bunching missed ones.
    pub async fn run(mut self, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = every.as_secs(), "Discovery scheduler started");

        loop {
            ticker.tick().await;
            let report = self.tick().await;
            debug!(
                evaluated = report.evaluated,
                found = report.found,
                lapsed = report.lapsed,
                failed = report.failed,
                "Discovery pass complete"
            );
        }
    }
}
