//! Shared fixtures for the scenario and property suites.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use sharecoin_sim::testing::MockChain;
use sharecoin_sim::{
    ChainGateway, DiscoveryScheduler, MinerService, MinerState, ProbabilityTable,
    SettlementScheduler, SharedState, UserAddress,
};

/// Deterministic address derived from a seed byte.
pub fn user(seed: u8) -> UserAddress {
    UserAddress::parse(&format!("0x{}", hex::encode([seed; 20]))).unwrap()
}

/// A simulator wired to one mock chain: state, control service, and both
/// schedulers sharing it.
pub struct Harness {
    pub chain: Arc<MockChain>,
    pub state: SharedState,
    pub service: MinerService,
    pub discovery: DiscoveryScheduler<StdRng>,
    pub settlement: SettlementScheduler,
}

impl Harness {
    /// Chain with `confirmed` recorded blocks; the counter is seeded from it
    /// the same way the server does at startup.
    pub fn new(confirmed: u64, find_probability: f64) -> Self {
        let chain = Arc::new(MockChain::new(confirmed));
        let gateway: Arc<dyn ChainGateway> = chain.clone();
        let state = MinerState::new(confirmed).into_shared();

        let service = MinerService::new(state.clone(), gateway.clone());
        let discovery =
            DiscoveryScheduler::with_rng(state.clone(), gateway.clone(), StdRng::seed_from_u64(99))
                .with_probabilities(ProbabilityTable::fixed(find_probability));
        let settlement = SettlementScheduler::new(state.clone(), gateway);

        Self {
            chain,
            state,
            service,
            discovery,
            settlement,
        }
    }

    /// Subscribe `seed`'s address on `plan` and start its session.
    pub async fn start_miner(&self, seed: u8, plan: u64) -> UserAddress {
        let addr = user(seed);
        self.chain.subscribe(&addr, plan);
        self.service.start(&addr, Some(plan)).await.unwrap();
        addr
    }

    pub fn pending_numbers(&self, addr: &UserAddress) -> Vec<u64> {
        self.service
            .status(addr)
            .blocks_found
            .iter()
            .map(|b| b.block_number)
            .collect()
    }
}
