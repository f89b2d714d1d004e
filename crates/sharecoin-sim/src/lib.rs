//! # sharecoin-sim — Cloud-mining simulation and on-chain settlement.
//!
//! Tracks one mining session per subscriber, draws probabilistic block
//! discoveries on a fixed tick, and periodically settles discovered
//! pseudo-blocks on the ShareCoin contract in one batched mint per user:
//! - [`store::MinerState`] — sessions, the shared block-number counter, and
//!   the discovery-time history behind one mutex
//! - [`discovery::DiscoveryScheduler`] — the per-tick probability trial
//! - [`settlement::SettlementScheduler`] — reconcile and batch-mint pending blocks
//! - [`service::MinerService`] — session control for the HTTP layer
//! - [`gateway::ChainGateway`] — the contract calls the simulator depends on

pub mod address;
pub mod constants;
pub mod counter;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod history;
pub mod plan;
pub mod service;
pub mod settlement;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use address::UserAddress;
pub use discovery::DiscoveryScheduler;
pub use gateway::ChainGateway;
pub use plan::{Plan, ProbabilityTable};
pub use service::MinerService;
pub use settlement::SettlementScheduler;
pub use store::{MinerState, SharedState};
