//! Error types for the mining simulator.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("missing userAddress")] Missing,
    #[error("invalid address: {0}")] InvalidFormat(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("unknown plan tier: {0}")] UnknownTier(u64),
}

/// Failure of a remote contract call. Never fatal outside startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("rpc: {0}")] Rpc(String),
    #[error("call timed out after {0}s")] Timeout(u64),
    #[error("transaction reverted: {0}")] Reverted(String),
    #[error("invalid response: {0}")] InvalidResponse(String),
}

/// Rejection returned by the session control operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error(transparent)] Address(#[from] AddressError),
    #[error("No active subscription on-chain.")] NotSubscribed,
    #[error("on-chain plan {0} is not a mineable tier")] InvalidPlan(u64),
    #[error("No miner state found")] SessionNotFound,
    #[error("chain unavailable: {0}")] Gateway(#[from] GatewayError),
}
