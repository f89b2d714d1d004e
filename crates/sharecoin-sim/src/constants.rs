//! Simulator constants. Intervals are defaults; the server may override them.

use std::time::Duration;

/// Discovery trial cadence.
pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(10);

/// Batched settlement cadence.
pub const SETTLEMENT_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Discovery timestamps kept for the rolling average block interval.
pub const BLOCK_TIME_HISTORY: usize = 50;

/// Exclusive upper bound of the nonce attached to each pseudo-block.
pub const NONCE_RANGE: u64 = 1_000_000_000;

/// Nominal hash rates shown per tier (H/s).
pub const BASIC_HASH_RATE: u64 = 500;
pub const STANDARD_HASH_RATE: u64 = 2_000;
pub const PREMIUM_HASH_RATE: u64 = 5_000;

/// Default per-tick discovery probabilities.
pub const BASIC_FIND_PROBABILITY: f64 = 1.0 / 720.0;
pub const STANDARD_FIND_PROBABILITY: f64 = 1.0 / 480.0;
pub const PREMIUM_FIND_PROBABILITY: f64 = 1.0 / 360.0;
