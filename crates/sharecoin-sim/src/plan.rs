//! Subscription tiers and their mining parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    BASIC_FIND_PROBABILITY, BASIC_HASH_RATE, PREMIUM_FIND_PROBABILITY, PREMIUM_HASH_RATE,
    STANDARD_FIND_PROBABILITY, STANDARD_HASH_RATE,
};
use crate::error::PlanError;

/// Subscription tier as recorded by the contract's `userPlan`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u64")]
pub enum Plan {
    #[default]
    None = 0,
    Basic = 1,
    Standard = 2,
    Premium = 3,
    /// Purchasable on-chain but not served by the simulator.
    Lifetime = 4,
}

impl Plan {
    /// Whether a session may be started on this tier.
    pub fn is_mineable(self) -> bool {
        matches!(self, Plan::Basic | Plan::Standard | Plan::Premium)
    }

    /// Displayed hash rate for the tier. Cosmetic.
    pub fn nominal_hash_rate(self) -> u64 {
        match self {
            Plan::Basic => BASIC_HASH_RATE,
            Plan::Standard => STANDARD_HASH_RATE,
            Plan::Premium => PREMIUM_HASH_RATE,
            Plan::None | Plan::Lifetime => 0,
        }
    }

    pub fn tier(self) -> u8 {
        self as u8
    }
}

impl From<Plan> for u8 {
    fn from(plan: Plan) -> Self {
        plan.tier()
    }
}

impl TryFrom<u64> for Plan {
    type Error = PlanError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Plan::None),
            1 => Ok(Plan::Basic),
            2 => Ok(Plan::Standard),
            3 => Ok(Plan::Premium),
            4 => Ok(Plan::Lifetime),
            other => Err(PlanError::UnknownTier(other)),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Plan::None => "None",
            Plan::Basic => "Basic",
            Plan::Standard => "Standard",
            Plan::Premium => "Premium",
            Plan::Lifetime => "Lifetime",
        };
        f.write_str(name)
    }
}

/// Per-tick probability that an active session discovers a block.
///
/// Non-mineable tiers always map to zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbabilityTable {
    pub basic: f64,
    pub standard: f64,
    pub premium: f64,
}

impl Default for ProbabilityTable {
    fn default() -> Self {
        Self {
            basic: BASIC_FIND_PROBABILITY,
            standard: STANDARD_FIND_PROBABILITY,
            premium: PREMIUM_FIND_PROBABILITY,
        }
    }
}

impl ProbabilityTable {
    /// Same probability for every mineable tier, clamped to `[0, 1]`.
    pub fn fixed(probability: f64) -> Self {
        let p = probability.clamp(0.0, 1.0);
        Self {
            basic: p,
            standard: p,
            premium: p,
        }
    }

    pub fn for_plan(&self, plan: Plan) -> f64 {
        match plan {
            Plan::Basic => self.basic,
            Plan::Standard => self.standard,
            Plan::Premium => self.premium,
            Plan::None | Plan::Lifetime => 0.0,
        }
    }
}
