//! Session and pseudo-block records.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::plan::Plan;

/// Random 32-byte value attached to a discovered block. Carries no
/// proof-of-work meaning; the contract never checks it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalHash(pub [u8; 32]);

impl fmt::Display for LocalHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for LocalHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalHash({self})")
    }
}

impl Serialize for LocalHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A locally discovered block awaiting an on-chain mint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PseudoBlock {
    /// Globally unique, assigned from the shared counter.
    pub block_number: u64,
    /// Passed through to the contract's batch submission.
    pub nonce: u64,
    pub local_hash: LocalHash,
    /// Discovery time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Mining state for one subscriber.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MiningSession {
    pub active: bool,
    pub plan: Plan,
    /// Discovery ticks evaluated while active. Diagnostic only.
    pub hash_attempts: u64,
    pub pending_blocks: Vec<PseudoBlock>,
}

/// Read-only snapshot returned by status queries.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub active: bool,
    pub plan: Plan,
    pub hash_attempts: u64,
    pub blocks_found: Vec<PseudoBlock>,
    pub hash_rate: u64,
}

impl From<&MiningSession> for SessionView {
    fn from(session: &MiningSession) -> Self {
        Self {
            active: session.active,
            plan: session.plan,
            hash_attempts: session.hash_attempts,
            blocks_found: session.pending_blocks.clone(),
            hash_rate: session.plan.nominal_hash_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_hash_renders_as_prefixed_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let rendered = LocalHash(bytes).to_string();
        assert_eq!(rendered.len(), 66);
        assert!(rendered.starts_with("0xab"));
        assert!(rendered.ends_with("01"));
    }

    #[test]
    fn pseudo_block_json_shape() {
        let block = PseudoBlock {
            block_number: 261,
            nonce: 123_456,
            local_hash: LocalHash([0; 32]),
            timestamp: 1_684_123_456_789,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["blockNumber"], 261);
        assert_eq!(json["nonce"], 123_456);
        assert_eq!(json["timestamp"], 1_684_123_456_789i64);
        assert_eq!(json["localHash"].as_str().unwrap().len(), 66);
    }

    #[test]
    fn view_of_empty_session() {
        let view = SessionView::from(&MiningSession::default());
        assert!(!view.active);
        assert_eq!(view.plan, Plan::None);
        assert_eq!(view.hash_rate, 0);
        assert!(view.blocks_found.is_empty());
        assert_eq!(view, SessionView::default());
    }
}
