//! In-memory miner state.
//!
//! [`MinerState`] owns every [`MiningSession`], the shared [`BlockCounter`],
//! and the discovery-time history. The schedulers and the control service
//! share it as [`SharedState`]: a `parking_lot` mutex whose guard is only
//! ever held for synchronous bookkeeping, never across a chain call.
//!
//! Mutation discipline:
//! - discovery appends pending blocks and bumps `hash_attempts`
//! - settlement and acknowledgement remove pending blocks, both through
//!   [`MinerState::remove_blocks`]
//! - the control service toggles `active` and sets `plan`
//!
//! Sessions are never deleted; a stopped session stays, inactive.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;

use crate::address::UserAddress;
use crate::constants::NONCE_RANGE;
use crate::counter::BlockCounter;
use crate::history::BlockTimeHistory;
use crate::plan::{Plan, ProbabilityTable};
use crate::types::{LocalHash, MiningSession, PseudoBlock, SessionView};

/// Miner state shared between the schedulers and the HTTP handlers.
pub type SharedState = Arc<Mutex<MinerState>>;

/// Result of one discovery trial for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trial {
    /// No session, or the session is not active.
    Skipped,
    Miss,
    Found(PseudoBlock),
}

/// All sessions plus the process-wide counters.
#[derive(Debug)]
pub struct MinerState {
    /// Ordered map: passes over sessions always visit them in the same order.
    sessions: BTreeMap<UserAddress, MiningSession>,
    counter: BlockCounter,
    history: BlockTimeHistory,
}

impl MinerState {
    /// Empty state whose first pseudo-block will be numbered `next_block`.
    pub fn new(next_block: u64) -> Self {
        Self::with_history(next_block, BlockTimeHistory::default())
    }

    pub fn with_history(next_block: u64, history: BlockTimeHistory) -> Self {
        Self {
            sessions: BTreeMap::new(),
            counter: BlockCounter::new(next_block),
            history,
        }
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn get_or_create(&mut self, user: &UserAddress) -> &mut MiningSession {
        self.sessions.entry(user.clone()).or_default()
    }

    pub fn session(&self, user: &UserAddress) -> Option<&MiningSession> {
        self.sessions.get(user)
    }

    pub fn session_mut(&mut self, user: &UserAddress) -> Option<&mut MiningSession> {
        self.sessions.get_mut(user)
    }

    /// Status snapshot. Unknown addresses get the empty view.
    pub fn view(&self, user: &UserAddress) -> SessionView {
        self.sessions
            .get(user)
            .map(SessionView::from)
            .unwrap_or_default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn active_addresses(&self) -> Vec<UserAddress> {
        self.sessions
            .iter()
            .filter(|(_, s)| s.active)
            .map(|(addr, _)| addr.clone())
            .collect()
    }

    /// Mark a session inactive. Returns `false` if there was no session.
    pub fn deactivate(&mut self, user: &UserAddress) -> bool {
        match self.sessions.get_mut(user) {
            Some(session) => {
                session.active = false;
                true
            }
            None => false,
        }
    }

    /// Copy of every non-empty pending list, in enumeration order.
    pub fn pending_snapshot(&self) -> Vec<(UserAddress, Vec<PseudoBlock>)> {
        self.sessions
            .iter()
            .filter(|(_, s)| !s.pending_blocks.is_empty())
            .map(|(addr, s)| (addr.clone(), s.pending_blocks.clone()))
            .collect()
    }

    /// Drop the named block numbers from a user's pending list.
    ///
    /// Numbers that are not pending are ignored, so repeating a removal is a
    /// no-op. Returns the remaining pending count, or `None` if the user has
    /// no session.
    pub fn remove_blocks(&mut self, user: &UserAddress, block_numbers: &[u64]) -> Option<usize> {
        let session = self.sessions.get_mut(user)?;
        let doomed: HashSet<u64> = block_numbers.iter().copied().collect();
        session
            .pending_blocks
            .retain(|b| !doomed.contains(&b.block_number));
        Some(session.pending_blocks.len())
    }

    /// Sum of nominal hash rates over active sessions.
    pub fn network_hash_rate(&self) -> u64 {
        self.sessions
            .values()
            .filter(|s| s.active)
            .map(|s| s.plan.nominal_hash_rate())
            .sum()
    }

    // ------------------------------------------------------------------
    // Discovery
    // ------------------------------------------------------------------

    /// Run one probability trial for `user` and count the attempt.
    ///
    /// On success a pseudo-block numbered from the shared counter is
    /// appended and its time recorded in the history. Inactive or unknown
    /// sessions are left untouched.
    pub fn record_discovery<R: Rng + ?Sized>(
        &mut self,
        user: &UserAddress,
        rng: &mut R,
        probabilities: &ProbabilityTable,
        now_ms: i64,
    ) -> Trial {
        let Some(session) = self.sessions.get_mut(user) else {
            return Trial::Skipped;
        };
        if !session.active {
            return Trial::Skipped;
        }

        let threshold = probabilities.for_plan(session.plan);
        let sample: f64 = rng.gen_range(0.0..1.0);

        let trial = if sample < threshold {
            let mut hash = [0u8; 32];
            rng.fill(&mut hash);
            let block = PseudoBlock {
                block_number: self.counter.allocate(),
                nonce: rng.gen_range(0..NONCE_RANGE),
                local_hash: LocalHash(hash),
                timestamp: now_ms,
            };
            session.pending_blocks.push(block.clone());
            self.history.record(now_ms);
            Trial::Found(block)
        } else {
            Trial::Miss
        };

        session.hash_attempts += 1;
        trial
    }

    // ------------------------------------------------------------------
    // Counters
    // ------------------------------------------------------------------

    pub fn next_block_number(&self) -> u64 {
        self.counter.peek()
    }

    /// See [`BlockCounter::resync`].
    pub fn resync_counter(&mut self, confirmed: u64) -> bool {
        self.counter.resync(confirmed)
    }

    pub fn history(&self) -> &BlockTimeHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut BlockTimeHistory {
        &mut self.history
    }

    /// Start (or restart) a session on a chain-verified plan.
    pub fn activate(&mut self, user: &UserAddress, plan: Plan) {
        let session = self.get_or_create(user);
        session.plan = plan;
        session.active = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn addr(n: u8) -> UserAddress {
        UserAddress::parse(&format!("0x{}", hex::encode([n; 20]))).unwrap()
    }

    #[test]
    fn unknown_address_has_empty_view() {
        let state = MinerState::new(0);
        assert_eq!(state.view(&addr(1)), SessionView::default());
        assert_eq!(state.session_count(), 0);
    }

    #[test]
    fn activate_creates_and_sets_plan() {
        let mut state = MinerState::new(0);
        state.activate(&addr(1), Plan::Premium);
        let view = state.view(&addr(1));
        assert!(view.active);
        assert_eq!(view.plan, Plan::Premium);
        assert_eq!(view.hash_rate, 5_000);
    }

    #[test]
    fn deactivate_keeps_session() {
        let mut state = MinerState::new(0);
        state.activate(&addr(1), Plan::Basic);
        assert!(state.deactivate(&addr(1)));
        assert!(!state.deactivate(&addr(2)));
        assert_eq!(state.session_count(), 1);
        assert!(!state.view(&addr(1)).active);
    }

    #[test]
    fn forced_discovery_uses_counter() {
        let mut state = MinerState::new(42);
        let mut rng = StdRng::seed_from_u64(7);
        state.activate(&addr(1), Plan::Basic);

        let block = match state.record_discovery(&addr(1), &mut rng, &ProbabilityTable::fixed(1.0), 1_000) {
            Trial::Found(block) => block,
            other => panic!("expected a discovery, got {other:?}"),
        };
        assert_eq!(block.block_number, 42);
        assert!(block.nonce < NONCE_RANGE);
        assert_ne!(block.local_hash.0, [0u8; 32]);
        assert_eq!(state.next_block_number(), 43);
        assert_eq!(state.history().len(), 1);

        let session = state.session(&addr(1)).unwrap();
        assert_eq!(session.hash_attempts, 1);
        assert_eq!(session.pending_blocks, vec![block]);
    }

    #[test]
    fn missed_trial_still_counts_attempt() {
        let mut state = MinerState::new(0);
        let mut rng = StdRng::seed_from_u64(7);
        state.activate(&addr(1), Plan::Standard);

        let trial = state.record_discovery(&addr(1), &mut rng, &ProbabilityTable::fixed(0.0), 1_000);
        assert_eq!(trial, Trial::Miss);
        assert_eq!(state.session(&addr(1)).unwrap().hash_attempts, 1);
        assert_eq!(state.next_block_number(), 0);
        assert!(state.history().is_empty());
    }

    #[test]
    fn inactive_session_is_skipped() {
        let mut state = MinerState::new(0);
        let mut rng = StdRng::seed_from_u64(7);
        state.activate(&addr(1), Plan::Standard);
        state.deactivate(&addr(1));

        let table = ProbabilityTable::fixed(1.0);
        assert_eq!(state.record_discovery(&addr(1), &mut rng, &table, 0), Trial::Skipped);
        assert_eq!(state.record_discovery(&addr(9), &mut rng, &table, 0), Trial::Skipped);
        assert_eq!(state.session(&addr(1)).unwrap().hash_attempts, 0);
    }

    #[test]
    fn remove_blocks_is_idempotent() {
        let mut state = MinerState::new(0);
        let mut rng = StdRng::seed_from_u64(1);
        let table = ProbabilityTable::fixed(1.0);
        state.activate(&addr(1), Plan::Basic);
        for t in 0..3 {
            state.record_discovery(&addr(1), &mut rng, &table, t);
        }

        assert_eq!(state.remove_blocks(&addr(1), &[0, 2]), Some(1));
        assert_eq!(state.remove_blocks(&addr(1), &[0, 2]), Some(1));
        assert_eq!(state.remove_blocks(&addr(1), &[99]), Some(1));
        assert_eq!(state.remove_blocks(&addr(2), &[1]), None);
        assert_eq!(state.session(&addr(1)).unwrap().pending_blocks[0].block_number, 1);
    }

    #[test]
    fn pending_snapshot_skips_empty_lists() {
        let mut state = MinerState::new(0);
        let mut rng = StdRng::seed_from_u64(1);
        state.activate(&addr(1), Plan::Basic);
        state.activate(&addr(2), Plan::Basic);
        state.record_discovery(&addr(2), &mut rng, &ProbabilityTable::fixed(1.0), 0);

        let snapshot = state.pending_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, addr(2));
    }

    #[test]
    fn network_hash_rate_counts_active_only() {
        let mut state = MinerState::new(0);
        state.activate(&addr(1), Plan::Basic);
        state.activate(&addr(2), Plan::Premium);
        state.activate(&addr(3), Plan::Standard);
        state.deactivate(&addr(3));
        assert_eq!(state.network_hash_rate(), 5_500);
    }

    #[test]
    fn active_addresses_in_stable_order() {
        let mut state = MinerState::new(0);
        state.activate(&addr(3), Plan::Basic);
        state.activate(&addr(1), Plan::Basic);
        state.activate(&addr(2), Plan::Basic);
        assert_eq!(state.active_addresses(), vec![addr(1), addr(2), addr(3)]);
    }
}
