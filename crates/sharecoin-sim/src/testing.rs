//! In-memory [`ChainGateway`] for tests.
//!
//! Models just enough of the contract: per-user subscription and plan,
//! the recorded block count, the set of consumed `(user, block)` pairs, and
//! a log of submitted batches. Reads and submissions can be made to fail.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::address::UserAddress;
use crate::error::GatewayError;
use crate::gateway::{ChainGateway, SubmitReceipt};

/// One recorded `submit_batch` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedBatch {
    pub user: UserAddress,
    pub block_numbers: Vec<u64>,
    pub nonces: Vec<u64>,
}

#[derive(Debug, Default)]
struct Inner {
    subscriptions: HashSet<UserAddress>,
    plans: HashMap<UserAddress, u64>,
    confirmed: u64,
    consumed: HashSet<(UserAddress, u64)>,
    batches: Vec<SubmittedBatch>,
    fail_reads_for: HashSet<UserAddress>,
    fail_submit: bool,
    fail_count: bool,
}

#[derive(Debug, Default)]
pub struct MockChain {
    inner: Mutex<Inner>,
}

impl MockChain {
    pub fn new(confirmed: u64) -> Self {
        let chain = Self::default();
        chain.inner.lock().confirmed = confirmed;
        chain
    }

    /// Give `user` an active subscription on `plan`.
    pub fn subscribe(&self, user: &UserAddress, plan: u64) {
        let mut inner = self.inner.lock();
        inner.subscriptions.insert(user.clone());
        inner.plans.insert(user.clone(), plan);
    }

    pub fn expire(&self, user: &UserAddress) {
        self.inner.lock().subscriptions.remove(user);
    }

    /// Record a block as minted, as a client self-mint would.
    pub fn consume(&self, user: &UserAddress, block_number: u64) {
        let mut inner = self.inner.lock();
        inner.consumed.insert((user.clone(), block_number));
        inner.confirmed += 1;
    }

    pub fn set_confirmed(&self, confirmed: u64) {
        self.inner.lock().confirmed = confirmed;
    }

    pub fn fail_reads_for(&self, user: &UserAddress, fail: bool) {
        let mut inner = self.inner.lock();
        if fail {
            inner.fail_reads_for.insert(user.clone());
        } else {
            inner.fail_reads_for.remove(user);
        }
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.inner.lock().fail_submit = fail;
    }

    pub fn fail_block_count(&self, fail: bool) {
        self.inner.lock().fail_count = fail;
    }

    pub fn batches(&self) -> Vec<SubmittedBatch> {
        self.inner.lock().batches.clone()
    }

    fn check_reads(inner: &Inner, user: &UserAddress) -> Result<(), GatewayError> {
        if inner.fail_reads_for.contains(user) {
            Err(GatewayError::Rpc(format!("connection refused reading {user}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChainGateway for MockChain {
    async fn is_subscription_active(&self, user: &UserAddress) -> Result<bool, GatewayError> {
        let inner = self.inner.lock();
        Self::check_reads(&inner, user)?;
        Ok(inner.subscriptions.contains(user))
    }

    async fn plan_of(&self, user: &UserAddress) -> Result<u64, GatewayError> {
        let inner = self.inner.lock();
        Self::check_reads(&inner, user)?;
        Ok(inner.plans.get(user).copied().unwrap_or(0))
    }

    async fn confirmed_block_count(&self) -> Result<u64, GatewayError> {
        let inner = self.inner.lock();
        if inner.fail_count {
            return Err(GatewayError::Timeout(20));
        }
        Ok(inner.confirmed)
    }

    async fn is_block_consumed(
        &self,
        user: &UserAddress,
        block_number: u64,
    ) -> Result<bool, GatewayError> {
        let inner = self.inner.lock();
        Self::check_reads(&inner, user)?;
        Ok(inner.consumed.contains(&(user.clone(), block_number)))
    }

    async fn submit_batch(
        &self,
        user: &UserAddress,
        block_numbers: &[u64],
        nonces: &[u64],
    ) -> Result<SubmitReceipt, GatewayError> {
        let mut inner = self.inner.lock();
        if inner.fail_submit {
            return Err(GatewayError::Reverted("execution reverted".into()));
        }
        if block_numbers.len() != nonces.len() {
            return Err(GatewayError::Reverted("length mismatch".into()));
        }
        if let Some(dup) = block_numbers
            .iter()
            .find(|n| inner.consumed.contains(&(user.clone(), **n)))
        {
            return Err(GatewayError::Reverted(format!("block {dup} already used")));
        }

        for n in block_numbers {
            inner.consumed.insert((user.clone(), *n));
        }
        inner.confirmed += block_numbers.len() as u64;
        inner.batches.push(SubmittedBatch {
            user: user.clone(),
            block_numbers: block_numbers.to_vec(),
            nonces: nonces.to_vec(),
        });

        Ok(SubmitReceipt {
            tx_hash: format!("0x{:064x}", inner.batches.len()),
        })
    }
}
