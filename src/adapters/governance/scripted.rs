//! Scripted governor for simulations and tests.
//!
//! Holds native proposal states in memory; callers move proposals between
//! states and advance the block height explicitly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::types::{AccountId, NativeProposalId};
use crate::ports::governor::GovernorOracle;

#[derive(Debug, Clone, Copy)]
struct ScriptedProposal {
    state_index: u8,
    voting_end: u64,
}

/// In-memory governor whose proposals are driven by the caller.
pub struct ScriptedGovernor {
    address: AccountId,
    proposals: RwLock<HashMap<NativeProposalId, ScriptedProposal>>,
    block: AtomicU64,
}

impl ScriptedGovernor {
    pub fn new(address: AccountId) -> Self {
        Self {
            address,
            proposals: RwLock::new(HashMap::new()),
            block: AtomicU64::new(0),
        }
    }

    /// Create or overwrite a native proposal.
    pub async fn set_proposal(&self, native_id: NativeProposalId, state_index: u8, voting_end: u64) {
        self.proposals
            .write()
            .await
            .insert(native_id, ScriptedProposal { state_index, voting_end });
    }

    /// Move an existing proposal to a new native state; unknown ids are ignored.
    pub async fn set_state(&self, native_id: NativeProposalId, state_index: u8) {
        if let Some(p) = self.proposals.write().await.get_mut(&native_id) {
            p.state_index = state_index;
        }
    }

    pub fn set_block(&self, block: u64) {
        self.block.store(block, Ordering::SeqCst);
    }
}

#[async_trait]
impl GovernorOracle for ScriptedGovernor {
    async fn state_index(&self, native_id: NativeProposalId) -> anyhow::Result<Option<u8>> {
        Ok(self.proposals.read().await.get(&native_id).map(|p| p.state_index))
    }

    async fn voting_end(&self, native_id: NativeProposalId) -> anyhow::Result<u64> {
        self.proposals
            .read()
            .await
            .get(&native_id)
            .map(|p| p.voting_end)
            .ok_or_else(|| anyhow::anyhow!("unknown proposal {native_id}"))
    }

    async fn block_number(&self) -> anyhow::Result<u64> {
        Ok(self.block.load(Ordering::SeqCst))
    }

    fn governor_address(&self) -> AccountId {
        self.address
    }
}
