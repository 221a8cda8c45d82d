//! Governance Outcome Adapter - Dialect-driven OutcomeAdapter
//!
//! A single adapter implementation parameterized by a governance dialect.
//! It owns the internal-to-native proposal mapping, queries the governor
//! oracle for raw state, and collapses it through the dialect table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use crate::domain::dialect::{DeadlineUnit, GovernanceDialect};
use crate::domain::error::{Result, VenueError};
use crate::domain::types::{
    AccountId, AdapterId, Capabilities, CanonicalOutcome, NativeProposalId, ProposalId, Timestamp,
};
use crate::ports::clock::Clock;
use crate::ports::governor::GovernorOracle;
use crate::ports::outcome_adapter::{OutcomeAdapter, ProposalMapping};

/// Default seconds per block for block-height deadlines.
pub const DEFAULT_BLOCK_TIME_SECS: u64 = 12;

/// Static description of one supported DAO.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// Registry key of the adapter.
    pub adapter_id: AdapterId,
    /// Human-readable DAO name.
    pub name: String,
    /// Governance dialect of the DAO's governor.
    pub dialect: GovernanceDialect,
    /// Unit of the governor's voting-end value.
    pub deadline_unit: DeadlineUnit,
    /// Seconds per block used to estimate block-height deadlines.
    pub block_time_secs: u64,
}

/// Outcome adapter for any supported governance dialect.
pub struct GovernanceAdapter {
    settings: AdapterSettings,
    oracle: Arc<dyn GovernorOracle>,
    clock: Arc<dyn Clock>,
    mappings: RwLock<HashMap<ProposalId, ProposalMapping>>,
}

impl GovernanceAdapter {
    pub fn new(settings: AdapterSettings, oracle: Arc<dyn GovernorOracle>, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            oracle,
            clock,
            mappings: RwLock::new(HashMap::new()),
        }
    }

    async fn native_id(&self, proposal_id: ProposalId) -> Result<NativeProposalId> {
        self.mappings
            .read()
            .await
            .get(&proposal_id)
            .filter(|m| m.registered)
            .map(|m| m.native_id)
            .ok_or_else(|| {
                VenueError::NotFound(format!(
                    "proposal {proposal_id} is not mapped by {}",
                    self.settings.name
                ))
            })
    }

    async fn state_index(&self, native_id: NativeProposalId) -> Result<Option<u8>> {
        self.oracle
            .state_index(native_id)
            .await
            .map_err(|e| VenueError::Oracle(format!("{}: {e:#}", self.settings.name)))
    }
}

#[async_trait]
impl OutcomeAdapter for GovernanceAdapter {
    fn adapter_id(&self) -> AdapterId {
        self.settings.adapter_id
    }

    fn dao_name(&self) -> String {
        self.settings.name.clone()
    }

    fn dao_address(&self) -> AccountId {
        self.oracle.governor_address()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::OUTCOME_ADAPTER
    }

    #[instrument(skip(self), fields(dao = %self.settings.name))]
    async fn map_proposal(&self, native_id: NativeProposalId, proposal_id: ProposalId) -> Result<bool> {
        let mut mappings = self.mappings.write().await;
        match mappings.get(&proposal_id) {
            Some(existing) if existing.native_id == native_id => Ok(true),
            Some(existing) => Err(VenueError::Validation(format!(
                "proposal {proposal_id} already bound to native id {}",
                existing.native_id
            ))),
            None => {
                mappings.insert(proposal_id, ProposalMapping { registered: true, native_id });
                info!(%native_id, proposal_id, "Proposal mapped");
                Ok(true)
            }
        }
    }

    #[instrument(skip(self), fields(dao = %self.settings.name))]
    async fn outcome_of(&self, proposal_id: ProposalId) -> Result<CanonicalOutcome> {
        let native_id = self.native_id(proposal_id).await?;
        let index = self.state_index(native_id).await?.ok_or_else(|| {
            VenueError::Consistency(format!(
                "governor no longer knows mapped proposal {native_id}"
            ))
        })?;

        let outcome = self.settings.dialect.outcome_of_index(index).inspect_err(|e| {
            error!(%native_id, index, error = %e, "Unmapped native state");
        })?;
        debug!(%native_id, index, %outcome, "Outcome queried");
        Ok(outcome)
    }

    #[instrument(skip(self), fields(dao = %self.settings.name))]
    async fn deadline_of(&self, proposal_id: ProposalId) -> Result<Timestamp> {
        let native_id = self.native_id(proposal_id).await?;
        let end = self
            .oracle
            .voting_end(native_id)
            .await
            .map_err(|e| VenueError::Oracle(format!("{}: {e:#}", self.settings.name)))?;

        match self.settings.deadline_unit {
            DeadlineUnit::Timestamp => Ok(end),
            DeadlineUnit::Block => {
                let current = self
                    .oracle
                    .block_number()
                    .await
                    .map_err(|e| VenueError::Oracle(format!("{}: {e:#}", self.settings.name)))?;
                let now = self.clock.now();
                Ok(estimate_deadline(now, end, current, self.settings.block_time_secs))
            }
        }
    }

    async fn is_registered(&self, proposal_id: ProposalId) -> bool {
        self.mappings
            .read()
            .await
            .get(&proposal_id)
            .is_some_and(|m| m.registered)
    }

    #[instrument(skip(self), fields(dao = %self.settings.name))]
    async fn external_active_exists(&self, native_id: NativeProposalId) -> Result<bool> {
        let Some(index) = self.state_index(native_id).await? else {
            return Ok(false);
        };
        let dialect = self.settings.dialect;
        Ok(dialect.is_live(dialect.decode(index)?))
    }
}

/// Wall-clock estimate of a block-height deadline.
///
/// `now + (end − current) × block_time` while the end block is ahead,
/// otherwise `now` (no time remaining).
pub fn estimate_deadline(now: Timestamp, end_block: u64, current_block: u64, block_time_secs: u64) -> Timestamp {
    if end_block > current_block {
        now.saturating_add((end_block - current_block).saturating_mul(block_time_secs))
    } else {
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_deadline_ahead() {
        assert_eq!(estimate_deadline(1_000, 110, 100, 12), 1_120);
    }

    #[test]
    fn test_estimate_deadline_passed() {
        assert_eq!(estimate_deadline(1_000, 100, 100, 12), 1_000);
        assert_eq!(estimate_deadline(1_000, 90, 100, 12), 1_000);
    }
}
