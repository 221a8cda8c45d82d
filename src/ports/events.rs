//! Event Sink Port - Venue Event Emission
//!
//! Receives every committed state transition. Sinks run after commit, so
//! a failing sink never rolls back a ledger change.

use async_trait::async_trait;

use crate::domain::error::VenueError;
use crate::domain::events::VenueEvent;
use crate::domain::payout::Commissions;
use crate::domain::types::ProposalId;

/// Trait for event consumers (logs, audit files, metrics).
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
  /// Record one event.
  async fn emit(&self, event: &VenueEvent) -> anyhow::Result<()>;

  /// Observe an operation that failed without committing.
  async fn operation_failed(&self, _operation: &'static str, _error: &VenueError) {}

  /// Observe the commissions transferred by a committed resolution.
  async fn commissions_settled(&self, _proposal_id: ProposalId, _paid: &Commissions) {}
}
