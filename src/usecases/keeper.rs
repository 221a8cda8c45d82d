//! Resolution Keeper Use Case - Periodic Resolver Sweep
//!
//! Resolves every proposal whose voting deadline has passed, acting as
//! the configured keeper account (which earns the resolver commission).
//!
//! Sweep flow:
//! 1. Ask the engine which unresolved proposals are past their deadline
//! 2. Resolve each one independently
//! 3. Log failures and continue; fatal classes are logged at error level

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, instrument, warn};

use crate::domain::error::VenueError;
use crate::domain::types::{AccountId, ProposalId};

use super::settlement_engine::{Resolution, SettlementEngine};

/// Aggregated report from one sweep.
#[derive(Debug, Clone)]
pub struct KeeperReport {
  /// Proposals resolved in this sweep.
  pub resolved: Vec<Resolution>,
  /// Proposals that could not be resolved, with the reason.
  pub failed: Vec<(ProposalId, VenueError)>,
  /// Timestamp of the sweep.
  pub timestamp: chrono::DateTime<Utc>,
}

impl KeeperReport {
  pub fn fatal_count(&self) -> usize {
    self.failed.iter().filter(|(_, e)| e.is_fatal()).count()
  }
}

/// Background resolver for due proposals.
pub struct ResolutionKeeper {
  engine: Arc<SettlementEngine>,
  keeper_account: AccountId,
  period: Duration,
}

impl ResolutionKeeper {
  pub fn new(engine: Arc<SettlementEngine>, keeper_account: AccountId, period: Duration) -> Self {
    Self {
      engine,
      keeper_account,
      period,
    }
  }

  /// Resolve every due proposal once.
  pub async fn sweep(&self) -> KeeperReport {
    let due = self.engine.pending_resolution().await;
    let mut resolved = Vec::new();
    let mut failed = Vec::new();

    for proposal_id in due {
      match self
        .engine
        .resolve_proposal(self.keeper_account, proposal_id)
        .await
      {
        Ok(resolution) => resolved.push(resolution),
        Err(e) => {
          if e.is_fatal() {
            error!(proposal_id, class = e.class(), error = %e, "Keeper hit a fatal error");
          } else {
            warn!(proposal_id, class = e.class(), error = %e, "Keeper could not resolve proposal");
          }
          failed.push((proposal_id, e));
        }
      }
    }

    let report = KeeperReport {
      resolved,
      failed,
      timestamp: Utc::now(),
    };
    if !report.resolved.is_empty() || !report.failed.is_empty() {
      info!(
        resolved = report.resolved.len(),
        failed = report.failed.len(),
        fatal = report.fatal_count(),
        "Keeper sweep complete"
      );
    }
    report
  }

  /// Sweep on a fixed interval until shutdown.
  ///
  /// `running` is raised while the loop is active, for readiness probes.
  #[instrument(skip_all, name = "keeper_loop")]
  pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>, running: Arc<AtomicBool>) {
    let mut ticker = interval(self.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    running.store(true, Ordering::Relaxed);
    info!(period_secs = self.period.as_secs(), keeper = %self.keeper_account, "Keeper started");

    loop {
      tokio::select! {
        _ = shutdown_rx.recv() => {
          info!("Shutdown signal received, stopping keeper");
          break;
        }
        _ = ticker.tick() => {
          self.sweep().await;
        }
      }
    }

    running.store(false, Ordering::Relaxed);
  }
}
