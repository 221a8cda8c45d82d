//! Event sinks: structured log lines and fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::error::VenueError;
use crate::domain::events::VenueEvent;
use crate::domain::payout::Commissions;
use crate::domain::types::ProposalId;
use crate::ports::events::EventSink;

/// Writes every event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: &VenueEvent) -> anyhow::Result<()> {
        match event {
            VenueEvent::ProposalAdded { id, timestamp } => {
                info!(event = event.name(), proposal_id = id, timestamp, "Proposal added");
            }
            VenueEvent::ProposalResolved { id, resolver, timestamp } => {
                info!(event = event.name(), proposal_id = id, %resolver, timestamp, "Proposal resolved");
            }
            VenueEvent::NoPayout { id, resolver, timestamp } => {
                info!(event = event.name(), proposal_id = id, %resolver, timestamp, "Proposal cancelled, no payout");
            }
            VenueEvent::BetPlaced { proposal_id, user, side, amount, timestamp } => {
                info!(
                    event = event.name(),
                    proposal_id,
                    %user,
                    side = %side,
                    amount = %amount,
                    timestamp,
                    "Bet placed"
                );
            }
            VenueEvent::WinningsCollected { proposal_id, user, amount } => {
                info!(event = event.name(), proposal_id, %user, amount = %amount, "Winnings collected");
            }
            VenueEvent::BetReturned { proposal_id, user, amount } => {
                info!(event = event.name(), proposal_id, %user, amount = %amount, "Bet returned");
            }
        }
        Ok(())
    }
}

/// Delivers each event to several sinks.
///
/// Events are emitted after commit, so a failing sink is logged and the
/// remaining sinks still run.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl EventSink for FanoutSink {
    async fn emit(&self, event: &VenueEvent) -> anyhow::Result<()> {
        let mut failures = 0usize;
        for sink in &self.sinks {
            if let Err(e) = sink.emit(event).await {
                failures += 1;
                warn!(event = event.name(), error = %e, "Event sink failed");
            }
        }
        anyhow::ensure!(failures == 0, "{failures} event sink(s) failed");
        Ok(())
    }

    async fn operation_failed(&self, operation: &'static str, error: &VenueError) {
        for sink in &self.sinks {
            sink.operation_failed(operation, error).await;
        }
    }

    async fn commissions_settled(&self, proposal_id: ProposalId, paid: &Commissions) {
        for sink in &self.sinks {
            sink.commissions_settled(proposal_id, paid).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    #[async_trait]
    impl EventSink for Counting {
        async fn emit(&self, _event: &VenueEvent) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventSink for Failing {
        async fn emit(&self, _event: &VenueEvent) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[tokio::test]
    async fn test_fanout_reaches_every_sink() {
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let fanout = FanoutSink::new(vec![
            Arc::new(Failing),
            counter.clone(),
            Arc::new(TracingEventSink),
        ]);
        let event = VenueEvent::ProposalAdded { id: 1, timestamp: 0 };

        assert!(fanout.emit(&event).await.is_err());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
