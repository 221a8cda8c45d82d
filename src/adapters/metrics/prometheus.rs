//! Prometheus Metrics Registry - Venue Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers admissions, betting volume per side, resolutions by outcome,
//! commissions, claims, refunds and operation failures by error class.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use prometheus::{CounterVec, Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use crate::domain::error::VenueError;
use crate::domain::events::VenueEvent;
use crate::domain::payout::Commissions;
use crate::domain::types::ProposalId;
use crate::ports::events::EventSink;

/// Centralized Prometheus metrics for the venue.
///
/// All metrics follow the naming convention `dao_venue_*`.
pub struct VenueMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Proposals admitted.
    pub proposals_admitted: IntCounter,
    /// Bets placed, by side.
    pub bets_placed: IntCounterVec,
    /// Staked volume in atomic units, by side.
    pub bet_volume: CounterVec,
    /// Resolutions, by kind (`settled` or `cancelled`).
    pub resolutions: IntCounterVec,
    /// Commissions paid in atomic units, by recipient.
    pub commissions_paid: CounterVec,
    /// Winning claims paid.
    pub claims_paid: IntCounter,
    /// Cancelled-proposal refunds paid.
    pub refunds_paid: IntCounter,
    /// Failed operations, by operation and error class.
    pub operation_failures: IntCounterVec,
    /// Fatal errors (oracle mapping or ledger consistency).
    pub fatal_errors: IntCounterVec,
    /// Admitted proposals not yet resolved.
    pub pending_resolution: IntGauge,
}

impl VenueMetrics {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let proposals_admitted = IntCounter::new(
            "dao_venue_proposals_admitted_total",
            "Total proposals admitted",
        )?;

        let bets_placed = IntCounterVec::new(
            Opts::new("dao_venue_bets_placed_total", "Total bets placed"),
            &["side"],
        )?;

        let bet_volume = CounterVec::new(
            Opts::new(
                "dao_venue_bet_volume_units",
                "Staked volume in payout-asset atomic units",
            ),
            &["side"],
        )?;

        let resolutions = IntCounterVec::new(
            Opts::new("dao_venue_resolutions_total", "Total proposals resolved"),
            &["kind"],
        )?;

        let commissions_paid = CounterVec::new(
            Opts::new(
                "dao_venue_commissions_paid_units",
                "Commissions paid in atomic units",
            ),
            &["recipient"],
        )?;

        let claims_paid = IntCounter::new(
            "dao_venue_claims_paid_total",
            "Total winning claims paid",
        )?;

        let refunds_paid = IntCounter::new(
            "dao_venue_refunds_paid_total",
            "Total cancelled-proposal refunds paid",
        )?;

        let operation_failures = IntCounterVec::new(
            Opts::new(
                "dao_venue_operation_failures_total",
                "Failed venue operations by error class",
            ),
            &["operation", "class"],
        )?;

        let fatal_errors = IntCounterVec::new(
            Opts::new(
                "dao_venue_fatal_errors_total",
                "Oracle mapping and ledger consistency failures",
            ),
            &["class"],
        )?;

        let pending_resolution = IntGauge::new(
            "dao_venue_pending_resolution",
            "Admitted proposals not yet resolved",
        )?;

        // Register all metrics
        registry.register(Box::new(proposals_admitted.clone()))?;
        registry.register(Box::new(bets_placed.clone()))?;
        registry.register(Box::new(bet_volume.clone()))?;
        registry.register(Box::new(resolutions.clone()))?;
        registry.register(Box::new(commissions_paid.clone()))?;
        registry.register(Box::new(claims_paid.clone()))?;
        registry.register(Box::new(refunds_paid.clone()))?;
        registry.register(Box::new(operation_failures.clone()))?;
        registry.register(Box::new(fatal_errors.clone()))?;
        registry.register(Box::new(pending_resolution.clone()))?;

        Ok(Self {
            registry,
            proposals_admitted,
            bets_placed,
            bet_volume,
            resolutions,
            commissions_paid,
            claims_paid,
            refunds_paid,
            operation_failures,
            fatal_errors,
            pending_resolution,
        })
    }

    pub fn record_commissions(&self, paid: &Commissions) {
        self.commissions_paid
            .with_label_values(&["resolver"])
            .inc_by(paid.resolver as f64);
        self.commissions_paid
            .with_label_values(&["house"])
            .inc_by(paid.house as f64);
    }

    pub fn record_failure(&self, operation: &str, class: &str, fatal: bool) {
        self.operation_failures
            .with_label_values(&[operation, class])
            .inc();
        if fatal {
            self.fatal_errors.with_label_values(&[class]).inc();
        }
    }

    /// Render the registry in the Prometheus text format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move {
                    match metrics.encode() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => {
                            error!(error = %e, "Metrics encoding failed");
                            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                        }
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[async_trait]
impl EventSink for VenueMetrics {
    async fn emit(&self, event: &VenueEvent) -> anyhow::Result<()> {
        match event {
            VenueEvent::ProposalAdded { .. } => self.proposals_admitted.inc(),
            VenueEvent::BetPlaced { side, amount, .. } => {
                let label = side.to_string();
                self.bets_placed.with_label_values(&[label.as_str()]).inc();
                self.bet_volume
                    .with_label_values(&[label.as_str()])
                    .inc_by(*amount as f64);
            }
            VenueEvent::ProposalResolved { .. } => {
                self.resolutions.with_label_values(&["settled"]).inc();
            }
            VenueEvent::NoPayout { .. } => {
                self.resolutions.with_label_values(&["cancelled"]).inc();
            }
            VenueEvent::WinningsCollected { .. } => self.claims_paid.inc(),
            VenueEvent::BetReturned { .. } => self.refunds_paid.inc(),
        }
        Ok(())
    }

    async fn operation_failed(&self, operation: &'static str, error: &VenueError) {
        self.record_failure(operation, error.class(), error.is_fatal());
    }

    async fn commissions_settled(&self, _proposal_id: ProposalId, paid: &Commissions) {
        self.record_commissions(paid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::BetSide;
    use alloy::primitives::Address;

    #[tokio::test]
    async fn test_events_drive_counters() {
        let metrics = VenueMetrics::new().unwrap();
        metrics
            .emit(&VenueEvent::BetPlaced {
                proposal_id: 1,
                user: Address::repeat_byte(1),
                side: BetSide::Defeat,
                amount: 250,
                timestamp: 0,
            })
            .await
            .unwrap();
        metrics.record_failure("resolve", "oracle_mapping", true);
        metrics
            .commissions_settled(1, &Commissions { resolver: 2, house: 4 })
            .await;

        let label = BetSide::Defeat.to_string();
        assert_eq!(metrics.bets_placed.with_label_values(&[label.as_str()]).get(), 1);
        assert_eq!(metrics.bet_volume.with_label_values(&[label.as_str()]).get(), 250.0);
        assert_eq!(metrics.fatal_errors.with_label_values(&["oracle_mapping"]).get(), 1);
        assert_eq!(metrics.commissions_paid.with_label_values(&["house"]).get(), 4.0);

        let text = metrics.encode().unwrap();
        assert!(text.contains("dao_venue_bets_placed_total"));
    }
}
