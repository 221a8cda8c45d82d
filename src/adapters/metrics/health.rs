//! Health Check Server - Liveness and Readiness Probes
//!
//! Exposes /live and /ready endpoints via axum 0.7. Readiness depends
//! on governor RPC reachability and the resolution keeper running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Shared health state polled by readiness probes.
#[derive(Debug, Clone)]
pub struct HealthState {
    /// Whether the governance RPC answers.
    pub chain_healthy: Arc<AtomicBool>,
    /// Whether the resolution keeper loop is running.
    pub keeper_running: Arc<AtomicBool>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Chain assumed healthy, keeper not yet started.
    pub fn new() -> Self {
        Self {
            chain_healthy: Arc::new(AtomicBool::new(true)),
            keeper_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if the venue is ready to serve traffic.
    pub fn is_ready(&self) -> bool {
        self.chain_healthy.load(Ordering::Relaxed) && self.keeper_running.load(Ordering::Relaxed)
    }
}

/// Axum-based health check HTTP server.
pub struct HealthServer {
    state: Arc<HealthState>,
    port: u16,
}

impl HealthServer {
    pub fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Serve until shutdown.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .with_state(Arc::clone(&self.state));

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe.
    async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
        if state.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }
}
