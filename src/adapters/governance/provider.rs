//! JSON-RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Connects to the chain hosting the governors and exposes a shared,
//! type-erased provider to every governor reader.

use std::sync::Arc;

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::ChainConfig;

/// Shared RPC provider backed by alloy-rs 0.9.
///
/// All governor readers share a single provider instance.
pub struct ChainProvider {
    provider: Arc<dyn Provider + Send + Sync>,
}

impl ChainProvider {
    /// Connect to the RPC endpoint and check the chain id when configured.
    #[instrument(skip_all)]
    pub async fn connect(config: &ChainConfig) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .on_builtin(&config.rpc_url)
            .await
            .context("Failed to connect to RPC endpoint")?;
        let provider: Arc<dyn Provider + Send + Sync> = Arc::new(provider);

        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        if let Some(expected) = config.chain_id {
            anyhow::ensure!(
                chain_id == expected,
                "Expected chain_id={expected}, got {chain_id}"
            );
        }

        info!(chain_id, "Connected to governance RPC");
        Ok(Self { provider })
    }

    /// Shared reference to the alloy provider (type-erased).
    pub fn inner(&self) -> Arc<dyn Provider + Send + Sync> {
        Arc::clone(&self.provider)
    }

    /// Lightweight liveness probe.
    pub async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }
}
