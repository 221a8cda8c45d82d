//! State Store - Atomic JSON Venue Snapshots
//!
//! Saves named JSON documents (ledger, registry, custody books, pools)
//! using atomic writes (write to tmp file, then rename), so each file is
//! always either the old or the new version.
//! Ledger snapshots are versioned and upgraded on load.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{info, instrument};

use crate::domain::ledger::LedgerSnapshot;
use crate::domain::types::Bps;

const LEDGER_FILE: &str = "ledger.json";

/// Atomic JSON state store for crash recovery.
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Create a new state store in the given data directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let dir = Path::new(data_dir);
        fs::create_dir_all(dir)
            .await
            .context("Failed to create data directory")?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    #[instrument(skip(self, ledger), fields(proposals = ledger.proposals.len()))]
    pub async fn save_ledger(&self, ledger: &LedgerSnapshot) -> Result<()> {
        self.save(LEDGER_FILE, ledger).await?;
        info!(
            schema_version = ledger.schema_version,
            next_proposal_id = ledger.next_proposal_id,
            "Ledger snapshot saved"
        );
        Ok(())
    }

    /// Load and upgrade the ledger snapshot.
    ///
    /// Returns `None` on first startup. v1 snapshots take `default_rates`
    /// as `(house_rake_bps, resolver_bps)`.
    #[instrument(skip(self))]
    pub async fn load_ledger(&self, default_rates: (Bps, Bps)) -> Result<Option<LedgerSnapshot>> {
        let Some(raw) = self.read(LEDGER_FILE).await? else {
            info!("No ledger snapshot found, starting fresh");
            return Ok(None);
        };
        let snapshot = LedgerSnapshot::migrate(&raw, default_rates)
            .context("Failed to migrate ledger snapshot")?;
        info!(
            proposals = snapshot.proposals.len(),
            bets = snapshot.bets.len(),
            "Ledger snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    /// Check if the data directory is readable.
    pub async fn is_healthy(&self) -> bool {
        fs::metadata(&self.dir).await.is_ok()
    }

    /// Atomically replace the document `name`.
    pub async fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize {name}"))?;
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));

        fs::write(&tmp, &json)
            .await
            .with_context(|| format!("Failed to write tmp file for {name}"))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to rename {name}"))?;
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Option<String>> {
        let path = self.dir.join(name);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(raw))
    }

    /// Load the document `name`, or `None` if it was never saved.
    pub async fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.read(name).await? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse {name}"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}
