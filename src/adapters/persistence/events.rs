//! Event Log - Append-only JSONL Venue Events
//!
//! Persists every committed venue event to daily JSONL files in the
//! format `events/YYYY-MM-DD.jsonl`. Each line is a self-contained
//! record with its own id, for streaming and audit.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::events::VenueEvent;
use crate::ports::events::EventSink;

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub event: VenueEvent,
}

/// Append-only JSONL event log with daily file rotation.
pub struct EventLog {
    events_dir: PathBuf,
    /// Serializes appends so lines never interleave.
    write_lock: Mutex<()>,
}

impl EventLog {
    /// Create a new event log in the given data directory.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let events_dir = Path::new(data_dir).join("events");
        fs::create_dir_all(&events_dir)
            .await
            .context("Failed to create events directory")?;
        Ok(Self {
            events_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Append an event to today's JSONL file.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub async fn append(&self, event: &VenueEvent) -> Result<EventRecord> {
        let record = EventRecord {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            event: event.clone(),
        };
        let path = self
            .events_dir
            .join(format!("{}.jsonl", record.recorded_at.format("%Y-%m-%d")));

        let mut json = serde_json::to_string(&record)
            .context("Failed to serialize event record")?;
        json.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open event log file")?;
        file.write_all(json.as_bytes())
            .await
            .context("Failed to write event record")?;
        file.flush().await.context("Failed to flush event log")?;

        Ok(record)
    }

    /// Load every record from every daily file, oldest file first.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<EventRecord>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.events_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                files.push(path);
            }
        }
        files.sort();

        let mut records = Vec::new();
        for path in files {
            let content = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                let record: EventRecord = serde_json::from_str(line)
                    .with_context(|| format!("Corrupt event line in {}", path.display()))?;
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl EventSink for EventLog {
    async fn emit(&self, event: &VenueEvent) -> Result<()> {
        self.append(event).await.map(|_| ())
    }
}
