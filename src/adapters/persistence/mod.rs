//! Persistence Adapters - File Storage
//!
//! Atomic JSON snapshots for ledger, registry and custody books, and an
//! append-only JSONL event log.
//! No database dependency - lightweight and crash-recoverable.

pub mod events;
pub mod state;

pub use events::{EventLog, EventRecord};
pub use state::StateStore;
