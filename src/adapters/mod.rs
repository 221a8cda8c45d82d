//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (blockchain RPC, file I/O, HTTP servers) and
//! in-memory stand-ins for the asset-side collaborators.
//!
//! Adapter categories:
//! - `governance`: dialect-driven outcome adapter and governor readers
//! - `custody`: fungible asset books
//! - `exchange`: constant-product conversion pools
//! - `persistence`: atomic state snapshots and JSONL event log
//! - `metrics`: Prometheus metrics export and health checks
//! - `auth`, `clock`, `events`: role table, time source, event sinks

pub mod auth;
pub mod clock;
pub mod custody;
pub mod events;
pub mod exchange;
pub mod governance;
pub mod metrics;
pub mod persistence;
