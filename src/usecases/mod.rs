//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the venue's workflows. Each use case is a self-contained
//! business operation.
//!
//! Use cases:
//! - `SettlementEngine`: Admission, betting, resolution, claims, admin
//! - `ExchangeClient`: Quotes and bounded-slippage conversion
//! - `ResolutionKeeper`: Periodic resolution of due proposals
//! - `ProposalLocks`: Per-proposal mutual exclusion

pub mod exchange_client;
pub mod keeper;
pub mod locks;
pub mod settlement_engine;

pub use exchange_client::{Conversion, ExchangeClient};
pub use keeper::{KeeperReport, ResolutionKeeper};
pub use locks::ProposalLocks;
pub use settlement_engine::{BetReceipt, Claim, EngineSettings, Resolution, SettlementEngine};
