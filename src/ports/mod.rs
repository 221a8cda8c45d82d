//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `OutcomeAdapter`: Canonical outcome and deadline per governance dialect
//! - `GovernorOracle`: Raw governor contract reads
//! - `AssetCustody`: Fungible asset transfers and balances
//! - `AssetExchange`: Constant-product pair reserves and swaps
//! - `EventSink`: Committed venue events
//! - `Authority`: Role checks for administrative calls
//! - `Clock`: Wall-clock time

pub mod authority;
pub mod clock;
pub mod custody;
pub mod events;
pub mod exchange;
pub mod governor;
pub mod outcome_adapter;
