//! Governance adapters - outcome reporting for supported DAOs.
//!
//! `GovernanceAdapter` is the single `OutcomeAdapter` implementation,
//! parameterized by dialect. It reads native state through a
//! `GovernorOracle`: `RpcGovernor` for deployed governors over
//! JSON-RPC, `ScriptedGovernor` for simulations.

pub mod adapter;
pub mod provider;
pub mod rpc;
pub mod scripted;

pub use adapter::{AdapterSettings, GovernanceAdapter};
pub use provider::ChainProvider;
pub use rpc::{DeadlineCall, RpcGovernor};
pub use scripted::ScriptedGovernor;
