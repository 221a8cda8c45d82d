//! Configuration Module - TOML-based Venue Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Governor addresses, payout assets, commission rates and pool seeds
//! are externalized here - nothing is hardcoded in the domain layer.

pub mod loader;

use serde::Deserialize;

use crate::domain::dialect::{DeadlineUnit, GovernanceDialect};
use crate::domain::types::{AccountId, AdapterId, Amount, AssetId, Bps};

/// Top-level venue configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the venue begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Venue identity, accounts and commission rates.
  pub venue: VenueConfig,
  /// JSON-RPC endpoint for governor queries.
  pub chain: ChainConfig,
  /// Supported DAOs and their governors.
  #[serde(default)]
  pub daos: Vec<DaoConfig>,
  /// Accepted payment assets.
  #[serde(default)]
  pub assets: Vec<AssetConfig>,
  /// Conversion settings and seeded pools.
  #[serde(default)]
  pub exchange: ExchangeConfig,
  /// Metrics and monitoring.
  pub metrics: MetricsConfig,
  /// Persistence configuration.
  pub persistence: PersistenceConfig,
}

/// Venue identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
  /// Human-readable venue name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Custodial account holding every stake.
  pub venue_account: AccountId,
  /// Receiver of the house commission.
  pub house_receiver: AccountId,
  /// Resolver identity used by the keeper.
  pub keeper_account: AccountId,
  /// Accounts holding the admin role.
  #[serde(default)]
  pub admins: Vec<AccountId>,
  /// Accounts allowed to admit proposals.
  #[serde(default)]
  pub curators: Vec<AccountId>,
  /// Let anyone admit proposals.
  #[serde(default)]
  pub open_admission: bool,
  /// House commission on the losing pool (bps, ≤ 1000).
  pub house_rake_bps: Bps,
  /// Resolver commission on the losing pool (bps, ≤ 1000).
  pub resolver_bps: Bps,
  /// Lead time before the voting deadline during which bets are rejected.
  #[serde(default = "default_betting_cutoff")]
  pub betting_cutoff_secs: u64,
  /// Interval between keeper sweeps.
  #[serde(default = "default_keeper_interval")]
  pub keeper_interval_secs: u64,
}

/// JSON-RPC configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
  /// RPC endpoint URL.
  pub rpc_url: String,
  /// Expected chain id, checked at startup when set.
  pub chain_id: Option<u64>,
  /// Seconds per block for block-height deadlines.
  #[serde(default = "default_block_time")]
  pub block_time_secs: u64,
  /// Per-call timeout (milliseconds).
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Maximum concurrent RPC calls.
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent_calls: usize,
  /// Retries on transport failures.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
}

/// One supported DAO.
#[derive(Debug, Clone, Deserialize)]
pub struct DaoConfig {
  /// Display name.
  pub name: String,
  /// Governance dialect of the governor.
  pub dialect: GovernanceDialect,
  /// Governor contract queried for proposal state.
  pub governor_address: AccountId,
  /// Registry key of the DAO's outcome adapter.
  pub adapter_address: AdapterId,
  /// Asset every stake on this DAO settles in.
  pub payout_asset: AssetId,
  /// Unit of the voting-end value (OZ governors may use timestamps).
  #[serde(default)]
  pub deadline_unit: DeadlineUnit,
}

/// One accepted payment asset.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
  /// Ticker for logs.
  pub symbol: String,
  /// Asset address.
  pub address: AssetId,
}

/// Conversion configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
  /// Slippage tolerance applied to quotes (200 = minOut is 98% of quote).
  #[serde(default = "default_slippage")]
  pub slippage_bps: Bps,
  /// Swap deadline offset from now.
  #[serde(default = "default_swap_deadline")]
  pub swap_deadline_secs: u64,
  /// Account executing swaps.
  #[serde(default)]
  pub router: AccountId,
  /// Seeded constant-product pools.
  #[serde(default)]
  pub pools: Vec<PoolConfig>,
}

impl Default for ExchangeConfig {
  fn default() -> Self {
    Self {
      slippage_bps: default_slippage(),
      swap_deadline_secs: default_swap_deadline(),
      router: AccountId::ZERO,
      pools: Vec::new(),
    }
  }
}

/// Seed reserves for one pair.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
  pub asset_a: AssetId,
  pub asset_b: AssetId,
  pub reserve_a: Amount,
  pub reserve_b: Amount,
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics endpoint.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Bind address for metrics server.
  #[serde(default = "default_metrics_bind")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for state snapshots and event logs.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// State snapshot interval (seconds).
  #[serde(default = "default_snapshot_interval")]
  pub snapshot_interval_secs: u64,
}

fn default_log_level() -> String {
  "info".to_string()
}
fn default_true() -> bool {
  true
}
fn default_betting_cutoff() -> u64 {
  86_400
}
fn default_keeper_interval() -> u64 {
  60
}
fn default_block_time() -> u64 {
  12
}
fn default_timeout_ms() -> u64 {
  10_000
}
fn default_max_concurrent() -> usize {
  8
}
fn default_max_retries() -> u32 {
  3
}
fn default_slippage() -> Bps {
  200
}
fn default_swap_deadline() -> u64 {
  300
}
fn default_metrics_bind() -> String {
  "0.0.0.0:9090".to_string()
}
fn default_health_port() -> u16 {
  8080
}
fn default_data_dir() -> String {
  "./data".to_string()
}
fn default_snapshot_interval() -> u64 {
  60
}
