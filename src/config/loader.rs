//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;
use crate::domain::dialect::{DeadlineUnit, GovernanceDialect};
use crate::domain::payout::{BPS_DENOMINATOR, MAX_RATE_BPS};

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    venue = %config.venue.name,
    daos = config.daos.len(),
    assets = config.assets.len(),
    house_rake_bps = config.venue.house_rake_bps,
    resolver_bps = config.venue.resolver_bps,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  let venue = &config.venue;

  anyhow::ensure!(
    venue.house_rake_bps <= MAX_RATE_BPS,
    "house_rake_bps must be at most {MAX_RATE_BPS}, got {}",
    venue.house_rake_bps
  );
  anyhow::ensure!(
    venue.resolver_bps <= MAX_RATE_BPS,
    "resolver_bps must be at most {MAX_RATE_BPS}, got {}",
    venue.resolver_bps
  );
  anyhow::ensure!(!venue.venue_account.is_zero(), "venue_account must be set");
  anyhow::ensure!(!venue.house_receiver.is_zero(), "house_receiver must be set");
  anyhow::ensure!(!venue.keeper_account.is_zero(), "keeper_account must be set");
  anyhow::ensure!(
    venue.keeper_interval_secs > 0,
    "keeper_interval_secs must be positive"
  );

  // Chain validation
  anyhow::ensure!(!config.chain.rpc_url.is_empty(), "RPC URL must not be empty");
  anyhow::ensure!(
    config.chain.block_time_secs > 0,
    "block_time_secs must be positive"
  );
  anyhow::ensure!(
    config.chain.max_concurrent_calls > 0,
    "max_concurrent_calls must be positive"
  );

  // DAO validation
  let mut adapters = HashSet::new();
  for (i, dao) in config.daos.iter().enumerate() {
    anyhow::ensure!(
      !dao.governor_address.is_zero(),
      "DAO {} ({}) has no governor_address",
      i,
      dao.name
    );
    anyhow::ensure!(
      !dao.adapter_address.is_zero(),
      "DAO {} ({}) has no adapter_address",
      i,
      dao.name
    );
    anyhow::ensure!(
      !dao.payout_asset.is_zero(),
      "DAO {} ({}) has no payout_asset",
      i,
      dao.name
    );
    anyhow::ensure!(
      adapters.insert(dao.adapter_address),
      "DAO {} ({}) reuses adapter_address {}",
      i,
      dao.name,
      dao.adapter_address
    );
    anyhow::ensure!(
      dao.deadline_unit == DeadlineUnit::Block || dao.dialect == GovernanceDialect::OzGovernor,
      "DAO {} ({}): only oz_governor supports timestamp deadlines",
      i,
      dao.name
    );
  }

  for asset in &config.assets {
    anyhow::ensure!(
      !asset.address.is_zero(),
      "Asset {} has no address",
      asset.symbol
    );
  }

  // Exchange validation
  anyhow::ensure!(
    config.exchange.slippage_bps < BPS_DENOMINATOR,
    "slippage_bps must be below {BPS_DENOMINATOR}, got {}",
    config.exchange.slippage_bps
  );
  for pool in &config.exchange.pools {
    anyhow::ensure!(
      pool.asset_a != pool.asset_b,
      "Pool {} pairs an asset with itself",
      pool.asset_a
    );
    anyhow::ensure!(
      pool.reserve_a > 0 && pool.reserve_b > 0,
      "Pool {}/{} must be seeded with positive reserves",
      pool.asset_a,
      pool.asset_b
    );
  }

  anyhow::ensure!(
    !config.persistence.data_dir.is_empty(),
    "data_dir must not be empty"
  );
  anyhow::ensure!(
    config.persistence.snapshot_interval_secs > 0,
    "snapshot_interval_secs must be positive"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"
[venue]
name = "test-venue"
venue_account = "0x1111111111111111111111111111111111111111"
house_receiver = "0x2222222222222222222222222222222222222222"
keeper_account = "0x3333333333333333333333333333333333333333"
house_rake_bps = 500
resolver_bps = 200

[chain]
rpc_url = "http://localhost:8545"

[[daos]]
name = "Compound"
dialect = "bravo"
governor_address = "0xc0Da02939E1441F497fd74F78cE7Decb17B66529"
adapter_address = "0x4444444444444444444444444444444444444444"
payout_asset = "0x5555555555555555555555555555555555555555"

[metrics]

[persistence]
"#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_sample_parses_with_defaults() {
    let config = parse_config(SAMPLE).unwrap();
    assert_eq!(config.venue.betting_cutoff_secs, 86_400);
    assert_eq!(config.chain.block_time_secs, 12);
    assert_eq!(config.exchange.slippage_bps, 200);
    assert_eq!(config.exchange.swap_deadline_secs, 300);
    assert_eq!(config.daos[0].dialect, GovernanceDialect::Bravo);
    assert_eq!(config.daos[0].deadline_unit, DeadlineUnit::Block);
    assert!(!config.venue.open_admission);
  }

  #[test]
  fn test_shipped_config_is_valid() {
    let config = parse_config(include_str!("../../config.toml")).unwrap();
    assert_eq!(config.daos.len(), 2);
    assert_eq!(config.daos[1].dialect, GovernanceDialect::Objection);
    assert_eq!(config.exchange.pools.len(), 1);
  }

  #[test]
  fn test_rate_above_ten_percent_rejected() {
    let text = SAMPLE.replace("house_rake_bps = 500", "house_rake_bps = 1001");
    let err = parse_config(&text).unwrap_err();
    assert!(err.to_string().contains("house_rake_bps"));
  }

  #[test]
  fn test_timestamp_deadline_only_for_oz() {
    let text = SAMPLE.replace(
      "dialect = \"bravo\"",
      "dialect = \"bravo\"\ndeadline_unit = \"timestamp\"",
    );
    assert!(parse_config(&text).is_err());

    let text = SAMPLE.replace(
      "dialect = \"bravo\"",
      "dialect = \"oz_governor\"\ndeadline_unit = \"timestamp\"",
    );
    assert!(parse_config(&text).is_ok());
  }
}
