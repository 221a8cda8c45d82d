//! Allow-lists of supported DAOs (outcome adapters) and payment assets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::{Result, VenueError};
use super::types::{AdapterId, AssetId, Capabilities};

/// Allow-list entry for a DAO, keyed by its adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedDao {
    pub is_supported: bool,
    pub adapter: AdapterId,
    pub payout_asset: AssetId,
    pub name: String,
}

/// Allow-list entry for a payment asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedAsset {
    pub is_supported: bool,
    pub asset: AssetId,
}

/// Owner-curated registry consulted at admission and bet placement.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    daos: HashMap<AdapterId, SupportedDao>,
    assets: HashMap<AssetId, SupportedAsset>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit (or re-enable) a DAO whose adapter advertises `capabilities`.
    pub fn add_dao(
        &mut self,
        adapter: AdapterId,
        capabilities: Capabilities,
        name: &str,
        payout_asset: AssetId,
    ) -> Result<()> {
        if adapter.is_zero() {
            return Err(VenueError::Validation("adapter reference is null".into()));
        }
        if payout_asset.is_zero() {
            return Err(VenueError::Validation("payout asset reference is null".into()));
        }
        if !capabilities.is_outcome_adapter() {
            return Err(VenueError::Validation(format!(
                "{adapter} does not implement the outcome adapter interface"
            )));
        }
        self.daos.insert(
            adapter,
            SupportedDao {
                is_supported: true,
                adapter,
                payout_asset,
                name: name.to_string(),
            },
        );
        Ok(())
    }

    /// Admit (or re-enable) a payment asset.
    pub fn add_asset(&mut self, asset: AssetId) -> Result<()> {
        if asset.is_zero() {
            return Err(VenueError::Validation("asset reference is null".into()));
        }
        self.assets.insert(asset, SupportedAsset { is_supported: true, asset });
        Ok(())
    }

    /// Stop admitting new proposals for a DAO. Existing ones still settle.
    pub fn disable_dao(&mut self, adapter: AdapterId) -> Result<()> {
        let entry = self
            .daos
            .get_mut(&adapter)
            .ok_or_else(|| VenueError::NotFound(format!("DAO adapter {adapter}")))?;
        entry.is_supported = false;
        Ok(())
    }

    /// Stop accepting an asset for new bets.
    pub fn disable_asset(&mut self, asset: AssetId) -> Result<()> {
        let entry = self
            .assets
            .get_mut(&asset)
            .ok_or_else(|| VenueError::NotFound(format!("asset {asset}")))?;
        entry.is_supported = false;
        Ok(())
    }

    pub fn is_dao_supported(&self, adapter: AdapterId) -> bool {
        self.daos.get(&adapter).is_some_and(|d| d.is_supported)
    }

    pub fn is_asset_supported(&self, asset: AssetId) -> bool {
        self.assets.get(&asset).is_some_and(|a| a.is_supported)
    }

    /// A supported DAO entry.
    pub fn dao(&self, adapter: AdapterId) -> Result<&SupportedDao> {
        self.daos
            .get(&adapter)
            .filter(|d| d.is_supported)
            .ok_or_else(|| VenueError::NotFound(format!("DAO adapter {adapter} is not supported")))
    }

    /// Every DAO entry, supported or not.
    pub fn daos(&self) -> impl Iterator<Item = &SupportedDao> {
        self.daos.values()
    }

    /// Export every entry, ordered by key.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut daos: Vec<SupportedDao> = self.daos.values().cloned().collect();
        daos.sort_by_key(|d| d.adapter);
        let mut assets: Vec<SupportedAsset> = self.assets.values().copied().collect();
        assets.sort_by_key(|a| a.asset);
        RegistrySnapshot { daos, assets }
    }

    /// Rebuild from a snapshot. Entries were validated when first added.
    pub fn restore(snapshot: RegistrySnapshot) -> Self {
        Self {
            daos: snapshot.daos.into_iter().map(|d| (d.adapter, d)).collect(),
            assets: snapshot.assets.into_iter().map(|a| (a.asset, a)).collect(),
        }
    }
}

/// Serializable registry state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub daos: Vec<SupportedDao>,
    pub assets: Vec<SupportedAsset>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[test]
    fn test_add_dao_requires_full_interface() {
        let mut reg = Registry::new();
        let partial = Capabilities::IDENTIFY_DAO.with(Capabilities::REPORT_OUTCOME);
        let err = reg
            .add_dao(Address::repeat_byte(1), partial, "Compound", Address::repeat_byte(2))
            .unwrap_err();
        assert!(matches!(err, VenueError::Validation(_)));
        assert!(!reg.is_dao_supported(Address::repeat_byte(1)));
    }

    #[test]
    fn test_null_references_rejected() {
        let mut reg = Registry::new();
        assert!(reg
            .add_dao(Address::ZERO, Capabilities::OUTCOME_ADAPTER, "x", Address::repeat_byte(2))
            .is_err());
        assert!(reg
            .add_dao(Address::repeat_byte(1), Capabilities::OUTCOME_ADAPTER, "x", Address::ZERO)
            .is_err());
        assert!(reg.add_asset(Address::ZERO).is_err());
    }

    #[test]
    fn test_dao_lifecycle() {
        let mut reg = Registry::new();
        let adapter = Address::repeat_byte(1);
        reg.add_dao(adapter, Capabilities::OUTCOME_ADAPTER, "Uniswap", Address::repeat_byte(9))
            .unwrap();
        assert!(reg.is_dao_supported(adapter));
        assert_eq!(reg.dao(adapter).unwrap().payout_asset, Address::repeat_byte(9));

        reg.disable_dao(adapter).unwrap();
        assert!(!reg.is_dao_supported(adapter));
        assert!(matches!(reg.dao(adapter), Err(VenueError::NotFound(_))));
    }

    #[test]
    fn test_asset_lifecycle() {
        let mut reg = Registry::new();
        let usdc = Address::repeat_byte(7);
        assert!(!reg.is_asset_supported(usdc));
        reg.add_asset(usdc).unwrap();
        assert!(reg.is_asset_supported(usdc));
        reg.disable_asset(usdc).unwrap();
        assert!(!reg.is_asset_supported(usdc));
        assert!(reg.disable_asset(Address::repeat_byte(8)).is_err());
    }

    #[test]
    fn test_snapshot_keeps_disabled_entries() {
        let mut reg = Registry::new();
        let adapter = Address::repeat_byte(1);
        reg.add_dao(adapter, Capabilities::OUTCOME_ADAPTER, "Nouns", Address::repeat_byte(9))
            .unwrap();
        reg.add_asset(Address::repeat_byte(9)).unwrap();
        reg.disable_dao(adapter).unwrap();

        let restored = Registry::restore(reg.snapshot());
        assert!(!restored.is_dao_supported(adapter));
        assert!(restored.is_asset_supported(Address::repeat_byte(9)));
        assert_eq!(restored.daos().count(), 1);
    }
}
