//! Authority Port - Role Checks at the Administrative Boundary

use async_trait::async_trait;

use crate::domain::types::AccountId;

/// Roles the engine asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
  /// Registry and rate management.
  Admin,
  /// Proposal admission.
  Curator,
}

/// Trait for the privileged-role collaborator.
#[async_trait]
pub trait Authority: Send + Sync + 'static {
  /// Whether `account` holds `role`.
  async fn has_role(&self, account: AccountId, role: Role) -> bool;
}
