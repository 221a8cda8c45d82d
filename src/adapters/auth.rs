//! Static role table loaded from configuration.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::types::AccountId;
use crate::ports::authority::{Authority, Role};

/// Role assignments fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthority {
    admins: HashSet<AccountId>,
    curators: HashSet<AccountId>,
    open_admission: bool,
}

impl StaticAuthority {
    pub fn new(
        admins: impl IntoIterator<Item = AccountId>,
        curators: impl IntoIterator<Item = AccountId>,
        open_admission: bool,
    ) -> Self {
        Self {
            admins: admins.into_iter().collect(),
            curators: curators.into_iter().collect(),
            open_admission,
        }
    }
}

#[async_trait]
impl Authority for StaticAuthority {
    async fn has_role(&self, account: AccountId, role: Role) -> bool {
        match role {
            Role::Admin => self.admins.contains(&account),
            // Admins may always curate.
            Role::Curator => {
                self.open_admission || self.curators.contains(&account) || self.admins.contains(&account)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[tokio::test]
    async fn test_roles() {
        let admin = Address::repeat_byte(1);
        let curator = Address::repeat_byte(2);
        let outsider = Address::repeat_byte(3);
        let auth = StaticAuthority::new([admin], [curator], false);

        assert!(auth.has_role(admin, Role::Admin).await);
        assert!(auth.has_role(admin, Role::Curator).await);
        assert!(auth.has_role(curator, Role::Curator).await);
        assert!(!auth.has_role(curator, Role::Admin).await);
        assert!(!auth.has_role(outsider, Role::Curator).await);
    }

    #[tokio::test]
    async fn test_open_admission() {
        let auth = StaticAuthority::new([], [], true);
        assert!(auth.has_role(Address::repeat_byte(9), Role::Curator).await);
        assert!(!auth.has_role(Address::repeat_byte(9), Role::Admin).await);
    }
}
