//! # Access Control
//!
//! One privileged principal per vault, fixed at deployment and compared by
//! equality. There are no roles to grant and nothing to renounce.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shard_protocol::Address;

/// Raised when someone other than the admin attempts a privileged call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The caller is not the vault admin.
    #[error("caller {caller} is not an admin")]
    NotAuthorized {
        /// Address that made the call.
        caller: Address,
    },
}

/// The admin of a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRole {
    admin: Address,
}

impl AdminRole {
    /// Fixes `admin` as the only privileged caller.
    pub fn new(admin: Address) -> Self {
        Self { admin }
    }

    /// The admin address.
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Succeeds only when `caller` is the admin. Never mutates anything.
    pub fn ensure(&self, caller: &Address) -> Result<(), AccessError> {
        if *caller == self.admin {
            Ok(())
        } else {
            Err(AccessError::NotAuthorized { caller: *caller })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes() {
        let admin = Address::from_label("collector");
        assert!(AdminRole::new(admin).ensure(&admin).is_ok());
    }

    #[test]
    fn anyone_else_fails() {
        let role = AdminRole::new(Address::from_label("collector"));
        let buyer = Address::from_label("buyer");
        assert_eq!(
            role.ensure(&buyer),
            Err(AccessError::NotAuthorized { caller: buyer })
        );
        assert_eq!(
            role.ensure(&Address::ZERO),
            Err(AccessError::NotAuthorized {
                caller: Address::ZERO
            })
        );
    }
}
