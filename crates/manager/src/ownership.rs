use crate::error::ManagerError;
use stratbot_core::common::UserId;
use stratbot_core::store::port::{CredentialBinding, Robot};
use tracing::warn;

/// 带有所有者的资源
pub trait Owned {
    fn owner(&self) -> UserId;
}

impl Owned for CredentialBinding {
    fn owner(&self) -> UserId {
        self.owner
    }
}

impl Owned for Robot {
    fn owner(&self) -> UserId {
        self.owner
    }
}

/// # Summary
/// 所有权校验：资源记录的所有者必须等于当前调用者。
///
/// # Invariants
/// - 纯函数，不做 I/O；总是作用于刚从存储中读出的记录。
pub struct OwnershipGuard;

impl OwnershipGuard {
    pub fn is_owner(principal: UserId, owner: UserId) -> bool {
        principal == owner
    }

    /// 非所有者时返回 `Forbidden`
    pub fn ensure_owner<R: Owned>(principal: UserId, resource: &R) -> Result<(), ManagerError> {
        let owner = resource.owner();
        if Self::is_owner(principal, owner) {
            Ok(())
        } else {
            warn!(principal = %principal, owner = %owner, "ownership check denied");
            Err(ManagerError::Forbidden)
        }
    }
}
