//! Owner authorization predicate.
//!
//! Every owner-gated mutation across the workspace starts by calling
//! [`require_owner`].  Component error enums wrap the returned
//! [`Unauthorized`] via `#[from]` so the check stays in one place while each
//! component keeps its own error vocabulary (`NotOwner`, `NotFlowOwner`).

use crate::types::AccountId;

/// The caller is not the owner of the targeted resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("caller {caller} is not the owner {owner}")]
pub struct Unauthorized {
    pub caller: AccountId,
    pub owner: AccountId,
}

/// Succeed only when `caller` is `owner`.
pub fn require_owner(caller: AccountId, owner: AccountId) -> Result<(), Unauthorized> {
    if caller == owner {
        Ok(())
    } else {
        Err(Unauthorized { caller, owner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_passes() {
        let a = AccountId::from_low_u64(1);
        assert!(require_owner(a, a).is_ok());
    }

    #[test]
    fn non_owner_is_rejected() {
        let owner = AccountId::from_low_u64(1);
        let caller = AccountId::from_low_u64(2);
        let err = require_owner(caller, owner).unwrap_err();
        assert_eq!(err.caller, caller);
        assert_eq!(err.owner, owner);
    }
}
