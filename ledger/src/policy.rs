//! Asset-module address blocking policy.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};
use tessera_primitives::Address;

/// The asset module's view of which accounts are exempt from
/// externally-triggered balance reconciliation.
pub trait AssetPolicy: Send + Sync {
    fn is_blocked(&self, account: &Address) -> bool;
}

/// Derive a module account address: the first 20 bytes of `sha256(name)`.
pub fn module_address(name: &str) -> Address {
    let digest = Sha256::digest(name.as_bytes());
    Address::from_slice(&digest[..20])
}

/// Fixed set of blocked accounts.
#[derive(Debug, Clone, Default)]
pub struct StaticPolicy {
    blocked: BTreeSet<Address>,
}

impl StaticPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the module accounts of the given module names.
    pub fn with_module_accounts(names: &[&str]) -> Self {
        let mut policy = Self::new();
        for name in names {
            policy.block(module_address(name));
        }
        policy
    }

    pub fn block(&mut self, account: Address) {
        self.blocked.insert(account);
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}

impl AssetPolicy for StaticPolicy {
    fn is_blocked(&self, account: &Address) -> bool {
        self.blocked.contains(account)
    }
}
