//! The VM's view of a call into a precompile.

use tessera_primitives::{Address, GasChangeReason, U256};
use tracing::trace;

/// A precompile call frame as the VM sees it: who called, with what, and how
/// much gas is left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub caller: Address,
    /// Address of the precompile being called.
    pub address: Address,
    pub value: U256,
    pub input: Vec<u8>,
    /// Remaining gas.
    pub gas: u64,
}

impl Contract {
    pub fn new(caller: Address, address: Address, value: U256, input: Vec<u8>, gas: u64) -> Self {
        Self {
            caller,
            address,
            value,
            input,
            gas,
        }
    }

    /// Deduct `amount` gas. Returns false, leaving gas untouched, if the
    /// contract cannot afford it.
    pub fn use_gas(&mut self, amount: u64, reason: GasChangeReason) -> bool {
        if self.gas < amount {
            return false;
        }
        self.gas -= amount;
        trace!(amount, %reason, remaining = self.gas, "contract gas used");
        true
    }
}
