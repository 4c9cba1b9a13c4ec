//! Ledger-side gas accounting.
//!
//! While a native action runs, every store access is charged against a
//! `GasMeter` bounded by the calling contract's remaining gas. Costs come from
//! a `GasProfile`; two profiles are in play, one for persistent storage and one
//! for transient storage.

use serde::{Deserialize, Serialize};

use crate::error::GasError;

/// Gas cost table for one kind of key-value storage.
///
/// Reads cost `read_cost_flat + read_cost_per_byte * (key_len + value_len)`,
/// writes cost `write_cost_flat + write_cost_per_byte * (key_len + value_len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasProfile {
    pub has_cost: u64,
    pub delete_cost: u64,
    pub read_cost_flat: u64,
    pub read_cost_per_byte: u64,
    pub write_cost_flat: u64,
    pub write_cost_per_byte: u64,
    pub iter_next_cost_flat: u64,
}

impl GasProfile {
    /// Standard table for persistent ledger storage.
    pub const fn kv() -> Self {
        Self {
            has_cost: 1000,
            delete_cost: 1000,
            read_cost_flat: 1000,
            read_cost_per_byte: 3,
            write_cost_flat: 2000,
            write_cost_per_byte: 30,
            iter_next_cost_flat: 30,
        }
    }

    /// Standard table for transient (per-transaction) storage.
    pub const fn transient() -> Self {
        Self {
            has_cost: 100,
            delete_cost: 100,
            read_cost_flat: 100,
            read_cost_per_byte: 0,
            write_cost_flat: 200,
            write_cost_per_byte: 3,
            iter_next_cost_flat: 3,
        }
    }

    /// A table that charges nothing for any access.
    pub const fn neutral() -> Self {
        Self {
            has_cost: 0,
            delete_cost: 0,
            read_cost_flat: 0,
            read_cost_per_byte: 0,
            write_cost_flat: 0,
            write_cost_per_byte: 0,
            iter_next_cost_flat: 0,
        }
    }

    /// Returns true if every cost in the table is zero.
    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }

    /// Variable part of a read touching `byte_count` bytes.
    pub fn read_per_byte(&self, byte_count: usize) -> u64 {
        (byte_count as u64).saturating_mul(self.read_cost_per_byte)
    }

    /// Variable part of a write touching `byte_count` bytes.
    pub fn write_per_byte(&self, byte_count: usize) -> u64 {
        (byte_count as u64).saturating_mul(self.write_cost_per_byte)
    }

    /// Flat read cost plus the per-byte charge for `byte_count` bytes.
    pub fn read_cost(&self, byte_count: usize) -> u64 {
        self.read_cost_flat.saturating_add(self.read_per_byte(byte_count))
    }

    /// Flat write cost plus the per-byte charge for `byte_count` bytes.
    pub fn write_cost(&self, byte_count: usize) -> u64 {
        self.write_cost_flat.saturating_add(self.write_per_byte(byte_count))
    }
}

impl Default for GasProfile {
    fn default() -> Self {
        Self::kv()
    }
}

/// Category under which gas is deducted from a VM contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GasChangeReason {
    /// Successful native action, charged its metered cost.
    CallPrecompiledContract,
    /// Native action that ran out of ledger gas.
    CallFailedExecution,
}

impl core::fmt::Display for GasChangeReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CallPrecompiledContract => write!(f, "call_precompiled_contract"),
            Self::CallFailedExecution => write!(f, "call_failed_execution"),
        }
    }
}

/// Tracks ledger gas consumption during one native action.
///
/// A charge that would exceed the limit fails and pins consumption at the
/// limit: the operation that ran out is taken to have used everything left.
/// Once that happens [`ran_out`](GasMeter::ran_out) stays true for the life
/// of the meter.
#[derive(Debug, Clone)]
pub struct GasMeter {
    limit: u64,
    consumed: u64,
    ran_out: bool,
}

impl GasMeter {
    /// Create a new gas meter with the given limit.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            consumed: 0,
            ran_out: false,
        }
    }

    /// Create an unlimited gas meter (for testing only).
    pub fn unlimited() -> Self {
        Self::new(u64::MAX)
    }

    /// Consume gas, labelling the charge with `descriptor`.
    pub fn consume(&mut self, amount: u64, descriptor: &'static str) -> Result<(), GasError> {
        let attempted = match self.consumed.checked_add(amount) {
            Some(v) => v,
            None => {
                self.exhaust();
                return Err(GasError::Overflow { descriptor });
            }
        };
        if attempted > self.limit {
            self.exhaust();
            return Err(GasError::OutOfGas {
                descriptor,
                limit: self.limit,
                attempted,
            });
        }
        self.consumed = attempted;
        Ok(())
    }

    fn exhaust(&mut self) {
        self.consumed = self.limit;
        self.ran_out = true;
    }

    /// Returns the total gas consumed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Returns the remaining gas before the limit is reached.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.consumed)
    }

    /// Returns the gas limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns true if all gas has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.consumed >= self.limit
    }

    /// Returns true if a charge has ever been refused by this meter.
    pub fn ran_out(&self) -> bool {
        self.ran_out
    }
}
