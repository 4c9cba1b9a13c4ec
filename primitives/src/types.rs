//! Core type aliases and constants shared by the ledger and the bridge.

use core::fmt;

pub use alloy_primitives::{Address, Selector, U256};

/// Fixed decimal precision of every balance the VM sees.
pub const VM_DECIMALS: u8 = 18;

/// Sign of a [`BalanceDelta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Increase the account balance.
    Credit,
    /// Decrease the account balance.
    Debit,
}

/// A signed change to one account's VM balance, in 18-decimal units.
///
/// Computed from a single ledger event and applied immediately; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    pub account: Address,
    pub direction: Direction,
    pub magnitude: U256,
}

impl BalanceDelta {
    pub fn credit(account: Address, magnitude: U256) -> Self {
        Self {
            account,
            direction: Direction::Credit,
            magnitude,
        }
    }

    pub fn debit(account: Address, magnitude: U256) -> Self {
        Self {
            account,
            direction: Direction::Debit,
            magnitude,
        }
    }

    /// Returns true if applying this delta would not change the balance.
    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }
}

impl fmt::Display for BalanceDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.direction {
            Direction::Credit => '+',
            Direction::Debit => '-',
        };
        write!(f, "{}{} @ {}", sign, self.magnitude, self.account)
    }
}

/// Classification tag attached to every VM balance mutation for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceChangeReason {
    /// Replay of a bank spend/receive event.
    Unspecified,
    /// Replay of a precision-compensation fractional balance change.
    FractionalAdjustment,
}

impl fmt::Display for BalanceChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => write!(f, "unspecified"),
            Self::FractionalAdjustment => write!(f, "fractional_adjustment"),
        }
    }
}
