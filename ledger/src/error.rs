//! Ledger collaborator error type.

use tessera_primitives::{Address, U256};

use crate::journal::SnapshotId;

/// Failure reported by a `LedgerStore` or `Journal` implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Store keys must be non-empty.
    #[error("store key must not be empty")]
    EmptyKey,

    /// A cache scope could not be opened.
    #[error("cache scope unavailable: {0}")]
    ScopeUnavailable(String),

    /// A scope handle did not match the open cache scope.
    #[error("cache scope {0} is not open")]
    ScopeNotOpen(u64),

    /// A rollback anchor named a snapshot the store never took.
    #[error("unknown snapshot {0}")]
    UnknownSnapshot(SnapshotId),

    /// A rollback anchor watermark lies beyond the event log.
    #[error("event watermark {watermark} beyond event log length {len}")]
    WatermarkOutOfRange { watermark: usize, len: usize },

    /// A debit larger than the account's VM balance.
    #[error("insufficient VM balance for {account}: have {balance}, need {amount}")]
    BalanceUnderflow {
        account: Address,
        balance: U256,
        amount: U256,
    },

    /// A credit that overflows the account's VM balance.
    #[error("VM balance overflow for {account}")]
    BalanceOverflow { account: Address },

    /// Backend failure not covered above.
    #[error("internal ledger error: {0}")]
    Internal(String),
}
