//! Bridge error types.
//!
//! Every variant is an ordinary value; at the call boundary each one becomes a
//! single Solidity `Error(string)` revert carrying the error text.

use alloy_sol_types::{Revert, SolError};
use tessera_ledger::LedgerError;
use tessera_primitives::{CoinError, GasError, Selector};

use crate::config::ConfigError;

/// Malformed or missing data in a ledger event being replayed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// A required attribute is absent.
    #[error("event {event_type} is missing attribute {key:?}")]
    MissingAttribute { event_type: String, key: &'static str },

    /// An address attribute could not be parsed.
    #[error("invalid address {value:?}: {reason}")]
    InvalidAddress { value: String, reason: String },

    /// An amount or delta attribute could not be parsed or scaled.
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] CoinError),

    /// The journal refused the balance change.
    #[error("failed to apply balance change: {0}")]
    Apply(LedgerError),
}

/// Top-level error type for the bridge crate.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// No operation matches the call data and no fallback is defined.
    #[error("execution reverted")]
    ExecutionReverted,

    /// A 4-byte selector with no method behind it.
    #[error("no method with id: {0}")]
    UnknownSelector(Selector),

    /// A state-mutating operation under a read-only call.
    #[error("write protection")]
    WriteProtection,

    /// Call data did not decode against the method's argument schema.
    #[error("failed to decode arguments of {method}: {reason}")]
    ArgumentDecoding { method: String, reason: String },

    /// Output values did not match the method's return schema.
    #[error("failed to encode output of {method}: {reason}")]
    OutputEncoding { method: String, reason: String },

    /// The contract cannot pay for the native action.
    #[error("out of gas")]
    OutOfGas,

    /// The ledger gas meter refused a charge during the native action.
    ///
    /// Raised inside the action and turned into [`BridgeError::OutOfGas`] by
    /// the bridge's recovery step; never returned from a call.
    #[error("ledger gas exhausted in {descriptor}: limit {limit}, used {used}")]
    LedgerGasExhausted {
        descriptor: &'static str,
        limit: u64,
        used: u64,
    },

    /// Replaying ledger events into VM balances failed.
    #[error("balance reconciliation failed: {0}")]
    EventReconciliation(#[from] ReconcileError),

    /// A ledger collaborator failure.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Invalid bridge configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Domain error returned by the native action, passed through as-is.
    #[error(transparent)]
    NativeAction(#[from] anyhow::Error),
}

impl From<GasError> for BridgeError {
    fn from(err: GasError) -> Self {
        match err {
            GasError::OutOfGas {
                descriptor,
                limit,
                attempted,
            } => Self::LedgerGasExhausted {
                descriptor,
                limit,
                used: attempted,
            },
            GasError::Overflow { descriptor } => Self::LedgerGasExhausted {
                descriptor,
                limit: u64::MAX,
                used: u64::MAX,
            },
        }
    }
}

impl BridgeError {
    /// Wrap a native-action domain error.
    pub fn native<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::NativeAction(anyhow::Error::new(err))
    }

    /// Returns true for the ledger gas-exhaustion sentinel.
    pub fn is_gas_exhaustion(&self) -> bool {
        matches!(self, Self::LedgerGasExhausted { .. })
    }

    /// ABI-encoded `Error(string)` revert payload carrying this error's text.
    pub fn revert_payload(&self) -> Vec<u8> {
        Revert {
            reason: self.to_string(),
        }
        .abi_encode()
    }
}
