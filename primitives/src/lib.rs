//! `tessera-primitives`: foundational types for the Tessera native action bridge.
//!
//! This crate provides the types shared by the ledger collaborator and the
//! bridge itself:
//!
//! - VM-facing account and amount types (re-exported from `alloy-primitives`)
//! - `BalanceDelta` and the balance-change classification tags
//! - Ledger events and the attribute keys the balance handler understands
//! - `GasMeter` and `GasProfile` for ledger-side storage metering
//! - Coin parsing and 18-decimal normalisation
//! - Error types for the above

pub mod types;
pub mod error;
pub mod gas;
pub mod event;
pub mod coin;

// Re-export commonly used types at the crate root for convenience.
pub use types::{Address, BalanceChangeReason, BalanceDelta, Direction, Selector, U256, VM_DECIMALS};
pub use error::{CoinError, GasError};
pub use gas::{GasChangeReason, GasMeter, GasProfile};
pub use event::{Event, EventAttribute};
pub use coin::{Coin, CoinInfo};
