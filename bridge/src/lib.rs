//! `tessera-bridge`: lets EVM contracts call native ledger operations.
//!
//! A precompile call flows through three pieces:
//!
//! - the ABI dispatcher (`abi`) picks the method from call data, enforces
//!   read-only calls and decodes arguments
//! - the bridge (`precompile`) runs the native action inside an isolated,
//!   revertible ledger frame, meters its storage gas and charges the contract
//! - the balance handler (`balance_handler`) replays the action's coin
//!   movements into VM balances so later VM instructions see them
//!
//! Ledger state lives behind the `tessera_ledger::Journal` trait; the bridge
//! owns none of it.

pub mod error;
pub mod config;
pub mod abi;
pub mod contract;
pub mod balance_handler;
pub mod frame;
pub mod context;
pub mod precompile;

// Re-export commonly used types at the crate root.
pub use error::{BridgeError, ReconcileError};
pub use config::{BridgeConfig, ConfigError};
pub use abi::{
    dispatch, AbiSchema, BoundSchema, DispatchedCall, MethodDescriptor, MethodId, MethodKind,
    SchemaError,
};
pub use contract::Contract;
pub use balance_handler::{ArmedBalanceHandler, BalanceHandler, BalanceHandlerFactory};
pub use frame::CallFrame;
pub use context::NativeContext;
pub use precompile::{CallOutcome, NativeHandler, Precompile};
