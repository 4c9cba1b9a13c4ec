//! `tessera-ledger`: the ledger-side collaborators of the native action bridge.
//!
//! The bridge never owns ledger state. It drives it through the interfaces
//! defined here:
//!
//! - `LedgerStore`: key-value store, transient store and event log a native
//!   action operates on
//! - `Journal`: cache scopes, multi-store snapshots, rollback anchors, call
//!   checkpoints and VM balance mutation
//! - `AssetPolicy`: which accounts are blocked from balance reconciliation
//!
//! `MemLedger` and `StaticPolicy` are in-memory implementations used by the
//! bridge's tests and as a template for production adapters.

pub mod error;
pub mod overlay;
pub mod store;
pub mod journal;
pub mod policy;
pub mod mem_ledger;

// Re-export commonly used types at the crate root.
pub use error::LedgerError;
pub use overlay::{CacheOverlay, OverlayResult};
pub use store::LedgerStore;
pub use journal::{Checkpoint, Journal, MergeError, RollbackAnchor, ScopeHandle, SnapshotId};
pub use policy::{module_address, AssetPolicy, StaticPolicy};
pub use mem_ledger::MemLedger;
