//! Journal interface: isolation scopes, snapshots and rollback anchors.
//!
//! The VM reverts a failed call by unwinding its journal to the checkpoint
//! taken when the call started. Ledger-side effects of native actions join
//! that unwind through rollback anchors: each anchor names a multi-store
//! snapshot and an event-log length, and unwinding past an anchor restores
//! both. Unwinding is LIFO, so the oldest anchor passed wins.

use core::fmt;

use tessera_primitives::{Address, BalanceChangeReason, BalanceDelta, U256};

use crate::error::LedgerError;
use crate::store::LedgerStore;

/// Opaque identifier of a multi-store snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(u64);

impl SnapshotId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Point a reverted call rolls ledger state back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollbackAnchor {
    pub snapshot: SnapshotId,
    /// Event-log length when the anchor was taken.
    pub event_watermark: usize,
}

/// Handle on an open cache scope.
///
/// Not `Clone`: a scope is closed exactly once, by
/// [`Journal::merge_cache_scope`] or [`Journal::abandon_cache_scope`].
#[derive(Debug, PartialEq, Eq)]
pub struct ScopeHandle {
    id: u64,
}

impl ScopeHandle {
    /// Used by `Journal` implementations to mint handles. Implementations
    /// must reject handles they did not issue.
    #[doc(hidden)]
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// A refused merge. Carries the scope back so the caller can abandon it.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("{source}")]
pub struct MergeError {
    pub scope: ScopeHandle,
    pub source: LedgerError,
}

/// VM call checkpoint returned by [`Journal::enter_call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    /// Call depth of the caller, restored on exit.
    pub depth: usize,
    /// Journal length when the call started.
    pub journal_len: usize,
}

/// The transaction journal shared by the VM and the bridge.
pub trait Journal: LedgerStore {
    /// Open an isolated nested view of ledger state for one native action.
    fn open_cache_scope(&mut self) -> Result<ScopeHandle, LedgerError>;

    /// Merge a scope's staged writes into the active working state. On
    /// failure the scope stays open and is handed back.
    fn merge_cache_scope(&mut self, scope: ScopeHandle) -> Result<(), MergeError>;

    /// Close a scope without merging it.
    fn abandon_cache_scope(&mut self, scope: ScopeHandle);

    /// Snapshot the multi-store.
    fn snapshot(&mut self) -> SnapshotId;

    /// Record `anchor` at the current call depth.
    fn add_rollback_anchor(&mut self, anchor: RollbackAnchor) -> Result<(), LedgerError>;

    /// Current VM call depth.
    fn call_depth(&self) -> usize;

    /// Gas already consumed by the enclosing execution.
    fn consumed_gas(&self) -> u64;

    /// VM balance of `account` in 18-decimal units.
    fn balance(&self, account: &Address) -> U256;

    /// Apply a journaled change to a VM balance.
    fn apply_balance_delta(
        &mut self,
        delta: &BalanceDelta,
        reason: BalanceChangeReason,
    ) -> Result<(), LedgerError>;

    /// Start a VM call one level deeper.
    fn enter_call(&mut self) -> Checkpoint;

    /// Finish a VM call. A failed call unwinds everything journaled since
    /// `checkpoint`, including rollback anchors.
    fn exit_call(&mut self, checkpoint: Checkpoint, success: bool);
}
