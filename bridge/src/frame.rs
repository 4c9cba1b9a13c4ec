//! Per-call ledger isolation.
//!
//! Every native action runs inside its own `CallFrame`. Opening a frame
//! stages a cache scope, snapshots the multi-store, registers a rollback
//! anchor at the current call depth and merges the scope into working state.
//! From then on the frame's ledger effects are only undone through the
//! journal's LIFO unwind.

use tessera_ledger::{Journal, MergeError, RollbackAnchor};
use tracing::{debug, warn};

use crate::error::BridgeError;

/// Ledger-side state owned by one native-action invocation.
///
/// Frames are plain stack values; a re-entrant nested call opens its own.
#[derive(Debug)]
pub struct CallFrame {
    scope_id: u64,
    anchor: RollbackAnchor,
    depth: usize,
    gas_before: u64,
    output: Vec<u8>,
}

impl CallFrame {
    /// Open a frame on `journal`.
    ///
    /// If the anchor cannot be registered, or the journal refuses the merge,
    /// the scope is abandoned. A scope is never left open.
    pub fn open(journal: &mut dyn Journal) -> Result<Self, BridgeError> {
        let scope = journal.open_cache_scope()?;
        let scope_id = scope.id();

        let anchor = RollbackAnchor {
            snapshot: journal.snapshot(),
            event_watermark: journal.event_count(),
        };
        if let Err(err) = journal.add_rollback_anchor(anchor) {
            warn!(scope = scope_id, %err, "call frame: anchor rejected, abandoning scope");
            journal.abandon_cache_scope(scope);
            return Err(err.into());
        }

        if let Err(MergeError { scope, source }) = journal.merge_cache_scope(scope) {
            warn!(scope = scope_id, err = %source, "call frame: merge refused, abandoning scope");
            journal.abandon_cache_scope(scope);
            return Err(source.into());
        }

        let depth = journal.call_depth();
        let gas_before = journal.consumed_gas();
        debug!(
            scope = scope_id,
            depth,
            snapshot = %anchor.snapshot,
            watermark = anchor.event_watermark,
            gas_before,
            "call frame: opened"
        );

        Ok(Self {
            scope_id,
            anchor,
            depth,
            gas_before,
            output: Vec::new(),
        })
    }

    pub fn scope_id(&self) -> u64 {
        self.scope_id
    }

    pub fn anchor(&self) -> RollbackAnchor {
        self.anchor
    }

    /// Call depth the anchor was registered at.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Gas consumed by the enclosing execution when the frame opened.
    pub fn gas_before(&self) -> u64 {
        self.gas_before
    }

    pub fn set_output(&mut self, output: Vec<u8>) {
        self.output = output;
    }

    pub fn into_output(self) -> Vec<u8> {
        self.output
    }
}
