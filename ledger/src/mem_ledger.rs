//! In-memory ledger and journal for testing.
//!
//! `MemLedger` implements `LedgerStore` and `Journal` on `BTreeMap`s:
//!
//! - `store` is the working multi-store, `pending` the transaction's cache
//!   scope of staged writes, `transient` the per-transaction store
//! - `events` is the ledger event log
//! - `balances` is the VM's account-balance table
//! - `journal` records rollback anchors and VM balance changes so a failed
//!   call can be unwound LIFO to its checkpoint

use std::collections::BTreeMap;

use tessera_primitives::{Address, BalanceChangeReason, BalanceDelta, Direction, Event, U256};
use tracing::trace;

use crate::error::LedgerError;
use crate::journal::{Checkpoint, Journal, MergeError, RollbackAnchor, ScopeHandle, SnapshotId};
use crate::overlay::CacheOverlay;
use crate::store::LedgerStore;

/// Copy of the multi-store taken by [`Journal::snapshot`].
#[derive(Debug, Clone)]
struct StoreSnapshot {
    store: BTreeMap<Vec<u8>, Vec<u8>>,
    pending: CacheOverlay,
    transient: BTreeMap<Vec<u8>, Vec<u8>>,
}

#[derive(Debug, Clone)]
enum JournalEntry {
    Anchor { depth: usize, anchor: RollbackAnchor },
    Balance { account: Address, previous: U256 },
}

/// In-memory ledger backed by `BTreeMap` for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct MemLedger {
    store: BTreeMap<Vec<u8>, Vec<u8>>,
    pending: CacheOverlay,
    transient: BTreeMap<Vec<u8>, Vec<u8>>,
    events: Vec<Event>,
    balances: BTreeMap<Address, U256>,
    snapshots: Vec<StoreSnapshot>,
    journal: Vec<JournalEntry>,
    depth: usize,
    open_scope: Option<u64>,
    next_scope_id: u64,
    consumed_gas: u64,
}

impl MemLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger whose working store is pre-populated with data.
    pub fn with_store(store: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    /// Set a VM balance outside the journal (genesis-style funding).
    pub fn fund(&mut self, account: Address, amount: U256) {
        self.balances.insert(account, amount);
    }

    /// Set the gas the enclosing execution has already consumed.
    pub fn set_consumed_gas(&mut self, gas: u64) {
        self.consumed_gas = gas;
    }

    /// End the transaction: merge staged writes, drop transient state,
    /// snapshots and journal entries. Events and balances are kept.
    pub fn commit(&mut self) {
        let touched = self.pending.merge_into(&mut self.store);
        self.transient.clear();
        self.snapshots.clear();
        self.journal.clear();
        self.open_scope = None;
        trace!(touched, "mem ledger: transaction committed");
    }

    /// The working store, without staged writes.
    pub fn committed_state(&self) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        &self.store
    }

    /// Number of writes staged in the cache scope.
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Id of the open cache scope, if any.
    pub fn open_scope(&self) -> Option<u64> {
        self.open_scope
    }

    /// Number of rollback anchors in the journal.
    pub fn anchor_count(&self) -> usize {
        self.journal
            .iter()
            .filter(|entry| matches!(entry, JournalEntry::Anchor { .. }))
            .count()
    }

    /// Depths at which the journal's anchors were registered, oldest first.
    pub fn anchor_depths(&self) -> Vec<usize> {
        self.journal
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Anchor { depth, .. } => Some(*depth),
                JournalEntry::Balance { .. } => None,
            })
            .collect()
    }

    fn revert_to(&mut self, journal_len: usize) {
        while self.journal.len() > journal_len {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                JournalEntry::Anchor { depth, anchor } => {
                    self.restore_anchor(&anchor);
                    trace!(depth, snapshot = %anchor.snapshot, watermark = anchor.event_watermark, "mem ledger: anchor unwound");
                }
                JournalEntry::Balance { account, previous } => {
                    self.balances.insert(account, previous);
                }
            }
        }
    }

    fn restore_anchor(&mut self, anchor: &RollbackAnchor) {
        if let Some(snapshot) = self.snapshots.get(anchor.snapshot.get() as usize) {
            self.store = snapshot.store.clone();
            self.pending = snapshot.pending.clone();
            self.transient = snapshot.transient.clone();
        }
        self.events.truncate(anchor.event_watermark);
    }
}

impl LedgerStore for MemLedger {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.pending.read_through(&self.store, key))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::EmptyKey);
        }
        self.pending.set(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::EmptyKey);
        }
        self.pending.delete(key.to_vec());
        Ok(())
    }

    fn transient_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.transient.get(key).cloned())
    }

    fn transient_set(&mut self, key: &[u8], value: &[u8]) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::EmptyKey);
        }
        self.transient.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn transient_delete(&mut self, key: &[u8]) -> Result<(), LedgerError> {
        self.transient.remove(key);
        Ok(())
    }

    fn emit_event(&mut self, event: Event) {
        self.events.push(event);
    }

    fn events(&self) -> &[Event] {
        &self.events
    }
}

impl Journal for MemLedger {
    fn open_cache_scope(&mut self) -> Result<ScopeHandle, LedgerError> {
        if let Some(open) = self.open_scope {
            return Err(LedgerError::ScopeUnavailable(format!(
                "cache scope {open} is still open"
            )));
        }
        let id = self.next_scope_id;
        self.next_scope_id += 1;
        self.open_scope = Some(id);
        Ok(ScopeHandle::new(id))
    }

    fn merge_cache_scope(&mut self, scope: ScopeHandle) -> Result<(), MergeError> {
        if self.open_scope != Some(scope.id()) {
            let source = LedgerError::ScopeNotOpen(scope.id());
            return Err(MergeError { scope, source });
        }
        let touched = self.pending.merge_into(&mut self.store);
        self.open_scope = None;
        trace!(scope = scope.id(), touched, "mem ledger: cache scope merged");
        Ok(())
    }

    fn abandon_cache_scope(&mut self, scope: ScopeHandle) {
        if self.open_scope == Some(scope.id()) {
            self.open_scope = None;
        }
    }

    fn snapshot(&mut self) -> SnapshotId {
        self.snapshots.push(StoreSnapshot {
            store: self.store.clone(),
            pending: self.pending.clone(),
            transient: self.transient.clone(),
        });
        SnapshotId::new((self.snapshots.len() - 1) as u64)
    }

    fn add_rollback_anchor(&mut self, anchor: RollbackAnchor) -> Result<(), LedgerError> {
        if anchor.snapshot.get() as usize >= self.snapshots.len() {
            return Err(LedgerError::UnknownSnapshot(anchor.snapshot));
        }
        if anchor.event_watermark > self.events.len() {
            return Err(LedgerError::WatermarkOutOfRange {
                watermark: anchor.event_watermark,
                len: self.events.len(),
            });
        }
        self.journal.push(JournalEntry::Anchor {
            depth: self.depth,
            anchor,
        });
        Ok(())
    }

    fn call_depth(&self) -> usize {
        self.depth
    }

    fn consumed_gas(&self) -> u64 {
        self.consumed_gas
    }

    fn balance(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or(U256::ZERO)
    }

    fn apply_balance_delta(
        &mut self,
        delta: &BalanceDelta,
        reason: BalanceChangeReason,
    ) -> Result<(), LedgerError> {
        let previous = self.balance(&delta.account);
        let updated = match delta.direction {
            Direction::Credit => previous
                .checked_add(delta.magnitude)
                .ok_or(LedgerError::BalanceOverflow {
                    account: delta.account,
                })?,
            Direction::Debit => {
                previous
                    .checked_sub(delta.magnitude)
                    .ok_or(LedgerError::BalanceUnderflow {
                        account: delta.account,
                        balance: previous,
                        amount: delta.magnitude,
                    })?
            }
        };
        self.journal.push(JournalEntry::Balance {
            account: delta.account,
            previous,
        });
        self.balances.insert(delta.account, updated);
        trace!(%delta, %reason, "mem ledger: balance changed");
        Ok(())
    }

    fn enter_call(&mut self) -> Checkpoint {
        let checkpoint = Checkpoint {
            depth: self.depth,
            journal_len: self.journal.len(),
        };
        self.depth += 1;
        checkpoint
    }

    fn exit_call(&mut self, checkpoint: Checkpoint, success: bool) {
        if !success {
            self.revert_to(checkpoint.journal_len);
        }
        self.depth = checkpoint.depth;
    }
}
