//! The ledger state a native action reads and writes.
//!
//! Gas is not charged here; the bridge meters every call before it reaches
//! the store.

use tessera_primitives::Event;

use crate::error::LedgerError;

/// Key-value store, transient store and event log of the active ledger context.
///
/// Reads observe committed state plus every write made earlier in the same
/// transaction. Transient entries live until the transaction ends.
pub trait LedgerStore {
    /// Read a value. `Ok(None)` if the key does not exist.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Write a key-value pair. Empty keys are rejected.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), LedgerError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), LedgerError>;

    /// Check if a key exists. Backends may override the default.
    fn has(&self, key: &[u8]) -> Result<bool, LedgerError> {
        Ok(self.get(key)?.is_some())
    }

    fn transient_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError>;

    fn transient_set(&mut self, key: &[u8], value: &[u8]) -> Result<(), LedgerError>;

    fn transient_delete(&mut self, key: &[u8]) -> Result<(), LedgerError>;

    /// Append an event to the event log.
    fn emit_event(&mut self, event: Event);

    /// The event log, in emission order.
    fn events(&self) -> &[Event];

    /// Current event-log length, used as a watermark.
    fn event_count(&self) -> usize {
        self.events().len()
    }
}
