//! The ledger as seen from inside a native action.
//!
//! `NativeContext` wraps the journal for the duration of one action and
//! charges every store access to the frame's ledger gas meter before or after
//! touching the store:
//!
//! | operation | charge                                              |
//! |-----------|-----------------------------------------------------|
//! | `get`     | read flat, then read per byte × (key + value)       |
//! | `set`     | write flat + write per byte × (key + value), first  |
//! | `has`     | has cost                                            |
//! | `delete`  | delete cost                                         |
//!
//! Transient-store operations follow the same table with the transient
//! profile. A refused charge surfaces as [`BridgeError::LedgerGasExhausted`]
//! and leaves the meter marked as run out.
//!
//! The journal itself never reaches the action. Nested VM calls go through
//! [`NativeContext::call_nested`] and [`NativeContext::invoke_nested`], which
//! run a complete bridge frame of their own.

use std::ops::Range;

use tessera_ledger::Journal;
use tessera_primitives::{
    Address, BalanceChangeReason, BalanceDelta, Event, GasMeter, GasProfile, U256,
};
use tracing::debug;

use crate::contract::Contract;
use crate::error::BridgeError;
use crate::precompile::{CallOutcome, FrameResult, NativeHandler, Precompile};

pub const GAS_DESC_HAS: &str = "Has";
pub const GAS_DESC_DELETE: &str = "Delete";
pub const GAS_DESC_READ_FLAT: &str = "ReadFlat";
pub const GAS_DESC_READ_PER_BYTE: &str = "ReadPerByte";
pub const GAS_DESC_WRITE_FLAT: &str = "WriteFlat";
pub const GAS_DESC_WRITE_PER_BYTE: &str = "WritePerByte";

/// Execution context handed to a native action.
pub struct NativeContext<'a> {
    journal: &'a mut dyn Journal,
    meter: GasMeter,
    kv_gas: GasProfile,
    transient_gas: GasProfile,
    caller: Address,
    precompile: Address,
    value: U256,
    /// Event-log ranges whose balance events nested calls already replayed.
    replayed: Vec<Range<usize>>,
}

impl<'a> NativeContext<'a> {
    pub fn new(
        journal: &'a mut dyn Journal,
        meter: GasMeter,
        kv_gas: GasProfile,
        transient_gas: GasProfile,
        caller: Address,
        precompile: Address,
        value: U256,
    ) -> Self {
        Self {
            journal,
            meter,
            kv_gas,
            transient_gas,
            caller,
            precompile,
            value,
            replayed: Vec::new(),
        }
    }

    pub fn caller(&self) -> Address {
        self.caller
    }

    /// Address of the precompile being executed.
    pub fn precompile(&self) -> Address {
        self.precompile
    }

    /// Value attached to the call.
    pub fn value(&self) -> U256 {
        self.value
    }

    // ── Persistent store ──

    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, BridgeError> {
        self.meter.consume(self.kv_gas.read_cost_flat, GAS_DESC_READ_FLAT)?;
        let value = self.journal.get(key)?;
        let touched = key.len() + value.as_ref().map_or(0, Vec::len);
        self.meter
            .consume(self.kv_gas.read_per_byte(touched), GAS_DESC_READ_PER_BYTE)?;
        Ok(value)
    }

    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), BridgeError> {
        self.meter.consume(self.kv_gas.write_cost_flat, GAS_DESC_WRITE_FLAT)?;
        self.meter.consume(
            self.kv_gas.write_per_byte(key.len() + value.len()),
            GAS_DESC_WRITE_PER_BYTE,
        )?;
        self.journal.set(key, value)?;
        Ok(())
    }

    pub fn has(&mut self, key: &[u8]) -> Result<bool, BridgeError> {
        self.meter.consume(self.kv_gas.has_cost, GAS_DESC_HAS)?;
        Ok(self.journal.has(key)?)
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<(), BridgeError> {
        self.meter.consume(self.kv_gas.delete_cost, GAS_DESC_DELETE)?;
        self.journal.delete(key)?;
        Ok(())
    }

    // ── Transient store ──

    pub fn transient_get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, BridgeError> {
        self.meter
            .consume(self.transient_gas.read_cost_flat, GAS_DESC_READ_FLAT)?;
        let value = self.journal.transient_get(key)?;
        let touched = key.len() + value.as_ref().map_or(0, Vec::len);
        self.meter.consume(
            self.transient_gas.read_per_byte(touched),
            GAS_DESC_READ_PER_BYTE,
        )?;
        Ok(value)
    }

    pub fn transient_set(&mut self, key: &[u8], value: &[u8]) -> Result<(), BridgeError> {
        self.meter
            .consume(self.transient_gas.write_cost_flat, GAS_DESC_WRITE_FLAT)?;
        self.meter.consume(
            self.transient_gas.write_per_byte(key.len() + value.len()),
            GAS_DESC_WRITE_PER_BYTE,
        )?;
        self.journal.transient_set(key, value)?;
        Ok(())
    }

    pub fn transient_delete(&mut self, key: &[u8]) -> Result<(), BridgeError> {
        self.meter
            .consume(self.transient_gas.delete_cost, GAS_DESC_DELETE)?;
        self.journal.transient_delete(key)?;
        Ok(())
    }

    // ── Events and gas ──

    /// Append a ledger event. Not metered.
    pub fn emit_event(&mut self, event: Event) {
        self.journal.emit_event(event);
    }

    /// The whole event log, including events from before this action.
    pub fn events(&self) -> &[Event] {
        self.journal.events()
    }

    /// VM balance of `account`. Not metered.
    pub fn balance(&self, account: &Address) -> U256 {
        self.journal.balance(account)
    }

    /// Move a VM balance directly, bypassing event replay. Not metered.
    ///
    /// An action must not also emit a balance event for the same account, or
    /// the handler applies the change a second time.
    pub fn apply_balance_delta(
        &mut self,
        delta: &BalanceDelta,
        reason: BalanceChangeReason,
    ) -> Result<(), BridgeError> {
        self.journal.apply_balance_delta(delta, reason)?;
        Ok(())
    }

    /// Charge gas for work the store does not see.
    pub fn consume_gas(&mut self, amount: u64, descriptor: &'static str) -> Result<(), BridgeError> {
        self.meter.consume(amount, descriptor)?;
        Ok(())
    }

    pub fn gas_meter(&self) -> &GasMeter {
        &self.meter
    }

    pub fn kv_gas(&self) -> &GasProfile {
        &self.kv_gas
    }

    pub fn transient_gas(&self) -> &GasProfile {
        &self.transient_gas
    }

    /// Make every further store access free.
    pub fn reset_gas_config(&mut self) {
        self.kv_gas = GasProfile::neutral();
        self.transient_gas = GasProfile::neutral();
    }

    /// Settle a ledger gas exhaustion: returns the gas consumed past
    /// `gas_before` and makes every further access through this context free.
    ///
    /// The neutral profiles last as long as the context, which is the frame.
    pub(crate) fn settle_exhaustion(&mut self, gas_before: u64) -> u64 {
        self.reset_gas_config();
        self.meter.consumed().saturating_sub(gas_before)
    }

    /// Run `action` as a nested VM call into `precompile`, paid for by
    /// `contract`.
    ///
    /// The call enters a VM call frame one level deeper and opens its own
    /// bridge frame, meter, anchor and balance handler. A failed call is
    /// unwound before this returns.
    pub fn call_nested<F>(
        &mut self,
        precompile: &Precompile,
        contract: &mut Contract,
        action: F,
    ) -> Result<Vec<u8>, BridgeError>
    where
        F: FnOnce(&mut NativeContext<'_>) -> Result<Vec<u8>, BridgeError>,
    {
        self.nested(|journal| precompile.run_frame(journal, contract, action))
    }

    /// Dispatch `contract.input` to `handler` as a nested VM call into
    /// `precompile`, the way [`Precompile::invoke`] does at the top level.
    pub fn invoke_nested<H: NativeHandler>(
        &mut self,
        precompile: &Precompile,
        handler: &H,
        contract: &mut Contract,
        read_only: bool,
    ) -> CallOutcome {
        let result = self.nested(|journal| precompile.call(handler, journal, contract, read_only));
        precompile.outcome(result, contract.gas)
    }

    fn nested(
        &mut self,
        run: impl FnOnce(&mut dyn Journal) -> FrameResult,
    ) -> Result<Vec<u8>, BridgeError> {
        let checkpoint = self.journal.enter_call();
        let result = run(&mut *self.journal);
        self.journal.exit_call(checkpoint, result.is_ok());
        let (output, replayed) = result?;
        debug!(
            depth = checkpoint.depth + 1,
            ranges = replayed.len(),
            "native context: nested call returned"
        );
        self.replayed.extend(replayed);
        Ok(output)
    }

    /// Event ranges nested calls have replayed so far. This frame's handler
    /// skips them; anything else a nested call emitted is left for it.
    pub fn replayed_events(&self) -> &[Range<usize>] {
        &self.replayed
    }

    pub(crate) fn take_replayed_ranges(&mut self) -> Vec<Range<usize>> {
        std::mem::take(&mut self.replayed)
    }
}
