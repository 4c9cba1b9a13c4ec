//! The native action bridge.
//!
//! A [`Precompile`] runs native ledger actions on behalf of VM calls. For
//! each call [`Precompile::run_native_action`]:
//!
//! 1. opens a [`CallFrame`]: cache scope, snapshot, rollback anchor at the
//!    current depth, merge
//! 2. arms a fresh balance handler, if one is configured
//! 3. installs a ledger gas meter bounded by the contract's remaining gas and
//!    pre-charged with the gas the enclosing execution already consumed
//! 4. runs the action; if the meter ran out, charges the contract everything
//!    the action used as failed execution and returns `OutOfGas`
//! 5. on action error returns it untouched, with nothing charged or replayed
//! 6. charges the contract the metered cost
//! 7. replays the action's balance events into VM balances, except those
//!    a nested call's handler already replayed
//!
//! Undoing ledger effects of a failed call is left to the journal, which
//! restores the frame's anchor when the VM unwinds the call.

use std::ops::Range;
use std::sync::Arc;

use tessera_ledger::{AssetPolicy, Journal};
use tessera_primitives::{Address, CoinInfo, GasChangeReason, GasMeter, GasProfile};
use tracing::{debug, warn};

use crate::abi::{BoundSchema, DispatchedCall, MethodDescriptor, MethodId};
use crate::balance_handler::BalanceHandlerFactory;
use crate::config::BridgeConfig;
use crate::context::NativeContext;
use crate::contract::Contract;
use crate::error::BridgeError;
use crate::frame::CallFrame;

const GAS_DESC_INITIAL: &str = "InitialGas";

/// Output of one bridge frame plus the event-log ranges whose balance events
/// a handler in that frame, or in a frame nested below it, replayed.
pub(crate) type FrameResult = Result<(Vec<u8>, Vec<Range<usize>>), BridgeError>;

/// A native-operation handler exposed to the VM at a precompile address.
pub trait NativeHandler {
    type Method: MethodId;

    fn schema(&self) -> &BoundSchema<Self::Method>;

    /// Whether `method` writes state. Defaults to its declared mutability.
    fn is_mutating(&self, method: &MethodDescriptor) -> bool {
        method.is_state_mutating()
    }

    /// Run the dispatched operation and return its ABI-encoded output.
    fn execute(
        &self,
        ctx: &mut NativeContext<'_>,
        call: &DispatchedCall<'_, Self::Method>,
    ) -> Result<Vec<u8>, BridgeError>;
}

/// Result of a precompile call as handed back to the VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Success { output: Vec<u8>, gas_left: u64 },
    /// `payload` is an ABI-encoded `Error(string)`.
    Reverted { payload: Vec<u8>, gas_left: u64 },
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn gas_left(&self) -> u64 {
        match self {
            Self::Success { gas_left, .. } | Self::Reverted { gas_left, .. } => *gas_left,
        }
    }

    /// Output on success, revert payload otherwise.
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Success { output, .. } => output,
            Self::Reverted { payload, .. } => payload,
        }
    }
}

/// Bridge between VM calls at one address and native ledger actions.
#[derive(Debug, Clone)]
pub struct Precompile {
    address: Address,
    kv_gas: GasProfile,
    transient_gas: GasProfile,
    coin: CoinInfo,
    balance_handlers: Option<BalanceHandlerFactory>,
}

impl Precompile {
    /// Build a precompile from a validated `config`.
    pub fn new(address: Address, config: &BridgeConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        Ok(Self {
            address,
            kv_gas: config.kv_gas,
            transient_gas: config.transient_gas,
            coin: config.coin.clone(),
            balance_handlers: None,
        })
    }

    /// Replay balance events of every action into VM balances, in the
    /// configured coin, skipping accounts `policy` blocks.
    pub fn with_asset_policy(mut self, policy: Arc<dyn AssetPolicy>) -> Self {
        self.balance_handlers = Some(BalanceHandlerFactory::new(policy, self.coin.clone()));
        self
    }

    /// Whether actions run with a balance handler.
    pub fn replays_balances(&self) -> bool {
        self.balance_handlers.is_some()
    }

    /// The VM coin balance events are scaled from.
    pub fn coin(&self) -> &CoinInfo {
        &self.coin
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn set_address(&mut self, address: Address) {
        self.address = address;
    }

    pub fn kv_gas(&self) -> &GasProfile {
        &self.kv_gas
    }

    pub fn transient_gas(&self) -> &GasProfile {
        &self.transient_gas
    }

    /// Static gas for a call with `input`: the write table's flat and
    /// per-byte costs for mutating calls, the read table's otherwise.
    pub fn required_gas(&self, input: &[u8], is_mutating: bool) -> u64 {
        if is_mutating {
            self.kv_gas.write_cost(input.len())
        } else {
            self.kv_gas.read_cost(input.len())
        }
    }

    /// Run `action` in an isolated, metered frame and reconcile its effects.
    pub fn run_native_action<F>(
        &self,
        journal: &mut dyn Journal,
        contract: &mut Contract,
        action: F,
    ) -> Result<Vec<u8>, BridgeError>
    where
        F: FnOnce(&mut NativeContext<'_>) -> Result<Vec<u8>, BridgeError>,
    {
        self.run_frame(journal, contract, action)
            .map(|(output, _)| output)
    }

    pub(crate) fn run_frame<F>(
        &self,
        journal: &mut dyn Journal,
        contract: &mut Contract,
        action: F,
    ) -> FrameResult
    where
        F: FnOnce(&mut NativeContext<'_>) -> Result<Vec<u8>, BridgeError>,
    {
        let mut frame = CallFrame::open(journal)?;
        let gas_before = frame.gas_before();

        let armed = self
            .balance_handlers
            .as_ref()
            .map(|factory| factory.new_handler().arm(&*journal));

        let mut ctx = NativeContext::new(
            journal,
            GasMeter::new(contract.gas),
            self.kv_gas,
            self.transient_gas,
            contract.caller,
            contract.address,
            contract.value,
        );

        let result = match ctx.consume_gas(gas_before, GAS_DESC_INITIAL) {
            Ok(()) => action(&mut ctx),
            Err(err) => Err(err),
        };

        let exhausted = ctx.gas_meter().ran_out()
            || result.as_ref().is_err_and(BridgeError::is_gas_exhaustion);
        if exhausted {
            let used = ctx.settle_exhaustion(gas_before);
            if !contract.use_gas(used, GasChangeReason::CallFailedExecution) {
                let remaining = contract.gas;
                contract.use_gas(remaining, GasChangeReason::CallFailedExecution);
            }
            warn!(
                precompile = %self.address,
                gas_before,
                used,
                gas_left = contract.gas,
                "native action ran out of ledger gas"
            );
            return Err(BridgeError::OutOfGas);
        }

        let output = result?;
        let cost = ctx.gas_meter().consumed().saturating_sub(gas_before);
        let nested = ctx.take_replayed_ranges();
        drop(ctx);

        if !contract.use_gas(cost, GasChangeReason::CallPrecompiledContract) {
            warn!(precompile = %self.address, cost, gas = contract.gas, "contract cannot pay for native action");
            return Err(BridgeError::OutOfGas);
        }
        debug!(
            precompile = %self.address,
            depth = frame.depth(),
            cost,
            gas_left = contract.gas,
            "native action charged"
        );

        // With a handler, everything this frame's action left in the log has
        // been replayed here or below; without one, only what nested
        // handlers replayed.
        let replayed = match armed {
            Some(handler) => {
                let watermark = handler.watermark();
                handler.reconcile_skipping(journal, &nested)?;
                vec![watermark..journal.event_count()]
            }
            None => nested,
        };

        frame.set_output(output);
        Ok((frame.into_output(), replayed))
    }

    /// Dispatch `contract.input` to `handler` and run it as a native action.
    ///
    /// This is the VM-facing boundary: the static [`required_gas`] is charged
    /// first, and any error becomes a revert carrying its text.
    ///
    /// [`required_gas`]: Precompile::required_gas
    pub fn invoke<H: NativeHandler>(
        &self,
        handler: &H,
        journal: &mut dyn Journal,
        contract: &mut Contract,
        read_only: bool,
    ) -> CallOutcome {
        let result = self
            .call(handler, journal, contract, read_only)
            .map(|(output, _)| output);
        self.outcome(result, contract.gas)
    }

    pub(crate) fn outcome(&self, result: Result<Vec<u8>, BridgeError>, gas_left: u64) -> CallOutcome {
        match result {
            Ok(output) => CallOutcome::Success { output, gas_left },
            Err(err) => {
                debug!(precompile = %self.address, %err, "native call reverted");
                CallOutcome::Reverted {
                    payload: err.revert_payload(),
                    gas_left,
                }
            }
        }
    }

    pub(crate) fn call<H: NativeHandler>(
        &self,
        handler: &H,
        journal: &mut dyn Journal,
        contract: &mut Contract,
        read_only: bool,
    ) -> FrameResult {
        let call = handler.schema().dispatch(
            &contract.input,
            contract.value,
            read_only,
            |method| handler.is_mutating(method),
        )?;

        let required = self.required_gas(&contract.input, handler.is_mutating(call.method));
        if !contract.use_gas(required, GasChangeReason::CallPrecompiledContract) {
            return Err(BridgeError::OutOfGas);
        }

        self.run_frame(journal, contract, |ctx| handler.execute(ctx, &call))
    }
}
