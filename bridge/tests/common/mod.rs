//! Shared test helpers for integration tests.
//!
//! Provides a toy bank precompile, deterministic accounts, ledger setup and a
//! `vm_call` wrapper that enters and exits a VM call frame around the bridge
//! the way an interpreter would.

#![allow(dead_code)]

use std::sync::Arc;

use alloy_dyn_abi::DynSolValue;
use tessera_bridge::{
    BoundSchema, BridgeConfig, BridgeError, CallOutcome, Contract,
    DispatchedCall, MethodId, NativeContext, NativeHandler, Precompile,
};
use tessera_ledger::{module_address, Journal, LedgerStore, MemLedger, StaticPolicy};
use tessera_primitives::{Address, CoinInfo, Event, U256};

/// Bank precompile address.
pub const BANK_ADDRESS: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x08, 0x04,
]);

pub const DENOM: &str = "uatom";
pub const DECIMALS: u8 = 6;

/// Module whose account is blocked from balance replay.
pub const BLOCKED_MODULE: &str = "distribution";

pub const BANK_ABI: &str = r#"[
    {"type":"function","name":"send","stateMutability":"nonpayable",
     "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
     "outputs":[{"name":"","type":"bool"}]},
    {"type":"function","name":"balanceOf","stateMutability":"view",
     "inputs":[{"name":"account","type":"address"}],
     "outputs":[{"name":"","type":"uint256"}]},
    {"type":"fallback","stateMutability":"nonpayable"},
    {"type":"receive","stateMutability":"payable"}
]"#;

pub const BANK_ABI_NO_FALLBACK: &str = r#"[
    {"type":"function","name":"send","stateMutability":"nonpayable",
     "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
     "outputs":[{"name":"","type":"bool"}]},
    {"type":"function","name":"balanceOf","stateMutability":"view",
     "inputs":[{"name":"account","type":"address"}],
     "outputs":[{"name":"","type":"uint256"}]}
]"#;

// ── Accounts ──

pub fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

pub fn carol() -> Address {
    Address::repeat_byte(0xc0)
}

pub fn blocked_account() -> Address {
    module_address(BLOCKED_MODULE)
}

/// Multiplier from `uatom` to 18-decimal VM units.
pub fn scale() -> U256 {
    U256::from(10u64).pow(U256::from(18 - DECIMALS))
}

pub fn vm(amount: u64) -> U256 {
    U256::from(amount) * scale()
}

// ── Toy bank ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankOp {
    Send,
    BalanceOf,
}

impl MethodId for BankOp {
    const ALL: &'static [Self] = &[BankOp::Send, BankOp::BalanceOf];

    fn name(&self) -> &'static str {
        match self {
            BankOp::Send => "send",
            BankOp::BalanceOf => "balanceOf",
        }
    }
}

/// Ledger key of an account's native balance.
pub fn balance_key(account: &Address) -> Vec<u8> {
    let mut key = b"balance/".to_vec();
    key.extend_from_slice(account.as_slice());
    key
}

/// Bank handler keeping native balances in the ledger store and emitting
/// bank events for every transfer.
pub struct Bank {
    schema: BoundSchema<BankOp>,
}

impl Bank {
    pub fn new() -> Self {
        Self::with_abi(BANK_ABI)
    }

    pub fn with_abi(abi: &str) -> Self {
        Self {
            schema: BoundSchema::from_json(abi).unwrap(),
        }
    }

    fn read_balance(ctx: &mut NativeContext<'_>, account: &Address) -> Result<U256, BridgeError> {
        Ok(ctx
            .get(&balance_key(account))?
            .map(|bytes| U256::from_be_slice(&bytes))
            .unwrap_or(U256::ZERO))
    }

    fn write_balance(
        ctx: &mut NativeContext<'_>,
        account: &Address,
        amount: U256,
    ) -> Result<(), BridgeError> {
        ctx.set(&balance_key(account), &amount.to_be_bytes::<32>())
    }
}

impl NativeHandler for Bank {
    type Method = BankOp;

    fn schema(&self) -> &BoundSchema<BankOp> {
        &self.schema
    }

    fn execute(
        &self,
        ctx: &mut NativeContext<'_>,
        call: &DispatchedCall<'_, BankOp>,
    ) -> Result<Vec<u8>, BridgeError> {
        match call.op {
            Some(BankOp::Send) => {
                let to = call.args[0].as_address().ok_or_else(|| anyhow::anyhow!("bad recipient"))?;
                let (amount, _) = call.args[1].as_uint().ok_or_else(|| anyhow::anyhow!("bad amount"))?;
                let from = ctx.caller();

                let from_balance = Self::read_balance(ctx, &from)?;
                if from_balance < amount {
                    return Err(anyhow::anyhow!("insufficient funds: {from_balance} < {amount}").into());
                }
                Self::write_balance(ctx, &from, from_balance - amount)?;
                let to_balance = Self::read_balance(ctx, &to)?;
                Self::write_balance(ctx, &to, to_balance + amount)?;

                let coins = format!("{amount}{DENOM}");
                ctx.emit_event(Event::coin_spent(&from, coins.clone()));
                ctx.emit_event(Event::coin_received(&to, coins));
                call.method.encode_output(&[DynSolValue::Bool(true)])
            }
            Some(BankOp::BalanceOf) => {
                let account = call.args[0].as_address().ok_or_else(|| anyhow::anyhow!("bad account"))?;
                let balance = Self::read_balance(ctx, &account)?;
                call.method.encode_output(&[DynSolValue::Uint(balance, 256)])
            }
            None => Ok(Vec::new()),
        }
    }
}

pub fn send_calldata(bank: &Bank, to: Address, amount: u64) -> Vec<u8> {
    bank.schema()
        .method(BankOp::Send)
        .unwrap()
        .encode_call(&[DynSolValue::Address(to), DynSolValue::Uint(U256::from(amount), 256)])
        .unwrap()
}

pub fn balance_of_calldata(bank: &Bank, account: Address) -> Vec<u8> {
    bank.schema()
        .method(BankOp::BalanceOf)
        .unwrap()
        .encode_call(&[DynSolValue::Address(account)])
        .unwrap()
}

// ── Bridge and ledger setup ──

pub fn bridge_config() -> BridgeConfig {
    BridgeConfig {
        coin: CoinInfo::new(DENOM, DECIMALS),
        ..BridgeConfig::default()
    }
}

pub fn asset_policy() -> Arc<StaticPolicy> {
    Arc::new(StaticPolicy::with_module_accounts(&[BLOCKED_MODULE]))
}

/// Bank precompile with balance replay enabled.
pub fn bank_precompile() -> Precompile {
    plain_precompile(BANK_ADDRESS).with_asset_policy(asset_policy())
}

/// Precompile at `address` without balance replay.
pub fn plain_precompile(address: Address) -> Precompile {
    Precompile::new(address, &bridge_config()).unwrap()
}

/// Ledger where each account holds `amount` uatom natively and the matching
/// 18-decimal balance in the VM.
pub fn funded_ledger(accounts: &[(Address, u64)]) -> MemLedger {
    let mut ledger = MemLedger::new();
    for (account, amount) in accounts {
        ledger
            .set(&balance_key(account), &U256::from(*amount).to_be_bytes::<32>())
            .unwrap();
        ledger.fund(*account, vm(*amount));
    }
    ledger.commit();
    ledger
}

/// Native balance as stored by the bank.
pub fn native_balance(ledger: &MemLedger, account: &Address) -> U256 {
    ledger
        .get(&balance_key(account))
        .unwrap()
        .map(|bytes| U256::from_be_slice(&bytes))
        .unwrap_or(U256::ZERO)
}

pub fn contract(caller: Address, input: Vec<u8>, value: U256, gas: u64) -> Contract {
    Contract::new(caller, BANK_ADDRESS, value, input, gas)
}

/// One VM call into `precompile`: enter a call frame, invoke, and unwind the
/// journal if the call reverted.
pub fn vm_call(
    precompile: &Precompile,
    bank: &Bank,
    journal: &mut dyn Journal,
    contract: &mut Contract,
    read_only: bool,
) -> CallOutcome {
    let checkpoint = journal.enter_call();
    let outcome = precompile.invoke(bank, journal, contract, read_only);
    journal.exit_call(checkpoint, outcome.is_success());
    outcome
}

/// Decode the text of an `Error(string)` revert payload.
pub fn revert_reason(outcome: &CallOutcome) -> String {
    use alloy_sol_types::{Revert, SolError};
    match outcome {
        CallOutcome::Reverted { payload, .. } => Revert::abi_decode(payload).unwrap().reason,
        CallOutcome::Success { .. } => panic!("call succeeded"),
    }
}
