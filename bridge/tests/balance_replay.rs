//! Balance replay tests: native coin movements become visible as VM balance
//! changes in the same transaction.

mod common;

use std::sync::Arc;

use tessera_bridge::{BridgeConfig, BridgeError, Precompile};
use tessera_ledger::{Journal, LedgerStore, MemLedger, StaticPolicy};
use tessera_primitives::{Address, BalanceChangeReason, BalanceDelta, Event, U256};

use common::*;

// ── Test: bank transfer through the VM ──

#[test]
fn test_send_updates_vm_balances() {
    let precompile = bank_precompile();
    let bank = Bank::new();
    let mut ledger = funded_ledger(&[(alice(), 100)]);

    let input = send_calldata(&bank, bob(), 3);
    let mut c = contract(alice(), input, U256::ZERO, 100_000);
    let outcome = vm_call(&precompile, &bank, &mut ledger, &mut c, false);
    assert!(outcome.is_success(), "{}", revert_reason(&outcome));

    assert_eq!(native_balance(&ledger, &alice()), U256::from(97u64));
    assert_eq!(native_balance(&ledger, &bob()), U256::from(3u64));
    assert_eq!(ledger.balance(&alice()), vm(97));
    assert_eq!(ledger.balance(&bob()), vm(3));
}

#[test]
fn test_later_calls_see_replayed_balances() {
    let precompile = bank_precompile();
    let bank = Bank::new();
    let mut ledger = funded_ledger(&[(alice(), 10)]);

    for (from, to) in [(alice(), bob()), (bob(), carol())] {
        let input = send_calldata(&bank, to, 4);
        let mut c = contract(from, input, U256::ZERO, 100_000);
        let outcome = vm_call(&precompile, &bank, &mut ledger, &mut c, false);
        assert!(outcome.is_success(), "{}", revert_reason(&outcome));
    }

    assert_eq!(ledger.balance(&alice()), vm(6));
    assert_eq!(ledger.balance(&bob()), U256::ZERO);
    assert_eq!(ledger.balance(&carol()), vm(4));
}

// ── Test: ordering ──

#[test]
fn test_replay_independent_of_event_order() {
    let precompile = bank_precompile();
    let orders: [[usize; 4]; 2] = [[0, 1, 2, 3], [2, 3, 0, 1]];
    let mut results = Vec::new();

    for order in orders {
        let mut ledger = funded_ledger(&[(alice(), 10), (bob(), 10)]);
        let events = [
            Event::coin_spent(&alice(), "3uatom"),
            Event::coin_spent(&bob(), "2uatom"),
            Event::coin_received(&carol(), "3uatom"),
            Event::coin_received(&carol(), "2uatom"),
        ];
        let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);
        precompile
            .run_native_action(&mut ledger, &mut c, |ctx| {
                for index in order {
                    ctx.emit_event(events[index].clone());
                }
                Ok(Vec::new())
            })
            .unwrap();
        results.push([
            ledger.balance(&alice()),
            ledger.balance(&bob()),
            ledger.balance(&carol()),
        ]);
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], [vm(7), vm(8), vm(5)]);
}

// ── Test: blocked accounts and malformed events ──

#[test]
fn test_blocked_account_never_mutated() {
    let precompile = bank_precompile();
    let mut ledger = funded_ledger(&[]);
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);

    precompile
        .run_native_action(&mut ledger, &mut c, |ctx| {
            ctx.emit_event(Event::coin_spent(&blocked_account(), "3uatom"));
            ctx.emit_event(Event::fractional_balance_change(&blocked_account(), "7"));
            Ok(Vec::new())
        })
        .unwrap();

    assert_eq!(ledger.balance(&blocked_account()), U256::ZERO);
}

#[test]
fn test_missing_amount_surfaces_as_revert() {
    let precompile = bank_precompile();
    let mut ledger = funded_ledger(&[]);
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);

    let err = precompile
        .run_native_action(&mut ledger, &mut c, |ctx| {
            ctx.emit_event(Event::new("coin_received").with_attribute("receiver", bob().to_string()));
            Ok(Vec::new())
        })
        .unwrap_err();

    assert!(matches!(err, BridgeError::EventReconciliation(_)));
    assert!(err.to_string().contains("amount"));
}

#[test]
fn test_fractional_adjustment_not_scaled() {
    let precompile = bank_precompile();
    let mut ledger = funded_ledger(&[(alice(), 1)]);
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);

    precompile
        .run_native_action(&mut ledger, &mut c, |ctx| {
            ctx.emit_event(Event::fractional_balance_change(&alice(), "-250"));
            ctx.emit_event(Event::fractional_balance_change(&bob(), "+250"));
            Ok(Vec::new())
        })
        .unwrap();

    assert_eq!(ledger.balance(&alice()), vm(1) - U256::from(250u64));
    assert_eq!(ledger.balance(&bob()), U256::from(250u64));
}

#[test]
fn test_no_handler_no_replay() {
    let precompile = plain_precompile(BANK_ADDRESS);
    let mut ledger = MemLedger::new();
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);

    precompile
        .run_native_action(&mut ledger, &mut c, |ctx| {
            ctx.emit_event(Event::coin_received(&bob(), "3uatom"));
            Ok(Vec::new())
        })
        .unwrap();

    assert_eq!(ledger.balance(&bob()), U256::ZERO);
    assert_eq!(ledger.event_count(), 1);
}

#[test]
fn test_eighteen_decimal_coin_unscaled() {
    let precompile = Precompile::new(BANK_ADDRESS, &BridgeConfig::default())
        .unwrap()
        .with_asset_policy(Arc::new(StaticPolicy::new()));
    let mut ledger = MemLedger::new();
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);

    precompile
        .run_native_action(&mut ledger, &mut c, |ctx| {
            ctx.emit_event(Event::coin_received(&bob(), "3aatom,9uatom"));
            Ok(Vec::new())
        })
        .unwrap();

    assert_eq!(ledger.balance(&bob()), U256::from(3u64));
}

// ── Test: dual-path exclusivity ──
//
// An action must move a given account's VM balance either through events or
// directly, never both: the handler cannot tell the two apart.

#[test]
fn test_event_path_and_direct_path_agree() {
    let precompile = bank_precompile();

    let mut by_event = MemLedger::new();
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);
    precompile
        .run_native_action(&mut by_event, &mut c, |ctx| {
            ctx.emit_event(Event::coin_received(&bob(), "3uatom"));
            Ok(Vec::new())
        })
        .unwrap();

    let mut direct = MemLedger::new();
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);
    plain_precompile(BANK_ADDRESS)
        .run_native_action(&mut direct, &mut c, |ctx| {
            ctx.apply_balance_delta(
                &BalanceDelta::credit(bob(), vm(3)),
                BalanceChangeReason::Unspecified,
            )?;
            Ok(Vec::new())
        })
        .unwrap();

    assert_eq!(by_event.balance(&bob()), vm(3));
    assert_eq!(direct.balance(&bob()), vm(3));
}

#[test]
fn test_mixing_paths_double_counts() {
    let precompile = bank_precompile();
    let mut ledger = MemLedger::new();
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);

    precompile
        .run_native_action(&mut ledger, &mut c, |ctx| {
            ctx.emit_event(Event::coin_received(&bob(), "3uatom"));
            ctx.apply_balance_delta(
                &BalanceDelta::credit(bob(), vm(3)),
                BalanceChangeReason::Unspecified,
            )?;
            Ok(Vec::new())
        })
        .unwrap();

    assert_eq!(ledger.balance(&bob()), vm(6));
}

// ── Test: nested calls ──

const STAKING_ADDRESS: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x08, 0x00,
]);

fn staking_contract(gas: u64) -> tessera_bridge::Contract {
    tessera_bridge::Contract::new(BANK_ADDRESS, STAKING_ADDRESS, U256::ZERO, Vec::new(), gas)
}

#[test]
fn test_nested_call_without_handler_replayed_by_caller() {
    let outer = bank_precompile();
    let inner = plain_precompile(STAKING_ADDRESS);
    let mut ledger = funded_ledger(&[(alice(), 10)]);
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);

    outer
        .run_native_action(&mut ledger, &mut c, |ctx| {
            let mut nested = staking_contract(50_000);
            ctx.call_nested(&inner, &mut nested, |inner_ctx| {
                inner_ctx.emit_event(Event::coin_spent(&alice(), "4uatom"));
                inner_ctx.emit_event(Event::coin_received(&bob(), "4uatom"));
                Ok(Vec::new())
            })?;
            assert!(ctx.replayed_events().is_empty());
            Ok(Vec::new())
        })
        .unwrap();

    assert_eq!(ledger.event_count(), 2);
    assert_eq!(ledger.balance(&alice()), vm(6));
    assert_eq!(ledger.balance(&bob()), vm(4));
}

#[test]
fn test_nested_writes_metered_and_events_replayed() {
    let outer = bank_precompile();
    let inner = plain_precompile(STAKING_ADDRESS);
    let mut ledger = funded_ledger(&[]);
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);
    let mut nested = staking_contract(200_000);

    outer
        .run_native_action(&mut ledger, &mut c, |ctx| {
            ctx.call_nested(&inner, &mut nested, |inner_ctx| {
                inner_ctx.set(b"big", &[0u8; 4096])?;
                inner_ctx.emit_event(Event::coin_received(&bob(), "3uatom"));
                Ok(Vec::new())
            })
        })
        .unwrap();

    assert_eq!(nested.gas, 200_000 - (2000 + 30 * (3 + 4096)));
    assert_eq!(ledger.get(b"big").unwrap(), Some(vec![0u8; 4096]));
    assert_eq!(ledger.balance(&bob()), vm(3));
}

#[test]
fn test_handler_below_handlerless_middle_replays_once() {
    let outer = bank_precompile();
    let middle = plain_precompile(STAKING_ADDRESS);
    let innermost = bank_precompile();
    let mut ledger = funded_ledger(&[(alice(), 10)]);
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);

    outer
        .run_native_action(&mut ledger, &mut c, |ctx| {
            let mut mid = staking_contract(50_000);
            ctx.call_nested(&middle, &mut mid, |middle_ctx| {
                middle_ctx.emit_event(Event::coin_spent(&alice(), "1uatom"));
                let mut leaf = contract(STAKING_ADDRESS, Vec::new(), U256::ZERO, 50_000);
                middle_ctx.call_nested(&innermost, &mut leaf, |leaf_ctx| {
                    leaf_ctx.emit_event(Event::coin_spent(&alice(), "2uatom"));
                    leaf_ctx.emit_event(Event::coin_received(&carol(), "2uatom"));
                    Ok(Vec::new())
                })?;
                middle_ctx.emit_event(Event::coin_received(&bob(), "1uatom"));
                Ok(Vec::new())
            })
        })
        .unwrap();

    assert_eq!(ledger.event_count(), 4);
    assert_eq!(ledger.balance(&alice()), vm(7));
    assert_eq!(ledger.balance(&bob()), vm(1));
    assert_eq!(ledger.balance(&carol()), vm(2));
}

#[test]
fn test_nested_bank_send_through_dispatch() {
    let outer = bank_precompile();
    let bank = Bank::new();
    let mut ledger = funded_ledger(&[(alice(), 10)]);
    let mut c = contract(alice(), Vec::new(), U256::ZERO, 100_000);

    outer
        .run_native_action(&mut ledger, &mut c, |ctx| {
            let input = send_calldata(&bank, bob(), 4);
            let mut nested = contract(alice(), input, U256::ZERO, 100_000);
            let outcome = ctx.invoke_nested(&bank_precompile(), &bank, &mut nested, false);
            assert!(outcome.is_success(), "{}", revert_reason(&outcome));
            Ok(Vec::new())
        })
        .unwrap();

    assert_eq!(native_balance(&ledger, &bob()), U256::from(4u64));
    assert_eq!(ledger.balance(&alice()), vm(6));
    assert_eq!(ledger.balance(&bob()), vm(4));
}
