//! Replays ledger balance events into VM account balances.
//!
//! A native action moves coins through the asset module, which records each
//! movement as a ledger event. The VM keeps its own balance table, so after
//! the action the handler walks the events it produced and applies the same
//! movements to VM balances, scaled to 18 decimals.
//!
//! The lifecycle is enforced by types: [`BalanceHandler::arm`] consumes the
//! fresh handler and records the event watermark, and
//! [`ArmedBalanceHandler::reconcile`] consumes the armed one.

use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;

use tessera_ledger::{AssetPolicy, Journal};
use tessera_primitives::coin::parse_signed_amount;
use tessera_primitives::event::{
    ATTRIBUTE_KEY_ADDRESS, ATTRIBUTE_KEY_AMOUNT, ATTRIBUTE_KEY_DELTA, ATTRIBUTE_KEY_RECEIVER,
    ATTRIBUTE_KEY_SPENDER, EVENT_TYPE_COIN_RECEIVED, EVENT_TYPE_COIN_SPENT,
    EVENT_TYPE_FRACTIONAL_BALANCE_CHANGE,
};
use tessera_primitives::{Address, BalanceChangeReason, BalanceDelta, CoinInfo, Event, U256};
use tracing::{debug, trace};

use crate::error::ReconcileError;

/// Long-lived source of per-call balance handlers.
#[derive(Clone)]
pub struct BalanceHandlerFactory {
    policy: Arc<dyn AssetPolicy>,
    coin: CoinInfo,
}

impl BalanceHandlerFactory {
    pub fn new(policy: Arc<dyn AssetPolicy>, coin: CoinInfo) -> Self {
        Self { policy, coin }
    }

    pub fn coin(&self) -> &CoinInfo {
        &self.coin
    }

    /// A fresh, unarmed handler for one call.
    pub fn new_handler(&self) -> BalanceHandler {
        BalanceHandler {
            policy: Arc::clone(&self.policy),
            coin: self.coin.clone(),
        }
    }
}

impl std::fmt::Debug for BalanceHandlerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceHandlerFactory")
            .field("coin", &self.coin)
            .finish_non_exhaustive()
    }
}

/// Handler that has not yet seen the event log.
pub struct BalanceHandler {
    policy: Arc<dyn AssetPolicy>,
    coin: CoinInfo,
}

impl BalanceHandler {
    /// Record the current event-log length. Only events emitted after this
    /// point are replayed.
    pub fn arm(self, journal: &dyn Journal) -> ArmedBalanceHandler {
        ArmedBalanceHandler {
            policy: self.policy,
            coin: self.coin,
            watermark: journal.event_count(),
        }
    }
}

/// Handler holding its watermark, ready to reconcile once.
pub struct ArmedBalanceHandler {
    policy: Arc<dyn AssetPolicy>,
    coin: CoinInfo,
    watermark: usize,
}

/// A balance change parsed from one event, before it is applied.
struct Replay {
    delta: BalanceDelta,
    reason: BalanceChangeReason,
}

impl ArmedBalanceHandler {
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Apply every balance event emitted since [`BalanceHandler::arm`], in
    /// emission order. Returns the number of mutations applied.
    pub fn reconcile(self, journal: &mut dyn Journal) -> Result<usize, ReconcileError> {
        self.reconcile_skipping(journal, &[])
    }

    /// [`reconcile`](Self::reconcile), leaving out events whose index falls in
    /// `skip`. Those belong to nested calls that replayed them already.
    pub fn reconcile_skipping(
        self,
        journal: &mut dyn Journal,
        skip: &[Range<usize>],
    ) -> Result<usize, ReconcileError> {
        let end = journal.event_count();
        let mut applied = 0;
        for index in self.watermark..end {
            if skip.iter().any(|range| range.contains(&index)) {
                continue;
            }
            let replay = match journal.events().get(index) {
                Some(event) => self.parse(event)?,
                None => None,
            };
            let Some(replay) = replay else {
                continue;
            };
            if replay.delta.is_zero() {
                continue;
            }
            journal
                .apply_balance_delta(&replay.delta, replay.reason)
                .map_err(ReconcileError::Apply)?;
            trace!(delta = %replay.delta, reason = %replay.reason, "balance handler: replayed event");
            applied += 1;
        }
        debug!(
            watermark = self.watermark,
            scanned = end.saturating_sub(self.watermark),
            applied,
            "balance handler: reconciled"
        );
        Ok(applied)
    }

    fn parse(&self, event: &Event) -> Result<Option<Replay>, ReconcileError> {
        match event.event_type.as_str() {
            EVENT_TYPE_COIN_SPENT => {
                let spender = self.account(event, ATTRIBUTE_KEY_SPENDER)?;
                if self.skip_blocked(event, &spender) {
                    return Ok(None);
                }
                let amount = self.vm_amount(event)?;
                Ok(Some(Replay {
                    delta: BalanceDelta::debit(spender, amount),
                    reason: BalanceChangeReason::Unspecified,
                }))
            }
            EVENT_TYPE_COIN_RECEIVED => {
                let receiver = self.account(event, ATTRIBUTE_KEY_RECEIVER)?;
                if self.skip_blocked(event, &receiver) {
                    return Ok(None);
                }
                let amount = self.vm_amount(event)?;
                Ok(Some(Replay {
                    delta: BalanceDelta::credit(receiver, amount),
                    reason: BalanceChangeReason::Unspecified,
                }))
            }
            EVENT_TYPE_FRACTIONAL_BALANCE_CHANGE => {
                let account = self.account(event, ATTRIBUTE_KEY_ADDRESS)?;
                if self.skip_blocked(event, &account) {
                    return Ok(None);
                }
                // Already 18-decimal; not scaled.
                let (negative, magnitude) =
                    parse_signed_amount(required(event, ATTRIBUTE_KEY_DELTA)?)?;
                let delta = if negative {
                    BalanceDelta::debit(account, magnitude)
                } else {
                    BalanceDelta::credit(account, magnitude)
                };
                Ok(Some(Replay {
                    delta,
                    reason: BalanceChangeReason::FractionalAdjustment,
                }))
            }
            _ => Ok(None),
        }
    }

    fn account(&self, event: &Event, key: &'static str) -> Result<Address, ReconcileError> {
        let value = required(event, key)?;
        Address::from_str(value).map_err(|e| ReconcileError::InvalidAddress {
            value: value.to_string(),
            reason: e.to_string(),
        })
    }

    fn vm_amount(&self, event: &Event) -> Result<U256, ReconcileError> {
        Ok(self.coin.vm_amount_of(required(event, ATTRIBUTE_KEY_AMOUNT)?)?)
    }

    fn skip_blocked(&self, event: &Event, account: &Address) -> bool {
        let blocked = self.policy.is_blocked(account);
        if blocked {
            debug!(event_type = %event.event_type, %account, "balance handler: blocked account skipped");
        }
        blocked
    }
}

fn required<'e>(event: &'e Event, key: &'static str) -> Result<&'e str, ReconcileError> {
    event
        .attribute(key)
        .ok_or_else(|| ReconcileError::MissingAttribute {
            event_type: event.event_type.clone(),
            key,
        })
}
