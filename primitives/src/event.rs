//! Ledger events.
//!
//! The asset module records every balance movement as an event in the
//! ledger's event log. The balance handler replays three of these event types
//! into VM balances; everything else in the log is opaque to the bridge.

use core::fmt;

use crate::types::Address;

/// Bank debit: `spender` paid `amount`.
pub const EVENT_TYPE_COIN_SPENT: &str = "coin_spent";
/// Bank credit: `receiver` was paid `amount`.
pub const EVENT_TYPE_COIN_RECEIVED: &str = "coin_received";
/// Precision-compensation change of `address` by signed `delta`.
pub const EVENT_TYPE_FRACTIONAL_BALANCE_CHANGE: &str = "fractional_balance_change";

pub const ATTRIBUTE_KEY_SPENDER: &str = "spender";
pub const ATTRIBUTE_KEY_RECEIVER: &str = "receiver";
pub const ATTRIBUTE_KEY_AMOUNT: &str = "amount";
pub const ATTRIBUTE_KEY_ADDRESS: &str = "address";
pub const ATTRIBUTE_KEY_DELTA: &str = "delta";

/// A single key-value attribute within an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

/// An event recorded in the ledger's event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: String,
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    /// Create an event with no attributes.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute, builder style.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(EventAttribute {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Value of the first attribute named `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }

    /// `coin_spent` event for `spender` paying `coins` (a coin list string).
    pub fn coin_spent(spender: &Address, coins: impl Into<String>) -> Self {
        Self::new(EVENT_TYPE_COIN_SPENT)
            .with_attribute(ATTRIBUTE_KEY_SPENDER, spender.to_string())
            .with_attribute(ATTRIBUTE_KEY_AMOUNT, coins)
    }

    /// `coin_received` event for `receiver` being paid `coins`.
    pub fn coin_received(receiver: &Address, coins: impl Into<String>) -> Self {
        Self::new(EVENT_TYPE_COIN_RECEIVED)
            .with_attribute(ATTRIBUTE_KEY_RECEIVER, receiver.to_string())
            .with_attribute(ATTRIBUTE_KEY_AMOUNT, coins)
    }

    /// `fractional_balance_change` event; `delta` is a signed integer string.
    pub fn fractional_balance_change(account: &Address, delta: impl Into<String>) -> Self {
        Self::new(EVENT_TYPE_FRACTIONAL_BALANCE_CHANGE)
            .with_attribute(ATTRIBUTE_KEY_ADDRESS, account.to_string())
            .with_attribute(ATTRIBUTE_KEY_DELTA, delta)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_type)?;
        for attr in &self.attributes {
            write!(f, " {}={}", attr.key, attr.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_event_with_attributes() {
        let event = Event::new("transfer")
            .with_attribute("from", "alice")
            .with_attribute("to", "bob");
        assert_eq!(event.attributes.len(), 2);
        assert_eq!(event.attribute("to"), Some("bob"));
        assert_eq!(event.attribute("memo"), None);
    }

    #[test]
    fn test_first_attribute_wins() {
        let event = Event::new("x").with_attribute("k", "1").with_attribute("k", "2");
        assert_eq!(event.attribute("k"), Some("1"));
    }

    #[test]
    fn test_bank_event_builders() {
        let acct = address!("0x2222222222222222222222222222222222222222");
        let spent = Event::coin_spent(&acct, "3uatom");
        assert_eq!(spent.event_type, EVENT_TYPE_COIN_SPENT);
        assert_eq!(spent.attribute(ATTRIBUTE_KEY_AMOUNT), Some("3uatom"));
        let spender = spent.attribute(ATTRIBUTE_KEY_SPENDER).unwrap();
        assert_eq!(spender.parse::<Address>().unwrap(), acct);

        let received = Event::coin_received(&acct, "3uatom");
        assert_eq!(received.event_type, EVENT_TYPE_COIN_RECEIVED);
        assert!(received.attribute(ATTRIBUTE_KEY_RECEIVER).is_some());

        let frac = Event::fractional_balance_change(&acct, "-42");
        assert_eq!(frac.attribute(ATTRIBUTE_KEY_DELTA), Some("-42"));
    }

    #[test]
    fn test_event_display() {
        let event = Event::new("burn").with_attribute("amount", "5uatom");
        assert_eq!(event.to_string(), "burn amount=5uatom");
    }
}
