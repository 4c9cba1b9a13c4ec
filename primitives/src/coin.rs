//! Coin parsing and 18-decimal normalisation.
//!
//! Ledger amounts are coin lists such as `"1500uatom,3stake"`, expressed at
//! the chain's native precision. VM balances are always 18-decimal integers,
//! so every amount replayed into the VM is scaled by `10^(18 - decimals)`.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoinError;
use crate::types::{U256, VM_DECIMALS};

/// A single denomination and integer amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: U256,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: U256) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// The ledger denomination that backs VM balances, and its precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinInfo {
    pub denom: String,
    pub decimals: u8,
}

impl Default for CoinInfo {
    fn default() -> Self {
        Self {
            denom: "aatom".into(),
            decimals: VM_DECIMALS,
        }
    }
}

impl CoinInfo {
    pub fn new(denom: impl Into<String>, decimals: u8) -> Self {
        Self {
            denom: denom.into(),
            decimals,
        }
    }

    /// Check the denomination is well formed and the precision is at most 18.
    pub fn validate(&self) -> Result<(), CoinError> {
        validate_denom(&self.denom)?;
        if self.decimals > VM_DECIMALS {
            return Err(CoinError::UnsupportedDecimals(self.decimals));
        }
        Ok(())
    }

    /// Multiplier taking a native amount to 18 decimals.
    pub fn conversion_factor(&self) -> Result<U256, CoinError> {
        if self.decimals > VM_DECIMALS {
            return Err(CoinError::UnsupportedDecimals(self.decimals));
        }
        let exponent = u64::from(VM_DECIMALS - self.decimals);
        Ok(U256::from(10u64).pow(U256::from(exponent)))
    }

    /// Scale a native amount of this coin to 18-decimal VM units.
    pub fn to_vm_amount(&self, amount: U256) -> Result<U256, CoinError> {
        amount
            .checked_mul(self.conversion_factor()?)
            .ok_or_else(|| CoinError::Overflow(amount.to_string()))
    }

    /// Amount of this coin in a coin list string, scaled to 18 decimals.
    ///
    /// A list that does not mention the denomination yields zero.
    pub fn vm_amount_of(&self, coins: &str) -> Result<U256, CoinError> {
        let parsed = parse_coins(coins)?;
        self.to_vm_amount(amount_of(&parsed, &self.denom))
    }
}

/// Check a denomination against `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`.
pub fn validate_denom(denom: &str) -> Result<(), CoinError> {
    let bytes = denom.as_bytes();
    let valid_len = (3..=128).contains(&bytes.len());
    let valid_head = bytes.first().is_some_and(|b| b.is_ascii_alphabetic());
    let valid_tail = bytes
        .iter()
        .skip(1)
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'));
    if valid_len && valid_head && valid_tail {
        Ok(())
    } else {
        Err(CoinError::InvalidDenom(denom.to_string()))
    }
}

/// Parse one `"<integer><denom>"` expression. Whitespace between the two is allowed.
pub fn parse_coin(expr: &str) -> Result<Coin, CoinError> {
    let expr = expr.trim();
    let split = expr
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| CoinError::InvalidCoin(expr.to_string()))?;
    let (digits, denom) = expr.split_at(split);
    if digits.is_empty() {
        return Err(CoinError::InvalidCoin(expr.to_string()));
    }
    let denom = denom.trim_start();
    validate_denom(denom)?;
    let amount = parse_amount(digits)?;
    Ok(Coin::new(denom, amount))
}

/// Parse a comma-separated coin list. Zero amounts are dropped and the result
/// is sorted by denomination; an empty string is an empty list.
pub fn parse_coins(list: &str) -> Result<Vec<Coin>, CoinError> {
    let list = list.trim();
    if list.is_empty() {
        return Ok(Vec::new());
    }
    let mut coins = Vec::new();
    for expr in list.split(',') {
        let coin = parse_coin(expr)?;
        if coin.amount.is_zero() {
            continue;
        }
        coins.push(coin);
    }
    coins.sort_by(|a, b| a.denom.cmp(&b.denom));
    for pair in coins.windows(2) {
        if pair[0].denom == pair[1].denom {
            return Err(CoinError::DuplicateDenom(pair[0].denom.clone()));
        }
    }
    Ok(coins)
}

/// Amount of `denom` in a parsed coin list, zero if absent.
pub fn amount_of(coins: &[Coin], denom: &str) -> U256 {
    coins
        .iter()
        .find(|coin| coin.denom == denom)
        .map(|coin| coin.amount)
        .unwrap_or(U256::ZERO)
}

/// Parse an unsigned decimal integer.
pub fn parse_amount(digits: &str) -> Result<U256, CoinError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoinError::InvalidAmount(digits.to_string()));
    }
    U256::from_str_radix(digits, 10).map_err(|_| CoinError::InvalidAmount(digits.to_string()))
}

/// Parse a signed decimal integer such as `"-42"` or `"+7"` into a sign flag
/// (true when negative) and magnitude.
pub fn parse_signed_amount(value: &str) -> Result<(bool, U256), CoinError> {
    let value = value.trim();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let magnitude = parse_amount(digits).map_err(|_| CoinError::InvalidAmount(value.to_string()))?;
    Ok((negative, magnitude))
}
