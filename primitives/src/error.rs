//! Error types for gas metering and coin handling.

/// Ledger-side gas meter failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GasError {
    /// The charge would push consumption past the meter's limit.
    #[error("out of gas in location: {descriptor}; limit: {limit}, attempted: {attempted}")]
    OutOfGas {
        descriptor: &'static str,
        limit: u64,
        attempted: u64,
    },

    /// The charge overflowed a u64.
    #[error("gas overflow in location: {descriptor}")]
    Overflow { descriptor: &'static str },
}

impl GasError {
    /// Location label of the charge that failed.
    pub fn descriptor(&self) -> &'static str {
        match self {
            Self::OutOfGas { descriptor, .. } | Self::Overflow { descriptor } => descriptor,
        }
    }
}

/// Coin string or amount parsing failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoinError {
    #[error("invalid coin expression: {0:?}")]
    InvalidCoin(String),

    #[error("invalid denomination: {0:?}")]
    InvalidDenom(String),

    #[error("invalid integer amount: {0:?}")]
    InvalidAmount(String),

    #[error("duplicate denomination: {0}")]
    DuplicateDenom(String),

    #[error("unsupported decimals {0}, must be at most 18")]
    UnsupportedDecimals(u8),

    #[error("amount overflows 256 bits after scaling: {0}")]
    Overflow(String),
}
