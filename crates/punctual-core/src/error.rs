//! Error types for punctual-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Fixed-point overflow: {0}")]
    ScaleOverflow(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Decimal error: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Pre-flight validation failures.
///
/// Raised before any network call is attempted and shown to the user as a
/// notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Price not available. Please wait...")]
    PriceUnavailable,

    #[error("No active position to close")]
    NoOpenPosition,

    #[error("Invalid margin: {0}")]
    InvalidMargin(String),

    #[error("Leverage {value}x outside allowed range {min}x-{max}x")]
    LeverageOutOfRange { value: u32, min: u32, max: u32 },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
