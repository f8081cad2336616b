//! Trade desk: pre-flight checks, submission and user notifications.

use punctual_contract::{PerpContract, TransactionError, Wallet, B256};
use punctual_core::{Direction, OpenOrder, Position, ValidationError};
use punctual_telemetry::Metrics;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// Message shown to the user after a trade action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    /// Set when a transaction was broadcast.
    pub tx_hash: Option<B256>,
}

impl Notification {
    pub fn success(message: impl Into<String>, tx_hash: B256) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
            tx_hash: Some(tx_hash),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NotificationKind::Success
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.tx_hash) {
            (NotificationKind::Success, Some(hash)) => write!(f, "{} ({hash})", self.message),
            (NotificationKind::Success, None) => write!(f, "{}", self.message),
            (NotificationKind::Error, _) => write!(f, "Error: {}", self.message),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Open,
    Close,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }

    fn failure_message(self, error: &TransactionError) -> String {
        match error {
            TransactionError::RejectedByUser | TransactionError::InsufficientFunds => {
                error.to_string()
            }
            other => match self {
                Self::Open => format!("Failed to open position: {other}"),
                Self::Close => format!("Failed to close position: {other}"),
            },
        }
    }
}

/// Validates trade actions locally, submits them, and reports the outcome
/// as a `Notification`. Never returns an error.
pub struct TradeDesk<W> {
    contract: Arc<PerpContract<W>>,
}

impl<W: Wallet> TradeDesk<W> {
    pub fn new(contract: Arc<PerpContract<W>>) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &Arc<PerpContract<W>> {
        &self.contract
    }

    fn preflight(&self, current_price: Option<f64>) -> Result<f64, ValidationError> {
        if self.contract.wallet().account().is_none() {
            return Err(ValidationError::WalletNotConnected);
        }
        match current_price {
            Some(price) if price.is_finite() && price > 0.0 => Ok(price),
            _ => Err(ValidationError::PriceUnavailable),
        }
    }

    /// Open a position from raw form input.
    pub async fn open(
        &self,
        margin: &str,
        leverage: u32,
        direction: Direction,
        current_price: Option<f64>,
    ) -> Notification {
        let checked = self.preflight(current_price).and_then(|price| {
            OpenOrder::parse(margin, leverage, direction).map(|order| (order, price))
        });
        let (order, price) = match checked {
            Ok(v) => v,
            Err(e) => return self.rejected(Action::Open, e),
        };

        match self.contract.open_position(&order, price).await {
            Ok(hash) => {
                Metrics::transaction(Action::Open.as_str(), "sent");
                let message = match order.direction {
                    Direction::Long => "Long position opened successfully!",
                    Direction::Short => "Short position opened successfully!",
                };
                info!(%hash, direction = %order.direction, price, "Position opened");
                Notification::success(message, hash)
            }
            Err(e) => self.failed(Action::Open, &e),
        }
    }

    /// Close the open position.
    pub async fn close(
        &self,
        position: Option<&Position>,
        current_price: Option<f64>,
    ) -> Notification {
        let price = match self.preflight(current_price) {
            Ok(price) => price,
            Err(e) => return self.rejected(Action::Close, e),
        };
        if !position.is_some_and(Position::is_open) {
            return self.rejected(Action::Close, ValidationError::NoOpenPosition);
        }

        match self.contract.close_position(price).await {
            Ok(hash) => {
                Metrics::transaction(Action::Close.as_str(), "sent");
                info!(%hash, price, "Position close sent");
                Notification::success("Position close transaction sent!", hash)
            }
            Err(e) => self.failed(Action::Close, &e),
        }
    }

    fn rejected(&self, action: Action, error: ValidationError) -> Notification {
        Metrics::transaction(action.as_str(), "invalid");
        warn!(action = action.as_str(), %error, "Trade rejected before submission");
        Notification::error(error.to_string())
    }

    fn failed(&self, action: Action, error: &punctual_contract::ContractError) -> Notification {
        let classified = TransactionError::classify(error);
        Metrics::transaction(action.as_str(), classified.outcome());
        warn!(action = action.as_str(), %error, "Transaction failed");
        Notification::error(action.failure_message(&classified))
    }
}
