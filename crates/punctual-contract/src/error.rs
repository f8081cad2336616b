//! Contract and wallet error types.

use punctual_core::{CoreError, ValidationError};
use thiserror::Error;

/// JSON-RPC code a wallet returns when the user declines a request.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("ABI decode error: {0}")]
    Decode(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ContractError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<alloy::sol_types::Error> for ContractError {
    fn from(e: alloy::sol_types::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

pub type ContractResult<T> = Result<T, ContractError>;

/// Why a wallet transaction failed, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("Transaction rejected by user")]
    RejectedByUser,

    #[error("Insufficient funds for gas")]
    InsufficientFunds,

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("{0}")]
    Failed(String),
}

impl TransactionError {
    /// Classify a wallet/contract failure.
    ///
    /// Code 4001 or "User rejected" means the user declined; otherwise the
    /// message is matched for "insufficient" then "revert".
    pub fn classify(error: &ContractError) -> Self {
        if let ContractError::Rpc { code, .. } = error {
            if *code == USER_REJECTED_CODE {
                return Self::RejectedByUser;
            }
        }

        let message = match error {
            ContractError::Rpc { message, .. } => message.clone(),
            other => other.to_string(),
        };
        let lower = message.to_lowercase();

        if lower.contains("user rejected") {
            Self::RejectedByUser
        } else if lower.contains("insufficient") {
            Self::InsufficientFunds
        } else if lower.contains("revert") {
            Self::Reverted(message)
        } else {
            Self::Failed(message)
        }
    }

    /// Metrics label.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::RejectedByUser => "rejected",
            Self::InsufficientFunds => "insufficient_funds",
            Self::Reverted(_) => "reverted",
            Self::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(code: i64, message: &str) -> ContractError {
        ContractError::Rpc {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_code_4001_is_rejection() {
        assert_eq!(
            TransactionError::classify(&rpc(4001, "whatever")),
            TransactionError::RejectedByUser
        );
    }

    #[test]
    fn test_message_classification() {
        assert_eq!(
            TransactionError::classify(&rpc(-32000, "User rejected the request.")),
            TransactionError::RejectedByUser
        );
        assert_eq!(
            TransactionError::classify(&rpc(-32000, "insufficient funds for gas * price + value")),
            TransactionError::InsufficientFunds
        );
        assert_eq!(
            TransactionError::classify(&rpc(3, "execution reverted: no position")),
            TransactionError::Reverted("execution reverted: no position".to_string())
        );
        assert_eq!(
            TransactionError::classify(&rpc(-32603, "internal error")),
            TransactionError::Failed("internal error".to_string())
        );
    }

    #[test]
    fn test_transport_failures_are_failed() {
        let err = ContractError::Transport("connection refused".to_string());
        assert!(matches!(
            TransactionError::classify(&err),
            TransactionError::Failed(msg) if msg.contains("connection refused")
        ));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            TransactionError::RejectedByUser.to_string(),
            "Transaction rejected by user"
        );
        assert_eq!(
            TransactionError::InsufficientFunds.to_string(),
            "Insufficient funds for gas"
        );
        assert_eq!(TransactionError::InsufficientFunds.outcome(), "insufficient_funds");
    }
}
