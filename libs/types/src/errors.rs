//! Error taxonomy for the exchange core
//!
//! Every operation on the core surfaces one of these variants to its caller.
//! Variants carry enough context to report the specific reason.

use thiserror::Error;

/// Top-level exchange error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Insufficient funds for wallet {wallet}: required {required}, available {available}")]
    InsufficientFunds {
        wallet: String,
        required: String,
        available: String,
    },

    #[error("Insufficient inventory of {coin} for {holder}: required {required}, available {available}")]
    InsufficientInventory {
        holder: String,
        coin: String,
        required: String,
        available: String,
    },

    #[error("Invalid order parameters: {reason}")]
    InvalidOrderParameters { reason: String },

    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    #[error("Unauthorized: wallet {wallet} does not own {resource}")]
    Unauthorized { wallet: String, resource: String },

    #[error("Chain integrity violated at block {block_number}: {reason}")]
    ChainIntegrity { block_number: u64, reason: String },

    #[error("Concurrency conflict on {resource}")]
    ConcurrencyConflict { resource: String },
}

impl ExchangeError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        ExchangeError::InvalidOrderParameters {
            reason: reason.into(),
        }
    }

    pub fn conflict(resource: impl Into<String>) -> Self {
        ExchangeError::ConcurrencyConflict {
            resource: resource.into(),
        }
    }

    /// Stable machine-readable code for logs and event payloads
    pub fn code(&self) -> &'static str {
        match self {
            ExchangeError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            ExchangeError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            ExchangeError::InvalidOrderParameters { .. } => "INVALID_ORDER_PARAMETERS",
            ExchangeError::OrderNotFound { .. } => "ORDER_NOT_FOUND",
            ExchangeError::Unauthorized { .. } => "UNAUTHORIZED",
            ExchangeError::ChainIntegrity { .. } => "CHAIN_INTEGRITY",
            ExchangeError::ConcurrencyConflict { .. } => "CONCURRENCY_CONFLICT",
        }
    }
}

/// Result alias used across the core
pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_order_display() {
        let err = ExchangeError::invalid("quantity must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid order parameters: quantity must be positive"
        );
    }

    #[test]
    fn test_insufficient_funds_display() {
        let err = ExchangeError::InsufficientFunds {
            wallet: "w1".to_string(),
            required: "105".to_string(),
            available: "100".to_string(),
        };
        assert!(err.to_string().contains("105"));
        assert!(err.to_string().contains("w1"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ExchangeError::conflict("book:GLD").code(), "CONCURRENCY_CONFLICT");
        assert_eq!(
            ExchangeError::OrderNotFound { order_id: "x".into() }.code(),
            "ORDER_NOT_FOUND"
        );
    }
}
