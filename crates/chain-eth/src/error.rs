use thiserror::Error;

/// Ethereum encoding and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EthError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
