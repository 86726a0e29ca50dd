use chain_eth::error::EthError;
use thiserror::Error;

/// Failure kinds surfaced by the transaction context.
///
/// Wallet and contract failures keep their kind so a UI can react to a
/// rejected prompt differently from a dropped connection or a revert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    #[error("Request rejected by user: {0}")]
    UserRejected(String),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Contract reverted: {0}")]
    ContractReverted(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("A transaction submission is already in flight")]
    SubmissionInFlight,

    #[error("Confirmation timed out: {0}")]
    ConfirmationTimeout(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<EthError> for ContextError {
    fn from(e: EthError) -> Self {
        match e {
            EthError::DecodingError(_) | EthError::InvalidQuantity(_) => {
                ContextError::InvalidResponse(e.to_string())
            }
            EthError::InvalidAddress(_)
            | EthError::InvalidAmount(_)
            | EthError::TransactionBuildError(_) => ContextError::InvalidInput(e.to_string()),
        }
    }
}

impl From<std::io::Error> for ContextError {
    fn from(e: std::io::Error) -> Self {
        ContextError::Storage(e.to_string())
    }
}
