use thiserror::Error;

/// Errors that can occur when talking to the ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Ledger request timed out: {0}")]
    Timeout(String),

    #[error("Ledger rejected the request: {0}")]
    Rejected(String),

    #[error("Transfer amount must be greater than zero")]
    ZeroAmount,

    #[error("Ledger is not configured: {0}")]
    NotConfigured(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
