use rift_ledger::LedgerError;
use rift_store::StoreError;
use thiserror::Error;

/// Errors raised by the settlement primitive
#[derive(Error, Debug)]
pub enum SettlementError {
    /// Gross or post-fee amount rounds to zero base units; never retried
    #[error("Settlement amount too small")]
    AmountTooSmall,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors raised while processing one unit of batch work.
///
/// The engines swallow these per campaign or per creator: a failure is
/// recorded in the run report and the batch moves on, so one bad campaign
/// never blocks payouts to the others.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
