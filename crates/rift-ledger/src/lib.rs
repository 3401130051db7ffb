use async_trait::async_trait;

pub mod errors;
pub mod http;
pub mod memory;

pub use errors::{LedgerError, LedgerResult};
pub use http::HttpLedger;
pub use memory::MemoryLedger;

/// Interface to the external token ledger.
///
/// Implementations must not block indefinitely: every call carries an
/// explicit timeout and fails fast rather than hanging a settlement batch.
/// A timeout after broadcast is reported as `LedgerError::Timeout` and the
/// caller must not re-send (double-pay risk).
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Transfer tokens from the platform wallet, returning the confirmed
    /// transaction id
    async fn transfer(&self, to: &str, amount_base_units: u64, memo: &str)
        -> LedgerResult<String>;

    /// Invoke a method on the on-chain settlement program
    async fn call_program(
        &self,
        method: &str,
        args: Vec<Vec<u8>>,
        accounts: Vec<String>,
    ) -> LedgerResult<String>;

    /// Token balance of an address, in base units
    async fn balance(&self, address: &str) -> LedgerResult<u64>;
}
