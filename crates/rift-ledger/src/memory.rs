use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tracing::debug;
use uuid::Uuid;

use crate::{LedgerClient, LedgerError, LedgerResult};

/// A record of one transfer submitted through the in-memory ledger
#[derive(Debug, Clone)]
pub struct RecordedTransfer {
    /// Transaction id assigned at submission
    pub tx_id: String,

    /// Destination address
    pub to: String,

    /// Amount in base units
    pub amount_base_units: u64,

    /// Memo attached to the transfer
    pub memo: String,

    /// Timestamp of the submission
    pub timestamp: DateTime<Utc>,
}

/// A record of one settlement-program invocation
#[derive(Debug, Clone)]
pub struct RecordedProgramCall {
    /// Transaction id assigned at submission
    pub tx_id: String,

    /// Program method name
    pub method: String,

    /// Raw method arguments
    pub args: Vec<Vec<u8>>,

    /// Accounts referenced by the call
    pub accounts: Vec<String>,
}

/// How a scripted failure should present itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Unavailable,
    Timeout,
}

/// Simple in-memory ledger for testing and development.
///
/// Records every transfer and program call, tracks credited balances, and
/// can be scripted to fail for specific destination addresses.
pub struct MemoryLedger {
    transfers: Arc<Mutex<Vec<RecordedTransfer>>>,
    program_calls: Arc<Mutex<Vec<RecordedProgramCall>>>,
    balances: Arc<Mutex<HashMap<String, u64>>>,
    failures: Arc<Mutex<HashMap<String, FailureMode>>>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// Create an empty in-memory ledger
    pub fn new() -> Self {
        Self {
            transfers: Arc::new(Mutex::new(Vec::new())),
            program_calls: Arc::new(Mutex::new(Vec::new())),
            balances: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Script calls touching `address` to fail with the given mode
    pub fn fail_address(&self, address: &str, mode: FailureMode) {
        self.failures
            .lock()
            .unwrap()
            .insert(address.to_string(), mode);
    }

    /// All transfers submitted so far
    pub fn transfers(&self) -> Vec<RecordedTransfer> {
        self.transfers.lock().unwrap().clone()
    }

    /// All program calls submitted so far
    pub fn program_calls(&self) -> Vec<RecordedProgramCall> {
        self.program_calls.lock().unwrap().clone()
    }

    fn check_failure(&self, address: &str) -> LedgerResult<()> {
        match self.failures.lock().unwrap().get(address) {
            Some(FailureMode::Unavailable) => Err(LedgerError::Unavailable(format!(
                "scripted failure for {}",
                address
            ))),
            Some(FailureMode::Timeout) => Err(LedgerError::Timeout(format!(
                "scripted timeout for {}",
                address
            ))),
            None => Ok(()),
        }
    }

    fn generate_tx_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn transfer(
        &self,
        to: &str,
        amount_base_units: u64,
        memo: &str,
    ) -> LedgerResult<String> {
        if amount_base_units == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        self.check_failure(to)?;

        let tx_id = Self::generate_tx_id();
        self.transfers.lock().unwrap().push(RecordedTransfer {
            tx_id: tx_id.clone(),
            to: to.to_string(),
            amount_base_units,
            memo: memo.to_string(),
            timestamp: Utc::now(),
        });
        *self
            .balances
            .lock()
            .unwrap()
            .entry(to.to_string())
            .or_insert(0) += amount_base_units;

        debug!(to, amount_base_units, memo, "Recorded in-memory transfer");
        Ok(tx_id)
    }

    async fn call_program(
        &self,
        method: &str,
        args: Vec<Vec<u8>>,
        accounts: Vec<String>,
    ) -> LedgerResult<String> {
        for account in &accounts {
            self.check_failure(account)?;
        }

        let tx_id = Self::generate_tx_id();
        self.program_calls.lock().unwrap().push(RecordedProgramCall {
            tx_id: tx_id.clone(),
            method: method.to_string(),
            args,
            accounts,
        });
        Ok(tx_id)
    }

    async fn balance(&self, address: &str) -> LedgerResult<u64> {
        Ok(*self.balances.lock().unwrap().get(address).unwrap_or(&0))
    }
}
