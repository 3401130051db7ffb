use async_trait::async_trait;
use reqwest::Client;
use rift_types::RiftConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{LedgerClient, LedgerError, LedgerResult};

const API_TOKEN_HEADER: &str = "X-Ledger-API-Token";

#[derive(Serialize)]
struct TransferRequest<'a> {
    asset_id: u64,
    receiver: &'a str,
    amount: u64,
    note: &'a str,
}

#[derive(Serialize)]
struct ProgramCallRequest<'a> {
    method: &'a str,
    args: &'a [Vec<u8>],
    accounts: &'a [String],
    foreign_assets: Vec<u64>,
}

#[derive(Deserialize)]
struct SubmitResponse {
    tx_id: String,
}

#[derive(Deserialize)]
struct PendingResponse {
    confirmed_round: Option<u64>,
}

#[derive(Deserialize)]
struct BalanceResponse {
    amount: u64,
}

/// Ledger client backed by an HTTP gateway node.
///
/// Every request carries the configured timeout; a broadcast transaction is
/// polled for confirmation a small fixed number of rounds and then reported
/// as `LedgerError::Timeout` without re-sending.
pub struct HttpLedger {
    client: Client,
    base_url: String,
    api_token: String,
    asset_id: u64,
    app_id: u64,
    confirmation_rounds: u32,
}

impl HttpLedger {
    /// Build a client from platform configuration
    pub fn new(config: &RiftConfig) -> LedgerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ledger_timeout_seconds))
            .build()
            .map_err(|e| LedgerError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.ledger_address.trim_end_matches('/').to_string(),
            api_token: config.ledger_token.clone(),
            asset_id: config.asset_id,
            app_id: config.app_id,
            confirmation_rounds: config.ledger_confirmation_rounds,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_token.is_empty() {
            builder
        } else {
            builder.header(API_TOKEN_HEADER, &self.api_token)
        }
    }

    fn map_send_error(context: &str, error: reqwest::Error) -> LedgerError {
        if error.is_timeout() {
            LedgerError::Timeout(format!("{}: {}", context, error))
        } else {
            LedgerError::Unavailable(format!("{}: {}", context, error))
        }
    }

    async fn submit<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> LedgerResult<String> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .request(self.client.post(&url).json(body))
            .send()
            .await
            .map_err(|e| Self::map_send_error(path, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(LedgerError::Rejected(format!("{} ({}): {}", path, status, detail)));
        }

        let submitted: SubmitResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Unavailable(format!("{}: malformed response: {}", path, e)))?;

        self.wait_for_confirmation(&submitted.tx_id).await?;
        Ok(submitted.tx_id)
    }

    /// Poll the pending-transaction endpoint until the transaction confirms
    /// or the round budget runs out. On exhaustion the transaction may still
    /// land later, so the caller must treat this as fatal and never re-send.
    async fn wait_for_confirmation(&self, tx_id: &str) -> LedgerResult<()> {
        let url = format!("{}/v2/transactions/pending/{}", self.base_url, tx_id);
        for round in 0..self.confirmation_rounds {
            let response = self
                .request(self.client.get(&url))
                .send()
                .await
                .map_err(|e| Self::map_send_error("pending lookup", e))?;

            if response.status().is_success() {
                let pending: PendingResponse = response.json().await.map_err(|e| {
                    LedgerError::Unavailable(format!("pending lookup: malformed response: {}", e))
                })?;
                if pending.confirmed_round.is_some() {
                    debug!(tx_id, round, "Transaction confirmed");
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        warn!(tx_id, "Transaction still unconfirmed after polling budget");
        Err(LedgerError::Timeout(format!(
            "transaction {} unconfirmed after {} rounds",
            tx_id, self.confirmation_rounds
        )))
    }
}

#[async_trait]
impl LedgerClient for HttpLedger {
    async fn transfer(
        &self,
        to: &str,
        amount_base_units: u64,
        memo: &str,
    ) -> LedgerResult<String> {
        if self.asset_id == 0 {
            return Err(LedgerError::NotConfigured("asset id is not set".to_string()));
        }
        if amount_base_units == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let body = TransferRequest {
            asset_id: self.asset_id,
            receiver: to,
            amount: amount_base_units,
            note: memo,
        };
        let tx_id = self.submit("/v2/transfers", &body).await?;
        debug!(to, amount_base_units, %tx_id, "Submitted asset transfer");
        Ok(tx_id)
    }

    async fn call_program(
        &self,
        method: &str,
        args: Vec<Vec<u8>>,
        accounts: Vec<String>,
    ) -> LedgerResult<String> {
        if self.app_id == 0 {
            return Err(LedgerError::NotConfigured("application id is not set".to_string()));
        }
        if self.asset_id == 0 {
            return Err(LedgerError::NotConfigured("asset id is not set".to_string()));
        }

        let body = ProgramCallRequest {
            method,
            args: &args,
            accounts: &accounts,
            foreign_assets: vec![self.asset_id],
        };
        let path = format!("/v2/applications/{}/call", self.app_id);
        let tx_id = self.submit(&path, &body).await?;
        debug!(method, %tx_id, "Submitted program call");
        Ok(tx_id)
    }

    async fn balance(&self, address: &str) -> LedgerResult<u64> {
        if self.asset_id == 0 {
            return Ok(0);
        }

        let url = format!(
            "{}/v2/accounts/{}/assets/{}",
            self.base_url, address, self.asset_id
        );
        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Self::map_send_error("balance lookup", e))?;

        // an account that never opted in to the asset simply has no holding
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(0);
        }
        if !response.status().is_success() {
            return Err(LedgerError::Rejected(format!(
                "balance lookup ({})",
                response.status()
            )));
        }

        let balance: BalanceResponse = response.json().await.map_err(|e| {
            LedgerError::Unavailable(format!("balance lookup: malformed response: {}", e))
        })?;
        Ok(balance.amount)
    }
}
