use rift_ledger::LedgerClient;
use rift_types::{RiftConfig, TokenAmount};
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::SettlementError;

/// Memo attached to direct video-ad settlement transfers
pub const VIDEO_SETTLEMENT_MEMO: &str = "rift:video-settlement";
/// Memo attached to banner distribution transfers
pub const BANNER_DISTRIBUTION_MEMO: &str = "rift:banner-distribution";
/// Memo attached to unused-budget withdrawals
pub const WITHDRAW_UNUSED_MEMO: &str = "rift:withdraw-unused";

/// Settlement program method splitting gross into creator and platform legs
const SETTLE_REWARD_METHOD: &str = "settle_reward";
/// Settlement program method returning unused budget to an advertiser
const WITHDRAW_UNUSED_METHOD: &str = "withdraw_unused";

/// Result of one fee-split settlement
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    /// Confirmed ledger transaction id
    pub tx_hash: String,

    /// Gross amount before the fee
    pub gross: TokenAmount,

    /// Fee withheld for the platform
    pub platform_fee: TokenAmount,

    /// Net amount delivered to the creator
    pub creator_amount: TokenAmount,
}

/// Fee-deducting settlement primitive over the ledger client.
///
/// Two delivery modes produce the same outcome shape: a direct transfer of
/// the creator leg (fee implicitly retained in the platform balance), or an
/// on-chain program call that splits the gross atomically inside one ledger
/// transaction. A ledger timeout after broadcast is fatal to the invoking
/// batch step; the caller must not re-send.
pub struct SettlementService {
    ledger: Arc<dyn LedgerClient>,
    fee_bps: u32,
    use_contract_settlement: bool,
    app_id: u64,
}

impl SettlementService {
    pub fn new(config: &RiftConfig, ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            ledger,
            fee_bps: config.settlement_fee_bps,
            use_contract_settlement: config.use_contract_settlement,
            app_id: config.app_id,
        }
    }

    fn contract_mode(&self) -> bool {
        self.use_contract_settlement && self.app_id > 0
    }

    /// Settle a gross reward to a creator, deducting the platform fee.
    ///
    /// `platform_fee = floor(gross * fee_bps / 10000)` in base units; the
    /// creator receives the remainder, so no base unit is lost or created.
    pub async fn settle_reward(
        &self,
        creator_wallet: &str,
        gross: TokenAmount,
    ) -> Result<SettlementOutcome, SettlementError> {
        if gross.is_zero() {
            return Err(SettlementError::AmountTooSmall);
        }
        let (platform_fee, creator_amount) = gross.fee_split(self.fee_bps);
        if creator_amount.is_zero() {
            return Err(SettlementError::AmountTooSmall);
        }

        let tx_hash = if self.contract_mode() {
            self.ledger
                .call_program(
                    SETTLE_REWARD_METHOD,
                    vec![gross.base_units.to_be_bytes().to_vec()],
                    vec![creator_wallet.to_string()],
                )
                .await?
        } else {
            // Fallback path: transfer the creator leg from the platform
            // wallet. The fee stays in the platform-controlled balance.
            self.ledger
                .transfer(creator_wallet, creator_amount.base_units, VIDEO_SETTLEMENT_MEMO)
                .await?
        };

        info!(
            creator_wallet,
            gross = %gross,
            fee = %platform_fee,
            %tx_hash,
            "Settled creator reward"
        );
        Ok(SettlementOutcome {
            tx_hash,
            gross,
            platform_fee,
            creator_amount,
        })
    }

    /// Transfer tokens without a fee split (banner distribution path)
    pub async fn transfer_tokens(
        &self,
        receiver_wallet: &str,
        amount: TokenAmount,
    ) -> Result<String, SettlementError> {
        if amount.is_zero() {
            return Err(SettlementError::AmountTooSmall);
        }
        let tx_hash = self
            .ledger
            .transfer(receiver_wallet, amount.base_units, BANNER_DISTRIBUTION_MEMO)
            .await?;
        debug!(receiver_wallet, amount = %amount, %tx_hash, "Transferred tokens");
        Ok(tx_hash)
    }

    /// Return unused campaign budget to an advertiser
    pub async fn withdraw_unused(
        &self,
        advertiser_wallet: &str,
        amount: TokenAmount,
    ) -> Result<String, SettlementError> {
        if amount.is_zero() {
            return Err(SettlementError::AmountTooSmall);
        }

        let tx_hash = if self.contract_mode() {
            self.ledger
                .call_program(
                    WITHDRAW_UNUSED_METHOD,
                    vec![amount.base_units.to_be_bytes().to_vec()],
                    vec![advertiser_wallet.to_string()],
                )
                .await?
        } else {
            self.ledger
                .transfer(advertiser_wallet, amount.base_units, WITHDRAW_UNUSED_MEMO)
                .await?
        };
        info!(advertiser_wallet, amount = %amount, %tx_hash, "Withdrew unused budget");
        Ok(tx_hash)
    }
}
