use chrono::Utc;
use rift_store::Store;
use rift_types::{
    Campaign, RewardReport, RiftConfig, Settlement, SettlementType, SkippedItem,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{EngineError, EngineResult};
use crate::service::SettlementService;

/// Periodic batch job converting accumulated creditable views into
/// budget-capped, fee-deducted creator payouts.
///
/// At most one run is in flight at a time: scheduled and manual triggers
/// serialize on an internal run mutex and never interleave.
pub struct RewardEngine {
    store: Arc<dyn Store>,
    settlement: Arc<SettlementService>,
    min_watch_seconds: u32,
    run_guard: Mutex<()>,
}

impl RewardEngine {
    pub fn new(
        config: &RiftConfig,
        store: Arc<dyn Store>,
        settlement: Arc<SettlementService>,
    ) -> Self {
        Self {
            store,
            settlement,
            min_watch_seconds: config.view_min_watch_seconds,
            run_guard: Mutex::new(()),
        }
    }

    /// Run one settlement pass over every active campaign.
    ///
    /// One campaign's failure (ledger timeout, store error) is recorded in
    /// the report's `skipped` list and the pass continues; the campaign is
    /// retried naturally on the next run.
    pub async fn run_once(&self) -> EngineResult<RewardReport> {
        let _guard = self.run_guard.lock().await;

        let campaigns = self.store.active_campaigns().await?;
        let mut report = RewardReport {
            campaigns_processed: campaigns.len(),
            ..RewardReport::default()
        };

        for campaign in &campaigns {
            match self.settle_campaign(campaign).await {
                Ok(Some(views_settled)) => {
                    report.campaigns_settled += 1;
                    report.views_settled += views_settled;
                    report.settlements_created += 1;
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(
                        campaign_id = %campaign.id,
                        %error,
                        "Skipping campaign this run"
                    );
                    report.skipped.push(SkippedItem {
                        id: campaign.id.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            campaigns_processed = report.campaigns_processed,
            campaigns_settled = report.campaigns_settled,
            views_settled = report.views_settled,
            skipped = report.skipped.len(),
            "Reward settlement pass complete"
        );
        Ok(report)
    }

    /// Settle one campaign. Returns the number of views settled, or `None`
    /// when the campaign had nothing payable this run.
    async fn settle_campaign(&self, campaign: &Campaign) -> EngineResult<Option<usize>> {
        if campaign.reward_per_view.is_zero() || campaign.remaining_budget.is_zero() {
            self.store.deactivate_campaign(&campaign.id, false).await?;
            return Ok(None);
        }

        let views = self
            .store
            .unsettled_views(&campaign.video_id, self.min_watch_seconds)
            .await?;
        if views.is_empty() {
            return Ok(None);
        }

        let max_affordable = campaign
            .remaining_budget
            .div_units(&campaign.reward_per_view)
            .map_err(|e| EngineError::Arithmetic(e.to_string()))?;
        if max_affordable == 0 {
            // cannot pay for even one more view
            self.store.deactivate_campaign(&campaign.id, true).await?;
            return Ok(None);
        }

        // oldest views first, capped by what the budget affords
        let payable: Vec<_> = views.into_iter().take(max_affordable as usize).collect();
        let payable_count = payable.len() as u64;

        let creator_earnings = campaign
            .reward_per_view
            .mul_units(payable_count)
            .map_err(|e| EngineError::Arithmetic(e.to_string()))?;
        let new_remaining = campaign
            .remaining_budget
            .saturating_sub(&creator_earnings)
            .map_err(|e| EngineError::Arithmetic(e.to_string()))?;

        let video = match self.store.video(&campaign.video_id).await? {
            Some(video) => video,
            None => {
                debug!(campaign_id = %campaign.id, "Video missing, skipping campaign");
                return Ok(None);
            }
        };
        let creator = match self.store.creator(&video.creator_id).await? {
            Some(creator) => creator,
            None => {
                debug!(campaign_id = %campaign.id, "Creator missing, skipping campaign");
                return Ok(None);
            }
        };

        let outcome = self
            .settlement
            .settle_reward(&creator.wallet_address, creator_earnings)
            .await?;

        let view_ids: Vec<String> = payable.iter().map(|v| v.id.clone()).collect();
        let settlement = Settlement {
            id: Uuid::new_v4().to_string(),
            creator_wallet: creator.wallet_address.clone(),
            amount: outcome.creator_amount,
            platform_fee: outcome.platform_fee,
            tx_hash: outcome.tx_hash,
            settlement_type: SettlementType::VideoAd,
            timestamp: Utc::now(),
            campaign_id: Some(campaign.id.clone()),
        };

        self.store
            .apply_video_settlement(
                &campaign.id,
                &view_ids,
                settlement,
                new_remaining,
                !new_remaining.is_zero(),
            )
            .await?;

        Ok(Some(view_ids.len()))
    }
}
