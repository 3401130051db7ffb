use chrono::{NaiveDate, Utc};
use rift_store::Store;
use rift_types::{
    BannerCampaign, BannerReport, RiftConfig, Settlement, SettlementType, SkippedItem,
    TokenAmount,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{EngineError, EngineResult};
use crate::service::SettlementService;

/// Platform share of pooled banner revenue, in percent
const PLATFORM_SHARE_PERCENT: u64 = 30;
/// Creator pool share of pooled banner revenue, in percent
const CREATOR_POOL_PERCENT: u64 = 70;

/// Periodic batch job pooling expired banner revenue and distributing the
/// creator share proportionally to subscriber counts.
///
/// Payouts are best effort: after every transfer has been attempted, the
/// whole eligible set is latched `{distributed, inactive}` in one batch,
/// regardless of individual failures. Rounding remainder stays with the
/// platform implicitly.
pub struct BannerEngine {
    store: Arc<dyn Store>,
    settlement: Arc<SettlementService>,
    decimals: u8,
    run_guard: Mutex<()>,
}

impl BannerEngine {
    pub fn new(
        config: &RiftConfig,
        store: Arc<dyn Store>,
        settlement: Arc<SettlementService>,
    ) -> Self {
        Self {
            store,
            settlement,
            decimals: config.token_decimals,
            run_guard: Mutex::new(()),
        }
    }

    /// A campaign is eligible once its run has ended. Campaigns without an
    /// end date, or with one that does not parse, are taken immediately.
    fn eligible_campaigns(campaigns: Vec<BannerCampaign>, today: NaiveDate) -> Vec<BannerCampaign> {
        campaigns
            .into_iter()
            .filter(|campaign| {
                if campaign.distributed {
                    return false;
                }
                match campaign.end_date.as_deref() {
                    None => true,
                    Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                        Ok(end_date) => end_date <= today,
                        Err(_) => true,
                    },
                }
            })
            .collect()
    }

    /// Run one distribution pass over the eligible banner campaigns
    pub async fn run_once(&self) -> EngineResult<BannerReport> {
        let _guard = self.run_guard.lock().await;

        let campaigns = self.store.active_banner_campaigns().await?;
        let eligible = Self::eligible_campaigns(campaigns, Utc::now().date_naive());
        if eligible.is_empty() {
            return Ok(BannerReport::empty(self.decimals));
        }

        let mut total_revenue = TokenAmount::zero(self.decimals);
        for campaign in &eligible {
            total_revenue = total_revenue
                .checked_add(&campaign.fixed_price)
                .map_err(|e| EngineError::Arithmetic(e.to_string()))?;
        }
        if total_revenue.is_zero() {
            return Ok(BannerReport::empty(self.decimals));
        }

        let platform_share = total_revenue.proportional(PLATFORM_SHARE_PERCENT, 100);
        let creator_pool = total_revenue.proportional(CREATOR_POOL_PERCENT, 100);
        if creator_pool.is_zero() {
            return Ok(BannerReport {
                creator_pool,
                platform_share,
                ..BannerReport::empty(self.decimals)
            });
        }

        let creators = self.store.creators_with_subscribers().await?;
        let total_subscribers: u64 = creators.iter().map(|c| c.subscribers_count).sum();
        if total_subscribers == 0 {
            return Ok(BannerReport {
                creator_pool,
                platform_share,
                ..BannerReport::empty(self.decimals)
            });
        }

        let mut creators_paid = 0;
        let mut skipped = Vec::new();
        for creator in &creators {
            let reward = creator_pool.proportional(creator.subscribers_count, total_subscribers);
            if reward.is_zero() {
                // a share that floors to nothing is a no-op, not an error
                continue;
            }

            match self
                .settlement
                .transfer_tokens(&creator.wallet_address, reward)
                .await
            {
                Ok(tx_hash) => {
                    self.store
                        .insert_settlement(Settlement {
                            id: Uuid::new_v4().to_string(),
                            creator_wallet: creator.wallet_address.clone(),
                            amount: reward,
                            platform_fee: TokenAmount::zero(self.decimals),
                            tx_hash,
                            settlement_type: SettlementType::Banner,
                            timestamp: Utc::now(),
                            campaign_id: None,
                        })
                        .await?;
                    creators_paid += 1;
                }
                Err(error) => {
                    warn!(
                        creator_id = %creator.id,
                        %error,
                        "Banner payout failed for creator"
                    );
                    skipped.push(SkippedItem {
                        id: creator.id.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        // one-shot eligibility: the whole selected set latches regardless of
        // individual transfer failures
        let campaign_ids: Vec<String> = eligible.iter().map(|c| c.id.clone()).collect();
        self.store.mark_banners_distributed(&campaign_ids).await?;

        info!(
            campaigns_distributed = eligible.len(),
            creators_paid,
            creator_pool = %creator_pool,
            platform_share = %platform_share,
            "Banner distribution pass complete"
        );
        Ok(BannerReport {
            campaigns_distributed: eligible.len(),
            creators_paid,
            creator_pool,
            platform_share,
            skipped,
        })
    }
}
