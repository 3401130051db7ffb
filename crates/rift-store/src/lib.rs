use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rift_types::{
    BannerCampaign, Campaign, Creator, Settlement, SettlementType, TokenAmount, Video, View,
};

pub mod errors;
pub mod memory;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// Narrow storage interface consumed by the settlement engines.
///
/// The backing store is external to this core; implementations are expected
/// to provide at least read-your-writes consistency within a process.
/// `apply_video_settlement` must apply its writes atomically so a crashed or
/// re-triggered run can never double-pay.
#[async_trait]
pub trait Store: Send + Sync {
    /// Active ad campaigns with budget left to spend
    async fn active_campaigns(&self) -> StoreResult<Vec<Campaign>>;

    /// Look up a single campaign by id
    async fn campaign(&self, campaign_id: &str) -> StoreResult<Option<Campaign>>;

    /// Deactivate a campaign, optionally zeroing its remaining budget
    async fn deactivate_campaign(&self, campaign_id: &str, zero_budget: bool) -> StoreResult<()>;

    /// Unsettled views for a video meeting the watch threshold, oldest first
    async fn unsettled_views(&self, video_id: &str, min_watch_seconds: u32)
        -> StoreResult<Vec<View>>;

    /// Record a newly accepted view
    async fn insert_view(&self, view: View) -> StoreResult<View>;

    /// Look up a video by id
    async fn video(&self, video_id: &str) -> StoreResult<Option<Video>>;

    /// Look up a creator account by id
    async fn creator(&self, creator_id: &str) -> StoreResult<Option<Creator>>;

    /// Creators with at least one subscriber
    async fn creators_with_subscribers(&self) -> StoreResult<Vec<Creator>>;

    /// Atomically mark the payable views settled, append the settlement
    /// record, and update the campaign's remaining budget and active flag.
    async fn apply_video_settlement(
        &self,
        campaign_id: &str,
        view_ids: &[String],
        settlement: Settlement,
        new_remaining: TokenAmount,
        active: bool,
    ) -> StoreResult<()>;

    /// Active banner campaigns (eligibility is decided by the engine)
    async fn active_banner_campaigns(&self) -> StoreResult<Vec<BannerCampaign>>;

    /// Latch the given banner campaigns `{distributed: true, active: false}`
    async fn mark_banners_distributed(&self, campaign_ids: &[String]) -> StoreResult<()>;

    /// Append one settlement record
    async fn insert_settlement(&self, settlement: Settlement) -> StoreResult<Settlement>;

    /// Settlement history filtered by payout type, oldest first
    async fn settlements_by_type(
        &self,
        settlement_type: SettlementType,
    ) -> StoreResult<Vec<Settlement>>;

    /// Settlement history at or after the given instant, oldest first
    async fn settlements_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<Settlement>>;
}
