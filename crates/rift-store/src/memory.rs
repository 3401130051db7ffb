use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rift_types::{
    BannerCampaign, Campaign, Creator, Settlement, SettlementType, TokenAmount, Video, View,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::debug;

use crate::{Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    campaigns: HashMap<String, Campaign>,
    banner_campaigns: HashMap<String, BannerCampaign>,
    views: HashMap<String, View>,
    videos: HashMap<String, Video>,
    creators: HashMap<String, Creator>,
    settlements: Vec<Settlement>,
}

/// Simple in-memory store for testing and local development.
///
/// One mutex guards every table, so multi-table writes such as
/// `apply_video_settlement` are naturally atomic.
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Tables::default())),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.inner.lock().unwrap()
    }

    /// Seed a campaign (for tests and local runs)
    pub fn put_campaign(&self, campaign: Campaign) {
        self.tables().campaigns.insert(campaign.id.clone(), campaign);
    }

    /// Seed a banner campaign
    pub fn put_banner_campaign(&self, campaign: BannerCampaign) {
        self.tables()
            .banner_campaigns
            .insert(campaign.id.clone(), campaign);
    }

    /// Seed a video
    pub fn put_video(&self, video: Video) {
        self.tables().videos.insert(video.id.clone(), video);
    }

    /// Seed a creator account
    pub fn put_creator(&self, creator: Creator) {
        self.tables().creators.insert(creator.id.clone(), creator);
    }

    /// Look up a view by id
    pub fn view(&self, view_id: &str) -> Option<View> {
        self.tables().views.get(view_id).cloned()
    }

    /// Look up a banner campaign by id
    pub fn banner_campaign(&self, campaign_id: &str) -> Option<BannerCampaign> {
        self.tables().banner_campaigns.get(campaign_id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn active_campaigns(&self) -> StoreResult<Vec<Campaign>> {
        let tables = self.tables();
        let mut campaigns: Vec<Campaign> = tables
            .campaigns
            .values()
            .filter(|c| c.active && !c.remaining_budget.is_zero())
            .cloned()
            .collect();
        campaigns.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(campaigns)
    }

    async fn campaign(&self, campaign_id: &str) -> StoreResult<Option<Campaign>> {
        Ok(self.tables().campaigns.get(campaign_id).cloned())
    }

    async fn deactivate_campaign(&self, campaign_id: &str, zero_budget: bool) -> StoreResult<()> {
        let mut tables = self.tables();
        let campaign = tables
            .campaigns
            .get_mut(campaign_id)
            .ok_or_else(|| StoreError::NotFound(format!("campaign {}", campaign_id)))?;
        campaign.active = false;
        if zero_budget {
            campaign.remaining_budget = TokenAmount::zero(campaign.remaining_budget.decimals);
        }
        Ok(())
    }

    async fn unsettled_views(
        &self,
        video_id: &str,
        min_watch_seconds: u32,
    ) -> StoreResult<Vec<View>> {
        let tables = self.tables();
        let mut views: Vec<View> = tables
            .views
            .values()
            .filter(|v| {
                v.video_id == video_id && !v.settled && v.watch_seconds >= min_watch_seconds
            })
            .cloned()
            .collect();
        views.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(views)
    }

    async fn insert_view(&self, view: View) -> StoreResult<View> {
        let mut tables = self.tables();
        if tables.views.contains_key(&view.id) {
            return Err(StoreError::Conflict(format!("view {} already exists", view.id)));
        }
        tables.views.insert(view.id.clone(), view.clone());
        Ok(view)
    }

    async fn video(&self, video_id: &str) -> StoreResult<Option<Video>> {
        Ok(self.tables().videos.get(video_id).cloned())
    }

    async fn creator(&self, creator_id: &str) -> StoreResult<Option<Creator>> {
        Ok(self.tables().creators.get(creator_id).cloned())
    }

    async fn creators_with_subscribers(&self) -> StoreResult<Vec<Creator>> {
        let tables = self.tables();
        let mut creators: Vec<Creator> = tables
            .creators
            .values()
            .filter(|c| c.subscribers_count > 0)
            .cloned()
            .collect();
        creators.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(creators)
    }

    async fn apply_video_settlement(
        &self,
        campaign_id: &str,
        view_ids: &[String],
        settlement: Settlement,
        new_remaining: TokenAmount,
        active: bool,
    ) -> StoreResult<()> {
        let mut tables = self.tables();

        if !tables.campaigns.contains_key(campaign_id) {
            return Err(StoreError::NotFound(format!("campaign {}", campaign_id)));
        }
        for view_id in view_ids {
            match tables.views.get(view_id) {
                Some(view) if view.settled => {
                    return Err(StoreError::Conflict(format!(
                        "view {} is already settled",
                        view_id
                    )));
                }
                Some(_) => {}
                None => return Err(StoreError::NotFound(format!("view {}", view_id))),
            }
        }

        for view_id in view_ids {
            if let Some(view) = tables.views.get_mut(view_id) {
                view.settled = true;
            }
        }
        tables.settlements.push(settlement);
        if let Some(campaign) = tables.campaigns.get_mut(campaign_id) {
            campaign.remaining_budget = new_remaining;
            campaign.active = active;
        }

        debug!(
            campaign_id,
            views = view_ids.len(),
            "Applied video settlement writes"
        );
        Ok(())
    }

    async fn active_banner_campaigns(&self) -> StoreResult<Vec<BannerCampaign>> {
        let tables = self.tables();
        let mut campaigns: Vec<BannerCampaign> = tables
            .banner_campaigns
            .values()
            .filter(|c| c.active)
            .cloned()
            .collect();
        campaigns.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(campaigns)
    }

    async fn mark_banners_distributed(&self, campaign_ids: &[String]) -> StoreResult<()> {
        let mut tables = self.tables();
        for campaign_id in campaign_ids {
            let campaign = tables
                .banner_campaigns
                .get_mut(campaign_id)
                .ok_or_else(|| StoreError::NotFound(format!("banner campaign {}", campaign_id)))?;
            campaign.distributed = true;
            campaign.active = false;
        }
        Ok(())
    }

    async fn insert_settlement(&self, settlement: Settlement) -> StoreResult<Settlement> {
        self.tables().settlements.push(settlement.clone());
        Ok(settlement)
    }

    async fn settlements_by_type(
        &self,
        settlement_type: SettlementType,
    ) -> StoreResult<Vec<Settlement>> {
        let tables = self.tables();
        let mut settlements: Vec<Settlement> = tables
            .settlements
            .iter()
            .filter(|s| s.settlement_type == settlement_type)
            .cloned()
            .collect();
        settlements.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(settlements)
    }

    async fn settlements_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<Settlement>> {
        let tables = self.tables();
        let mut settlements: Vec<Settlement> = tables
            .settlements
            .iter()
            .filter(|s| s.timestamp >= since)
            .cloned()
            .collect();
        settlements.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(settlements)
    }
}
