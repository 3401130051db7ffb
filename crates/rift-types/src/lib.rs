use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod token;

pub use config::RiftConfig;
pub use token::TokenAmount;

/// A video-ad campaign funded by an advertiser
///
/// `remaining_budget` only ever moves down, and only the reward settlement
/// engine writes it. A campaign deactivates once it can no longer afford a
/// single view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    /// Unique identifier for this campaign
    pub id: String,

    /// The video whose views this campaign pays for
    pub video_id: String,

    /// Wallet of the advertiser funding the campaign
    pub advertiser_wallet: String,

    /// Total budget deposited at creation
    pub budget: TokenAmount,

    /// Budget still available for payouts
    pub remaining_budget: TokenAmount,

    /// Reward paid to the creator per creditable view
    pub reward_per_view: TokenAmount,

    /// Whether the campaign participates in settlement passes
    pub active: bool,

    /// Timestamp when the campaign was created
    pub created_at: DateTime<Utc>,
}

/// Duration tier for a banner campaign
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BannerTier {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
}

impl BannerTier {
    /// Tier duration in calendar months
    pub fn months(&self) -> u32 {
        match self {
            BannerTier::OneMonth => 1,
            BannerTier::ThreeMonths => 3,
            BannerTier::SixMonths => 6,
        }
    }
}

/// A fixed-price banner advertising campaign
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerCampaign {
    /// Unique identifier for this campaign
    pub id: String,

    /// Wallet of the advertiser funding the campaign
    pub advertiser_wallet: String,

    /// Purchased duration tier
    pub tier: BannerTier,

    /// Revenue paid up-front for the banner slot
    pub fixed_price: TokenAmount,

    /// ISO date the banner went live
    pub start_date: Option<String>,

    /// ISO date the banner run ends; unparseable or missing dates make the
    /// campaign immediately eligible for distribution
    pub end_date: Option<String>,

    /// Whether the campaign is still live
    pub active: bool,

    /// One-way latch set by the banner distribution engine
    pub distributed: bool,
}

/// A reported watch event for a video
///
/// `settled` transitions false to true exactly once and never reverses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    /// Unique identifier for this view
    pub id: String,

    /// The video that was watched
    pub video_id: String,

    /// Wallet of the viewer that reported the watch
    pub viewer_wallet: String,

    /// Seconds of verified watch time
    pub watch_seconds: u32,

    /// Whether this view has been paid out
    pub settled: bool,

    /// Device fingerprint captured at report time, if any
    pub viewer_fingerprint: Option<String>,

    /// Timestamp when the view was recorded
    pub timestamp: DateTime<Utc>,
}

/// A published video (only the fields the settlement core reads)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Unique identifier for this video
    pub id: String,

    /// Identifier of the creator that uploaded it
    pub creator_id: String,

    /// Whether ad campaigns may attach to this video
    pub ads_enabled: bool,
}

/// A creator account eligible for payouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    /// Unique identifier for this creator
    pub id: String,

    /// Payout wallet address
    pub wallet_address: String,

    /// Subscriber count used for proportional banner distribution
    pub subscribers_count: u64,
}

/// Which payout path produced a settlement record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SettlementType {
    VideoAd,
    Banner,
}

/// Append-only audit record of one payout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    /// Unique identifier for this record
    pub id: String,

    /// Wallet that received the payout
    pub creator_wallet: String,

    /// Amount delivered to the creator after fees
    pub amount: TokenAmount,

    /// Platform fee withheld from the gross amount
    pub platform_fee: TokenAmount,

    /// Confirmed ledger transaction identifier
    pub tx_hash: String,

    /// Payout path that produced this record
    pub settlement_type: SettlementType,

    /// Timestamp when the settlement was written
    pub timestamp: DateTime<Utc>,

    /// Originating ad campaign, absent for banner payouts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

/// A unit of work skipped during a batch run, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedItem {
    /// Identifier of the skipped campaign or creator
    pub id: String,

    /// Why the item was skipped this run
    pub reason: String,
}

/// Summary of one reward settlement pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardReport {
    /// Active campaigns considered this run
    pub campaigns_processed: usize,

    /// Campaigns that produced a settlement
    pub campaigns_settled: usize,

    /// Views marked settled across all campaigns
    pub views_settled: usize,

    /// Settlement records written
    pub settlements_created: usize,

    /// Campaigns skipped this run, with diagnostics
    pub skipped: Vec<SkippedItem>,
}

/// Summary of one banner distribution pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerReport {
    /// Banner campaigns latched as distributed
    pub campaigns_distributed: usize,

    /// Creators that received a payout
    pub creators_paid: usize,

    /// Share of pooled revenue distributed to creators
    pub creator_pool: TokenAmount,

    /// Share of pooled revenue retained by the platform
    pub platform_share: TokenAmount,

    /// Creators skipped this run, with diagnostics
    pub skipped: Vec<SkippedItem>,
}

impl BannerReport {
    /// An empty report at the given token precision
    pub fn empty(decimals: u8) -> Self {
        Self {
            campaigns_distributed: 0,
            creators_paid: 0,
            creator_pool: TokenAmount::zero(decimals),
            platform_share: TokenAmount::zero(decimals),
            skipped: Vec::new(),
        }
    }
}
