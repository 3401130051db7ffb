use crate::{BannerEngine, RewardEngine, Scheduler, SettlementError, SettlementService};
use chrono::{Duration, Utc};
use rift_ledger::memory::FailureMode;
use rift_ledger::MemoryLedger;
use rift_store::{MemoryStore, Store};
use rift_types::{
    BannerCampaign, BannerTier, Campaign, Creator, RiftConfig, SettlementType, TokenAmount,
    Video, View,
};
use std::sync::Arc;

const DECIMALS: u8 = 6;

fn tokens(whole: u64) -> TokenAmount {
    TokenAmount::new(whole * 1_000_000, DECIMALS)
}

fn test_config() -> RiftConfig {
    RiftConfig {
        token_decimals: DECIMALS,
        settlement_fee_bps: 200,
        view_min_watch_seconds: 30,
        ..RiftConfig::default()
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    ledger: Arc<MemoryLedger>,
    service: Arc<SettlementService>,
    reward: Arc<RewardEngine>,
    banner: Arc<BannerEngine>,
}

fn harness(config: &RiftConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let service = Arc::new(SettlementService::new(config, ledger.clone()));
    let reward = Arc::new(RewardEngine::new(config, store.clone(), service.clone()));
    let banner = Arc::new(BannerEngine::new(config, store.clone(), service.clone()));
    Harness {
        store,
        ledger,
        service,
        reward,
        banner,
    }
}

fn seed_campaign(store: &MemoryStore, id: &str, video_id: &str, budget: TokenAmount, reward_per_view: TokenAmount) {
    store.put_campaign(Campaign {
        id: id.to_string(),
        video_id: video_id.to_string(),
        advertiser_wallet: "advertiser-wallet".to_string(),
        budget,
        remaining_budget: budget,
        reward_per_view,
        active: true,
        created_at: Utc::now(),
    });
}

fn seed_creator_video(store: &MemoryStore, video_id: &str, creator_id: &str, wallet: &str, subscribers: u64) {
    store.put_video(Video {
        id: video_id.to_string(),
        creator_id: creator_id.to_string(),
        ads_enabled: true,
    });
    store.put_creator(Creator {
        id: creator_id.to_string(),
        wallet_address: wallet.to_string(),
        subscribers_count: subscribers,
    });
}

async fn seed_views(store: &MemoryStore, video_id: &str, count: usize, watch_seconds: u32) {
    let base = Utc::now() - Duration::hours(1);
    for i in 0..count {
        store
            .insert_view(View {
                id: format!("{}-view-{:04}", video_id, i),
                video_id: video_id.to_string(),
                viewer_wallet: format!("viewer-{:04}", i),
                watch_seconds,
                settled: false,
                viewer_fingerprint: None,
                timestamp: base + Duration::seconds(i as i64),
            })
            .await
            .unwrap();
    }
}

fn seed_banner(store: &MemoryStore, id: &str, fixed_price: TokenAmount, end_date: Option<&str>) {
    store.put_banner_campaign(BannerCampaign {
        id: id.to_string(),
        advertiser_wallet: "advertiser-wallet".to_string(),
        tier: BannerTier::OneMonth,
        fixed_price,
        start_date: None,
        end_date: end_date.map(str::to_string),
        active: true,
        distributed: false,
    });
}

#[tokio::test]
async fn settle_reward_direct_mode_splits_fee() {
    let config = test_config();
    let h = harness(&config);

    let outcome = h.service.settle_reward("creator-wallet", tokens(100)).await.unwrap();
    assert_eq!(outcome.platform_fee, tokens(2));
    assert_eq!(outcome.creator_amount, tokens(98));
    assert_eq!(
        outcome.platform_fee.base_units + outcome.creator_amount.base_units,
        outcome.gross.base_units
    );

    let transfers = h.ledger.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].to, "creator-wallet");
    assert_eq!(transfers[0].amount_base_units, tokens(98).base_units);
    assert_eq!(transfers[0].memo, "rift:video-settlement");
}

#[tokio::test]
async fn settle_reward_contract_mode_calls_program() {
    let config = RiftConfig {
        use_contract_settlement: true,
        app_id: 42,
        ..test_config()
    };
    let h = harness(&config);

    let outcome = h.service.settle_reward("creator-wallet", tokens(100)).await.unwrap();
    assert_eq!(outcome.creator_amount, tokens(98));

    // the program receives the gross and splits it on-chain
    assert!(h.ledger.transfers().is_empty());
    let calls = h.ledger.program_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "settle_reward");
    assert_eq!(calls[0].args[0], tokens(100).base_units.to_be_bytes().to_vec());
    assert_eq!(calls[0].accounts, vec!["creator-wallet".to_string()]);
}

#[tokio::test]
async fn settle_reward_rejects_dust() {
    let h = harness(&test_config());
    let result = h
        .service
        .settle_reward("creator-wallet", TokenAmount::zero(DECIMALS))
        .await;
    assert!(matches!(result, Err(SettlementError::AmountTooSmall)));

    // a fee consuming the whole gross leaves nothing payable
    let config = RiftConfig {
        settlement_fee_bps: 10_000,
        ..test_config()
    };
    let h = harness(&config);
    let result = h
        .service
        .settle_reward("creator-wallet", TokenAmount::new(1, DECIMALS))
        .await;
    assert!(matches!(result, Err(SettlementError::AmountTooSmall)));
    assert!(h.ledger.transfers().is_empty());
}

#[tokio::test]
async fn withdraw_unused_uses_configured_path() {
    let h = harness(&test_config());
    h.service.withdraw_unused("advertiser-wallet", tokens(5)).await.unwrap();
    let transfers = h.ledger.transfers();
    assert_eq!(transfers[0].memo, "rift:withdraw-unused");
    assert_eq!(transfers[0].amount_base_units, tokens(5).base_units);

    let config = RiftConfig {
        use_contract_settlement: true,
        app_id: 42,
        ..test_config()
    };
    let h = harness(&config);
    h.service.withdraw_unused("advertiser-wallet", tokens(5)).await.unwrap();
    let calls = h.ledger.program_calls();
    assert_eq!(calls[0].method, "withdraw_unused");
    assert_eq!(calls[0].accounts, vec!["advertiser-wallet".to_string()]);
}

#[tokio::test]
async fn reward_run_caps_payout_at_remaining_budget() {
    let config = test_config();
    let h = harness(&config);
    seed_creator_video(&h.store, "video-1", "creator-1", "creator-wallet", 10);
    seed_campaign(&h.store, "camp-1", "video-1", tokens(100), tokens(1));
    seed_views(&h.store, "video-1", 150, 60).await;

    let report = h.reward.run_once().await.unwrap();
    assert_eq!(report.campaigns_processed, 1);
    assert_eq!(report.campaigns_settled, 1);
    assert_eq!(report.views_settled, 100);
    assert_eq!(report.settlements_created, 1);
    assert!(report.skipped.is_empty());

    let campaign = h.store.campaign("camp-1").await.unwrap().unwrap();
    assert!(campaign.remaining_budget.is_zero());
    assert!(!campaign.active);

    let settlements = h.store.settlements_by_type(SettlementType::VideoAd).await.unwrap();
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0].amount, tokens(98));
    assert_eq!(settlements[0].platform_fee, tokens(2));
    assert_eq!(settlements[0].campaign_id.as_deref(), Some("camp-1"));

    // the 50 views past the budget stay unsettled
    let leftover = h.store.unsettled_views("video-1", 30).await.unwrap();
    assert_eq!(leftover.len(), 50);
}

#[tokio::test]
async fn reward_runs_never_resettle_views() {
    let config = test_config();
    let h = harness(&config);
    seed_creator_video(&h.store, "video-1", "creator-1", "creator-wallet", 10);
    seed_campaign(&h.store, "camp-1", "video-1", tokens(1000), tokens(1));
    seed_views(&h.store, "video-1", 10, 60).await;

    let first = h.reward.run_once().await.unwrap();
    assert_eq!(first.views_settled, 10);

    // nothing left to pay; budget and settlements are untouched
    let second = h.reward.run_once().await.unwrap();
    assert_eq!(second.views_settled, 0);
    assert_eq!(second.settlements_created, 0);

    let settlements = h.store.settlements_by_type(SettlementType::VideoAd).await.unwrap();
    assert_eq!(settlements.len(), 1);
    let campaign = h.store.campaign("camp-1").await.unwrap().unwrap();
    assert_eq!(campaign.remaining_budget, tokens(990));
    assert!(campaign.active);
}

#[tokio::test]
async fn reward_run_isolates_a_failing_campaign() {
    let config = test_config();
    let h = harness(&config);
    seed_creator_video(&h.store, "video-1", "creator-1", "wallet-timeout", 10);
    seed_campaign(&h.store, "camp-1", "video-1", tokens(100), tokens(1));
    seed_views(&h.store, "video-1", 5, 60).await;

    seed_creator_video(&h.store, "video-2", "creator-2", "wallet-ok", 10);
    seed_campaign(&h.store, "camp-2", "video-2", tokens(100), tokens(1));
    seed_views(&h.store, "video-2", 5, 60).await;

    h.ledger.fail_address("wallet-timeout", FailureMode::Timeout);

    let report = h.reward.run_once().await.unwrap();
    assert_eq!(report.campaigns_processed, 2);
    assert_eq!(report.campaigns_settled, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id, "camp-1");

    // the failed campaign is left exactly as it was, ready for the next run
    let failed = h.store.campaign("camp-1").await.unwrap().unwrap();
    assert_eq!(failed.remaining_budget, tokens(100));
    assert!(failed.active);
    assert_eq!(h.store.unsettled_views("video-1", 30).await.unwrap().len(), 5);
}

#[tokio::test]
async fn reward_run_skips_missing_video_silently() {
    let config = test_config();
    let h = harness(&config);
    // campaign points at a video that was never stored
    seed_campaign(&h.store, "camp-1", "video-gone", tokens(100), tokens(1));
    seed_views(&h.store, "video-gone", 3, 60).await;

    let report = h.reward.run_once().await.unwrap();
    assert_eq!(report.campaigns_processed, 1);
    assert_eq!(report.campaigns_settled, 0);
    // a lookup miss is not an error, just unsettled work
    assert!(report.skipped.is_empty());
    assert_eq!(h.store.unsettled_views("video-gone", 30).await.unwrap().len(), 3);
}

#[tokio::test]
async fn reward_run_deactivates_unaffordable_campaign() {
    let config = test_config();
    let h = harness(&config);
    seed_creator_video(&h.store, "video-1", "creator-1", "creator-wallet", 10);
    // half a token left, one token per view: can never pay again
    store_campaign_with_remaining(&h.store, "camp-1", "video-1", tokens(1), TokenAmount::new(500_000, DECIMALS));
    seed_views(&h.store, "video-1", 3, 60).await;

    let report = h.reward.run_once().await.unwrap();
    assert_eq!(report.campaigns_settled, 0);

    let campaign = h.store.campaign("camp-1").await.unwrap().unwrap();
    assert!(!campaign.active);
    assert!(campaign.remaining_budget.is_zero());
    assert!(h.store.settlements_by_type(SettlementType::VideoAd).await.unwrap().is_empty());
}

fn store_campaign_with_remaining(
    store: &MemoryStore,
    id: &str,
    video_id: &str,
    reward_per_view: TokenAmount,
    remaining: TokenAmount,
) {
    store.put_campaign(Campaign {
        id: id.to_string(),
        video_id: video_id.to_string(),
        advertiser_wallet: "advertiser-wallet".to_string(),
        budget: remaining,
        remaining_budget: remaining,
        reward_per_view,
        active: true,
        created_at: Utc::now(),
    });
}

#[tokio::test]
async fn concurrent_reward_triggers_serialize() {
    let config = test_config();
    let h = harness(&config);
    seed_creator_video(&h.store, "video-1", "creator-1", "creator-wallet", 10);
    seed_campaign(&h.store, "camp-1", "video-1", tokens(1000), tokens(1));
    seed_views(&h.store, "video-1", 20, 60).await;

    // a manual trigger racing a scheduled one must not double-pay
    let (a, b) = tokio::join!(h.reward.run_once(), h.reward.run_once());
    let total = a.unwrap().views_settled + b.unwrap().views_settled;
    assert_eq!(total, 20);
    let settlements = h.store.settlements_by_type(SettlementType::VideoAd).await.unwrap();
    assert_eq!(settlements.len(), 1);
}

#[tokio::test]
async fn banner_run_distributes_proportionally() {
    let config = test_config();
    let h = harness(&config);
    seed_banner(&h.store, "banner-1", tokens(1000), Some("2000-01-01"));
    seed_creator_video(&h.store, "video-1", "creator-30", "wallet-30", 30);
    seed_creator_video(&h.store, "video-2", "creator-70", "wallet-70", 70);

    let report = h.banner.run_once().await.unwrap();
    assert_eq!(report.campaigns_distributed, 1);
    assert_eq!(report.creators_paid, 2);
    assert_eq!(report.platform_share, tokens(300));
    assert_eq!(report.creator_pool, tokens(700));

    let settlements = h.store.settlements_by_type(SettlementType::Banner).await.unwrap();
    assert_eq!(settlements.len(), 2);
    let by_wallet = |wallet: &str| {
        settlements
            .iter()
            .find(|s| s.creator_wallet == wallet)
            .unwrap()
            .amount
    };
    assert_eq!(by_wallet("wallet-30"), tokens(210));
    assert_eq!(by_wallet("wallet-70"), tokens(490));
    assert!(settlements.iter().all(|s| s.platform_fee.is_zero()));

    let banner = h.store.banner_campaign("banner-1").unwrap();
    assert!(banner.distributed);
    assert!(!banner.active);
}

#[tokio::test]
async fn banner_run_conserves_revenue_including_remainder() {
    let config = test_config();
    let h = harness(&config);
    seed_banner(&h.store, "banner-1", tokens(10), Some("2000-01-01"));
    seed_creator_video(&h.store, "video-1", "creator-1", "wallet-1", 1);
    seed_creator_video(&h.store, "video-2", "creator-2", "wallet-2", 2);

    let report = h.banner.run_once().await.unwrap();
    let settlements = h.store.settlements_by_type(SettlementType::Banner).await.unwrap();
    let paid: u64 = settlements.iter().map(|s| s.amount.base_units).sum();

    // platform share + per-creator rewards + rounding remainder == revenue
    let total = tokens(10).base_units;
    let remainder = total - report.platform_share.base_units - paid;
    assert_eq!(report.platform_share.base_units, 3_000_000);
    assert_eq!(paid, 2_333_333 + 4_666_666);
    assert_eq!(remainder, 1);
}

#[tokio::test]
async fn banner_run_latches_campaigns_despite_transfer_failure() {
    let config = test_config();
    let h = harness(&config);
    seed_banner(&h.store, "banner-1", tokens(1000), Some("2000-01-01"));
    seed_creator_video(&h.store, "video-1", "creator-30", "wallet-30", 30);
    seed_creator_video(&h.store, "video-2", "creator-70", "wallet-70", 70);
    h.ledger.fail_address("wallet-30", FailureMode::Unavailable);

    let report = h.banner.run_once().await.unwrap();
    assert_eq!(report.campaigns_distributed, 1);
    assert_eq!(report.creators_paid, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id, "creator-30");

    // one-shot eligibility: the campaign is spent even though a payout failed
    let banner = h.store.banner_campaign("banner-1").unwrap();
    assert!(banner.distributed);

    let rerun = h.banner.run_once().await.unwrap();
    assert_eq!(rerun.campaigns_distributed, 0);
    assert_eq!(rerun.creators_paid, 0);
}

#[tokio::test]
async fn banner_run_without_subscribers_pays_nobody() {
    let config = test_config();
    let h = harness(&config);
    seed_banner(&h.store, "banner-1", tokens(10), Some("2000-01-01"));
    seed_creator_video(&h.store, "video-1", "creator-1", "wallet-1", 0);

    let report = h.banner.run_once().await.unwrap();
    assert_eq!(report.creators_paid, 0);
    assert_eq!(report.campaigns_distributed, 0);
    assert_eq!(report.creator_pool, tokens(7));
    assert_eq!(report.platform_share, tokens(3));

    // with no one to pay, eligibility is not consumed
    let banner = h.store.banner_campaign("banner-1").unwrap();
    assert!(!banner.distributed);
    assert!(banner.active);
}

#[tokio::test]
async fn banner_run_ignores_future_campaigns() {
    let config = test_config();
    let h = harness(&config);
    seed_banner(&h.store, "banner-future", tokens(10), Some("2999-12-31"));
    seed_creator_video(&h.store, "video-1", "creator-1", "wallet-1", 5);

    let report = h.banner.run_once().await.unwrap();
    assert_eq!(report.campaigns_distributed, 0);
    assert!(h.store.settlements_by_type(SettlementType::Banner).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scheduler_runs_reward_engine_on_interval() {
    let config = RiftConfig {
        reward_interval_minutes: 1,
        ..test_config()
    };
    let h = harness(&config);
    seed_creator_video(&h.store, "video-1", "creator-1", "creator-wallet", 10);
    seed_campaign(&h.store, "camp-1", "video-1", tokens(100), tokens(1));
    seed_views(&h.store, "video-1", 5, 60).await;

    let scheduler = Scheduler::new(&config, h.reward.clone(), h.banner.clone());
    scheduler.start();
    assert!(scheduler.is_running());
    // second start is a no-op
    scheduler.start();

    // one interval elapses (virtual time), the reward pass fires
    tokio::time::sleep(std::time::Duration::from_secs(65)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let settlements = h.store.settlements_by_type(SettlementType::VideoAd).await.unwrap();
    assert_eq!(settlements.len(), 1);

    scheduler.stop();
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn scheduler_disabled_by_configuration_never_starts() {
    let config = RiftConfig {
        scheduler_enabled: false,
        ..test_config()
    };
    let h = harness(&config);
    let scheduler = Scheduler::new(&config, h.reward.clone(), h.banner.clone());
    scheduler.start();
    assert!(!scheduler.is_running());
}
