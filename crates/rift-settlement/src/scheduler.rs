use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use rift_types::RiftConfig;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::banner::BannerEngine;
use crate::reward::RewardEngine;

/// Background trigger for the two settlement engines.
///
/// Owns no settlement logic: it fires the reward engine on a fixed-minute
/// interval and the banner engine at 00:05 UTC on the 1st of each month.
/// `start` is idempotent and a no-op when disabled by configuration;
/// `stop` only asks the timer loops to exit, so an in-flight engine run
/// (holding its engine's run mutex) always completes.
pub struct Scheduler {
    reward: Arc<RewardEngine>,
    banner: Arc<BannerEngine>,
    enabled: bool,
    reward_interval: Duration,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(config: &RiftConfig, reward: Arc<RewardEngine>, banner: Arc<BannerEngine>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            reward,
            banner,
            enabled: config.scheduler_enabled,
            reward_interval: Duration::from_secs(config.reward_interval_minutes.max(1) * 60),
            running: AtomicBool::new(false),
            shutdown,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the recurring triggers. Safe to call more than once.
    pub fn start(&self) {
        if !self.enabled {
            info!("Scheduler disabled by configuration");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Scheduler already running");
            return;
        }
        self.shutdown.send_replace(false);

        let reward = self.reward.clone();
        let mut shutdown_rx = self.shutdown.subscribe();
        let period = self.reward_interval;
        let reward_handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // consume the immediate first tick so the first run happens one
            // full interval after startup
            timer.tick().await;
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        if let Err(error) = reward.run_once().await {
                            error!(%error, "Scheduled reward settlement run failed");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        let banner = self.banner.clone();
        let mut shutdown_rx = self.shutdown.subscribe();
        let banner_handle = tokio::spawn(async move {
            loop {
                let wait = until_next_monthly_trigger(Utc::now());
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        if let Err(error) = banner.run_once().await {
                            error!(%error, "Scheduled banner distribution run failed");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        self.handles
            .lock()
            .unwrap()
            .extend([reward_handle, banner_handle]);
        info!(interval = ?period, "Scheduler started");
    }

    /// Ask the timer loops to exit after any in-flight run completes
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.send_replace(true);
        self.handles.lock().unwrap().clear();
        info!("Scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

fn monthly_trigger(year: i32, month: u32) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    let time = date.and_hms_opt(0, 5, 0).unwrap();
    Utc.from_utc_datetime(&time)
}

/// The next 1st-of-month 00:05 UTC strictly after `after`
fn next_monthly_trigger(after: DateTime<Utc>) -> DateTime<Utc> {
    let candidate = monthly_trigger(after.year(), after.month());
    if candidate > after {
        candidate
    } else if after.month() == 12 {
        monthly_trigger(after.year() + 1, 1)
    } else {
        monthly_trigger(after.year(), after.month() + 1)
    }
}

fn until_next_monthly_trigger(now: DateTime<Utc>) -> Duration {
    (next_monthly_trigger(now) - now)
        .to_std()
        .unwrap_or(Duration::from_secs(60))
}
