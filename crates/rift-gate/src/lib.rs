use chrono::{DateTime, Duration, Utc};
use rift_types::RiftConfig;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};
use tracing::debug;

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

/// Why the gate refused to credit a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MinWatchTimeNotMet,
    WalletRateLimited,
    IpRateLimited,
    FingerprintRateLimited,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MinWatchTimeNotMet => "min_watch_time_not_met",
            RejectReason::WalletRateLimited => "wallet_rate_limited",
            RejectReason::IpRateLimited => "ip_rate_limited",
            RejectReason::FingerprintRateLimited => "fingerprint_rate_limited",
        }
    }
}

/// Outcome of one gate evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Accepted,
    Rejected(RejectReason),
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateDecision::Accepted)
    }

    /// Stable reason string reported to the caller
    pub fn reason(&self) -> &'static str {
        match self {
            GateDecision::Accepted => "ok",
            GateDecision::Rejected(reason) => reason.as_str(),
        }
    }
}

struct GateState {
    wallet_last_seen: HashMap<String, DateTime<Utc>>,
    ip_events: HashMap<String, VecDeque<DateTime<Utc>>>,
    fingerprint_events: HashMap<String, VecDeque<DateTime<Utc>>>,
}

/// Sliding-window anti-fraud gate deciding per-view creditability.
///
/// Holds only in-process throttling state; it is lost on restart, which is
/// acceptable because the gate never authorizes anything retroactively.
/// Construct one instance at startup and share it across request handlers.
pub struct ViewGate {
    min_watch_seconds: u32,
    wallet_cooldown: Duration,
    ip_hourly_limit: usize,
    fingerprint_hourly_limit: usize,
    clock: Arc<dyn Clock>,
    state: Mutex<GateState>,
}

impl ViewGate {
    /// Build a gate from platform configuration with an injected clock
    pub fn new(config: &RiftConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_watch_seconds: config.view_min_watch_seconds,
            wallet_cooldown: Duration::seconds(config.view_wallet_cooldown_seconds as i64),
            ip_hourly_limit: config.view_ip_hourly_limit,
            fingerprint_hourly_limit: config.view_fingerprint_hourly_limit,
            clock,
            state: Mutex::new(GateState {
                wallet_last_seen: HashMap::new(),
                ip_events: HashMap::new(),
                fingerprint_events: HashMap::new(),
            }),
        }
    }

    /// Build a gate running on wall-clock time
    pub fn with_system_clock(config: &RiftConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Decide whether a reported view is creditable.
    ///
    /// Check order matters: the wallet+video cooldown stamp is recorded as
    /// soon as the cooldown check passes, so a later IP or fingerprint
    /// rejection still starts the wallet cooldown.
    pub fn evaluate(
        &self,
        wallet: &str,
        video_id: &str,
        watch_seconds: u32,
        ip_address: Option<&str>,
        fingerprint: Option<&str>,
    ) -> GateDecision {
        if watch_seconds < self.min_watch_seconds {
            return GateDecision::Rejected(RejectReason::MinWatchTimeNotMet);
        }

        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();

        let wallet_key = format!("{}:{}", wallet, video_id);
        if let Some(last_seen) = state.wallet_last_seen.get(&wallet_key) {
            if now - *last_seen < self.wallet_cooldown {
                return GateDecision::Rejected(RejectReason::WalletRateLimited);
            }
        }
        state.wallet_last_seen.insert(wallet_key, now);

        let window = Duration::hours(1);

        if let Some(ip) = ip_address {
            let events = state.ip_events.entry(ip.to_string()).or_default();
            trim_old(events, now, window);
            if events.len() >= self.ip_hourly_limit {
                debug!(ip, "View rejected by IP rate limit");
                return GateDecision::Rejected(RejectReason::IpRateLimited);
            }
            events.push_back(now);
        }

        if let Some(fingerprint) = fingerprint {
            let events = state
                .fingerprint_events
                .entry(fingerprint.to_string())
                .or_default();
            trim_old(events, now, window);
            if events.len() >= self.fingerprint_hourly_limit {
                debug!(fingerprint, "View rejected by fingerprint rate limit");
                return GateDecision::Rejected(RejectReason::FingerprintRateLimited);
            }
            events.push_back(now);
        }

        GateDecision::Accepted
    }
}

/// Drop events that have aged out of the trailing window
fn trim_old(events: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) {
    while let Some(oldest) = events.front() {
        if now - *oldest > window {
            events.pop_front();
        } else {
            break;
        }
    }
}
