use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Platform configuration, read once at startup (no reload)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiftConfig {
    /// Ledger gateway base URL
    #[serde(default = "default_ledger_address")]
    pub ledger_address: String,
    /// API token for the ledger gateway (empty for public nodes)
    #[serde(default)]
    pub ledger_token: String,
    /// Platform treasury wallet address
    #[serde(default)]
    pub platform_wallet: String,

    /// Fungible token asset identifier on the ledger
    #[serde(default)]
    pub asset_id: u64,
    /// Settlement program (application) identifier, 0 when not deployed
    #[serde(default)]
    pub app_id: u64,
    /// Decimal precision of the token
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,
    /// Platform fee in basis points, deducted from gross settlements
    #[serde(default = "default_settlement_fee_bps")]
    pub settlement_fee_bps: u32,
    /// Route video-ad settlements through the on-chain program
    #[serde(default)]
    pub use_contract_settlement: bool,

    /// Minutes between reward settlement passes
    #[serde(default = "default_reward_interval_minutes")]
    pub reward_interval_minutes: u64,
    /// Master switch for the background scheduler
    #[serde(default = "default_true")]
    pub scheduler_enabled: bool,

    /// Minimum watch time for a view to be creditable
    #[serde(default = "default_min_watch_seconds")]
    pub view_min_watch_seconds: u32,
    /// Cooldown between accepted views from the same wallet on the same video
    #[serde(default = "default_wallet_cooldown_seconds")]
    pub view_wallet_cooldown_seconds: u64,
    /// Accepted views allowed per IP in a trailing hour
    #[serde(default = "default_ip_hourly_limit")]
    pub view_ip_hourly_limit: usize,
    /// Accepted views allowed per device fingerprint in a trailing hour
    #[serde(default = "default_fingerprint_hourly_limit")]
    pub view_fingerprint_hourly_limit: usize,

    /// Request timeout for ledger gateway calls, in seconds
    #[serde(default = "default_ledger_timeout_seconds")]
    pub ledger_timeout_seconds: u64,
    /// Confirmation polls before a broadcast transaction counts as timed out
    #[serde(default = "default_confirmation_rounds")]
    pub ledger_confirmation_rounds: u32,
}

fn default_ledger_address() -> String {
    "https://testnet-api.algonode.cloud".to_string()
}

fn default_token_decimals() -> u8 {
    6
}

fn default_settlement_fee_bps() -> u32 {
    200
}

fn default_reward_interval_minutes() -> u64 {
    60
}

fn default_min_watch_seconds() -> u32 {
    30
}

fn default_wallet_cooldown_seconds() -> u64 {
    3600
}

fn default_ip_hourly_limit() -> usize {
    120
}

fn default_fingerprint_hourly_limit() -> usize {
    60
}

fn default_ledger_timeout_seconds() -> u64 {
    10
}

fn default_confirmation_rounds() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

impl Default for RiftConfig {
    fn default() -> Self {
        Self {
            ledger_address: default_ledger_address(),
            ledger_token: String::new(),
            platform_wallet: String::new(),
            asset_id: 0,
            app_id: 0,
            token_decimals: default_token_decimals(),
            settlement_fee_bps: default_settlement_fee_bps(),
            use_contract_settlement: false,
            reward_interval_minutes: default_reward_interval_minutes(),
            scheduler_enabled: default_true(),
            view_min_watch_seconds: default_min_watch_seconds(),
            view_wallet_cooldown_seconds: default_wallet_cooldown_seconds(),
            view_ip_hourly_limit: default_ip_hourly_limit(),
            view_fingerprint_hourly_limit: default_fingerprint_hourly_limit(),
            ledger_timeout_seconds: default_ledger_timeout_seconds(),
            ledger_confirmation_rounds: default_confirmation_rounds(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .unwrap_or(fallback)
}

fn env_bool(key: &str, fallback: bool) -> bool {
    match env::var(key) {
        Ok(raw) => matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => fallback,
    }
}

impl RiftConfig {
    /// Load configuration from the environment (and a `.env` file if present)
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();
        Self {
            ledger_address: env::var("LEDGER_ADDRESS").unwrap_or(defaults.ledger_address),
            ledger_token: env::var("LEDGER_TOKEN").unwrap_or(defaults.ledger_token),
            platform_wallet: env::var("PLATFORM_WALLET").unwrap_or(defaults.platform_wallet),
            asset_id: env_or("ASSET_ID", defaults.asset_id),
            app_id: env_or("APP_ID", defaults.app_id),
            token_decimals: env_or("TOKEN_DECIMALS", defaults.token_decimals),
            settlement_fee_bps: env_or("SETTLEMENT_FEE_BPS", defaults.settlement_fee_bps),
            use_contract_settlement: env_bool(
                "USE_CONTRACT_SETTLEMENT",
                defaults.use_contract_settlement,
            ),
            reward_interval_minutes: env_or(
                "REWARD_INTERVAL_MINUTES",
                defaults.reward_interval_minutes,
            ),
            scheduler_enabled: env_bool("SCHEDULER_ENABLED", defaults.scheduler_enabled),
            view_min_watch_seconds: env_or(
                "VIEW_MIN_WATCH_SECONDS",
                defaults.view_min_watch_seconds,
            ),
            view_wallet_cooldown_seconds: env_or(
                "VIEW_WALLET_COOLDOWN_SECONDS",
                defaults.view_wallet_cooldown_seconds,
            ),
            view_ip_hourly_limit: env_or("VIEW_IP_HOURLY_LIMIT", defaults.view_ip_hourly_limit),
            view_fingerprint_hourly_limit: env_or(
                "VIEW_FINGERPRINT_HOURLY_LIMIT",
                defaults.view_fingerprint_hourly_limit,
            ),
            ledger_timeout_seconds: env_or(
                "LEDGER_TIMEOUT_SECONDS",
                defaults.ledger_timeout_seconds,
            ),
            ledger_confirmation_rounds: env_or(
                "LEDGER_CONFIRMATION_ROUNDS",
                defaults.ledger_confirmation_rounds,
            ),
        }
    }
}
