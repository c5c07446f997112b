use anyhow::Result;
use config::{Config, Environment, File};
use core_logic::{ConfigError, RetryConfig, SchedulingMode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// One step of the per-wallet sequence. Steps always run in the order of [`TaskKind::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    CheckIn,
    SubmitProof,
    ClaimProofPoints,
    /// Status check, stop when running, then (re)connect.
    NodeCycle,
    ClaimLightNodePoints,
    CheckPoints,
}

impl TaskKind {
    pub const ALL: [TaskKind; 6] = [
        TaskKind::CheckIn,
        TaskKind::SubmitProof,
        TaskKind::ClaimProofPoints,
        TaskKind::NodeCycle,
        TaskKind::ClaimLightNodePoints,
        TaskKind::CheckPoints,
    ];
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReferralSettings {
    /// Attempts for the verify + register pair.
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    /// Random pause between wallets in sequential mode.
    pub min_pause_secs: u64,
    pub max_pause_secs: u64,
}

impl Default for ReferralSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_secs: 5,
            min_pause_secs: 10,
            max_pause_secs: 30,
        }
    }
}

/// Configuration for the LayerEdge bot and referral tool.
///
/// Every field has a default, so the TOML file is optional. `LAYEREDGE_*`
/// environment variables override file values (e.g. `LAYEREDGE_CYCLE_INTERVAL_SECS`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayerEdgeConfig {
    pub api_base_url: String,
    pub ip_check_url: String,
    pub wallet_file: String,
    pub proxy_file: String,
    /// Pause between full cycles (12h by default).
    pub cycle_interval_secs: u64,
    pub scheduling_mode: SchedulingMode,
    pub task_set: Vec<TaskKind>,
    pub request_timeout_secs: u64,
    /// Soft deadline for proof submission and proof-point claims; 0 disables it.
    pub proof_deadline_secs: u64,
    pub show_public_ip: bool,
    /// Attach a fresh session id to each wallet's proxy.
    pub rotate_sessions: bool,
    pub retry: RetryConfig,
    pub referral: ReferralSettings,
    pub headers: BTreeMap<String, String>,
    pub referral_headers: BTreeMap<String, String>,
}

impl Default for LayerEdgeConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://referralapi.layeredge.io/api".to_string(),
            ip_check_url: "https://api.ipify.org?format=json".to_string(),
            wallet_file: "config.json".to_string(),
            proxy_file: "proxy.txt".to_string(),
            cycle_interval_secs: 12 * 60 * 60,
            scheduling_mode: SchedulingMode::Sequential,
            task_set: TaskKind::ALL.to_vec(),
            request_timeout_secs: 60,
            proof_deadline_secs: 5 * 60,
            show_public_ip: true,
            rotate_sessions: true,
            retry: RetryConfig::default(),
            referral: ReferralSettings::default(),
            headers: dashboard_headers("https://layeredge.io"),
            referral_headers: referral_headers(),
        }
    }
}

impl LayerEdgeConfig {
    /// Loads `path` (if present) overlaid with `LAYEREDGE_*` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let mut builder = Config::builder();
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path));
        } else {
            warn!("Config file {} not found, using defaults", path);
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("LAYEREDGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize().map_err(|e| anyhow::anyhow!(e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.referral.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "referral.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.task_set.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "task_set".to_string(),
                reason: "at least one task is required".to_string(),
            });
        }
        if self.referral.min_pause_secs > self.referral.max_pause_secs {
            return Err(ConfigError::InvalidValue {
                field: "referral.min_pause_secs".to_string(),
                reason: format!(
                    "{} is greater than max_pause_secs {}",
                    self.referral.min_pause_secs, self.referral.max_pause_secs
                ),
            });
        }
        Ok(())
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn proof_deadline(&self) -> Option<Duration> {
        (self.proof_deadline_secs > 0).then(|| Duration::from_secs(self.proof_deadline_secs))
    }
}

/// Parses the interactive wallet count. Zero and non-numbers are rejected.
pub fn parse_wallet_count(input: &str) -> Result<usize, ConfigError> {
    let count: usize = input
        .trim()
        .parse()
        .map_err(|source| ConfigError::ParseError {
            field: "wallet_count".to_string(),
            source,
        })?;
    if count == 0 {
        return Err(ConfigError::InvalidValue {
            field: "wallet_count".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(count)
}

fn header_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Browser-like header set sent with every campaign call.
pub fn dashboard_headers(origin: &str) -> BTreeMap<String, String> {
    let referer = format!("{}/", origin.trim_end_matches('/'));
    header_map(&[
        ("Accept", "application/json, text/plain, */*"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Origin", origin),
        ("Referer", &referer),
        ("Sec-Fetch-Dest", "empty"),
        ("Sec-Fetch-Mode", "cors"),
        ("Sec-Fetch-Site", "same-site"),
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        ),
        ("sec-ch-ua", "\"Not A(Brand\";v=\"99\", \"Google Chrome\";v=\"121\", \"Chromium\";v=\"121\""),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", "\"Windows\""),
    ])
}

/// Header set used by the referral registration endpoints.
pub fn referral_headers() -> BTreeMap<String, String> {
    header_map(&[
        ("Accept", "application/json, text/plain, */*"),
        ("Accept-Encoding", "gzip, deflate, br, zstd"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Content-Type", "application/json"),
        ("Origin", "https://dashboard.layeredge.io"),
        ("Referer", "https://dashboard.layeredge.io/"),
        ("Sec-CH-UA", "\"Not A(Brand\";v=\"8\", \"Chromium\";v=\"132\", \"Microsoft Edge\";v=\"132\""),
        ("Sec-CH-UA-Mobile", "?0"),
        ("Sec-CH-UA-Platform", "\"Windows\""),
        ("Sec-Fetch-Dest", "empty"),
        ("Sec-Fetch-Mode", "cors"),
        ("Sec-Fetch-Site", "same-site"),
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36 Edg/132.0.0.0",
        ),
    ])
}
