//! Layered runtime configuration: built-in defaults, then an optional TOML
//! file, then environment variables. Command-line flags are applied last by
//! `main`.

use anyhow::{bail, Context};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sync_application::SyncSettings;
use sync_infrastructure::{JitterRateLimiterConfig, RateLimitWindow, TushareConfig};

pub const ENV_TOKEN: &str = "TUSHARE_TOKEN";
pub const ENV_API_URL: &str = "TUSHARE_API_URL";
pub const ENV_DATA_DIR: &str = "ASHARE_DATA_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Tushare,
    Mock,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub provider: Provider,
    pub tushare: TushareConfig,
    pub rate_limit: JitterRateLimiterConfig,
    pub sync: SyncSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            provider: Provider::default(),
            tushare: TushareConfig::default(),
            rate_limit: JitterRateLimiterConfig::default(),
            sync: SyncSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    provider: Option<Provider>,
    tushare: TushareSection,
    rate_limit: RateLimitSection,
    sync: SyncSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TushareSection {
    token: Option<String>,
    api_url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_backoff_secs: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RateLimitSection {
    delay_secs: Option<f64>,
    jitter_secs: Option<f64>,
    calls_per_minute: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SyncSection {
    default_days: Option<u32>,
    max_consecutive_failures: Option<u32>,
    cooldown_secs: Option<u64>,
    health_check_interval: Option<usize>,
    checkpoint_interval: Option<usize>,
    heartbeat_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Defaults, overlaid with `path` when given, then with the process
    /// environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(path) = path {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            config
                .apply_toml(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?;
        }

        if let Some(token) = env(ENV_TOKEN).filter(|v| !v.trim().is_empty()) {
            config.tushare.token = token.trim().to_string();
        }
        if let Some(url) = env(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.tushare.api_url = url.trim().to_string();
        }
        if let Some(dir) = env(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    fn apply_toml(&mut self, raw: &str) -> anyhow::Result<()> {
        let file: FileConfig = toml::from_str(raw)?;

        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(provider) = file.provider {
            self.provider = provider;
        }

        let tushare = file.tushare;
        if let Some(token) = tushare.token {
            self.tushare.token = token;
        }
        if let Some(url) = tushare.api_url {
            self.tushare.api_url = url;
        }
        if let Some(secs) = tushare.timeout_secs {
            self.tushare.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = tushare.max_retries {
            self.tushare.max_retries = retries;
        }
        if let Some(secs) = tushare.retry_backoff_secs {
            self.tushare.retry_backoff = seconds(secs, "tushare.retry_backoff_secs")?;
        }

        let rate_limit = file.rate_limit;
        if let Some(secs) = rate_limit.delay_secs {
            self.set_delay(secs)?;
        }
        if let Some(secs) = rate_limit.jitter_secs {
            self.rate_limit.jitter = seconds(secs, "rate_limit.jitter_secs")?;
        }
        if let Some(limit) = rate_limit.calls_per_minute {
            self.rate_limit.windows = vec![RateLimitWindow::new(limit, 60)];
        }

        let sync = file.sync;
        if let Some(days) = sync.default_days {
            self.sync.default_days = days;
        }
        if let Some(max) = sync.max_consecutive_failures {
            self.sync.max_consecutive_failures = max;
        }
        if let Some(secs) = sync.cooldown_secs {
            self.sync.cooldown = Duration::from_secs(secs);
        }
        if let Some(every) = sync.health_check_interval {
            self.sync.health_check_interval = every;
        }
        if let Some(every) = sync.checkpoint_interval {
            self.sync.checkpoint_interval = every;
        }
        if let Some(secs) = sync.heartbeat_timeout_secs {
            self.sync.heartbeat_timeout = Duration::from_secs(secs);
        }

        Ok(())
    }

    /// Base pause between upstream calls, as given by `--delay`.
    pub fn set_delay(&mut self, secs: f64) -> anyhow::Result<()> {
        self.rate_limit.base_delay = seconds(secs, "delay")?;
        Ok(())
    }

    pub fn require_token(&self) -> anyhow::Result<()> {
        if self.provider == Provider::Tushare && self.tushare.token.trim().is_empty() {
            bail!("{ENV_TOKEN} is not set; export it or add [tushare] token to the config file");
        }
        Ok(())
    }
}

fn seconds(value: f64, name: &str) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("{name} must be a non-negative number of seconds, got {value}"))
}
