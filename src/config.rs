use std::fmt::Display;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "Pharmasafe";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_RXNORM_URL: &str = "https://rxnav.nlm.nih.gov/REST";
pub const DEFAULT_OPENFDA_URL: &str = "https://api.fda.gov/drug";
pub const DEFAULT_DAILYMED_URL: &str = "https://dailymed.nlm.nih.gov/dailymed/services/v2";

/// One year.
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "pharmasafe=info,tower_http=info"
}

/// User agent sent to every upstream drug reference API.
pub fn user_agent() -> String {
    format!("pharmasafe/{APP_VERSION}")
}

/// Runtime configuration. Every field has a default and an env override.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub rxnorm_base_url: String,
    pub openfda_base_url: String,
    pub dailymed_base_url: String,
    #[serde(skip_serializing)]
    pub openfda_api_key: Option<String>,
    /// Timeout for RxNorm and DailyMed requests.
    pub http_timeout_secs: u64,
    /// OpenFDA is slower; it gets its own timeout.
    pub openfda_timeout_secs: u64,
    pub http_retries: u32,
    pub retry_delay_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub cache_sweep_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5050)),
            rxnorm_base_url: DEFAULT_RXNORM_URL.to_string(),
            openfda_base_url: DEFAULT_OPENFDA_URL.to_string(),
            dailymed_base_url: DEFAULT_DAILYMED_URL.to_string(),
            openfda_api_key: None,
            http_timeout_secs: 15,
            openfda_timeout_secs: 20,
            http_retries: 3,
            retry_delay_ms: 1000,
            cache_ttl_secs: 24 * 60 * 60,
            cache_max_entries: 1000,
            cache_sweep_secs: 60 * 60,
        }
    }
}

impl AppConfig {
    /// Build configuration from `PHARMASAFE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (env, test map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("PHARMASAFE_BIND_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.bind_addr = parsed,
                Err(e) => tracing::warn!(value = %addr, error = %e, "Ignoring invalid PHARMASAFE_BIND_ADDR"),
            }
        }
        if let Some(url) = lookup("PHARMASAFE_RXNORM_URL") {
            config.rxnorm_base_url = url;
        }
        if let Some(url) = lookup("PHARMASAFE_OPENFDA_URL") {
            config.openfda_base_url = url;
        }
        if let Some(url) = lookup("PHARMASAFE_DAILYMED_URL") {
            config.dailymed_base_url = url;
        }
        config.openfda_api_key = lookup("PHARMASAFE_OPENFDA_API_KEY").filter(|k| !k.is_empty());

        override_number(&lookup, "PHARMASAFE_HTTP_TIMEOUT_SECS", 1..=300, &mut config.http_timeout_secs);
        override_number(&lookup, "PHARMASAFE_OPENFDA_TIMEOUT_SECS", 1..=300, &mut config.openfda_timeout_secs);
        override_number(&lookup, "PHARMASAFE_HTTP_RETRIES", 1..=10, &mut config.http_retries);
        override_number(&lookup, "PHARMASAFE_RETRY_DELAY_MS", 0..=60_000, &mut config.retry_delay_ms);
        override_number(&lookup, "PHARMASAFE_CACHE_TTL_SECS", 1..=MAX_CACHE_TTL_SECS, &mut config.cache_ttl_secs);
        override_number(&lookup, "PHARMASAFE_CACHE_MAX_ENTRIES", 1..=1_000_000, &mut config.cache_max_entries);
        override_number(&lookup, "PHARMASAFE_CACHE_SWEEP_SECS", 1..=86_400, &mut config.cache_sweep_secs);

        config
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn openfda_timeout(&self) -> Duration {
        Duration::from_secs(self.openfda_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_secs)
    }
}

fn override_number<F, T>(lookup: &F, key: &str, range: RangeInclusive<T>, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Display,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if range.contains(&value) => *target = value,
        Ok(_) => tracing::warn!(
            key,
            value = %raw,
            min = %range.start(),
            max = %range.end(),
            "Ignoring out-of-range numeric override"
        ),
        Err(_) => tracing::warn!(key, value = %raw, "Ignoring unparseable numeric override"),
    }
}
