//! Environment configuration for window-tail

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Everything window-tail reads from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_cache_addr: String,
    pub source_id: String,
    /// Sent verbatim as the Authorization header when set
    pub auth_token: Option<String>,
    pub interval: Duration,
    pub width: Duration,
    /// Start of the first window; now minus the width when unset
    pub start: Option<DateTime<Utc>>,
    /// Print only envelope timestamps instead of full JSON
    pub print_timestamps: bool,
}

impl Settings {
    const DEFAULT_INTERVAL_SECS: u64 = 60;
    const DEFAULT_WIDTH_SECS: u64 = 60 * 60;
    /// Upper bound for both the interval and the width (one year)
    const MAX_SECS: u64 = 365 * 24 * 60 * 60;

    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let log_cache_addr = required(&var, "LOG_CACHE_ADDR")?;
        let source_id = required(&var, "SOURCE_ID")?;
        let auth_token = var("AUTH_TOKEN").filter(|t| !t.is_empty());

        let interval = Duration::from_secs(
            parse(&var, "WINDOW_INTERVAL_SECS")?.unwrap_or(Self::DEFAULT_INTERVAL_SECS),
        );
        if interval.is_zero() {
            bail!("WINDOW_INTERVAL_SECS must be greater than zero");
        }
        if interval.as_secs() > Self::MAX_SECS {
            bail!("WINDOW_INTERVAL_SECS must be at most {}", Self::MAX_SECS);
        }
        let width =
            Duration::from_secs(parse(&var, "WINDOW_WIDTH_SECS")?.unwrap_or(Self::DEFAULT_WIDTH_SECS));
        if width.as_secs() > Self::MAX_SECS {
            bail!("WINDOW_WIDTH_SECS must be at most {}", Self::MAX_SECS);
        }

        let start = parse::<i64>(&var, "START_TIME")?.map(DateTime::from_timestamp_nanos);
        let print_timestamps = parse(&var, "PRINT_TIMESTAMPS")?.unwrap_or(false);

        Ok(Self {
            log_cache_addr,
            source_id,
            auth_token,
            interval,
            width,
            start,
            print_timestamps,
        })
    }
}

fn required(var: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    var(name)
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{name} environment variable not set"))
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<T>().with_context(|| format!("Invalid {name}: {v}")))
        .transpose()
}
