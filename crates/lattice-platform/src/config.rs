use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_EVENTS_CHANNEL: &str = "proposals.status_changed";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub redis_url: Option<String>,
    pub events_channel: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_secs(5),
            http_timeout: Duration::from_secs(30),
            redis_url: None,
            events_channel: DEFAULT_EVENTS_CHANNEL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let api_url = lookup("LATTICE_API_URL")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.api_url);
        let poll_interval = lookup("LATTICE_POLL_INTERVAL_SECS")
            .map(|raw| parse_secs("LATTICE_POLL_INTERVAL_SECS", &raw))
            .transpose()?
            .unwrap_or(defaults.poll_interval);
        let http_timeout = lookup("LATTICE_HTTP_TIMEOUT_SECS")
            .map(|raw| parse_secs("LATTICE_HTTP_TIMEOUT_SECS", &raw))
            .transpose()?
            .unwrap_or(defaults.http_timeout);
        let redis_url = lookup("REDIS_URL").filter(|value| !value.trim().is_empty());
        let events_channel =
            lookup("LATTICE_EVENTS_CHANNEL").unwrap_or(defaults.events_channel);

        Ok(Self {
            api_url,
            poll_interval,
            http_timeout,
            redis_url,
            events_channel,
        })
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds"))?;
    if secs == 0 {
        anyhow::bail!("{key} must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn falls_back_to_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("LATTICE_API_URL", "https://api.example.test/"),
            ("LATTICE_POLL_INTERVAL_SECS", "2"),
            ("REDIS_URL", "redis://127.0.0.1/"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://api.example.test");
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1/"));
    }

    #[test]
    fn rejects_zero_interval() {
        let err = ClientConfig::from_lookup(lookup(&[("LATTICE_POLL_INTERVAL_SECS", "0")]));
        assert!(err.is_err());
    }
}
