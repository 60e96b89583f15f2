//! Server Settings
//!
//! Read from the environment after `.env` is loaded.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use etf_advisor::{EngineConfig, FetchOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub preset: String,
    pub config_path: Option<PathBuf>,
    pub gateway_url: Option<String>,
    pub cache_ttl: Duration,
    pub fetch: FetchOptions,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let cache_ttl_secs: u64 = parse_or(get("CACHE_TTL_SECS"), "CACHE_TTL_SECS", 300)?;
        let concurrency: usize = parse_or(get("FETCH_CONCURRENCY"), "FETCH_CONCURRENCY", 10)?;
        let timeout_ms: u64 = parse_or(get("FETCH_TIMEOUT_MS"), "FETCH_TIMEOUT_MS", 5000)?;
        anyhow::ensure!(concurrency > 0, "FETCH_CONCURRENCY must be at least 1");

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            preset: get("ADVISOR_PRESET").unwrap_or_else(|| "standard".into()),
            config_path: get("ADVISOR_CONFIG").map(PathBuf::from),
            gateway_url: get("DATA_GATEWAY_URL"),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            fetch: FetchOptions {
                concurrency,
                timeout: Duration::from_millis(timeout_ms),
            },
        })
    }

    /// Engine configuration: a JSON file wins over the named preset
    pub fn engine_config(&self) -> Result<EngineConfig> {
        match &self.config_path {
            Some(path) => EngineConfig::from_json_file(path)
                .with_context(|| format!("failed to load engine config from {}", path.display())),
            None => EngineConfig::preset(&self.preset).context("invalid ADVISOR_PRESET"),
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.map_or(Ok(default), |v| v.parse().with_context(|| format!("{key} must be a number, got '{v}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).into(), (*v).into())).collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.bind_addr, "0.0.0.0:3000");
        assert_eq!(s.preset, "standard");
        assert_eq!(s.gateway_url, None);
        assert_eq!(s.cache_ttl, Duration::from_secs(300));
        assert_eq!(s.fetch.concurrency, 10);
        assert_eq!(s.fetch.timeout, Duration::from_millis(5000));
        assert!(s.engine_config().is_ok());
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let s = settings(&[
            ("ADVISOR_PRESET", "legacy"),
            ("DATA_GATEWAY_URL", "  "),
            ("FETCH_CONCURRENCY", "4"),
        ])
        .unwrap();
        assert_eq!(s.gateway_url, None);
        assert_eq!(s.fetch.concurrency, 4);
        assert_eq!(s.engine_config().unwrap(), EngineConfig::legacy());
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(settings(&[("CACHE_TTL_SECS", "five")]).is_err());
        assert!(settings(&[("FETCH_CONCURRENCY", "0")]).is_err());
        assert!(settings(&[("ADVISOR_PRESET", "yolo")]).unwrap().engine_config().is_err());
    }
}
