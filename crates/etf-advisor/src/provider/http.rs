//! HTTP Gateway Provider
//!
//! Reads pre-computed snapshots from a JSON gateway:
//!
//! - `GET {base}/market` -> [`MarketSnapshot`]
//! - `GET {base}/instruments` -> `["0050", ...]`
//! - `GET {base}/instruments/{symbol}` -> [`InstrumentSnapshot`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::MarketDataProvider;
use crate::error::{AdvisorError, Result};
use crate::model::{InstrumentSnapshot, MarketSnapshot};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpGatewayProvider {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGatewayProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AdvisorError::Config("gateway base URL is empty".into()));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET and decode; `None` when the gateway answers 404
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self.url(path);
        debug!(%url, "Gateway request");

        let res = self.http.get(&url).send().await?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = res.text().await?;
        if !status.is_success() {
            return Err(AdvisorError::Provider(format!("gateway HTTP {status} for {url}: {text}")));
        }
        Ok(Some(serde_json::from_str(&text)?))
    }
}

#[async_trait]
impl MarketDataProvider for HttpGatewayProvider {
    async fn market_snapshot(&self) -> Result<MarketSnapshot> {
        self.get_json("market")
            .await?
            .ok_or_else(|| AdvisorError::Provider("gateway has no market snapshot".into()))
    }

    async fn instrument(&self, symbol: &str) -> Result<InstrumentSnapshot> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AdvisorError::UnsupportedInstrument(symbol));
        }
        self.get_json(&format!("instruments/{symbol}"))
            .await?
            .ok_or(AdvisorError::UnsupportedInstrument(symbol))
    }

    async fn universe(&self) -> Result<Vec<String>> {
        Ok(self.get_json("instruments").await?.unwrap_or_default())
    }

    async fn health_check(&self) -> bool {
        self.http
            .get(self.url("market"))
            .send()
            .await
            .is_ok_and(|res| res.status().is_success())
    }

    fn name(&self) -> &str {
        "http_gateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let provider = HttpGatewayProvider::new("http://gateway.local/api/ ").unwrap();
        assert_eq!(provider.base_url(), "http://gateway.local/api");
        assert_eq!(provider.url("/instruments/0050"), "http://gateway.local/api/instruments/0050");
        assert_eq!(provider.name(), "http_gateway");
    }

    #[test]
    fn test_empty_base_url_is_config_error() {
        let err = HttpGatewayProvider::new("  ").unwrap_err();
        assert!(matches!(err, AdvisorError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_unhealthy() {
        let provider =
            HttpGatewayProvider::with_timeout("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        assert!(!provider.health_check().await);
        assert!(provider.market_snapshot().await.is_err());
    }

    #[tokio::test]
    async fn test_symbol_cannot_escape_instrument_route() {
        let provider =
            HttpGatewayProvider::with_timeout("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        for symbol in ["../market", "0050/../../market", "00 50", "0050?x=1", ""] {
            let err = provider.instrument(symbol).await.unwrap_err();
            assert!(matches!(err, AdvisorError::UnsupportedInstrument(_)), "{symbol:?} reached the gateway");
        }
    }
}
