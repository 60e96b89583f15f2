//! Market Data Providers
//!
//! Abstractions and implementations for the market data collaborator that
//! feeds the engine. The engine itself never calls these; callers fetch,
//! then hand the results to [`crate::RecommendationEngine`].

mod cache;
mod http;
mod mock;

pub use cache::{CachedProvider, DEFAULT_CACHE_TTL};
pub use http::HttpGatewayProvider;
pub use mock::MockMarketDataProvider;

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{InstrumentSnapshot, MarketSnapshot};

/// Market data provider trait (Strategy pattern)
///
/// Implement this for each data source: a JSON gateway, a broker API, a
/// fixture set, etc.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Current macro snapshot; partial data is fine
    async fn market_snapshot(&self) -> Result<MarketSnapshot>;

    /// Facts for a single instrument
    async fn instrument(&self, symbol: &str) -> Result<InstrumentSnapshot>;

    /// Symbols this provider can serve
    async fn universe(&self) -> Result<Vec<String>>;

    /// Check if the source is reachable
    async fn health_check(&self) -> bool;

    /// Provider name
    fn name(&self) -> &str;
}

/// Batch fetch tuning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    /// Maximum requests in flight
    pub concurrency: usize,

    /// Per-instrument deadline
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: 10,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Fetch many instruments with bounded concurrency.
///
/// Failures and timeouts are logged and skipped, so the result may hold
/// fewer snapshots than requested and in any order.
pub async fn fetch_instruments<P>(
    provider: &P,
    symbols: &[String],
    options: FetchOptions,
) -> Vec<InstrumentSnapshot>
where
    P: MarketDataProvider + ?Sized,
{
    let snapshots: Vec<InstrumentSnapshot> = stream::iter(symbols.iter().cloned())
        .map(|symbol: String| async move {
            match tokio::time::timeout(options.timeout, provider.instrument(&symbol)).await {
                Ok(Ok(snapshot)) => Some(snapshot),
                Ok(Err(e)) => {
                    warn!(%symbol, error = %e, "Instrument fetch failed");
                    None
                }
                Err(_) => {
                    warn!(%symbol, timeout_ms = options.timeout.as_millis(), "Instrument fetch timed out");
                    None
                }
            }
        })
        .buffer_unordered(options.concurrency.max(1))
        .filter_map(|snapshot| async move { snapshot })
        .collect()
        .await;

    info!(
        provider = provider.name(),
        requested = symbols.len(),
        fetched = snapshots.len(),
        "Instrument batch fetched"
    );
    snapshots
}

/// Fetch every instrument the provider knows about
pub async fn fetch_universe<P>(provider: &P, options: FetchOptions) -> Result<Vec<InstrumentSnapshot>>
where
    P: MarketDataProvider + ?Sized,
{
    let symbols = provider.universe().await?;
    Ok(fetch_instruments(provider, &symbols, options).await)
}
