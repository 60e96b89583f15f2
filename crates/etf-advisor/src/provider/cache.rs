//! Caching Provider
//!
//! Wraps any [`MarketDataProvider`] with a time-to-live cache. Keys are
//! `market`, `universe` and `instrument:{SYMBOL}`. Only successful
//! responses are stored.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::MarketDataProvider;
use crate::error::Result;
use crate::model::{InstrumentSnapshot, MarketSnapshot};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

const MARKET_KEY: &str = "market";
const UNIVERSE_KEY: &str = "universe";

#[derive(Clone)]
enum Cached {
    Market(MarketSnapshot),
    Universe(Vec<String>),
    Instrument(InstrumentSnapshot),
}

struct Entry {
    value: Cached,
    stored_at: Instant,
}

pub struct CachedProvider<P> {
    inner: P,
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl<P: MarketDataProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub const fn inner(&self) -> &P {
        &self.inner
    }

    pub fn instrument_key(symbol: &str) -> String {
        format!("instrument:{}", symbol.trim().to_uppercase())
    }

    /// Drop one key; returns whether it was present
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries; stale ones linger until the next store
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn lookup(&self, key: &str) -> Option<Cached> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            debug!(key, "Cache hit");
            Some(entry.value.clone())
        } else {
            debug!(key, "Cache entry expired");
            None
        }
    }

    /// Insert a fresh entry and sweep every expired one
    async fn store(&self, key: String, value: Cached) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        if entries.len() < before {
            debug!(evicted = before - entries.len(), "Expired cache entries swept");
        }
        entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CachedProvider<P> {
    async fn market_snapshot(&self) -> Result<MarketSnapshot> {
        if let Some(Cached::Market(snapshot)) = self.lookup(MARKET_KEY).await {
            return Ok(snapshot);
        }
        let snapshot = self.inner.market_snapshot().await?;
        self.store(MARKET_KEY.to_string(), Cached::Market(snapshot.clone())).await;
        Ok(snapshot)
    }

    async fn instrument(&self, symbol: &str) -> Result<InstrumentSnapshot> {
        let key = Self::instrument_key(symbol);
        if let Some(Cached::Instrument(snapshot)) = self.lookup(&key).await {
            return Ok(snapshot);
        }
        let snapshot = self.inner.instrument(symbol).await?;
        self.store(key, Cached::Instrument(snapshot.clone())).await;
        Ok(snapshot)
    }

    async fn universe(&self) -> Result<Vec<String>> {
        if let Some(Cached::Universe(symbols)) = self.lookup(UNIVERSE_KEY).await {
            return Ok(symbols);
        }
        let symbols = self.inner.universe().await?;
        self.store(UNIVERSE_KEY.to_string(), Cached::Universe(symbols.clone())).await;
        Ok(symbols)
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
