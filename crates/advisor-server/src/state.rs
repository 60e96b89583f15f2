//! Application State

use std::sync::Arc;

use etf_advisor::{FetchOptions, MarketDataProvider, RecommendationEngine};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Stateless engine; safe to share across requests
    pub engine: Arc<RecommendationEngine>,

    /// Market data source (cached)
    pub provider: Arc<dyn MarketDataProvider>,

    /// Batch fetch tuning
    pub fetch: FetchOptions,

    /// Name of the active configuration, for diagnostics
    pub config_name: String,
}
