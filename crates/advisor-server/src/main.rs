//! ETF Advisor HTTP Server
//!
//! Axum-based server exposing the recommendation engine as a JSON API.
//! Market data comes from a JSON gateway when `DATA_GATEWAY_URL` is set,
//! otherwise from the built-in mock provider.

mod handlers;
mod settings;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use etf_advisor::{
    CachedProvider, HttpGatewayProvider, MarketDataProvider, MockMarketDataProvider, RecommendationEngine,
};

use crate::handlers::{get_etf, health_check, list_etfs, market_overview, recommendation};
use crate::settings::Settings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    // Engine
    let engine = RecommendationEngine::new(settings.engine_config()?)?;
    let config_name = settings
        .config_path
        .as_ref()
        .map_or_else(|| settings.preset.clone(), |p| p.display().to_string());
    tracing::info!("✓ Engine configured: {}", config_name);

    // Market data provider, cached
    let provider: Arc<dyn MarketDataProvider> = match &settings.gateway_url {
        Some(url) => Arc::new(CachedProvider::with_ttl(
            HttpGatewayProvider::with_timeout(url, settings.fetch.timeout)?,
            settings.cache_ttl,
        )),
        None => {
            tracing::warn!("⚠ DATA_GATEWAY_URL not set - serving mock market data");
            Arc::new(CachedProvider::with_ttl(MockMarketDataProvider::new(), settings.cache_ttl))
        }
    };

    if provider.health_check().await {
        tracing::info!("✓ Connected to market data provider: {}", provider.name());
    } else {
        tracing::warn!("⚠ Market data provider {} not reachable - requests may fail", provider.name());
    }

    // Build application state
    let state = AppState {
        engine: Arc::new(engine),
        provider,
        fetch: settings.fetch,
        config_name,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/market-overview", get(market_overview))
        .route("/api/etfs", get(list_etfs))
        .route("/api/etf/{symbol}", get(get_etf))
        .route("/api/recommendation", post(recommendation))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 etf-advisor server running on http://{}", settings.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health               - Health check");
    tracing::info!("  GET  /api/market-overview  - Market snapshot and strategy");
    tracing::info!("  GET  /api/etfs             - Scored ETF universe");
    tracing::info!("  GET  /api/etf/{{symbol}}     - Single scored ETF");
    tracing::info!("  POST /api/recommendation   - Allocation for an investor profile");

    axum::serve(listener, app).await?;

    Ok(())
}
