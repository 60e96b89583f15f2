//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use etf_advisor::{
    AdvisorError, InvestorProfile, MarketSnapshot, MarketStrategy, Recommendation, ScoredInstrument,
    fetch_instruments,
};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub config: String,
}

#[derive(Debug, Serialize)]
pub struct MarketOverviewResponse {
    pub snapshot: MarketSnapshot,
    pub strategy: MarketStrategy,
}

#[derive(Debug, Serialize)]
pub struct EtfListResponse {
    pub count: usize,
    pub etfs: Vec<ScoredInstrument>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub recommendation: Recommendation,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(err: &AdvisorError) -> ApiError {
    let status = match err {
        AdvisorError::InvalidProfile(_) => StatusCode::BAD_REQUEST,
        AdvisorError::UnsupportedInstrument(_) | AdvisorError::PriceUnavailable(_) => StatusCode::NOT_FOUND,
        AdvisorError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        AdvisorError::Provider(_) | AdvisorError::Network(_) | AdvisorError::Serialization(_) => {
            StatusCode::BAD_GATEWAY
        }
        AdvisorError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: err.code().to_uppercase(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
        provider_connected: state.provider.health_check().await,
        config: state.config_name.clone(),
    })
}

/// Current market snapshot and the strategy it implies
pub async fn market_overview(State(state): State<AppState>) -> ApiResult<MarketOverviewResponse> {
    let snapshot = state.provider.market_snapshot().await.map_err(|e| api_error(&e))?;
    let strategy = state.engine.classify_market(&snapshot);

    Ok(Json(MarketOverviewResponse { snapshot, strategy }))
}

/// The whole universe, scored and sorted
pub async fn list_etfs(State(state): State<AppState>) -> ApiResult<EtfListResponse> {
    let symbols = state.provider.universe().await.map_err(|e| api_error(&e))?;
    let snapshots = fetch_instruments(state.provider.as_ref(), &symbols, state.fetch).await;
    let etfs = state.engine.score_instruments(&snapshots);

    Ok(Json(EtfListResponse {
        count: etfs.len(),
        etfs,
    }))
}

/// One scored instrument
pub async fn get_etf(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<ScoredInstrument> {
    let snapshot = state.provider.instrument(&symbol).await.map_err(|e| api_error(&e))?;
    state
        .engine
        .score_instruments(std::slice::from_ref(&snapshot))
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| api_error(&AdvisorError::PriceUnavailable(snapshot.symbol)))
}

/// Full recommendation for a loosely-typed investor profile
pub async fn recommendation(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<RecommendationResponse> {
    let profile = InvestorProfile::from_json(&body).map_err(|e| api_error(&e))?;

    let market = match state.provider.market_snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "Market snapshot unavailable, using neutral defaults");
            MarketSnapshot::default()
        }
    };

    let symbols = if profile.selected_symbols.is_empty() {
        state.provider.universe().await.map_err(|e| api_error(&e))?
    } else {
        profile.selected_symbols.clone()
    };
    let snapshots = fetch_instruments(state.provider.as_ref(), &symbols, state.fetch).await;

    let recommendation = state.engine.recommend(&profile, &snapshots, &market);

    Ok(Json(RecommendationResponse {
        id: uuid::Uuid::new_v4().to_string(),
        generated_at: Utc::now(),
        recommendation,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use etf_advisor::{FetchOptions, MacroSignal, MockMarketDataProvider, RecommendationEngine, StrategyLabel};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn state(provider: MockMarketDataProvider) -> AppState {
        AppState {
            engine: Arc::new(RecommendationEngine::default()),
            provider: Arc::new(provider),
            fetch: FetchOptions::default(),
            config_name: "standard".into(),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let Json(health) = health_check(State(state(MockMarketDataProvider::new()))).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.provider, "mock");
        assert!(health.provider_connected);
    }

    #[tokio::test]
    async fn test_market_overview_classifies_snapshot() {
        let provider = MockMarketDataProvider::new().with_market(MarketSnapshot::new(
            40.0,
            25.0,
            MacroSignal::Depressed,
        ));
        let Json(overview) = market_overview(State(state(provider))).await.unwrap();
        assert_eq!(overview.strategy.label, StrategyLabel::Aggressive);
    }

    #[tokio::test]
    async fn test_list_and_single_etf() {
        let app = state(MockMarketDataProvider::new());

        let Json(list) = list_etfs(State(app.clone())).await.unwrap();
        assert_eq!(list.count, 10);
        assert!(list.etfs.windows(2).all(|w| w[0].final_score >= w[1].final_score));

        let Json(single) = get_etf(State(app.clone()), Path("0056".into())).await.unwrap();
        assert_eq!(single.symbol, "0056");

        let (status, Json(body)) = get_etf(State(app), Path("NOPE".into())).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "UNSUPPORTED_INSTRUMENT");
    }

    #[tokio::test]
    async fn test_recommendation_round_trip() {
        let app = state(MockMarketDataProvider::new().with_failures(["00929"]));
        let body = json!({"available_capital": "200000", "holdings_count": 3});

        let Json(response) = recommendation(State(app), Json(body)).await.unwrap();
        let rec = &response.recommendation;

        assert!(!response.id.is_empty());
        assert!(rec.positions().len() <= 3);
        assert!(rec.plan.invested <= rec.plan.deployable);
        assert!(rec.plan.invested > Decimal::ZERO);
        assert_eq!(rec.summary.analyzed, 9);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("strategy").is_some());
        assert!(json.get("generated_at").is_some());
    }

    #[tokio::test]
    async fn test_recommendation_rejects_bad_profile() {
        let app = state(MockMarketDataProvider::new());
        let (status, Json(body)) = recommendation(State(app), Json(json!({"available_capital": "lots"})))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "INVALID_PROFILE");
    }
}
