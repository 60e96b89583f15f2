//! Recommendation Engine
//!
//! Pure orchestration of the pipeline:
//! classify market -> score -> allocate -> assess risks -> compose advice.
//! Holds only its configuration, so one instance can serve concurrent
//! requests without coordination.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::advice::{AdviceComposer, AdviceReport};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::{
    InstrumentSnapshot, InvestorProfile, MarketSnapshot, MarketStrategy, Position, RiskAlert, ScoredInstrument,
    SignalTier,
};
use crate::risk::RiskMonitor;
use crate::scoring::InstrumentScorer;
use crate::strategy::{AllocationPlan, Allocator, MarketClassifier};

/// How the input universe was narrowed down
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseSummary {
    /// Snapshots received
    pub analyzed: usize,
    /// Dropped for a missing price or by the profile's selection
    pub excluded: usize,
    /// Scored at or above the qualification floor
    pub qualified: usize,
    pub strong: usize,
}

/// Everything one recommendation cycle produces
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub strategy: MarketStrategy,
    pub plan: AllocationPlan,
    pub advice: AdviceReport,
    pub risk_alerts: Vec<RiskAlert>,
    pub summary: UniverseSummary,
}

impl Recommendation {
    pub fn positions(&self) -> &[Position] {
        &self.plan.positions
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecommendationEngine {
    config: EngineConfig,
}

impl RecommendationEngine {
    /// Build an engine, refusing an invalid configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classify_market(&self, snapshot: &MarketSnapshot) -> MarketStrategy {
        MarketClassifier::new(&self.config.classifier).classify(snapshot)
    }

    /// Score and sort; instruments without a positive price are dropped
    pub fn score_instruments(&self, snapshots: &[InstrumentSnapshot]) -> Vec<ScoredInstrument> {
        InstrumentScorer::new(&self.config.scoring).score_all(snapshots)
    }

    pub fn allocate(
        &self,
        capital: Decimal,
        strategy: &MarketStrategy,
        scored: &[ScoredInstrument],
        count: usize,
    ) -> AllocationPlan {
        Allocator::new(&self.config.allocation).allocate(capital, strategy, scored, count)
    }

    pub fn assess_risks(&self, scored: &[ScoredInstrument], market: &MarketSnapshot) -> Vec<RiskAlert> {
        RiskMonitor::new(&self.config.risk).assess(scored, market)
    }

    pub fn compose_advice(
        &self,
        strategy: &MarketStrategy,
        scored: &[ScoredInstrument],
        alerts: &[RiskAlert],
        profile: &InvestorProfile,
    ) -> AdviceReport {
        AdviceComposer::new(&self.config.advice).compose(strategy, scored, alerts, profile)
    }

    /// Run the whole pipeline for one investor
    pub fn recommend(
        &self,
        profile: &InvestorProfile,
        snapshots: &[InstrumentSnapshot],
        market: &MarketSnapshot,
    ) -> Recommendation {
        let strategy = self.classify_market(market);

        let selected: Vec<InstrumentSnapshot> = snapshots
            .iter()
            .filter(|s| profile.selects(&s.symbol))
            .cloned()
            .collect();
        let scored = self.score_instruments(&selected);

        let plan = self.allocate(profile.available_capital, &strategy, &scored, profile.holdings_count);
        let risk_alerts = self.assess_risks(&scored, market);
        let advice = self.compose_advice(&strategy, &scored, &risk_alerts, profile);

        let floor = self.config.allocation.qualification_floor;
        let summary = UniverseSummary {
            analyzed: snapshots.len(),
            excluded: snapshots.len() - scored.len(),
            qualified: scored.iter().filter(|s| s.final_score >= floor).count(),
            strong: scored.iter().filter(|s| s.tier == SignalTier::Strong).count(),
        };

        info!(
            strategy = %strategy.label,
            analyzed = summary.analyzed,
            qualified = summary.qualified,
            positions = plan.positions.len(),
            alerts = risk_alerts.len(),
            invested = %plan.invested,
            "Recommendation generated"
        );

        Recommendation {
            strategy,
            plan,
            advice,
            risk_alerts,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        FundamentalFacts, LiquidityFacts, MacroSignal, RiskCategory, RiskLevel, StrategyLabel, TechnicalFacts,
    };
    use rust_decimal_macros::dec;

    fn etf(symbol: &str, name: &str, price: Decimal, rsi: f64) -> InstrumentSnapshot {
        InstrumentSnapshot::new(symbol, name, price)
            .with_fundamentals(FundamentalFacts {
                expense_ratio: Some(0.3),
                aum: Some(5e10),
                dividend_yield: Some(0.04),
                sharpe_ratio: Some(0.8),
            })
            .with_technicals(TechnicalFacts {
                rsi: Some(rsi),
                range_high: Some(150.0),
                range_low: Some(10.0),
                ..TechnicalFacts::default()
            })
            .with_liquidity(LiquidityFacts {
                avg_volume: Some(5e6),
                volume_volatility: Some(0.2),
                spread: Some(0.005),
            })
    }

    fn universe() -> Vec<InstrumentSnapshot> {
        vec![
            etf("0050", "Yuanta Taiwan Top 50", dec!(120), 28.0),
            etf("0056", "Yuanta Taiwan High Dividend", dec!(35), 45.0),
            etf("00891", "Cathay Taiwan Semiconductor", dec!(18), 75.0),
            etf("BROKEN", "No Price Fund", Decimal::ZERO, 30.0),
        ]
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let mut config = EngineConfig::standard();
        config.scoring.weights.fundamental = 0.9;
        assert!(RecommendationEngine::new(config).is_err());
        assert!(RecommendationEngine::new(EngineConfig::legacy()).is_ok());

        let mut config = EngineConfig::standard();
        config.scoring.price_level.band_scores[2] = 250.0;
        assert!(RecommendationEngine::new(config).is_err());

        let mut config = EngineConfig::standard();
        config.allocation.fallback_count = 0;
        assert!(RecommendationEngine::new(config).is_err());
    }

    #[test]
    fn test_recommend_end_to_end() {
        let engine = RecommendationEngine::default();
        let profile = InvestorProfile::new(dec!(100000));
        let market = MarketSnapshot::new(40.0, 50.0, MacroSignal::Stable);

        let rec = engine.recommend(&profile, &universe(), &market);

        assert_eq!(rec.strategy.label, StrategyLabel::Balanced);
        assert_eq!(rec.summary.analyzed, 4);
        assert_eq!(rec.summary.excluded, 1);
        assert!(!rec.positions().is_empty());
        assert!(rec.positions().iter().all(|p| p.symbol != "BROKEN" && p.quantity >= 1));
        assert!(rec.plan.invested <= dec!(60000));
        assert!(rec
            .risk_alerts
            .iter()
            .any(|a| a.category == RiskCategory::Volatility));
        assert_ne!(rec.advice.risk_level, RiskLevel::Low);
        assert_eq!(rec.advice.distribution.total(), 3);
    }

    #[test]
    fn test_recommend_respects_selection() {
        let engine = RecommendationEngine::default();
        let profile = InvestorProfile::new(dec!(50000)).with_selection(["0056"]);

        let rec = engine.recommend(&profile, &universe(), &MarketSnapshot::default());

        assert_eq!(rec.summary.excluded, 3);
        assert!(rec.positions().iter().all(|p| p.symbol == "0056"));
    }

    #[test]
    fn test_recommend_with_nothing_is_explained() {
        let engine = RecommendationEngine::default();
        let rec = engine.recommend(&InvestorProfile::new(dec!(0)), &[], &MarketSnapshot::default());

        assert!(rec.positions().is_empty());
        assert!(!rec.plan.notes.is_empty());
        assert_eq!(rec.summary, UniverseSummary::default());
        assert_eq!(rec.advice.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_recommend_is_deterministic() {
        let engine = RecommendationEngine::new(EngineConfig::fundamental_tilt()).unwrap();
        let profile = InvestorProfile::new(dec!(250000)).with_holdings(2);
        let market = MarketSnapshot::default();

        let first = engine.recommend(&profile, &universe(), &market);
        let second = engine.recommend(&profile, &universe(), &market);
        assert_eq!(first, second);
        assert!(first.positions().len() <= 2);
    }
}
