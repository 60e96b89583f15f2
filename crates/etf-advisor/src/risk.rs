//! Risk Monitor
//!
//! Independent portfolio-level checks over a scored universe and the market
//! snapshot. Every check is additive and silent when its input is missing.

use tracing::debug;

use crate::config::RiskConfig;
use crate::model::{
    AlertDetail, MarketSnapshot, RiskAlert, RiskCategory, ScoredInstrument, Severity, SignalTier,
};

pub struct RiskMonitor<'a> {
    config: &'a RiskConfig,
}

impl<'a> RiskMonitor<'a> {
    pub const fn new(config: &'a RiskConfig) -> Self {
        Self { config }
    }

    /// Run every check; alerts come back grouped by severity, high first.
    pub fn assess(&self, scored: &[ScoredInstrument], market: &MarketSnapshot) -> Vec<RiskAlert> {
        let mut alerts: Vec<RiskAlert> = [
            self.breadth(scored),
            self.valuation(scored),
            self.macro_technical(market),
            self.volatility(market),
        ]
        .into_iter()
        .flatten()
        .collect();

        alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
        debug!(alerts = alerts.len(), "Risk assessment complete");
        alerts
    }

    fn breadth(&self, scored: &[ScoredInstrument]) -> Option<RiskAlert> {
        if scored.is_empty() {
            return None;
        }
        let strong = scored.iter().filter(|s| s.tier == SignalTier::Strong).count();
        let ratio = fraction(strong, scored.len());

        let (severity, threshold) = if ratio < self.config.breadth_high_below {
            (Severity::High, self.config.breadth_high_below)
        } else if ratio < self.config.breadth_medium_below {
            (Severity::Medium, self.config.breadth_medium_below)
        } else {
            return None;
        };

        Some(RiskAlert {
            category: RiskCategory::Breadth,
            severity,
            title: "Few strong opportunities".into(),
            message: format!(
                "Only {:.0}% of analyzed ETFs rate strong; market-wide opportunities are thin, stay selective.",
                ratio * 100.0
            ),
            detail: Some(AlertDetail { observed: ratio, threshold }),
        })
    }

    fn valuation(&self, scored: &[ScoredInstrument]) -> Option<RiskAlert> {
        if scored.is_empty() {
            return None;
        }
        let elevated = scored
            .iter()
            .filter(|s| s.price_level.band >= self.config.valuation_band)
            .count();
        let ratio = fraction(elevated, scored.len());
        if ratio <= self.config.valuation_ceiling {
            return None;
        }

        Some(RiskAlert {
            category: RiskCategory::Valuation,
            severity: Severity::Medium,
            title: "Broadly elevated prices".into(),
            message: format!(
                "{:.0}% of analyzed ETFs trade near the top of their range; consider waiting for a pullback before adding.",
                ratio * 100.0
            ),
            detail: Some(AlertDetail {
                observed: ratio,
                threshold: self.config.valuation_ceiling,
            }),
        })
    }

    fn macro_technical(&self, market: &MarketSnapshot) -> Option<RiskAlert> {
        let momentum = market.valid_momentum()?;
        if momentum <= self.config.overbought_momentum {
            return None;
        }

        Some(RiskAlert {
            category: RiskCategory::MacroTechnical,
            severity: Severity::Medium,
            title: "Market overbought".into(),
            message: format!("Broad-market RSI is {momentum:.1}; a short-term correction is possible."),
            detail: Some(AlertDetail {
                observed: momentum,
                threshold: self.config.overbought_momentum,
            }),
        })
    }

    fn volatility(&self, market: &MarketSnapshot) -> Option<RiskAlert> {
        let vix = market.valid_volatility()?;
        if vix <= self.config.panic_volatility {
            return None;
        }

        Some(RiskAlert {
            category: RiskCategory::Volatility,
            severity: Severity::High,
            title: "Extreme volatility".into(),
            message: format!(
                "The volatility index is {vix:.1}; expect sharp swings and enter in stages."
            ),
            detail: Some(AlertDetail {
                observed: vix,
                threshold: self.config.panic_volatility,
            }),
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn fraction(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{MacroSignal, PriceBand, PriceLevel, SubScores};
    use rust_decimal_macros::dec;

    fn scored(symbol: &str, tier: SignalTier, band: PriceBand) -> ScoredInstrument {
        ScoredInstrument {
            symbol: symbol.into(),
            name: symbol.into(),
            price: dec!(10),
            scores: SubScores {
                fundamental: 50.0,
                technical: 50.0,
                liquidity: 50.0,
                price_level: 50.0,
            },
            final_score: 50.0,
            tier,
            price_level: PriceLevel {
                percentile: 50.0,
                band,
                safety_multiplier: 1.0,
                range_high: None,
                range_low: None,
            },
        }
    }

    fn assess(scored: &[ScoredInstrument], market: &MarketSnapshot) -> Vec<RiskAlert> {
        let config = EngineConfig::standard();
        RiskMonitor::new(&config.risk).assess(scored, market)
    }

    #[test]
    fn test_no_strong_and_panic_volatility() {
        let universe = vec![
            scored("A", SignalTier::Moderate, PriceBand::Mid),
            scored("B", SignalTier::Weak, PriceBand::Low),
        ];
        let alerts = assess(&universe, &MarketSnapshot::new(40.0, 50.0, MacroSignal::Stable));

        assert!(alerts
            .iter()
            .any(|a| a.category == RiskCategory::Breadth && a.severity == Severity::High));
        assert!(alerts
            .iter()
            .any(|a| a.category == RiskCategory::Volatility && a.severity == Severity::High));
        assert!(alerts.windows(2).all(|w| w[0].severity >= w[1].severity));
    }

    #[test]
    fn test_medium_breadth_band() {
        // 1 of 6 strong = 16.7%
        let mut universe = vec![scored("S", SignalTier::Strong, PriceBand::Mid)];
        for i in 0..5 {
            universe.push(scored(&format!("M{i}"), SignalTier::Moderate, PriceBand::Mid));
        }
        let alerts = assess(&universe, &MarketSnapshot::default());

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].category, RiskCategory::Breadth);
        assert_eq!(alerts[0].severity, Severity::Medium);
    }

    #[test]
    fn test_valuation_and_overbought() {
        let universe = vec![
            scored("A", SignalTier::Strong, PriceBand::High),
            scored("B", SignalTier::Strong, PriceBand::VeryHigh),
            scored("C", SignalTier::Strong, PriceBand::VeryHigh),
            scored("D", SignalTier::Strong, PriceBand::Low),
        ];
        let alerts = assess(&universe, &MarketSnapshot::new(15.0, 80.0, MacroSignal::Warming));

        let categories: Vec<_> = alerts.iter().map(|a| a.category).collect();
        assert!(categories.contains(&RiskCategory::Valuation));
        assert!(categories.contains(&RiskCategory::MacroTechnical));
        assert!(alerts.iter().all(|a| a.severity == Severity::Medium));
    }

    #[test]
    fn test_missing_inputs_stay_silent() {
        assert!(assess(&[], &MarketSnapshot::default()).is_empty());

        let garbage = MarketSnapshot {
            volatility_index: Some(f64::INFINITY),
            momentum: Some(250.0),
            ..MarketSnapshot::default()
        };
        assert!(assess(&[], &garbage).is_empty());
    }
}
