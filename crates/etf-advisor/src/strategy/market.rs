//! Market Classifier
//!
//! Reads the macro snapshot as a contrarian signal: fear, oversold momentum
//! and a contracting economy all argue for deploying more capital.

use tracing::debug;

use crate::config::ClassifierConfig;
use crate::model::{MarketInputs, MarketScores, MarketSnapshot, MarketStrategy, StrategyLabel};

/// Turns a [`MarketSnapshot`] into a [`MarketStrategy`]. Never fails: invalid
/// or missing indicators fall back to neutral values.
pub struct MarketClassifier<'a> {
    config: &'a ClassifierConfig,
}

impl<'a> MarketClassifier<'a> {
    pub const fn new(config: &'a ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, snapshot: &MarketSnapshot) -> MarketStrategy {
        let cfg = self.config;

        let inputs = MarketInputs {
            volatility_index: snapshot.valid_volatility().unwrap_or(cfg.default_volatility),
            momentum: snapshot.valid_momentum().unwrap_or(cfg.default_momentum),
            macro_signal: snapshot.macro_signal,
            trend: snapshot.trend,
        };

        let volatility = cfg.volatility.score(inputs.volatility_index);
        let momentum = self.momentum_score(&inputs);
        let macro_economic = cfg.macro_score(inputs.macro_signal);

        let total = volatility * cfg.weights.volatility
            + momentum * cfg.weights.momentum
            + macro_economic * cfg.weights.macro_economic;

        let scores = MarketScores {
            volatility,
            momentum,
            macro_economic,
            total,
        };

        let strategies = &cfg.strategies;
        let (label, deployment_ratio) = if total >= strategies.aggressive.min_score {
            (StrategyLabel::Aggressive, strategies.aggressive.deployment_ratio)
        } else if total >= strategies.balanced.min_score {
            (StrategyLabel::Balanced, strategies.balanced.deployment_ratio)
        } else {
            (StrategyLabel::Conservative, strategies.conservative_ratio)
        };

        debug!(
            volatility,
            momentum,
            macro_economic,
            total,
            strategy = %label,
            "Market classified"
        );

        MarketStrategy {
            label,
            deployment_ratio,
            description: describe(label).into(),
            scores,
            inputs,
        }
    }

    fn momentum_score(&self, inputs: &MarketInputs) -> f64 {
        let rsi_score = self.config.momentum.score(inputs.momentum);
        match inputs.trend {
            Some(trend) => {
                let blend = self.config.trend.blend;
                rsi_score * (1.0 - blend) + self.config.trend.score(trend) * blend
            }
            None => rsi_score,
        }
    }
}

fn describe(label: StrategyLabel) -> &'static str {
    match label {
        StrategyLabel::Aggressive => {
            "The market is depressed; deploy capital actively into high-quality ETFs."
        }
        StrategyLabel::Balanced => {
            "The market is in a normal range; allocate in a balanced way and enter in stages."
        }
        StrategyLabel::Conservative => {
            "The market is elevated; stay conservative but keep a modest allocation."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{MacroSignal, Trend};
    use rust_decimal_macros::dec;

    fn classify(snapshot: &MarketSnapshot) -> MarketStrategy {
        let config = EngineConfig::standard();
        MarketClassifier::new(&config.classifier).classify(snapshot)
    }

    #[test]
    fn test_high_volatility_mid_momentum_is_balanced() {
        // 85 * 0.3 + 50 * 0.4 + 50 * 0.3 = 60.5
        let strategy = classify(&MarketSnapshot::new(40.0, 50.0, MacroSignal::Stable));

        assert_eq!(strategy.scores.volatility, 85.0);
        assert_eq!(strategy.scores.momentum, 50.0);
        assert_eq!(strategy.scores.macro_economic, 50.0);
        assert!((strategy.scores.total - 60.5).abs() < 1e-9);
        assert_eq!(strategy.label, StrategyLabel::Balanced);
        assert_eq!(strategy.deployment_ratio, dec!(0.6));
    }

    #[test]
    fn test_panic_and_oversold_is_aggressive() {
        // 85 * 0.3 + (85 * 0.7 + 50 * 0.3) * 0.4 + 80 * 0.3 = 79.3
        let snapshot = MarketSnapshot::new(40.0, 25.0, MacroSignal::Depressed).with_trend(Trend::Flat);
        let strategy = classify(&snapshot);

        assert!((strategy.scores.total - 79.3).abs() < 1e-9);
        assert_eq!(strategy.label, StrategyLabel::Aggressive);
        assert_eq!(strategy.deployment_ratio, dec!(0.8));
    }

    #[test]
    fn test_complacent_overheated_is_conservative_but_deploys() {
        // 30 * 0.3 + 20 * 0.4 + 20 * 0.3 = 23
        let strategy = classify(&MarketSnapshot::new(12.0, 80.0, MacroSignal::Overheated));

        assert_eq!(strategy.label, StrategyLabel::Conservative);
        assert_eq!(strategy.deployment_ratio, dec!(0.4));
    }

    #[test]
    fn test_empty_snapshot_uses_neutral_defaults() {
        let strategy = classify(&MarketSnapshot::default());

        // vix 20 -> 45, rsi 50 -> 50, macro neutral 50
        assert_eq!(strategy.inputs.volatility_index, 20.0);
        assert_eq!(strategy.inputs.momentum, 50.0);
        assert!((strategy.scores.total - 48.5).abs() < 1e-9);
        assert_eq!(strategy.label, StrategyLabel::Balanced);
    }

    #[test]
    fn test_invalid_values_are_replaced() {
        let snapshot = MarketSnapshot {
            volatility_index: Some(f64::NAN),
            momentum: Some(180.0),
            ..MarketSnapshot::default()
        };
        let strategy = classify(&snapshot);

        assert_eq!(strategy.inputs.volatility_index, 20.0);
        assert_eq!(strategy.inputs.momentum, 50.0);
    }

    #[test]
    fn test_trend_blend() {
        let up = classify(&MarketSnapshot::new(18.0, 50.0, MacroSignal::Stable).with_trend(Trend::Up));
        let down = classify(&MarketSnapshot::new(18.0, 50.0, MacroSignal::Stable).with_trend(Trend::Down));

        assert!((up.scores.momentum - 56.0).abs() < 1e-9);
        assert!((down.scores.momentum - 44.0).abs() < 1e-9);
    }
}
