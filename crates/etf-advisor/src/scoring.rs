//! Instrument Scorer
//!
//! Four sub-scores on a 0-100 scale (fundamental, technical, liquidity and
//! price level) combined into a weighted final score and a signal tier.
//!
//! Missing facts never fail scoring: the affected component takes the
//! neutral score and the rest of the computation carries on. The only
//! exclusion rule is price: without a positive price an instrument cannot
//! be allocated, so it is dropped from the output.

use tracing::{debug, warn};

use crate::config::ScoringConfig;
use crate::model::{
    FundamentalFacts, InstrumentSnapshot, LiquidityFacts, PriceLevel, ScoredInstrument, SubScores,
    TechnicalFacts, to_f64,
};

pub struct InstrumentScorer<'a> {
    config: &'a ScoringConfig,
}

impl<'a> InstrumentScorer<'a> {
    pub const fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Score a batch, sorted by final score descending then symbol ascending
    pub fn score_all(&self, snapshots: &[InstrumentSnapshot]) -> Vec<ScoredInstrument> {
        let mut scored: Vec<ScoredInstrument> = snapshots.iter().filter_map(|s| self.score(s)).collect();

        scored.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        debug!(
            input = snapshots.len(),
            scored = scored.len(),
            "Scored instrument batch"
        );
        scored
    }

    /// Score one instrument; `None` when it has no positive price
    pub fn score(&self, snapshot: &InstrumentSnapshot) -> Option<ScoredInstrument> {
        let Some(price) = snapshot.tradable_price() else {
            warn!(symbol = %snapshot.symbol, price = ?snapshot.price, "Excluding instrument without a positive price");
            return None;
        };
        let price_f64 = to_f64(price);

        let price_level = self.price_level(&snapshot.technicals, price_f64);
        let scores = SubScores {
            fundamental: round_score(self.fundamental_score(&snapshot.fundamentals)),
            technical: round_score(self.technical_score(&snapshot.technicals, price_f64)),
            liquidity: round_score(self.liquidity_score(&snapshot.liquidity)),
            price_level: self.config.price_level.score(price_level.band),
        };

        let w = &self.config.weights;
        let final_score = round_score(clamp_score(
            scores.fundamental * w.fundamental
                + scores.technical * w.technical
                + scores.liquidity * w.liquidity
                + scores.price_level * w.price_level,
        ));
        let tier = self.config.tiers.classify(final_score);

        debug!(
            symbol = %snapshot.symbol,
            fundamental = scores.fundamental,
            technical = scores.technical,
            liquidity = scores.liquidity,
            price_level = scores.price_level,
            final_score,
            tier = %tier,
            "Scored instrument"
        );

        Some(ScoredInstrument {
            symbol: snapshot.symbol.clone(),
            name: snapshot.name.clone(),
            price,
            scores,
            final_score,
            tier,
            price_level,
        })
    }

    fn fundamental_score(&self, facts: &FundamentalFacts) -> f64 {
        let cfg = &self.config.fundamental;
        let neutral = self.config.neutral_score;

        let expense = non_negative(facts.expense_ratio).map_or(neutral, |er| clamp_score(100.0 - er * 100.0));
        let aum = non_negative(facts.aum).map_or(neutral, |aum| clamp_score(aum / cfg.large_aum * 100.0));
        let dividend = non_negative(facts.dividend_yield)
            .map_or(neutral, |dy| clamp_score(dy / cfg.full_dividend_yield * 100.0));
        // Sharpe -1..1 maps onto 0..100
        let sharpe = finite(facts.sharpe_ratio).map_or(neutral, |s| clamp_score((s + 1.0) * 50.0));

        expense * cfg.expense_weight
            + aum * cfg.aum_weight
            + dividend * cfg.dividend_weight
            + sharpe * cfg.sharpe_weight
    }

    fn technical_score(&self, facts: &TechnicalFacts, price: f64) -> f64 {
        let cfg = &self.config.technical;
        let neutral = self.config.neutral_score;

        let rsi = finite(facts.rsi)
            .filter(|r| (0.0..=100.0).contains(r))
            .map_or(neutral, |r| {
                if r < cfg.rsi_oversold {
                    cfg.rsi_oversold_score
                } else if r > cfg.rsi_overbought {
                    cfg.rsi_overbought_score
                } else {
                    cfg.rsi_neutral_score
                }
            });

        let macd = facts
            .macd
            .filter(|m| m.line.is_finite() && m.signal.is_finite())
            .map_or(neutral, |m| {
                if m.line > m.signal {
                    cfg.macd_bullish_score
                } else {
                    cfg.macd_bearish_score
                }
            });

        let ma = match (
            facts.moving_average(cfg.short_window),
            facts.moving_average(cfg.long_window),
        ) {
            (Some(short), Some(long)) => {
                if price > short && short > long {
                    cfg.ma_bullish_score
                } else if price > short {
                    cfg.ma_short_strength_score
                } else if price < short && short < long {
                    cfg.ma_bearish_score
                } else {
                    cfg.ma_mixed_score
                }
            }
            _ => neutral,
        };

        let bollinger = facts
            .bollinger
            .filter(|b| b.lower.is_finite() && b.middle.is_finite() && b.upper.is_finite())
            .map_or(neutral, |b| {
                if price < b.lower {
                    cfg.bollinger_below_score
                } else if price > b.upper {
                    cfg.bollinger_above_score
                } else if price > b.lower && price < b.middle {
                    cfg.bollinger_lower_half_score
                } else {
                    cfg.bollinger_mixed_score
                }
            });

        rsi * cfg.rsi_weight + macd * cfg.macd_weight + ma * cfg.ma_weight + bollinger * cfg.bollinger_weight
    }

    fn liquidity_score(&self, facts: &LiquidityFacts) -> f64 {
        let cfg = &self.config.liquidity;
        let neutral = self.config.neutral_score;

        let volume = non_negative(facts.avg_volume).map_or(neutral, |v| clamp_score(v / cfg.high_volume * 100.0));
        let stability = non_negative(facts.volume_volatility)
            .map_or(neutral, |vv| clamp_score(100.0 - vv * cfg.volume_volatility_penalty));
        let spread = non_negative(facts.spread).map_or(neutral, |s| clamp_score(100.0 - s * cfg.spread_penalty));

        volume * cfg.volume_weight + stability * cfg.volume_volatility_weight + spread * cfg.spread_weight
    }

    fn price_level(&self, facts: &TechnicalFacts, price: f64) -> PriceLevel {
        let cfg = &self.config.price_level;
        let high = finite(facts.range_high);
        let low = finite(facts.range_low);

        let percentile = match (high, low) {
            (Some(high), Some(low)) if high > low => ((price - low) / (high - low) * 100.0).clamp(0.0, 100.0),
            _ => 50.0,
        };
        let band = cfg.band(percentile);

        PriceLevel {
            percentile,
            band,
            safety_multiplier: cfg.multiplier(band),
            range_high: high,
            range_low: low,
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn non_negative(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|v| *v >= 0.0)
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Snap to 1e-6 so weighted sums of round numbers land on round numbers
fn round_score(score: f64) -> f64 {
    (score * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{BollingerBands, Macd, PriceBand, SignalTier};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn strong_etf() -> InstrumentSnapshot {
        InstrumentSnapshot::new("0050", "Yuanta Taiwan Top 50", dec!(100))
            .with_fundamentals(FundamentalFacts {
                expense_ratio: Some(0.1),
                aum: Some(20_000_000_000.0),
                dividend_yield: Some(0.05),
                sharpe_ratio: Some(1.0),
            })
            .with_technicals(TechnicalFacts {
                rsi: Some(25.0),
                macd: Some(Macd {
                    line: 1.2,
                    signal: 0.8,
                    histogram: 0.4,
                }),
                moving_averages: BTreeMap::from([(20, 95.0), (60, 90.0)]),
                bollinger: Some(BollingerBands {
                    upper: 110.0,
                    middle: 104.0,
                    lower: 98.0,
                }),
                range_high: Some(150.0),
                range_low: Some(95.0),
            })
            .with_liquidity(LiquidityFacts {
                avg_volume: Some(15_000_000.0),
                volume_volatility: Some(0.1),
                spread: Some(0.001),
            })
    }

    #[test]
    fn test_sub_scores_and_final() {
        let config = EngineConfig::standard();
        let scored = InstrumentScorer::new(&config.scoring).score(&strong_etf()).unwrap();

        // expense 90, aum 100, dividend 100, sharpe 100
        assert!((scored.scores.fundamental - 97.0).abs() < 1e-9);
        // rsi 90, macd 70, ma 80, bollinger lower half 70
        assert!((scored.scores.technical - 78.5).abs() < 1e-9);
        // volume 100, stability 80, spread 99
        assert!((scored.scores.liquidity - 94.75).abs() < 1e-9);
        // (100 - 95) / 55 -> ~9th percentile
        assert_eq!(scored.price_level.band, PriceBand::VeryLow);
        assert_eq!(scored.scores.price_level, 90.0);
        assert_eq!(scored.price_level.safety_multiplier, 1.3);

        let expected = 97.0 * 0.3 + 78.5 * 0.4 + 94.75 * 0.15 + 90.0 * 0.15;
        assert!((scored.final_score - expected).abs() < 1e-6);
        assert_eq!(scored.tier, SignalTier::Strong);
    }

    #[test]
    fn test_missing_facts_score_neutral() {
        let config = EngineConfig::standard();
        let bare = InstrumentSnapshot::new("00900", "Bare Fund", dec!(15));
        let scored = InstrumentScorer::new(&config.scoring).score(&bare).unwrap();

        assert_eq!(scored.scores.fundamental, 50.0);
        assert_eq!(scored.scores.technical, 50.0);
        assert_eq!(scored.scores.liquidity, 50.0);
        assert_eq!(scored.price_level.percentile, 50.0);
        assert_eq!(scored.price_level.band, PriceBand::Mid);
        assert_eq!(scored.final_score, 50.0);
        assert_eq!(scored.tier, SignalTier::Moderate);
    }

    #[test]
    fn test_garbage_facts_do_not_escape_range() {
        let config = EngineConfig::standard();
        let weird = InstrumentSnapshot::new("WEIRD", "Weird Fund", dec!(10))
            .with_fundamentals(FundamentalFacts {
                expense_ratio: Some(f64::INFINITY),
                aum: Some(-5.0),
                dividend_yield: Some(3.0),
                sharpe_ratio: Some(-40.0),
            })
            .with_technicals(TechnicalFacts {
                rsi: Some(250.0),
                range_high: Some(5.0),
                range_low: Some(8.0),
                ..TechnicalFacts::default()
            })
            .with_liquidity(LiquidityFacts {
                avg_volume: Some(1e12),
                volume_volatility: Some(9.0),
                spread: Some(f64::NAN),
            });

        let scored = InstrumentScorer::new(&config.scoring).score(&weird).unwrap();
        for s in [
            scored.scores.fundamental,
            scored.scores.technical,
            scored.scores.liquidity,
            scored.scores.price_level,
            scored.final_score,
        ] {
            assert!((0.0..=100.0).contains(&s), "{s} out of range");
        }
        assert_eq!(scored.price_level.percentile, 50.0);
    }

    #[test]
    fn test_non_positive_price_is_excluded() {
        let config = EngineConfig::standard();
        let mut zero = strong_etf();
        zero.symbol = "ZERO".into();
        zero.price = Some(Decimal::ZERO);
        let mut missing = strong_etf();
        missing.symbol = "NONE".into();
        missing.price = None;

        let scored = InstrumentScorer::new(&config.scoring).score_all(&[zero, strong_etf(), missing]);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].symbol, "0050");
    }

    #[test]
    fn test_sorted_and_ties_by_symbol() {
        let config = EngineConfig::standard();
        let batch = vec![
            InstrumentSnapshot::new("B", "Plain B", dec!(10)),
            strong_etf(),
            InstrumentSnapshot::new("A", "Plain A", dec!(20)),
        ];

        let scorer = InstrumentScorer::new(&config.scoring);
        let scored = scorer.score_all(&batch);
        let symbols: Vec<_> = scored.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, ["0050", "A", "B"]);
        assert!(scored.windows(2).all(|w| w[0].final_score >= w[1].final_score));

        // Idempotent
        assert_eq!(scorer.score_all(&batch), scored);
    }

    #[test]
    fn test_bearish_chart() {
        let config = EngineConfig::standard();
        let etf = InstrumentSnapshot::new("BEAR", "Bear Fund", dec!(80)).with_technicals(TechnicalFacts {
            rsi: Some(75.0),
            macd: Some(Macd {
                line: -0.5,
                signal: 0.1,
                histogram: -0.6,
            }),
            moving_averages: BTreeMap::from([(20, 85.0), (60, 90.0)]),
            bollinger: Some(BollingerBands {
                upper: 79.0,
                middle: 75.0,
                lower: 71.0,
            }),
            range_high: Some(82.0),
            range_low: Some(60.0),
        });

        let scored = InstrumentScorer::new(&config.scoring).score(&etf).unwrap();
        // rsi 40, macd 40, ma 30, bollinger above 35
        assert!((scored.scores.technical - 36.5).abs() < 1e-9);
        assert_eq!(scored.price_level.band, PriceBand::VeryHigh);
    }
}
