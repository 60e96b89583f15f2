//! Allocation Strategy
//!
//! Distributes the deployable share of capital across the best-scoring
//! instruments, tilted by each instrument's price-level safety multiplier,
//! and sizes every line in whole tradable lots.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AllocationConfig;
use crate::model::{MarketStrategy, Position, ScoredInstrument, to_decimal};

/// A complete allocation plan with its rounding disclosure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    /// Capital the investor made available
    pub capital: Decimal,

    /// Share of capital the market strategy deploys
    pub deployment_ratio: Decimal,

    /// capital * deployment_ratio
    pub deployable: Decimal,

    /// Sum of position amounts
    pub invested: Decimal,

    /// deployable - invested: left over from rounding down to whole lots
    pub residual: Decimal,

    /// capital - deployable: deliberately held back by the strategy
    pub reserve: Decimal,

    pub positions: Vec<Position>,

    /// True when no instrument met the qualification floor
    pub used_fallback: bool,

    /// Explanations for anything absent or unallocated
    pub notes: Vec<String>,
}

impl AllocationPlan {
    fn empty(capital: Decimal, deployment_ratio: Decimal, note: impl Into<String>) -> Self {
        let deployable = if capital > Decimal::ZERO {
            capital * deployment_ratio
        } else {
            Decimal::ZERO
        };
        Self {
            capital,
            deployment_ratio,
            deployable,
            invested: Decimal::ZERO,
            residual: deployable,
            reserve: (capital - deployable).max(Decimal::ZERO),
            positions: Vec::new(),
            used_fallback: false,
            notes: vec![note.into()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Sum of reported weights; below 100 whenever rounding left a residual
    pub fn total_weight_pct(&self) -> Decimal {
        self.positions.iter().map(|p| p.weight_pct).sum()
    }
}

/// Sizes positions from a ranked universe
pub struct Allocator<'a> {
    config: &'a AllocationConfig,
}

impl<'a> Allocator<'a> {
    pub const fn new(config: &'a AllocationConfig) -> Self {
        Self { config }
    }

    /// Allocate `capital` across `scored`.
    ///
    /// `holdings` caps the number of instruments; 0 lets the configured
    /// auto count decide.
    pub fn allocate(
        &self,
        capital: Decimal,
        strategy: &MarketStrategy,
        scored: &[ScoredInstrument],
        holdings: usize,
    ) -> AllocationPlan {
        let ratio = strategy.deployment_ratio;

        if capital <= Decimal::ZERO {
            return AllocationPlan::empty(
                capital,
                ratio,
                "Available capital must be positive; nothing was allocated.",
            );
        }
        if scored.is_empty() {
            return AllocationPlan::empty(capital, ratio, "No instruments were available to allocate.");
        }

        let mut ranked: Vec<&ScoredInstrument> = scored.iter().collect();
        ranked.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        let mut notes = Vec::new();
        let floor = self.config.qualification_floor;
        let mut candidates: Vec<&ScoredInstrument> =
            ranked.iter().copied().filter(|s| s.final_score >= floor).collect();
        let used_fallback = candidates.is_empty();
        if used_fallback {
            candidates = ranked.iter().copied().take(self.config.fallback_count).collect();
            notes.push(format!(
                "No instrument reached the qualification score of {floor:.0}; falling back to the top {} by score.",
                candidates.len()
            ));
        }

        let count = if holdings > 0 { holdings } else { self.config.auto_count };
        candidates.truncate(count);

        let deployable = capital * ratio;
        let raw_weights: Vec<Decimal> = candidates.iter().map(|s| self.raw_weight(s)).collect();
        let total_weight: Decimal = raw_weights.iter().sum();

        let lot = Decimal::from(self.config.lot_size);
        let mut positions = Vec::with_capacity(candidates.len());
        let mut skipped = Vec::new();

        for (instrument, raw) in candidates.iter().zip(&raw_weights) {
            let share = if total_weight > Decimal::ZERO {
                *raw / total_weight
            } else {
                Decimal::ONE / Decimal::from(candidates.len())
            };
            let planned = (deployable * share).round_dp_with_strategy(2, RoundingStrategy::ToZero);

            let lots = planned
                .checked_div(instrument.price * lot)
                .unwrap_or(Decimal::ZERO)
                .floor();
            let quantity = lots
                .to_u64()
                .and_then(|l| l.checked_mul(self.config.lot_size))
                .unwrap_or(0);

            if quantity == 0 {
                debug!(symbol = %instrument.symbol, %planned, price = %instrument.price, "Planned amount buys less than one lot");
                skipped.push(instrument.symbol.clone());
                continue;
            }

            let amount = Decimal::from(quantity) * instrument.price;
            let weight_pct = (amount / deployable * dec!(100)).round_dp_with_strategy(2, RoundingStrategy::ToZero);

            positions.push(Position {
                symbol: instrument.symbol.clone(),
                name: instrument.name.clone(),
                quantity,
                unit_price: instrument.price,
                amount,
                weight_pct,
                final_score: instrument.final_score,
                tier: instrument.tier,
                price_band: instrument.price_level.band,
                rationale: rationale(instrument),
            });
        }

        if !skipped.is_empty() {
            notes.push(format!(
                "Skipped {}: the planned amount cannot buy one lot of {}.",
                skipped.join(", "),
                self.config.lot_size
            ));
        }

        let invested: Decimal = positions.iter().map(|p| p.amount).sum();
        let residual = deployable - invested;
        if positions.is_empty() {
            notes.push("No selected instrument was affordable with the deployable capital.".into());
        } else if residual > Decimal::ZERO {
            notes.push(format!(
                "{} of the deployable {} stays in cash after rounding down to whole units; reported weights sum to {}%.",
                residual.round_dp(2),
                deployable.round_dp(2),
                positions.iter().map(|p| p.weight_pct).sum::<Decimal>()
            ));
        }

        info!(
            %capital,
            %deployable,
            %invested,
            positions = positions.len(),
            used_fallback,
            "Allocation computed"
        );

        AllocationPlan {
            capital,
            deployment_ratio: ratio,
            deployable,
            invested,
            residual,
            reserve: capital - deployable,
            positions,
            used_fallback,
            notes,
        }
    }

    fn raw_weight(&self, instrument: &ScoredInstrument) -> Decimal {
        let base = to_decimal(instrument.final_score / 100.0).max(self.config.floor_weight);
        base * to_decimal(instrument.price_level.safety_multiplier)
    }
}

/// One-line explanation of a position
fn rationale(instrument: &ScoredInstrument) -> String {
    let mut text = format!(
        "Score {:.1} ({}, {}); {}",
        instrument.final_score,
        instrument.tier,
        instrument.tier.recommendation(),
        instrument.price_level.description()
    );
    if instrument.scores.technical >= 60.0 {
        text.push_str("; technicals constructive");
    } else if instrument.scores.technical <= 40.0 {
        text.push_str("; technicals weak but recovering");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{MarketSnapshot, PriceBand, PriceLevel, SubScores};
    use crate::strategy::MarketClassifier;

    fn balanced() -> MarketStrategy {
        let config = EngineConfig::standard();
        MarketClassifier::new(&config.classifier).classify(&MarketSnapshot::default())
    }

    fn scored(symbol: &str, score: f64, price: Decimal, band: PriceBand) -> ScoredInstrument {
        let config = EngineConfig::standard();
        ScoredInstrument {
            symbol: symbol.into(),
            name: format!("{symbol} ETF"),
            price,
            scores: SubScores {
                fundamental: score,
                technical: score,
                liquidity: score,
                price_level: config.scoring.price_level.score(band),
            },
            final_score: score,
            tier: config.scoring.tiers.classify(score),
            price_level: PriceLevel {
                percentile: 50.0,
                band,
                safety_multiplier: config.scoring.price_level.multiplier(band),
                range_high: None,
                range_low: None,
            },
        }
    }

    #[test]
    fn test_three_instrument_allocation() {
        let config = EngineConfig::standard();
        let strategy = balanced();
        assert_eq!(strategy.deployment_ratio, dec!(0.6));

        let universe = vec![
            scored("AAA", 90.0, dec!(100), PriceBand::Mid),
            scored("BBB", 70.0, dec!(50), PriceBand::Mid),
            scored("CCC", 50.0, dec!(25), PriceBand::Mid),
        ];

        let plan = Allocator::new(&config.allocation).allocate(dec!(100000), &strategy, &universe, 0);

        assert_eq!(plan.positions.len(), 3);
        assert_eq!(plan.deployable, dec!(60000));
        let amounts: Vec<_> = plan.positions.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![dec!(25700), dec!(20000), dec!(14275)]);
        assert!(amounts.windows(2).all(|w| w[0] >= w[1]));
        for p in &plan.positions {
            assert!(p.quantity >= 1);
            assert_eq!(p.amount, Decimal::from(p.quantity) * p.unit_price);
        }
        assert_eq!(plan.invested, dec!(59975));
        assert!(plan.invested <= plan.deployable);
        assert_eq!(plan.residual, dec!(25));
        assert_eq!(plan.reserve, dec!(40000));
        assert!(plan.total_weight_pct() <= dec!(100));
        assert!(plan.notes.iter().any(|n| n.contains("stays in cash")));
    }

    #[test]
    fn test_safety_multiplier_tilts_weights() {
        let config = EngineConfig::standard();
        let universe = vec![
            scored("EXPENSIVE", 80.0, dec!(10), PriceBand::VeryHigh),
            scored("CHEAP", 80.0, dec!(10), PriceBand::VeryLow),
        ];

        let plan = Allocator::new(&config.allocation).allocate(dec!(10000), &balanced(), &universe, 0);
        let cheap = plan.positions.iter().find(|p| p.symbol == "CHEAP").unwrap();
        let expensive = plan.positions.iter().find(|p| p.symbol == "EXPENSIVE").unwrap();
        assert!(cheap.amount > expensive.amount);
    }

    #[test]
    fn test_non_positive_capital_is_empty_with_note() {
        let config = EngineConfig::standard();
        let universe = vec![scored("AAA", 90.0, dec!(100), PriceBand::Mid)];
        let allocator = Allocator::new(&config.allocation);

        for capital in [Decimal::ZERO, dec!(-100)] {
            let plan = allocator.allocate(capital, &balanced(), &universe, 0);
            assert!(plan.is_empty());
            assert_eq!(plan.invested, Decimal::ZERO);
            assert_eq!(plan.notes.len(), 1);
        }
    }

    #[test]
    fn test_empty_universe_is_empty() {
        let config = EngineConfig::standard();
        let plan = Allocator::new(&config.allocation).allocate(dec!(5000), &balanced(), &[], 0);
        assert!(plan.is_empty());
        assert!(!plan.notes.is_empty());
    }

    #[test]
    fn test_fallback_to_top_three() {
        let config = EngineConfig::standard();
        let universe = vec![
            scored("A", 35.0, dec!(10), PriceBand::Mid),
            scored("B", 30.0, dec!(10), PriceBand::Mid),
            scored("C", 25.0, dec!(10), PriceBand::Mid),
            scored("D", 20.0, dec!(10), PriceBand::Mid),
        ];

        let plan = Allocator::new(&config.allocation).allocate(dec!(10000), &balanced(), &universe, 0);
        assert!(plan.used_fallback);
        let symbols: Vec<_> = plan.positions.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, ["A", "B", "C"]);
    }

    #[test]
    fn test_explicit_holdings_count_and_unaffordable_drop() {
        let config = EngineConfig::standard();
        let universe = vec![
            scored("A", 90.0, dec!(10), PriceBand::Mid),
            scored("PRICEY", 85.0, dec!(5000), PriceBand::Mid),
            scored("C", 80.0, dec!(10), PriceBand::Mid),
            scored("D", 75.0, dec!(10), PriceBand::Mid),
        ];

        let plan = Allocator::new(&config.allocation).allocate(dec!(1000), &balanced(), &universe, 3);
        let symbols: Vec<_> = plan.positions.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, ["A", "C"]);
        assert!(plan.notes.iter().any(|n| n.contains("PRICEY")));
        assert!(plan.invested <= plan.deployable);
    }

    #[test]
    fn test_lot_size_rounding() {
        let mut config = EngineConfig::standard();
        config.allocation.lot_size = 1000;
        let universe = vec![scored("0050", 90.0, dec!(20), PriceBand::Mid)];

        let plan = Allocator::new(&config.allocation).allocate(dec!(100000), &balanced(), &universe, 0);
        // 60000 deployable buys 3000 units in lots of 1000
        assert_eq!(plan.positions[0].quantity, 3000);
        assert_eq!(plan.positions[0].amount, dec!(60000));
        assert_eq!(plan.positions[0].weight_pct, dec!(100));
    }
}
