//! Engine Configuration
//!
//! Every weight, breakpoint and threshold used by the engine lives here.
//! Behavioral variants are presets of the same data, never forked code paths.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};
use crate::model::{MacroSignal, PriceBand, SignalTier, Trend};

const WEIGHT_TOLERANCE: f64 = 1e-6;

// ============================================================================
// Step functions
// ============================================================================

/// How a step bound is compared against the raw value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRule {
    /// value > bound
    Above,
    /// value < bound
    Below,
    /// value <= bound
    AtMost,
}

impl StepRule {
    fn matches(self, value: f64, bound: f64) -> bool {
        match self {
            Self::Above => value > bound,
            Self::Below => value < bound,
            Self::AtMost => value <= bound,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub bound: f64,
    pub score: f64,
}

/// Monotonic step function: the first matching step wins, else `otherwise`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepScale {
    pub rule: StepRule,
    pub steps: Vec<Step>,
    pub otherwise: f64,
}

impl StepScale {
    pub fn new(rule: StepRule, steps: &[(f64, f64)], otherwise: f64) -> Self {
        Self {
            rule,
            steps: steps
                .iter()
                .map(|&(bound, score)| Step { bound, score })
                .collect(),
            otherwise,
        }
    }

    pub fn score(&self, value: f64) -> f64 {
        self.steps
            .iter()
            .find(|step| self.rule.matches(value, step.bound))
            .map_or(self.otherwise, |step| step.score)
    }

    fn validate(&self, name: &str) -> Result<()> {
        let ordered = self.steps.windows(2).all(|w| match self.rule {
            StepRule::Above => w[0].bound > w[1].bound,
            StepRule::Below | StepRule::AtMost => w[0].bound < w[1].bound,
        });
        if !ordered {
            return Err(AdvisorError::Config(format!("{name}: step bounds are out of order")));
        }
        let in_range = self
            .steps
            .iter()
            .map(|s| s.score)
            .chain(std::iter::once(self.otherwise))
            .all(|s| (0.0..=100.0).contains(&s));
        if !in_range {
            return Err(AdvisorError::Config(format!("{name}: scores must lie in 0-100")));
        }
        Ok(())
    }
}

fn check_weights(name: &str, weights: &[f64]) -> Result<()> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(AdvisorError::Config(format!("{name}: weights must be non-negative")));
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(AdvisorError::Config(format!("{name}: weights sum to {sum}, expected 1.0")));
    }
    Ok(())
}

fn check_scores(name: &str, scores: &[f64]) -> Result<()> {
    if scores.iter().all(|s| (0.0..=100.0).contains(s)) {
        Ok(())
    } else {
        Err(AdvisorError::Config(format!("{name}: scores must lie in 0-100")))
    }
}

// ============================================================================
// Market classifier
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifierWeights {
    pub volatility: f64,
    pub momentum: f64,
    pub macro_economic: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendScores {
    pub up: f64,
    pub flat: f64,
    pub down: f64,
    /// Share of the momentum sub-score taken by the trend when a label is present
    pub blend: f64,
}

impl TrendScores {
    pub const fn score(&self, trend: Trend) -> f64 {
        match trend {
            Trend::Up => self.up,
            Trend::Flat => self.flat,
            Trend::Down => self.down,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyRule {
    pub min_score: f64,
    pub deployment_ratio: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyThresholds {
    pub aggressive: StrategyRule,
    pub balanced: StrategyRule,
    /// Conservative still deploys a floor; idle capital is not a recommendation
    pub conservative_ratio: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub weights: ClassifierWeights,
    /// Higher volatility reads as fear, i.e. opportunity
    pub volatility: StepScale,
    /// Lower momentum (oversold) scores higher
    pub momentum: StepScale,
    pub trend: TrendScores,
    /// Contrarian lookup: contraction scores high, overheating low
    pub macro_scores: BTreeMap<MacroSignal, f64>,
    pub neutral_macro_score: f64,
    pub default_volatility: f64,
    pub default_momentum: f64,
    pub strategies: StrategyThresholds,
}

impl ClassifierConfig {
    pub fn macro_score(&self, signal: Option<MacroSignal>) -> f64 {
        signal
            .and_then(|s| self.macro_scores.get(&s).copied())
            .unwrap_or(self.neutral_macro_score)
    }
}

// ============================================================================
// Instrument scorer
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub fundamental: f64,
    pub technical: f64,
    pub liquidity: f64,
    pub price_level: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FundamentalConfig {
    pub expense_weight: f64,
    pub aum_weight: f64,
    pub dividend_weight: f64,
    pub sharpe_weight: f64,
    /// AUM at which the size component earns full marks
    pub large_aum: f64,
    /// Dividend yield (fraction) earning full marks
    pub full_dividend_yield: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechnicalConfig {
    pub rsi_weight: f64,
    pub macd_weight: f64,
    pub ma_weight: f64,
    pub bollinger_weight: f64,

    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_oversold_score: f64,
    pub rsi_neutral_score: f64,
    pub rsi_overbought_score: f64,

    pub macd_bullish_score: f64,
    pub macd_bearish_score: f64,

    /// Short moving-average window in days
    pub short_window: u32,
    /// Long moving-average window in days
    pub long_window: u32,
    pub ma_bullish_score: f64,
    pub ma_short_strength_score: f64,
    pub ma_bearish_score: f64,
    pub ma_mixed_score: f64,

    pub bollinger_below_score: f64,
    pub bollinger_lower_half_score: f64,
    pub bollinger_above_score: f64,
    pub bollinger_mixed_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiquidityConfig {
    pub volume_weight: f64,
    pub volume_volatility_weight: f64,
    pub spread_weight: f64,
    /// Average volume at which the volume component earns full marks
    pub high_volume: f64,
    /// Points lost per unit of volume coefficient of variation
    pub volume_volatility_penalty: f64,
    /// Points lost per unit of fractional spread
    pub spread_penalty: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceLevelConfig {
    /// Upper percentile bound of VeryLow, Low, Mid and High; above is VeryHigh
    pub band_bounds: [f64; 4],
    /// Sub-score per band, VeryLow first
    pub band_scores: [f64; 5],
    /// Safety multiplier per band, VeryLow first
    pub multipliers: [f64; 5],
}

impl PriceLevelConfig {
    pub fn band(&self, percentile: f64) -> PriceBand {
        self.band_bounds
            .iter()
            .position(|bound| percentile <= *bound)
            .map_or(PriceBand::VeryHigh, |i| PriceBand::ALL[i])
    }

    pub const fn score(&self, band: PriceBand) -> f64 {
        self.band_scores[band.index()]
    }

    pub const fn multiplier(&self, band: PriceBand) -> f64 {
        self.multipliers[band.index()]
    }
}

/// Tier thresholds; the one place that maps a final score to a tier
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub strong: f64,
    pub moderate: f64,
    pub weak: f64,
}

impl TierThresholds {
    pub fn classify(&self, score: f64) -> SignalTier {
        if score >= self.strong {
            SignalTier::Strong
        } else if score >= self.moderate {
            SignalTier::Moderate
        } else if score >= self.weak {
            SignalTier::Weak
        } else {
            SignalTier::Avoid
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: FactorWeights,
    pub fundamental: FundamentalConfig,
    pub technical: TechnicalConfig,
    pub liquidity: LiquidityConfig,
    pub price_level: PriceLevelConfig,
    pub tiers: TierThresholds,
    /// Substituted for any component whose fact is missing
    pub neutral_score: f64,
}

// ============================================================================
// Allocator, risk monitor, advice
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub qualification_floor: f64,
    /// How many top instruments to fall back to when none qualify
    pub fallback_count: usize,
    /// Holdings when the investor does not ask for a count
    pub auto_count: usize,
    /// Minimum raw weight before the safety multiplier
    pub floor_weight: Decimal,
    /// Tradable unit size; quantities are rounded down to a multiple of it
    pub lot_size: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Strong-tier share below which breadth risk is high
    pub breadth_high_below: f64,
    /// Strong-tier share below which breadth risk is medium
    pub breadth_medium_below: f64,
    /// Share of expensive instruments above which valuation risk is raised
    pub valuation_ceiling: f64,
    /// Lowest band counted as expensive
    pub valuation_band: PriceBand,
    pub overbought_momentum: f64,
    pub panic_volatility: f64,
}

/// Named bucket for call-outs, matched by keywords in the instrument name
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub keywords: Vec<String>,
    pub audience: String,
    pub min_score: f64,
}

impl Theme {
    pub fn matches(&self, instrument_name: &str) -> bool {
        let lowered = instrument_name.to_lowercase();
        self.keywords
            .iter()
            .any(|k| lowered.contains(&k.to_lowercase()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdviceConfig {
    /// Strong-tier count for a positive outlook
    pub positive_outlook_strong: usize,
    /// Strong plus moderate count for a normal outlook
    pub normal_outlook_candidates: usize,
    /// Strong-tier count that triggers the diversification tip
    pub diversify_tip_strong: usize,
    pub themes: Vec<Theme>,
}

// ============================================================================
// Engine configuration
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub classifier: ClassifierConfig,
    pub scoring: ScoringConfig,
    pub allocation: AllocationConfig,
    pub risk: RiskConfig,
    pub advice: AdviceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl EngineConfig {
    /// Documented defaults
    pub fn standard() -> Self {
        Self {
            classifier: ClassifierConfig {
                weights: ClassifierWeights {
                    volatility: 0.3,
                    momentum: 0.4,
                    macro_economic: 0.3,
                },
                volatility: StepScale::new(
                    StepRule::Above,
                    &[(30.0, 85.0), (25.0, 70.0), (20.0, 55.0), (15.0, 45.0)],
                    30.0,
                ),
                momentum: StepScale::new(
                    StepRule::Below,
                    &[(30.0, 85.0), (40.0, 70.0), (60.0, 50.0), (70.0, 35.0)],
                    20.0,
                ),
                trend: TrendScores {
                    up: 70.0,
                    flat: 50.0,
                    down: 30.0,
                    blend: 0.3,
                },
                macro_scores: macro_table([80.0, 65.0, 50.0, 35.0, 20.0]),
                neutral_macro_score: 50.0,
                default_volatility: 20.0,
                default_momentum: 50.0,
                strategies: StrategyThresholds {
                    aggressive: StrategyRule {
                        min_score: 65.0,
                        deployment_ratio: dec!(0.8),
                    },
                    balanced: StrategyRule {
                        min_score: 35.0,
                        deployment_ratio: dec!(0.6),
                    },
                    conservative_ratio: dec!(0.4),
                },
            },
            scoring: ScoringConfig {
                weights: FactorWeights {
                    fundamental: 0.3,
                    technical: 0.4,
                    liquidity: 0.15,
                    price_level: 0.15,
                },
                fundamental: FundamentalConfig {
                    expense_weight: 0.3,
                    aum_weight: 0.2,
                    dividend_weight: 0.3,
                    sharpe_weight: 0.2,
                    large_aum: 10_000_000_000.0,
                    full_dividend_yield: 0.05,
                },
                technical: TechnicalConfig {
                    rsi_weight: 0.3,
                    macd_weight: 0.25,
                    ma_weight: 0.25,
                    bollinger_weight: 0.2,
                    rsi_oversold: 30.0,
                    rsi_overbought: 70.0,
                    rsi_oversold_score: 90.0,
                    rsi_neutral_score: 80.0,
                    rsi_overbought_score: 40.0,
                    macd_bullish_score: 70.0,
                    macd_bearish_score: 40.0,
                    short_window: 20,
                    long_window: 60,
                    ma_bullish_score: 80.0,
                    ma_short_strength_score: 60.0,
                    ma_bearish_score: 30.0,
                    ma_mixed_score: 50.0,
                    bollinger_below_score: 85.0,
                    bollinger_lower_half_score: 70.0,
                    bollinger_above_score: 35.0,
                    bollinger_mixed_score: 50.0,
                },
                liquidity: LiquidityConfig {
                    volume_weight: 0.5,
                    volume_volatility_weight: 0.25,
                    spread_weight: 0.25,
                    high_volume: 10_000_000.0,
                    volume_volatility_penalty: 200.0,
                    spread_penalty: 1000.0,
                },
                price_level: PriceLevelConfig {
                    band_bounds: [20.0, 40.0, 60.0, 80.0],
                    band_scores: [90.0, 75.0, 50.0, 35.0, 20.0],
                    multipliers: [1.3, 1.15, 1.0, 0.8, 0.6],
                },
                tiers: TierThresholds {
                    strong: 70.0,
                    moderate: 50.0,
                    weak: 30.0,
                },
                neutral_score: 50.0,
            },
            allocation: AllocationConfig {
                qualification_floor: 40.0,
                fallback_count: 3,
                auto_count: 5,
                floor_weight: dec!(0.1),
                lot_size: 1,
            },
            risk: RiskConfig {
                breadth_high_below: 0.1,
                breadth_medium_below: 0.2,
                valuation_ceiling: 0.6,
                valuation_band: PriceBand::High,
                overbought_momentum: 75.0,
                panic_volatility: 35.0,
            },
            advice: AdviceConfig {
                positive_outlook_strong: 3,
                normal_outlook_candidates: 5,
                diversify_tip_strong: 3,
                themes: default_themes(),
            },
        }
    }

    /// The earlier engine generation: steeper market breakpoints, no price-level
    /// factor in the score, stricter qualification and stronger multipliers
    pub fn legacy() -> Self {
        let mut config = Self::standard();

        let classifier = &mut config.classifier;
        classifier.weights = ClassifierWeights {
            volatility: 0.4,
            momentum: 0.4,
            macro_economic: 0.2,
        };
        classifier.volatility = StepScale::new(
            StepRule::Above,
            &[(30.0, 90.0), (25.0, 75.0), (20.0, 60.0), (15.0, 40.0)],
            20.0,
        );
        classifier.momentum = StepScale::new(
            StepRule::Below,
            &[(30.0, 90.0), (40.0, 70.0), (60.0, 50.0), (70.0, 30.0)],
            10.0,
        );
        classifier.trend.blend = 0.0;
        classifier.macro_scores = macro_table([90.0, 70.0, 50.0, 30.0, 10.0]);
        classifier.strategies.aggressive.min_score = 70.0;
        classifier.strategies.balanced.min_score = 40.0;
        classifier.strategies.conservative_ratio = dec!(0.3);

        let scoring = &mut config.scoring;
        scoring.weights = FactorWeights {
            fundamental: 0.5,
            technical: 0.3,
            liquidity: 0.2,
            price_level: 0.0,
        };
        scoring.price_level.multipliers = [1.5, 1.2, 1.0, 0.7, 0.4];
        scoring.tiers = TierThresholds {
            strong: 80.0,
            moderate: 60.0,
            weak: 40.0,
        };

        config.allocation.qualification_floor = 60.0;
        config.risk.breadth_medium_below = 0.3;
        config.risk.valuation_ceiling = 0.5;
        config.risk.valuation_band = PriceBand::VeryHigh;

        config
    }

    /// Standard preset with fund quality outweighing chart signals
    pub fn fundamental_tilt() -> Self {
        let mut config = Self::standard();
        config.scoring.weights = FactorWeights {
            fundamental: 0.5,
            technical: 0.3,
            liquidity: 0.1,
            price_level: 0.1,
        };
        config
    }

    /// Resolve a preset by name
    pub fn preset(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "" | "standard" | "default" => Ok(Self::standard()),
            "legacy" => Ok(Self::legacy()),
            "fundamental_tilt" | "fundamental" => Ok(Self::fundamental_tilt()),
            other => Err(AdvisorError::Config(format!("unknown preset '{other}'"))),
        }
    }

    /// Load a full configuration from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AdvisorError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.classifier;
        check_weights(
            "classifier.weights",
            &[c.weights.volatility, c.weights.momentum, c.weights.macro_economic],
        )?;
        c.volatility.validate("classifier.volatility")?;
        c.momentum.validate("classifier.momentum")?;
        if !(0.0..=1.0).contains(&c.trend.blend) {
            return Err(AdvisorError::Config("classifier.trend.blend must lie in 0-1".into()));
        }
        check_scores("classifier.trend", &[c.trend.up, c.trend.flat, c.trend.down])?;
        let macro_scores: Vec<f64> = c.macro_scores.values().copied().collect();
        check_scores("classifier.macro_scores", &macro_scores)?;
        check_scores("classifier.neutral_macro_score", &[c.neutral_macro_score])?;
        let s = &c.strategies;
        if s.aggressive.min_score <= s.balanced.min_score {
            return Err(AdvisorError::Config(
                "aggressive threshold must exceed the balanced threshold".into(),
            ));
        }
        for ratio in [s.aggressive.deployment_ratio, s.balanced.deployment_ratio, s.conservative_ratio] {
            if ratio <= Decimal::ZERO || ratio > Decimal::ONE {
                return Err(AdvisorError::Config(format!(
                    "deployment ratio {ratio} must lie in (0, 1]"
                )));
            }
        }

        let sc = &self.scoring;
        check_weights(
            "scoring.weights",
            &[sc.weights.fundamental, sc.weights.technical, sc.weights.liquidity, sc.weights.price_level],
        )?;
        let f = &sc.fundamental;
        check_weights(
            "scoring.fundamental",
            &[f.expense_weight, f.aum_weight, f.dividend_weight, f.sharpe_weight],
        )?;
        let t = &sc.technical;
        check_weights(
            "scoring.technical",
            &[t.rsi_weight, t.macd_weight, t.ma_weight, t.bollinger_weight],
        )?;
        check_scores(
            "scoring.technical",
            &[
                t.rsi_oversold_score,
                t.rsi_neutral_score,
                t.rsi_overbought_score,
                t.macd_bullish_score,
                t.macd_bearish_score,
                t.ma_bullish_score,
                t.ma_short_strength_score,
                t.ma_bearish_score,
                t.ma_mixed_score,
                t.bollinger_below_score,
                t.bollinger_lower_half_score,
                t.bollinger_above_score,
                t.bollinger_mixed_score,
            ],
        )?;
        if t.short_window >= t.long_window {
            return Err(AdvisorError::Config("short MA window must be shorter than the long one".into()));
        }
        let l = &sc.liquidity;
        check_weights(
            "scoring.liquidity",
            &[l.volume_weight, l.volume_volatility_weight, l.spread_weight],
        )?;
        if f.large_aum <= 0.0 || f.full_dividend_yield <= 0.0 || l.high_volume <= 0.0 {
            return Err(AdvisorError::Config("saturation cutoffs must be positive".into()));
        }
        if !sc.price_level.band_bounds.windows(2).all(|w| w[0] < w[1]) {
            return Err(AdvisorError::Config("price band bounds must ascend".into()));
        }
        check_scores("scoring.price_level.band_scores", &sc.price_level.band_scores)?;
        check_scores("scoring.neutral_score", &[sc.neutral_score])?;
        if sc.price_level.multipliers.iter().any(|m| *m <= 0.0) {
            return Err(AdvisorError::Config("safety multipliers must be positive".into()));
        }
        let tiers = &sc.tiers;
        if !(tiers.strong > tiers.moderate && tiers.moderate > tiers.weak) {
            return Err(AdvisorError::Config("tier thresholds must descend".into()));
        }

        let a = &self.allocation;
        if a.lot_size == 0 {
            return Err(AdvisorError::Config("lot size must be at least 1".into()));
        }
        if a.auto_count == 0 {
            return Err(AdvisorError::Config("auto holdings count must be at least 1".into()));
        }
        if a.fallback_count == 0 {
            return Err(AdvisorError::Config("fallback count must be at least 1".into()));
        }
        if a.floor_weight < Decimal::ZERO {
            return Err(AdvisorError::Config("floor weight must be non-negative".into()));
        }

        let r = &self.risk;
        if r.breadth_high_below > r.breadth_medium_below {
            return Err(AdvisorError::Config(
                "high breadth floor must not exceed the medium floor".into(),
            ));
        }
        Ok(())
    }
}

fn macro_table(scores: [f64; 5]) -> BTreeMap<MacroSignal, f64> {
    MacroSignal::ALL.into_iter().zip(scores).collect()
}

fn default_themes() -> Vec<Theme> {
    vec![
        Theme {
            name: "high dividend".into(),
            keywords: vec!["dividend".into(), "yield".into(), "income".into()],
            audience: "steady income investors".into(),
            min_score: 50.0,
        },
        Theme {
            name: "technology".into(),
            keywords: vec![
                "tech".into(),
                "semiconductor".into(),
                "5g".into(),
                "innovation".into(),
            ],
            audience: "growth-oriented investors".into(),
            min_score: 50.0,
        },
    ]
}
