//! Domain Models
//!
//! Core data types for ETF scoring and allocation.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!
//! Scores, ratios and indicator readings stay in f64.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{AdvisorError, Result};

// ============================================================================
// Instrument snapshot
// ============================================================================

/// Fund-level facts. Every field is optional; scoring substitutes a neutral
/// score for whatever is missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalFacts {
    /// Annual expense ratio in percent (0.43 means 0.43%)
    pub expense_ratio: Option<f64>,

    /// Assets under management in the fund's quote currency
    pub aum: Option<f64>,

    /// Trailing dividend yield as a fraction (0.05 means 5%)
    pub dividend_yield: Option<f64>,

    /// Risk-adjusted return proxy derived from historical returns
    pub sharpe_ratio: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Technical readings computed by the data collaborator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalFacts {
    /// RSI(14), 0-100
    pub rsi: Option<f64>,

    pub macd: Option<Macd>,

    /// Simple moving averages keyed by window length in days
    pub moving_averages: BTreeMap<u32, f64>,

    pub bollinger: Option<BollingerBands>,

    /// Highest close over the 52-week window (or the available history)
    pub range_high: Option<f64>,

    /// Lowest close over the same window
    pub range_low: Option<f64>,
}

impl TechnicalFacts {
    pub fn moving_average(&self, window: u32) -> Option<f64> {
        self.moving_averages.get(&window).copied().filter(|v| v.is_finite())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityFacts {
    /// Average daily traded volume in units
    pub avg_volume: Option<f64>,

    /// Coefficient of variation of daily volume
    pub volume_volatility: Option<f64>,

    /// Estimated bid/ask spread as a fraction of price
    pub spread: Option<f64>,
}

/// Normalized per-ETF facts consumed by scoring
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    /// Exchange symbol (e.g., "0050", "00679B")
    pub symbol: String,

    /// Display name
    pub name: String,

    /// Last traded price; instruments without a positive price are never scored
    #[serde(default)]
    pub price: Option<Decimal>,

    #[serde(default)]
    pub fundamentals: FundamentalFacts,

    #[serde(default)]
    pub technicals: TechnicalFacts,

    #[serde(default)]
    pub liquidity: LiquidityFacts,

    /// When the collaborator produced this snapshot
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InstrumentSnapshot {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            name: name.into(),
            price: Some(price),
            fundamentals: FundamentalFacts::default(),
            technicals: TechnicalFacts::default(),
            liquidity: LiquidityFacts::default(),
            updated_at: None,
        }
    }

    pub fn with_fundamentals(mut self, fundamentals: FundamentalFacts) -> Self {
        self.fundamentals = fundamentals;
        self
    }

    pub fn with_technicals(mut self, technicals: TechnicalFacts) -> Self {
        self.technicals = technicals;
        self
    }

    pub fn with_liquidity(mut self, liquidity: LiquidityFacts) -> Self {
        self.liquidity = liquidity;
        self
    }

    /// Price if it is strictly positive
    pub fn tradable_price(&self) -> Option<Decimal> {
        self.price.filter(|p| *p > Decimal::ZERO)
    }
}

// ============================================================================
// Market snapshot
// ============================================================================

/// Ordered macro-economic business-cycle indicator, from deeply negative to overheated
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroSignal {
    /// Blue light: contraction
    Depressed,
    /// Yellow-blue light: slowing
    Weakening,
    /// Green light: stable growth
    Stable,
    /// Yellow-red light: heating up
    Warming,
    /// Red light: overheated
    Overheated,
}

impl MacroSignal {
    pub const ALL: [Self; 5] = [
        Self::Depressed,
        Self::Weakening,
        Self::Stable,
        Self::Warming,
        Self::Overheated,
    ];

    /// Parse canonical names and the traffic-light aliases
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "depressed" | "blue" => Some(Self::Depressed),
            "weakening" | "yellow_blue" => Some(Self::Weakening),
            "stable" | "green" => Some(Self::Stable),
            "warming" | "yellow_red" => Some(Self::Warming),
            "overheated" | "red" => Some(Self::Overheated),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Depressed => "depressed",
            Self::Weakening => "weakening",
            Self::Stable => "stable",
            Self::Warming => "warming",
            Self::Overheated => "overheated",
        }
    }

    /// Heuristic category when no official indicator is published: oversold or
    /// fearful markets read as contraction, calm overbought markets as overheated.
    pub fn derive(momentum: f64, volatility_index: f64) -> Self {
        if volatility_index > 30.0 || momentum < 30.0 {
            Self::Depressed
        } else if volatility_index > 25.0 || momentum < 40.0 {
            Self::Weakening
        } else if volatility_index < 15.0 && momentum > 70.0 {
            Self::Overheated
        } else if volatility_index < 20.0 && momentum > 60.0 {
            Self::Warming
        } else {
            Self::Stable
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Flat,
    Down,
}

impl Trend {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "up" | "rising" | "uptrend" => Some(Self::Up),
            "flat" | "sideways" | "range" => Some(Self::Flat),
            "down" | "falling" | "downtrend" => Some(Self::Down),
            _ => None,
        }
    }
}

/// Macro market snapshot. Missing or malformed fields deserialize to `None`
/// instead of failing the whole snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Volatility index (VIX-like)
    #[serde(default, deserialize_with = "lenient_number")]
    pub volatility_index: Option<f64>,

    /// Broad-market RSI-like momentum, 0-100
    #[serde(default, deserialize_with = "lenient_number")]
    pub momentum: Option<f64>,

    #[serde(default, deserialize_with = "lenient_macro")]
    pub macro_signal: Option<MacroSignal>,

    #[serde(default, deserialize_with = "lenient_trend")]
    pub trend: Option<Trend>,

    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

impl MarketSnapshot {
    pub const fn new(volatility_index: f64, momentum: f64, macro_signal: MacroSignal) -> Self {
        Self {
            volatility_index: Some(volatility_index),
            momentum: Some(momentum),
            macro_signal: Some(macro_signal),
            trend: None,
            as_of: None,
        }
    }

    pub const fn with_trend(mut self, trend: Trend) -> Self {
        self.trend = Some(trend);
        self
    }

    /// Volatility index if present and sane (finite, non-negative)
    pub fn valid_volatility(&self) -> Option<f64> {
        self.volatility_index.filter(|v| v.is_finite() && *v >= 0.0)
    }

    /// Momentum if present and inside 0-100
    pub fn valid_momentum(&self) -> Option<f64> {
        self.momentum.filter(|m| m.is_finite() && (0.0..=100.0).contains(m))
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<f64>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn lenient_macro<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<MacroSignal>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(MacroSignal::parse))
}

fn lenient_trend<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Trend>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(Trend::parse))
}

// ============================================================================
// Scoring output
// ============================================================================

/// Signal tier, ordered from `Avoid` (lowest) to `Strong` (highest)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTier {
    Avoid,
    Weak,
    Moderate,
    Strong,
}

impl SignalTier {
    /// Top tier first
    pub const DESCENDING: [Self; 4] = [Self::Strong, Self::Moderate, Self::Weak, Self::Avoid];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Weak => "weak",
            Self::Avoid => "avoid",
        }
    }

    /// Traffic-light colour shown to users
    pub const fn light(self) -> &'static str {
        match self {
            Self::Strong => "green",
            Self::Moderate => "yellow",
            Self::Weak => "orange",
            Self::Avoid => "red",
        }
    }

    pub const fn recommendation(self) -> &'static str {
        match self {
            Self::Strong => "strongly recommended",
            Self::Moderate => "worth considering",
            Self::Weak => "consider with caution",
            Self::Avoid => "not recommended for now",
        }
    }
}

impl fmt::Display for SignalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the price sits inside its historical range
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBand {
    VeryLow,
    Low,
    Mid,
    High,
    VeryHigh,
}

impl PriceBand {
    pub const ALL: [Self; 5] = [Self::VeryLow, Self::Low, Self::Mid, Self::High, Self::VeryHigh];

    pub const fn index(self) -> usize {
        match self {
            Self::VeryLow => 0,
            Self::Low => 1,
            Self::Mid => 2,
            Self::High => 3,
            Self::VeryHigh => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "very low",
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
            Self::VeryHigh => "very high",
        }
    }

    pub const fn light(self) -> &'static str {
        match self {
            Self::VeryLow | Self::Low => "green",
            Self::Mid => "yellow",
            Self::High => "orange",
            Self::VeryHigh => "red",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::VeryLow => "price near the bottom of its range, an excellent entry point",
            Self::Low => "price below the middle of its range, suitable for buying the dip",
            Self::Mid => "price within a reasonable range, allocate normally",
            Self::High => "price elevated, consider trimming the allocation",
            Self::VeryHigh => "price near the top of its range, consider waiting for a pullback",
        }
    }
}

/// Price-level descriptor attached to every scored instrument
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// 0-100 position of the price inside [range_low, range_high]
    pub percentile: f64,
    pub band: PriceBand,
    /// Allocation factor: >1 for cheap, <1 for expensive
    pub safety_multiplier: f64,
    pub range_high: Option<f64>,
    pub range_low: Option<f64>,
}

impl PriceLevel {
    pub fn description(&self) -> &'static str {
        self.band.description()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub fundamental: f64,
    pub technical: f64,
    pub liquidity: f64,
    pub price_level: f64,
}

/// One instrument after scoring; immutable for the rest of the cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredInstrument {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub scores: SubScores,
    /// Weighted sum of the four sub-scores, 0-100
    pub final_score: f64,
    pub tier: SignalTier,
    pub price_level: PriceLevel,
}

// ============================================================================
// Market strategy
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyLabel {
    Aggressive,
    Balanced,
    Conservative,
}

impl StrategyLabel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Balanced => "balanced",
            Self::Conservative => "conservative",
        }
    }
}

impl fmt::Display for StrategyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketScores {
    pub volatility: f64,
    pub momentum: f64,
    pub macro_economic: f64,
    pub total: f64,
}

/// Indicator values the classifier actually used, after default substitution
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketInputs {
    pub volatility_index: f64,
    pub momentum: f64,
    pub macro_signal: Option<MacroSignal>,
    pub trend: Option<Trend>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketStrategy {
    pub label: StrategyLabel,
    /// Fraction of available capital to deploy now, in (0, 1]
    pub deployment_ratio: Decimal,
    pub description: String,
    pub scores: MarketScores,
    pub inputs: MarketInputs,
}

// ============================================================================
// Allocation output
// ============================================================================

/// One line of the allocation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub name: String,

    /// Whole units to buy, always a positive multiple of the lot size
    pub quantity: u64,

    pub unit_price: Decimal,

    /// quantity * unit_price
    pub amount: Decimal,

    /// Share of the deployable capital, in percent
    pub weight_pct: Decimal,

    pub final_score: f64,
    pub tier: SignalTier,
    pub price_band: PriceBand,

    /// Why this instrument made the cut
    pub rationale: String,
}

// ============================================================================
// Risk output
// ============================================================================

/// Severity, ordered so that `High` sorts last; reverse it for high-first lists
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Breadth,
    Valuation,
    MacroTechnical,
    Volatility,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertDetail {
    pub observed: f64,
    pub threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub category: RiskCategory,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<AlertDetail>,
}

/// Coarse risk level of a whole report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

// ============================================================================
// Investor profile
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "conservative" | "low" => Some(Self::Conservative),
            "moderate" | "medium" | "balanced" => Some(Self::Moderate),
            "aggressive" | "high" => Some(Self::Aggressive),
            _ => None,
        }
    }
}

/// The request side of a recommendation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvestorProfile {
    /// Cash available for investing
    pub available_capital: Decimal,

    /// How many instruments to hold (0 = let the allocator decide)
    #[serde(default)]
    pub holdings_count: usize,

    /// Optional whitelist; empty means the whole universe
    #[serde(default)]
    pub selected_symbols: Vec<String>,

    #[serde(default)]
    pub risk_tolerance: RiskTolerance,
}

impl InvestorProfile {
    pub const fn new(available_capital: Decimal) -> Self {
        Self {
            available_capital,
            holdings_count: 0,
            selected_symbols: Vec::new(),
            risk_tolerance: RiskTolerance::Moderate,
        }
    }

    pub const fn with_holdings(mut self, count: usize) -> Self {
        self.holdings_count = count;
        self
    }

    pub fn with_selection<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_symbols = symbols
            .into_iter()
            .map(|s| s.into().trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub const fn with_tolerance(mut self, tolerance: RiskTolerance) -> Self {
        self.risk_tolerance = tolerance;
        self
    }

    /// Whether the symbol passes the whitelist
    pub fn selects(&self, symbol: &str) -> bool {
        self.selected_symbols.is_empty()
            || self
                .selected_symbols
                .iter()
                .any(|s| s.eq_ignore_ascii_case(symbol))
    }

    /// Parse a loosely-typed request body.
    ///
    /// Capital may arrive as a JSON number or a numeric string (query-string
    /// style clients send strings). Anything else is an input-shape error.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| AdvisorError::InvalidProfile("profile must be a JSON object".into()))?;

        let capital_value = ["available_capital", "available_cash", "funds"]
            .iter()
            .find_map(|key| obj.get(*key))
            .ok_or_else(|| AdvisorError::InvalidProfile("available_capital is required".into()))?;
        let available_capital = parse_decimal(capital_value).ok_or_else(|| {
            AdvisorError::InvalidProfile(format!("available_capital must be numeric, got {capital_value}"))
        })?;

        let holdings_count = match obj.get("holdings_count").or_else(|| obj.get("num_etfs")) {
            None | Some(Value::Null) => 0,
            Some(v) => v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| AdvisorError::InvalidProfile("holdings_count must be a non-negative integer".into()))?,
        };

        let selected: Vec<String> = match obj.get("selected_symbols") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        AdvisorError::InvalidProfile("selected_symbols must be a list of strings".into())
                    })
                })
                .collect::<Result<_>>()?,
            Some(_) => {
                return Err(AdvisorError::InvalidProfile(
                    "selected_symbols must be a list of strings".into(),
                ));
            }
        };

        let risk_tolerance = match obj.get("risk_tolerance") {
            None | Some(Value::Null) => RiskTolerance::default(),
            Some(v) => v.as_str().and_then(RiskTolerance::parse).ok_or_else(|| {
                AdvisorError::InvalidProfile(format!("unknown risk_tolerance {v}"))
            })?,
        };

        Ok(Self::new(available_capital)
            .with_holdings(holdings_count)
            .with_selection(selected)
            .with_tolerance(risk_tolerance))
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().replace(',', ""),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Convert a score-space float into money-space, rounded to 6 places
pub(crate) fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).map_or(Decimal::ZERO, |d| d.round_dp(6))
}

pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_tradable_price() {
        let etf = InstrumentSnapshot::new(" 0050 ", "Yuanta Taiwan 50", dec!(185.5));
        assert_eq!(etf.symbol, "0050");
        assert_eq!(etf.tradable_price(), Some(dec!(185.5)));

        let zero = InstrumentSnapshot::new("0056", "High Dividend", Decimal::ZERO);
        assert_eq!(zero.tradable_price(), None);
    }

    #[test]
    fn test_market_snapshot_lenient_fields() {
        let snapshot: MarketSnapshot = serde_json::from_value(json!({
            "volatility_index": "27.5",
            "momentum": "n/a",
            "macro_signal": "purple",
            "trend": "rising"
        }))
        .unwrap();

        assert_eq!(snapshot.volatility_index, Some(27.5));
        assert_eq!(snapshot.momentum, None);
        assert_eq!(snapshot.macro_signal, None);
        assert_eq!(snapshot.trend, Some(Trend::Up));
    }

    #[test]
    fn test_macro_signal_aliases_and_order() {
        assert_eq!(MacroSignal::parse("Yellow-Blue"), Some(MacroSignal::Weakening));
        assert_eq!(MacroSignal::parse("green"), Some(MacroSignal::Stable));
        assert!(MacroSignal::Depressed < MacroSignal::Overheated);
        assert_eq!(MacroSignal::derive(25.0, 18.0), MacroSignal::Depressed);
        assert_eq!(MacroSignal::derive(75.0, 12.0), MacroSignal::Overheated);
        assert_eq!(MacroSignal::derive(50.0, 18.0), MacroSignal::Stable);
    }

    #[test]
    fn test_profile_from_json_accepts_numeric_string() {
        let profile = InvestorProfile::from_json(&json!({
            "available_capital": "150,000",
            "holdings_count": 4,
            "selected_symbols": ["0050", "00878"],
            "risk_tolerance": "low"
        }))
        .unwrap();

        assert_eq!(profile.available_capital, dec!(150000));
        assert_eq!(profile.holdings_count, 4);
        assert!(profile.selects("00878"));
        assert!(!profile.selects("0056"));
        assert_eq!(profile.risk_tolerance, RiskTolerance::Conservative);
    }

    #[test]
    fn test_profile_from_json_rejects_bad_shapes() {
        let err = InvestorProfile::from_json(&json!({"available_capital": "lots"})).unwrap_err();
        assert!(matches!(err, AdvisorError::InvalidProfile(_)));

        assert!(InvestorProfile::from_json(&json!([1, 2])).is_err());
        assert!(InvestorProfile::from_json(&json!({"funds": 1000, "holdings_count": -1})).is_err());
        assert!(InvestorProfile::from_json(&json!({"funds": 1000, "selected_symbols": "0050"})).is_err());
    }

    #[test]
    fn test_profile_allows_non_positive_capital() {
        let profile = InvestorProfile::from_json(&json!({"available_cash": -500})).unwrap();
        assert_eq!(profile.available_capital, dec!(-500));
        assert!(profile.selects("ANY"));
    }
}
