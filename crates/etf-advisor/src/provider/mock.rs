//! Mock Market Data Provider
//!
//! For testing and demo purposes. Generates deterministic daily histories
//! for a fixed Taiwan ETF universe and derives every fact through the
//! indicator module, so the output looks like a real gateway's.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::MarketDataProvider;
use crate::error::{AdvisorError, Result};
use crate::indicators;
use crate::model::{FundamentalFacts, InstrumentSnapshot, MacroSignal, MarketSnapshot, to_decimal};

/// Trading days of generated history (about one year)
const HISTORY_DAYS: usize = 260;

const MA_WINDOWS: [u32; 4] = [5, 10, 20, 60];

/// Stand-in for the broad-market volatility index
const DEFAULT_VOLATILITY_INDEX: f64 = 18.5;

/// Shape of one synthetic instrument
struct Profile {
    symbol: &'static str,
    name: &'static str,
    base_price: f64,
    /// Total drift over the history, as a fraction
    drift: f64,
    /// Cycle amplitude, as a fraction
    amplitude: f64,
    cycle_days: f64,
    phase: f64,
    expense_ratio: f64,
    aum: f64,
    dividend_yield: f64,
    base_volume: f64,
}

#[rustfmt::skip]
static UNIVERSE: [Profile; 10] = [
    Profile { symbol: "0050",   name: "Yuanta Taiwan Top 50",                 base_price: 180.0, drift: 0.12,  amplitude: 0.06, cycle_days: 90.0,  phase: 0.3, expense_ratio: 0.43, aum: 3.5e11, dividend_yield: 0.030, base_volume: 8.0e6 },
    Profile { symbol: "0056",   name: "Yuanta Taiwan High Dividend",          base_price: 38.0,  drift: 0.02,  amplitude: 0.05, cycle_days: 120.0, phase: 4.2, expense_ratio: 0.74, aum: 3.8e11, dividend_yield: 0.065, base_volume: 2.5e7 },
    Profile { symbol: "006208", name: "Fubon Taiwan 50",                      base_price: 105.0, drift: 0.11,  amplitude: 0.06, cycle_days: 90.0,  phase: 0.5, expense_ratio: 0.15, aum: 1.5e11, dividend_yield: 0.030, base_volume: 4.0e6 },
    Profile { symbol: "00878",  name: "Cathay Sustainable High Dividend",     base_price: 22.0,  drift: 0.04,  amplitude: 0.04, cycle_days: 100.0, phase: 3.6, expense_ratio: 0.25, aum: 4.0e11, dividend_yield: 0.060, base_volume: 4.0e7 },
    Profile { symbol: "00891",  name: "Cathay Taiwan Semiconductor",          base_price: 18.0,  drift: 0.18,  amplitude: 0.10, cycle_days: 70.0,  phase: 1.1, expense_ratio: 0.46, aum: 4.0e10, dividend_yield: 0.030, base_volume: 1.2e7 },
    Profile { symbol: "00881",  name: "Cathay Taiwan 5G Tech",                base_price: 24.0,  drift: 0.08,  amplitude: 0.09, cycle_days: 80.0,  phase: 2.4, expense_ratio: 0.46, aum: 3.0e10, dividend_yield: 0.040, base_volume: 1.0e7 },
    Profile { symbol: "00692",  name: "Fubon Corporate Governance 100",       base_price: 45.0,  drift: 0.09,  amplitude: 0.05, cycle_days: 110.0, phase: 5.0, expense_ratio: 0.15, aum: 2.0e10, dividend_yield: 0.035, base_volume: 1.5e6 },
    Profile { symbol: "00679B", name: "Yuanta US Treasury 20+ Year Bond",     base_price: 28.0,  drift: -0.06, amplitude: 0.03, cycle_days: 150.0, phase: 4.7, expense_ratio: 0.15, aum: 1.5e11, dividend_yield: 0.040, base_volume: 6.0e6 },
    Profile { symbol: "00713",  name: "Yuanta Taiwan Dividend Plus",          base_price: 52.0,  drift: 0.05,  amplitude: 0.05, cycle_days: 95.0,  phase: 1.9, expense_ratio: 0.41, aum: 1.5e11, dividend_yield: 0.070, base_volume: 9.0e6 },
    Profile { symbol: "00929",  name: "Fuh Hwa Taiwan Technology Dividend",   base_price: 19.0,  drift: -0.03, amplitude: 0.07, cycle_days: 85.0,  phase: 0.9, expense_ratio: 0.36, aum: 1.0e11, dividend_yield: 0.090, base_volume: 3.0e7 },
];

/// Broad-market index used for the macro snapshot
static INDEX: Profile = Profile {
    symbol: "TAIEX",
    name: "Taiwan Capitalization Weighted Stock Index",
    base_price: 20_000.0,
    drift: 0.08,
    amplitude: 0.04,
    cycle_days: 100.0,
    phase: 2.0,
    expense_ratio: 0.0,
    aum: 0.0,
    dividend_yield: 0.0,
    base_volume: 5.0e9,
};

impl Profile {
    #[allow(clippy::cast_precision_loss)]
    fn history(&self, days: usize) -> (Vec<f64>, Vec<f64>) {
        (0..days)
            .map(|day| {
                let t = day as f64;
                let trend = 1.0 + self.drift * t / days as f64;
                let cycle = 1.0 + self.amplitude * (t * std::f64::consts::TAU / self.cycle_days + self.phase).sin();
                let close = self.base_price * trend * cycle;
                let volume = self.base_volume * (1.0 + 0.3 * (t * 0.7 + self.phase).sin());
                (close, volume)
            })
            .unzip()
    }
}

/// Mock provider with deterministic histories
pub struct MockMarketDataProvider {
    market: Option<MarketSnapshot>,
    failing: HashSet<String>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl Default for MockMarketDataProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketDataProvider {
    pub fn new() -> Self {
        Self {
            market: None,
            failing: HashSet::new(),
            latency: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Serve a fixed market snapshot instead of the derived one
    pub fn with_market(mut self, market: MarketSnapshot) -> Self {
        self.market = Some(market);
        self
    }

    /// Make these symbols fail with a provider error
    pub fn with_failures<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing = symbols.into_iter().map(|s| s.into().to_uppercase()).collect();
        self
    }

    /// Delay every instrument response
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of fetches served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn profile(symbol: &str) -> Option<&'static Profile> {
        UNIVERSE.iter().find(|p| p.symbol.eq_ignore_ascii_case(symbol))
    }

    fn derived_market() -> MarketSnapshot {
        let (closes, _) = INDEX.history(HISTORY_DAYS);
        let momentum = indicators::rsi(&closes, indicators::RSI_PERIOD);
        MarketSnapshot {
            volatility_index: Some(DEFAULT_VOLATILITY_INDEX),
            momentum: Some(momentum),
            macro_signal: Some(MacroSignal::derive(momentum, DEFAULT_VOLATILITY_INDEX)),
            trend: indicators::trend(&closes),
            as_of: Some(Utc::now()),
        }
    }

    fn build(profile: &Profile) -> Result<InstrumentSnapshot> {
        let (closes, volumes) = profile.history(HISTORY_DAYS);
        let last = closes
            .last()
            .copied()
            .ok_or_else(|| AdvisorError::PriceUnavailable(profile.symbol.to_string()))?;

        let fundamentals = FundamentalFacts {
            expense_ratio: Some(profile.expense_ratio),
            aum: Some(profile.aum),
            dividend_yield: Some(profile.dividend_yield),
            sharpe_ratio: indicators::sharpe_ratio(&closes),
        };

        let mut snapshot = InstrumentSnapshot::new(profile.symbol, profile.name, to_decimal(last).round_dp(2))
            .with_fundamentals(fundamentals)
            .with_technicals(indicators::technicals(&closes, &MA_WINDOWS))
            .with_liquidity(indicators::liquidity(&closes, &volumes));
        snapshot.updated_at = Some(Utc::now());
        Ok(snapshot)
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketDataProvider {
    async fn market_snapshot(&self) -> Result<MarketSnapshot> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.market.clone().unwrap_or_else(Self::derived_market))
    }

    async fn instrument(&self, symbol: &str) -> Result<InstrumentSnapshot> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let symbol = symbol.trim().to_uppercase();
        if self.failing.contains(&symbol) {
            return Err(AdvisorError::Provider(format!("simulated failure for {symbol}")));
        }
        let profile = Self::profile(&symbol).ok_or(AdvisorError::UnsupportedInstrument(symbol))?;
        Self::build(profile)
    }

    async fn universe(&self) -> Result<Vec<String>> {
        Ok(UNIVERSE.iter().map(|p| p.symbol.to_string()).collect())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mock"
    }
}
