//! # etf-advisor
//!
//! Contrarian ETF recommendation engine: reads the market regime, scores a
//! universe of funds and sizes a whole-unit allocation with risk alerts and
//! plain-language advice.
//!
//! ## Philosophy
//!
//! - **Buy fear, trim greed** - High volatility and oversold momentum raise the deployment ratio
//! - **Cheap beats expensive** - Price-level safety multipliers tilt weight toward the bottom of the range
//! - **Missing data is neutral** - Absent facts score 50 instead of failing the cycle
//! - **Never over-invest** - Positions round down to whole lots; the residual is disclosed
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   classify   │──▶│    score     │──▶│   allocate   │──▶│ assess risks │──▶│compose advice│
//! │    market    │   │ instruments  │   │  whole lots  │   │              │   │              │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//!  VIX/RSI/macro      fundamental 30%     deployable =       breadth          outlook, tiers,
//!  -> aggressive 80%  technical   40%     capital * ratio    valuation        risk level,
//!     balanced   60%  liquidity   15%     weight = score *   overbought       themed call-outs
//!     conservative40% price level 15%     safety multiplier  panic volatility
//! ```
//!
//! ## Example
//!
//! ```
//! use etf_advisor::{InvestorProfile, MarketSnapshot, RecommendationEngine};
//! use rust_decimal_macros::dec;
//!
//! let engine = RecommendationEngine::default();
//! let rec = engine.recommend(&InvestorProfile::new(dec!(100000)), &[], &MarketSnapshot::default());
//! assert!(rec.positions().is_empty());
//! ```

pub mod advice;
pub mod config;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod model;
pub mod provider;
pub mod risk;
pub mod scoring;
pub mod strategy;

pub use advice::{AdviceReport, CallOut, TierDistribution};
pub use config::EngineConfig;
pub use engine::{Recommendation, RecommendationEngine, UniverseSummary};
pub use error::{AdvisorError, Result};
pub use model::{
    InstrumentSnapshot, InvestorProfile, MacroSignal, MarketSnapshot, MarketStrategy, Position, PriceBand,
    RiskAlert, RiskLevel, RiskTolerance, ScoredInstrument, Severity, SignalTier, StrategyLabel, Trend,
};
pub use provider::{
    CachedProvider, FetchOptions, HttpGatewayProvider, MarketDataProvider, MockMarketDataProvider,
    fetch_instruments, fetch_universe,
};
pub use strategy::AllocationPlan;
