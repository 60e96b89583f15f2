//! Advice Composer
//!
//! Deterministic formatting over already-computed facts. Nothing here
//! scores or allocates; every sentence is derived from the strategy, the
//! tier counts, the risk alerts and the investor profile.

use serde::{Deserialize, Serialize};

use crate::config::AdviceConfig;
use crate::model::{
    InvestorProfile, MarketStrategy, RiskAlert, RiskLevel, RiskTolerance, ScoredInstrument, SignalTier,
    StrategyLabel,
};

/// Count of scored instruments per signal tier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDistribution {
    pub strong: usize,
    pub moderate: usize,
    pub weak: usize,
    pub avoid: usize,
}

impl TierDistribution {
    pub fn from_scored(scored: &[ScoredInstrument]) -> Self {
        scored.iter().fold(Self::default(), |mut acc, s| {
            match s.tier {
                SignalTier::Strong => acc.strong += 1,
                SignalTier::Moderate => acc.moderate += 1,
                SignalTier::Weak => acc.weak += 1,
                SignalTier::Avoid => acc.avoid += 1,
            }
            acc
        })
    }

    pub const fn total(&self) -> usize {
        self.strong + self.moderate + self.weak + self.avoid
    }
}

/// Best instrument of a thematic bucket
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallOut {
    pub theme: String,
    pub symbol: String,
    pub name: String,
    pub final_score: f64,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdviceReport {
    pub market_outlook: String,
    pub action_guidance: String,
    pub strategy_summary: String,
    pub distribution: TierDistribution,
    pub risk_level: RiskLevel,
    pub call_outs: Vec<CallOut>,
    pub tips: Vec<String>,
}

pub struct AdviceComposer<'a> {
    config: &'a AdviceConfig,
}

impl<'a> AdviceComposer<'a> {
    pub const fn new(config: &'a AdviceConfig) -> Self {
        Self { config }
    }

    pub fn compose(
        &self,
        strategy: &MarketStrategy,
        scored: &[ScoredInstrument],
        alerts: &[RiskAlert],
        profile: &InvestorProfile,
    ) -> AdviceReport {
        let distribution = TierDistribution::from_scored(scored);

        AdviceReport {
            market_outlook: self.outlook(&distribution),
            action_guidance: action_guidance(strategy.label).into(),
            strategy_summary: strategy.description.clone(),
            distribution,
            risk_level: risk_level(alerts.len()),
            call_outs: self.call_outs(scored),
            tips: self.tips(strategy, &distribution, profile),
        }
    }

    fn outlook(&self, distribution: &TierDistribution) -> String {
        let strong = distribution.strong;
        let candidates = strong + distribution.moderate;

        if distribution.total() == 0 {
            "No ETF data is available right now, so the market outlook cannot be assessed.".into()
        } else if strong >= self.config.positive_outlook_strong {
            format!("The market shows positive signals with {strong} strong ETFs; a good time to build positions.")
        } else if candidates >= self.config.normal_outlook_candidates {
            format!(
                "The market is in a normal range with {strong} strong and {} moderate ETFs; allocate in a balanced way.",
                distribution.moderate
            )
        } else {
            format!(
                "The market is broadly weak, but {candidates} ETFs are still worth considering; proceed with caution."
            )
        }
    }

    fn call_outs(&self, scored: &[ScoredInstrument]) -> Vec<CallOut> {
        self.config
            .themes
            .iter()
            .filter_map(|theme| {
                let best = scored
                    .iter()
                    .filter(|s| s.final_score >= theme.min_score && theme.matches(&s.name))
                    .max_by(|a, b| {
                        a.final_score
                            .total_cmp(&b.final_score)
                            .then_with(|| b.symbol.cmp(&a.symbol))
                    })?;

                Some(CallOut {
                    theme: theme.name.clone(),
                    symbol: best.symbol.clone(),
                    name: best.name.clone(),
                    final_score: best.final_score,
                    message: format!(
                        "Among {} ETFs, {} ({}) stands out and suits {}.",
                        theme.name, best.name, best.symbol, theme.audience
                    ),
                })
            })
            .collect()
    }

    fn tips(
        &self,
        strategy: &MarketStrategy,
        distribution: &TierDistribution,
        profile: &InvestorProfile,
    ) -> Vec<String> {
        let mut tips: Vec<String> = match strategy.label {
            StrategyLabel::Aggressive => vec![
                "The market is low; consider adding to quality ETFs in stages.".into(),
                "Focus on instruments with strong technicals and a low price level.".into(),
            ],
            StrategyLabel::Conservative => vec![
                "The market is elevated; wait for a pullback before entering in size.".into(),
                "Start with a small allocation and watch how the market develops.".into(),
            ],
            StrategyLabel::Balanced => vec![
                "Use regular fixed-amount investing to spread timing risk.".into(),
                "Balance different kinds of ETFs to reduce concentration risk.".into(),
            ],
        };

        if distribution.strong >= self.config.diversify_tip_strong {
            tips.push("Several high-scoring ETFs are available; diversify across them.".into());
        }

        match (profile.risk_tolerance, strategy.label) {
            (RiskTolerance::Conservative, StrategyLabel::Aggressive) => tips.push(
                "Your risk tolerance is conservative; you may deploy less than the suggested amount.".into(),
            ),
            (RiskTolerance::Aggressive, StrategyLabel::Conservative) => tips.push(
                "Even with a high risk tolerance, the current market favours patience over size.".into(),
            ),
            _ => {}
        }

        tips
    }
}

const fn action_guidance(label: StrategyLabel) -> &'static str {
    match label {
        StrategyLabel::Aggressive => {
            "Enter actively, concentrate on strong-tier ETFs and lean into low price levels."
        }
        StrategyLabel::Balanced => {
            "Invest on a regular schedule to spread timing risk and build positions gradually."
        }
        StrategyLabel::Conservative => {
            "Stay conservative, prefer the highest-scoring ETFs and wait for better entry points."
        }
    }
}

/// Coarse level from the alert count: 0 low, 1-2 medium, more high
pub const fn risk_level(alert_count: usize) -> RiskLevel {
    match alert_count {
        0 => RiskLevel::Low,
        1 | 2 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}
