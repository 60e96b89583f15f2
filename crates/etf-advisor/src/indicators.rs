//! Technical Indicators
//!
//! Plain arithmetic over daily close and volume series, oldest first. Every
//! function degrades to a neutral reading when the history is too short.

use std::collections::BTreeMap;

use crate::model::{BollingerBands, LiquidityFacts, Macd, TechnicalFacts, Trend};

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_WIDTH: f64 = 2.0;
pub const TRADING_DAYS: f64 = 252.0;
pub const RISK_FREE_RATE: f64 = 0.02;

/// Minimum history for a meaningful Sharpe estimate
const SHARPE_MIN_POINTS: usize = 20;

/// Relative Strength Index over simple rolling means of gains and losses.
///
/// Returns 50 when fewer than `period + 1` closes are available or when
/// the window is perfectly flat.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }

    let window = &closes[closes.len() - period - 1..];
    let (gain, loss) = window.windows(2).fold((0.0, 0.0), |(g, l), w| {
        let delta = w[1] - w[0];
        if delta > 0.0 { (g + delta, l) } else { (g, l - delta) }
    });

    if loss == 0.0 {
        return if gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = gain / loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Exponentially weighted mean with span smoothing, normalised by the
/// cumulative weight so early values are not biased toward zero.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    #[allow(clippy::cast_precision_loss)]
    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    values
        .iter()
        .map(|v| {
            numerator = v + decay * numerator;
            denominator = 1.0 + decay * denominator;
            numerator / denominator
        })
        .collect()
}

/// MACD(fast, slow, signal); all zeros with fewer than `slow + signal` closes
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    if closes.len() < slow + signal {
        return Macd {
            line: 0.0,
            signal: 0.0,
            histogram: 0.0,
        };
    }

    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema(&line, signal);

    let last_line = line.last().copied().unwrap_or(0.0);
    let last_signal = signal_line.last().copied().unwrap_or(0.0);
    Macd {
        line: last_line,
        signal: last_signal,
        histogram: last_line - last_signal,
    }
}

/// Simple moving average of the last `window` closes, or the last close
/// when the history is shorter than the window
pub fn sma(closes: &[f64], window: usize) -> Option<f64> {
    let last = closes.last().copied()?;
    if window == 0 || closes.len() < window {
        return Some(last);
    }
    Some(mean(&closes[closes.len() - window..]))
}

/// Bollinger bands; ±2% around the last close when the history is short
pub fn bollinger(closes: &[f64], period: usize, width: f64) -> Option<BollingerBands> {
    let last = closes.last().copied()?;
    if period < 2 || closes.len() < period {
        return Some(BollingerBands {
            upper: last * 1.02,
            middle: last,
            lower: last * 0.98,
        });
    }

    let window = &closes[closes.len() - period..];
    let middle = mean(window);
    let spread = sample_std(window).unwrap_or(0.0) * width;
    Some(BollingerBands {
        upper: middle + spread,
        middle,
        lower: middle - spread,
    })
}

/// Highest and lowest close of the whole series
pub fn range(closes: &[f64]) -> Option<(f64, f64)> {
    let finite = closes.iter().copied().filter(|c| c.is_finite());
    let (high, low) = finite.fold((f64::NEG_INFINITY, f64::INFINITY), |(h, l), c| (h.max(c), l.min(c)));
    (high.is_finite() && low.is_finite()).then_some((high, low))
}

/// Daily simple returns
pub fn returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Annualised Sharpe proxy: (mean return - risk free) / volatility
pub fn sharpe_ratio(closes: &[f64]) -> Option<f64> {
    if closes.len() < SHARPE_MIN_POINTS {
        return None;
    }
    let daily = returns(closes);
    let volatility = sample_std(&daily)? * TRADING_DAYS.sqrt();
    if volatility <= 0.0 {
        return Some(0.0);
    }
    let annual_return = mean(&daily) * TRADING_DAYS;
    Some((annual_return - RISK_FREE_RATE) / volatility)
}

/// Volume level and stability plus a spread estimate of half the daily
/// return standard deviation
pub fn liquidity(closes: &[f64], volumes: &[f64]) -> LiquidityFacts {
    let avg_volume = (!volumes.is_empty()).then(|| mean(volumes));
    let volume_volatility = match (avg_volume, sample_std(volumes)) {
        (Some(avg), Some(std)) if avg > 0.0 => Some(std / avg),
        _ => None,
    };
    let spread = sample_std(&returns(closes)).map(|std| std * 0.5);

    LiquidityFacts {
        avg_volume,
        volume_volatility,
        spread,
    }
}

/// Every technical reading the scorer consumes, with moving averages for
/// the requested windows
pub fn technicals(closes: &[f64], ma_windows: &[u32]) -> TechnicalFacts {
    if closes.is_empty() {
        return TechnicalFacts::default();
    }

    let moving_averages: BTreeMap<u32, f64> = ma_windows
        .iter()
        .filter_map(|w| Some((*w, sma(closes, usize::try_from(*w).ok()?)?)))
        .collect();
    let (range_high, range_low) = range(closes).unzip();

    TechnicalFacts {
        rsi: Some(rsi(closes, RSI_PERIOD)),
        macd: Some(macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL)),
        moving_averages,
        bollinger: bollinger(closes, BOLLINGER_PERIOD, BOLLINGER_WIDTH),
        range_high,
        range_low,
    }
}

/// Direction of the last close against its 20-day average
pub fn trend(closes: &[f64]) -> Option<Trend> {
    let last = closes.last().copied()?;
    let average = sma(closes, 20)?;
    Some(if last > average {
        Trend::Up
    } else if last < average {
        Trend::Down
    } else {
        Trend::Flat
    })
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with one degree of freedom removed
#[allow(clippy::cast_precision_loss)]
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}
