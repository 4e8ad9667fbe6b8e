//! Presentation figures derived from price history.
//!
//! None of these are return computations against a prior close unless the
//! name says so: `period_change` is drift across the fetched window, while
//! `day_change` compares the live price with the previous session close.
use crate::core::market::HistoryPoint;
use std::fmt::Display;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Absolute and relative difference between two prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceChange {
    pub absolute: f64,
    /// `None` when the reference price is zero.
    pub percent: Option<f64>,
}

impl PriceChange {
    pub fn between(reference: f64, latest: f64) -> Self {
        let absolute = latest - reference;
        let percent = (reference != 0.0).then(|| absolute / reference * 100.0);
        PriceChange { absolute, percent }
    }

    pub fn is_gain(&self) -> bool {
        self.absolute >= 0.0
    }
}

/// Last close minus first close of the history. Needs at least two points.
pub fn period_change(history: &[HistoryPoint]) -> Option<PriceChange> {
    if history.len() < 2 {
        return None;
    }
    let first = history.first()?.close;
    let last = history.last()?.close;
    Some(PriceChange::between(first, last))
}

/// Current price minus the previous session close.
pub fn day_change(current_price: Option<f64>, previous_close: Option<f64>) -> Option<PriceChange> {
    Some(PriceChange::between(previous_close?, current_price?))
}

/// Simple return of the series in percent.
pub fn total_return_pct(closes: &[f64]) -> Option<f64> {
    let first = *closes.first()?;
    let last = *closes.last()?;
    if closes.len() < 2 || first == 0.0 {
        return None;
    }
    Some((last - first) / first * 100.0)
}

/// Annualised volatility in percent: sample standard deviation of the
/// session-over-session returns scaled by the square root of 252.
pub fn annualized_volatility_pct(closes: &[f64]) -> Option<f64> {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();
    if returns.len() < 2 {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0)
}

/// Mean of the trailing `window` closes.
pub fn simple_moving_average(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

impl Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Neutral => "NEUTRAL",
        })
    }
}

/// Moving average crossover signal on SMA20 and SMA50.
pub fn sma_signal(closes: &[f64]) -> Signal {
    let (Some(current), Some(sma20), Some(sma50)) = (
        closes.last().copied(),
        simple_moving_average(closes, 20),
        simple_moving_average(closes, 50),
    ) else {
        return Signal::Neutral;
    };

    if current > sma20 && sma20 > sma50 {
        Signal::Buy
    } else if current < sma20 && sma20 < sma50 {
        Signal::Sell
    } else {
        Signal::Neutral
    }
}

/// Per-symbol figures shown by the performance ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Performance {
    pub return_pct: f64,
    pub volatility_pct: Option<f64>,
    pub signal: Signal,
}

impl Performance {
    pub fn from_history(history: &[HistoryPoint]) -> Option<Self> {
        let closes: Vec<f64> = history.iter().map(|p| p.close).collect();
        Some(Performance {
            return_pct: total_return_pct(&closes)?,
            volatility_pct: annualized_volatility_pct(&closes),
            signal: sma_signal(&closes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn history(closes: &[f64]) -> Vec<HistoryPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| HistoryPoint {
                date: (start + chrono::Duration::days(i as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: 100,
            })
            .collect()
    }

    #[test]
    fn test_period_change_uses_first_and_last_close() {
        let change = period_change(&history(&[100.0, 90.0, 120.0, 110.0])).unwrap();
        assert!((change.absolute - 10.0).abs() < 1e-9);
        assert!((change.percent.unwrap() - 10.0).abs() < 1e-9);
        assert!(change.is_gain());
    }

    #[test]
    fn test_period_change_sign_matches_close_difference() {
        for closes in [
            vec![10.0, 8.0],
            vec![5.0, 7.0, 6.0],
            vec![3.0, 1.0, 9.0, 2.5],
            vec![4.0, 4.0],
        ] {
            let change = period_change(&history(&closes)).unwrap();
            let diff = closes[closes.len() - 1] - closes[0];
            assert_eq!(change.absolute.signum(), diff.signum());
            assert_eq!(change.is_gain(), diff >= 0.0);
        }
    }

    #[test]
    fn test_period_change_needs_two_points() {
        assert!(period_change(&[]).is_none());
        assert!(period_change(&history(&[100.0])).is_none());
    }

    #[test]
    fn test_zero_reference_has_no_percent() {
        let change = PriceChange::between(0.0, 5.0);
        assert_eq!(change.absolute, 5.0);
        assert!(change.percent.is_none());
    }

    #[test]
    fn test_day_change() {
        let change = day_change(Some(95.0), Some(100.0)).unwrap();
        assert_eq!(change.absolute, -5.0);
        assert_eq!(change.percent, Some(-5.0));
        assert!(day_change(None, Some(100.0)).is_none());
        assert!(day_change(Some(100.0), None).is_none());
    }

    #[test]
    fn test_volatility_of_constant_series_is_zero() {
        assert_eq!(annualized_volatility_pct(&[10.0, 10.0, 10.0, 10.0]), Some(0.0));
        assert!(annualized_volatility_pct(&[10.0, 11.0]).is_none());
    }

    #[test]
    fn test_volatility_matches_sample_std() {
        // Returns: +10%, -10%; mean 0, sample variance 0.02
        let vol = annualized_volatility_pct(&[100.0, 110.0, 99.0]).unwrap();
        let expected = 0.02f64.sqrt() * 252f64.sqrt() * 100.0;
        assert!((vol - expected).abs() < 1e-9);
    }

    #[test]
    fn test_simple_moving_average() {
        assert_eq!(simple_moving_average(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
        assert!(simple_moving_average(&[1.0], 2).is_none());
        assert!(simple_moving_average(&[1.0], 0).is_none());
    }

    #[test]
    fn test_sma_signal() {
        let rising: Vec<f64> = (1..=60).map(f64::from).collect();
        assert_eq!(sma_signal(&rising), Signal::Buy);

        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        assert_eq!(sma_signal(&falling), Signal::Sell);

        assert_eq!(sma_signal(&rising[..30]), Signal::Neutral);
        assert_eq!(Signal::Neutral.to_string(), "NEUTRAL");
    }

    #[test]
    fn test_performance_from_history() {
        let perf = Performance::from_history(&history(&[100.0, 110.0, 121.0])).unwrap();
        assert!((perf.return_pct - 21.0).abs() < 1e-9);
        assert_eq!(perf.signal, Signal::Neutral);
        assert!(Performance::from_history(&history(&[100.0])).is_none());
    }
}
