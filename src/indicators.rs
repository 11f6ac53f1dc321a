//! Indicator preparation: true range and ATR.
//!
//! The scanner consumes an ATR series aligned with the bar series to scale
//! its takeoff threshold by recent volatility. Both functions are pure:
//! input length n -> output length n, no state.

use crate::{OHLCVExt, Result, ScanError, Window, OHLCV};

/// Per-bar true range.
///
/// `tr[0]` is the plain high-low range (no previous close exists);
/// `tr[i]` = max(high - low, |high - prev_close|, |low - prev_close|).
pub fn true_range<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev_close = if i == 0 { f64::NAN } else { bars[i - 1].close() };
            bar.true_range(prev_close)
        })
        .collect()
}

/// Average true range: simple rolling mean of the true range over the
/// trailing `period` bars (window includes the current bar).
///
/// The smoothing choice is fixed: a plain rolling mean, not Wilder's
/// recursive smoothing. Downstream takeoff thresholds depend on this, so
/// swapping the method changes scan results.
///
/// Positions with fewer than `period - 1` prior bars are NaN (warm-up), and
/// NaN inputs make every window containing them NaN. The scanner treats a
/// non-finite ATR at a bar as "indicator undefined" and falls back to its
/// percentage threshold there.
pub fn atr<T: OHLCV>(bars: &[T], period: Window) -> Result<Vec<f64>> {
    if bars.is_empty() {
        return Err(ScanError::InsufficientData { need: 1, got: 0 });
    }
    let n = period.get();
    let tr = true_range(bars);
    let mut out = vec![f64::NAN; bars.len()];
    for i in (n - 1)..bars.len() {
        let window = &tr[i + 1 - n..=i];
        out[i] = window.iter().sum::<f64>() / n as f64;
    }
    Ok(out)
}
