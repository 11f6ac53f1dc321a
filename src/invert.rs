//! Series inversion: present downtrends as uptrends.
//!
//! Both modes reflect every price through a pivot: `Negate` through zero
//! (p -> -p), `Mirror` through the median of the series' close prices
//! (p -> 2*median - p). The high/low roles swap under reflection (the new
//! high is the reflected old low) so the `high >= low` invariant survives.
//!
//! Inversion is a pure data transform, decoupled from any rendering: a chart
//! collaborator draws the already-inverted series without knowing inversion
//! happened. To detect the inverse pattern, scan the inverted series against
//! the *identically inverted* level - see [`invert_level`]. Passing an
//! uninverted level silently produces meaningless signals; the engine cannot
//! detect the mismatch.

use crate::{Result, ScanError, OHLCV};

/// How to flip a price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InvertMode {
    /// Reflect through the median close. Keeps typical series positive, but
    /// only guarantees positivity when every price is <= 2*median - callers
    /// must not assume it in general.
    Mirror,
    /// Multiply by -1. Exact round-trip, produces negative prices.
    Negate,
}

/// Concrete owned bar, produced by inversion and usable anywhere a series
/// is consumed
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub timestamp: Option<i64>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

/// Invert a series, returning new bars of identical length, timestamps, and
/// volumes.
///
/// `Negate` on an empty series returns an empty series; `Mirror` fails with
/// `InsufficientData` because the median is undefined. Non-finite closes are
/// excluded from the median; a series with no finite close at all also fails.
///
/// Applying the same mode twice reproduces the original series - exactly for
/// `Negate`, within floating-point tolerance for `Mirror` (the median is a
/// fixed point of the reflection).
pub fn invert_series<T: OHLCV>(bars: &[T], mode: InvertMode) -> Result<Vec<Bar>> {
    let pivot = match mode {
        InvertMode::Negate => 0.0,
        InvertMode::Mirror => close_median(bars)?,
    };
    Ok(bars.iter().map(|bar| reflect_bar(bar, pivot)).collect())
}

/// Transform a level the same way [`invert_series`] transforms prices.
///
/// A scan of inverted bars is only meaningful against the level inverted
/// with the same mode (and, for `Mirror`, the same original series - the
/// median is computed from `bars` exactly as `invert_series` does).
pub fn invert_level<T: OHLCV>(bars: &[T], level: f64, mode: InvertMode) -> Result<f64> {
    match mode {
        InvertMode::Negate => Ok(-level),
        InvertMode::Mirror => Ok(2.0 * close_median(bars)? - level),
    }
}

fn reflect_bar<T: OHLCV>(bar: &T, pivot: f64) -> Bar {
    let reflect = |p: f64| 2.0 * pivot - p;
    Bar {
        timestamp: bar.timestamp(),
        open: reflect(bar.open()),
        // Reflection reverses order: the old low maps to the new high
        high: reflect(bar.low()),
        low: reflect(bar.high()),
        close: reflect(bar.close()),
        volume: bar.volume(),
    }
}

/// Median of the finite close prices (average of the middle two for even
/// counts)
fn close_median<T: OHLCV>(bars: &[T]) -> Result<f64> {
    let mut closes: Vec<f64> = bars
        .iter()
        .map(|bar| bar.close())
        .filter(|close| close.is_finite())
        .collect();
    if closes.is_empty() {
        return Err(ScanError::InsufficientData { need: 1, got: 0 });
    }
    closes.sort_by(f64::total_cmp);
    let mid = closes.len() / 2;
    if closes.len() % 2 == 1 {
        Ok(closes[mid])
    } else {
        Ok((closes[mid - 1] + closes[mid]) / 2.0)
    }
}
