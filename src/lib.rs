//! # levelscan - Breakout / Retest / Takeoff Level Scanner
//!
//! Deterministic detection of a three-phase price pattern around a key level:
//! a close breaking out above the level, a pullback that retests it, and an
//! aggressive takeoff beyond a percentage- or ATR-scaled threshold.
//!
//! The scan is a single forward pass over an ordered OHLC series with at most
//! one candidate pattern in progress, producing zero or more non-overlapping
//! [`Signal`] records. Data retrieval, rendering, and export stay outside the
//! crate: callers hand in any bar type implementing [`OHLCV`] and get plain
//! records back.
//!
//! ## Quick Start
//!
//! ```rust
//! use levelscan::prelude::*;
//!
//! // Define your OHLC data
//! struct Candle { t: i64, o: f64, h: f64, l: f64, c: f64 }
//!
//! impl OHLCV for Candle {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//!     fn timestamp(&self) -> Option<i64> { Some(self.t) }
//! }
//!
//! let bars = vec![
//!     Candle { t: 0,   o: 99.2,  h: 99.6,  l: 98.8,  c: 99.0 },  // below the level
//!     Candle { t: 60,  o: 99.0,  h: 101.4, l: 99.0,  c: 101.0 }, // breakout
//!     Candle { t: 120, o: 101.0, h: 101.2, l: 99.4,  c: 99.5 },  // dips, closes below
//!     Candle { t: 180, o: 99.5,  h: 100.8, l: 99.9,  c: 100.5 }, // retest holds
//!     Candle { t: 240, o: 100.5, h: 103.8, l: 100.4, c: 103.5 }, // takeoff
//! ];
//!
//! let params = ScanParams {
//!     tolerance: Tolerance::new(0.01).unwrap(),
//!     max_retest_window: Window::new(5).unwrap(),
//!     takeoff_window: Window::new(5).unwrap(),
//!     takeoff_pct: 0.03,
//!     atr: None,
//! };
//!
//! let signals = levelscan::scan(&bars, 100.0, params).unwrap();
//! assert_eq!(signals.len(), 1);
//! assert_eq!(signals[0].breakout_index, 1);
//! assert_eq!(signals[0].takeoff_index, 4);
//! ```

pub mod indicators;
pub mod invert;
pub mod params;

mod engine;

pub mod prelude {
    pub use crate::{
        // Indicators
        indicators::{atr, true_range},
        // Inversion
        invert::{invert_level, invert_series, Bar, InvertMode},
        // Parameters
        params::{get_fraction, get_window, ParamMeta, ParamType},
        // Engine
        scan,
        // Parallel
        scan_levels,
        AtrFilter,
        LevelScan,
        LevelScanner,
        // Core traits
        OHLCVExt,
        Result,
        // Errors
        ScanError,
        ScanParams,
        // Types
        Signal,
        Tolerance,
        Window,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that can occur while preparing inputs or scanning
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Indicator length {got} does not match series length {expected}")]
    LengthMismatch { expected: usize, got: usize },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Fractional band width or threshold (must be finite and > 0)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tolerance(f64);

impl Tolerance {
    /// Create a new Tolerance, validating the value is finite and positive
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(ScanError::InvalidValue(
                "Tolerance cannot be NaN or infinite",
            ));
        }
        if value <= 0.0 {
            return Err(ScanError::InvalidValue("Tolerance must be > 0"));
        }
        Ok(Self(value))
    }

    /// Create a Tolerance from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Tolerance {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Tolerance {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Tolerance::new(value).map_err(serde::de::Error::custom)
    }
}

/// Bar-count window (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Window(usize);

impl Window {
    /// Create a new Window, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(ScanError::InvalidValue("Window must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Window {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Window {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Window::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLC data trait
///
/// Timestamps, when provided, must be ordered, unique, and monotonically
/// increasing; an upstream data collaborator is expected to have validated
/// and deduplicated them. Bars with NaN fields are tolerated by the scan:
/// any comparison against NaN fails, so unevaluable bars are skipped
/// deterministically rather than crashing.
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    fn volume(&self) -> f64 {
        0.0
    }

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLC data
pub trait OHLCVExt: OHLCV {
    /// High-low span of the bar
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// True range against the previous bar's close.
    ///
    /// max(high - low, |high - prev_close|, |low - prev_close|); with a
    /// non-finite `prev_close` (first bar of a series) the plain high-low
    /// range is returned.
    #[inline]
    fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high() - self.low();
        if !prev_close.is_finite() {
            return hl;
        }
        let hc = (self.high() - prev_close).abs();
        let lc = (self.low() - prev_close).abs();
        // f64::max ignores NaN; propagate it so unevaluable bars stay
        // undefined instead of degrading to a partial maximum
        if hl.is_nan() || hc.is_nan() || lc.is_nan() {
            return f64::NAN;
        }
        hl.max(hc).max(lc)
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// SIGNAL - result of one completed pattern (Copy, no allocations)
// ============================================================

/// One completed breakout -> retest -> takeoff occurrence.
///
/// Emitted only when all three phases are confirmed and never mutated
/// afterwards. Serialized field names and 64-bit numeric precision are part
/// of the export contract: CSV/JSON reporting collaborators must be able to
/// round-trip these records back to the detection run.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Signal {
    pub breakout_index: usize,
    pub breakout_time: Option<i64>,
    pub retest_index: usize,
    pub retest_time: Option<i64>,
    pub takeoff_index: usize,
    pub takeoff_time: Option<i64>,
    /// The level the pattern was anchored to
    pub level: f64,
    /// Extreme reached while retesting the level
    pub retest_low: f64,
    pub takeoff_close: f64,
    /// takeoff_close / level - 1
    pub return_from_level: f64,
    /// ATR at the takeoff bar; `None` when the ATR filter was off or the
    /// value was undefined there
    pub atr_at_takeoff: Option<f64>,
}

impl Signal {
    /// Bars between breakout and retest
    #[inline]
    pub fn bars_to_retest(&self) -> usize {
        self.retest_index - self.breakout_index
    }

    /// Bars between retest and takeoff
    #[inline]
    pub fn bars_to_takeoff(&self) -> usize {
        self.takeoff_index - self.retest_index
    }
}

// ============================================================
// SCAN PARAMETERS
// ============================================================

/// ATR thrust filter: takeoff additionally requires the close to clear
/// `level + atr * mult`
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AtrFilter {
    /// ATR lookback length
    pub period: Window,
    /// ATR multiples above the level
    pub mult: f64,
}

impl Default for AtrFilter {
    fn default() -> Self {
        Self {
            period: Window::new_const(14),
            mult: 1.0,
        }
    }
}

/// Immutable configuration for one scan
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScanParams {
    /// Fractional half-width of the retest zone around the level
    pub tolerance: Tolerance,
    /// Bars allowed between breakout and retest
    pub max_retest_window: Window,
    /// Bars allowed between retest and takeoff
    pub takeoff_window: Window,
    /// Minimum fraction above the level a close must reach to confirm
    /// takeoff (finite, >= 0)
    pub takeoff_pct: f64,
    /// `Some` enables the ATR thrust filter
    pub atr: Option<AtrFilter>,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::new_const(0.001),
            max_retest_window: Window::new_const(20),
            takeoff_window: Window::new_const(20),
            takeoff_pct: 0.005,
            atr: Some(AtrFilter::default()),
        }
    }
}

impl ScanParams {
    /// Validate the plain-float fields (the newtypes are validated at
    /// construction)
    pub fn validate(&self) -> Result<()> {
        if !self.takeoff_pct.is_finite() || self.takeoff_pct < 0.0 {
            return Err(ScanError::InvalidValue(
                "takeoff_pct must be finite and >= 0",
            ));
        }
        if let Some(filter) = self.atr {
            if !filter.mult.is_finite() || filter.mult < 0.0 {
                return Err(ScanError::InvalidValue("atr mult must be finite and >= 0"));
            }
        }
        Ok(())
    }
}

// ============================================================
// LEVEL SCANNER
// ============================================================

/// The scanning engine: validated parameters plus the entry points.
///
/// A scanner is cheap to build and holds no per-scan state; `scan` is a pure
/// function of its inputs, so one scanner may be shared freely across
/// threads and repeated calls on the same inputs return identical results.
#[derive(Debug, Clone, Copy)]
pub struct LevelScanner {
    params: ScanParams,
}

impl LevelScanner {
    pub fn new(params: ScanParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    #[inline]
    pub fn params(&self) -> &ScanParams {
        &self.params
    }

    /// Scan `bars` for breakout -> retest -> takeoff occurrences around
    /// `level`, preparing the ATR series internally when the filter is
    /// enabled.
    ///
    /// Returns the signals ordered by takeoff index; an empty result is a
    /// valid outcome, not an error. The tolerance band is fractional, so a
    /// non-positive level yields an empty or inverted band and can never
    /// retest; when scanning inverted data prefer
    /// [`invert::InvertMode::Mirror`] with [`invert::invert_level`] so the
    /// level stays positive.
    pub fn scan<T: OHLCV>(&self, bars: &[T], level: f64) -> Result<Vec<Signal>> {
        self.check_inputs(bars, level)?;
        let atr_series = match self.params.atr {
            Some(filter) => Some(indicators::atr(bars, filter.period)?),
            None => None,
        };
        Ok(engine::scan_series(
            bars,
            level,
            &self.params,
            atr_series.as_deref(),
        ))
    }

    /// Like [`scan`](Self::scan) but with a caller-prepared indicator series
    /// (see [`indicators::atr`]), e.g. when the same series is scanned
    /// repeatedly. `atr` must be aligned with `bars`; it is only consulted
    /// when the ATR filter is enabled.
    pub fn scan_with_atr<T: OHLCV>(
        &self,
        bars: &[T],
        level: f64,
        atr: &[f64],
    ) -> Result<Vec<Signal>> {
        self.check_inputs(bars, level)?;
        if atr.len() != bars.len() {
            return Err(ScanError::LengthMismatch {
                expected: bars.len(),
                got: atr.len(),
            });
        }
        Ok(engine::scan_series(bars, level, &self.params, Some(atr)))
    }

    fn check_inputs<T: OHLCV>(&self, bars: &[T], level: f64) -> Result<()> {
        if bars.len() < 2 {
            return Err(ScanError::InsufficientData {
                need: 2,
                got: bars.len(),
            });
        }
        if !level.is_finite() {
            return Err(ScanError::InvalidValue("level must be finite"));
        }
        Ok(())
    }
}

/// Scan a series for the pattern around a single level.
///
/// Convenience for [`LevelScanner::new`] followed by [`LevelScanner::scan`].
pub fn scan<T: OHLCV>(bars: &[T], level: f64, params: ScanParams) -> Result<Vec<Signal>> {
    LevelScanner::new(params)?.scan(bars, level)
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning one candidate level
#[derive(Debug, Clone, serde::Serialize)]
pub struct LevelScan {
    pub level: f64,
    pub signals: Vec<Signal>,
}

/// Scan one series against many candidate levels in parallel.
///
/// The ATR series is prepared once and shared; results come back in the
/// order of `levels`. Fails up front on bad parameters, a too-short series,
/// or any non-finite level.
pub fn scan_levels<T: OHLCV + Sync>(
    bars: &[T],
    levels: &[f64],
    params: ScanParams,
) -> Result<Vec<LevelScan>> {
    let scanner = LevelScanner::new(params)?;
    if bars.len() < 2 {
        return Err(ScanError::InsufficientData {
            need: 2,
            got: bars.len(),
        });
    }
    let atr_series = match params.atr {
        Some(filter) => Some(indicators::atr(bars, filter.period)?),
        None => None,
    };
    let atr_ref = atr_series.as_deref();

    levels
        .par_iter()
        .map(|&level| {
            if !level.is_finite() {
                return Err(ScanError::InvalidValue("level must be finite"));
            }
            Ok(LevelScan {
                level,
                signals: engine::scan_series(bars, level, scanner.params(), atr_ref),
            })
        })
        .collect()
}

// ============================================================
// TESTS
// ============================================================
