//! Parameter metadata for the level scanner
//!
//! This module provides metadata about scan parameters, enabling:
//! - Grid search over parameter ranges
//! - Parameter documentation
//! - Construction of [`ScanParams`] from a name -> value map
//!
//! # Example
//!
//! ```rust
//! use levelscan::params::ParamMeta;
//! use levelscan::prelude::*;
//!
//! for param in ScanParams::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{AtrFilter, Result, ScanError, ScanParams, Tolerance, Window};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Fractional value (band widths, percentage thresholds, multipliers)
  Fraction,
  /// Bar count (positive integer)
  Count,
  /// On/off switch (0.0 or 1.0)
  Flag,
}

/// Metadata for a single scan parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "max_retest_window")
  pub name: &'static str,
  /// Parameter type (Fraction, Count, or Flag)
  pub param_type: ParamType,
  /// Default value
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  /// Create a new ParamMeta for a Fraction parameter
  pub const fn fraction(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Fraction, default, range, description }
  }

  /// Create a new ParamMeta for a Count parameter
  pub const fn count(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Count, default, range, description }
  }

  /// Create a new ParamMeta for a Flag parameter
  pub const fn flag(name: &'static str, default: f64, description: &'static str) -> Self {
    Self { name, param_type: ParamType::Flag, default, range: (0.0, 1.0, 1.0), description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(ScanError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Fraction => Ok(()),
      ParamType::Count => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(ScanError::InvalidValue("Count must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Flag => {
        if value != 0.0 && value != 1.0 {
          return Err(ScanError::InvalidValue("Flag must be 0 or 1"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// SCAN PARAMETER METADATA
// ============================================================

/// All scan parameters with defaults and optimization ranges
pub const SCAN_PARAM_META: &[ParamMeta] = &[
  ParamMeta::fraction(
    "tolerance",
    0.001,
    (0.0001, 0.005, 0.0001),
    "Fractional half-width of the retest zone around the level",
  ),
  ParamMeta::count(
    "max_retest_window",
    20.0,
    (1.0, 50.0, 1.0),
    "Bars allowed between breakout and retest",
  ),
  ParamMeta::count(
    "takeoff_window",
    20.0,
    (1.0, 50.0, 1.0),
    "Bars allowed between retest and takeoff",
  ),
  ParamMeta::fraction(
    "takeoff_pct",
    0.005,
    (0.001, 0.03, 0.001),
    "Minimum fraction above the level a close must reach to confirm takeoff",
  ),
  ParamMeta::flag("use_atr", 1.0, "ATR thrust filter on/off"),
  ParamMeta::count("atr_period", 14.0, (7.0, 28.0, 1.0), "ATR lookback length"),
  ParamMeta::fraction(
    "atr_mult",
    1.0,
    (0.5, 3.0, 0.1),
    "ATR multiples above the level required for takeoff",
  ),
];

impl ScanParams {
  /// Returns metadata for all configurable parameters
  pub fn param_meta() -> &'static [ParamMeta] {
    SCAN_PARAM_META
  }

  /// Creates scan parameters from a name -> value map
  ///
  /// Missing parameters use their default values; `use_atr` is a 0/1 flag
  /// selecting whether `atr_period`/`atr_mult` apply at all.
  pub fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    let use_atr = params.get("use_atr").copied().unwrap_or(1.0) != 0.0;
    let built = Self {
      tolerance: get_fraction(params, "tolerance", 0.001)?,
      max_retest_window: get_window(params, "max_retest_window", 20)?,
      takeoff_window: get_window(params, "takeoff_window", 20)?,
      takeoff_pct: params.get("takeoff_pct").copied().unwrap_or(0.005),
      atr: if use_atr {
        Some(AtrFilter {
          period: get_window(params, "atr_period", 14)?,
          mult: params.get("atr_mult").copied().unwrap_or(1.0),
        })
      } else {
        None
      },
    };
    built.validate()?;
    Ok(built)
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Tolerance from params with default fallback
pub fn get_fraction(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Tolerance> {
  let value = params.get(key).copied().unwrap_or(default);
  Tolerance::new(value)
}

/// Helper to get a Window from params with default fallback
pub fn get_window(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Window> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 1.0 || value.fract() != 0.0 {
    return Err(ScanError::InvalidValue("Window must be a positive integer"));
  }
  Window::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================
