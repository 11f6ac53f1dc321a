//! Integration tests for series inversion and its scan contract.

use proptest::prelude::*;

use levelscan::prelude::*;

fn bar(t: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
    Bar {
        timestamp: Some(t),
        open: o,
        high: h,
        low: l,
        close: c,
        volume: 100.0,
    }
}

/// A short downtrend through 100: the inverse (uptrend) pattern is only
/// visible after inversion.
fn downtrend_through_level() -> Vec<Bar> {
    vec![
        bar(0, 101.2, 101.6, 100.7, 101.0), // above the level
        bar(1, 101.0, 101.1, 98.9, 99.0),   // breaks down through it
        bar(2, 99.0, 100.1, 98.8, 99.5),    // pulls back up into the zone
        bar(3, 99.5, 99.6, 96.2, 96.5),     // accelerates lower
    ]
}

#[test]
fn test_high_low_invariant_survives_both_modes() {
    let bars = downtrend_through_level();
    for mode in [InvertMode::Negate, InvertMode::Mirror] {
        let inv = invert_series(&bars, mode).unwrap();
        assert_eq!(inv.len(), bars.len());
        for (orig, flipped) in bars.iter().zip(&inv) {
            assert!(flipped.high >= flipped.low);
            assert_eq!(flipped.timestamp, orig.timestamp);
            assert_eq!(flipped.volume, orig.volume);
        }
    }
}

/// Scanning inverted bars against the identically inverted level finds the
/// inverse (down) pattern that the original orientation cannot see.
#[test]
fn test_inverse_pattern_detected_after_mirror() {
    let bars = downtrend_through_level();
    let params = ScanParams {
        tolerance: Tolerance::new(0.011).unwrap(),
        max_retest_window: Window::new(5).unwrap(),
        takeoff_window: Window::new(5).unwrap(),
        takeoff_pct: 0.02,
        atr: None,
    };

    // Nothing breaks out upward through 100 in the original orientation
    assert!(scan(&bars, 100.0, params).unwrap().is_empty());

    let inverted = invert_series(&bars, InvertMode::Mirror).unwrap();
    let level = invert_level(&bars, 100.0, InvertMode::Mirror).unwrap();
    let signals = scan(&inverted, level, params).unwrap();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].breakout_index, 1);
    assert_eq!(signals[0].retest_index, 2);
    assert_eq!(signals[0].takeoff_index, 3);
}

// ============================================================
// PROPERTIES
// ============================================================

/// Arbitrary positive bars: close and low/high paddings
fn bar_series() -> impl Strategy<Value = Vec<Bar>> {
    proptest::collection::vec(
        (10.0..1000.0f64, 0.0..5.0f64, 0.0..5.0f64),
        1..60,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (close, up, down))| {
                bar(i as i64, close, close + up, close - down, close)
            })
            .collect()
    })
}

proptest! {
    /// negate(negate(series)) is the original series, floating-point exact.
    #[test]
    fn prop_negate_round_trip_exact(bars in bar_series()) {
        let twice = invert_series(
            &invert_series(&bars, InvertMode::Negate).unwrap(),
            InvertMode::Negate,
        )
        .unwrap();
        prop_assert_eq!(twice, bars);
    }

    /// mirror(mirror(series)) reproduces the series within floating-point
    /// tolerance (the median is a fixed point of the reflection).
    #[test]
    fn prop_mirror_round_trip_close(bars in bar_series()) {
        let twice = invert_series(
            &invert_series(&bars, InvertMode::Mirror).unwrap(),
            InvertMode::Mirror,
        )
        .unwrap();
        for (a, b) in twice.iter().zip(&bars) {
            prop_assert!((a.open - b.open).abs() <= 1e-9 * b.open.abs().max(1.0));
            prop_assert!((a.high - b.high).abs() <= 1e-9 * b.high.abs().max(1.0));
            prop_assert!((a.low - b.low).abs() <= 1e-9 * b.low.abs().max(1.0));
            prop_assert!((a.close - b.close).abs() <= 1e-9 * b.close.abs().max(1.0));
        }
    }

    /// The level transform matches the series transform: an inverted close
    /// sits exactly where the inverted level predicts.
    #[test]
    fn prop_level_transform_matches_series(bars in bar_series(), pick in 0usize..60) {
        let index = pick % bars.len();
        for mode in [InvertMode::Negate, InvertMode::Mirror] {
            let inv = invert_series(&bars, mode).unwrap();
            let mapped = invert_level(&bars, bars[index].close, mode).unwrap();
            prop_assert_eq!(inv[index].close, mapped);
        }
    }
}
