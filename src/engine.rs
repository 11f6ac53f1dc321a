//! The breakout -> retest -> takeoff state machine.
//!
//! A single forward pass over bar indices with at most one candidate in
//! progress; this is not a sliding window over all possible start points.
//! Abandoned candidates rewind the cursor to the bar after their breakout,
//! so overlapping breakout candidates are re-evaluated. Completed patterns
//! resume after their takeoff bar, so emitted signals never overlap.

use crate::{ScanParams, Signal, OHLCV};

/// Scan phase. The variant fields carry everything a later phase needs to
/// emit a signal or rewind on abandonment.
#[derive(Debug, Clone, Copy)]
enum Phase {
    SeekingBreakout,
    SeekingRetest {
        breakout: usize,
        deadline: usize,
    },
    SeekingTakeoff {
        breakout: usize,
        retest: usize,
        retest_low: f64,
        deadline: usize,
    },
}

/// Run the state machine over `bars`.
///
/// Inputs are validated by the caller ([`crate::LevelScanner`]); `atr` must
/// be aligned with `bars` and is only consulted when `params.atr` is set.
pub(crate) fn scan_series<T: OHLCV>(
    bars: &[T],
    level: f64,
    params: &ScanParams,
    atr: Option<&[f64]>,
) -> Vec<Signal> {
    let tol = params.tolerance.get();
    let band_lo = level * (1.0 - tol);
    let band_hi = level * (1.0 + tol);
    let pct_threshold = level * (1.0 + params.takeoff_pct);

    let mut signals = Vec::new();
    let mut phase = Phase::SeekingBreakout;
    let mut i = 1; // a breakout needs a previous close

    while i < bars.len() {
        match phase {
            Phase::SeekingBreakout => {
                // Crossing event, not merely "close above level": a close
                // that stays elevated for many bars triggers exactly once.
                if bars[i].close() > level && bars[i - 1].close() <= level {
                    phase = Phase::SeekingRetest {
                        breakout: i,
                        deadline: i.saturating_add(params.max_retest_window.get()),
                    };
                }
                i += 1;
            }
            Phase::SeekingRetest { breakout, deadline } => {
                if i > deadline {
                    // No retest in time: drop the candidate and resume the
                    // breakout search right after it, not at the deadline.
                    phase = Phase::SeekingBreakout;
                    i = breakout + 1;
                    continue;
                }
                let low = bars[i].low();
                // Band bounds inclusive, close strictly back above the level
                if low >= band_lo && low <= band_hi && bars[i].close() > level {
                    phase = Phase::SeekingTakeoff {
                        breakout,
                        retest: i,
                        retest_low: low,
                        deadline: i.saturating_add(params.takeoff_window.get()),
                    };
                }
                i += 1;
            }
            Phase::SeekingTakeoff {
                breakout,
                retest,
                retest_low,
                deadline,
            } => {
                if i > deadline {
                    phase = Phase::SeekingBreakout;
                    i = breakout + 1;
                    continue;
                }
                let close = bars[i].close();
                let mut threshold = pct_threshold;
                let mut atr_at_bar = None;
                if let (Some(filter), Some(series)) = (params.atr, atr) {
                    let value = series[i];
                    // Undefined ATR (warm-up or NaN inputs) is not an error:
                    // the percentage branch alone decides at this bar.
                    if value.is_finite() {
                        threshold = threshold.max(level + value * filter.mult);
                        atr_at_bar = Some(value);
                    }
                }
                if close > threshold {
                    signals.push(Signal {
                        breakout_index: breakout,
                        breakout_time: bars[breakout].timestamp(),
                        retest_index: retest,
                        retest_time: bars[retest].timestamp(),
                        takeoff_index: i,
                        takeoff_time: bars[i].timestamp(),
                        level,
                        retest_low,
                        takeoff_close: close,
                        return_from_level: close / level - 1.0,
                        atr_at_takeoff: atr_at_bar,
                    });
                    phase = Phase::SeekingBreakout;
                }
                i += 1;
            }
        }
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tolerance, Window};

    #[derive(Debug, Clone, Copy)]
    struct TestBar {
        t: i64,
        o: f64,
        h: f64,
        l: f64,
        c: f64,
    }

    impl OHLCV for TestBar {
        fn open(&self) -> f64 {
            self.o
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            self.c
        }

        fn timestamp(&self) -> Option<i64> {
            Some(self.t)
        }
    }

    fn bar(t: i64, l: f64, c: f64) -> TestBar {
        TestBar {
            t,
            o: c,
            h: c.max(l) + 0.5,
            l,
            c,
        }
    }

    fn params(tol: f64, retest_w: usize, takeoff_w: usize, pct: f64) -> ScanParams {
        ScanParams {
            tolerance: Tolerance::new(tol).unwrap(),
            max_retest_window: Window::new(retest_w).unwrap(),
            takeoff_window: Window::new(takeoff_w).unwrap(),
            takeoff_pct: pct,
            atr: None,
        }
    }

    #[test]
    fn test_breakout_is_a_crossing_not_a_state() {
        // Closes stay above the level from the start: no crossing, no signal
        let bars: Vec<TestBar> = (0..10).map(|i| bar(i, 104.0, 105.0)).collect();
        let signals = scan_series(&bars, 100.0, &params(0.01, 5, 5, 0.03), None);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_signal_carries_timestamps() {
        let bars = vec![
            bar(10, 98.5, 99.0),
            bar(20, 99.0, 101.0),
            bar(30, 99.9, 100.5),
            bar(40, 100.4, 103.5),
        ];
        let signals = scan_series(&bars, 100.0, &params(0.01, 5, 5, 0.03), None);
        assert_eq!(signals.len(), 1);
        let s = signals[0];
        assert_eq!(s.breakout_time, Some(20));
        assert_eq!(s.retest_time, Some(30));
        assert_eq!(s.takeoff_time, Some(40));
        assert_eq!(s.retest_low, 99.9);
        assert_eq!(s.takeoff_close, 103.5);
        assert_eq!(s.bars_to_retest(), 1);
        assert_eq!(s.bars_to_takeoff(), 1);
    }

    #[test]
    fn test_nan_close_never_panics() {
        let bars = vec![
            bar(0, 98.5, 99.0),
            bar(1, 99.0, f64::NAN),
            bar(2, 99.9, 101.0),
            bar(3, 99.9, 100.5),
            bar(4, 100.4, 103.5),
        ];
        // NaN close at index 1 fails both crossing comparisons; index 2 has a
        // NaN previous close, so the crossing is found nowhere and the scan
        // simply returns nothing.
        let signals = scan_series(&bars, 100.0, &params(0.01, 5, 5, 0.03), None);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_atr_branch_tightens_threshold() {
        let bars = vec![
            bar(0, 98.5, 99.0),
            bar(1, 99.0, 101.0),
            bar(2, 99.9, 100.5),
            bar(3, 100.4, 103.5),
        ];
        let mut p = params(0.01, 5, 5, 0.03);
        p.atr = Some(crate::AtrFilter {
            period: Window::new(2).unwrap(),
            mult: 1.0,
        });
        // ATR of 5.0 at the candidate bar pushes the threshold to 105,
        // above the 103 percentage branch: no takeoff
        let atr = [f64::NAN, 5.0, 5.0, 5.0];
        let signals = scan_series(&bars, 100.0, &p, Some(&atr));
        assert!(signals.is_empty());

        // ATR of 2.0 keeps the percentage branch binding (max(103, 102))
        let atr = [f64::NAN, 2.0, 2.0, 2.0];
        let signals = scan_series(&bars, 100.0, &p, Some(&atr));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].atr_at_takeoff, Some(2.0));
    }
}
