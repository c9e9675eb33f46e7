use chrono::NaiveDate;
use thiserror::Error;

use crate::data::Bar;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("test window has {bars} bars but projected support has {support} values")]
    LengthMismatch { bars: usize, support: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct BreakParams {
    /// Minimum fractional distance below the support, e.g. 0.01 = 1%.
    pub penetration_threshold: f64,
    /// Consecutive sessions required to confirm the break.
    pub confirmation_days: usize,
}

impl Default for BreakParams {
    fn default() -> Self {
        Self {
            penetration_threshold: 0.01,
            confirmation_days: 3,
        }
    }
}

/// Confirmed-breakdown flags aligned to the test window's dates.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakSeries {
    pub dates: Vec<NaiveDate>,
    pub confirmed: Vec<bool>,
}

impl BreakSeries {
    pub fn first_break_date(&self) -> Option<NaiveDate> {
        self.dates
            .iter()
            .zip(&self.confirmed)
            .find(|&(_, &confirmed)| confirmed)
            .map(|(date, _)| *date)
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed.iter().filter(|&&c| c).count()
    }
}

/// Detects a downside break of a projected support line.
///
/// A session is a raw break when the low penetrates the support by
/// more than the threshold, as a fraction of the support level, AND
/// the close is below the support. A break is confirmed once raw
/// breaks hold for `confirmation_days` consecutive sessions.
pub struct BreakDetector {
    params: BreakParams,
    break_series: Option<BreakSeries>,
    first_break_date: Option<NaiveDate>,
}

impl BreakDetector {
    pub fn new(params: BreakParams) -> Self {
        Self {
            params,
            break_series: None,
            first_break_date: None,
        }
    }

    /// Recompute the confirmed-break series for a test window and its
    /// projected support. Both outputs are cached on the detector and
    /// replaced wholesale on every call.
    pub fn detect(&mut self, test: &[Bar], support: &[f64]) -> Result<BreakSeries, DetectError> {
        if test.len() != support.len() {
            return Err(DetectError::LengthMismatch {
                bars: test.len(),
                support: support.len(),
            });
        }

        let confirmation_days = self.params.confirmation_days;
        let mut confirmed = vec![false; test.len()];
        let mut run = 0usize;

        for (i, (bar, &level)) in test.iter().zip(support).enumerate() {
            if self.is_raw_break(bar, level) {
                run += 1;
            } else {
                run = 0;
            }
            confirmed[i] = confirmation_days > 0 && run >= confirmation_days;
        }

        let series = BreakSeries {
            dates: test.iter().map(|b| b.date).collect(),
            confirmed,
        };

        self.first_break_date = series.first_break_date();
        self.break_series = Some(series.clone());

        Ok(series)
    }

    /// Raw (unconfirmed) break: fractional penetration below the
    /// support beyond the threshold, plus a close below it. The ratio
    /// formula keeps the behavior proportional to the price level. A
    /// non-positive support level never counts as penetrated.
    fn is_raw_break(&self, bar: &Bar, support: f64) -> bool {
        if support <= 0.0 {
            return false;
        }
        let penetration = (support - bar.low) / support;
        penetration > self.params.penetration_threshold && bar.close < support
    }

    /// Earliest confirmed break of the last `detect` call, if any.
    pub fn get_first_break_date(&self) -> Option<NaiveDate> {
        self.first_break_date
    }

    pub fn break_series(&self) -> Option<&BreakSeries> {
        self.break_series.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).expect("valid date")
    }

    fn bar(day_offset: u64, low: f64, close: f64) -> Bar {
        Bar {
            date: start_date() + Days::new(day_offset),
            open: close,
            high: close + 1.0,
            low,
            close,
            volume: 1000.0,
        }
    }

    /// One bar per day against a constant support of 100.
    fn bars_from_low_close(pairs: &[(f64, f64)]) -> (Vec<Bar>, Vec<f64>) {
        let bars: Vec<Bar> = pairs
            .iter()
            .enumerate()
            .map(|(i, &(low, close))| bar(i as u64, low, close))
            .collect();
        let support = vec![100.0; bars.len()];
        (bars, support)
    }

    fn detector() -> BreakDetector {
        BreakDetector::new(BreakParams::default())
    }

    #[test]
    fn test_detect_rejects_mismatched_lengths() {
        let (bars, _) = bars_from_low_close(&[(98.0, 98.0), (98.0, 98.0)]);
        let support = vec![100.0; 3];

        let mut det = detector();
        assert_eq!(
            det.detect(&bars, &support),
            Err(DetectError::LengthMismatch {
                bars: 2,
                support: 3
            })
        );
        // No partial output is cached on failure.
        assert!(det.break_series().is_none());
        assert!(det.get_first_break_date().is_none());
    }

    #[test]
    fn test_detect_confirms_on_third_consecutive_break_day() {
        // Low and close exactly 2% below a support of 100 for three
        // sessions: penetration 0.02 > 0.01 and close < support each
        // day, so the break confirms on day 3 and not before.
        let (bars, support) = bars_from_low_close(&[
            (101.0, 102.0),
            (98.0, 98.0),
            (98.0, 98.0),
            (98.0, 98.0),
        ]);

        let mut det = detector();
        let series = det.detect(&bars, &support).expect("same length");

        assert_eq!(series.confirmed, vec![false, false, false, true]);
        assert_eq!(det.get_first_break_date(), Some(bars[3].date));
        assert_eq!(series.first_break_date(), Some(bars[3].date));
    }

    #[test]
    fn test_detect_two_day_deviation_never_confirms() {
        let (bars, support) = bars_from_low_close(&[
            (101.0, 102.0),
            (98.0, 98.0),
            (98.0, 98.0),
            (101.0, 102.0),
            (98.0, 98.0),
            (98.0, 98.0),
        ]);

        let mut det = detector();
        let series = det.detect(&bars, &support).expect("same length");

        assert!(series.confirmed.iter().all(|&c| !c));
        assert_eq!(det.get_first_break_date(), None);
    }

    #[test]
    fn test_detect_interrupted_run_restarts_the_count() {
        // raw: T T F T T T -> only the final session confirms
        let (bars, support) = bars_from_low_close(&[
            (98.0, 98.0),
            (98.0, 98.0),
            (101.0, 102.0),
            (98.0, 98.0),
            (98.0, 98.0),
            (98.0, 98.0),
        ]);

        let mut det = detector();
        let series = det.detect(&bars, &support).expect("same length");

        assert_eq!(
            series.confirmed,
            vec![false, false, false, false, false, true]
        );
        assert_eq!(det.get_first_break_date(), Some(bars[5].date));
    }

    #[test]
    fn test_detect_first_window_bars_never_confirm_even_if_all_raw() {
        // Every session is a raw break; the first two still cannot
        // complete a 3-session window.
        let (bars, support) = bars_from_low_close(&[
            (98.0, 98.0),
            (98.0, 98.0),
            (98.0, 98.0),
            (98.0, 98.0),
            (98.0, 98.0),
        ]);

        let mut det = detector();
        let series = det.detect(&bars, &support).expect("same length");

        assert_eq!(series.confirmed, vec![false, false, true, true, true]);
        assert_eq!(det.get_first_break_date(), Some(bars[2].date));
    }

    #[test]
    fn test_detect_penetration_without_close_below_does_not_count() {
        // Deep intraday spike below support but closes back above it.
        let (bars, support) = bars_from_low_close(&[
            (90.0, 101.0),
            (90.0, 101.0),
            (90.0, 101.0),
        ]);

        let mut det = detector();
        let series = det.detect(&bars, &support).expect("same length");

        assert!(series.confirmed.iter().all(|&c| !c));
    }

    #[test]
    fn test_detect_close_below_with_shallow_penetration_does_not_count() {
        // Close below support but the low is only 0.5% under it.
        let (bars, support) = bars_from_low_close(&[
            (99.5, 99.6),
            (99.5, 99.6),
            (99.5, 99.6),
        ]);

        let mut det = detector();
        let series = det.detect(&bars, &support).expect("same length");

        assert!(series.confirmed.iter().all(|&c| !c));
    }

    #[test]
    fn test_detect_penetration_equal_to_threshold_does_not_count() {
        // (100 - 99) / 100 = 0.01 exactly: the comparison is strict.
        let (bars, support) = bars_from_low_close(&[
            (99.0, 99.5),
            (99.0, 99.5),
            (99.0, 99.5),
        ]);

        let mut det = detector();
        let series = det.detect(&bars, &support).expect("same length");

        assert!(series.confirmed.iter().all(|&c| !c));
    }

    #[test]
    fn test_detect_non_positive_support_is_never_penetrated() {
        let (bars, _) = bars_from_low_close(&[
            (98.0, 98.0),
            (98.0, 98.0),
            (98.0, 98.0),
        ]);
        let support = vec![0.0, -5.0, -5.0];

        let mut det = detector();
        let series = det.detect(&bars, &support).expect("same length");

        assert!(series.confirmed.iter().all(|&c| !c));
    }

    #[test]
    fn test_detect_empty_inputs_yield_empty_series() {
        let mut det = detector();
        let series = det.detect(&[], &[]).expect("both empty");

        assert!(series.dates.is_empty());
        assert!(series.confirmed.is_empty());
        assert_eq!(det.get_first_break_date(), None);
    }

    #[test]
    fn test_detect_recomputes_wholesale_on_each_call() {
        let (breaking, support) = bars_from_low_close(&[
            (98.0, 98.0),
            (98.0, 98.0),
            (98.0, 98.0),
        ]);
        let (calm, _) = bars_from_low_close(&[
            (101.0, 102.0),
            (101.0, 102.0),
            (101.0, 102.0),
        ]);

        let mut det = detector();

        let first = det.detect(&breaking, &support).expect("same length");
        assert_eq!(first.confirmed_count(), 1);
        assert!(det.get_first_break_date().is_some());

        let second = det.detect(&calm, &support).expect("same length");
        assert_eq!(second.confirmed_count(), 0);
        assert_eq!(det.get_first_break_date(), None);
        assert_eq!(det.break_series(), Some(&second));
    }

    #[test]
    fn test_detect_single_day_confirmation_confirms_immediately() {
        let (bars, support) = bars_from_low_close(&[(101.0, 102.0), (98.0, 98.0)]);

        let mut det = BreakDetector::new(BreakParams {
            penetration_threshold: 0.01,
            confirmation_days: 1,
        });
        let series = det.detect(&bars, &support).expect("same length");

        assert_eq!(series.confirmed, vec![false, true]);
        assert_eq!(det.get_first_break_date(), Some(bars[1].date));
    }
}
