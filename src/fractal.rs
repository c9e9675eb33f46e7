use chrono::NaiveDate;

use crate::data::Bar;

/// A bar whose low is a 5-bar local minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalPoint {
    pub date: NaiveDate,
    pub low: f64,
}

/// Bill Williams 5-bar fractal lows.
///
/// Bar i qualifies when its low is strictly below the lows of the two
/// bars on each side:
///   Low[i] < Low[i-1], Low[i] < Low[i-2],
///   Low[i] < Low[i+1], Low[i] < Low[i+2]
///
/// The first two and last two bars never qualify (not enough
/// neighbors), and ties are excluded by the strict comparison. Output
/// preserves the input order.
pub fn fractal_lows(bars: &[Bar]) -> Vec<FractalPoint> {
    if bars.len() < 5 {
        return Vec::new();
    }

    let mut points = Vec::new();

    for i in 2..bars.len() - 2 {
        let low = bars[i].low;
        let is_fractal = low < bars[i - 1].low
            && low < bars[i - 2].low
            && low < bars[i + 1].low
            && low < bars[i + 2].low;

        if is_fractal {
            points.push(FractalPoint {
                date: bars[i].date,
                low,
            });
        }
    }

    points
}
