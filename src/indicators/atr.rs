use crate::data::Bar;

/// 14 sessions is the conventional lookback for the ATR.
pub const DEFAULT_ATR_WINDOW: usize = 14;

/// True range of a bar given the previous session's close:
/// max(High - Low, |High - prev_close|, |Low - prev_close|).
pub fn true_range(bar: &Bar, prev_close: f64) -> f64 {
    (bar.high - bar.low)
        .max((bar.high - prev_close).abs())
        .max((bar.low - prev_close).abs())
}

/// Rolling average true range, aligned to `bars`.
///
/// The first bar has no previous close, so its true range is undefined
/// and consumes one slot of the first window: entries 0..window are
/// None, and entry i >= window is the mean of the `window` true ranges
/// ending at i. Too little data (or a zero window) yields all None,
/// never an error.
pub fn average_true_range(bars: &[Bar], window: usize) -> Vec<Option<f64>> {
    let mut atr: Vec<Option<f64>> = vec![None; bars.len()];
    if window == 0 || bars.len() < window + 1 {
        return atr;
    }

    // tr[0] stays unused; every window below starts at index >= 1.
    let mut tr = vec![0.0_f64; bars.len()];
    for i in 1..bars.len() {
        tr[i] = true_range(&bars[i], bars[i - 1].close);
    }

    for i in window..bars.len() {
        let sum: f64 = tr[i + 1 - window..=i].iter().sum();
        atr[i] = Some(sum / window as f64);
    }

    atr
}

/// Mean of the defined rolling ATR values over the series. This is the
/// single volatility scalar the support fitter uses as its residual
/// tolerance. None when no rolling value is defined.
pub fn mean_atr(bars: &[Bar], window: usize) -> Option<f64> {
    let values: Vec<f64> = average_true_range(bars, window)
        .into_iter()
        .flatten()
        .collect();

    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
