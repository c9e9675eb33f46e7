use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use crate::breakdown::{BreakDetector, BreakParams, BreakSeries};
use crate::data::Bar;
use crate::fractal::{FractalPoint, fractal_lows};
use crate::indicators::{DEFAULT_ATR_WINDOW, mean_atr};
use crate::support::{FitOutcome, RansacParams, SupportFitter};

#[derive(Debug, Clone, Copy)]
pub struct AnalysisParams {
    pub atr_window: usize,
    pub ransac: RansacParams,
    pub breakout: BreakParams,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            atr_window: DEFAULT_ATR_WINDOW,
            ransac: RansacParams::default(),
            breakout: BreakParams::default(),
        }
    }
}

/// Everything downstream consumers need once a support was accepted:
/// the line, its inliers, the projection over the test window, and the
/// confirmed-break series derived from it.
pub struct SupportReport {
    pub slope: f64,
    pub intercept: f64,
    pub inliers: Vec<FractalPoint>,
    pub projected: Vec<f64>,
    pub breaks: BreakSeries,
    pub first_break_date: Option<NaiveDate>,
}

pub enum Verdict {
    /// The consensus fit failed the support checks; reported as data,
    /// not as an error.
    NoSupport {
        slope: f64,
        intercept: f64,
        n_inliers: usize,
    },
    Support(SupportReport),
}

pub struct AnalysisResult {
    pub fractals: Vec<FractalPoint>,
    pub atr_mean: f64,
    pub verdict: Verdict,
}

/// Full pipeline over a pre-split series:
/// train -> fractal lows + mean ATR -> RANSAC support fit;
/// on acceptance, project the line over the test window and run the
/// breakdown detection on it.
pub fn analyze(train: &[Bar], test: &[Bar], params: &AnalysisParams) -> Result<AnalysisResult> {
    let fractals = fractal_lows(train);
    if fractals.is_empty() {
        bail!("no fractal lows found in the training window");
    }

    let atr_mean = mean_atr(train, params.atr_window).with_context(|| {
        format!(
            "training window too short for ATR({}): {} bars",
            params.atr_window,
            train.len()
        )
    })?;

    let mut fitter = SupportFitter::new(params.ransac);
    let outcome = fitter.fit(&fractals, atr_mean)?;

    let verdict = match outcome {
        FitOutcome::Rejected { line, inlier_mask } => Verdict::NoSupport {
            slope: line.slope,
            intercept: line.intercept,
            n_inliers: inlier_mask.iter().filter(|&&m| m).count(),
        },
        FitOutcome::Accepted { line, .. } => {
            let projected = fitter.predict(test)?;
            let inliers = fitter.get_inliers(&fractals)?;

            let mut detector = BreakDetector::new(params.breakout);
            let breaks = detector.detect(test, &projected)?;
            let first_break_date = detector.get_first_break_date();

            Verdict::Support(SupportReport {
                slope: line.slope,
                intercept: line.intercept,
                inliers,
                projected,
                breaks,
                first_break_date,
            })
        }
    };

    Ok(AnalysisResult {
        fractals,
        atr_mean,
        verdict,
    })
}
