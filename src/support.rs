use chrono::{Datelike, NaiveDate};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::data::Bar;
use crate::fractal::FractalPoint;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SupportError {
    #[error("no fractal points to fit a support on")]
    EmptyInput,
    #[error("fit has not been run yet")]
    NotFitted,
    #[error("no valid ascending support detected")]
    NoValidSupport,
}

/// Consensus-search parameters for the support fit.
#[derive(Debug, Clone, Copy)]
pub struct RansacParams {
    /// Fraction of the fractal points sampled per trial.
    pub min_samples_ratio: f64,
    /// Absolute floor on the inlier count for a valid support.
    pub min_inliers: usize,
    /// Minimum fraction of all fractal points that must be inliers.
    pub min_inlier_ratio: f64,
    /// Seed for the per-instance sampling RNG.
    pub random_state: u64,
    /// Number of sampling trials in the consensus search.
    pub max_trials: usize,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            min_samples_ratio: 0.2,
            min_inliers: 10,
            min_inlier_ratio: 0.15,
            random_state: 42,
            max_trials: 100,
        }
    }
}

/// A fitted line over date ordinals: value = slope * ordinal + intercept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportLine {
    pub slope: f64,
    pub intercept: f64,
}

impl SupportLine {
    pub fn value_at(&self, date: NaiveDate) -> f64 {
        self.slope * date_ordinal(date) + self.intercept
    }
}

/// Days since the Common Era, the x coordinate used for the
/// regression. Any strictly increasing date encoding works here as
/// long as fit and predict share it; the scale only affects slope
/// units.
fn date_ordinal(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

/// Result of one fit. The inlier mask is positional over the fractal
/// points passed to `fit`, in both variants.
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    /// Best consensus line, rejected by the support checks
    /// (non-positive slope, or too few / too sparse inliers).
    Rejected {
        line: SupportLine,
        inlier_mask: Vec<bool>,
    },
    /// Ascending support backed by enough inliers.
    Accepted {
        line: SupportLine,
        inlier_mask: Vec<bool>,
    },
}

impl FitOutcome {
    pub fn line(&self) -> &SupportLine {
        match self {
            FitOutcome::Rejected { line, .. } | FitOutcome::Accepted { line, .. } => line,
        }
    }

    pub fn inlier_mask(&self) -> &[bool] {
        match self {
            FitOutcome::Rejected { inlier_mask, .. }
            | FitOutcome::Accepted { inlier_mask, .. } => inlier_mask,
        }
    }

    pub fn inlier_count(&self) -> usize {
        self.inlier_mask().iter().filter(|&&m| m).count()
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, FitOutcome::Accepted { .. })
    }
}

/// Fits a single ascending support line through fractal lows with a
/// RANSAC consensus search.
///
/// The residual tolerance of the search is the training-period mean
/// ATR, so the geometric tolerance of the support follows the
/// instrument's own volatility regime instead of a fixed price
/// distance.
pub struct SupportFitter {
    params: RansacParams,
    outcome: Option<FitOutcome>,
}

impl SupportFitter {
    pub fn new(params: RansacParams) -> Self {
        Self {
            params,
            outcome: None,
        }
    }

    /// Run the consensus search over `fractals` and store the outcome,
    /// replacing any previous fit wholesale. The RNG is re-seeded from
    /// `random_state` on every call, so repeated fits on identical
    /// input are bit-identical.
    pub fn fit(
        &mut self,
        fractals: &[FractalPoint],
        atr_mean: f64,
    ) -> Result<FitOutcome, SupportError> {
        if fractals.is_empty() {
            return Err(SupportError::EmptyInput);
        }

        let xs: Vec<f64> = fractals.iter().map(|p| date_ordinal(p.date)).collect();
        let ys: Vec<f64> = fractals.iter().map(|p| p.low).collect();

        let consensus = ransac_line(&xs, &ys, atr_mean, &self.params);

        let outcome = if self.is_valid_support(&consensus) {
            FitOutcome::Accepted {
                line: consensus.line,
                inlier_mask: consensus.inlier_mask,
            }
        } else {
            FitOutcome::Rejected {
                line: consensus.line,
                inlier_mask: consensus.inlier_mask,
            }
        };

        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// A support must ascend and rest on enough of the fractal lows.
    fn is_valid_support(&self, consensus: &Consensus) -> bool {
        if consensus.line.slope <= 0.0 {
            return false;
        }

        let n_inliers = consensus.inlier_mask.iter().filter(|&&m| m).count();
        if n_inliers < self.params.min_inliers {
            return false;
        }

        let inlier_ratio = n_inliers as f64 / consensus.inlier_mask.len() as f64;
        inlier_ratio >= self.params.min_inlier_ratio
    }

    pub fn outcome(&self) -> Option<&FitOutcome> {
        self.outcome.as_ref()
    }

    /// Projected support values for the dates of `bars`. Requires an
    /// accepted fit; a rejected one is reported as NoValidSupport so
    /// callers can tell "never fit" from "fit but rejected".
    pub fn predict(&self, bars: &[Bar]) -> Result<Vec<f64>, SupportError> {
        match &self.outcome {
            None => Err(SupportError::NotFitted),
            Some(FitOutcome::Rejected { .. }) => Err(SupportError::NoValidSupport),
            Some(FitOutcome::Accepted { line, .. }) => {
                Ok(bars.iter().map(|b| line.value_at(b.date)).collect())
            }
        }
    }

    /// Subset of `fractals` flagged by the stored inlier mask. The
    /// mask is positional: pass the same sequence that was given to
    /// `fit`. Available after rejected fits too.
    pub fn get_inliers(&self, fractals: &[FractalPoint]) -> Result<Vec<FractalPoint>, SupportError> {
        let outcome = self.outcome.as_ref().ok_or(SupportError::NotFitted)?;

        Ok(fractals
            .iter()
            .zip(outcome.inlier_mask())
            .filter(|&(_, &inlier)| inlier)
            .map(|(p, _)| *p)
            .collect())
    }
}

struct Consensus {
    line: SupportLine,
    inlier_mask: Vec<bool>,
}

/// RANSAC over (xs, ys): sample minimal subsets, fit a least-squares
/// line per subset, and keep the trial whose line puts the most points
/// within `residual_threshold`. The returned line is re-fit over the
/// winning consensus set; the returned mask is the winning trial's.
fn ransac_line(xs: &[f64], ys: &[f64], residual_threshold: f64, params: &RansacParams) -> Consensus {
    let n = xs.len();
    let min_samples = ((params.min_samples_ratio * n as f64).ceil() as usize)
        .max(2)
        .min(n);

    let mut rng = ChaCha8Rng::seed_from_u64(params.random_state);
    let mut indices: Vec<usize> = (0..n).collect();

    let mut best_mask: Option<Vec<bool>> = None;
    let mut best_count = 0usize;

    for _ in 0..params.max_trials {
        indices.shuffle(&mut rng);

        let Some(candidate) = ols_line_at(xs, ys, &indices[..min_samples]) else {
            continue;
        };

        let mask = inlier_mask(xs, ys, &candidate, residual_threshold);
        let count = mask.iter().filter(|&&m| m).count();

        if count > best_count {
            best_count = count;
            best_mask = Some(mask);
        }
    }

    if let Some(mask) = best_mask {
        let consensus: Vec<usize> = (0..n).filter(|&i| mask[i]).collect();
        if let Some(line) = ols_line_at(xs, ys, &consensus) {
            return Consensus {
                line,
                inlier_mask: mask,
            };
        }
    }

    // No usable consensus (e.g. a single point, or every trial
    // degenerate): fall back to a plain fit over everything, or a
    // horizontal line at the mean low when even that is degenerate.
    let all: Vec<usize> = (0..n).collect();
    let line = ols_line_at(xs, ys, &all).unwrap_or(SupportLine {
        slope: 0.0,
        intercept: ys.iter().sum::<f64>() / n as f64,
    });
    let mask = inlier_mask(xs, ys, &line, residual_threshold);

    Consensus {
        line,
        inlier_mask: mask,
    }
}

fn inlier_mask(xs: &[f64], ys: &[f64], line: &SupportLine, threshold: f64) -> Vec<bool> {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| (y - (line.slope * x + line.intercept)).abs() <= threshold)
        .collect()
}

/// Ordinary least squares over the selected indices, centered to keep
/// the arithmetic stable with large date ordinals. None when fewer
/// than two points or all x equal.
fn ols_line_at(xs: &[f64], ys: &[f64], selected: &[usize]) -> Option<SupportLine> {
    if selected.len() < 2 {
        return None;
    }

    let n = selected.len() as f64;
    let mean_x = selected.iter().map(|&i| xs[i]).sum::<f64>() / n;
    let mean_y = selected.iter().map(|&i| ys[i]).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for &i in selected {
        let dx = xs[i] - mean_x;
        sxx += dx * dx;
        sxy += dx * (ys[i] - mean_y);
    }

    if sxx.abs() < 1e-10 {
        return None;
    }

    let slope = sxy / sxx;
    Some(SupportLine {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}
