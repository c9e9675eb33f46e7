use anyhow::Result;
use serde::Serialize;

use crate::analysis::{AnalysisResult, Verdict};

pub fn print_report(result: &AnalysisResult) {
    println!("Fractal lows (train):    {}", result.fractals.len());
    println!("Mean ATR (train):        {:.4}", result.atr_mean);

    match &result.verdict {
        Verdict::NoSupport {
            slope,
            intercept,
            n_inliers,
        } => {
            println!("Support:                 none");
            println!(
                "Rejected fit:            slope {:.6}, intercept {:.4}, {} inliers",
                slope, intercept, n_inliers
            );
        }
        Verdict::Support(report) => {
            println!("Support slope:           {:.6} per day", report.slope);
            println!("Support intercept:       {:.4}", report.intercept);
            println!(
                "Inliers:                 {}/{}",
                report.inliers.len(),
                result.fractals.len()
            );
            println!(
                "Confirmed break days:    {}",
                report.breaks.confirmed_count()
            );
            match report.first_break_date {
                Some(date) => println!("First confirmed break:   {}", date),
                None => println!("First confirmed break:   none"),
            }
        }
    }
}

/// Flat summary for downstream consumption.
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub n_fractals: usize,
    pub atr_mean: f64,
    pub valid_support: bool,
    pub slope: f64,
    pub intercept: f64,
    pub n_inliers: usize,
    pub confirmed_break_days: usize,
    pub first_break_date: Option<String>,
}

impl From<&AnalysisResult> for ReportSummary {
    fn from(result: &AnalysisResult) -> Self {
        match &result.verdict {
            Verdict::NoSupport {
                slope,
                intercept,
                n_inliers,
            } => Self {
                n_fractals: result.fractals.len(),
                atr_mean: result.atr_mean,
                valid_support: false,
                slope: *slope,
                intercept: *intercept,
                n_inliers: *n_inliers,
                confirmed_break_days: 0,
                first_break_date: None,
            },
            Verdict::Support(report) => Self {
                n_fractals: result.fractals.len(),
                atr_mean: result.atr_mean,
                valid_support: true,
                slope: report.slope,
                intercept: report.intercept,
                n_inliers: report.inliers.len(),
                confirmed_break_days: report.breaks.confirmed_count(),
                first_break_date: report.first_break_date.map(|d| d.to_string()),
            },
        }
    }
}

pub fn print_json(result: &AnalysisResult) -> Result<()> {
    let summary = ReportSummary::from(result);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
