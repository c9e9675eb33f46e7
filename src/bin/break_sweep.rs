use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use rayon::prelude::*;
use serde::Deserialize;

use support_signal::breakdown::{BreakDetector, BreakParams};
use support_signal::data::{get_bars_from_input_file, split_train_test};
use support_signal::fractal::fractal_lows;
use support_signal::indicators::{DEFAULT_ATR_WINDOW, mean_atr};
use support_signal::support::{RansacParams, SupportFitter};

/// Sweep over breakdown-detection parameters (penetration threshold,
/// confirmation days) against one fitted support and report which
/// configurations confirm a break.
#[derive(Debug, Parser)]
struct Args {
    /// config-file path
    #[arg(long)]
    config: PathBuf,
}

#[derive(Deserialize)]
struct SweepConfig {
    /// Path to the CSV file (Date,Open,High,Low,Close,Volume)
    input: PathBuf,

    /// First session of the test window
    split_date: NaiveDate,

    /// Min penetration threshold as a fraction (e.g. 0.005)
    min_penetration: f64,

    /// Max penetration threshold as a fraction (e.g. 0.03)
    max_penetration: f64,

    /// Number of penetration steps between min and max
    penetration_steps: usize,

    /// Min consecutive confirmation sessions (e.g. 1)
    min_confirmation_days: usize,

    /// Max consecutive confirmation sessions (e.g. 7)
    max_confirmation_days: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args
        .config
        .into_os_string()
        .into_string()
        .expect("Failed to translate config file path into string");
    let config: SweepConfig = config::Config::builder()
        .add_source(config::File::with_name(&config_path))
        .build()?
        .try_deserialize()?;

    let bars = get_bars_from_input_file(&config.input)
        .with_context(|| format!("failed to load bars from {:?}", config.input))?;

    if bars.is_empty() {
        println!("No data found in CSV.");
        return Ok(());
    }

    let (train, test) = split_train_test(&bars, config.split_date);
    println!(
        "Loaded {} bars: {} train, {} test (split at {}).",
        bars.len(),
        train.len(),
        test.len(),
        config.split_date
    );

    if train.is_empty() || test.is_empty() {
        println!("Both train and test windows need at least one bar.");
        return Ok(());
    }

    let fractals = fractal_lows(&train);
    if fractals.is_empty() {
        println!("No fractal lows in the training window.");
        return Ok(());
    }

    let Some(atr) = mean_atr(&train, DEFAULT_ATR_WINDOW) else {
        println!(
            "Training window too short for ATR({}): {} bars.",
            DEFAULT_ATR_WINDOW,
            train.len()
        );
        return Ok(());
    };

    // Fit once: the detector parameters do not affect the support
    // line, only its interpretation over the test window.
    let mut fitter = SupportFitter::new(RansacParams::default());
    let outcome = fitter.fit(&fractals, atr)?;
    if !outcome.is_accepted() {
        println!("No valid ascending support detected; nothing to sweep.");
        return Ok(());
    }
    let projected = fitter.predict(&test)?;

    println!(
        "Support: slope {:.6} per day, {} of {} fractal lows as inliers.",
        outcome.line().slope,
        outcome.inlier_count(),
        fractals.len()
    );

    let jobs = generate_sweep_jobs(&config);

    println!();
    println!("penetration  days  breaks  first break");

    // Each job owns its detector, so runs are independent and the
    // parallel order cannot affect results.
    let mut rows: Vec<(BreakParams, usize, Option<NaiveDate>)> = jobs
        .par_iter()
        .map(|&params| {
            let mut detector = BreakDetector::new(params);
            let series = detector
                .detect(&test, &projected)
                .expect("test and projection have the same length");
            (params, series.confirmed_count(), detector.get_first_break_date())
        })
        .collect();

    rows.sort_by(|a, b| {
        (a.0.confirmation_days, a.0.penetration_threshold)
            .partial_cmp(&(b.0.confirmation_days, b.0.penetration_threshold))
            .expect("finite parameters")
    });

    for (params, n_breaks, first) in &rows {
        let first = match first {
            Some(date) => date.to_string(),
            None => "-".to_string(),
        };
        println!(
            "{:>11.4} {:>5} {:>7}  {}",
            params.penetration_threshold, params.confirmation_days, n_breaks, first
        );
    }

    println!();
    let earliest = rows
        .iter()
        .filter_map(|(params, _, first)| first.map(|date| (date, *params)))
        .min_by_key(|(date, _)| *date);

    match earliest {
        Some((date, params)) => println!(
            "Earliest confirmed break: {} (penetration {:.4}, {} days)",
            date, params.penetration_threshold, params.confirmation_days
        ),
        None => println!("No configuration confirmed a break."),
    }

    Ok(())
}

fn generate_sweep_jobs(config: &SweepConfig) -> Vec<BreakParams> {
    let steps = config.penetration_steps.max(1);
    let span = config.max_penetration - config.min_penetration;

    let mut jobs = Vec::new();
    for days in config.min_confirmation_days..=config.max_confirmation_days {
        for step in 0..=steps {
            let penetration = config.min_penetration + span * (step as f64 / steps as f64);
            jobs.push(BreakParams {
                penetration_threshold: penetration,
                confirmation_days: days,
            });
        }
    }
    jobs
}
