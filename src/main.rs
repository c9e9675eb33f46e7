use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;

use std::path::PathBuf;

use support_signal::config::Config;

#[derive(Debug, Parser)]
struct Args {
    /// Path to the CSV file (Date,Open,High,Low,Close,Volume)
    #[arg(long)]
    input: PathBuf,

    /// First session of the test window (YYYY-MM-DD); earlier bars
    /// train the support line
    #[arg(long)]
    split_date: NaiveDate,

    /// Optional config file overriding the analysis parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the summary as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let bars = support_signal::data::get_bars_from_input_file(&args.input)?;
    if bars.is_empty() {
        println!("No data found in CSV.");
        return Ok(());
    }

    let config = match args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let (train, test) = support_signal::data::split_train_test(&bars, args.split_date);
    println!(
        "Loaded {} bars: {} train, {} test (split at {}).",
        bars.len(),
        train.len(),
        test.len(),
        args.split_date
    );

    if train.is_empty() || test.is_empty() {
        println!("Both train and test windows need at least one bar.");
        return Ok(());
    }

    let result = support_signal::analysis::analyze(&train, &test, &config.analysis_params())?;

    if args.json {
        support_signal::output::print_json(&result)?;
    } else {
        support_signal::output::print_report(&result);
    }

    Ok(())
}
