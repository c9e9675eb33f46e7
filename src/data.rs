use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;

use std::fs::File;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OhlcRow {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One daily trading session.
#[derive(Debug, Clone, Copy)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

pub fn get_bars_from_input_file(input: &PathBuf) -> Result<Vec<Bar>> {
    let file =
        File::open(input).with_context(|| format!("failed to open input file: {:?}", input))?;

    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let mut bars: Vec<Bar> = Vec::new();

    for result in rdr.deserialize::<OhlcRow>() {
        let row: OhlcRow = result.with_context(|| "failed to deserialize CSV row")?;
        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .with_context(|| format!("failed to parse date: {}", row.date))?;
        bars.push(Bar {
            date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    ensure_ascending_dates(&bars)?;

    Ok(bars)
}

/// Dates must be unique and strictly ascending; everything downstream
/// indexes the series by date.
fn ensure_ascending_dates(bars: &[Bar]) -> Result<()> {
    for pair in bars.windows(2) {
        if pair[1].date <= pair[0].date {
            bail!(
                "dates must be unique and ascending: {} followed by {}",
                pair[0].date,
                pair[1].date
            );
        }
    }
    Ok(())
}

/// Split the series at `split_date`: bars strictly before it form the
/// training window, bars at/after it form the test window.
pub fn split_train_test(bars: &[Bar], split_date: NaiveDate) -> (Vec<Bar>, Vec<Bar>) {
    let idx = bars.partition_point(|b| b.date < split_date);
    (bars[..idx].to_vec(), bars[idx..].to_vec())
}
