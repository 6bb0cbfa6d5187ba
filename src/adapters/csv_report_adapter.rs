//! CSV report adapter: one file per output table.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::benchmark::BenchmarkComparison;
use crate::domain::error::SigtraderError;
use crate::domain::indicator::IndicatorSet;
use crate::domain::ohlcv::Bar;
use crate::ports::report_port::ReportPort;

pub const EQUITY_FILE: &str = "equity.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const INDICATORS_FILE: &str = "indicators.csv";

pub fn benchmark_file(symbol: &str) -> String {
    format!("benchmark_{}.csv", symbol)
}

#[derive(Serialize)]
struct EquityRow {
    date: NaiveDate,
    close: f64,
    equity: f64,
    signal: String,
}

#[derive(Serialize)]
struct IndicatorRow {
    date: NaiveDate,
    close: f64,
    middle: Option<f64>,
    stddev: Option<f64>,
    upper: Option<f64>,
    lower: Option<f64>,
    fast_ema: Option<f64>,
    slow_ema: Option<f64>,
    macd: Option<f64>,
    signal: Option<f64>,
    histogram: Option<f64>,
    rsi: Option<f64>,
}

impl IndicatorRow {
    fn new(bar: &Bar, set: &IndicatorSet) -> Self {
        IndicatorRow {
            date: bar.date,
            close: bar.close,
            middle: set.middle,
            stddev: set.stddev,
            upper: set.upper,
            lower: set.lower,
            fast_ema: set.fast_ema,
            slow_ema: set.slow_ema,
            macd: set.macd,
            signal: set.signal,
            histogram: set.histogram,
            rsi: set.rsi,
        }
    }
}

fn write_rows<W: io::Write, T: Serialize>(
    out: W,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), SigtraderError> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the per-bar indicator table on its own.
pub fn write_indicator_table<W: io::Write>(
    out: W,
    bars: &[Bar],
    table: &[IndicatorSet],
) -> Result<(), SigtraderError> {
    write_rows(
        out,
        bars.iter().zip(table).map(|(bar, set)| IndicatorRow::new(bar, set)),
    )
}

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        bars: &[Bar],
        result: &BacktestResult,
        benchmarks: &BTreeMap<String, Option<BenchmarkComparison>>,
        output_dir: &Path,
    ) -> Result<(), SigtraderError> {
        fs::create_dir_all(output_dir)?;

        write_rows(
            File::create(output_dir.join(EQUITY_FILE))?,
            bars.iter()
                .zip(&result.equity_curve)
                .zip(&result.signals)
                .map(|((bar, point), signal)| EquityRow {
                    date: point.date,
                    close: bar.close,
                    equity: point.equity,
                    signal: signal.to_string(),
                }),
        )?;
        write_rows(File::create(output_dir.join(TRADES_FILE))?, &result.trades)?;
        write_indicator_table(
            File::create(output_dir.join(INDICATORS_FILE))?,
            bars,
            &result.indicators,
        )?;

        for (symbol, comparison) in benchmarks {
            if let Some(comparison) = comparison {
                let file = File::create(output_dir.join(benchmark_file(symbol)))?;
                write_rows(file, &comparison.points)?;
            }
        }

        info!("Report written to {}", output_dir.display());
        Ok(())
    }
}
