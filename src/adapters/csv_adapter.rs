//! CSV file data adapter.
//!
//! One file per symbol, `<base_path>/<SYMBOL>.csv`, with a header row naming
//! at least `date` and `close`. `open`, `high`, `low` and `volume` are
//! optional; blank price cells fall back to the close. A blank close is a
//! `MissingField` at that bar's position in the returned, sorted series.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

/// Column positions resolved from the header row.
struct Columns {
    date: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, SigtraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| SigtraderError::Data {
                reason: format!("missing {name} column"),
            })
        };
        Ok(Columns {
            date: required("date")?,
            open: find("open"),
            high: find("high"),
            low: find("low"),
            close: required("close")?,
            volume: find("volume"),
        })
    }
}

fn cell(record: &StringRecord, column: Option<usize>) -> Option<&str> {
    column
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_price(
    record: &StringRecord,
    column: Option<usize>,
    line: usize,
    field: &str,
) -> Result<Option<f64>, SigtraderError> {
    cell(record, column)
        .map(|raw| {
            raw.parse::<f64>().map_err(|e| SigtraderError::Data {
                reason: format!("line {line}: invalid {field} value {raw:?}: {e}"),
            })
        })
        .transpose()
}

impl CsvDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl DataPort for CsvDataAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, SigtraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SigtraderError::NoData {
                symbol: symbol.to_string(),
            },
            _ => SigtraderError::Io(e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let columns = Columns::from_headers(rdr.headers()?)?;
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            // header is line 1
            let line = row + 2;

            let date_str =
                cell(&record, Some(columns.date)).ok_or_else(|| SigtraderError::Data {
                    reason: format!("line {line}: missing date"),
                })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                SigtraderError::Data {
                    reason: format!("line {line}: invalid date {date_str:?}: {e}"),
                }
            })?;

            if start_date.is_some_and(|s| date < s) || end_date.is_some_and(|e| date > e) {
                continue;
            }

            // a blank close is kept as NaN and reported by bar position below
            let close =
                parse_price(&record, Some(columns.close), line, "close")?.unwrap_or(f64::NAN);
            let open = parse_price(&record, columns.open, line, "open")?.unwrap_or(close);
            let high = parse_price(&record, columns.high, line, "high")?.unwrap_or(close);
            let low = parse_price(&record, columns.low, line, "low")?.unwrap_or(close);
            let volume = match cell(&record, columns.volume) {
                Some(raw) => raw
                    .parse::<f64>()
                    .map(|v| v as i64)
                    .map_err(|e| SigtraderError::Data {
                        reason: format!("line {line}: invalid volume value {raw:?}: {e}"),
                    })?,
                None => 0,
            };

            bars.push(Bar {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        if let Some(index) = bars.iter().position(|b| b.close.is_nan()) {
            return Err(SigtraderError::MissingField {
                index,
                field: "close".into(),
            });
        }
        debug!("Loaded {} bars for {} from {}", bars.len(), symbol, path.display());
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let mut symbols: Vec<String> = fs::read_dir(&self.base_path)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}
