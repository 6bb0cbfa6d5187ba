#![allow(dead_code)]

use chrono::NaiveDate;
use sigtrader::domain::error::SigtraderError;
pub use sigtrader::domain::ohlcv::Bar;
use sigtrader::ports::data_port::DataPort;
use std::collections::HashMap;
use std::f64::consts::TAU;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, SigtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SigtraderError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(symbol).ok_or_else(|| SigtraderError::NoData {
            symbol: symbol.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days from `start`.
pub fn bars_from_closes(start: NaiveDate, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::from_close(start + chrono::Days::new(i as u64), c))
        .collect()
}

pub fn make_bar(date_str: &str, close: f64) -> Bar {
    Bar::from_close(NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(), close)
}

/// `100 + 10·sin(2πi/period)`: oscillates between 90 and 110.
pub fn sine_closes(count: usize, period: f64) -> Vec<f64> {
    (0..count)
        .map(|i| 100.0 + 10.0 * (TAU * i as f64 / period).sin())
        .collect()
}

pub fn sine_bars(count: usize) -> Vec<Bar> {
    bars_from_closes(date(2024, 1, 1), &sine_closes(count, 40.0))
}

pub fn flat_bars(count: usize, price: f64) -> Vec<Bar> {
    bars_from_closes(date(2024, 1, 1), &vec![price; count])
}

pub fn write_csv(dir: &std::path::Path, symbol: &str, bars: &[Bar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    std::fs::write(dir.join(format!("{}.csv", symbol)), content).unwrap();
}
