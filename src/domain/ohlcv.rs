//! OHLCV bar representation.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::SigtraderError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// A bar where every price field equals `close`.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Bar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }
}

/// Check that every close is a finite number and dates strictly increase.
pub fn validate_bars(bars: &[Bar]) -> Result<(), SigtraderError> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() {
            return Err(SigtraderError::MissingField {
                index: i,
                field: "close".to_string(),
            });
        }
        if i > 0 && bar.date <= bars[i - 1].date {
            return Err(SigtraderError::UnorderedBars { index: i });
        }
    }
    Ok(())
}

pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
