//! Price data access port.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` in ascending date order, limited to the inclusive
    /// range when bounds are given.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, SigtraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError>;
}
