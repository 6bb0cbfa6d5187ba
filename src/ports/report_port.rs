//! Report output port.

use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::benchmark::BenchmarkComparison;
use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::Bar;

/// Port for persisting a finished backtest.
pub trait ReportPort {
    fn write(
        &self,
        bars: &[Bar],
        result: &BacktestResult,
        benchmarks: &BTreeMap<String, Option<BenchmarkComparison>>,
        output_dir: &Path,
    ) -> Result<(), SigtraderError>;
}
