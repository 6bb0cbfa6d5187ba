//! Benchmark alignment: rebase reference price series onto the strategy's
//! equity dates.
//!
//! Alignment is an inner join on date with no forward fill. Each benchmark is
//! rebased so that it starts at the initial capital on the first shared date.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use super::ohlcv::Bar;
use super::portfolio::EquityPoint;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkPoint {
    pub date: NaiveDate,
    pub strategy_equity: f64,
    pub benchmark_equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkComparison {
    pub symbol: String,
    pub points: Vec<BenchmarkPoint>,
}

impl BenchmarkComparison {
    /// Strategy minus benchmark return over the aligned window.
    pub fn excess_return(&self) -> Option<f64> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if first.strategy_equity <= 0.0 || first.benchmark_equity <= 0.0 {
            return None;
        }
        let strategy = last.strategy_equity / first.strategy_equity - 1.0;
        let benchmark = last.benchmark_equity / first.benchmark_equity - 1.0;
        Some(strategy - benchmark)
    }
}

/// Join one reference series onto `equity_curve`. `None` when the two share
/// no date or the first shared price is not positive.
pub fn align_benchmark(
    equity_curve: &[EquityPoint],
    reference: &[Bar],
    initial_capital: f64,
) -> Option<Vec<BenchmarkPoint>> {
    let price_by_date: HashMap<NaiveDate, f64> =
        reference.iter().map(|bar| (bar.date, bar.close)).collect();

    let joined: Vec<(&EquityPoint, f64)> = equity_curve
        .iter()
        .filter_map(|p| price_by_date.get(&p.date).map(|&price| (p, price)))
        .collect();

    let base = joined.first()?.1;
    if !(base > 0.0) {
        return None;
    }

    Some(
        joined
            .into_iter()
            .map(|(p, price)| BenchmarkPoint {
                date: p.date,
                strategy_equity: p.equity,
                benchmark_equity: initial_capital * price / base,
            })
            .collect(),
    )
}

/// Align every reference series. Absent comparisons are logged and kept as
/// `None` so callers can report them.
pub fn align_benchmarks(
    equity_curve: &[EquityPoint],
    references: &BTreeMap<String, Vec<Bar>>,
    initial_capital: f64,
) -> BTreeMap<String, Option<BenchmarkComparison>> {
    references
        .iter()
        .map(|(symbol, bars)| {
            let comparison = match align_benchmark(equity_curve, bars, initial_capital) {
                Some(points) => {
                    debug!("Benchmark {}: {} aligned dates", symbol, points.len());
                    Some(BenchmarkComparison {
                        symbol: symbol.clone(),
                        points,
                    })
                }
                None => {
                    warn!("Benchmark {} has no usable overlap with the equity curve", symbol);
                    None
                }
            };
            (symbol.clone(), comparison)
        })
        .collect()
}
