//! Performance metrics for a finished backtest.

use serde::Serialize;

use super::backtest::BacktestResult;
use super::portfolio::{EquityPoint, Side, TradeRecord};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub final_equity: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    /// Longest run of bars spent below a prior equity peak.
    pub max_drawdown_duration: usize,
    pub round_trips: usize,
    pub winning_trips: usize,
    pub win_rate: f64,
    /// Mean bars between entry and exit over closed round trips.
    pub avg_bars_held: f64,
}

/// A buy and the sell that closed it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub entry: TradeRecord,
    pub exit: TradeRecord,
}

impl RoundTrip {
    pub fn pnl(&self) -> f64 {
        (self.exit.price - self.entry.price) * self.exit.quantity as f64
    }

    /// Holding period in bars.
    pub fn bars_held(&self) -> usize {
        self.exit.bar_index - self.entry.bar_index
    }
}

impl Metrics {
    pub fn compute(result: &BacktestResult, initial_capital: f64) -> Self {
        Self::from_parts(&result.equity_curve, &result.trades, initial_capital)
    }

    pub fn from_parts(
        equity_curve: &[EquityPoint],
        trades: &[TradeRecord],
        initial_capital: f64,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = equity_curve.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        let trips = round_trips(trades);
        let winning_trips = trips.iter().filter(|t| t.pnl() > 0.0).count();
        let win_rate = if trips.is_empty() {
            0.0
        } else {
            winning_trips as f64 / trips.len() as f64
        };
        let avg_bars_held = if trips.is_empty() {
            0.0
        } else {
            trips.iter().map(RoundTrip::bars_held).sum::<usize>() as f64 / trips.len() as f64
        };

        Metrics {
            final_equity,
            total_return,
            annualized_return,
            max_drawdown,
            max_drawdown_duration,
            round_trips: trips.len(),
            winning_trips,
            win_rate,
            avg_bars_held,
        }
    }
}

/// Pair each buy with the next sell. A buy still open at the end is dropped.
pub fn round_trips(trades: &[TradeRecord]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    let mut open: Option<&TradeRecord> = None;

    for trade in trades {
        match (trade.side, open) {
            (Side::Buy, None) => open = Some(trade),
            (Side::Sell, Some(entry)) => {
                trips.push(RoundTrip {
                    entry: entry.clone(),
                    exit: trade.clone(),
                });
                open = None;
            }
            _ => {}
        }
    }

    trips
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}
