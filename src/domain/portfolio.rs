//! Single-instrument portfolio ledger and the bar-by-bar simulation loop.
//!
//! Sizing is all-in/all-out: a buy spends all cash on whole shares at the
//! bar's close, a sell liquidates the whole position at the close.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::ohlcv::Bar;
use super::signal::{ExitReason, Signal};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub shares: u64,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        PortfolioState {
            cash: initial_capital,
            shares: 0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.shares == 0
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.shares as f64 * price
    }

    /// Spend all cash on whole shares at `price`. Returns the quantity
    /// bought, or `None` when not even one share is affordable.
    pub fn buy_all(&mut self, price: f64) -> Option<u64> {
        if !(price > 0.0) || self.cash <= 0.0 {
            return None;
        }
        let quantity = (self.cash / price).floor();
        if quantity < 1.0 {
            return None;
        }
        let quantity = quantity as u64;
        self.cash = (self.cash - quantity as f64 * price).max(0.0);
        self.shares += quantity;
        Some(quantity)
    }

    /// Liquidate the position at `price`. Returns the quantity sold.
    pub fn sell_all(&mut self, price: f64) -> Option<u64> {
        if self.is_flat() {
            return None;
        }
        let quantity = self.shares;
        self.cash += quantity as f64 * price;
        self.shares = 0;
        Some(quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeReason {
    InitialEntry,
    Signal,
    StopLoss,
}

impl From<ExitReason> for TradeReason {
    fn from(reason: ExitReason) -> Self {
        match reason {
            ExitReason::Rule => TradeReason::Signal,
            ExitReason::StopLoss => TradeReason::StopLoss,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub side: Side,
    pub price: f64,
    pub quantity: u64,
    pub reason: TradeReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinalState {
    pub cash: f64,
    pub shares: u64,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    /// The signal acted on at each bar, after position gating.
    pub signals: Vec<Signal>,
    pub final_state: FinalState,
}

/// Run the ledger over `bars` in order.
///
/// `decide(i, held_at)` is asked for a signal at every bar; `held_at` is the
/// last buy price while shares are held. With `eager_entry` all cash is
/// spent at the first bar's close before the first decision.
pub fn simulate<F>(
    bars: &[Bar],
    initial_capital: f64,
    eager_entry: bool,
    mut decide: F,
) -> Simulation
where
    F: FnMut(usize, Option<f64>) -> Signal,
{
    let mut state = PortfolioState::new(initial_capital);
    let mut last_buy_price: Option<f64> = None;
    let mut equity_curve = Vec::with_capacity(bars.len());
    let mut signals = Vec::with_capacity(bars.len());
    let mut trades = Vec::new();

    for (i, bar) in bars.iter().enumerate() {
        let close = bar.close;

        if i == 0 && eager_entry {
            if let Some(quantity) = state.buy_all(close) {
                info!("Initial entry: BUY {} @ {:.4} on {}", quantity, close, bar.date);
                trades.push(TradeRecord {
                    bar_index: i,
                    date: bar.date,
                    side: Side::Buy,
                    price: close,
                    quantity,
                    reason: TradeReason::InitialEntry,
                });
                last_buy_price = Some(close);
            }
        }

        let held_at = if state.is_flat() { None } else { last_buy_price };
        let signal = match decide(i, held_at) {
            Signal::Buy if !state.is_flat() => Signal::Hold,
            Signal::Sell(_) if state.is_flat() => Signal::Hold,
            s => s,
        };

        match signal {
            Signal::Buy => {
                if let Some(quantity) = state.buy_all(close) {
                    info!("BUY {} @ {:.4} on {}", quantity, close, bar.date);
                    trades.push(TradeRecord {
                        bar_index: i,
                        date: bar.date,
                        side: Side::Buy,
                        price: close,
                        quantity,
                        reason: TradeReason::Signal,
                    });
                    last_buy_price = Some(close);
                } else {
                    debug!("BUY on {} skipped: cash {:.2} buys no shares", bar.date, state.cash);
                }
            }
            Signal::Sell(reason) => {
                if let Some(quantity) = state.sell_all(close) {
                    info!("SELL {} @ {:.4} on {} ({:?})", quantity, close, bar.date, reason);
                    trades.push(TradeRecord {
                        bar_index: i,
                        date: bar.date,
                        side: Side::Sell,
                        price: close,
                        quantity,
                        reason: reason.into(),
                    });
                }
            }
            Signal::Hold => {}
        }

        signals.push(signal);
        equity_curve.push(EquityPoint {
            date: bar.date,
            equity: state.equity(close),
        });
    }

    let last_close = bars.last().map(|b| b.close).unwrap_or(0.0);
    let final_state = FinalState {
        cash: state.cash,
        shares: state.shares,
        equity: state.equity(last_close),
    };

    Simulation {
        equity_curve,
        trades,
        signals,
        final_state,
    }
}
