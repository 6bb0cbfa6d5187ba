//! Backtest engine: validation, indicator table, simulation loop.
//!
//! `BacktestConfig` carries every tunable of a run; `run_backtest` is pure
//! over its inputs, so identical bars and config give identical results.

use tracing::{debug, info, warn};

use super::error::SigtraderError;
use super::indicator::{IndicatorParams, IndicatorSet, compute_indicator_table};
use super::ohlcv::{Bar, closes, validate_bars};
use super::portfolio::{EquityPoint, FinalState, TradeRecord, simulate};
use super::signal::{Signal, SignalEvaluator, SignalParams};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub indicators: IndicatorParams,
    pub rules: SignalParams,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            indicators: IndicatorParams::default(),
            rules: SignalParams::default(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), SigtraderError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(SigtraderError::invalid(
                "initial_capital",
                "must be a positive number",
            ));
        }
        self.indicators.validate()?;
        self.rules.validate()
    }

    /// Fewest bars for a full run; shorter inputs are flagged insufficient.
    pub fn required_bars(&self) -> usize {
        self.indicators.warmup()
    }
}

/// How far short of the warm-up window an input fell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataShortfall {
    pub bars: usize,
    pub minimum: usize,
}

impl From<DataShortfall> for SigtraderError {
    fn from(shortfall: DataShortfall) -> Self {
        SigtraderError::InsufficientData {
            bars: shortfall.bars,
            minimum: shortfall.minimum,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    pub signals: Vec<Signal>,
    pub indicators: Vec<IndicatorSet>,
    pub final_state: FinalState,
    /// Set when the input was shorter than the warm-up window.
    pub insufficient_data: Option<DataShortfall>,
}

impl BacktestResult {
    pub fn is_insufficient(&self) -> bool {
        self.insufficient_data.is_some()
    }
}

pub fn run_backtest(
    bars: &[Bar],
    config: &BacktestConfig,
) -> Result<BacktestResult, SigtraderError> {
    config.validate()?;
    validate_bars(bars)?;

    let closes = closes(bars);
    let indicators = compute_indicator_table(&closes, &config.indicators);

    info!(
        "Running backtest: {} bars, capital {:.2}, {}",
        bars.len(),
        config.initial_capital,
        config.indicators
    );

    let minimum = config.required_bars();
    if bars.len() < minimum {
        warn!("Insufficient data: have {} bars, need {}", bars.len(), minimum);
        let sim = simulate(bars, config.initial_capital, false, |_, _| Signal::Hold);
        return Ok(BacktestResult {
            equity_curve: sim.equity_curve,
            trades: sim.trades,
            signals: sim.signals,
            indicators,
            final_state: sim.final_state,
            insufficient_data: Some(DataShortfall {
                bars: bars.len(),
                minimum,
            }),
        });
    }

    let evaluator = SignalEvaluator::new(&closes, &indicators, &config.rules);
    let sim = simulate(bars, config.initial_capital, true, |i, held_at| {
        evaluator.evaluate(i, held_at)
    });

    debug!(
        "Signals: {} buy, {} sell",
        sim.signals.iter().filter(|s| **s == Signal::Buy).count(),
        sim.signals
            .iter()
            .filter(|s| matches!(s, Signal::Sell(_)))
            .count()
    );
    info!(
        "Backtest complete: {} trades, final equity {:.2}",
        sim.trades.len(),
        sim.final_state.equity
    );

    Ok(BacktestResult {
        equity_curve: sim.equity_curve,
        trades: sim.trades,
        signals: sim.signals,
        indicators,
        final_state: sim.final_state,
        insufficient_data: None,
    })
}
