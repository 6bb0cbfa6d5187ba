//! Technical indicator implementations.
//!
//! Each indicator lives in its own module and works on a plain slice of
//! closing prices. This module ties them together:
//! - `IndicatorParams`: periods and multipliers for the three indicator families
//! - `IndicatorSet`: every indicator value for one bar, `None` while unavailable
//! - `compute_indicator_table`: one `IndicatorSet` per bar, masked until warm-up

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod stddev;

pub use bollinger::{BollingerPoint, bollinger};
pub use ema::ema;
pub use macd::{MacdPoint, macd};
pub use rsi::rsi;

use serde::Serialize;
use std::fmt;

use super::error::SigtraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            bb_period: 20,
            bb_std_dev: 2.0,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            rsi_period: 14,
        }
    }
}

impl IndicatorParams {
    /// Index of the first bar with a fully defined `IndicatorSet`.
    pub fn warmup(&self) -> usize {
        self.bb_period
            .max(self.macd_slow + self.macd_signal)
            .max(self.rsi_period)
    }

    pub fn validate(&self) -> Result<(), SigtraderError> {
        if self.bb_period < 2 {
            return Err(SigtraderError::invalid("bb_period", "must be at least 2"));
        }
        if !(self.bb_std_dev.is_finite() && self.bb_std_dev > 0.0) {
            return Err(SigtraderError::invalid("bb_std_dev", "must be positive"));
        }
        for (name, period) in [
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
        ] {
            if period < 1 {
                return Err(SigtraderError::invalid(name, "must be at least 1"));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(SigtraderError::invalid(
                "macd_fast",
                format!(
                    "must be less than macd_slow ({} >= {})",
                    self.macd_fast, self.macd_slow
                ),
            ));
        }
        if self.rsi_period < 2 {
            return Err(SigtraderError::invalid("rsi_period", "must be at least 2"));
        }
        Ok(())
    }
}

impl fmt::Display for IndicatorParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BOLLINGER({},{}) MACD({},{},{}) RSI({})",
            self.bb_period,
            self.bb_std_dev,
            self.macd_fast,
            self.macd_slow,
            self.macd_signal,
            self.rsi_period
        )
    }
}

/// All indicator values for a single bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub middle: Option<f64>,
    pub stddev: Option<f64>,
    pub upper: Option<f64>,
    pub lower: Option<f64>,
    pub fast_ema: Option<f64>,
    pub slow_ema: Option<f64>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
    pub rsi: Option<f64>,
}

impl IndicatorSet {
    pub fn is_complete(&self) -> bool {
        self.complete().is_some()
    }

    /// The set with every field unwrapped, if all are available.
    pub fn complete(&self) -> Option<CompleteSet> {
        Some(CompleteSet {
            middle: self.middle?,
            upper: self.upper?,
            lower: self.lower?,
            macd: self.macd?,
            signal: self.signal?,
            rsi: self.rsi?,
        })
    }
}

/// The subset of an `IndicatorSet` the signal rules read, all present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompleteSet {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
    pub macd: f64,
    pub signal: f64,
    pub rsi: f64,
}

/// Compute one `IndicatorSet` per close, with every field `None` before
/// `params.warmup()`.
pub fn compute_indicator_table(closes: &[f64], params: &IndicatorParams) -> Vec<IndicatorSet> {
    let warmup = params.warmup();
    let bands = bollinger(closes, params.bb_period, params.bb_std_dev);
    let macd_points = macd(closes, params.macd_fast, params.macd_slow, params.macd_signal);
    let rsi_values = rsi(closes, params.rsi_period);

    (0..closes.len())
        .map(|i| {
            if i < warmup {
                return IndicatorSet::default();
            }
            let band = bands[i];
            let m = macd_points.get(i);
            IndicatorSet {
                middle: band.map(|b| b.middle),
                stddev: band.map(|b| b.stddev),
                upper: band.map(|b| b.upper),
                lower: band.map(|b| b.lower),
                fast_ema: m.map(|p| p.fast_ema),
                slow_ema: m.map(|p| p.slow_ema),
                macd: m.map(|p| p.macd),
                signal: m.map(|p| p.signal),
                histogram: m.map(|p| p.histogram),
                rsi: rsi_values[i],
            }
        })
        .collect()
}
