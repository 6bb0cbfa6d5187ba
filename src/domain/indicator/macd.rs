//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Every EMA is seeded with its first input, so values exist from bar 0; the
//! caller decides when they are trustworthy (see `IndicatorParams::warmup`).
//!
//! Default parameters: fast=12, slow=26, signal=9

use super::ema::ema;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub fast_ema: f64,
    pub slow_ema: f64,
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> Vec<MacdPoint> {
    if closes.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return Vec::new();
    }

    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&line, signal_period);

    (0..closes.len())
        .map(|i| MacdPoint {
            fast_ema: fast_ema[i],
            slow_ema: slow_ema[i],
            macd: line[i],
            signal: signal[i],
            histogram: line[i] - signal[i],
        })
        .collect()
}
