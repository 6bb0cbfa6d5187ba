//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is the sample standard deviation (divides by N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are `None`.

use super::stddev::rolling_mean_stddev;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerPoint {
    pub middle: f64,
    pub stddev: f64,
    pub upper: f64,
    pub lower: f64,
}

pub fn bollinger(closes: &[f64], period: usize, multiplier: f64) -> Vec<Option<BollingerPoint>> {
    rolling_mean_stddev(closes, period)
        .into_iter()
        .map(|stats| {
            stats.map(|s| BollingerPoint {
                middle: s.mean,
                stddev: s.stddev,
                upper: s.mean + multiplier * s.stddev,
                lower: s.mean - multiplier * s.stddev,
            })
        })
        .collect()
}
