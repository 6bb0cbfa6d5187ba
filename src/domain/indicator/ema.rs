//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first value (not an SMA), then
//! EMA[i] = EMA[i-1] + k*(V[i] - EMA[i-1]).
//! Defined from the first bar on.

pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut iter = values.iter();

    if let Some(&first) = iter.next() {
        let mut ema = first;
        out.push(ema);
        for &v in iter {
            ema += k * (v - ema);
            out.push(ema);
        }
    }

    out
}
