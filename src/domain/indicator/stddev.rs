//! Rolling mean and sample standard deviation.
//!
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n) / (n - 1))
//!
//! Single pass: the window is seeded with Welford's update and then slid one
//! value at a time, so a constant window yields exactly zero.
//! Warmup: first (n-1) values are `None`.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub stddev: f64,
}

pub fn rolling_mean_stddev(values: &[f64], period: usize) -> Vec<Option<WindowStats>> {
    let mut out = Vec::with_capacity(values.len());
    if period < 2 {
        out.resize(values.len(), None);
        return out;
    }

    let n = period as f64;
    let mut mean = 0.0;
    let mut m2 = 0.0;

    for (i, &x) in values.iter().enumerate() {
        if i < period {
            let delta = x - mean;
            mean += delta / (i + 1) as f64;
            m2 += delta * (x - mean);
        } else {
            let old = values[i - period];
            let delta = x - old;
            let new_mean = mean + delta / n;
            m2 += delta * ((x - new_mean) + (old - mean));
            mean = new_mean;
        }

        if i + 1 >= period {
            let variance = m2.max(0.0) / (n - 1.0);
            out.push(Some(WindowStats {
                mean,
                stddev: variance.sqrt(),
            }));
        } else {
            out.push(None);
        }
    }

    out
}
