//! RSI (Relative Strength Index) indicator.
//!
//! Average gain/loss are simple rolling means of the last n close-to-close
//! changes (no Wilder smoothing).
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0 and avg_gain > 0: RSI = 100
//! If avg_loss == 0 and avg_gain == 0: RSI = 50
//!
//! Warmup: first n bars are `None` (need n price changes).

pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    // Non-zero entries in the window; a zero count pins the sum to exactly 0.
    let mut gains_in_window = 0usize;
    let mut losses_in_window = 0usize;

    let split = |i: usize| {
        let change = closes[i] - closes[i - 1];
        (change.max(0.0), (-change).max(0.0))
    };

    for i in 1..closes.len() {
        let (gain, loss) = split(i);
        gain_sum += gain;
        loss_sum += loss;
        gains_in_window += usize::from(gain > 0.0);
        losses_in_window += usize::from(loss > 0.0);

        if i > period {
            let (old_gain, old_loss) = split(i - period);
            gain_sum -= old_gain;
            loss_sum -= old_loss;
            gains_in_window -= usize::from(old_gain > 0.0);
            losses_in_window -= usize::from(old_loss > 0.0);
        }
        if gains_in_window == 0 {
            gain_sum = 0.0;
        }
        if losses_in_window == 0 {
            loss_sum = 0.0;
        }

        if i >= period {
            let avg_gain = gain_sum / period as f64;
            let avg_loss = loss_sum / period as f64;
            out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
        }
    }

    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 { 100.0 } else { 50.0 }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rsi_empty_and_single() {
        assert!(rsi(&[], 14).is_empty());
        assert_eq!(rsi(&[100.0], 14), vec![None]);
    }

    #[test]
    fn rsi_warmup_period() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + (i % 5) as f64 * 2.0).collect();
        let values = rsi(&closes, 14);
        assert!(values[..14].iter().all(Option::is_none));
        assert!(values[14].is_some());
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&closes, 14)[14], Some(100.0));
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&closes, 14)[14], Some(0.0));
    }

    #[test]
    fn rsi_flat_is_50() {
        let values = rsi(&[42.0; 20], 14);
        assert!(values[14..].iter().all(|v| *v == Some(50.0)));
    }

    #[test]
    fn rsi_known_simple_average() {
        // changes: +2, -1, +3 over period 3: avg_gain 5/3, avg_loss 1/3 -> RS 5
        let values = rsi(&[10.0, 12.0, 11.0, 14.0], 3);
        assert_relative_eq!(values[3].unwrap(), 100.0 - 100.0 / 6.0);
    }

    #[test]
    fn rsi_window_rolls_off_old_losses() {
        // one loss then only gains: once the loss leaves the window RSI is exactly 100
        let closes = [10.0, 9.7, 10.1, 10.4, 10.9, 11.3];
        let values = rsi(&closes, 3);
        assert!(values[3].unwrap() < 100.0);
        assert_eq!(values[4], Some(100.0));
        assert_eq!(values[5], Some(100.0));
    }

    #[test]
    fn rsi_stays_in_range() {
        let closes: Vec<f64> = (1..=40)
            .map(|i| 100.0 + ((i % 7) as f64 - 3.0) * 2.0)
            .collect();
        for v in rsi(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_zero_period() {
        assert_eq!(rsi(&[1.0, 2.0], 0), vec![None, None]);
    }
}
