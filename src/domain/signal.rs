//! Bar-over-bar signal evaluation.
//!
//! A decision at bar `i` reads the closes and indicator sets of bars `i-1`
//! and `i`, plus the middle band of the five bars before `i` for the trend.
//!
//! - BUY: band re-entry from below in an up-trend, MACD bullish cross near
//!   zero, RSI recovering from oversold. Only while flat.
//! - SELL: stop-loss on its own, or band exit from above in a down-trend,
//!   MACD bearish cross near zero, RSI reversing from overbought. Only while
//!   holding.
//! - HOLD otherwise, and whenever bar `i` has no complete indicator set.

use serde::Serialize;
use std::fmt;

use super::error::SigtraderError;
use super::indicator::{CompleteSet, IndicatorSet};

/// Number of prior middle-band values averaged for the trend test.
pub const TREND_LOOKBACK: usize = 5;

/// RSI level the recovery/reversal rules must stay on the near side of.
const RSI_MIDLINE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalParams {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stop_loss_fraction: f64,
    /// MACD zero-axis tolerance, in price units.
    pub epsilon: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        SignalParams {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            stop_loss_fraction: 0.03,
            epsilon: 0.02,
        }
    }
}

impl SignalParams {
    pub fn validate(&self) -> Result<(), SigtraderError> {
        for (name, value) in [
            ("rsi_oversold", self.rsi_oversold),
            ("rsi_overbought", self.rsi_overbought),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(SigtraderError::invalid(name, "must be between 0 and 100"));
            }
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(SigtraderError::invalid(
                "rsi_oversold",
                "must be less than rsi_overbought",
            ));
        }
        if !(0.0..=1.0).contains(&self.stop_loss_fraction) {
            return Err(SigtraderError::invalid(
                "stop_loss_fraction",
                "must be between 0 and 1",
            ));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(SigtraderError::invalid("epsilon", "must be non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    Rule,
    StopLoss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signal {
    Buy,
    Sell(ExitReason),
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell(_) => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// Closes and complete indicator sets for bars `i-1` and `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarPair {
    pub prev_close: f64,
    pub close: f64,
    pub prev: CompleteSet,
    pub curr: CompleteSet,
}

/// Close dipped below the lower band and came back inside, under the middle.
pub fn band_reentry(p: &BarPair) -> bool {
    p.prev_close < p.prev.lower && p.close >= p.curr.lower && p.close < p.curr.middle
}

/// Close spiked above the upper band and fell back inside, over the middle.
pub fn band_exit(p: &BarPair) -> bool {
    p.prev_close > p.prev.upper && p.close < p.curr.upper && p.close > p.curr.middle
}

pub fn macd_bullish_cross(p: &BarPair, epsilon: f64) -> bool {
    p.curr.macd > p.curr.signal && p.prev.macd <= p.prev.signal && p.curr.macd > -epsilon
}

pub fn macd_bearish_cross(p: &BarPair, epsilon: f64) -> bool {
    p.curr.macd < p.curr.signal && p.prev.macd >= p.prev.signal && p.curr.macd < epsilon
}

pub fn rsi_recovery(p: &BarPair, oversold: f64) -> bool {
    p.prev.rsi < oversold && p.curr.rsi >= oversold && p.curr.rsi <= RSI_MIDLINE
}

pub fn rsi_reversal(p: &BarPair, overbought: f64) -> bool {
    p.prev.rsi > overbought && p.curr.rsi < overbought && p.curr.rsi > RSI_MIDLINE
}

pub fn stop_loss_hit(close: f64, last_buy_price: f64, fraction: f64) -> bool {
    close < last_buy_price * (1.0 - fraction)
}

/// Compare `middle[i]` with the mean of the `TREND_LOOKBACK` middle values
/// before it. `None` if any of them is unavailable.
pub fn middle_band_trend(table: &[IndicatorSet], i: usize) -> Option<Trend> {
    if i < TREND_LOOKBACK {
        return None;
    }
    let current = table.get(i)?.middle?;
    let mut sum = 0.0;
    for set in &table[i - TREND_LOOKBACK..i] {
        sum += set.middle?;
    }
    let average = sum / TREND_LOOKBACK as f64;

    Some(if current > average {
        Trend::Up
    } else if current < average {
        Trend::Down
    } else {
        Trend::Flat
    })
}

/// Evaluates signals over a fixed close/indicator table.
#[derive(Debug, Clone, Copy)]
pub struct SignalEvaluator<'a> {
    closes: &'a [f64],
    table: &'a [IndicatorSet],
    params: &'a SignalParams,
}

impl<'a> SignalEvaluator<'a> {
    /// Bars past the end of either slice evaluate to HOLD.
    pub fn new(closes: &'a [f64], table: &'a [IndicatorSet], params: &'a SignalParams) -> Self {
        SignalEvaluator {
            closes,
            table,
            params,
        }
    }

    /// Decide bar `i`. `held_at` is the last buy price while shares are held,
    /// `None` while flat.
    pub fn evaluate(&self, i: usize, held_at: Option<f64>) -> Signal {
        let Some(&close) = self.closes.get(i) else {
            return Signal::Hold;
        };
        if self.table.get(i).and_then(IndicatorSet::complete).is_none() {
            return Signal::Hold;
        }

        match held_at {
            Some(entry) => {
                if stop_loss_hit(close, entry, self.params.stop_loss_fraction) {
                    Signal::Sell(ExitReason::StopLoss)
                } else if self.rule_sell(i) {
                    Signal::Sell(ExitReason::Rule)
                } else {
                    Signal::Hold
                }
            }
            None => {
                if self.rule_buy(i) {
                    Signal::Buy
                } else {
                    Signal::Hold
                }
            }
        }
    }

    fn pair(&self, i: usize) -> Option<BarPair> {
        if i == 0 {
            return None;
        }
        Some(BarPair {
            prev_close: *self.closes.get(i - 1)?,
            close: *self.closes.get(i)?,
            prev: self.table.get(i - 1)?.complete()?,
            curr: self.table.get(i)?.complete()?,
        })
    }

    fn rule_buy(&self, i: usize) -> bool {
        let Some(p) = self.pair(i) else {
            return false;
        };
        band_reentry(&p)
            && middle_band_trend(self.table, i) == Some(Trend::Up)
            && macd_bullish_cross(&p, self.params.epsilon)
            && rsi_recovery(&p, self.params.rsi_oversold)
    }

    fn rule_sell(&self, i: usize) -> bool {
        let Some(p) = self.pair(i) else {
            return false;
        };
        band_exit(&p)
            && middle_band_trend(self.table, i) == Some(Trend::Down)
            && macd_bearish_cross(&p, self.params.epsilon)
            && rsi_reversal(&p, self.params.rsi_overbought)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(middle: f64, upper: f64, lower: f64, macd: f64, signal: f64, rsi: f64) -> IndicatorSet {
        IndicatorSet {
            middle: Some(middle),
            stddev: Some((upper - middle) / 2.0),
            upper: Some(upper),
            lower: Some(lower),
            fast_ema: Some(0.0),
            slow_ema: Some(0.0),
            macd: Some(macd),
            signal: Some(signal),
            histogram: Some(macd - signal),
            rsi: Some(rsi),
        }
    }

    fn complete(
        middle: f64,
        upper: f64,
        lower: f64,
        macd: f64,
        signal: f64,
        rsi: f64,
    ) -> CompleteSet {
        set(middle, upper, lower, macd, signal, rsi).complete().unwrap()
    }

    /// Six bars ending in a textbook BUY at index 5.
    fn buy_setup() -> (Vec<f64>, Vec<IndicatorSet>) {
        let mut table = vec![set(99.0, 104.0, 94.0, -0.6, -0.4, 40.0); 4];
        table.push(set(99.5, 104.5, 95.0, -0.5, -0.3, 25.0));
        table.push(set(100.0, 104.5, 95.5, 0.1, 0.0, 35.0));
        let closes = vec![99.0, 99.0, 99.0, 99.0, 94.0, 96.0];
        (closes, table)
    }

    /// Six bars ending in a textbook rule SELL at index 5.
    fn sell_setup() -> (Vec<f64>, Vec<IndicatorSet>) {
        let mut table = vec![set(101.0, 106.0, 96.0, 0.6, 0.4, 60.0); 4];
        table.push(set(100.5, 105.0, 95.5, 0.5, 0.3, 75.0));
        table.push(set(100.0, 104.5, 95.5, -0.1, 0.0, 65.0));
        let closes = vec![101.0, 101.0, 101.0, 101.0, 106.0, 103.0];
        (closes, table)
    }

    fn pair_at(closes: &[f64], table: &[IndicatorSet], i: usize) -> BarPair {
        BarPair {
            prev_close: closes[i - 1],
            close: closes[i],
            prev: table[i - 1].complete().unwrap(),
            curr: table[i].complete().unwrap(),
        }
    }

    #[test]
    fn band_reentry_requires_dip_then_recovery_below_middle() {
        let prev = complete(100.0, 105.0, 95.0, 0.0, 0.0, 50.0);
        let curr = complete(100.0, 105.0, 95.0, 0.0, 0.0, 50.0);
        let p = |prev_close, close| BarPair {
            prev_close,
            close,
            prev,
            curr,
        };
        assert!(band_reentry(&p(94.0, 96.0)));
        assert!(band_reentry(&p(94.0, 95.0)));
        assert!(!band_reentry(&p(95.0, 96.0)));
        assert!(!band_reentry(&p(94.0, 94.5)));
        assert!(!band_reentry(&p(94.0, 100.0)));
    }

    #[test]
    fn band_exit_requires_spike_then_fall_above_middle() {
        let s = complete(100.0, 105.0, 95.0, 0.0, 0.0, 50.0);
        let p = |prev_close, close| BarPair {
            prev_close,
            close,
            prev: s,
            curr: s,
        };
        assert!(band_exit(&p(106.0, 103.0)));
        assert!(!band_exit(&p(105.0, 103.0)));
        assert!(!band_exit(&p(106.0, 105.0)));
        assert!(!band_exit(&p(106.0, 100.0)));
    }

    #[test]
    fn macd_crosses_respect_epsilon() {
        let prev = complete(0.0, 0.0, 0.0, -0.5, -0.3, 50.0);
        let curr = complete(0.0, 0.0, 0.0, -0.01, -0.05, 50.0);
        let p = BarPair {
            prev_close: 0.0,
            close: 0.0,
            prev,
            curr,
        };
        assert!(macd_bullish_cross(&p, 0.02));
        assert!(!macd_bullish_cross(&p, 0.005));

        let prev = complete(0.0, 0.0, 0.0, 0.5, 0.3, 50.0);
        let curr = complete(0.0, 0.0, 0.0, 0.01, 0.05, 50.0);
        let p = BarPair {
            prev_close: 0.0,
            close: 0.0,
            prev,
            curr,
        };
        assert!(macd_bearish_cross(&p, 0.02));
        assert!(!macd_bearish_cross(&p, 0.005));
    }

    #[test]
    fn macd_cross_needs_previous_bar_on_other_side() {
        let prev = complete(0.0, 0.0, 0.0, 0.2, 0.1, 50.0);
        let curr = complete(0.0, 0.0, 0.0, 0.01, 0.0, 50.0);
        let p = BarPair {
            prev_close: 0.0,
            close: 0.0,
            prev,
            curr,
        };
        assert!(!macd_bullish_cross(&p, 0.02));
    }

    #[test]
    fn rsi_recovery_and_reversal_bounds() {
        let p = |prev_rsi, rsi| BarPair {
            prev_close: 0.0,
            close: 0.0,
            prev: complete(0.0, 0.0, 0.0, 0.0, 0.0, prev_rsi),
            curr: complete(0.0, 0.0, 0.0, 0.0, 0.0, rsi),
        };
        assert!(rsi_recovery(&p(25.0, 30.0), 30.0));
        assert!(rsi_recovery(&p(25.0, 50.0), 30.0));
        assert!(!rsi_recovery(&p(25.0, 50.5), 30.0));
        assert!(!rsi_recovery(&p(30.0, 35.0), 30.0));

        assert!(rsi_reversal(&p(75.0, 65.0), 70.0));
        assert!(!rsi_reversal(&p(75.0, 70.0), 70.0));
        assert!(!rsi_reversal(&p(75.0, 50.0), 70.0));
        assert!(!rsi_reversal(&p(70.0, 65.0), 70.0));
    }

    #[test]
    fn stop_loss_threshold_is_strict() {
        assert!(stop_loss_hit(96.9, 100.0, 0.03));
        assert!(!stop_loss_hit(97.0, 100.0, 0.03));
        assert!(!stop_loss_hit(120.0, 100.0, 0.03));
    }

    #[test]
    fn trend_uses_previous_five_middles() {
        let (_, table) = buy_setup();
        assert_eq!(middle_band_trend(&table, 5), Some(Trend::Up));
        let (_, table) = sell_setup();
        assert_eq!(middle_band_trend(&table, 5), Some(Trend::Down));

        let flat = vec![set(100.0, 101.0, 99.0, 0.0, 0.0, 50.0); 6];
        assert_eq!(middle_band_trend(&flat, 5), Some(Trend::Flat));
    }

    #[test]
    fn trend_unavailable_with_short_or_missing_history() {
        let (_, mut table) = buy_setup();
        assert_eq!(middle_band_trend(&table, 4), None);
        table[0] = IndicatorSet::default();
        assert_eq!(middle_band_trend(&table, 5), None);
    }

    #[test]
    fn evaluate_buy_when_all_conditions_hold() {
        let (closes, table) = buy_setup();
        let params = SignalParams::default();
        let p = pair_at(&closes, &table, 5);
        assert!(band_reentry(&p));
        assert!(macd_bullish_cross(&p, params.epsilon));
        assert!(rsi_recovery(&p, params.rsi_oversold));

        let eval = SignalEvaluator::new(&closes, &table, &params);
        assert_eq!(eval.evaluate(5, None), Signal::Buy);
    }

    #[test]
    fn evaluate_ignores_buy_while_holding() {
        let (closes, table) = buy_setup();
        let params = SignalParams {
            stop_loss_fraction: 0.5,
            ..SignalParams::default()
        };
        let eval = SignalEvaluator::new(&closes, &table, &params);
        assert_eq!(eval.evaluate(5, Some(90.0)), Signal::Hold);
    }

    #[test]
    fn evaluate_buy_blocked_by_any_missing_condition() {
        let params = SignalParams::default();

        let (closes, mut table) = buy_setup();
        table[5].rsi = Some(55.0);
        assert_eq!(SignalEvaluator::new(&closes, &table, &params).evaluate(5, None), Signal::Hold);

        let (closes, mut table) = buy_setup();
        table[5].macd = Some(-0.1);
        assert_eq!(SignalEvaluator::new(&closes, &table, &params).evaluate(5, None), Signal::Hold);

        let (mut closes, table) = buy_setup();
        closes[4] = 96.0;
        assert_eq!(SignalEvaluator::new(&closes, &table, &params).evaluate(5, None), Signal::Hold);

        let (closes, mut table) = buy_setup();
        table[5].middle = Some(98.0);
        table[5].upper = Some(102.0);
        table[5].lower = Some(94.0);
        // middle now below its trailing average: trend is down
        assert_eq!(SignalEvaluator::new(&closes, &table, &params).evaluate(5, None), Signal::Hold);
    }

    #[test]
    fn evaluate_rule_sell_when_all_conditions_hold() {
        let (closes, table) = sell_setup();
        let params = SignalParams::default();
        let eval = SignalEvaluator::new(&closes, &table, &params);
        assert_eq!(eval.evaluate(5, Some(100.0)), Signal::Sell(ExitReason::Rule));
    }

    #[test]
    fn evaluate_ignores_rule_sell_while_flat() {
        let (closes, table) = sell_setup();
        let params = SignalParams::default();
        let eval = SignalEvaluator::new(&closes, &table, &params);
        assert_eq!(eval.evaluate(5, None), Signal::Hold);
    }

    #[test]
    fn evaluate_stop_loss_overrides_rules() {
        let flat = vec![set(100.0, 101.0, 99.0, 0.0, 0.0, 50.0); 3];
        let closes = vec![100.0, 100.0, 96.0];
        let params = SignalParams::default();
        let eval = SignalEvaluator::new(&closes, &flat, &params);
        assert_eq!(eval.evaluate(2, Some(100.0)), Signal::Sell(ExitReason::StopLoss));
        assert_eq!(eval.evaluate(1, Some(100.0)), Signal::Hold);
        assert_eq!(eval.evaluate(2, None), Signal::Hold);
    }

    #[test]
    fn evaluate_holds_on_incomplete_current_bar() {
        let (closes, mut table) = buy_setup();
        table[5].rsi = None;
        let params = SignalParams::default();
        let eval = SignalEvaluator::new(&closes, &table, &params);
        assert_eq!(eval.evaluate(5, None), Signal::Hold);
        // the stop-loss also needs a complete bar
        assert_eq!(eval.evaluate(5, Some(1000.0)), Signal::Hold);
    }

    #[test]
    fn evaluate_holds_on_incomplete_previous_bar() {
        let (closes, mut table) = buy_setup();
        table[4].macd = None;
        let params = SignalParams::default();
        let eval = SignalEvaluator::new(&closes, &table, &params);
        assert_eq!(eval.evaluate(5, None), Signal::Hold);
    }

    #[test]
    fn evaluate_out_of_range_is_hold() {
        let (closes, table) = buy_setup();
        let params = SignalParams::default();
        let eval = SignalEvaluator::new(&closes, &table, &params);
        assert_eq!(eval.evaluate(99, None), Signal::Hold);
        assert_eq!(eval.evaluate(0, None), Signal::Hold);
    }

    #[test]
    fn evaluate_holds_when_closes_are_shorter_than_table() {
        let flat = vec![set(100.0, 101.0, 99.0, 0.0, 0.0, 50.0); 3];
        let closes = vec![100.0, 100.0];
        let params = SignalParams::default();
        let eval = SignalEvaluator::new(&closes, &flat, &params);
        assert_eq!(eval.evaluate(2, Some(100.0)), Signal::Hold);
        assert_eq!(eval.evaluate(2, None), Signal::Hold);
    }

    #[test]
    fn signal_display() {
        assert_eq!(Signal::Buy.to_string(), "BUY");
        assert_eq!(Signal::Sell(ExitReason::StopLoss).to_string(), "SELL");
        assert_eq!(Signal::Hold.to_string(), "HOLD");
    }

    #[test]
    fn params_validation() {
        assert!(SignalParams::default().validate().is_ok());
        let bad = SignalParams {
            rsi_oversold: 80.0,
            ..SignalParams::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(SigtraderError::InvalidParameter { parameter, .. }) if parameter == "rsi_oversold"
        ));
        let bad = SignalParams {
            stop_loss_fraction: 1.5,
            ..SignalParams::default()
        };
        assert!(bad.validate().is_err());
        let bad = SignalParams {
            epsilon: -0.1,
            ..SignalParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
