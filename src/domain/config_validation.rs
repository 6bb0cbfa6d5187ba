//! Configuration parsing and validation.
//!
//! Missing keys take their defaults. A key that is present but does not parse
//! is an `InvalidParameter` naming that key; ranges are then checked by
//! `BacktestConfig::validate`.

use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::SigtraderError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::signal::SignalParams;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Sections read by the builders below.
pub const CONFIG_SECTIONS: [&str; 3] = ["backtest", "strategy", "report"];

/// Where a run reads from and writes to.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub symbol: Option<String>,
    pub data_dir: PathBuf,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub benchmarks: Vec<String>,
    pub output_dir: PathBuf,
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SigtraderError> {
    let ind = IndicatorParams::default();
    let rules = SignalParams::default();

    let bt_config = BacktestConfig {
        initial_capital: read(config, "backtest", "initial_capital", 10_000.0)?,
        indicators: IndicatorParams {
            bb_period: read(config, "strategy", "bb_period", ind.bb_period)?,
            bb_std_dev: read(config, "strategy", "bb_std_dev", ind.bb_std_dev)?,
            macd_fast: read(config, "strategy", "macd_fast", ind.macd_fast)?,
            macd_slow: read(config, "strategy", "macd_slow", ind.macd_slow)?,
            macd_signal: read(config, "strategy", "macd_signal", ind.macd_signal)?,
            rsi_period: read(config, "strategy", "rsi_period", ind.rsi_period)?,
        },
        rules: SignalParams {
            rsi_oversold: read(config, "strategy", "rsi_oversold", rules.rsi_oversold)?,
            rsi_overbought: read(config, "strategy", "rsi_overbought", rules.rsi_overbought)?,
            stop_loss_fraction: read(
                config,
                "strategy",
                "stop_loss_fraction",
                rules.stop_loss_fraction,
            )?,
            epsilon: read(config, "strategy", "epsilon", rules.epsilon)?,
        },
    };

    bt_config.validate()?;
    Ok(bt_config)
}

pub fn build_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, SigtraderError> {
    let start_date = read_date(config, "backtest", "start_date")?;
    let end_date = read_date(config, "backtest", "end_date")?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(SigtraderError::invalid(
                "start_date",
                format!("{start} is after end_date {end}"),
            ));
        }
    }

    Ok(RunSettings {
        symbol: present(config, "backtest", "symbol").map(|s| s.to_uppercase()),
        data_dir: present(config, "backtest", "data_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        start_date,
        end_date,
        benchmarks: config
            .get_list("backtest", "benchmarks")
            .into_iter()
            .map(|s| s.to_uppercase())
            .collect(),
        output_dir: present(config, "report", "output_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
    })
}

/// Sections no builder reads, sorted. Their keys are silently ignored.
pub fn unknown_sections(sections: &[String]) -> Vec<String> {
    let mut unknown: Vec<String> = sections
        .iter()
        .filter(|s| !CONFIG_SECTIONS.contains(&s.as_str()))
        .cloned()
        .collect();
    unknown.sort();
    unknown
}

fn present(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, SigtraderError> {
    match present(config, section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| SigtraderError::invalid(key, format!("cannot parse {raw:?}"))),
    }
}

fn read_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, SigtraderError> {
    present(config, section, key)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                SigtraderError::invalid(key, format!("invalid date {raw:?}, expected YYYY-MM-DD"))
            })
        })
        .transpose()
}
