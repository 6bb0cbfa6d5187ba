//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod signal;
pub mod portfolio;
pub mod backtest;
pub mod benchmark;
pub mod metrics;
pub mod config_validation;
pub mod error;
