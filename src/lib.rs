//! sigtrader: rule-based Bollinger/MACD/RSI backtester.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. The command line lives in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
pub mod logging;
