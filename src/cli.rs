//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvDataAdapter;
use crate::adapters::csv_report_adapter::{CsvReportAdapter, write_indicator_table};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::benchmark::{BenchmarkComparison, align_benchmarks};
use crate::domain::config_validation::{
    DEFAULT_DATA_DIR, RunSettings, build_backtest_config, build_run_settings, unknown_sections,
};
use crate::domain::error::SigtraderError;
use crate::domain::indicator::compute_indicator_table;
use crate::domain::metrics::Metrics;
use crate::domain::ohlcv::{Bar, closes, validate_bars};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "sigtrader",
    version,
    about = "Bollinger/MACD/RSI signal backtester"
)]
pub struct Cli {
    /// Log level (RUST_LOG overrides)
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest and write the CSV report
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated reference symbols
        #[arg(long, value_delimiter = ',')]
        benchmarks: Option<Vec<String>>,
    },
    /// Print or save the per-bar indicator table
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            symbol,
            data_dir,
            output,
            benchmarks,
        } => load_settings(&config).and_then(|(bt_config, mut settings)| {
            apply_overrides(&mut settings, symbol, data_dir);
            if let Some(dir) = output {
                settings.output_dir = dir;
            }
            if let Some(list) = benchmarks {
                settings.benchmarks = normalize_symbols(list);
            }
            let data_port = CsvDataAdapter::new(settings.data_dir.clone());
            run_backtest_pipeline(&data_port, &CsvReportAdapter, &bt_config, &settings)
                .map(|run| run.exit_code())
        }),
        Command::Indicators {
            config,
            symbol,
            data_dir,
            output,
        } => load_settings(&config).and_then(|(bt_config, mut settings)| {
            apply_overrides(&mut settings, symbol, data_dir);
            let data_port = CsvDataAdapter::new(settings.data_dir.clone());
            run_indicators(&data_port, &bt_config, &settings, output.as_ref())
        }),
        Command::ListSymbols { config, data_dir } => {
            resolve_data_dir(config.as_ref(), data_dir).and_then(|dir| {
                print_symbols(&list_symbols(&CsvDataAdapter::new(dir.clone()))?, &dir);
                Ok(ExitCode::SUCCESS)
            })
        }
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => report_error(&e),
    }
}

/// Print `err` at the severity its kind carries and return its exit code.
fn report_error(err: &SigtraderError) -> ExitCode {
    if err.is_fatal() {
        eprintln!("error: {err}");
    } else {
        eprintln!("warning: {err}; no signals were evaluated");
    }
    err.into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, SigtraderError> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn load_settings(path: &PathBuf) -> Result<(BacktestConfig, RunSettings), SigtraderError> {
    let adapter = load_config(path)?;
    for section in unknown_sections(&adapter.sections()) {
        warn!("Ignoring unknown config section [{}]", section);
    }
    Ok((build_backtest_config(&adapter)?, build_run_settings(&adapter)?))
}

/// `--data-dir`, else the config's `data_dir`, else the default.
fn resolve_data_dir(
    config: Option<&PathBuf>,
    data_dir: Option<PathBuf>,
) -> Result<PathBuf, SigtraderError> {
    if let Some(dir) = data_dir {
        return Ok(dir);
    }
    match config {
        Some(path) => Ok(build_run_settings(&load_config(path)?)?.data_dir),
        None => Ok(PathBuf::from(DEFAULT_DATA_DIR)),
    }
}

/// Symbols the data port can serve, sorted.
pub fn list_symbols(data_port: &dyn DataPort) -> Result<Vec<String>, SigtraderError> {
    let symbols = data_port.list_symbols()?;
    info!("Found {} symbols", symbols.len());
    Ok(symbols)
}

fn print_symbols(symbols: &[String], data_dir: &Path) {
    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
}

fn apply_overrides(settings: &mut RunSettings, symbol: Option<String>, data_dir: Option<PathBuf>) {
    if let Some(s) = symbol {
        settings.symbol = Some(s.trim().to_uppercase());
    }
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
}

fn normalize_symbols(list: Vec<String>) -> Vec<String> {
    list.into_iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn require_symbol(settings: &RunSettings) -> Result<&str, SigtraderError> {
    settings
        .symbol
        .as_deref()
        .ok_or_else(|| SigtraderError::ConfigMissing {
            section: "backtest".into(),
            key: "symbol".into(),
        })
}

/// Fetch bars for the configured symbol; an empty range is `NoData`.
pub fn load_bars(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<Vec<Bar>, SigtraderError> {
    let symbol = require_symbol(settings)?;
    let bars = data_port.fetch_bars(symbol, settings.start_date, settings.end_date)?;
    if bars.is_empty() {
        return Err(SigtraderError::NoData {
            symbol: symbol.to_string(),
        });
    }
    info!("Loaded {} bars for {}", bars.len(), symbol);
    Ok(bars)
}

/// Reference series by symbol. A benchmark that fails to load is kept with
/// no bars, so it aligns to an absent comparison.
pub fn load_benchmarks(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> BTreeMap<String, Vec<Bar>> {
    settings
        .benchmarks
        .iter()
        .map(|symbol| {
            let bars = data_port
                .fetch_bars(symbol, settings.start_date, settings.end_date)
                .unwrap_or_else(|e| {
                    warn!("Benchmark {} unavailable: {}", symbol, e);
                    Vec::new()
                });
            (symbol.clone(), bars)
        })
        .collect()
}

/// Everything a finished backtest run produced.
#[derive(Debug)]
pub struct BacktestRun {
    pub bars: Vec<Bar>,
    pub result: BacktestResult,
    pub metrics: Metrics,
    pub comparisons: BTreeMap<String, Option<BenchmarkComparison>>,
}

impl BacktestRun {
    /// Success, or the insufficient-data code when the input was shorter
    /// than the warm-up window.
    pub fn exit_code(&self) -> ExitCode {
        match self.result.insufficient_data {
            Some(shortfall) => report_error(&SigtraderError::from(shortfall)),
            None => ExitCode::SUCCESS,
        }
    }
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    bt_config: &BacktestConfig,
    settings: &RunSettings,
) -> Result<BacktestRun, SigtraderError> {
    let bars = load_bars(data_port, settings)?;
    let result = run_backtest(&bars, bt_config)?;

    let references = load_benchmarks(data_port, settings);
    let comparisons =
        align_benchmarks(&result.equity_curve, &references, bt_config.initial_capital);

    let metrics = Metrics::compute(&result, bt_config.initial_capital);
    print_summary(&result, &metrics, &comparisons);

    report_port.write(&bars, &result, &comparisons, &settings.output_dir)?;
    eprintln!("\nReport written to: {}", settings.output_dir.display());

    Ok(BacktestRun {
        bars,
        result,
        metrics,
        comparisons,
    })
}

fn print_summary(
    result: &BacktestResult,
    metrics: &Metrics,
    comparisons: &BTreeMap<String, Option<BenchmarkComparison>>,
) {
    eprintln!("\n=== Results ===");
    eprintln!("Final Equity:     {:.2}", metrics.final_equity);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Trades:           {}", result.trades.len());
    eprintln!("Round Trips:      {}", metrics.round_trips);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Avg Bars Held:    {:.1}", metrics.avg_bars_held);
    eprintln!(
        "Final Position:   {} shares, {:.2} cash",
        result.final_state.shares, result.final_state.cash
    );

    if !comparisons.is_empty() {
        eprintln!("\n=== Benchmarks ===");
        for (symbol, comparison) in comparisons {
            match comparison.as_ref().and_then(BenchmarkComparison::excess_return) {
                Some(excess) => eprintln!("  {}: excess return {:+.2}%", symbol, excess * 100.0),
                None => eprintln!("  {}: no overlapping data", symbol),
            }
        }
    }
}

pub fn run_indicators(
    data_port: &dyn DataPort,
    bt_config: &BacktestConfig,
    settings: &RunSettings,
    output: Option<&PathBuf>,
) -> Result<ExitCode, SigtraderError> {
    let bars = load_bars(data_port, settings)?;
    validate_bars(&bars)?;

    let params = &bt_config.indicators;
    let table = compute_indicator_table(&closes(&bars), params);
    if bars.len() <= params.warmup() {
        warn!(
            "Only {} bars; indicators become available at bar {}",
            bars.len(),
            params.warmup()
        );
    }

    match output {
        Some(path) => {
            write_indicator_table(File::create(path)?, &bars, &table)?;
            eprintln!("Indicators written to: {}", path.display());
        }
        None => write_indicator_table(io::stdout().lock(), &bars, &table)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn run_validate(config_path: &PathBuf) -> Result<ExitCode, SigtraderError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = load_config(config_path)?;
    let unknown = unknown_sections(&adapter.sections());
    let bt_config = build_backtest_config(&adapter)?;
    let settings = build_run_settings(&adapter)?;

    eprintln!("\nIndicators:       {}", bt_config.indicators);
    eprintln!(
        "RSI bounds:       {} / {}",
        bt_config.rules.rsi_oversold, bt_config.rules.rsi_overbought
    );
    eprintln!(
        "Stop loss:        {:.2}%",
        bt_config.rules.stop_loss_fraction * 100.0
    );
    eprintln!("MACD epsilon:     {}", bt_config.rules.epsilon);
    eprintln!("Initial capital:  {:.2}", bt_config.initial_capital);
    eprintln!("Minimum bars:     {}", bt_config.required_bars());
    eprintln!(
        "Symbol:           {}",
        settings.symbol.as_deref().unwrap_or("(not set)")
    );
    if !settings.benchmarks.is_empty() {
        eprintln!("Benchmarks:       {}", settings.benchmarks.join(", "));
    }

    for section in &unknown {
        eprintln!("warning: unknown section [{}] is ignored", section);
    }

    eprintln!("\nConfiguration is valid.");
    Ok(ExitCode::SUCCESS)
}
