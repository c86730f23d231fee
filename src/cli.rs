//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use crate::adapters::console_report_adapter::ConsoleReportAdapter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestResult, Backtester};
use crate::domain::config_validation::{
    self, period_range, strategy_kind, threshold_range, validate_strategy_config,
    validate_sweep_config, StrategyKind, DEFAULT_SWEEP_FAST, DEFAULT_SWEEP_ROC,
    DEFAULT_SWEEP_SLOW, DEFAULT_SWEEP_THRESHOLD,
};
use crate::domain::error::TraderError;
use crate::domain::indicator::Indicator;
use crate::domain::series::PriceSeries;
use crate::domain::strategy::{DiffCross, RocSmaCrossover, Strategy, SwingBreakout};
use crate::domain::sweep::{
    SweepGrid, SweepOutcome, Sweeper, DEFAULT_MAX_COMBINATIONS, DEFAULT_PROGRESS_EVERY,
    DEFAULT_TOP_K,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "sweeptrader",
    about = "Indicator strategy backtester and parameter sweeper"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Where price data comes from. Flags override the `[data]` config section.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Directory holding one <SYMBOL>.csv per symbol
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Symbol to load from the data directory
    #[arg(long)]
    pub symbol: Option<String>,
    /// Load this CSV file directly
    #[arg(long, conflicts_with_all = ["data_dir", "symbol"])]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the configured strategy on one symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        data: DataArgs,
    },
    /// Grid-search ROC(SMA) crossover parameters
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        data: DataArgs,
        /// Run even when the grid exceeds max_combinations
        #[arg(long)]
        force: bool,
        /// Worker threads (0 = all cores, 1 = sequential)
        #[arg(long)]
        threads: Option<usize>,
        /// Number of leaderboard entries to report
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Validate the strategy and sweep sections of a config file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range and the most recent bars
    Info {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        data: DataArgs,
        /// Number of trailing bars to print
        #[arg(long, default_value_t = 20)]
        tail: usize,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest { config, data } => run_backtest(&config, &data),
        Command::Sweep {
            config,
            data,
            force,
            threads,
            top_k,
        } => run_sweep(&config, &data, force, threads, top_k),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, data, tail } => run_info(config.as_deref(), &data, tail),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TraderError> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn run_backtest(config_path: &Path, data: &DataArgs) -> Result<(), TraderError> {
    let config = load_config(config_path)?;
    validate_strategy_config(&config)?;
    let strategy = build_strategy(&config)?;

    let (symbol, series) = load_series(data, Some(&config))?;
    let mut report = ConsoleReportAdapter::new(io::stdout().lock());
    run_backtest_pipeline(&symbol, &series, &strategy, &mut report)?;
    Ok(())
}

fn run_sweep(
    config_path: &Path,
    data: &DataArgs,
    force: bool,
    threads: Option<usize>,
    top_k: Option<usize>,
) -> Result<(), TraderError> {
    let config = load_config(config_path)?;
    validate_sweep_config(&config)?;
    let grid = build_sweep_grid(&config)?;

    let mut sweeper = build_sweeper(&config);
    if let Some(threads) = threads {
        sweeper = sweeper.with_threads(threads);
    }
    if let Some(top_k) = top_k {
        sweeper = sweeper.with_top_k(top_k);
    }

    let limit = config_usize(&config, "sweep", "max_combinations", DEFAULT_MAX_COMBINATIONS);
    check_grid_size(&grid, limit, force)?;

    let (symbol, series) = load_series(data, Some(&config))?;
    let mut report = ConsoleReportAdapter::new(io::stdout().lock());
    run_sweep_pipeline(&symbol, &series, &grid, &sweeper, None, &mut report)?;
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), TraderError> {
    let config = load_config(config_path)?;

    if let Err(e) = validate_strategy_config(&config) {
        if let TraderError::IndicatorParse(parse_err) = &e {
            let failing = ["indicator_a", "indicator_b"].into_iter().find_map(|key| {
                let expr = config.get_string("strategy", key)?;
                expr.parse::<Indicator>().is_err().then_some((key, expr))
            });
            if let Some((key, expr)) = failing {
                eprintln!("{}:\n{}", key, parse_err.display_with_context(&expr));
            }
        }
        return Err(e);
    }
    let strategy = build_strategy(&config)?;
    println!("Strategy: {}", strategy);

    validate_sweep_config(&config)?;
    let grid = build_sweep_grid(&config)?;
    println!(
        "Sweep grid: {} combinations ({} naive, {} fast>=slow pairs skipped)",
        grid.effective_size(),
        grid.naive_size(),
        grid.skipped_pairs()
    );

    println!("Configuration is valid.");
    Ok(())
}

fn run_info(config_path: Option<&Path>, data: &DataArgs, tail: usize) -> Result<(), TraderError> {
    let config = config_path.map(load_config).transpose()?;
    let config_ref = config.as_ref().map(|c| c as &dyn ConfigPort);

    if data.file.is_none() && resolve_symbol(data.symbol.as_deref(), config_ref).is_none() {
        let adapter = CsvAdapter::new(resolve_data_dir(data, config_ref)?);
        for symbol in adapter.list_symbols()? {
            match adapter.get_data_range(&symbol)? {
                Some((first, last, count)) => {
                    println!("{}: {} bars, {} to {}", symbol, count, first, last)
                }
                None => println!("{}: no data", symbol),
            }
        }
        return Ok(());
    }

    let (symbol, series) = load_series(data, config_ref)?;
    if let Some((first, last)) = series.date_range() {
        println!("{}: {} bars, {} to {}", symbol, series.len(), first, last);
    }
    let skip = series.len().saturating_sub(tail);
    for bar in &series.bars()[skip..] {
        println!(
            "{}, {:.2}, {:.2}, {:.2}, {:.2}, vol={:.2}",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
        );
    }
    Ok(())
}

fn config_usize(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    let default_i64 = i64::try_from(default).unwrap_or(i64::MAX);
    usize::try_from(config.get_int(section, key, default_i64)).unwrap_or(default)
}

pub fn build_strategy(config: &dyn ConfigPort) -> Result<Strategy, TraderError> {
    let threshold = config.get_double("strategy", "threshold", 0.0);
    let strategy = match strategy_kind(config)? {
        StrategyKind::RocSma => RocSmaCrossover::new(
            config_usize(config, "strategy", "fast", 0),
            config_usize(config, "strategy", "slow", 0),
            config_usize(config, "strategy", "roc", 0),
            threshold,
        )
        .into(),
        StrategyKind::DiffCross => DiffCross::new(
            config_validation::indicator(config, "indicator_a")?,
            config_validation::indicator(config, "indicator_b")?,
            threshold,
        )
        .into(),
        StrategyKind::SwingBreakout => {
            let d = SwingBreakout::default();
            SwingBreakout {
                left_bars: config_usize(config, "strategy", "left_bars", d.left_bars),
                right_bars: config_usize(config, "strategy", "right_bars", d.right_bars),
                use_ema_stop: config.get_bool("strategy", "use_ema_stop", d.use_ema_stop),
                days_above_ema_required: config_usize(
                    config,
                    "strategy",
                    "days_above_ema",
                    d.days_above_ema_required,
                ),
                gain_threshold_pct: config.get_double(
                    "strategy",
                    "gain_threshold_pct",
                    d.gain_threshold_pct,
                ),
                gain_window_bars: config_usize(
                    config,
                    "strategy",
                    "gain_window_bars",
                    d.gain_window_bars,
                ),
                max_loss_pct: config.get_double("strategy", "max_loss_pct", d.max_loss_pct),
            }
            .into()
        }
    };
    Ok(strategy)
}

pub fn build_sweep_grid(config: &dyn ConfigPort) -> Result<SweepGrid, TraderError> {
    Ok(SweepGrid::new(
        period_range(config, "fast", DEFAULT_SWEEP_FAST)?,
        period_range(config, "slow", DEFAULT_SWEEP_SLOW)?,
        period_range(config, "roc", DEFAULT_SWEEP_ROC)?,
        threshold_range(config, DEFAULT_SWEEP_THRESHOLD)?,
    ))
}

pub fn build_sweeper(config: &dyn ConfigPort) -> Sweeper {
    Sweeper::new()
        .with_top_k(config_usize(config, "sweep", "top_k", DEFAULT_TOP_K))
        .with_progress_every(config_usize(
            config,
            "sweep",
            "progress_every",
            DEFAULT_PROGRESS_EVERY,
        ))
        .with_threads(config_usize(config, "sweep", "threads", 0))
}

/// Refuse grids larger than `limit` unless forced.
pub fn check_grid_size(grid: &SweepGrid, limit: usize, force: bool) -> Result<(), TraderError> {
    let combinations = grid.effective_size();
    if combinations <= limit {
        return Ok(());
    }
    if force {
        warn!(
            "Large grid ({} combinations, limit {}); continuing because --force was given",
            combinations, limit
        );
        return Ok(());
    }
    Err(TraderError::GridTooLarge {
        combinations,
        limit,
    })
}

fn resolve_data_dir(data: &DataArgs, config: Option<&dyn ConfigPort>) -> Result<PathBuf, TraderError> {
    data.data_dir
        .clone()
        .or_else(|| {
            config
                .and_then(|c| c.get_string("data", "directory"))
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from)
        })
        .ok_or_else(|| TraderError::ConfigMissing {
            section: "data".into(),
            key: "directory".into(),
        })
}

pub fn resolve_symbol(symbol_override: Option<&str>, config: Option<&dyn ConfigPort>) -> Option<String> {
    symbol_override
        .map(str::to_string)
        .or_else(|| config.and_then(|c| c.get_string("data", "symbol")))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Fetch a symbol's bars through a data port; an empty result is an error.
pub fn fetch_series(data_port: &dyn DataPort, symbol: &str) -> Result<PriceSeries, TraderError> {
    let bars = data_port.fetch_bars(symbol)?;
    if bars.is_empty() {
        return Err(TraderError::NoData {
            symbol: symbol.to_string(),
        });
    }
    info!("Loaded {} bars for {}", bars.len(), symbol);
    Ok(PriceSeries::new(bars))
}

/// Resolve the data source from flags and config, then load it.
pub fn load_series(
    data: &DataArgs,
    config: Option<&dyn ConfigPort>,
) -> Result<(String, PriceSeries), TraderError> {
    if let Some(path) = &data.file {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bars = CsvAdapter::load_file(path)?;
        if bars.is_empty() {
            return Err(TraderError::NoData { symbol: name });
        }
        info!("Loaded {} bars from {}", bars.len(), path.display());
        return Ok((name, PriceSeries::new(bars)));
    }

    let dir = resolve_data_dir(data, config)?;
    let symbol = resolve_symbol(data.symbol.as_deref(), config).ok_or_else(|| {
        TraderError::ConfigMissing {
            section: "data".into(),
            key: "symbol".into(),
        }
    })?;
    let series = fetch_series(&CsvAdapter::new(dir), &symbol)?;
    Ok((symbol, series))
}

pub fn run_backtest_pipeline(
    symbol: &str,
    series: &PriceSeries,
    strategy: &Strategy,
    report: &mut dyn ReportPort,
) -> Result<BacktestResult, TraderError> {
    info!("Running {} on {} ({} bars)", strategy, symbol, series.len());
    let result = Backtester::new().run(strategy, series);
    report.write_backtest(symbol, strategy, &result)?;
    Ok(result)
}

pub fn run_sweep_pipeline(
    symbol: &str,
    series: &PriceSeries,
    grid: &SweepGrid,
    sweeper: &Sweeper,
    cancel: Option<&AtomicBool>,
    report: &mut dyn ReportPort,
) -> Result<SweepOutcome, TraderError> {
    let started = Instant::now();
    let outcome = sweeper.run_with(series, grid, None, cancel);
    info!(
        "Sweep took {:.2}s across {} combinations",
        started.elapsed().as_secs_f64(),
        outcome.evaluated
    );
    report.write_sweep(symbol, grid, &outcome)?;
    Ok(outcome)
}
