//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_ledger_adapter::CsvLedgerAdapter;
use crate::adapters::csv_price_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::aggregate::summarize;
use crate::domain::applier::ConflictPolicy;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult, Interval, TickOutcome};
use crate::domain::config_validation::{
    parse_date, parse_symbols, validate_backtest_config, validate_rules_config,
    validate_simulation_config,
};
use crate::domain::error::TpslError;
use crate::domain::ledger::Ledger;
use crate::domain::rules::{StopLoss, TakeProfit, Thresholds};
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::price_port::PricePort;

const RULE_BANNER: &str = "--------------------------------------------------------";

#[derive(Parser, Debug)]
#[command(name = "tpsl", about = "Take-profit / stop-loss ledger backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay historical prices against the ledger
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the final ledger here (overrides [ledger] output)
        #[arg(long)]
        ledger_out: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Evaluate the latest prices against the stored ledger and save it back
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show average price and position per symbol of a ledger file
    Inspect {
        #[arg(short, long)]
        ledger: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            ledger_out,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, ledger_out.as_deref())
            }
        }
        Command::Simulate { config } => run_simulate(&config),
        Command::Inspect { ledger } => run_inspect(&ledger),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TpslError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn required_string(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, TpslError> {
    config
        .get_string(section, key)
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| TpslError::ConfigMissing {
            section: section.into(),
            key: key.into(),
        })
}

fn required_double(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, TpslError> {
    let raw = required_string(config, section, key)?;
    raw.parse().map_err(|_| TpslError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: format!("'{}' is not a number", raw),
    })
}

fn optional_path(config: &dyn ConfigPort, section: &str, key: &str) -> Option<PathBuf> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// Thresholds for `take_profit` or `stop_loss` from the `[rules]` section.
pub fn build_thresholds(config: &dyn ConfigPort, rule: &str) -> Thresholds {
    let defaults = Thresholds::default();
    Thresholds {
        full: config.get_double("rules", &format!("{rule}_full"), defaults.full),
        partial: config.get_double("rules", &format!("{rule}_partial"), defaults.partial),
        partial_fraction: config.get_double("rules", "partial_fraction", defaults.partial_fraction),
    }
}

fn build_policy(config: &dyn ConfigPort) -> ConflictPolicy {
    config
        .get_string("backtest", "conflict_policy")
        .and_then(|s| ConflictPolicy::parse(&s))
        .unwrap_or_default()
}

fn build_interval(config: &dyn ConfigPort) -> Interval {
    config
        .get_string("backtest", "interval")
        .and_then(|s| Interval::parse(&s))
        .unwrap_or_default()
}

fn build_symbols(config: &dyn ConfigPort) -> Result<Vec<String>, TpslError> {
    parse_symbols(&required_string(config, "backtest", "symbols")?)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TpslError> {
    let start_date = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    Ok(BacktestConfig {
        initial_money: required_double(config, "backtest", "initial_money")?,
        start_date,
        end_date,
        symbols: build_symbols(config)?,
        interval: build_interval(config),
        conflict_policy: build_policy(config),
        take_profit: build_thresholds(config, "take_profit"),
        stop_loss: build_thresholds(config, "stop_loss"),
    })
}

pub fn build_price_adapter(config: &dyn ConfigPort) -> Result<CsvPriceAdapter, TpslError> {
    let path = required_string(config, "data", "prices")?;
    Ok(CsvPriceAdapter::new(PathBuf::from(path), build_interval(config)))
}

/// Seed ledger from `[ledger] initial`, or an empty one.
pub fn load_initial_ledger(config: &dyn ConfigPort) -> Result<Ledger, TpslError> {
    match optional_path(config, "ledger", "initial") {
        Some(path) => {
            eprintln!("Loading initial ledger from {}", path.display());
            CsvLedgerAdapter::new(path).load()
        }
        None => Ok(Ledger::new()),
    }
}

/// Fetch prices and replay them against `seed`. Rows the source dropped are
/// reported ahead of the per-tick warnings.
pub fn execute_backtest(
    prices: &dyn PricePort,
    seed: Ledger,
    bt_config: &BacktestConfig,
) -> Result<BacktestResult, TpslError> {
    let feed = prices.fetch_series(&bt_config.symbols, bt_config.start_date, bt_config.end_date)?;
    for w in &feed.warnings {
        warn!("{w}, dropped from price data");
    }
    if feed.series.is_empty() {
        return Err(TpslError::NoData {
            symbols: bt_config.symbols.join(","),
            start: bt_config.start_date,
            end: bt_config.end_date,
        });
    }

    let take_profit = TakeProfit::new(bt_config.take_profit);
    let stop_loss = StopLoss::new(bt_config.stop_loss);
    let mut result = backtest_engine::run_backtest(
        bt_config,
        &feed.series,
        seed,
        &take_profit,
        &stop_loss,
    );

    let mut warnings = feed.warnings;
    warnings.append(&mut result.warnings);
    result.warnings = warnings;
    Ok(result)
}

fn run_backtest(config_path: &Path, ledger_out: Option<&Path>) -> Result<(), TpslError> {
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    validate_rules_config(&adapter)?;

    let bt_config = build_backtest_config(&adapter)?;
    let prices = build_price_adapter(&adapter)?;
    let seed = load_initial_ledger(&adapter)?;

    eprintln!(
        "Running backtest: {} symbols, {} to {} ({})",
        bt_config.symbols.len(),
        bt_config.start_date,
        bt_config.end_date,
        bt_config.interval,
    );

    let result = execute_backtest(&prices, seed, &bt_config)?;
    write_summary(&mut io::stdout().lock(), &bt_config, &result)?;

    let output = ledger_out
        .map(Path::to_path_buf)
        .or_else(|| optional_path(&adapter, "ledger", "output"));
    if let Some(path) = output {
        CsvLedgerAdapter::new(path.clone()).save(&result.ledger)?;
        eprintln!("\nLedger written to: {}", path.display());
    }
    Ok(())
}

/// Profit banner for a finished backtest, written to `out`.
pub fn write_summary<W: Write>(
    out: &mut W,
    bt_config: &BacktestConfig,
    result: &BacktestResult,
) -> io::Result<()> {
    let report = &result.report;
    writeln!(out, "{RULE_BANNER}")?;
    writeln!(
        out,
        "Back testing from {} to {}:",
        bt_config.start_date, bt_config.end_date
    )?;
    writeln!(out, "  Ticks processed:  {}", result.ticks_processed)?;
    writeln!(out, "  Closing trades:   {}", result.actions.len())?;
    writeln!(out, "  Warnings:         {}", result.warnings.len())?;
    writeln!(out, "Total profit is {:.2}.", report.profit)?;
    writeln!(
        out,
        "Taking {:.2} as initial investing, percentile profit is {:.2}%.",
        report.initial_money,
        report.profit_pct * 100.0
    )?;

    if !report.per_symbol.is_empty() {
        writeln!(out, "\n=== Per-Symbol Cash Flow ===")?;
        for (symbol, flow) in &report.per_symbol {
            let sign = if *flow >= 0.0 { "+" } else { "" };
            writeln!(out, "  {}:  {}{:.2}", symbol, sign, flow)?;
        }
    }
    writeln!(out, "{RULE_BANNER}")?;
    Ok(())
}

/// One tick of simulated trading against the stored ledger. The ledger is
/// saved back only when something was appended.
pub fn simulate_once(
    memory: &dyn LedgerPort,
    prices: &dyn PricePort,
    symbols: &[String],
    take_profit: &TakeProfit,
    stop_loss: &StopLoss,
    policy: ConflictPolicy,
) -> Result<TickOutcome, TpslError> {
    let mut ledger = memory.load()?;
    let feed = prices.fetch_series(symbols, NaiveDate::MIN, NaiveDate::MAX)?;
    let Some(snapshot) = feed.series.last() else {
        return Err(TpslError::NoData {
            symbols: symbols.join(","),
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        });
    };

    info!(time = %snapshot.time, rows = ledger.len(), "simulating tick");
    let mut outcome = backtest_engine::step(&mut ledger, snapshot, take_profit, stop_loss, policy);
    if !outcome.appended.is_empty() {
        memory.save(&ledger)?;
    }

    // source problems on the evaluated tick, or with no readable time
    let mut warnings: Vec<_> = feed
        .warnings
        .into_iter()
        .filter(|w| w.time.is_none_or(|t| t == snapshot.time))
        .collect();
    warnings.append(&mut outcome.warnings);
    outcome.warnings = warnings;
    Ok(outcome)
}

fn run_simulate(config_path: &Path) -> Result<(), TpslError> {
    let adapter = load_config(config_path)?;
    validate_simulation_config(&adapter)?;
    validate_rules_config(&adapter)?;

    let memory_path = PathBuf::from(required_string(&adapter, "ledger", "memory")?);
    let memory = CsvLedgerAdapter::new(memory_path.clone());
    let prices = build_price_adapter(&adapter)?;
    let symbols = build_symbols(&adapter)?;

    let outcome = simulate_once(
        &memory,
        &prices,
        &symbols,
        &TakeProfit::new(build_thresholds(&adapter, "take_profit")),
        &StopLoss::new(build_thresholds(&adapter, "stop_loss")),
        build_policy(&adapter),
    )?;

    for w in &outcome.warnings {
        eprintln!("warning: {w}");
    }
    if outcome.appended.is_empty() {
        eprintln!("No take-profit or stop-loss action.");
    } else {
        for tx in &outcome.appended {
            println!(
                "{},{},{},{},{},{}",
                tx.symbol,
                tx.time,
                tx.transaction_price,
                tx.transaction_direction,
                tx.volume,
                tx.latest_position
            );
        }
        eprintln!(
            "{} closing trade(s) appended to {}",
            outcome.appended.len(),
            memory_path.display()
        );
    }
    Ok(())
}

fn run_inspect(ledger_path: &Path) -> Result<(), TpslError> {
    let ledger = CsvLedgerAdapter::new(ledger_path.to_path_buf()).load()?;
    let summaries = summarize(&ledger);

    if summaries.is_empty() {
        eprintln!("Ledger {} has no transactions", ledger_path.display());
        return Ok(());
    }

    println!("{:<10} {:>12} {:>12} {:>5}", "symbol", "avg_price", "position", "dir");
    for (symbol, s) in &summaries {
        println!(
            "{:<10} {:>12.4} {:>12.4} {:>5}",
            symbol, s.avg_price, s.latest_position, s.latest_direction
        );
    }
    eprintln!("{} rows, {} symbols", ledger.len(), summaries.len());
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), TpslError> {
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    validate_rules_config(&adapter)?;
    if adapter.get_string("ledger", "memory").is_some() {
        validate_simulation_config(&adapter)?;
    }
    eprintln!("Configuration is valid.");
    Ok(())
}

pub fn run_dry_run(config_path: &Path) -> Result<(), TpslError> {
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    validate_rules_config(&adapter)?;
    eprintln!("Config validated successfully");

    let bt_config = build_backtest_config(&adapter)?;
    eprintln!("\nBacktest:");
    eprintln!("  period:          {} to {}", bt_config.start_date, bt_config.end_date);
    eprintln!("  initial money:   {:.2}", bt_config.initial_money);
    eprintln!("  symbols:         {}", bt_config.symbols.join(", "));
    eprintln!("  interval:        {}", bt_config.interval);
    eprintln!("  conflict policy: {}", bt_config.conflict_policy);

    eprintln!("\nRules:");
    for (name, t) in [("take_profit", bt_config.take_profit), ("stop_loss", bt_config.stop_loss)] {
        eprintln!(
            "  {:<12} full at {:.1}%, close {:.0}% at {:.1}%",
            name,
            t.full * 100.0,
            t.partial_fraction * 100.0,
            t.partial * 100.0
        );
    }

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}
