//! CLI definition and dispatch.
//!
//! Progress goes to stderr through `tracing`; results go to stdout.

use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::cached_data_adapter::CachedDataAdapter;
use crate::adapters::csv_adapter::{CsvAdapter, CsvReferenceAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::universe_file::{self, Listing};
use crate::domain::config_validation::{validate_config, Settings};
use crate::domain::error::ArascanError;
use crate::domain::forward::{self, BacktestOutcome, WindowPolicy};
use crate::domain::report::{summarize, Summary, WinStats};
use crate::domain::rule::RuleConfig;
use crate::domain::screening::{self, ScreenContext, ScreenReport};
use crate::domain::series_store::SeriesStore;
use crate::domain::universe::parse_codes;
use crate::ports::data_port::DataPort;
use crate::ports::reference_port::{NoReferenceData, ReferenceDataPort};

#[derive(Parser, Debug)]
#[command(name = "arascan", about = "Technical screening and forward-return backtesting")]
pub struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Screen the universe at a reference date
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        profile: Option<String>,
        /// Reference date (YYYY-MM-DD); defaults to the latest available bar
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        top_k: Option<usize>,
        /// Comma separated codes, overriding the configured universe
        #[arg(long)]
        codes: Option<String>,
    },
    /// Screen, then replay the forward window and report win rates
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        profile: Option<String>,
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        codes: Option<String>,
        /// Forward window length
        #[arg(long)]
        horizon: Option<u32>,
        /// Success threshold in percent
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
}

/// Overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub profile: Option<String>,
    pub reference_date: Option<NaiveDate>,
    pub top_k: Option<usize>,
    pub codes: Option<String>,
    pub horizon: Option<u32>,
    pub threshold: Option<f64>,
}

pub struct PipelineOutput {
    pub reference_date: NaiveDate,
    /// Company names from the universe file, keyed by code.
    pub names: HashMap<String, String>,
    pub report: ScreenReport,
    pub outcomes: Vec<BacktestOutcome>,
    pub summary: Option<Summary>,
}

pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Screen {
            config,
            profile,
            date,
            top_k,
            codes,
        } => run_command(
            &config,
            RunOptions {
                profile,
                reference_date: date,
                top_k,
                codes,
                ..RunOptions::default()
            },
            false,
        ),
        Command::Backtest {
            config,
            profile,
            date,
            top_k,
            codes,
            horizon,
            threshold,
        } => run_command(
            &config,
            RunOptions {
                profile,
                reference_date: date,
                top_k,
                codes,
                horizon,
                threshold,
            },
            true,
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, code } => run_info(&config, code.as_deref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = ArascanError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: ArascanError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

/// Apply CLI overrides to validated settings.
pub fn apply_overrides(mut settings: Settings, options: &RunOptions) -> Result<Settings, ArascanError> {
    if let Some(date) = options.reference_date {
        settings.screen.reference_date = Some(date);
    }
    if let Some(k) = options.top_k {
        settings.rank.top_k = Some(k);
    }
    if let Some(codes) = &options.codes {
        settings.screen.codes = Some(codes.clone());
    }
    if let Some(horizon) = options.horizon {
        settings.backtest.horizon_days = horizon;
    }
    if let Some(threshold) = options.threshold {
        settings.backtest.success_threshold_pct = threshold;
    }
    settings.backtest.validate()?;
    Ok(settings)
}

fn build_data_port(settings: &Settings) -> Box<dyn DataPort> {
    let csv = CsvAdapter::new(settings.data.dir.clone());
    if settings.data.cache_ttl_secs > 0 {
        Box::new(CachedDataAdapter::new(
            csv,
            std::time::Duration::from_secs(settings.data.cache_ttl_secs),
        ))
    } else {
        Box::new(csv)
    }
}

fn build_reference_port(settings: &Settings) -> Result<Box<dyn ReferenceDataPort>, ArascanError> {
    match &settings.data.reference_file {
        Some(path) => {
            let adapter = CsvReferenceAdapter::from_file(path, &settings.data.symbol_suffix)?;
            info!(path = %path.display(), entries = adapter.len(), "reference data loaded");
            Ok(Box::new(adapter))
        }
        None => Ok(Box::new(NoReferenceData)),
    }
}

/// Universe from, in order of precedence: explicit codes, the universe file,
/// every symbol the data port knows. The benchmark is never part of it.
/// Only the universe file carries company names.
pub fn resolve_universe(settings: &Settings, data_port: &dyn DataPort) -> Result<Listing, ArascanError> {
    let suffix = &settings.data.symbol_suffix;
    let mut listing = if let Some(list) = &settings.screen.codes {
        let codes =
            parse_codes(list, suffix).map_err(|e| ArascanError::invalid("screen", "codes", e.to_string()))?;
        Listing { codes, ..Listing::default() }
    } else if let Some(path) = &settings.data.universe_file {
        universe_file::load_listing(
            path,
            &settings.data.universe_column,
            &settings.data.universe_name_column,
            suffix,
        )?
    } else {
        Listing {
            codes: data_port.list_symbols()?,
            ..Listing::default()
        }
    };
    if let Some(benchmark) = &settings.screen.benchmark {
        listing.codes.retain(|c| c != benchmark);
    }
    if listing.codes.is_empty() {
        return Err(ArascanError::DataUnavailable {
            scope: "universe (no codes configured)".into(),
        });
    }
    Ok(listing)
}

/// Latest bar date over `codes`, used when no reference date is given.
fn latest_date(data_port: &dyn DataPort, codes: &[String]) -> Result<NaiveDate, ArascanError> {
    let mut latest = None;
    for code in codes {
        match data_port.get_data_range(code) {
            Ok(Some((_, last, _))) => latest = latest.max(Some(last)),
            Ok(None) => {}
            Err(e) => warn!(code = %code, error = %e, "data range unavailable"),
        }
    }
    latest.ok_or_else(|| ArascanError::DataUnavailable {
        scope: format!("{} symbols (no bars to pick a reference date from)", codes.len()),
    })
}

/// Last calendar date the forward window can reach.
fn fetch_end(settings: &Settings, reference_date: NaiveDate) -> NaiveDate {
    let horizon = i64::from(settings.backtest.horizon_days);
    let span = match settings.backtest.window {
        WindowPolicy::CalendarDays => horizon,
        // trading bars stretch over weekends and holidays
        WindowPolicy::TradingBars => horizon * 2 + 14,
    };
    reference_date + Duration::days(span)
}

/// Load, screen and optionally backtest. Bars after the reference date are
/// only fetched when `with_backtest` is set.
pub fn run_pipeline(
    data_port: &dyn DataPort,
    reference: &dyn ReferenceDataPort,
    settings: &Settings,
    rules: &RuleConfig,
    with_backtest: bool,
    cancel: Option<&AtomicBool>,
) -> Result<PipelineOutput, ArascanError> {
    let Listing { codes: universe, names } = resolve_universe(settings, data_port)?;
    let reference_date = match settings.screen.reference_date {
        Some(date) => date,
        None => latest_date(data_port, &universe)?,
    };

    let start = reference_date - Duration::days(i64::from(settings.screen.lookback_days));
    let end = if with_backtest {
        fetch_end(settings, reference_date)
    } else {
        reference_date
    };

    let mut to_load = universe.clone();
    if let Some(benchmark) = &settings.screen.benchmark {
        to_load.push(benchmark.clone());
    }
    info!(
        symbols = universe.len(),
        %reference_date,
        %start,
        %end,
        profile = %rules.name,
        "loading series"
    );
    let loaded = SeriesStore::load(data_port, &to_load, start, end)?;

    let ctx = ScreenContext {
        params: settings.indicators.clone(),
        thresholds: settings.labels.clone(),
        benchmark: settings.screen.benchmark.clone(),
        reference,
        cancel,
        threads: settings.threads,
    };
    let report = screening::run(&loaded.store, &universe, reference_date, rules, &settings.rank, &ctx)?;

    let (outcomes, summary) = if with_backtest {
        let screened: Vec<String> = report.results.iter().map(|r| r.symbol.clone()).collect();
        let outcomes = forward::backtest(
            &loaded.store,
            &screened,
            reference_date,
            &settings.backtest,
            settings.threads,
            cancel,
        )?;
        let summary = summarize(&report.results, &report.shortlist, &outcomes);
        (outcomes, Some(summary))
    } else {
        (Vec::new(), None)
    };

    Ok(PipelineOutput {
        reference_date,
        names,
        report,
        outcomes,
        summary,
    })
}

fn run_command(config_path: &PathBuf, options: RunOptions, with_backtest: bool) -> ExitCode {
    info!(path = %config_path.display(), "loading config");
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let settings = match Settings::from_config(&config).and_then(|s| apply_overrides(s, &options)) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let rules = match settings.rules(&config, options.profile.as_deref()) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let reference = match build_reference_port(&settings) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let data_port = build_data_port(&settings);

    match run_pipeline(data_port.as_ref(), reference.as_ref(), &settings, &rules, with_backtest, None) {
        Ok(output) => {
            print!("{}", format_screen(&output));
            if let Some(summary) = &output.summary {
                print!("{}", format_backtest(&output, summary));
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn fmt_rate(stats: &WinStats) -> String {
    stats
        .win_rate_pct()
        .map_or_else(|| "n/a".to_string(), |r| format!("{r:.1}%"))
}

pub fn format_screen(output: &PipelineOutput) -> String {
    let report = &output.report;
    let mut out = String::new();
    let _ = writeln!(out, "Reference date: {}", output.reference_date);
    let _ = writeln!(
        out,
        "{:<4} {:<12} {:<14} {:>10} {:>12} {:>9} {:>7} {:>7}  {}",
        "rank", "symbol", "status", "score", "close", "vol_ratio", "mfi", "rsi", "name"
    );
    for (i, r) in report.shortlist.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<4} {:<12} {:<14} {:>10.3} {:>12.2} {:>9.2} {:>7.1} {:>7.1}  {}",
            i + 1,
            r.symbol,
            r.status.to_string(),
            r.rank_score,
            r.snapshot.close,
            r.snapshot.volume_ratio,
            r.snapshot.mfi,
            r.snapshot.rsi,
            output.names.get(&r.symbol).map_or("-", String::as_str),
        );
    }
    let d = &report.diagnostics;
    let _ = writeln!(
        out,
        "processed={} passed={} shortlisted={} skipped_insufficient_history={} skipped_no_data={}",
        d.processed,
        report.passed_count(),
        report.shortlist.len(),
        d.skipped_insufficient_history,
        d.skipped_no_data,
    );
    out
}

pub fn format_backtest(output: &PipelineOutput, summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<8} {:<10} {:>10} {:<10} {:>10} {:>10}",
        "symbol", "outcome", "buy_date", "entry", "trigger", "peak_pct", "eval_pct"
    );
    let shortlisted: Vec<&str> = output.report.shortlist.iter().map(|r| r.symbol.as_str()).collect();
    for symbol in shortlisted {
        let Some(o) = output.outcomes.iter().find(|o| o.symbol == symbol) else {
            continue;
        };
        let _ = writeln!(
            out,
            "{:<12} {:<8} {:<10} {:>10} {:<10} {:>10} {:>10}",
            o.symbol,
            o.label.to_string(),
            o.buy_date.map_or_else(|| "-".to_string(), |d| d.to_string()),
            fmt_opt(o.entry_price),
            o.trigger_date.map_or_else(|| "-".to_string(), |d| d.to_string()),
            fmt_opt(o.peak_return_pct),
            fmt_opt(o.evaluated_return_pct),
        );
    }
    for (name, stats) in [("shortlist", &summary.shortlist), ("universe", &summary.universe)] {
        let _ = writeln!(
            out,
            "{name}: success={} fail={} no_data={} win_rate={}",
            stats.success,
            stats.fail,
            stats.no_data,
            fmt_rate(stats),
        );
    }
    out
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    info!(path = %config_path.display(), "validating config");
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let settings = match validate_config(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    println!("profile: {}", settings.screen.profile);
    println!("data dir: {}", settings.data.dir.display());
    println!(
        "minimum history: {} bars, lookback: {} days",
        settings.indicators.min_history(),
        settings.screen.lookback_days
    );
    println!(
        "backtest: horizon {} ({:?}), success >= {}%, entry {:?}",
        settings.backtest.horizon_days,
        settings.backtest.window,
        settings.backtest.success_threshold_pct,
        settings.backtest.entry
    );
    println!("configuration is valid");
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf, code: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let settings = match Settings::from_config(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let data_port = build_data_port(&settings);

    let codes = match code {
        Some(list) => match parse_codes(list, &settings.data.symbol_suffix) {
            Ok(c) => c,
            Err(e) => return fail(ArascanError::invalid("info", "code", e.to_string())),
        },
        None => match resolve_universe(&settings, data_port.as_ref()) {
            Ok(listing) => listing.codes,
            Err(e) => return fail(e),
        },
    };

    for c in &codes {
        match data_port.get_data_range(c) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} bars, {} to {}", c, count, min_date, max_date);
            }
            Ok(None) => {
                eprintln!("{}: no data found", c);
            }
            Err(e) => {
                eprintln!("error querying {}: {}", c, e);
            }
        }
    }
    ExitCode::SUCCESS
}
