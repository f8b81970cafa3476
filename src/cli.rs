//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_feed::CsvFeed;
use crate::adapters::synthetic_feed::SyntheticFeed;
use crate::domain::ast::EventKind;
use crate::domain::candle::Candle;
use crate::domain::error::AlgoScriptError;
use crate::domain::market::DEFAULT_CAPACITY;
use crate::domain::session::Session;
use crate::domain::trading::{ActionRecord, TradingState};
use crate::domain::validate::{parse_source, validate};
use crate::ports::feed_port::CandleFeed;
use crate::EXAMPLE_SCRIPT;

#[derive(Parser, Debug)]
#[command(name = "algoscript", about = "English-like trading strategy language")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a script without executing it
    Validate {
        script: PathBuf,
        /// Emit the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a script over a candle feed
    Run {
        script: PathBuf,
        /// CSV candle file (timestamp,open,high,low,close,volume)
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Generate this many synthetic candles instead of reading a file
        #[arg(long)]
        synthetic: Option<usize>,
        /// Seed for the synthetic feed
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Starting account balance
        #[arg(long, default_value_t = 10_000.0)]
        balance: f64,
        /// Candle window size
        #[arg(long, default_value_t = DEFAULT_CAPACITY)]
        capacity: usize,
        /// Event(s) to dispatch after each candle; defaults to NEW_CANDLE
        #[arg(long, value_name = "EVENT")]
        event: Vec<EventKind>,
        /// Emit a run report as JSON instead of streaming output
        #[arg(long)]
        json: bool,
    },
    /// Print a sample script
    Example,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Validate { script, json } => run_validate(&script, json),
        Command::Run {
            script,
            data,
            synthetic,
            seed,
            balance,
            capacity,
            event,
            json,
        } => run_script(
            &script,
            data.as_ref(),
            synthetic,
            seed,
            balance,
            capacity,
            &event,
            json,
        ),
        Command::Example => {
            println!("{EXAMPLE_SCRIPT}");
            ExitCode::SUCCESS
        }
    }
}

fn read_script(path: &PathBuf) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|e| {
        let err = AlgoScriptError::Io(e);
        eprintln!("error: failed to read {}: {err}", path.display());
        ExitCode::from(&err)
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ExitCode> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            Ok(())
        }
        Err(e) => {
            eprintln!("error: failed to serialize output: {e}");
            Err(ExitCode::from(1))
        }
    }
}

fn run_validate(script: &PathBuf, json: bool) -> ExitCode {
    let source = match read_script(script) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let result = validate(&source);
    if json {
        if let Err(code) = print_json(&result) {
            return code;
        }
    } else {
        for diagnostic in &result.errors {
            eprintln!("error: {}", diagnostic.message);
        }
        for warning in &result.warnings {
            eprintln!("warning: {warning}");
        }
        if result.valid {
            eprintln!("{}: script is valid", script.display());
        }
    }

    if result.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

/// Everything one `run` invocation produced, for `--json` output.
#[derive(Debug, Serialize)]
struct RunReport {
    symbol: String,
    timeframe: String,
    candles: usize,
    dispatched: usize,
    skipped: usize,
    logs: Vec<String>,
    actions: Vec<ActionRecord>,
    trading_state: TradingState,
}

#[allow(clippy::too_many_arguments)]
fn run_script(
    script: &PathBuf,
    data: Option<&PathBuf>,
    synthetic: Option<usize>,
    seed: u64,
    balance: f64,
    capacity: usize,
    events: &[EventKind],
    json: bool,
) -> ExitCode {
    let source = match read_script(script) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let parsed = match parse_source(&source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    for warning in &parsed.warnings {
        eprintln!("warning: {warning}");
    }

    let candles = match load_candles(data, synthetic, seed) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if candles.is_empty() {
        eprintln!("error: candle feed is empty");
        return ExitCode::from(4);
    }

    let events: Vec<EventKind> = if events.is_empty() {
        vec![EventKind::NewCandle]
    } else {
        events.to_vec()
    };

    eprintln!(
        "Running {} on {} candles ({} / {})",
        script.display(),
        candles.len(),
        parsed.strategy.symbol,
        parsed.strategy.timeframe,
    );

    let candle_count = candles.len();
    let mut session = Session::with_capacity(parsed.strategy, balance, capacity);
    let mut dispatched = 0usize;
    let mut skipped = 0usize;
    let mut logs = Vec::new();
    let mut actions = Vec::new();

    for candle in candles {
        if let Err(e) = session.ingest(candle) {
            let err = AlgoScriptError::Market(e);
            eprintln!("error: {err}");
            return ExitCode::from(&err);
        }
        for event in &events {
            let result = session.dispatch(*event);
            dispatched += 1;
            if !result.success {
                // Indicators still warming up; later ticks may succeed.
                skipped += 1;
                continue;
            }
            if !json {
                for log in &result.logs {
                    println!("{log}");
                }
                for action in &result.actions {
                    println!("action: {action}");
                }
            }
            logs.extend(result.logs);
            actions.extend(result.actions);
        }
    }

    if json {
        let report = RunReport {
            symbol: session.strategy().symbol.clone(),
            timeframe: session.strategy().timeframe.clone(),
            candles: candle_count,
            dispatched,
            skipped,
            logs,
            actions,
            trading_state: session.trading().clone(),
        };
        return match print_json(&report) {
            Ok(()) => ExitCode::SUCCESS,
            Err(code) => code,
        };
    }

    let state = session.trading();
    eprintln!("\n=== Session Summary ===");
    eprintln!("Events dispatched: {dispatched} ({skipped} awaiting history)");
    eprintln!("Actions taken:     {}", actions.len());
    eprintln!("Final balance:     {:.2}", state.balance);
    eprintln!("Open position:     {:.6}", state.position_size);
    if let Some(entry) = state.entry_price {
        eprintln!("Entry price:       {entry:.2}");
    }
    ExitCode::SUCCESS
}

fn load_candles(
    data: Option<&PathBuf>,
    synthetic: Option<usize>,
    seed: u64,
) -> Result<Vec<Candle>, ExitCode> {
    let result = match data {
        Some(path) => CsvFeed::new(path).candles(),
        None => SyntheticFeed::new(synthetic.unwrap_or(100), seed).candles(),
    };
    result.map_err(|e| {
        let err = AlgoScriptError::Feed(e);
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}
