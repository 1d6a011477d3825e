//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::info;
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::chart_svg::{ChartOptions, SvgChartWriter};
use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_export::{read_signal_columns, to_json_string, JsonExporter};
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    parse_bool, parse_capital, parse_date, validate_backtest_config, validate_date_range,
    validate_strategy_config, validate_ticker, DEFAULT_INITIAL_CAPITAL, DEFAULT_LONG_WINDOW,
    DEFAULT_SHORT_WINDOW, DEFAULT_TRADE_COST,
};
use crate::domain::error::CrosstraderError;
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::{simulate, SimulationConfig};
use crate::domain::signal::SignalConfig;
use crate::domain::table::{format_date, trade_bars_from_columns, PortfolioColumns};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::result_port::ResultSink;

#[derive(Parser, Debug)]
#[command(name = "crosstrader", about = "Moving-average crossover backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest from an INI config
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,
        /// YYYY-MM-DD, exclusive
        #[arg(long)]
        end: Option<String>,
        /// Accepts "$1,000" style amounts
        #[arg(long)]
        capital: Option<String>,
        #[arg(long)]
        trade_cost: Option<f64>,
        /// Skip the classifier overlay
        #[arg(long)]
        no_ml: bool,
    },
    /// Replay an exported signals table through the simulator
    Simulate {
        #[arg(short, long)]
        signals: PathBuf,
        #[arg(long, default_value = "10000")]
        capital: String,
        #[arg(long, default_value_t = DEFAULT_TRADE_COST)]
        trade_cost: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a config file without running
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Prompt for the run parameters on stdin
    Interactive {
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
        #[arg(long, default_value = "results.json")]
        json_path: PathBuf,
        #[arg(long)]
        chart: Option<PathBuf>,
        /// Portfolio table target, default results.db; ignored without the
        /// `sqlite` feature
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            ticker,
            start,
            end,
            capital,
            trade_cost,
            no_ml,
        } => {
            let mut overrides = ConfigOverrides::default();
            overrides.set_opt("backtest", "ticker", ticker);
            overrides.set_opt("backtest", "start_date", start);
            overrides.set_opt("backtest", "end_date", end);
            overrides.set_opt("backtest", "initial_capital", capital);
            overrides.set_opt("backtest", "trade_cost", trade_cost.map(|c| c.to_string()));
            if no_ml {
                overrides.set("strategy", "use_ml", "false");
            }
            run_backtest_command(&config, overrides)
        }
        Command::Simulate {
            signals,
            capital,
            trade_cost,
            output,
        } => run_simulate(&signals, &capital, trade_cost, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Interactive {
            data_dir,
            json_path,
            chart,
            db_path,
        } => run_interactive(&data_dir, &json_path, chart.as_deref(), db_path.as_deref()),
    }
}

fn fail(err: CrosstraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// Command-line values layered over a config file.
#[derive(Default)]
pub struct ConfigOverrides {
    values: HashMap<(String, String), String>,
}

impl ConfigOverrides {
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.values
            .insert((section.to_string(), key.to_string()), value.to_string());
    }

    fn set_opt(&mut self, section: &str, key: &str, value: Option<String>) {
        if let Some(v) = value {
            self.set(section, key, &v);
        }
    }

    pub fn over<'a>(&'a self, base: &'a dyn ConfigPort) -> LayeredConfig<'a> {
        LayeredConfig {
            overrides: self,
            base,
        }
    }
}

pub struct LayeredConfig<'a> {
    overrides: &'a ConfigOverrides,
    base: &'a dyn ConfigPort,
}

impl LayeredConfig<'_> {
    fn lookup(&self, section: &str, key: &str) -> Option<&String> {
        self.overrides
            .values
            .get(&(section.to_string(), key.to_string()))
    }
}

impl ConfigPort for LayeredConfig<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.lookup(section, key)
            .cloned()
            .or_else(|| self.base.get_string(section, key))
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.lookup(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.base.get_int(section, key, default),
        }
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.lookup(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.base.get_double(section, key, default),
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.lookup(section, key) {
            Some(v) => parse_bool(v).unwrap_or(default),
            None => self.base.get_bool(section, key, default),
        }
    }
}

/// Build a [`BacktestConfig`] from already-validated config values.
pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, CrosstraderError> {
    let missing = |key: &str| CrosstraderError::ConfigMissing {
        section: "backtest".into(),
        key: key.into(),
    };

    let ticker = validate_ticker(
        &config
            .get_string("backtest", "ticker")
            .ok_or_else(|| missing("ticker"))?,
    )?;
    let start_date = parse_date(
        &config
            .get_string("backtest", "start_date")
            .ok_or_else(|| missing("start_date"))?,
        "start_date",
    )?;
    let end_date = parse_date(
        &config
            .get_string("backtest", "end_date")
            .ok_or_else(|| missing("end_date"))?,
        "end_date",
    )?;
    let initial_capital = match config.get_string("backtest", "initial_capital") {
        Some(raw) => parse_capital(&raw)?,
        None => DEFAULT_INITIAL_CAPITAL,
    };

    Ok(BacktestConfig {
        ticker,
        start_date,
        end_date,
        signal: SignalConfig {
            short_window: config.get_int("strategy", "short_window", DEFAULT_SHORT_WINDOW) as usize,
            long_window: config.get_int("strategy", "long_window", DEFAULT_LONG_WINDOW) as usize,
            use_ml: config.get_bool("strategy", "use_ml", true),
        },
        simulation: SimulationConfig {
            initial_capital,
            trade_cost: config.get_double("backtest", "trade_cost", DEFAULT_TRADE_COST),
        },
        risk_free_rate: config.get_double("backtest", "risk_free_rate", 0.0),
    })
}

/// The result sinks a config asks for, in write order.
pub fn build_sinks(config: &dyn ConfigPort) -> Result<Vec<Box<dyn ResultSink>>, CrosstraderError> {
    let mut sinks: Vec<Box<dyn ResultSink>> = Vec::new();

    let json_path = config
        .get_string("output", "json_path")
        .unwrap_or_else(|| "results.json".to_string());
    sinks.push(Box::new(JsonExporter::new(PathBuf::from(json_path))));

    if let Some(chart_path) = config.get_string("output", "chart_path") {
        let options = ChartOptions {
            show_ml: config.get_bool("output", "show_ml", true),
            log_scale: config.get_bool("output", "log_scale", false),
        };
        sinks.push(Box::new(SvgChartWriter::new(
            PathBuf::from(chart_path),
            options,
        )));
    }

    sinks.extend(sqlite_sink(config)?);

    Ok(sinks)
}

/// Fetch, run, summarize and hand the result to every sink.
pub fn run_pipeline(
    config: &BacktestConfig,
    data: &dyn PriceDataPort,
    sinks: &[Box<dyn ResultSink>],
) -> Result<BacktestResult, CrosstraderError> {
    info!(
        "fetching {} from {} to {}",
        config.ticker, config.start_date, config.end_date
    );
    let prices = data.fetch_closes(&config.ticker, config.start_date, config.end_date)?;
    let result = run_backtest(&prices, config)?;

    print_summary(&result);

    for sink in sinks {
        info!("writing {} output", sink.name());
        sink.write(&result)?;
    }
    Ok(result)
}

fn print_metrics(label: &str, metrics: &Metrics) {
    eprintln!("\n=== {label} ===");
    eprintln!("Final Value:      ${:.2}", metrics.final_value);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annual Return:    {:.2}%", metrics.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!(
        "Max Drawdown:     -{:.1}% ({} bars)",
        metrics.max_drawdown * 100.0,
        metrics.max_drawdown_duration
    );
}

pub fn print_summary(result: &BacktestResult) {
    let m = &result.strategy_metrics;
    print_metrics(&format!("Strategy ({})", result.ticker), m);
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    if m.total_trades > 0 {
        eprintln!("Avg Holding:      {:.1} days", m.avg_holding_days);
    }
    print_metrics("Buy & Hold", &result.benchmark_metrics);
}

fn validate_all(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    validate_backtest_config(config)?;
    validate_strategy_config(config)
}

fn run_backtest_command(config_path: &Path, overrides: ConfigOverrides) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let file = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    run_configured(&overrides.over(&file))
}

/// Validate, build the run and its sinks, then execute against CSV data.
fn run_configured(config: &dyn ConfigPort) -> ExitCode {
    if let Err(e) = validate_all(config) {
        return fail(e);
    }

    let bt_config = match build_backtest_config(config) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let sinks = match build_sinks(config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let csv_dir = config
        .get_string("data", "csv_dir")
        .unwrap_or_else(|| ".".to_string());
    let data = CsvPriceAdapter::new(PathBuf::from(csv_dir));

    match run_pipeline(&bt_config, &data, &sinks) {
        Ok(_) => {
            eprintln!("\nBacktest completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&config) {
        return fail(e);
    }
    match build_backtest_config(&config) {
        Ok(c) => {
            eprintln!("Config validated successfully");
            eprintln!(
                "  {} {}..{} capital ${:.2} fee ${:.2}",
                c.ticker,
                c.start_date,
                c.end_date,
                c.simulation.initial_capital,
                c.simulation.trade_cost
            );
            eprintln!(
                "  windows {}/{} ml {}",
                c.signal.short_window, c.signal.long_window, c.signal.use_ml
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_simulate(
    signals_path: &Path,
    capital: &str,
    trade_cost: f64,
    output: Option<&Path>,
) -> ExitCode {
    match simulate_from_file(signals_path, capital, trade_cost, output) {
        Ok(columns) => {
            if let Some(total) = columns.total.last() {
                eprintln!("Replayed {} bars, final value ${:.2}", columns.total.len(), total);
            } else {
                eprintln!("Replayed 0 bars");
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub fn simulate_from_file(
    signals_path: &Path,
    capital: &str,
    trade_cost: f64,
    output: Option<&Path>,
) -> Result<PortfolioColumns, CrosstraderError> {
    let initial_capital = parse_capital(capital)?;
    if trade_cost.is_nan() || trade_cost < 0.0 {
        return Err(CrosstraderError::input(
            "trade_cost",
            "must be non-negative",
        ));
    }

    let columns = read_signal_columns(signals_path)?;
    let bars = trade_bars_from_columns(&columns)?;
    let result = simulate(
        &bars,
        &SimulationConfig {
            initial_capital,
            trade_cost,
        },
    );
    let table = PortfolioColumns::from(result.records.as_slice());

    if let Some(path) = output {
        fs::write(path, to_json_string(&serde_json::json!({ "portfolio": &table }))?)?;
        info!("portfolio written to {}", path.display());
    }
    Ok(table)
}

/// Answers collected by the interactive prompts.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractiveAnswers {
    pub ticker: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub initial_capital: f64,
    pub show_ml: bool,
    pub log_scale: bool,
}

impl InteractiveAnswers {
    /// Express the answers as config values so the interactive run takes
    /// the same path as `backtest`.
    pub fn to_overrides(
        &self,
        data_dir: &Path,
        json_path: &Path,
        chart: Option<&Path>,
        db_path: Option<&Path>,
    ) -> ConfigOverrides {
        let path = |p: &Path| p.to_string_lossy().into_owned();
        let flag = |b: bool| if b { "true" } else { "false" };

        let mut overrides = ConfigOverrides::default();
        overrides.set("backtest", "ticker", &self.ticker);
        overrides.set("backtest", "start_date", &format_date(self.start_date));
        overrides.set("backtest", "end_date", &format_date(self.end_date));
        overrides.set(
            "backtest",
            "initial_capital",
            &self.initial_capital.to_string(),
        );
        overrides.set("strategy", "use_ml", flag(self.show_ml));
        overrides.set("data", "csv_dir", &path(data_dir));
        overrides.set("output", "json_path", &path(json_path));
        overrides.set_opt("output", "chart_path", chart.map(path));
        overrides.set("output", "show_ml", flag(self.show_ml));
        overrides.set("output", "log_scale", flag(self.log_scale));
        overrides.set_opt("sqlite", "path", db_path.map(path));
        overrides
    }
}

fn read_answer<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> Result<String, CrosstraderError> {
    write!(output, "{prompt}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "unexpected end of input",
        )
        .into());
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Ask until `parse` accepts an answer.
fn ask_until<R: BufRead, W: Write, T>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    retry_message: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, CrosstraderError> {
    loop {
        let answer = read_answer(input, output, prompt)?;
        match parse(&answer) {
            Some(value) => return Ok(value),
            None => writeln!(output, "{retry_message}")?,
        }
    }
}

/// Ticker and date errors end the session; capital and yes/no prompts
/// repeat until they get a usable answer.
pub fn prompt_answers<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<InteractiveAnswers, CrosstraderError> {
    let ticker = validate_ticker(&read_answer(
        input,
        output,
        "Enter stock ticker (e.g. AAPL): ",
    )?)?;
    let start_raw = read_answer(input, output, "Enter start date (YYYY-MM-DD): ")?;
    let end_raw = read_answer(input, output, "Enter end date (YYYY-MM-DD): ")?;
    let start_date = parse_date(&start_raw, "start_date")?;
    let end_date = parse_date(&end_raw, "end_date")?;
    validate_date_range(start_date, end_date)?;

    let initial_capital = loop {
        let raw = read_answer(input, output, "Enter initial capital (e.g. 1000): ")?;
        match parse_capital(&raw) {
            Ok(v) => break v,
            Err(CrosstraderError::InputValidation { reason, .. }) => {
                writeln!(output, "Please {reason}.")?
            }
            Err(e) => return Err(e),
        }
    };

    let show_ml = ask_until(
        input,
        output,
        "Show ML signals? (True/False): ",
        "Please enter True or False.",
        parse_bool,
    )?;
    let log_scale = ask_until(
        input,
        output,
        "Use Log Scale for Performance Chart? (True/False): ",
        "Please enter True or False.",
        parse_bool,
    )?;

    Ok(InteractiveAnswers {
        ticker,
        start_date,
        end_date,
        initial_capital,
        show_ml,
        log_scale,
    })
}

/// Run [`prompt_answers`] until it succeeds. Input errors restart the
/// session from the ticker prompt; I/O errors (including end of input) end it.
pub fn prompt_session<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<InteractiveAnswers, CrosstraderError> {
    loop {
        match prompt_answers(input, output) {
            Err(e @ CrosstraderError::InputValidation { .. }) => {
                writeln!(output, "\nError: {e}\nPlease try again.")?
            }
            other => return other,
        }
    }
}

fn run_interactive(
    data_dir: &Path,
    json_path: &Path,
    chart: Option<&Path>,
    db_path: Option<&Path>,
) -> ExitCode {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stderr();

    let answers = match prompt_session(&mut input, &mut output) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    let overrides = answers.to_overrides(data_dir, json_path, chart, db_path);
    run_configured(&overrides.over(&FileConfigAdapter::empty()))
}

#[cfg(feature = "sqlite")]
fn sqlite_sink(config: &dyn ConfigPort) -> Result<Option<Box<dyn ResultSink>>, CrosstraderError> {
    let store = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
    Ok(Some(Box::new(store)))
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_sink(_config: &dyn ConfigPort) -> Result<Option<Box<dyn ResultSink>>, CrosstraderError> {
    Ok(None)
}
