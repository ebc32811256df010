//! QuantKernel CLI: run pipelines, batches, and ticker lookups.
//!
//! Commands:
//! - `run`: fetch one ticker, compute indicators and strategies, print a summary
//! - `batch`: run the same pipeline over a ticker list on a background worker
//! - `tickers`: resolve a slice of a provider's ticker universe
//! - `components`: list indicator and strategy kinds with their parameters
//!
//! Credentials come from the environment (`UPSTOX_ACCESS_TOKEN`,
//! `DHAN_CLIENT_ID`, `DHAN_SECRET_KEY`). Logging is controlled by `RUST_LOG`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quantkernel_core::components::ParamSpec;
use quantkernel_core::config::PipelineConfig;
use quantkernel_core::data::{DataManager, FetchMode, FetchParamsUpdate, Provider, TickerUniverse, Unit};
use quantkernel_core::descriptor::{ComponentConfig, ParamValue};
use quantkernel_core::domain::{Signal, Table};
use quantkernel_core::pipeline::{BatchEvent, BatchWorker, Pipeline, PipelineRequest};

#[derive(Parser)]
#[command(
    name = "quantkernel",
    about = "QuantKernel CLI: market data pipelines with indicators and strategy signals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one ticker and run indicators and strategies over it.
    Run {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Ticker to run. Defaults to the first ticker of the universe.
        #[arg(long)]
        ticker: Option<String>,

        /// Write the augmented table here (.csv or .parquet).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the pipeline over a ticker list on a background worker.
    Batch {
        #[command(flatten)]
        pipeline: PipelineArgs,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Write one file per ticker into this directory (as <ticker>.<format>).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Output format for --output-dir: csv or parquet.
        #[arg(long, default_value = "csv")]
        format: String,
    },
    /// Resolve tickers from a provider's universe.
    Tickers {
        #[arg(long, default_value = "yahoo")]
        provider: Provider,

        #[arg(long, default_value = "NSE")]
        exchange: String,

        /// Universe TOML file. Defaults to the built-in universe.
        #[arg(long)]
        universe: Option<PathBuf>,

        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// List registered indicator and strategy kinds.
    Components {
        /// Print as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Options shared by `run` and `batch`. Flags override the config file.
#[derive(Args)]
struct PipelineArgs {
    /// Pipeline TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// yahoo, upstox, dhan or synthetic.
    #[arg(long)]
    provider: Option<Provider>,

    /// historical or intraday.
    #[arg(long)]
    mode: Option<FetchMode>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// minutes, hours, days, weeks, months.
    #[arg(long)]
    unit: Option<Unit>,

    /// Historical candle interval, in units.
    #[arg(long)]
    interval: Option<u32>,

    /// Intraday candle interval, in units.
    #[arg(long)]
    intraday_interval: Option<u32>,

    #[arg(long)]
    exchange: Option<String>,

    /// Universe TOML file. Overrides the config's `universe`.
    #[arg(long)]
    universe: Option<PathBuf>,

    /// Extra indicator, as `kind` or `kind:name=value,...` (repeatable).
    #[arg(long = "indicator", value_parser = parse_component)]
    indicators: Vec<ComponentConfig>,

    /// Extra strategy, as `kind` or `kind:name=value,...` (repeatable).
    #[arg(long = "strategy", value_parser = parse_component)]
    strategies: Vec<ComponentConfig>,
}

#[derive(Args)]
struct SelectionArgs {
    /// Explicit tickers; skips universe resolution.
    #[arg(long, num_args = 1..)]
    tickers: Vec<String>,

    /// First universe index.
    #[arg(long)]
    start: Option<usize>,

    /// End universe index (exclusive).
    #[arg(long)]
    end: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            pipeline,
            ticker,
            output,
        } => run_single_cmd(pipeline, ticker, output),
        Commands::Batch {
            pipeline,
            selection,
            output_dir,
            format,
        } => run_batch_cmd(pipeline, selection, output_dir, &format),
        Commands::Tickers {
            provider,
            exchange,
            universe,
            selection,
        } => run_tickers(provider, &exchange, universe.as_deref(), &selection),
        Commands::Components { json } => run_components(json),
    }
}

// ── Config assembly ──────────────────────────────────────────────────

/// Parse `kind` or `kind:name=value,name=value`.
fn parse_component(s: &str) -> Result<ComponentConfig, String> {
    let (kind, rest) = s.split_once(':').unwrap_or((s, ""));
    if kind.trim().is_empty() {
        return Err(format!("missing component type in '{s}'"));
    }
    let mut config = ComponentConfig::new(kind.trim());
    for pair in rest.split(',').filter(|p| !p.trim().is_empty()) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got '{pair}'"))?;
        config = config.with(name.trim(), parse_value(value.trim()));
    }
    Ok(config)
}

fn parse_value(s: &str) -> ParamValue {
    if let Ok(i) = s.parse::<i64>() {
        ParamValue::Int(i)
    } else if let Ok(f) = s.parse::<f64>() {
        ParamValue::Float(f)
    } else {
        ParamValue::Text(s.to_string())
    }
}

fn load_config(args: &PipelineArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let overrides = FetchParamsUpdate {
        provider: args.provider,
        from: args.from,
        to: args.to,
        unit: args.unit,
        interval: args.interval,
        intraday_interval: args.intraday_interval,
        exchange: args.exchange.clone(),
    };
    config.fetch = config.fetch.merged_with(&overrides);
    if args.provider.is_some() {
        config.provider = args.provider;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if args.universe.is_some() {
        config.universe.clone_from(&args.universe);
    }
    config.indicators.extend(args.indicators.iter().cloned());
    config.strategies.extend(args.strategies.iter().cloned());
    Ok(config)
}

fn load_universe(path: Option<&Path>) -> Result<TickerUniverse> {
    Ok(match path {
        Some(path) => TickerUniverse::from_file(path)
            .with_context(|| format!("loading universe {}", path.display()))?,
        None => TickerUniverse::builtin(),
    })
}

/// Build the data manager and apply the request's parameters up front, so
/// ticker resolution sees the final provider and exchange.
fn prepare(config: &PipelineConfig) -> Result<(DataManager, PipelineRequest)> {
    let provider = config.effective_provider().unwrap_or(Provider::Yahoo);
    let universe = load_universe(config.universe.as_deref())?;
    let mut manager = DataManager::with_lookup(provider, universe, |name: &str| std::env::var(name).ok())?;

    let request = config.to_request();
    manager.set_parameters(&request.params)?;
    Ok((manager, request))
}

// ── Commands ─────────────────────────────────────────────────────────

fn run_single_cmd(args: PipelineArgs, ticker: Option<String>, output: Option<PathBuf>) -> Result<()> {
    let config = load_config(&args)?;
    if config.strategies.is_empty() && config.indicators.is_empty() {
        bail!("nothing to compute: add [[strategies]] to the config or pass --strategy");
    }

    let (mut manager, request) = prepare(&config)?;
    let ticker = match ticker {
        Some(t) => t,
        None => config
            .tickers
            .resolve(manager.resolver())
            .into_iter()
            .next()
            .context("no ticker resolved")?,
    };

    let table = Pipeline::new().run_single(&mut manager, &request, &ticker)?;
    print_summary(&table, manager.provider(), request.mode);

    if let Some(path) = output {
        table.write_to(&path)?;
        println!("Table written to: {}", path.display());
    }
    Ok(())
}

fn run_batch_cmd(
    args: PipelineArgs,
    selection: SelectionArgs,
    output_dir: Option<PathBuf>,
    format: &str,
) -> Result<()> {
    if !matches!(format, "csv" | "parquet") {
        bail!("unknown format '{format}'. Valid: csv, parquet");
    }
    let mut config = load_config(&args)?;
    if config.strategies.is_empty() && config.indicators.is_empty() {
        bail!("nothing to compute: add [[strategies]] to the config or pass --strategy");
    }
    apply_selection(&mut config, &selection);

    let (manager, request) = prepare(&config)?;
    let tickers = config.tickers.resolve(manager.resolver());
    if let Some(dir) = &output_dir {
        std::fs::create_dir_all(dir)?;
    }

    println!(
        "Running {} ticker(s) on {} ({})",
        tickers.len(),
        manager.provider(),
        request.mode
    );

    let worker = BatchWorker::spawn(Pipeline::new(), manager, request, tickers)?;
    let mut exit_failed = false;

    for event in worker.events() {
        match event {
            BatchEvent::Started { index, total, ticker } => {
                tracing::debug!(index, total, %ticker, "started");
            }
            BatchEvent::Completed { index, ticker, table } => {
                println!("[{:>3}] {:<24} ok    {:>6} rows  {}", index + 1, ticker, table.len(), signal_line(&table));
                if let Some(dir) = &output_dir {
                    let path = dir.join(format!("{}.{format}", file_stem(&ticker)));
                    table.write_to(&path)?;
                }
            }
            BatchEvent::Failed { index, ticker, error } => {
                println!("[{:>3}] {:<24} FAIL  {error}", index + 1, ticker);
            }
            BatchEvent::Finished(summary) => {
                println!();
                println!(
                    "Done: {} succeeded, {} failed, {} total{}",
                    summary.succeeded,
                    summary.failed,
                    summary.total,
                    if summary.cancelled { " (cancelled)" } else { "" }
                );
                exit_failed = !summary.all_succeeded();
            }
            BatchEvent::Aborted { error } => {
                bail!("batch aborted: {error}");
            }
        }
    }

    if worker.join().is_none() {
        bail!("batch worker panicked");
    }
    if exit_failed {
        std::process::exit(1);
    }
    Ok(())
}

fn run_tickers(provider: Provider, exchange: &str, universe: Option<&Path>, selection: &SelectionArgs) -> Result<()> {
    let universe = load_universe(universe)?;
    let resolver = quantkernel_core::data::TickerResolver::new(universe, provider, exchange);
    let mut config = PipelineConfig::default();
    apply_selection(&mut config, selection);

    for ticker in config.tickers.resolve(&resolver) {
        println!("{ticker}");
    }
    Ok(())
}

fn run_components(json: bool) -> Result<()> {
    let pipeline = Pipeline::new();
    let indicators: Vec<_> = pipeline.indicator_factory().kinds().collect();
    let strategies: Vec<_> = pipeline.strategy_factory().kinds().collect();

    if json {
        let describe = |entries: &[(&str, &[ParamSpec])]| -> Vec<serde_json::Value> {
            entries
                .iter()
                .map(|(kind, schema)| serde_json::json!({ "type": kind, "params": schema }))
                .collect()
        };
        let out = serde_json::json!({
            "indicators": describe(&indicators),
            "strategies": describe(&strategies),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (title, entries) in [("Indicators", &indicators), ("Strategies", &strategies)] {
        println!("{title}:");
        for (kind, schema) in entries.iter() {
            let params: Vec<String> = schema
                .iter()
                .map(|p| format!("{}={} ({:?})", p.name, p.default, p.kind))
                .collect();
            println!("  {kind:<20} {}", params.join(", "));
        }
        println!();
    }
    Ok(())
}

// ── Output helpers ───────────────────────────────────────────────────

fn apply_selection(config: &mut PipelineConfig, selection: &SelectionArgs) {
    if !selection.tickers.is_empty() {
        config.tickers.symbols.clone_from(&selection.tickers);
    }
    if let Some(start) = selection.start {
        config.tickers.start = start;
    }
    if selection.end.is_some() {
        config.tickers.end = selection.end;
    }
}

/// Instrument keys contain `|`, which is not filename-safe everywhere.
fn file_stem(ticker: &str) -> String {
    ticker.replace(['|', '/', '\\'], "_")
}

fn signal_counts(signals: &[Signal]) -> (usize, usize) {
    signals.iter().fold((0, 0), |(buy, sell), s| match s {
        Signal::Buy => (buy + 1, sell),
        Signal::Sell => (buy, sell + 1),
        Signal::Hold => (buy, sell),
    })
}

fn signal_line(table: &Table) -> String {
    table
        .derived_column_names()
        .filter_map(|name| table.signals(name).map(|s| (name, signal_counts(s))))
        .map(|(name, (buy, sell))| format!("{name}: {buy}B/{sell}S"))
        .collect::<Vec<_>>()
        .join("  ")
}

fn print_summary(table: &Table, provider: Provider, mode: FetchMode) {
    println!();
    println!("=== Pipeline Result ===");
    println!("Ticker:         {}", table.symbol());
    println!("Provider:       {provider} ({mode})");
    println!("Rows:           {}", table.len());
    if let (Some(first), Some(last)) = (table.timestamps().first(), table.timestamps().last()) {
        println!("Period:         {first} to {last}");
    }
    if table.is_empty() {
        println!();
        println!("Provider returned no data for this range.");
        println!();
        return;
    }

    println!();
    println!("--- Indicators (last row) ---");
    let last = table.len() - 1;
    for name in table.derived_column_names() {
        if let Some(values) = table.numeric(name) {
            println!("{name:<24} {:>12.4}", values[last]);
        }
    }

    println!();
    println!("--- Signals ---");
    for name in table.derived_column_names() {
        if let Some(signals) = table.signals(name) {
            let (buy, sell) = signal_counts(signals);
            let latest = signals
                .iter()
                .zip(table.timestamps())
                .rev()
                .find(|(s, _)| !s.is_hold())
                .map(|(s, ts)| format!("{s} at {ts}"))
                .unwrap_or_else(|| "none".into());
            println!("{name:<24} {buy:>4} BUY {sell:>4} SELL   latest: {latest}");
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_flag_parses_params() {
        let c = parse_component("ma_crossover:fast=5,slow=20").unwrap();
        assert_eq!(c.component_type, "ma_crossover");
        assert_eq!(c.params["fast"], ParamValue::Int(5));

        let c = parse_component("mcginley_breakout:k=0.5,source=high").unwrap();
        assert_eq!(c.params["k"], ParamValue::Float(0.5));
        assert_eq!(c.params["source"], ParamValue::Text("high".into()));

        assert!(parse_component("day_range_pct").unwrap().params.is_empty());
        assert!(parse_component("ma:period").is_err());
        assert!(parse_component(":x=1").is_err());
    }

    #[test]
    fn flags_override_config() {
        let args = PipelineArgs::try_parse_from_args(&[
            "--provider",
            "synthetic",
            "--from",
            "2024-01-01",
            "--strategy",
            "ma_crossover",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.effective_provider(), Some(Provider::Synthetic));
        assert_eq!(config.fetch.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(config.strategies.len(), 1);
    }

    #[test]
    fn ticker_file_stems_are_safe() {
        assert_eq!(file_stem("NSE_EQ|INE848E01016"), "NSE_EQ_INE848E01016");
    }

    impl PipelineArgs {
        fn try_parse_from_args(args: &[&str]) -> Self {
            #[derive(Parser)]
            struct Wrapper {
                #[command(flatten)]
                args: PipelineArgs,
            }
            let argv = std::iter::once("quantkernel").chain(args.iter().copied());
            Wrapper::try_parse_from(argv).unwrap().args
        }
    }
}
