use std::path::PathBuf;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use pulse_config::{CountingStrategy, PulseConfig};
use pulse_engine::format::thousands;
use pulse_engine::{ConsoleSink, ReplayRuntime};
use pulse_telemetry::EventLogger;

#[derive(Parser)]
#[command(name = "pulse", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay one recorded day at wall-clock pace
    Run(RunArgs),
    /// Fast-forward one recorded day and print its state hash
    Sweep(SweepArgs),
    /// List the dates available in the extract
    Dates(SourceArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// CSV extract of completed procedures
    #[arg(short, long)]
    pub data: Option<PathBuf>,
    /// Configuration file; defaults to config/pulse.yaml and PULSE_* variables
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StrategyArg {
    Cursor,
    Stateless,
}

impl From<StrategyArg> for CountingStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Cursor => CountingStrategy::Cursor,
            StrategyArg::Stateless => CountingStrategy::Stateless,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Day to replay (YYYY-MM-DD); defaults to the earliest day in the data
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Historical count added to every total
    #[arg(long)]
    pub baseline: Option<u64>,
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,
    /// Write the cumulative series to this CSV file when the run ends
    #[arg(long)]
    pub series_out: Option<PathBuf>,
    /// Stream each counted event, at its display time, to this CSV file
    #[arg(long)]
    pub arrivals_out: Option<PathBuf>,
    /// Add a seeded sub-second offset to display times
    #[arg(long)]
    pub jitter_seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub replay: ReplayArgs,
    /// Simulated seconds per wall-clock second
    #[arg(long)]
    pub speed: Option<f64>,
    /// Stop after this many ticks
    #[arg(long)]
    pub max_ticks: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub replay: ReplayArgs,
    /// Simulated seconds per step
    #[arg(long)]
    pub step: Option<u64>,
    /// Fail (and write a bug report) unless the state hash matches
    #[arg(long)]
    pub validate_hash: Option<String>,
    /// Print every step, not just the final snapshot
    #[arg(long)]
    pub show_ticks: bool,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_live(args).await,
        Commands::Sweep(args) => run_sweep(args),
        Commands::Dates(args) => list_dates(args),
    }
}

fn load_config(source: &SourceArgs) -> anyhow::Result<PulseConfig> {
    let mut config = match &source.config {
        Some(path) => PulseConfig::load_from_path(path),
        None => PulseConfig::load(),
    }
    .context("failed to load configuration")?;

    if let Some(data) = &source.data {
        config.ingest.data_path = Some(data.clone());
    }
    EventLogger::init(&config.telemetry.log_level)
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))?;
    Ok(config)
}

fn apply_replay_args(config: &mut PulseConfig, args: &ReplayArgs) {
    if let Some(date) = args.date {
        config.replay.replay_date = Some(date);
    }
    if let Some(baseline) = args.baseline {
        config.replay.baseline_offset = baseline;
    }
    if let Some(strategy) = args.strategy {
        config.replay.strategy = strategy.into();
    }
    if let Some(path) = &args.series_out {
        config.display.series_out = Some(path.clone());
    }
    if let Some(path) = &args.arrivals_out {
        config.display.arrivals_out = Some(path.clone());
    }
    if let Some(seed) = args.jitter_seed {
        config.ingest.display_jitter = true;
        config.ingest.jitter_seed = Some(seed);
    }
}

fn dump_metrics(runtime: &ReplayRuntime) -> anyhow::Result<()> {
    if runtime.config().telemetry.dump_metrics {
        print!("{}", runtime.metrics().gather_metrics()?);
    }
    Ok(())
}

async fn run_live(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.replay.source)?;
    apply_replay_args(&mut config, &args.replay);
    if let Some(speed) = args.speed {
        config.replay.speed_factor = speed;
    }
    if let Some(max_ticks) = args.max_ticks {
        config.replay.max_ticks = Some(max_ticks);
    }
    let config = config.validated()?;

    let console = ConsoleSink::stdout(config.display.clone());
    let mut runtime = ReplayRuntime::new(config)?.with_sink(console);
    let (events, _) = runtime.load_events()?;
    let clock = runtime.system_clock()?;

    let summary = runtime.run_live(&events, &clock).await?;
    info!(ticks = summary.ticks, reason = ?summary.stopped_by, "Replay finished");
    dump_metrics(&runtime)
}

fn run_sweep(args: SweepArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.replay.source)?;
    apply_replay_args(&mut config, &args.replay);
    if let Some(step) = args.step {
        config.replay.sweep_step_seconds = step;
    }
    let config = config.validated()?;

    let mut runtime = ReplayRuntime::new(config.clone())?;
    if args.show_ticks {
        runtime = runtime.with_sink(ConsoleSink::stdout(config.display.clone()));
    }
    let (events, _) = runtime.load_events()?;
    let outcome = runtime.run_sweep(&events, args.validate_hash.as_deref())?;

    let snapshot = &outcome.final_snapshot;
    println!("Replay date:  {}", snapshot.instant.date());
    println!("Last event:   {}", snapshot.instant.time());
    println!("Ticks:        {}", thousands(outcome.ticks));
    println!("Today:        {}", thousands(snapshot.today_count));
    println!("All-time:     {}", thousands(snapshot.total_count));
    for (category, count) in &snapshot.category_counts {
        println!("  {:<10} {:>9}", category.as_ref(), thousands(*count));
    }
    println!("State hash:   {}", outcome.state_hash);
    dump_metrics(&runtime)
}

fn list_dates(args: SourceArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?.validated()?;
    let runtime = ReplayRuntime::new(config)?;
    for date in runtime.list_dates()? {
        println!("{}  {:>9}", date.date, thousands(date.count as u64));
    }
    Ok(())
}
