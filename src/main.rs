use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use brc_stats::config::{default_workers, DEFAULT_BATCH_SIZE};
use brc_stats::{Config, MalformedPolicy, ParserMode, Rounding, Strategy};

/// Per-key min, mean and max over a `key;value` file
#[derive(Parser, Debug)]
#[command(name = "brc-stats", version, about, long_about = None)]
struct Cli {
    /// Input file, one `key;value` record per line
    path: PathBuf,

    /// Number of workers (default: available parallelism)
    #[arg(short, long, env = "BRC_WORKERS")]
    workers: Option<usize>,

    /// How work is split between threads
    #[arg(long, value_enum, default_value_t = Strategy::Ranges)]
    strategy: Strategy,

    /// Decimal parser for the value field
    #[arg(long, value_enum, default_value_t = ParserMode::BestEffort)]
    parser: ParserMode,

    /// What to do with lines that are not `key;value`
    #[arg(long, value_enum, default_value_t = MalformedPolicy::Abort)]
    on_malformed: MalformedPolicy,

    /// Rounding rule for the mean
    #[arg(long, value_enum, default_value_t = Rounding::HalfAwayFromZero)]
    rounding: Rounding,

    /// Records per batch with `--strategy batched`
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose >= 2)
        .with_thread_names(verbose >= 3)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::new()
        .with_workers(cli.workers.unwrap_or_else(default_workers))
        .with_strategy(cli.strategy)
        .with_parser(cli.parser)
        .with_malformed_policy(cli.on_malformed)
        .with_rounding(cli.rounding)
        .with_batch_size(cli.batch_size);

    let stdout = io::stdout().lock();
    let summary = brc_stats::process_file(&cli.path, &config, BufWriter::new(stdout))
        .with_context(|| format!("failed to process {}", cli.path.display()))?;
    summary.log();
    Ok(())
}
