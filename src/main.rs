use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use jemallocator::Jemalloc;
use tracing::warn;

use csv_sieve::processor::{self, memory, parts, report, sequential, RunConfig};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Single-threaded baseline
    Sequential,
    /// Split into temporary part files processed in parallel
    Parts,
    /// Stream into in-memory batches processed by a worker pool
    Memory,
}

#[derive(Parser)]
#[command(
    name = "csv-sieve",
    version,
    about = "Parallel CSV row filtering and column projection"
)]
struct Cli {
    /// Input CSV file
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV file
    #[arg(short, long)]
    output: PathBuf,

    /// Column selection: "*" or a comma-separated list of 1-based column numbers
    #[arg(short, long, default_value = "*")]
    columns: String,

    /// Row filter, e.g. 'age >= 18 AND city = "Roma"'
    #[arg(short, long)]
    filter: Option<String>,

    /// Execution engine
    #[arg(short, long, value_enum, default_value_t = Mode::Memory)]
    mode: Mode,

    /// Worker/part count (defaults to the logical CPU count)
    #[arg(short, long)]
    parts: Option<usize>,

    /// Field separator
    #[arg(long, default_value_t = ',')]
    separator: char,

    /// Lines per in-memory batch
    #[arg(long, default_value_t = processor::DEFAULT_BATCH_LINES)]
    batch_lines: usize,

    /// Directory for the execution-history CSV
    #[arg(long, default_value = "metrics")]
    metrics_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "csv_sieve=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = RunConfig::new(cli.input, cli.output)
        .columns(cli.columns)
        .separator(cli.separator)
        .batch_lines(cli.batch_lines);
    if let Some(filter) = cli.filter {
        config = config.filter(filter);
    }
    if let Some(parts) = cli.parts {
        config = config.parts(parts);
    }

    let run_report = match cli.mode {
        Mode::Sequential => sequential::process_sequential(&config),
        Mode::Parts => parts::process_in_parts(&config),
        Mode::Memory => memory::process_in_memory(&config),
    }
    .context("csv run failed")?;

    run_report.print_summary();
    if let Err(err) = report::append_history(&cli.metrics_dir, &run_report) {
        warn!("could not append execution history: {err}");
    }

    Ok(())
}
