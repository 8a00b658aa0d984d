use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use buildtsi_runner::config::{
    default_concurrency, RunConfig, DEFAULT_DATA_DIR, DEFAULT_INSPECT_BIN,
    DEFAULT_MAX_LOG_FILE_SIZE, DEFAULT_WAL_DIR,
};
use buildtsi_runner::shutdown::install_shutdown_handler;
use buildtsi_runner::{Orchestrator, RebuildError};

#[derive(Parser, Debug)]
#[command(name = "buildtsi-runner")]
#[command(version)]
#[command(about = "Rebuild InfluxDB TSI indexes for every database and shard in parallel")]
struct Args {
    /// datadir location
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    datadir: PathBuf,

    /// waldir location
    #[arg(long, default_value = DEFAULT_WAL_DIR)]
    waldir: PathBuf,

    /// max-log-file-size passed to buildtsi, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_LOG_FILE_SIZE)]
    max_log_file_size: u64,

    /// Number of buildtsi processes to run at once
    #[arg(long, default_value_t = default_concurrency())]
    concurrency: usize,

    /// Print the output of influx_inspect for every successful job
    #[arg(long)]
    verbose: bool,

    /// Run on a specific database (optional)
    #[arg(long)]
    database: Option<OsString>,

    /// Run on a specific set of shards, comma separated (optional)
    #[arg(long, default_value = "")]
    shards: String,

    /// influx_inspect binary to run
    #[arg(long, default_value = DEFAULT_INSPECT_BIN)]
    inspect_bin: PathBuf,
}

impl Args {
    fn into_config(self) -> RunConfig {
        RunConfig {
            data_dir: self.datadir,
            wal_dir: self.waldir,
            max_log_file_size: self.max_log_file_size,
            concurrency: self.concurrency,
            verbose: self.verbose,
            database: self.database.filter(|name| !name.is_empty()),
            shards: RunConfig::parse_shard_list(&self.shards),
            inspect_bin: self.inspect_bin,
        }
    }
}

async fn run(config: RunConfig) -> Result<(), RebuildError> {
    let shutdown = install_shutdown_handler().map_err(RebuildError::Signal)?;

    let summary = Orchestrator::new(config).run(shutdown).await?;
    tracing::info!(jobs = summary.jobs_completed, "All shards rebuilt");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logs go to stderr; stdout carries verbose job output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args.into_config()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The full error, including captured tool output, goes to stderr once.
            match e.job() {
                Some(job) => tracing::error!(%job, "Rebuild aborted by failed job"),
                None => tracing::error!("Rebuild aborted"),
            }
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
