use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod config;
mod runtime;

use config::JobConfig;

#[derive(Parser)]
#[command(name = "ingest")]
#[command(about = "Ingest - streaming record readers over local, remote and columnar sources", long_about = None)]
struct Cli {
    /// Default log filter when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read every source of a job and write its records as JSON lines
    Run {
        /// Path to job YAML file
        #[arg(short, long)]
        config: PathBuf,
        /// Maximum records read per source, overrides the job's limit
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Validate a job configuration
    Validate {
        /// Path to job YAML file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show version information
    Version,
}

fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Records go to stdout when no output is configured, so logs stay on stderr
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Run { config, limit } => {
            let mut job = JobConfig::from_yaml_file(&config)?;
            if limit.is_some() {
                job.limit = limit;
            }
            runtime::run_job(&job)?;
        }
        Commands::Validate { config } => {
            let job = JobConfig::from_yaml_file(&config)?;
            println!(
                "✓ Job configuration '{}' is valid ({} sources)",
                job.name,
                job.sources.len()
            );
        }
        Commands::Version => {
            println!("ingest version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
