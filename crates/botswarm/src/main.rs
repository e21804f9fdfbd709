// ABOUTME: botswarm CLI entry point.
// ABOUTME: Provides run, workers, and status subcommands.

use botswarm::{list_workers, read_status, run_supervisor, SupervisorOptions};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "botswarm")]
#[command(about = "Fail-fast supervisor for per-symbol trading bot workers")]
struct Cli {
    /// Also append logs to this file
    #[arg(long, global = true, env = "BOTSWARM_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch all workers and supervise them until one exits or a stop is requested
    Run {
        /// Path to configuration file
        #[arg(long, env = "BOTSWARM_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print the resolved worker list without launching anything
    Workers {
        /// Path to configuration file
        #[arg(long, env = "BOTSWARM_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print the last status snapshot written by a running supervisor
    Status {
        /// Status file (defaults to status_file from the config)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Path to configuration file
        #[arg(long, env = "BOTSWARM_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match &cli.log_file {
        Some(path) => botswarm_log::init_with_file(path),
        None => botswarm_log::init(),
    }

    match cli.command {
        Commands::Run { config } => {
            let outcome = run_supervisor(SupervisorOptions {
                config_path: config,
            })
            .await?;
            Ok(ExitCode::from(outcome.exit_code()))
        }
        Commands::Workers { config } => {
            for spec in list_workers(config)? {
                println!("{}\t{}", spec.tag(), spec.working_dir().display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status { file, config } => {
            let snapshot = read_status(file, config)?;
            print!("{}", snapshot.render());
            Ok(ExitCode::SUCCESS)
        }
    }
}
