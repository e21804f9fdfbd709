// ABOUTME: botswarm library with the worker supervisor, status snapshots, and signal handling.
// ABOUTME: Re-exports for programmatic use of the supervisor.

pub mod signal;
pub mod status;
pub mod supervisor;

pub use botswarm_core::{Config, Timings, WorkerSpec};
pub use status::{StatusSnapshot, WorkerStatus};
pub use supervisor::{
    Disposition, ExitOutcome, GroupState, LaunchError, ProcessLauncher, ShutdownReport,
    StopCause, SupervisionGroup, Supervisor, WorkerExit, WorkerLauncher, WorkerProcess,
};

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Options for running the supervisor
pub struct SupervisorOptions {
    /// Path to configuration file
    pub config_path: Option<PathBuf>,
}

/// Load the config from `path`, or from the default location
pub fn load_config(path: Option<PathBuf>) -> Result<(PathBuf, Config)> {
    let path = match path {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&path)?;
    Ok((path, config))
}

/// Resolve the worker list without launching anything
pub fn list_workers(config_path: Option<PathBuf>) -> Result<Vec<WorkerSpec>> {
    let (_, config) = load_config(config_path)?;
    config.worker_specs()
}

/// Read the status snapshot at `file`, or at the configured `status_file`
pub fn read_status(file: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<StatusSnapshot> {
    let path = match file {
        Some(path) => path,
        None => {
            let (config_path, config) = load_config(config_path)?;
            config.status_file_expanded().with_context(|| {
                format!("No status_file set in {}", config_path.display())
            })?
        }
    };
    StatusSnapshot::load(&path)
}

/// Run the supervisor until the group stops
pub async fn run_supervisor(options: SupervisorOptions) -> Result<ExitOutcome> {
    let (config_path, config) = load_config(options.config_path)?;
    let specs = config.worker_specs()?;

    tracing::info!(
        config = %config_path.display(),
        workers = specs.len(),
        command = ?config.command,
        "Loaded configuration"
    );

    let mut supervisor = Supervisor::new(ProcessLauncher::from_config(&config), config.timings());
    if let Some(path) = config.status_file_expanded() {
        supervisor = supervisor.with_status_file(path);
    }

    let cancel = CancellationToken::new();
    let listener =
        signal::spawn_listener(cancel.clone()).context("Failed to install signal handlers")?;

    let outcome = supervisor.run(specs, &cancel).await;
    listener.abort();

    for worker in &outcome.shutdown.workers {
        tracing::info!(worker = %worker.tag, disposition = ?worker.disposition, "Shutdown result");
    }

    Ok(outcome)
}
