// ABOUTME: Capability traits the supervisor uses to launch and signal workers.
// ABOUTME: Real subprocesses and test doubles both sit behind WorkerLauncher/WorkerProcess.

use botswarm_core::WorkerSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// How a worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerExit {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Terminating signal, if the process was killed by one
    pub signal: Option<i32>,
}

impl WorkerExit {
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Exit status could not be determined
    pub fn unknown() -> Self {
        Self {
            code: None,
            signal: None,
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for WorkerExit {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

/// Observed liveness of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Running,
    Exited(WorkerExit),
}

impl Liveness {
    pub fn is_running(&self) -> bool {
        matches!(self, Liveness::Running)
    }
}

/// A worker could not be started.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The worker's working directory is missing or not a directory.
    #[error("working directory {path} does not exist")]
    MissingWorkingDir { path: PathBuf },

    /// The worker's entry point does not exist.
    #[error("worker executable {path} not found")]
    MissingExecutable { path: PathBuf },

    /// No program configured.
    #[error("worker command is empty")]
    EmptyCommand,

    /// The OS refused to start the process.
    #[error("failed to spawn worker {tag}: {source}")]
    Spawn {
        tag: String,
        #[source]
        source: io::Error,
    },
}

/// Starts workers.
pub trait WorkerLauncher {
    type Process: WorkerProcess;

    fn launch(&self, spec: &WorkerSpec) -> Result<Self::Process, LaunchError>;
}

/// A started worker. None of these calls may block.
pub trait WorkerProcess: Send {
    fn pid(&self) -> Option<u32>;

    /// Non-blocking liveness probe.
    fn try_status(&mut self) -> io::Result<Liveness>;

    /// Ask the worker to exit (SIGTERM on Unix). No-op if it already exited.
    fn terminate(&mut self) -> io::Result<()>;

    /// Force the worker to exit. No-op if it already exited.
    fn kill(&mut self) -> io::Result<()>;
}
