// ABOUTME: Spawns worker child processes and signals them.
// ABOUTME: Forwards worker stdout/stderr into the supervisor log with the worker tag.

use super::worker::{LaunchError, Liveness, WorkerLauncher, WorkerProcess};
use botswarm_core::{Config, WorkerSpec};
use std::io;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

/// Launches the configured command once per worker, inside the worker's directory.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    command: Vec<String>,
    symbol_env: Option<String>,
    capture_output: bool,
}

impl ProcessLauncher {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            symbol_env: None,
            capture_output: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.command.clone())
            .symbol_env(config.symbol_env().map(str::to_string))
            .capture_output(config.capture_output)
    }

    /// Export the worker tag in this environment variable
    pub fn symbol_env(mut self, name: Option<String>) -> Self {
        self.symbol_env = name;
        self
    }

    /// Forward stdout/stderr into the log instead of inheriting them
    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }
}

impl WorkerLauncher for ProcessLauncher {
    type Process = ChildProcess;

    fn launch(&self, spec: &WorkerSpec) -> Result<ChildProcess, LaunchError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or(LaunchError::EmptyCommand)?;

        let spec = spec
            .absolute()
            .map_err(|_| LaunchError::MissingWorkingDir {
                path: spec.working_dir().to_path_buf(),
            })?;

        if !spec.working_dir().is_dir() {
            return Err(LaunchError::MissingWorkingDir {
                path: spec.working_dir().to_path_buf(),
            });
        }

        // Bare names are left to PATH lookup at spawn time
        let program = spec.resolve_program(program);
        if program.components().count() > 1 && !program.exists() {
            return Err(LaunchError::MissingExecutable { path: program });
        }

        let mut cmd = Command::new(&program);
        cmd.args(args)
            .current_dir(spec.working_dir())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(name) = &self.symbol_env {
            cmd.env(name, spec.tag());
        }

        if self.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            tag: spec.tag().to_string(),
            source,
        })?;

        let pid = child.id();
        tracing::debug!(worker = %spec.tag(), pid = ?pid, program = %program.display(), "Spawned worker");

        if let Some(stdout) = child.stdout.take() {
            forward_lines(spec.tag().to_string(), "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(spec.tag().to_string(), "stderr", stderr);
        }

        Ok(ChildProcess { child, pid })
    }
}

/// Re-emit each output line as a tracing event tagged with the worker.
fn forward_lines<R>(tag: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::info!(target: "botswarm::worker", worker = %tag, stream, "{}", line);
        }
    });
}

/// A running worker subprocess.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    pid: Option<u32>,
}

impl WorkerProcess for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn try_status(&mut self) -> io::Result<Liveness> {
        Ok(match self.child.try_wait()? {
            Some(status) => Liveness::Exited(status.into()),
            None => Liveness::Running,
        })
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        // id() is None once the child has been reaped
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        let pid = libc::pid_t::try_from(pid)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        // SAFETY: plain kill(2) on a pid we spawned and have not reaped
        if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            Ok(())
        } else {
            Err(err)
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        self.kill()
    }

    fn kill(&mut self) -> io::Result<()> {
        if self.child.id().is_none() {
            return Ok(());
        }
        self.child.start_kill()
    }
}
