// ABOUTME: Deterministic in-memory workers for supervisor tests.
// ABOUTME: Exit times follow tokio's clock so tests can run with paused time.

use super::worker::{LaunchError, Liveness, WorkerExit, WorkerLauncher, WorkerProcess};
use botswarm_core::WorkerSpec;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

const SIGTERM: i32 = 15;
const SIGKILL: i32 = 9;

#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    /// Runs until asked to terminate
    LongRunning,
    /// Exits on its own with the given code after the delay
    ExitAfter(Duration, i32),
    /// Only dies when killed
    IgnoresTerminate,
    /// Launch fails
    FailLaunch,
}

struct FakeState {
    exit_at: Option<Instant>,
    exit: WorkerExit,
    honors_terminate: bool,
    terminate_calls: u32,
    kill_calls: u32,
}

/// Test-side view of a launched fake worker.
#[derive(Clone)]
pub(crate) struct FakeWorker {
    state: Arc<Mutex<FakeState>>,
}

impl FakeWorker {
    pub(crate) fn terminate_calls(&self) -> u32 {
        self.state.lock().unwrap().terminate_calls
    }

    pub(crate) fn kill_calls(&self) -> u32 {
        self.state.lock().unwrap().kill_calls
    }

    /// Simulate the worker dying on its own right now.
    pub(crate) fn exit_now(&self, code: i32) {
        let mut state = self.state.lock().unwrap();
        if state.exit_at.is_none() {
            state.exit_at = Some(Instant::now());
            state.exit = WorkerExit::code(code);
        }
    }
}

pub(crate) struct FakeProcess {
    pid: u32,
    worker: FakeWorker,
}

impl FakeProcess {
    fn exited(state: &FakeState) -> bool {
        state.exit_at.is_some_and(|at| Instant::now() >= at)
    }
}

impl WorkerProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn try_status(&mut self) -> io::Result<Liveness> {
        let state = self.worker.state.lock().unwrap();
        if Self::exited(&state) {
            Ok(Liveness::Exited(state.exit))
        } else {
            Ok(Liveness::Running)
        }
    }

    fn terminate(&mut self) -> io::Result<()> {
        let mut state = self.worker.state.lock().unwrap();
        if Self::exited(&state) {
            return Ok(());
        }
        state.terminate_calls += 1;
        if state.honors_terminate {
            state.exit_at = Some(Instant::now());
            state.exit = WorkerExit::signaled(SIGTERM);
        }
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        let mut state = self.worker.state.lock().unwrap();
        if Self::exited(&state) {
            return Ok(());
        }
        state.kill_calls += 1;
        state.exit_at = Some(Instant::now());
        state.exit = WorkerExit::signaled(SIGKILL);
        Ok(())
    }
}

#[derive(Default)]
struct Registry {
    launches: Vec<(String, Instant)>,
    workers: HashMap<String, FakeWorker>,
}

/// Launcher handing out fake workers. Clones share the launch registry.
#[derive(Clone, Default)]
pub(crate) struct FakeLauncher {
    behaviors: HashMap<String, Behavior>,
    registry: Arc<Mutex<Registry>>,
}

impl FakeLauncher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Set the behavior for `tag`. Unlisted tags are long-running.
    pub(crate) fn with(mut self, tag: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(tag.to_string(), behavior);
        self
    }

    /// Tags and launch instants, in launch order
    pub(crate) fn launches(&self) -> Vec<(String, Instant)> {
        self.registry.lock().unwrap().launches.clone()
    }

    pub(crate) fn launched_tags(&self) -> Vec<String> {
        self.launches().into_iter().map(|(tag, _)| tag).collect()
    }

    pub(crate) fn worker(&self, tag: &str) -> Option<FakeWorker> {
        self.registry.lock().unwrap().workers.get(tag).cloned()
    }
}

impl WorkerLauncher for FakeLauncher {
    type Process = FakeProcess;

    fn launch(&self, spec: &WorkerSpec) -> Result<FakeProcess, LaunchError> {
        let behavior = self
            .behaviors
            .get(spec.tag())
            .cloned()
            .unwrap_or(Behavior::LongRunning);

        let now = Instant::now();
        let (exit_at, exit, honors_terminate) = match behavior {
            Behavior::FailLaunch => {
                return Err(LaunchError::MissingWorkingDir {
                    path: spec.working_dir().to_path_buf(),
                })
            }
            Behavior::LongRunning => (None, WorkerExit::unknown(), true),
            Behavior::ExitAfter(delay, code) => (Some(now + delay), WorkerExit::code(code), true),
            Behavior::IgnoresTerminate => (None, WorkerExit::unknown(), false),
        };

        let worker = FakeWorker {
            state: Arc::new(Mutex::new(FakeState {
                exit_at,
                exit,
                honors_terminate,
                terminate_calls: 0,
                kill_calls: 0,
            })),
        };

        let mut registry = self.registry.lock().unwrap();
        registry.launches.push((spec.tag().to_string(), now));
        registry
            .workers
            .insert(spec.tag().to_string(), worker.clone());
        let pid = 1000 + registry.launches.len() as u32;

        Ok(FakeProcess { pid, worker })
    }
}
