// ABOUTME: Runtime state of a supervised worker group.
// ABOUTME: GroupState machine, per-worker handles, and liveness polling.

use super::worker::{Liveness, WorkerExit, WorkerProcess};
use botswarm_core::WorkerSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

/// Lifecycle of a supervision group. Never returns to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupState {
    Initializing,
    Running,
    Draining,
    Stopped,
}

impl GroupState {
    pub fn can_transition_to(self, next: GroupState) -> bool {
        use GroupState::*;
        matches!(
            (self, next),
            (Initializing, Running) | (Initializing, Draining) | (Running, Draining) | (Draining, Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == GroupState::Stopped
    }
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupState::Initializing => "initializing",
            GroupState::Running => "running",
            GroupState::Draining => "draining",
            GroupState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A launched worker.
pub struct WorkerHandle<P> {
    spec: WorkerSpec,
    process: P,
    pid: Option<u32>,
    liveness: Liveness,
    launched_at: Instant,
    terminate_sent: bool,
}

impl<P: WorkerProcess> WorkerHandle<P> {
    pub(crate) fn new(spec: WorkerSpec, process: P) -> Self {
        let pid = process.pid();
        Self {
            spec,
            process,
            pid,
            liveness: Liveness::Running,
            launched_at: Instant::now(),
            terminate_sent: false,
        }
    }

    pub fn spec(&self) -> &WorkerSpec {
        &self.spec
    }

    pub fn tag(&self) -> &str {
        self.spec.tag()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Liveness as of the last poll
    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn is_running(&self) -> bool {
        self.liveness.is_running()
    }

    pub fn launched_at(&self) -> Instant {
        self.launched_at
    }

    pub fn terminate_sent(&self) -> bool {
        self.terminate_sent
    }

    /// Probe the process. Once exited, the cached status is returned without probing again.
    pub(crate) fn refresh(&mut self) -> Liveness {
        if self.liveness.is_running() {
            self.liveness = match self.process.try_status() {
                Ok(liveness) => liveness,
                Err(e) => {
                    tracing::warn!(
                        worker = %self.tag(),
                        error = %e,
                        "Liveness probe failed, treating worker as exited"
                    );
                    Liveness::Exited(WorkerExit::unknown())
                }
            };
        }
        self.liveness
    }

    /// Send one graceful termination request. Returns false if one was already sent.
    pub(crate) fn request_terminate(&mut self) -> bool {
        if self.terminate_sent {
            return false;
        }
        self.terminate_sent = true;
        tracing::info!(worker = %self.tag(), pid = ?self.pid, "Sending termination request");
        if let Err(e) = self.process.terminate() {
            tracing::warn!(worker = %self.tag(), error = %e, "Failed to send termination request");
        }
        true
    }

    pub(crate) fn force_kill(&mut self) {
        tracing::warn!(worker = %self.tag(), pid = ?self.pid, "Force killing worker");
        if let Err(e) = self.process.kill() {
            tracing::error!(worker = %self.tag(), error = %e, "Failed to kill worker");
        }
    }
}

/// The ordered set of workers for one supervisor run.
pub struct SupervisionGroup<P> {
    state: GroupState,
    handles: Vec<WorkerHandle<P>>,
}

impl<P: WorkerProcess> SupervisionGroup<P> {
    pub(crate) fn new() -> Self {
        Self {
            state: GroupState::Initializing,
            handles: Vec::new(),
        }
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    pub fn handles(&self) -> &[WorkerHandle<P>] {
        &self.handles
    }

    pub(crate) fn handles_mut(&mut self) -> &mut [WorkerHandle<P>] {
        &mut self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn get(&self, tag: &str) -> Option<&WorkerHandle<P>> {
        self.handles.iter().find(|h| h.tag() == tag)
    }

    pub fn running_count(&self) -> usize {
        self.handles.iter().filter(|h| h.is_running()).count()
    }

    pub(crate) fn push(&mut self, handle: WorkerHandle<P>) {
        self.handles.push(handle);
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub(crate) fn transition(&mut self, next: GroupState) -> bool {
        if !self.state.can_transition_to(next) {
            if self.state != next {
                tracing::warn!(from = %self.state, to = %next, "Ignoring illegal group transition");
            }
            return false;
        }
        tracing::debug!(from = %self.state, to = %next, "Group state change");
        self.state = next;
        true
    }

    /// All-or-nothing check: a running group has no exited workers.
    pub fn is_consistent(&self) -> bool {
        match self.state {
            GroupState::Running => self.handles.iter().all(|h| h.is_running()),
            _ => true,
        }
    }

    /// Probe every worker; return the first one (in launch order) found exited.
    pub(crate) fn poll_exits(&mut self) -> Option<(usize, WorkerExit)> {
        let mut first = None;
        for (idx, handle) in self.handles.iter_mut().enumerate() {
            let was_running = handle.is_running();
            if let Liveness::Exited(exit) = handle.refresh() {
                if was_running {
                    tracing::warn!(worker = %handle.tag(), pid = ?handle.pid(), %exit, "Worker exited");
                }
                if first.is_none() {
                    first = Some((idx, exit));
                }
            }
        }
        first
    }
}

impl<P> fmt::Debug for SupervisionGroup<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisionGroup")
            .field("state", &self.state)
            .field(
                "workers",
                &self
                    .handles
                    .iter()
                    .map(|h| (h.spec.tag(), h.liveness))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
