// ABOUTME: Fail-fast supervisor for a fixed group of worker processes.
// ABOUTME: Staggered start, liveness polling, and graceful-then-forced group shutdown.

mod group;
mod outcome;
mod process;
mod worker;

#[cfg(test)]
pub(crate) mod fake;

pub use group::{GroupState, SupervisionGroup, WorkerHandle};
pub use outcome::{Disposition, ExitOutcome, ShutdownReport, StopCause, WorkerShutdown};
pub use process::{ChildProcess, ProcessLauncher};
pub use worker::{LaunchError, Liveness, WorkerExit, WorkerLauncher, WorkerProcess};

use crate::status::StatusSnapshot;
use botswarm_core::{Timings, WorkerSpec};
use std::fmt;
use std::path::PathBuf;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

/// `start` stopped before the group reached `Running`.
///
/// The partially launched group is already draining and must go through
/// [`Supervisor::shutdown`].
pub struct StartAborted<P> {
    pub group: SupervisionGroup<P>,
    pub cause: StopCause,
}

impl<P> fmt::Debug for StartAborted<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartAborted")
            .field("group", &self.group)
            .field("cause", &self.cause)
            .finish()
    }
}

/// Owns the worker group for one run. The only component that signals workers.
pub struct Supervisor<L> {
    launcher: L,
    timings: Timings,
    status_file: Option<PathBuf>,
}

impl<L: WorkerLauncher> Supervisor<L> {
    pub fn new(launcher: L, timings: Timings) -> Self {
        Self {
            launcher,
            timings,
            status_file: None,
        }
    }

    /// Write a JSON status snapshot to `path` on every group change
    pub fn with_status_file(mut self, path: PathBuf) -> Self {
        self.status_file = Some(path);
        self
    }

    /// Start, monitor, and tear down the group. Returns once every worker is down.
    pub async fn run(&self, specs: Vec<WorkerSpec>, cancel: &CancellationToken) -> ExitOutcome {
        let outcome = match self.start(specs, cancel).await {
            Ok(mut group) => self.monitor(&mut group, cancel).await,
            Err(StartAborted { mut group, cause }) => {
                let shutdown = self.shutdown(&mut group).await;
                ExitOutcome { cause, shutdown }
            }
        };

        if outcome.cause.is_operator_initiated() {
            tracing::info!(cause = %outcome.cause, "Supervisor stopped");
        } else {
            tracing::error!(cause = %outcome.cause, "Supervisor stopped");
        }
        outcome
    }

    /// Launch workers in order, `timings.stagger` apart.
    ///
    /// Launched workers are polled after every stagger delay so an early
    /// failure aborts the start before the remaining workers are launched.
    pub async fn start(
        &self,
        specs: Vec<WorkerSpec>,
        cancel: &CancellationToken,
    ) -> Result<SupervisionGroup<L::Process>, StartAborted<L::Process>> {
        let mut group = SupervisionGroup::new();
        if specs.is_empty() {
            return Err(self.abort(group, StopCause::NoWorkers));
        }

        tracing::info!(count = specs.len(), stagger = ?self.timings.stagger, "Starting workers");

        for (idx, spec) in specs.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(self.abort(group, StopCause::ExternalInterrupt));
            }

            if idx > 0 {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(self.abort(group, StopCause::ExternalInterrupt));
                    }
                    _ = sleep(self.timings.stagger) => {}
                }

                if let Some((exited, exit)) = group.poll_exits() {
                    let tag = group.handles()[exited].tag().to_string();
                    return Err(self.abort(group, StopCause::WorkerExited { tag, exit }));
                }
            }

            match self.launcher.launch(&spec) {
                Ok(process) => {
                    let handle = WorkerHandle::new(spec, process);
                    tracing::info!(
                        worker = %handle.tag(),
                        pid = ?handle.pid(),
                        working_dir = %handle.spec().working_dir().display(),
                        "Worker launched"
                    );
                    group.push(handle);
                    self.publish(&group);
                }
                Err(error) => {
                    tracing::error!(worker = %spec.tag(), error = %error, "Failed to launch worker");
                    let tag = spec.tag().to_string();
                    return Err(self.abort(group, StopCause::LaunchFailed { tag, error }));
                }
            }
        }

        group.transition(GroupState::Running);
        self.publish(&group);
        tracing::info!(count = group.len(), "All workers running");
        Ok(group)
    }

    fn abort(
        &self,
        mut group: SupervisionGroup<L::Process>,
        cause: StopCause,
    ) -> StartAborted<L::Process> {
        tracing::warn!(cause = %cause, launched = group.len(), "Aborting start");
        group.transition(GroupState::Draining);
        self.publish(&group);
        StartAborted { group, cause }
    }

    /// Poll until a worker exits or `cancel` fires, then shut the whole group down.
    pub async fn monitor(
        &self,
        group: &mut SupervisionGroup<L::Process>,
        cancel: &CancellationToken,
    ) -> ExitOutcome {
        tracing::info!(
            workers = group.len(),
            interval = ?self.timings.poll_interval,
            "Monitoring workers"
        );

        let cause = loop {
            if let Some((exited, exit)) = group.poll_exits() {
                let tag = group.handles()[exited].tag().to_string();
                tracing::warn!(worker = %tag, %exit, "Worker exited, shutting down remaining workers");
                break StopCause::WorkerExited { tag, exit };
            }
            debug_assert!(group.is_consistent());

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Termination requested, shutting down workers");
                    break StopCause::ExternalInterrupt;
                }
                _ = sleep(self.timings.poll_interval) => {}
            }
        };

        group.transition(GroupState::Draining);
        self.publish(group);
        let shutdown = self.shutdown(group).await;
        ExitOutcome { cause, shutdown }
    }

    /// Terminate every running worker: one graceful request each, a shared
    /// grace period, then a forced kill for stragglers.
    ///
    /// Safe to call again; workers already down are reported, never re-signaled.
    pub async fn shutdown(&self, group: &mut SupervisionGroup<L::Process>) -> ShutdownReport {
        if !group.state().is_terminal() {
            group.transition(GroupState::Draining);
        }

        let mut results: Vec<Option<Disposition>> = vec![None; group.len()];

        for (idx, handle) in group.handles_mut().iter_mut().enumerate() {
            match handle.refresh() {
                Liveness::Exited(exit) => results[idx] = Some(Disposition::AlreadyExited(exit)),
                Liveness::Running => {
                    handle.request_terminate();
                }
            }
        }

        let deadline = Instant::now() + self.timings.grace_period;
        self.wait_for_exits(group, &mut results, deadline, Disposition::Terminated)
            .await;

        let mut forced = false;
        for (idx, handle) in group.handles_mut().iter_mut().enumerate() {
            if results[idx].is_none() {
                tracing::warn!(
                    worker = %handle.tag(),
                    grace = ?self.timings.grace_period,
                    "Worker ignored termination request"
                );
                handle.force_kill();
                forced = true;
            }
        }

        if forced {
            let deadline = Instant::now() + self.timings.kill_wait;
            self.wait_for_exits(group, &mut results, deadline, Disposition::Killed)
                .await;
        }

        let report = ShutdownReport {
            workers: group
                .handles()
                .iter()
                .zip(results)
                .map(|(handle, result)| {
                    let disposition = result.unwrap_or_else(|| {
                        tracing::error!(worker = %handle.tag(), pid = ?handle.pid(), "Worker did not exit after kill");
                        Disposition::Unresponsive
                    });
                    WorkerShutdown {
                        tag: handle.tag().to_string(),
                        disposition,
                    }
                })
                .collect(),
        };

        if group.transition(GroupState::Stopped) {
            tracing::info!(
                workers = group.len(),
                forced = report.forced(),
                "All workers stopped"
            );
        }
        self.publish(group);
        report
    }

    /// Poll unresolved workers until all have exited or `deadline` passes.
    async fn wait_for_exits(
        &self,
        group: &mut SupervisionGroup<L::Process>,
        results: &mut [Option<Disposition>],
        deadline: Instant,
        resolve: fn(WorkerExit) -> Disposition,
    ) {
        loop {
            let mut pending = 0;
            for (idx, handle) in group.handles_mut().iter_mut().enumerate() {
                if results[idx].is_some() {
                    continue;
                }
                match handle.refresh() {
                    Liveness::Exited(exit) => {
                        tracing::info!(worker = %handle.tag(), %exit, "Worker stopped");
                        results[idx] = Some(resolve(exit));
                    }
                    Liveness::Running => pending += 1,
                }
            }

            let now = Instant::now();
            if pending == 0 || now >= deadline {
                return;
            }
            sleep(self.timings.shutdown_poll().min(deadline - now)).await;
        }
    }

    fn publish(&self, group: &SupervisionGroup<L::Process>) {
        if let Some(path) = &self.status_file {
            if let Err(e) = StatusSnapshot::capture(group).write_atomic(path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write status file");
            }
        }
    }
}
