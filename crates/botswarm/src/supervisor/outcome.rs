// ABOUTME: Final result of a supervisor run.
// ABOUTME: Why the group stopped, how each worker went down, and the process exit code.

use super::worker::{LaunchError, WorkerExit};
use std::fmt;

/// What moved the group into draining.
#[derive(Debug)]
pub enum StopCause {
    /// A worker exited on its own (any status)
    WorkerExited { tag: String, exit: WorkerExit },
    /// A worker could not be started
    LaunchFailed { tag: String, error: LaunchError },
    /// The supervisor was asked to stop (SIGINT/SIGTERM)
    ExternalInterrupt,
    /// Nothing to supervise
    NoWorkers,
}

impl StopCause {
    /// True for operator-initiated stops, the only clean outcome
    pub fn is_operator_initiated(&self) -> bool {
        matches!(self, StopCause::ExternalInterrupt)
    }

    /// Tag of the worker that triggered the stop, if a worker did
    pub fn failed_worker(&self) -> Option<&str> {
        match self {
            StopCause::WorkerExited { tag, .. } | StopCause::LaunchFailed { tag, .. } => {
                Some(tag.as_str())
            }
            StopCause::ExternalInterrupt | StopCause::NoWorkers => None,
        }
    }
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCause::WorkerExited { tag, exit } => write!(f, "worker {} exited with {}", tag, exit),
            StopCause::LaunchFailed { tag, error } => {
                write!(f, "worker {} failed to launch: {}", tag, error)
            }
            StopCause::ExternalInterrupt => write!(f, "stopped by operator"),
            StopCause::NoWorkers => write!(f, "no workers to supervise"),
        }
    }
}

/// How one worker went down during shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Had already exited before shutdown signaled it
    AlreadyExited(WorkerExit),
    /// Exited within the grace period after a termination request
    Terminated(WorkerExit),
    /// Ignored the termination request and was force-killed
    Killed(WorkerExit),
    /// Still not confirmed dead after the kill
    Unresponsive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerShutdown {
    pub tag: String,
    pub disposition: Disposition,
}

/// Per-worker shutdown results, in launch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub workers: Vec<WorkerShutdown>,
}

impl ShutdownReport {
    pub fn get(&self, tag: &str) -> Option<Disposition> {
        self.workers
            .iter()
            .find(|w| w.tag == tag)
            .map(|w| w.disposition)
    }

    /// Workers that had to be force-killed or never confirmed dead
    pub fn forced(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| {
                matches!(
                    w.disposition,
                    Disposition::Killed(_) | Disposition::Unresponsive
                )
            })
            .count()
    }
}

/// Everything the supervisor reports to its caller.
#[derive(Debug)]
pub struct ExitOutcome {
    pub cause: StopCause,
    pub shutdown: ShutdownReport,
}

impl ExitOutcome {
    /// 0 for an operator-initiated stop, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.cause.is_operator_initiated() {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let interrupted = ExitOutcome {
            cause: StopCause::ExternalInterrupt,
            shutdown: ShutdownReport::default(),
        };
        assert_eq!(interrupted.exit_code(), 0);

        // A clean exit of a worker still fails the group
        let worker_exit = ExitOutcome {
            cause: StopCause::WorkerExited {
                tag: "BTCUSDT".to_string(),
                exit: WorkerExit::code(0),
            },
            shutdown: ShutdownReport::default(),
        };
        assert_eq!(worker_exit.exit_code(), 1);

        let empty = ExitOutcome {
            cause: StopCause::NoWorkers,
            shutdown: ShutdownReport::default(),
        };
        assert_eq!(empty.exit_code(), 1);
    }

    #[test]
    fn test_failed_worker() {
        let cause = StopCause::LaunchFailed {
            tag: "ETHUSDT".to_string(),
            error: LaunchError::EmptyCommand,
        };
        assert_eq!(cause.failed_worker(), Some("ETHUSDT"));
        assert_eq!(StopCause::ExternalInterrupt.failed_worker(), None);
    }

    #[test]
    fn test_cause_display() {
        let cause = StopCause::WorkerExited {
            tag: "BTCUSDT".to_string(),
            exit: WorkerExit::code(7),
        };
        assert_eq!(cause.to_string(), "worker BTCUSDT exited with exit code 7");
    }

    #[test]
    fn test_report_forced() {
        let report = ShutdownReport {
            workers: vec![
                WorkerShutdown {
                    tag: "A".to_string(),
                    disposition: Disposition::AlreadyExited(WorkerExit::code(1)),
                },
                WorkerShutdown {
                    tag: "B".to_string(),
                    disposition: Disposition::Killed(WorkerExit::signaled(9)),
                },
            ],
        };
        assert_eq!(report.forced(), 1);
        assert_eq!(
            report.get("A"),
            Some(Disposition::AlreadyExited(WorkerExit::code(1)))
        );
        assert_eq!(report.get("C"), None);
    }
}
