// ABOUTME: JSON status snapshots of the supervised group.
// ABOUTME: Written atomically on every group change, read back by `botswarm status`.

use crate::supervisor::{GroupState, Liveness, SupervisionGroup, WorkerProcess};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub tag: String,
    pub working_dir: PathBuf,
    pub pid: Option<u32>,
    pub running: bool,
    /// Seconds since the worker was launched
    pub uptime_secs: u64,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub timestamp: DateTime<Utc>,
    pub state: GroupState,
    pub total_workers: usize,
    pub running_workers: usize,
    pub workers: Vec<WorkerStatus>,
}

impl StatusSnapshot {
    /// Snapshot from the last observed liveness of each worker (no probing)
    pub fn capture<P: WorkerProcess>(group: &SupervisionGroup<P>) -> Self {
        let workers: Vec<WorkerStatus> = group
            .handles()
            .iter()
            .map(|handle| {
                let (exit_code, signal) = match handle.liveness() {
                    Liveness::Running => (None, None),
                    Liveness::Exited(exit) => (exit.code, exit.signal),
                };
                WorkerStatus {
                    tag: handle.tag().to_string(),
                    working_dir: handle.spec().working_dir().to_path_buf(),
                    pid: handle.pid(),
                    running: handle.is_running(),
                    uptime_secs: handle.launched_at().elapsed().as_secs(),
                    exit_code,
                    signal,
                }
            })
            .collect();

        Self {
            timestamp: Utc::now(),
            state: group.state(),
            total_workers: workers.len(),
            running_workers: workers.iter().filter(|w| w.running).count(),
            workers,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read status from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse status from {}", path.display()))
    }

    /// Write via a sibling temp file and rename, so readers never see a partial file
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create status directory {}", parent.display())
                })?;
            }
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let content = serde_json::to_string_pretty(self).context("Failed to serialize status")?;
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write status to {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move status into {}", path.display()))?;
        Ok(())
    }

    /// Human-readable table for the CLI
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "state: {}  workers: {}/{} running  at: {}",
            self.state,
            self.running_workers,
            self.total_workers,
            self.timestamp.to_rfc3339()
        );
        for worker in &self.workers {
            let pid = worker
                .pid
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            let status = match (worker.running, worker.exit_code, worker.signal) {
                (true, _, _) => "running".to_string(),
                (false, Some(code), _) => format!("exited ({})", code),
                (false, None, Some(signal)) => format!("killed (signal {})", signal),
                (false, None, None) => "exited".to_string(),
            };
            let _ = writeln!(
                out,
                "  {:<12} pid {:<8} {:<18} up {:<8} {}",
                worker.tag,
                pid,
                status,
                format!("{}s", worker.uptime_secs),
                worker.working_dir.display()
            );
        }
        out
    }
}
