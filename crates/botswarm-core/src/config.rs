// ABOUTME: Configuration for the botswarm supervisor.
// ABOUTME: Loaded from TOML file with sensible defaults.

use crate::symbols;
use crate::worker::WorkerSpec;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An explicitly configured worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerEntry {
    /// Symbolic tag, usually the trading symbol (e.g. "BTCUSDT")
    pub tag: String,
    /// Directory containing the worker's executable and config
    pub working_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Worker entry point: program followed by its arguments.
    /// Run with each worker's working directory as cwd.
    pub command: Vec<String>,

    /// Parent directory of per-symbol worker directories, used when
    /// workers are derived from SYMBOLS or the symbols file
    #[serde(default)]
    pub workers_root: Option<String>,

    /// JSON file listing symbols (array or {"symbols": [...]})
    #[serde(default)]
    pub symbols_file: Option<String>,

    /// Environment variable that receives the worker's tag. Empty disables it.
    #[serde(default = "default_symbol_env")]
    pub symbol_env: String,

    /// Delay between consecutive worker launches
    #[serde(default = "default_stagger_secs")]
    pub stagger_secs: u64,

    /// Liveness poll interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Time a worker gets to exit after a graceful termination request
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,

    /// Time to wait for a force-killed worker to be reaped
    #[serde(default = "default_kill_wait_secs")]
    pub kill_wait_secs: u64,

    /// Forward worker stdout/stderr into the supervisor log
    #[serde(default = "default_capture_output")]
    pub capture_output: bool,

    /// Where to write JSON status snapshots
    #[serde(default)]
    pub status_file: Option<String>,

    /// Explicit worker list, launched in this order
    #[serde(default)]
    pub workers: Vec<WorkerEntry>,
}

fn default_symbol_env() -> String {
    "SYMBOL".to_string()
}

fn default_stagger_secs() -> u64 {
    1
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_grace_period_secs() -> u64 {
    30
}

fn default_kill_wait_secs() -> u64 {
    5
}

fn default_capture_output() -> bool {
    true
}

/// Supervisor timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub stagger: Duration,
    pub poll_interval: Duration,
    pub grace_period: Duration,
    pub kill_wait: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            stagger: Duration::from_secs(default_stagger_secs()),
            poll_interval: Duration::from_millis(default_poll_interval_ms()),
            grace_period: Duration::from_secs(default_grace_period_secs()),
            kill_wait: Duration::from_secs(default_kill_wait_secs()),
        }
    }
}

impl Timings {
    /// Poll cadence while waiting for workers to exit during shutdown.
    pub fn shutdown_poll(&self) -> Duration {
        self.poll_interval.min(Duration::from_millis(250))
    }
}

impl Config {
    /// Create a config with defaults for everything but the worker command
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            workers_root: None,
            symbols_file: None,
            symbol_env: default_symbol_env(),
            stagger_secs: default_stagger_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            grace_period_secs: default_grace_period_secs(),
            kill_wait_secs: default_kill_wait_secs(),
            capture_output: default_capture_output(),
            status_file: None,
            workers: Vec::new(),
        }
    }

    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Get the default config file path (~/.config/botswarm/botswarm.toml)
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("."))
            })
            .join("botswarm");
        Ok(config_dir.join("botswarm.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.command.first().map_or(true, |p| p.trim().is_empty()) {
            anyhow::bail!("command must name a program to run in each worker directory");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn timings(&self) -> Timings {
        Timings {
            stagger: Duration::from_secs(self.stagger_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            grace_period: Duration::from_secs(self.grace_period_secs),
            kill_wait: Duration::from_secs(self.kill_wait_secs),
        }
    }

    /// Env var name for the worker tag, if enabled
    pub fn symbol_env(&self) -> Option<&str> {
        let name = self.symbol_env.trim();
        (!name.is_empty()).then_some(name)
    }

    pub fn status_file_expanded(&self) -> Option<PathBuf> {
        self.status_file.as_deref().map(expand)
    }

    /// Resolve the ordered worker list, reading SYMBOLS from the process environment
    pub fn worker_specs(&self) -> Result<Vec<WorkerSpec>> {
        let env_symbols = std::env::var(symbols::SYMBOLS_ENV).ok();
        self.worker_specs_with(env_symbols.as_deref())
    }

    /// Resolve the ordered worker list.
    ///
    /// Explicit `[[workers]]` win; otherwise symbols from `env_symbols`
    /// (SYMBOLS format) or `symbols_file` are mapped to `workers_root/<SYMBOL>`.
    pub fn worker_specs_with(&self, env_symbols: Option<&str>) -> Result<Vec<WorkerSpec>> {
        let specs: Vec<WorkerSpec> = if !self.workers.is_empty() {
            self.workers
                .iter()
                .map(|w| WorkerSpec::new(w.tag.trim(), expand(&w.working_dir)))
                .collect()
        } else {
            let symbols_file = self.symbols_file.as_deref().map(expand);
            let Some((source, found)) = symbols::resolve(env_symbols, symbols_file.as_deref())?
            else {
                anyhow::bail!(
                    "No workers configured: add [[workers]] entries, set {}, or point symbols_file at a symbol list",
                    symbols::SYMBOLS_ENV
                );
            };
            let root = self.workers_root.as_deref().map(expand).with_context(|| {
                format!("workers_root must be set to use symbols from {}", source)
            })?;
            found
                .into_iter()
                .map(|symbol| {
                    let dir = root.join(&symbol);
                    WorkerSpec::new(symbol, dir)
                })
                .collect()
        };

        let mut seen = HashSet::new();
        for spec in &specs {
            if spec.tag().is_empty() {
                anyhow::bail!("Worker tag must not be empty ({})", spec.working_dir().display());
            }
            if !seen.insert(spec.tag()) {
                anyhow::bail!("Duplicate worker tag: {}", spec.tag());
            }
        }

        Ok(specs)
    }
}

/// Expand ~ in a configured path
fn expand(path: &str) -> PathBuf {
    shellexpand::tilde(path).into_owned().into()
}
