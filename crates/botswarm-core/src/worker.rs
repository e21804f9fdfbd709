// ABOUTME: Immutable descriptor of one worker instance.
// ABOUTME: A tag (trading symbol) bound to the directory the worker runs in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// One worker to launch: a symbolic tag and the directory holding its
/// executable and configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSpec {
    tag: String,
    working_dir: PathBuf,
}

impl WorkerSpec {
    pub fn new(tag: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            tag: tag.into(),
            working_dir: working_dir.into(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The same worker with its directory made absolute against the current directory.
    ///
    /// The child runs with the working directory as cwd, so a relative directory
    /// would otherwise be applied twice to a relative program path.
    pub fn absolute(&self) -> io::Result<WorkerSpec> {
        Ok(Self {
            tag: self.tag.clone(),
            working_dir: std::path::absolute(&self.working_dir)?,
        })
    }

    /// Resolve a program name against this worker's directory.
    ///
    /// Relative paths with a separator (`./bot`, `bin/bot`) are joined onto the
    /// working directory. Bare names (`python3`) are left for `PATH` lookup.
    pub fn resolve_program(&self, program: &str) -> PathBuf {
        let path = Path::new(program);
        if path.is_relative() && path.components().count() > 1 {
            self.working_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

impl fmt::Display for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.tag, self.working_dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_program() {
        let spec = WorkerSpec::new("BTCUSDT", "/srv/bots/BTCUSDT");
        assert_eq!(
            spec.resolve_program("./run.sh"),
            PathBuf::from("/srv/bots/BTCUSDT/./run.sh")
        );
        assert_eq!(
            spec.resolve_program("bin/bot"),
            PathBuf::from("/srv/bots/BTCUSDT/bin/bot")
        );
    }

    #[test]
    fn test_resolve_bare_program_uses_path() {
        let spec = WorkerSpec::new("BTCUSDT", "/srv/bots/BTCUSDT");
        assert_eq!(spec.resolve_program("python3"), PathBuf::from("python3"));
    }

    #[test]
    fn test_resolve_absolute_program() {
        let spec = WorkerSpec::new("ETHUSDT", "/srv/bots/ETHUSDT");
        assert_eq!(
            spec.resolve_program("/usr/bin/python3"),
            PathBuf::from("/usr/bin/python3")
        );
    }

    #[test]
    fn test_absolute_joins_relative_dir_onto_cwd() {
        let spec = WorkerSpec::new("BTCUSDT", "bots/BTCUSDT");
        let absolute = spec.absolute().unwrap();
        assert_eq!(absolute.tag(), "BTCUSDT");
        assert_eq!(
            absolute.working_dir(),
            std::env::current_dir().unwrap().join("bots/BTCUSDT")
        );
        assert_eq!(
            absolute.resolve_program("./run.sh"),
            std::env::current_dir().unwrap().join("bots/BTCUSDT/./run.sh")
        );
    }

    #[test]
    fn test_absolute_keeps_absolute_dir() {
        let spec = WorkerSpec::new("ETHUSDT", "/srv/bots/ETHUSDT");
        assert_eq!(spec.absolute().unwrap(), spec);
    }

    #[test]
    fn test_display() {
        let spec = WorkerSpec::new("ETHUSDT", "/srv/bots/ETHUSDT");
        assert_eq!(spec.to_string(), "ETHUSDT (/srv/bots/ETHUSDT)");
    }
}
