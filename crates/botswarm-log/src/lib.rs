// ABOUTME: Shared logging setup for botswarm binaries
// ABOUTME: Two functions: init() for stderr, init_with_file() for stderr plus an appended log file

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

fn default_filter() -> EnvFilter {
    EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
}

/// Standard logging to stderr. Default: INFO level, RUST_LOG override.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .init();
}

/// Logging to stderr mirrored into `path` (appended, no ANSI colors).
/// Default: INFO level, RUST_LOG override.
/// If the file cannot be opened, prints a warning to stderr and falls back to `init()`.
pub fn init_with_file(path: &Path) {
    match open_log_file(path) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr.and(Arc::new(file)))
                .with_env_filter(default_filter())
                .with_ansi(false)
                .init();
        }
        Err(e) => {
            eprintln!(
                "Warning: failed to open log file {}: {e}",
                path.display()
            );
            init();
        }
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}
