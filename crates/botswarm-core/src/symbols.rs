// ABOUTME: Resolves the list of trading symbols when no workers are listed explicitly.
// ABOUTME: Reads the SYMBOLS environment variable first, then a JSON symbols file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable holding a comma-separated symbol list.
pub const SYMBOLS_ENV: &str = "SYMBOLS";

/// Where a resolved symbol list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolSource {
    Env,
    File(PathBuf),
}

impl fmt::Display for SymbolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolSource::Env => write!(f, "{} environment variable", SYMBOLS_ENV),
            SymbolSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Accepted shapes of the symbols file: a bare array or `{"symbols": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SymbolsFile {
    List(Vec<String>),
    Object { symbols: Vec<String> },
}

/// Normalize symbols: trim, upper-case, drop empty entries.
pub fn normalize<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols
        .into_iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a comma-separated symbol list (the `SYMBOLS` format).
pub fn parse_list(raw: &str) -> Vec<String> {
    normalize(raw.split(','))
}

/// Load symbols from a JSON file.
pub fn load_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read symbols from {}", path.display()))?;
    let parsed: SymbolsFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse symbols from {}", path.display()))?;
    let symbols = match parsed {
        SymbolsFile::List(symbols) => symbols,
        SymbolsFile::Object { symbols } => symbols,
    };
    Ok(normalize(symbols))
}

/// Resolve symbols from the environment value (if set and non-empty), else the file.
///
/// Returns `Ok(None)` when neither source yields anything.
pub fn resolve(
    env_value: Option<&str>,
    file: Option<&Path>,
) -> Result<Option<(SymbolSource, Vec<String>)>> {
    if let Some(raw) = env_value {
        let symbols = parse_list(raw);
        if !symbols.is_empty() {
            return Ok(Some((SymbolSource::Env, symbols)));
        }
    }

    if let Some(path) = file {
        let symbols = load_file(path)?;
        if !symbols.is_empty() {
            return Ok(Some((SymbolSource::File(path.to_path_buf()), symbols)));
        }
    }

    Ok(None)
}
