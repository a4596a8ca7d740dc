//! Tracing setup. The CLI logs to a file under the XDG state dir and falls
//! back to stderr when that file cannot be opened.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,albumdl_core=debug,albumdl=debug";
const LOG_FILE: &str = "albumdl.log";

/// `albumdl.log` inside `state_dir`.
pub fn log_file_in(state_dir: &Path) -> PathBuf {
    state_dir.join(LOG_FILE)
}

/// `~/.local/state/albumdl/albumdl.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("albumdl")?;
    Ok(log_file_in(&xdg_dirs.get_state_home()))
}

fn install<W>(writer: W) -> Result<()>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {}", e))
}

/// Appends log lines to the file at `log_file_path()`.
/// Returns Err when the file cannot be opened so the caller can use stderr.
pub fn init_logging() -> Result<()> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;

    install(Arc::new(file))?;
    tracing::info!("albumdl logging initialized at {}", path.display());
    Ok(())
}

pub fn init_logging_stderr() {
    let _ = install(std::io::stderr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_lives_in_state_dir() {
        let path = log_file_in(Path::new("/tmp/state/albumdl"));
        assert_eq!(path, PathBuf::from("/tmp/state/albumdl/albumdl.log"));
    }
}
