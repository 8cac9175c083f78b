//! Tracing setup: append to a log file in the XDG state dir, or stderr when
//! that is not possible.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,inflight=debug,inflight_core=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a plain-text subscriber writing to `writer`.
fn install<W>(writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))
}

/// Path of the log file, `$XDG_STATE_HOME/inflight/inflight.log`.
///
/// The parent directory is created if missing.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("inflight")?;
    xdg_dirs
        .place_state_file("inflight.log")
        .context("creating log directory")
}

/// Send all tracing output to the log file.
///
/// Errors (unwritable state dir, subscriber already set) are returned so the
/// CLI can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let path = log_file_path()?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    // `&File` is `Write`, so a shared handle serves every event.
    install(Arc::new(file))?;
    tracing::info!(path = %path.display(), "logging to file");
    Ok(())
}

/// Log to stderr instead of a file.
pub fn init_logging_stderr() {
    // A subscriber may already be installed (e.g. by a test harness); keep it.
    let _ = install(std::io::stderr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_sits_directly_under_state_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("XDG_STATE_HOME", dir.path());
        let path = log_file_path().unwrap();
        assert_eq!(path, dir.path().join("inflight").join("inflight.log"));
        assert!(path.parent().unwrap().is_dir());
    }
}
