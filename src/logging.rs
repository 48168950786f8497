use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Route `tracing` output to `log_file`. Filter comes from `SITE_MAP_LOG`,
/// defaulting to `info`.
pub fn init_tracing(log_file: &Path) -> Result<()> {
    let filter = EnvFilter::try_from_env("SITE_MAP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let file = File::create(log_file)
        .with_context(|| format!("failed to create log file {}", log_file.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
