//! File logging. The terminal belongs to the TUI, so diagnostics go to a log
//! file and never to stdout or stderr.

use crate::config::{AppConfig, ensure_parent_dir, log_path};
use anyhow::{Context, Result};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "TWINPANE_LOG";

/// Installs the global subscriber and returns the log file path.
pub fn init(config: &AppConfig) -> Result<PathBuf> {
    let path = log_path()?;
    ensure_parent_dir(&path)?;
    let file = File::create(&path)
        .with_context(|| format!("failed to create log file: {}", path.display()))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        .with(build_filter(std::env::var(LOG_ENV).ok(), &config.log_filter))
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(path)
}

/// The environment directive wins over the configured one; anything that
/// does not parse falls back to `info`.
pub(crate) fn build_filter(env: Option<String>, configured: &str) -> EnvFilter {
    env.and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn environment_directive_takes_precedence() {
        let filter = build_filter(Some("twinpane=debug".to_string()), "warn");
        assert_eq!(filter.to_string(), "twinpane=debug");
    }

    #[test]
    fn configured_directive_is_used_without_environment() {
        let filter = build_filter(None, "warn");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn events_reach_the_file_writer() {
        let path = std::env::temp_dir().join(format!(
            "twinpane-log-{}-{}.log",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        let file = File::create(&path).expect("create log");
        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
            .with(build_filter(None, "info"));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(pane = "source", "navigated");
            tracing::debug!("filtered out");
        });

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert!(contents.contains("navigated"));
        assert!(!contents.contains("filtered out"));
        std::fs::remove_file(path).ok();
    }
}
