//! Tracing subscriber setup.

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "BULLETIN_LOG";

/// Picks the filter: `env_value` when set and non-empty, else `fallback`.
///
/// # Errors
/// Returns an error if the chosen directive does not parse.
pub fn build_filter(env_value: Option<&str>, fallback: &str) -> Result<EnvFilter> {
    let directive = env_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback);
    EnvFilter::try_new(directive).with_context(|| format!("invalid log filter '{directive}'"))
}

/// Installs the global subscriber: stderr, plus `config.log_file` when set.
///
/// Keep the returned guard alive for as long as the file should be written.
///
/// # Errors
/// Returns an error on an invalid filter, a bad log path, or if a subscriber
/// is already installed.
pub fn init(config: &Config) -> Result<Option<WorkerGuard>> {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = build_filter(env_value.as_deref(), &config.log_level)?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false);

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("log_file has no file name: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn test_env_value_wins_over_fallback() {
        let filter = build_filter(Some("debug"), "warn").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_blank_env_value_uses_fallback() {
        let filter = build_filter(Some("  "), "bulletin_core=info").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
        let filter = build_filter(None, "warn").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_invalid_directive_is_rejected() {
        assert!(build_filter(Some("bulletin=loud"), "warn").is_err());
    }
}
