//! ---
//! fleet_section: "01-core-functionality"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Shared primitives and utilities for the simulator workspace."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "FLEETSIM_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

static STDERR_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static TRACE_FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Shape of the diagnostics written to stderr while trips are generated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Install the global subscriber for a simulator binary.
///
/// Stdout stays free for event streams: diagnostics go to stderr, plus a
/// daily JSON trace file under `directory` when one is configured.
/// `FLEETSIM_LOG` takes precedence over `RUST_LOG`.
pub fn init_tracing(binary: &str, config: &LoggingConfig) -> Result<()> {
    let (stderr, guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = STDERR_GUARD.set(guard);

    let trace_file = match &config.directory {
        Some(directory) => {
            let prefix = config.file_prefix.as_deref().unwrap_or(binary);
            Some(trace_file_layer(directory, prefix, binary)?)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_from_env())
        .with(stderr_layer(config.format, stderr))
        .with(trace_file)
        .try_init()
        .ok();

    info!(
        binary,
        trace_dir = ?config.directory,
        format = ?config.format,
        "diagnostics ready"
    );
    Ok(())
}

fn filter_from_env() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("ignoring {LOG_ENV}={directive:?} ({err}); using {DEFAULT_DIRECTIVE}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

fn stderr_layer<S>(format: LogFormat, writer: NonBlocking) -> BoxedLayer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer);
    match format {
        LogFormat::StructuredJson => layer.with_target(false).json().boxed(),
        LogFormat::Pretty => layer.with_target(true).boxed(),
    }
}

fn trace_file_layer<S>(directory: &Path, prefix: &str, binary: &str) -> Result<BoxedLayer<S>>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    std::fs::create_dir_all(directory)
        .with_context(|| format!("creating trace directory {}", directory.display()))?;
    let appender = tracing_appender::rolling::daily(directory, format!("{prefix}-{binary}.log"));
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = TRACE_FILE_GUARD.set(guard);
    Ok(fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(writer)
        .boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn log_format_uses_kebab_case() {
        let parsed: LoggingConfig = toml::from_str("format = \"structured-json\"").unwrap();
        assert_eq!(parsed.format, LogFormat::StructuredJson);
    }

    #[test]
    fn trace_file_directory_is_created() -> Result<()> {
        let dir = tempdir()?;
        let logs = dir.path().join("logs");
        let config = LoggingConfig {
            directory: Some(logs.clone()),
            format: LogFormat::StructuredJson,
            file_prefix: Some("test".into()),
        };
        init_tracing("fleet-common", &config)?;
        assert!(logs.is_dir());
        Ok(())
    }
}
