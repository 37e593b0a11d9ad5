//! Structured logging for tenantguard.
//!
//! Provides configurable logging with support for:
//! - JSON and pretty-print formats
//! - Multiple output targets (stdout, file)
//! - Log rotation
//! - A separate level for forwarded audit entries
//! - Masking of sensitive data in every written line

mod config;
mod writer;

pub use config::{AUDIT_TARGET, LogConfig, LogFormat, LogOutput, LogRotation};
pub use writer::{MaskingMakeWriter, MaskingWriter};

use crate::masking::SensitiveDataMasker;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the logging system with the given configuration.
///
/// Returns guards that must be kept alive for the duration of the program
/// so buffered file output is flushed.
///
/// # Example
///
/// ```no_run
/// use tenantguard_telemetry::logging::{init_logging, LogConfig};
///
/// let config = LogConfig::default();
/// let _guards = init_logging(&config).expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directive()))
        .map_err(|e| LoggingError::InvalidConfig(e.to_string()))?;

    let masker = Arc::new(SensitiveDataMasker::new());
    let mut guards = Vec::new();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    for output in &config.outputs {
        match output {
            LogOutput::Stdout => {
                layers.push(masked_layer(config, std::io::stdout, &masker));
            }
            LogOutput::File {
                path,
                prefix,
                rotation,
            } => {
                std::fs::create_dir_all(path)?;
                let appender = match rotation {
                    LogRotation::Hourly => tracing_appender::rolling::hourly(path, prefix),
                    LogRotation::Daily => tracing_appender::rolling::daily(path, prefix),
                    LogRotation::Never => tracing_appender::rolling::never(path, prefix),
                };
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                layers.push(masked_layer(config, non_blocking, &masker));
                guards.push(guard);
            }
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guards)
}

fn masked_layer<W>(
    config: &LogConfig,
    writer: W,
    masker: &Arc<SensitiveDataMasker>,
) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if config.mask_sensitive {
        fmt_layer(config, MaskingMakeWriter::new(writer, Arc::clone(masker)))
    } else {
        fmt_layer(config, writer)
    }
}

fn fmt_layer<W>(config: &LogConfig, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(config.include_source)
        .with_line_number(config.include_source);

    match config.format {
        LogFormat::Json => base.json().flatten_event(true).boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create log directory
    #[error("Failed to create log directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid logging configuration: {0}")]
    InvalidConfig(String),

    /// A global subscriber is already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
