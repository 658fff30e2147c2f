//! JSONL and console logging for the wormhole MANET simulation
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines, one event per line (default)
//! - **Pretty Output**: Human-readable console output for development
//! - **Node Context**: Events logged inside a node's callback carry the node
//!   id and the run id as `node` span fields
//! - **File Output**: Single-file, daily or hourly rotation via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use manet_logging::{ManetSubscriberBuilder, LogConfig};
//!
//! // JSONL to console
//! let _guard = ManetSubscriberBuilder::new().init()?;
//!
//! // Development mode with pretty human-readable output
//! let _guard = ManetSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init()?;
//! ```

pub mod config;
pub mod context;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{NodeContextData, NodeContextGuard};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use thiserror::Error;
use tracing::Subscriber;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::{DefaultFields, Format, Full, Json, JsonFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Builder for configuring and initializing the logging subscriber
///
/// By default, console output uses JSONL format. Use
/// [`LogConfig::development()`] for human-readable pretty output.
pub struct ManetSubscriberBuilder {
    config: LogConfig,
}

impl ManetSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Switch console output between pretty and JSONL
    pub fn with_pretty_console(mut self, pretty: bool) -> Self {
        self.config.console.pretty = pretty;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally
    ///
    /// The returned guard must be kept alive while file output is in use.
    pub fn init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let (file_sink, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = file_writer(file_config)?;
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        let jsonl = &self.config.jsonl;
        let console = &self.config.console;

        let pretty_console = (console.enabled && console.pretty)
            .then(|| pretty_layer(console.ansi, std::io::stdout));
        let jsonl_console =
            (console.enabled && !console.pretty).then(|| jsonl_layer(jsonl, std::io::stdout));
        let file_layer = file_sink.map(|writer| jsonl_layer(jsonl, writer));

        Registry::default()
            .with(env_filter)
            .with(pretty_console)
            .with(jsonl_console)
            .with(file_layer)
            .try_init()?;

        Ok(guard)
    }
}

impl Default for ManetSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable layer; span fields print as `node{node=n1 run_id=..}`
pub fn pretty_layer<S, W>(
    ansi: bool,
    writer: W,
) -> tracing_subscriber::fmt::Layer<S, DefaultFields, Format<Full>, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_writer(writer)
}

/// JSONL layer; the current span's fields land under `span`
pub fn jsonl_layer<S, W>(
    jsonl: &JsonlConfig,
    writer: W,
) -> tracing_subscriber::fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(jsonl.include_current_span)
        .with_span_list(jsonl.include_spans)
        .flatten_event(jsonl.flatten_events)
        .with_file(jsonl.include_location)
        .with_line_number(jsonl.include_location)
        .with_writer(writer)
}

/// Single files are truncated per run; rotating ones append
fn file_writer(file_config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&file_config.directory)?;
    let writer = match file_config.rotation {
        RotationStrategy::Never => {
            let path = file_config
                .directory
                .join(format!("{}.log", file_config.prefix));
            tracing_appender::non_blocking(File::create(path)?)
        }
        RotationStrategy::Daily => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::DAILY,
            &file_config.directory,
            &file_config.prefix,
        )),
        RotationStrategy::Hourly => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::HOURLY,
            &file_config.directory,
            &file_config.prefix,
        )),
    };
    Ok(writer)
}

/// Initialize logging for testing (minimal output); ignores a subscriber
/// that is already installed
pub fn init_testing() {
    let _ = ManetSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .init();
}
