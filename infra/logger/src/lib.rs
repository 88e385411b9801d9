//! # Logger
//!
//! Installs the global `tracing` subscriber from the `[logging]` configuration
//! section: an `EnvFilter` (level, extra directives, `RUST_LOG`), a compact ANSI
//! console layer and, when a directory is configured, a non-blocking daily
//! rolling file layer that can emit JSON.
//!
//! ## Example
//!
//! ```rust
//! use fauna_domain::config::LoggingConfig;
//! use fauna_logger::Logger;
//!
//! let config = LoggingConfig { filter: Some("sqlx=warn".into()), ..LoggingConfig::default() };
//! let _logger = Logger::builder().name("fauna").config(&config).init().unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;

use fauna_domain::config::LoggingConfig;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_SUFFIX: &str = "log";

/// Configures and installs the global subscriber.
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug)]
pub struct LoggerBuilder {
    name: String,
    console: bool,
    level: String,
    filter: Option<String>,
    directory: Option<PathBuf>,
    json: bool,
    max_files: usize,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            console: true,
            level: String::new(),
            filter: None,
            directory: None,
            json: false,
            max_files: 0,
        }
        .config(&LoggingConfig::default())
    }
}

impl LoggerBuilder {
    /// Prefix of rolling files, e.g. `fauna.2026-10-18.log`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Copies every setting of the `[logging]` section.
    pub fn config(mut self, config: &LoggingConfig) -> Self {
        self.level.clone_from(&config.level);
        self.filter.clone_from(&config.filter);
        self.directory.clone_from(&config.directory);
        self.json = config.json;
        self.max_files = config.max_files;
        self
    }

    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level.to_string();
        self
    }

    /// Extra directives such as `fauna_spawns=debug,sqlx=warn`.
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub const fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    pub const fn json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    /// Installs the subscriber.
    ///
    /// Keep the returned [`Logger`] alive: dropping it stops the file writer.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for an unknown level, a bad filter,
    ///   an empty name, zero retained files or when no layer is enabled.
    /// * [`LoggerError::Subscriber`] if a global subscriber already exists.
    pub fn init(self) -> Result<Logger, LoggerError> {
        self.validate()?;
        let filter = self.env_filter_layer()?;

        let mut layers = Vec::new();
        if self.console {
            layers.push(layer().compact().with_ansi(true).boxed());
        }

        let guard = match &self.directory {
            Some(directory) => {
                fs::create_dir_all(directory)
                    .context(format!("Creating {}", directory.display()))?;

                let appender = RollingFileAppender::builder()
                    .rotation(Rotation::DAILY)
                    .filename_prefix(&self.name)
                    .filename_suffix(LOG_FILE_SUFFIX)
                    .max_log_files(self.max_files)
                    .build(directory)?;
                let (writer, guard) = tracing_appender::non_blocking(appender);

                let file = layer().with_writer(writer).with_ansi(false);
                layers.push(if self.json { file.json().boxed() } else { file.boxed() });
                Some(guard)
            }
            None => None,
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No logging layers enabled, turn on the console or set a directory".into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(filter).with(layers).try_init()?;
        tracing::debug!(name = %self.name, file = self.directory.is_some(), "Logger initialized");

        Ok(Logger { guard })
    }

    fn validate(&self) -> Result<(), LoggerError> {
        if self.name.trim().is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "Logger name cannot be empty".into(),
                context: None,
            });
        }
        if self.directory.is_some() && self.max_files == 0 {
            return Err(LoggerError::InvalidConfiguration {
                message: "max_files must be greater than zero".into(),
                context: None,
            });
        }
        Ok(())
    }

    fn env_filter_layer(&self) -> Result<EnvFilter, LoggerError> {
        let level = LevelFilter::from_str(&self.level).map_err(|e| {
            LoggerError::InvalidConfiguration {
                message: format!("Unknown level '{}': {e}", self.level).into(),
                context: None,
            }
        })?;

        let builder = EnvFilter::builder().with_default_directive(level.into());
        match &self.filter {
            Some(filter) => builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid env filter '{filter}': {e}").into(),
                context: None,
            }),
            None => Ok(builder.from_env_lossy()),
        }
    }
}

/// Handle to the installed subscriber; owns the file writer's worker guard.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// `true` when a rolling file layer is active.
    #[must_use]
    pub const fn writes_files(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_copies_logging_section() {
        let config = LoggingConfig {
            level: "debug".into(),
            filter: Some("fauna=trace".into()),
            directory: Some(PathBuf::from("logs")),
            json: true,
            max_files: 3,
        };
        let builder = Logger::builder().config(&config);

        assert_eq!(builder.level, "debug");
        assert_eq!(builder.filter.as_deref(), Some("fauna=trace"));
        assert_eq!(builder.directory, Some(PathBuf::from("logs")));
        assert!(builder.json);
        assert_eq!(builder.max_files, 3);
        assert!(builder.console);
    }

    #[test]
    fn unknown_level_is_rejected_before_install() {
        let builder = LoggerBuilder { level: "loud".into(), ..Logger::builder().name("bad-level") };
        let err = builder.init().expect_err("must fail");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn no_layers_is_rejected() {
        let err = Logger::builder().name("silent").console(false).init().expect_err("must fail");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn bad_filter_is_rejected() {
        let err =
            Logger::builder().name("bad-filter").env_filter("fauna=loudest").init().expect_err("must fail");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }
}
