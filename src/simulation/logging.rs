//! Logging, tracing and the transition trace
//!
//! Diagnostic output goes through `tracing`. The transition trace is separate:
//! a deterministic, timestamped line per state change that tests can compare
//! between runs.

use std::io::{self, Write};
use tracing::Level;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for the application
    pub level: Level,
    /// Whether to enable JSON formatting
    pub json_format: bool,
    /// Whether to log to file
    pub log_to_file: bool,
    /// Log file directory (if logging to file)
    pub log_directory: Option<String>,
    /// Log file prefix (if logging to file)
    pub log_file_prefix: String,
    /// Whether to enable span events
    pub enable_span_events: bool,
    /// Whether to enable ansi colors in console output
    pub enable_ansi: bool,
    /// Custom environment filter
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            log_to_file: false,
            log_directory: None,
            log_file_prefix: "earthworks-sim".to_string(),
            enable_span_events: false,
            enable_ansi: true,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Enable JSON formatting
    pub fn with_json_format(mut self) -> Self {
        self.json_format = true;
        self
    }

    /// Enable file logging
    pub fn with_file_logging(mut self, directory: impl Into<String>) -> Self {
        self.log_to_file = true;
        self.log_directory = Some(directory.into());
        self
    }

    /// Set log file prefix
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_file_prefix = prefix.into();
        self
    }

    /// Enable span events
    pub fn with_span_events(mut self) -> Self {
        self.enable_span_events = true;
        self
    }

    /// Disable ANSI colors
    pub fn without_ansi(mut self) -> Self {
        self.enable_ansi = false;
        self
    }

    /// Set custom environment filter
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn span_events(&self) -> FmtSpan {
        if self.enable_span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn build_env_filter(&self) -> Result<EnvFilter, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(filter) = &self.env_filter {
            return Ok(EnvFilter::try_new(filter)?);
        }
        Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME").replace('-', "_"), self.level))
        }))
    }

    /// Initialize the global tracing subscriber
    pub fn init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let registry = Registry::default().with(self.build_env_filter()?);

        if self.log_to_file {
            let log_dir = self.log_directory.as_deref().unwrap_or("logs");
            let file_appender = rolling::daily(log_dir, &self.log_file_prefix);
            let (file_writer, file_guard) = non_blocking(file_appender);

            // Files always get JSON; the console follows `json_format`
            let file_layer =
                fmt::layer().json().with_writer(file_writer).with_span_events(self.span_events());

            if self.json_format {
                let console_layer =
                    fmt::layer().json().with_writer(io::stderr).with_span_events(self.span_events());
                registry.with(file_layer).with(console_layer).try_init()?;
            } else {
                let console_layer = fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(self.enable_ansi)
                    .with_span_events(self.span_events());
                registry.with(file_layer).with(console_layer).try_init()?;
            }

            // The writer thread must outlive main; the process exit flushes it
            std::mem::forget(file_guard);
        } else if self.json_format {
            let layer =
                fmt::layer().json().with_writer(io::stderr).with_span_events(self.span_events());
            registry.with(layer).try_init()?;
        } else {
            let layer = fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(self.enable_ansi)
                .with_span_events(self.span_events());
            registry.with(layer).try_init()?;
        }

        tracing::debug!(level = %self.level, json = self.json_format, "Logging initialized");
        Ok(())
    }

    /// Initialize logging for testing (minimal output)
    pub fn init_test() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Self::new().with_level(Level::WARN).without_ansi().init()
    }

    /// Initialize verbose logging (INFO level)
    pub fn init_verbose() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Self::new().with_level(Level::INFO).init()
    }

    /// Initialize debug logging (DEBUG level with span events)
    pub fn init_debug() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Self::new().with_level(Level::DEBUG).with_span_events().init()
    }
}

/// Macro for creating structured log events with simulation context
#[macro_export]
macro_rules! sim_event {
    ($level:ident, $message:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::$level!(
            component = "simulation",
            $($key = $value,)*
            "{}", $message
        );
    };
    ($level:ident, $message:expr) => {
        tracing::$level!(component = "simulation", "{}", $message);
    };
}

/// Macro for creating performance measurement spans
#[macro_export]
macro_rules! perf_span {
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info_span!(
            $name,
            component = "performance",
            $($key = $value,)*
        )
    };
    ($name:expr) => {
        tracing::info_span!($name, component = "performance")
    };
}

/// Timestamped record of every state transition in a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceLog {
    enabled: bool,
    lines: Vec<String>,
}

impl TraceLog {
    /// A trace that records only when `enabled`
    pub fn new(enabled: bool) -> Self {
        Self { enabled, lines: Vec::new() }
    }

    /// Whether lines are being recorded
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one transition at simulated time `time`
    pub fn record(&mut self, time: f64, message: impl AsRef<str>) {
        if !self.enabled {
            return;
        }
        let line = format!("[{:>10.3}] {}", time, message.as_ref());
        tracing::trace!(target: "earthworks_sim::trace", "{}", line);
        self.lines.push(line);
    }

    /// Recorded lines in order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of recorded lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Write every line, newline-terminated
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for line in &self.lines {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_logging_config_creation() {
        let config = LoggingConfig::new();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.json_format);
        assert!(!config.log_to_file);
        assert!(config.log_directory.is_none());
        assert_eq!(config.log_file_prefix, "earthworks-sim");
        assert!(!config.enable_span_events);
        assert!(config.enable_ansi);
        assert!(config.env_filter.is_none());
    }

    #[test]
    fn test_logging_config_builder_pattern() {
        let config = LoggingConfig::new()
            .with_level(Level::DEBUG)
            .with_json_format()
            .with_file_logging("test_logs")
            .with_file_prefix("test_prefix")
            .with_span_events()
            .without_ansi()
            .with_env_filter("debug");

        assert_eq!(config.level, Level::DEBUG);
        assert!(config.json_format);
        assert!(config.log_to_file);
        assert_eq!(config.log_directory, Some("test_logs".to_string()));
        assert_eq!(config.log_file_prefix, "test_prefix");
        assert!(config.enable_span_events);
        assert!(!config.enable_ansi);
        assert_eq!(config.env_filter, Some("debug".to_string()));
    }

    #[test]
    fn test_invalid_env_filter_is_reported() {
        let result = LoggingConfig::new().with_env_filter("earthworks_sim=loudest").init();
        assert!(result.is_err());
    }

    #[test]
    fn test_disabled_trace_records_nothing() {
        let mut trace = TraceLog::new(false);
        trace.record(1.0, "VEH_0 starts loading");
        assert!(trace.is_empty());
    }

    #[test]
    fn test_trace_lines_are_timestamped() {
        let mut trace = TraceLog::new(true);
        trace.record(12.5, "VEH_1 waiting -> loading");
        trace.record(14.0, "VEH_1 loading -> traveling");

        assert_eq!(trace.len(), 2);
        assert_eq!(trace.lines()[0], "[    12.500] VEH_1 waiting -> loading");

        let mut out = Vec::new();
        trace.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with("traveling\n"));
    }
}
