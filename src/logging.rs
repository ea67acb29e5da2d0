//! Logging infrastructure - structured tracing throughout the runtime
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels per module (`adi::store`, `adi::dispatch`, ...)
//! - Zero-cost when disabled
//! - Console or file output, human-readable or JSON

use crate::config::LoggingConfig;
use once_cell::sync::OnceCell;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path; console when absent
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // ADI_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("ADI_LOG_LEVEL") {
            config.level = parse_level(&level_str);
        }

        // ADI_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("ADI_LOG_FILE") {
            config.log_path = Some(path);
        }

        // ADI_LOG_JSON: enable JSON format
        config.json_format = std::env::var("ADI_LOG_JSON").is_ok();

        // ADI_LOG_SPANS: show span events
        config.show_spans = std::env::var("ADI_LOG_SPANS").is_ok();

        config
    }

    /// Create config from the `[logging]` section of `adi.toml`
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        Self {
            level: parse_level(&settings.level),
            log_path: settings.file.clone(),
            json_format: settings.json,
            show_spans: false,
        }
    }

    /// Errors only
    pub fn quiet() -> Self {
        Self {
            level: Level::ERROR,
            ..Self::default()
        }
    }

    /// Verbose logging with span events
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            show_spans: true,
            ..Self::default()
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with environment configuration
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration; later calls are ignored
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_env("ADI_LOG").unwrap_or_else(|_| {
            EnvFilter::new(format!("adi={}", config.level.as_str().to_lowercase()))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match &config.log_path {
            Some(path) => {
                let path = Path::new(path);
                let directory = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let file_name = path.file_name().unwrap_or_else(|| OsStr::new("adi.log"));
                let appender = tracing_appender::rolling::never(directory, file_name);

                if config.json_format {
                    fmt::layer()
                        .json()
                        .with_writer(appender)
                        .with_span_events(span_events)
                        .boxed()
                } else {
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(appender)
                        .with_span_events(span_events)
                        .boxed()
                }
            }
            None => {
                if config.json_format {
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_span_events(span_events)
                        .boxed()
                } else {
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_span_events(span_events)
                        .with_target(true)
                        .with_line_number(cfg!(debug_assertions))
                        .boxed()
                }
            }
        };

        // Another subscriber may already be installed (tests, host apps)
        let _ = tracing_subscriber::registry()
            .with(layer)
            .with(env_filter)
            .try_init();
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Runtime-specific logging functions
// ============================================================================

/// Log class registration
pub fn log_class_defined(name: &str, primitive: bool, slots: usize) {
    debug!(
        target: "adi::class",
        event = "class_defined",
        class = name,
        primitive = primitive,
        slots = slots,
        "Class defined"
    );
}

/// Log object creation
#[inline]
pub fn log_object_created(class: &str, elements: usize) {
    trace!(
        target: "adi::store",
        event = "object_created",
        class = class,
        elements = elements,
        "Object created"
    );
}

/// Log object destruction
#[inline]
pub fn log_object_destroyed(class: &str, retained: bool) {
    trace!(
        target: "adi::store",
        event = "object_destroyed",
        class = class,
        retained = retained,
        "Object destroyed"
    );
}

/// Log basic block growth
pub fn log_block_grown(class: &str, slots: usize, blocks: usize) {
    debug!(
        target: "adi::store",
        event = "block_grown",
        class = class,
        slots = slots,
        blocks = blocks,
        "Basic block allocated"
    );
}

/// Log bad-value substitution during a transfer
pub fn log_conversion_errors(from: &str, to: &str, count: usize) {
    warn!(
        target: "adi::mta",
        event = "conversion_errors",
        from = from,
        to = to,
        count = count,
        "Data conversion errors"
    );
}

/// Log generic function invocation
#[inline]
pub fn log_dispatch(generic: &str, args: usize, applicable: usize) {
    debug!(
        target: "adi::dispatch",
        event = "dispatch",
        generic = generic,
        args = args,
        applicable = applicable,
        "Generic invoked"
    );
}

/// Log context mark/release
pub fn log_context(action: &str, depth: usize) {
    trace!(
        target: "adi::context",
        event = "context",
        action = action,
        depth = depth,
        "Context stack changed"
    );
}

/// Log runtime startup/teardown
pub fn log_lifecycle(action: &str, classes: usize, objects: usize) {
    info!(
        event = "lifecycle",
        action = action,
        classes = classes,
        live_objects = objects,
        "Runtime lifecycle"
    );
}
