//! Logging bootstrap for the Solarman tools
//!
//! Console output only. `RUST_LOG` always takes precedence over the level
//! passed in by the caller.

use crate::error::{Error, Result};
use tracing::Level;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2026-01-01T00:00:00.000000Z [INFO] Logger connected: 10.0.0.5:8899`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m",
                Level::DEBUG => "\x1b[34m",
                Level::INFO => "\x1b[32m",
                Level::WARN => "\x1b[33m",
                Level::ERROR => "\x1b[31m",
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Console logging options
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter, e.g. `info` or `info,solarman=debug`
    pub level: String,
    /// One JSON object per line instead of the bracketed text format
    pub json: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            ansi: true,
        }
    }
}

/// Build the filter: `RUST_LOG` if set and valid, otherwise `level`
fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| Error::Logging(format!("Invalid log level '{}': {}", level, e))),
    }
}

/// Install the global subscriber
///
/// Fails if the level is not a valid filter or a subscriber is already set.
pub fn init_with_config(config: LogConfig) -> Result<()> {
    let filter = build_filter(&config.level)?;

    let result = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(config.ansi)
                    .event_format(BracketedLevelFormat),
            )
            .try_init()
    };

    result.map_err(|e| Error::Logging(e.to_string()))
}

/// Install the bracketed console subscriber at the given level
pub fn init(level: &str) -> Result<()> {
    init_with_config(LogConfig {
        level: level.to_string(),
        ..Default::default()
    })
}
