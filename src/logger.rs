//! # Logger capability.
//!
//! Components never own a logging backend; they hold an `Arc<dyn Logger>` and write
//! leveled messages with key/value fields. [`TracingLogger`] is the default and forwards
//! everything to [`tracing`], so any `tracing-subscriber` setup picks it up.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO daemonic: received signal signal=SIGTERM
//! INFO daemonic: shutting down gracefully timeout=30s
//! WARN daemonic: handling record topic=orders partition=0 offset=42 error="bad payload"
//! ```

use std::fmt;

use tracing::Level;

/// One key/value pair attached to a log entry.
pub type Field<'a> = (&'a str, &'a dyn fmt::Display);

/// Structured, leveled log sink.
///
/// Only [`Logger::log`] is required; the level helpers forward to it.
pub trait Logger: Send + Sync + 'static {
    /// Writes one entry.
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]);

    fn debug(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::DEBUG, message, fields);
    }

    fn info(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::INFO, message, fields);
    }

    fn warn(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::WARN, message, fields);
    }

    fn error(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::ERROR, message, fields);
    }
}

/// [`Logger`] backed by the `tracing` macros (target `daemonic`).
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// Construct a new [`TracingLogger`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        let fields = Rendered(fields);
        if level == Level::ERROR {
            tracing::error!(target: "daemonic", "{message}{fields}");
        } else if level == Level::WARN {
            tracing::warn!(target: "daemonic", "{message}{fields}");
        } else if level == Level::INFO {
            tracing::info!(target: "daemonic", "{message}{fields}");
        } else if level == Level::DEBUG {
            tracing::debug!(target: "daemonic", "{message}{fields}");
        } else {
            tracing::trace!(target: "daemonic", "{message}{fields}");
        }
    }
}

/// Renders fields as ` key=value key=value`.
struct Rendered<'a>(&'a [Field<'a>]);

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.0 {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}
