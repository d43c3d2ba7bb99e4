//! Domain layer for bulk-log-appender.
//!
//! Contains the canonical types shared across all modules:
//! - `LogEvent`: One event handed over by the logging framework
//! - `LogLevel`: Event severity (Trace/Debug/Info/Warn/Error/Fatal)
//! - `AppenderError`: Top-level error type

pub mod error;
pub mod log_event;
pub mod log_level;

pub use error::AppenderError;
pub use log_event::LogEvent;
pub use log_level::LogLevel;
