use super::config::LogLevel;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Invalid log directive '{input}': {reason}")]
    InvalidDirective { input: String, reason: String },

    #[error("Logging system initialization failed: {details}")]
    LoggingInitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

// HTTP client internals are only interesting when they misbehave
const QUIET_TARGETS: &[&str] = &["hyper", "reqwest", "h2"];

/// Builds the process-wide tracing filter and subscriber.
#[derive(Debug, Default)]
pub struct LoggingSystem {
    directives: Vec<Directive>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_directive(&mut self, input: &str) -> Result<(), InitializationError> {
        let directive =
            Directive::from_str(input).map_err(|e| InitializationError::InvalidDirective {
                input: input.to_string(),
                reason: e.to_string(),
            })?;
        self.directives.push(directive);
        Ok(())
    }

    pub fn add_default_directives(&mut self) -> Result<(), InitializationError> {
        for target in QUIET_TARGETS {
            self.add_directive(&format!("{target}=warn"))?;
        }
        Ok(())
    }

    pub fn directive_count(&self) -> usize {
        self.directives.len()
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let mut parts = Vec::with_capacity(self.directives.len() + 1);
        parts.push(default_level.as_str().to_string());
        parts.extend(self.directives.iter().map(ToString::to_string));
        parts.join(",")
    }

    /// Installs the global subscriber. Diagnostics go to stderr so they never
    /// mix with anything written to stdout.
    pub fn initialize_tracing(&self, default_level: LogLevel) -> Result<(), InitializationError> {
        let filter_string = self.build_filter_string(default_level);
        let env_filter = EnvFilter::try_new(&filter_string).map_err(|e| {
            InitializationError::LoggingInitFailed {
                details: format!("Failed to create EnvFilter with '{filter_string}'"),
                source: Box::new(e),
            }
        })?;

        let subscriber = tracing_subscriber::registry().with(env_filter).with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .compact(),
        );

        tracing::subscriber::set_global_default(subscriber).map_err(|e| {
            InitializationError::LoggingInitFailed {
                details: "Failed to set global tracing subscriber".to_string(),
                source: Box::new(e),
            }
        })
    }
}

/// Initializes tracing once per process; later calls return the first outcome.
pub fn setup_logging_safe(level: LogLevel) -> Result<(), InitializationError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let outcome = INIT.get_or_init(|| {
        let mut logging_system = LoggingSystem::new();
        logging_system
            .add_default_directives()
            .and_then(|()| logging_system.initialize_tracing(level))
            .map_err(|e| e.to_string())
    });

    outcome
        .clone()
        .map_err(|details| InitializationError::LoggingInitFailed {
            details,
            source: Box::new(std::io::Error::other("Logging initialization error")),
        })
}
