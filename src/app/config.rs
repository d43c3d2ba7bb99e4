use crate::buffer::BatchConfig;
use crate::document::DocumentMapper;
use crate::document::mapper::DEFAULT_INDEX_DATE_FORMAT;
use crate::sender::HttpTransportConfig;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

/// Verbosity of this process's own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Search cluster endpoint URL
    #[arg(long, env = "BULK_ENDPOINT", default_value = "http://localhost:9200")]
    pub endpoint: String,

    /// Records per batch before it is sealed and submitted
    #[arg(long, env = "QUEUE_DEPTH", default_value = "100")]
    pub queue_depth: usize,

    /// Longest time in milliseconds a record may wait before submission
    #[arg(long, env = "MAX_SUBMISSION_INTERVAL_MS", default_value = "5000")]
    pub max_submission_interval_ms: u64,

    /// Prefix of the date-stamped index name
    #[arg(long, env = "INDEX_PREFIX", default_value = "logs-")]
    pub index_prefix: String,

    /// chrono format appended to the index prefix
    #[arg(long, env = "INDEX_DATE_FORMAT", default_value = DEFAULT_INDEX_DATE_FORMAT)]
    pub index_date_format: String,

    /// Document type written in bulk action lines (omitted when unset)
    #[arg(long, env = "DOC_TYPE")]
    pub doc_type: Option<String>,

    /// Logger name for events read from plain-text input lines
    #[arg(long, env = "LOGGER_NAME", default_value = "stdin")]
    pub logger_name: String,

    /// JSON object of string properties added to every event
    #[arg(long, env = "CONTEXT_PROPERTIES")]
    pub context_properties_json: Option<String>,

    /// Print submission failures to stderr instead of the diagnostic log
    #[arg(long, env = "REPORT_ERRORS_TO_STDERR")]
    pub report_errors_to_stderr: bool,

    /// HTTP request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub max_submission_interval: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200".to_string(),
            queue_depth: 100,
            max_submission_interval_ms: 5000,
            index_prefix: "logs-".to_string(),
            index_date_format: DEFAULT_INDEX_DATE_FORMAT.to_string(),
            doc_type: None,
            logger_name: "stdin".to_string(),
            context_properties_json: None,
            report_errors_to_stderr: false,
            request_timeout_secs: 30,
            log_level: LogLevel::Info,
            config_file: None,
            max_submission_interval: Duration::from_millis(5000),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_string("BULK_ENDPOINT", &mut config.endpoint);
        load_env_var("QUEUE_DEPTH", &mut config.queue_depth)?;
        load_env_var(
            "MAX_SUBMISSION_INTERVAL_MS",
            &mut config.max_submission_interval_ms,
        )?;
        load_env_string("INDEX_PREFIX", &mut config.index_prefix);
        load_env_string("INDEX_DATE_FORMAT", &mut config.index_date_format);
        load_env_string_opt("DOC_TYPE", &mut config.doc_type);
        load_env_string("LOGGER_NAME", &mut config.logger_name);
        load_env_string_opt("CONTEXT_PROPERTIES", &mut config.context_properties_json);
        load_env_var("REPORT_ERRORS_TO_STDERR", &mut config.report_errors_to_stderr)?;
        load_env_var("REQUEST_TIMEOUT_SECS", &mut config.request_timeout_secs)?;

        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            config.log_level = LogLevel::from_str(&log_level, true)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {log_level}")))?;
        }

        if let Ok(path) = std::env::var("CONFIG_FILE") {
            config.config_file = Some(PathBuf::from(path));
        }

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.max_submission_interval = Duration::from_millis(self.max_submission_interval_ms);
        self.request_timeout = Duration::from_secs(self.request_timeout_secs);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid endpoint URL '{}': {}", self.endpoint, e))
        })?;

        self.batch_config()
            .validate()
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        // Date format and context JSON are checked by building the mapper
        self.document_mapper()?;

        Ok(())
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::new(self.queue_depth, self.max_submission_interval_ms)
    }

    pub fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            endpoint: self.endpoint.clone(),
            request_timeout: self.request_timeout,
            ..HttpTransportConfig::default()
        }
    }

    /// Mapper for this configuration. Host name and working directory are
    /// added as context properties alongside the configured ones.
    pub fn document_mapper(&self) -> Result<DocumentMapper, ConfigError> {
        let invalid = |e: crate::document::MappingError| ConfigError::InvalidConfig(e.to_string());

        let mut mapper = DocumentMapper::new(
            self.index_prefix.clone(),
            self.index_date_format.clone(),
            self.doc_type.clone(),
        )
        .map_err(invalid)?
        .with_host_and_cwd();

        if let Some(json) = &self.context_properties_json {
            mapper = mapper.with_context_json(json).map_err(invalid)?;
        }
        Ok(mapper)
    }
}

fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

fn load_env_string_opt(name: &str, target: &mut Option<String>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(value);
    }
}

fn load_env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}
