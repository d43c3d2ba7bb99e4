pub mod config;
pub mod logging_system;
pub mod pipeline;
pub mod shutdown;

pub use config::{Config, ConfigError, LogLevel};
pub use logging_system::{InitializationError, LoggingSystem, setup_logging_safe};
pub use pipeline::{parse_line, run_pipeline};

use crate::appender::LogAppender;
use crate::domain::AppenderError;
use crate::engine::{FaultChannel, SchedulerFault, SubmissionEngine};
use crate::sender::{BulkHttpTransport, ErrorReporter, StderrReporter, TracingReporter};
use std::process;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const FAULT_CHANNEL_CAPACITY: usize = 64;

pub struct App {
    config: Config,
    appender: LogAppender<BulkHttpTransport>,
    faults: mpsc::Receiver<SchedulerFault>,
    shutdown: CancellationToken,
}

impl App {
    pub fn from_config(config: Config) -> Result<Self, AppenderError> {
        let reporter: Arc<dyn ErrorReporter> = if config.report_errors_to_stderr {
            Arc::new(StderrReporter)
        } else {
            Arc::new(TracingReporter)
        };

        let (fault_channel, faults) = FaultChannel::bounded(FAULT_CHANNEL_CAPACITY);
        let transport = BulkHttpTransport::new(config.transport_config())?;
        let engine = SubmissionEngine::builder(config.batch_config(), transport)
            .error_reporter(Arc::clone(&reporter))
            .fault_channel(fault_channel)
            .build();

        let mapper = config.document_mapper()?;
        let appender = LogAppender::new(mapper, Arc::new(engine), reporter);

        Ok(Self {
            config,
            appender,
            faults,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that ends [`run`](Self::run) early, as a signal would.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Starts the appender, forwards `input` until EOF or shutdown, then
    /// stops the appender so the open batch is flushed.
    pub async fn run<R>(self, input: R) -> Result<u64, AppenderError>
    where
        R: AsyncRead + Unpin,
    {
        let Self {
            config,
            appender,
            mut faults,
            shutdown,
        } = self;

        appender.start().await?;
        info!(
            endpoint = %config.endpoint,
            queue_depth = config.queue_depth,
            max_submission_interval_ms = config.max_submission_interval_ms,
            "bulk-log-appender is running"
        );

        let fault_logger = tokio::spawn(async move {
            while let Some(fault) = faults.recv().await {
                error!("{}", fault);
            }
        });
        let signals = shutdown::spawn_signal_listener(shutdown.clone());

        let outcome = run_pipeline(&appender, input, &config.logger_name, shutdown.clone()).await;
        let stopped = appender.stop().await;

        shutdown.cancel();
        signals.abort();
        fault_logger.abort();

        let appended = outcome?;
        stopped?;
        info!(events = appended, "bulk-log-appender stopped");
        Ok(appended)
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    let mut config = Config::from_args(std::env::args_os())?;
    if let Some(config_file) = config.config_file.clone() {
        eprintln!("Loading configuration from file: {}", config_file.display());
        config = Config::from_file(&config_file)?;
    }

    setup_logging_safe(config.log_level)?;
    info!("Starting bulk-log-appender v{}", get_version());

    let app = App::from_config(config)?;
    app.run(tokio::io::stdin()).await?;

    // A pending stdin read blocks runtime shutdown after a signal
    process::exit(0);
}
