use crate::appender::LogAppender;
use crate::document::IndexDocument;
use crate::domain::{AppenderError, LogEvent, LogLevel};
use crate::sender::Transport;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Structured input line. Only `message` is required.
#[derive(Debug, Deserialize)]
struct InputLine {
    message: String,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    logger: Option<String>,
    #[serde(default, rename = "threadName")]
    thread_name: Option<String>,
    #[serde(default, rename = "@timestamp", with = "chrono::serde::ts_milliseconds_option")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

/// Turns one input line into an event. Blank lines yield nothing.
///
/// A JSON object with a `message` becomes that event; an unknown `level`
/// falls back to INFO. Anything else is taken verbatim as an INFO message
/// from `default_logger`.
pub fn parse_line(line: &str, default_logger: &str) -> Option<LogEvent> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.trim().is_empty() {
        return None;
    }

    let Ok(input) = serde_json::from_str::<InputLine>(trimmed) else {
        return Some(LogEvent::new(default_logger, LogLevel::Info, trimmed));
    };

    let level = input
        .level
        .as_deref()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LogLevel::Info);
    let logger = input.logger.unwrap_or_else(|| default_logger.to_string());

    let mut event = LogEvent::new(logger, level, input.message);
    if let Some(timestamp) = input.timestamp {
        event = event.with_timestamp(timestamp);
    }
    if let Some(thread_name) = input.thread_name {
        event = event.with_thread_name(thread_name);
    }
    event.properties = input.properties;
    Some(event)
}

/// Feeds lines from `input` to the appender until EOF or `shutdown`.
/// Returns the number of events appended.
pub async fn run_pipeline<T, R>(
    appender: &LogAppender<T>,
    input: R,
    logger_name: &str,
    shutdown: CancellationToken,
) -> Result<u64, AppenderError>
where
    T: Transport<Record = IndexDocument>,
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut appended: u64 = 0;

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("Shutdown requested, stopping input");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("Input reached EOF");
                    break;
                };
                if let Some(event) = parse_line(&line, logger_name) {
                    appender.append(event);
                    appended += 1;
                }
            }
        }
    }

    Ok(appended)
}
