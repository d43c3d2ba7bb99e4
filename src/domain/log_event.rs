use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// One event as handed over by the logging framework.
///
/// The serialized shape is the document source stored in the index: the
/// timestamp is written as epoch milliseconds under `@timestamp`, and an
/// absent throwable or an empty property map are written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub logger: String,
    #[serde(rename = "@timestamp", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "threadName")]
    pub thread_name: Option<String>,
    #[serde(rename = "locationInfo")]
    pub location: Option<String>,
    pub level: LogLevel,
    pub message: String,
    pub throwable: Option<Vec<String>>,
    #[serde(serialize_with = "empty_map_as_null")]
    pub properties: BTreeMap<String, String>,
}

impl LogEvent {
    pub fn new(logger: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            logger: logger.into(),
            timestamp: Utc::now(),
            thread_name: None,
            location: None,
            level,
            message: message.into(),
            throwable: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = Some(thread_name.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_throwable(mut self, lines: Vec<String>) -> Self {
        self.throwable = Some(lines);
        self
    }
}

fn empty_map_as_null<S>(map: &BTreeMap<String, String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if map.is_empty() {
        serializer.serialize_none()
    } else {
        map.serialize(serializer)
    }
}
