use super::IndexDocument;
use crate::domain::LogEvent;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_INDEX_DATE_FORMAT: &str = "%Y.%m.%d";

const HOST_PROPERTY: &str = "host";
const CWD_PROPERTY: &str = "cwd";

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("Invalid index date format '{0}'")]
    InvalidDateFormat(String),
    #[error("Invalid context properties: {0}")]
    InvalidProperties(String),
    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Turns log events into documents for a date-stamped index.
///
/// The index name is the prefix followed by the event timestamp rendered
/// with a chrono format string, so `logs-` and `%Y.%m.%d` give one index per
/// day (`logs-2016.01.31`). Context properties are added to every event
/// without overriding properties the event already carries.
#[derive(Debug, Clone)]
pub struct DocumentMapper {
    index_prefix: String,
    date_format: String,
    doc_type: Option<String>,
    context: BTreeMap<String, String>,
}

impl DocumentMapper {
    pub fn new(
        index_prefix: impl Into<String>,
        date_format: impl Into<String>,
        doc_type: Option<String>,
    ) -> Result<Self, MappingError> {
        let date_format = date_format.into();
        validate_date_format(&date_format)?;

        Ok(Self {
            index_prefix: index_prefix.into(),
            date_format,
            doc_type: doc_type.filter(|t| !t.is_empty()),
            context: BTreeMap::new(),
        })
    }

    pub fn with_context_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Adds context properties from a JSON object of string values.
    pub fn with_context_json(mut self, json: &str) -> Result<Self, MappingError> {
        let properties: BTreeMap<String, String> = serde_json::from_str(json)
            .map_err(|e| MappingError::InvalidProperties(e.to_string()))?;
        self.context.extend(properties);
        Ok(self)
    }

    /// Adds the local host name and working directory as context properties.
    pub fn with_host_and_cwd(mut self) -> Self {
        match hostname::get() {
            Ok(host) => {
                self.context
                    .insert(HOST_PROPERTY.to_string(), host.to_string_lossy().into_owned());
            }
            Err(e) => tracing::warn!("Could not resolve host name: {}", e),
        }
        match std::env::current_dir() {
            Ok(cwd) => {
                self.context
                    .insert(CWD_PROPERTY.to_string(), cwd.display().to_string());
            }
            Err(e) => tracing::warn!("Could not resolve working directory: {}", e),
        }
        self
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    pub fn index_name(&self, timestamp: &DateTime<Utc>) -> String {
        format!("{}{}", self.index_prefix, timestamp.format(&self.date_format))
    }

    pub fn map(&self, mut event: LogEvent) -> Result<IndexDocument, MappingError> {
        for (key, value) in &self.context {
            event
                .properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        Ok(IndexDocument {
            index: self.index_name(&event.timestamp),
            doc_type: self.doc_type.clone(),
            source: serde_json::to_value(&event)?,
        })
    }
}

// chrono panics when displaying a format with invalid specifiers
fn validate_date_format(format: &str) -> Result<(), MappingError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(MappingError::InvalidDateFormat(format.to_string()));
    }
    Ok(())
}
