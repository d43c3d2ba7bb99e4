use crate::buffer::Batch;
use crate::document::IndexDocument;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

// Maximum safe buffer size to prevent memory allocation issues
const MAX_SAFE_BUFFER_SIZE: usize = 100 * 1024 * 1024; // 100MB
const ESTIMATED_DOCUMENT_SIZE: usize = 500; // bytes per document
const ACTION_LINE_OVERHEAD: usize = 64; // bytes per action line

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error during serialization: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Batch is empty")]
    EmptyBatch,
}

#[derive(Serialize)]
struct BulkAction<'a> {
    index: ActionMeta<'a>,
}

#[derive(Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    doc_type: Option<&'a str>,
}

/// Body of a bulk API response. Only the fields needed to detect per-item
/// failures are read.
#[derive(Debug, Default, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: Option<u64>,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

impl BulkResponse {
    /// Number of items whose action result carries an `error`.
    pub fn failed_items(&self) -> usize {
        self.items
            .iter()
            .filter(|item| {
                item.as_object()
                    .and_then(|actions| actions.values().next())
                    .is_some_and(|result| result.get("error").is_some())
            })
            .count()
    }
}

/// Writes a batch of documents as a bulk request body: one action line and
/// one source line per document, newline terminated.
#[derive(Debug, Clone, Default)]
pub struct BulkSerializer;

impl BulkSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize(&self, batch: &Batch<IndexDocument>) -> Result<Vec<u8>, SerializationError> {
        if batch.is_empty() {
            return Err(SerializationError::EmptyBatch);
        }

        let capacity = self.estimate_serialized_size(batch).min(MAX_SAFE_BUFFER_SIZE);
        let mut buffer = Vec::with_capacity(capacity);

        for document in batch.records() {
            let action = BulkAction {
                index: ActionMeta {
                    index: &document.index,
                    doc_type: document.doc_type.as_deref(),
                },
            };
            serde_json::to_writer(&mut buffer, &action)?;
            buffer.write_all(b"\n")?;
            serde_json::to_writer(&mut buffer, &document.source)?;
            buffer.write_all(b"\n")?;
        }

        Ok(buffer)
    }

    pub fn estimate_serialized_size(&self, batch: &Batch<IndexDocument>) -> usize {
        batch
            .len()
            .saturating_mul(ESTIMATED_DOCUMENT_SIZE + ACTION_LINE_OVERHEAD)
    }
}
