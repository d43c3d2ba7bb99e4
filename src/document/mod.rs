pub mod mapper;

pub use mapper::{DocumentMapper, MappingError};

use serde::Serialize;

/// One record as stored: target index, optional document type and source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDocument {
    pub index: String,
    pub doc_type: Option<String>,
    pub source: serde_json::Value,
}
