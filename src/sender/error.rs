use thiserror::Error;

/// Failure to bring the transport up or down. Surfaced synchronously from
/// the engine's `start`/`stop`.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("Endpoint rejected connection check: HTTP {status}")]
    Rejected { status: u16 },
    #[error("Transport shutdown failed: {0}")]
    Shutdown(String),
}

/// Failure of one batch. Delivered only through the `ErrorReporter`, never
/// to the producer that submitted the records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Batch {batch_id} rejected: HTTP {status} - {body}")]
    Rejected {
        batch_id: String,
        status: u16,
        body: String,
    },
    #[error("Batch {batch_id}: {failed} of {total} documents failed to index")]
    PartialFailure {
        batch_id: String,
        failed: usize,
        total: usize,
    },
    #[error("Network error submitting batch {batch_id}: {message}")]
    Network { batch_id: String, message: String },
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Transport stopped, batch {batch_id} not submitted")]
    TransportStopped { batch_id: String },
    #[error("Batch {batch_id} ({records} records) abandoned without completion")]
    Abandoned { batch_id: String, records: usize },
}
