use super::error::SubmissionError;
use super::reporter::ErrorReporter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What the remote store said about a batch it accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub status: u16,
    pub items: usize,
    pub took_millis: Option<u64>,
    pub latency: Duration,
}

impl SubmissionOutcome {
    pub fn accepted(items: usize) -> Self {
        Self {
            status: 200,
            items,
            took_millis: None,
            latency: Duration::ZERO,
        }
    }
}

/// Completion handle for one dispatched batch.
///
/// Settling consumes the handle, so a batch cannot be settled twice. A
/// handle dropped without being settled reports
/// [`SubmissionError::Abandoned`] instead.
pub struct SubmitCallback {
    batch_id: String,
    records: usize,
    reporter: Arc<dyn ErrorReporter>,
    settled: bool,
}

impl SubmitCallback {
    pub fn new(batch_id: impl Into<String>, records: usize, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            batch_id: batch_id.into(),
            records,
            reporter,
            settled: false,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn completed(mut self, outcome: SubmissionOutcome) {
        self.settled = true;
        debug!(
            batch_id = %self.batch_id,
            records = self.records,
            status = outcome.status,
            latency_ms = outcome.latency.as_millis() as u64,
            "Batch submitted"
        );
    }

    pub fn failed(mut self, error: SubmissionError) {
        self.settled = true;
        warn!(batch_id = %self.batch_id, records = self.records, "Batch submission failed: {}", error);
        self.reporter.report(&error);
    }

    pub fn finish(self, result: Result<SubmissionOutcome, SubmissionError>) {
        match result {
            Ok(outcome) => self.completed(outcome),
            Err(error) => self.failed(error),
        }
    }
}

impl Drop for SubmitCallback {
    fn drop(&mut self) {
        if !self.settled {
            let error = SubmissionError::Abandoned {
                batch_id: self.batch_id.clone(),
                records: self.records,
            };
            warn!(batch_id = %self.batch_id, "Batch dropped without completion");
            self.reporter.report(&error);
        }
    }
}

impl std::fmt::Debug for SubmitCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitCallback")
            .field("batch_id", &self.batch_id)
            .field("records", &self.records)
            .field("settled", &self.settled)
            .finish_non_exhaustive()
    }
}
