pub mod callback;
pub mod error;
pub mod http;
pub mod reporter;
pub mod serialization;

pub use callback::{SubmissionOutcome, SubmitCallback};
pub use error::{ConnectionError, SubmissionError};
pub use http::{BulkHttpTransport, HttpTransportConfig};
pub use reporter::{ErrorReporter, NoopReporter, StderrReporter, TracingReporter};
pub use serialization::{BulkResponse, BulkSerializer, SerializationError};

use crate::buffer::Batch;
use std::future::Future;

/// Asynchronous delivery of sealed batches to the remote store.
///
/// `submit_async` must not block: it hands the batch off and returns. The
/// callback is settled exactly once, on whatever thread the transport
/// completes on.
pub trait Transport: Send + Sync + 'static {
    type Record: Send + 'static;

    fn start(&self) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Stops accepting batches. Callers may exit right after this returns,
    /// so batches already handed off should be settled first.
    fn stop(&self) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    fn submit_async(&self, batch: Batch<Self::Record>, callback: SubmitCallback);

    fn is_started(&self) -> bool;
}
