use super::callback::{SubmissionOutcome, SubmitCallback};
use super::error::{ConnectionError, SubmissionError};
use super::serialization::{BulkResponse, BulkSerializer};
use super::Transport;
use crate::buffer::Batch;
use crate::document::IndexDocument;
use parking_lot::Mutex;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, ClientBuilder, RequestBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use url::Url;

// Longest response body kept in a rejection error
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub endpoint: String,
    pub request_timeout: Duration,
    pub connection_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200".to_string(),
            request_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            user_agent: format!("bulk-log-appender/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Counts spawned bulk requests and wakes waiters when none remain.
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            tracker: Arc::clone(self),
        }
    }

    fn current(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Waits until no request is in flight or `timeout` passes. Returns the
    /// number still running.
    async fn drain(&self, timeout: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let idle = self.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            let remaining = self.current();
            if remaining == 0 {
                return 0;
            }
            if tokio::time::timeout_at(deadline, idle).await.is_err() {
                return self.current();
            }
        }
    }
}

// Decrements on drop, so a request task cancelled at runtime shutdown is
// still counted out.
struct InFlightGuard {
    tracker: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.tracker.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.idle.notify_waiters();
        }
    }
}

/// Submits batches of [`IndexDocument`]s to a search cluster's bulk API.
///
/// Requests run on the tokio runtime that called [`Transport::start`]; the
/// producer never waits on the network. [`Transport::stop`] waits up to the
/// request timeout for requests still running, so the batch flushed on
/// shutdown is delivered before the process exits.
pub struct BulkHttpTransport {
    client: Client,
    config: HttpTransportConfig,
    base_url: Url,
    bulk_url: Url,
    serializer: BulkSerializer,
    started: AtomicBool,
    runtime: Mutex<Option<Handle>>,
    in_flight: Arc<InFlight>,
}

impl BulkHttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, ConnectionError> {
        let base_url: Url = config.endpoint.parse().map_err(|e| {
            ConnectionError::InvalidEndpoint(format!("'{}': {}", config.endpoint, e))
        })?;

        let mut bulk_url = base_url.clone();
        if base_url.path().ends_with('/') {
            bulk_url.set_path(&format!("{}_bulk", base_url.path()));
        } else {
            bulk_url.set_path(&format!("{}/_bulk", base_url.path()));
        }

        let client = ClientBuilder::new()
            .timeout(config.request_timeout)
            .connect_timeout(config.connection_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ConnectionError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            config,
            base_url,
            bulk_url,
            serializer: BulkSerializer::new(),
            started: AtomicBool::new(false),
            runtime: Mutex::new(None),
            in_flight: Arc::new(InFlight::default()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn bulk_url(&self) -> &Url {
        &self.bulk_url
    }

    /// Requests handed to the runtime whose callback has not been settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.current()
    }

    fn build_request(&self, batch: &Batch<IndexDocument>) -> Result<RequestBuilder, SubmissionError> {
        let body = self
            .serializer
            .serialize(batch)
            .map_err(|e| SubmissionError::Serialization(e.to_string()))?;

        let batch_id = HeaderValue::from_str(batch.id())
            .map_err(|e| SubmissionError::Serialization(format!("Invalid batch ID: {e}")))?;

        Ok(self
            .client
            .post(self.bulk_url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/x-ndjson"))
            .header("x-batch-id", batch_id)
            .body(body))
    }
}

impl Transport for BulkHttpTransport {
    type Record = IndexDocument;

    async fn start(&self) -> Result<(), ConnectionError> {
        let response = self
            .client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(|e| ConnectionError::Unreachable(format!("{}: {}", self.base_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectionError::Rejected {
                status: status.as_u16(),
            });
        }

        *self.runtime.lock() = Some(Handle::current());
        self.started.store(true, Ordering::Release);
        info!(endpoint = %self.base_url, "Bulk transport connected");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ConnectionError> {
        self.started.store(false, Ordering::Release);
        self.runtime.lock().take();

        let abandoned = self.in_flight.drain(self.config.request_timeout).await;
        if abandoned > 0 {
            warn!(
                endpoint = %self.base_url,
                in_flight = abandoned,
                "Bulk requests still running after the request timeout"
            );
            return Err(ConnectionError::Shutdown(format!(
                "{abandoned} bulk request(s) still in flight"
            )));
        }

        info!(endpoint = %self.base_url, "Bulk transport stopped");
        Ok(())
    }

    fn submit_async(&self, batch: Batch<IndexDocument>, callback: SubmitCallback) {
        let runtime = if self.started.load(Ordering::Acquire) {
            self.runtime.lock().clone()
        } else {
            None
        };
        let Some(runtime) = runtime else {
            callback.failed(SubmissionError::TransportStopped {
                batch_id: batch.id().to_string(),
            });
            return;
        };

        let request = match self.build_request(&batch) {
            Ok(request) => request,
            Err(error) => {
                callback.failed(error);
                return;
            }
        };

        let batch_id = batch.id().to_string();
        let total = batch.len();
        let guard = self.in_flight.enter();

        debug!(batch_id = %batch_id, documents = total, "Posting bulk request");
        runtime.spawn(async move {
            let _guard = guard;
            let result = send_bulk(request, &batch_id, total).await;
            callback.finish(result);
        });
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

async fn send_bulk(
    request: RequestBuilder,
    batch_id: &str,
    total: usize,
) -> Result<SubmissionOutcome, SubmissionError> {
    let start = Instant::now();
    let network = |e: reqwest::Error| SubmissionError::Network {
        batch_id: batch_id.to_string(),
        message: e.to_string(),
    };

    let response = request.send().await.map_err(network)?;
    let status = response.status();
    let body = response.text().await.map_err(network)?;
    let latency = start.elapsed();

    if !status.is_success() {
        return Err(SubmissionError::Rejected {
            batch_id: batch_id.to_string(),
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    // A 2xx without a parseable body is still an accepted request
    let parsed = match serde_json::from_str::<BulkResponse>(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(batch_id = %batch_id, "Unparseable bulk response body: {}", e);
            BulkResponse::default()
        }
    };

    if parsed.errors {
        return Err(SubmissionError::PartialFailure {
            batch_id: batch_id.to_string(),
            failed: parsed.failed_items(),
            total,
        });
    }

    Ok(SubmissionOutcome {
        status: status.as_u16(),
        items: total,
        took_millis: parsed.took,
        latency,
    })
}
