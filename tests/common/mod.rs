#![allow(dead_code)]

use bulk_log_appender::Batch;
use bulk_log_appender::sender::{
    ConnectionError, SubmissionError, SubmissionOutcome, SubmitCallback, Transport,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something the transport saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start,
    Submit(Vec<u32>),
    Stop,
}

#[derive(Default)]
struct Inner {
    calls: Mutex<Vec<Call>>,
    started: AtomicBool,
    fail_start: AtomicBool,
    fail_stop: AtomicBool,
    fail_submissions: AtomicBool,
    panic_on_submit: AtomicBool,
}

/// In-memory transport that records every call and settles callbacks inline.
/// Clones share state so a test can keep a handle after moving one into an
/// engine.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    inner: Arc<Inner>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().clone()
    }

    pub fn batches(&self) -> Vec<Vec<u32>> {
        self.inner
            .calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Submit(records) => Some(records.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn submitted(&self) -> Vec<u32> {
        self.batches().into_iter().flatten().collect()
    }

    pub fn fail_start(&self, fail: bool) {
        self.inner.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stop(&self, fail: bool) {
        self.inner.fail_stop.store(fail, Ordering::SeqCst);
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.inner.fail_submissions.store(fail, Ordering::SeqCst);
    }

    pub fn panic_on_submit(&self, panic: bool) {
        self.inner.panic_on_submit.store(panic, Ordering::SeqCst);
    }
}

impl Transport for RecordingTransport {
    type Record = u32;

    async fn start(&self) -> Result<(), ConnectionError> {
        if self.inner.fail_start.load(Ordering::SeqCst) {
            return Err(ConnectionError::Unreachable("cluster down".to_string()));
        }
        self.inner.calls.lock().push(Call::Start);
        self.inner.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ConnectionError> {
        self.inner.calls.lock().push(Call::Stop);
        self.inner.started.store(false, Ordering::SeqCst);
        if self.inner.fail_stop.load(Ordering::SeqCst) {
            return Err(ConnectionError::Shutdown("connection reset".to_string()));
        }
        Ok(())
    }

    fn submit_async(&self, batch: Batch<u32>, callback: SubmitCallback) {
        if self.inner.panic_on_submit.load(Ordering::SeqCst) {
            panic!("transport exploded");
        }

        let batch_id = batch.id().to_string();
        let records = batch.into_records();
        let count = records.len();
        self.inner.calls.lock().push(Call::Submit(records));

        if self.inner.fail_submissions.load(Ordering::SeqCst) {
            callback.failed(SubmissionError::Network {
                batch_id,
                message: "connection refused".to_string(),
            });
        } else {
            callback.completed(SubmissionOutcome::accepted(count));
        }
    }

    fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }
}
