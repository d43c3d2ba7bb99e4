use super::error::{EngineError, EngineState};
use super::fault::FaultChannel;
use super::scheduler::FlushScheduler;
use crate::buffer::{Batch, BatchAccumulator, BatchConfig, Clock, Intake, MonotonicClock};
use crate::sender::{ErrorReporter, StderrReporter, SubmitCallback, Transport};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct Shared<T: Transport> {
    accumulator: BatchAccumulator<T::Record>,
    transport: T,
    reporter: Arc<dyn ErrorReporter>,
    // Held shared from "seal" through "handed to transport"; stop() takes it
    // exclusively so the transport is never stopped under a pending handoff.
    handoff: RwLock<()>,
}

impl<T: Transport> Shared<T> {
    fn dispatch(&self, batch: Batch<T::Record>) {
        debug!(
            batch_id = %batch.id(),
            records = batch.len(),
            reason = ?batch.reason(),
            "Dispatching batch"
        );
        let callback = SubmitCallback::new(batch.id(), batch.len(), Arc::clone(&self.reporter));
        self.transport.submit_async(batch, callback);
    }

    fn flush_due(&self) {
        let _handoff = self.handoff.read();
        if let Some(batch) = self.accumulator.seal_if_due() {
            self.dispatch(batch);
        }
    }
}

/// Batches records and hands sealed batches to a [`Transport`].
///
/// Lifecycle is `Created -> Started -> Stopped`:
///
/// - [`start`](Self::start) validates the configuration, starts the
///   transport, spawns the flush scheduler on the current tokio runtime and
///   only then begins accepting records. If the transport fails to start the
///   engine stays `Created` and `start` may be retried.
/// - [`submit`](Self::submit) is synchronous and never waits on the network.
///   Outside the `Started` state it returns [`EngineError::NotAccepting`] and
///   drops the record.
/// - [`stop`](Self::stop) stops accepting, seals what is open, hands it to
///   the transport and then stops the transport. Whether requests already
///   in flight are awaited is up to the transport. Calling it before `start`
///   leaves the engine `Created`; calling it again after a stop does nothing.
///
/// The batch configuration is fixed at construction.
pub struct SubmissionEngine<T: Transport> {
    shared: Arc<Shared<T>>,
    config: BatchConfig,
    faults: FaultChannel,
    scheduler: Mutex<Option<FlushScheduler>>,
}

pub struct EngineBuilder<T: Transport> {
    config: BatchConfig,
    transport: T,
    reporter: Arc<dyn ErrorReporter>,
    clock: Arc<dyn Clock>,
    faults: FaultChannel,
}

impl<T: Transport> EngineBuilder<T> {
    /// Where failed submissions are reported. Defaults to stderr.
    pub fn error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Where scheduler faults are raised. Defaults to the error log.
    pub fn fault_channel(mut self, faults: FaultChannel) -> Self {
        self.faults = faults;
        self
    }

    pub fn build(self) -> SubmissionEngine<T> {
        SubmissionEngine {
            shared: Arc::new(Shared {
                accumulator: BatchAccumulator::new(&self.config, self.clock),
                transport: self.transport,
                reporter: self.reporter,
                handoff: RwLock::new(()),
            }),
            config: self.config,
            faults: self.faults,
            scheduler: Mutex::new(None),
        }
    }
}

impl<T: Transport> SubmissionEngine<T> {
    pub fn new(config: BatchConfig, transport: T) -> Self {
        Self::builder(config, transport).build()
    }

    pub fn builder(config: BatchConfig, transport: T) -> EngineBuilder<T> {
        EngineBuilder {
            config,
            transport,
            reporter: Arc::new(StderrReporter),
            clock: Arc::new(MonotonicClock::new()),
            faults: FaultChannel::default(),
        }
    }

    pub async fn start(&self) -> Result<(), EngineError> {
        let mut scheduler = self.scheduler.lock().await;
        match self.state() {
            EngineState::Created => {}
            EngineState::Started => return Err(EngineError::AlreadyStarted),
            EngineState::Stopped => return Err(EngineError::Terminated),
        }

        self.config.validate()?;
        self.shared.transport.start().await?;

        let shared = Arc::clone(&self.shared);
        *scheduler = Some(FlushScheduler::spawn(
            self.config.scheduler_period(),
            self.faults.clone(),
            move || shared.flush_due(),
        ));
        self.shared.accumulator.open();

        info!(
            queue_depth = self.config.queue_depth,
            max_submission_interval_ms = self.config.max_submission_interval_millis(),
            "Submission engine started"
        );
        Ok(())
    }

    pub fn submit(&self, record: T::Record) -> Result<(), EngineError> {
        let _handoff = self.shared.handoff.read();
        match self.shared.accumulator.append(record) {
            Ok(Some(batch)) => {
                self.shared.dispatch(batch);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(rejected) => Err(EngineError::NotAccepting {
                state: rejected.intake.into(),
            }),
        }
    }

    pub async fn stop(&self) -> Result<(), EngineError> {
        let mut scheduler = self.scheduler.lock().await;
        if self.state() == EngineState::Created {
            debug!("Stop on an engine that was never started");
            return Ok(());
        }
        if let Some(scheduler) = scheduler.take() {
            scheduler.shutdown().await;
        }

        let (previous, remaining) = self.shared.accumulator.close();
        if previous != Intake::Open {
            debug!("Stop on an engine that was already stopped");
            return Ok(());
        }

        if let Some(batch) = remaining {
            info!(records = batch.len(), "Flushing open batch before shutdown");
            self.shared.dispatch(batch);
        }

        // Wait out producers that sealed a batch just before the close.
        drop(self.shared.handoff.write());

        self.shared.transport.stop().await?;
        info!("Submission engine stopped");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.state() == EngineState::Started && self.shared.transport.is_started()
    }

    pub fn state(&self) -> EngineState {
        self.shared.accumulator.intake().into()
    }

    /// Records waiting in the open batch.
    pub fn pending(&self) -> usize {
        self.shared.accumulator.pending()
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.shared.transport
    }
}

impl<T: Transport> Drop for SubmissionEngine<T> {
    fn drop(&mut self) {
        if self.state() == EngineState::Started {
            warn!(
                pending = self.pending(),
                "Submission engine dropped without stop(); open batch discarded"
            );
        }
    }
}
