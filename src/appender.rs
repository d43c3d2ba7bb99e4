use crate::document::{DocumentMapper, IndexDocument};
use crate::domain::LogEvent;
use crate::engine::{EngineError, SubmissionEngine};
use crate::sender::{ErrorReporter, SubmissionError, Transport};
use std::sync::Arc;
use tracing::debug;

/// Logging-framework facing entry point: maps events to index documents and
/// feeds them to a [`SubmissionEngine`].
///
/// `append` never fails towards the caller. Events that cannot be mapped go
/// to the error reporter; events arriving outside the running window are
/// dropped with a debug log.
pub struct LogAppender<T>
where
    T: Transport<Record = IndexDocument>,
{
    mapper: DocumentMapper,
    engine: Arc<SubmissionEngine<T>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl<T> LogAppender<T>
where
    T: Transport<Record = IndexDocument>,
{
    pub fn new(
        mapper: DocumentMapper,
        engine: Arc<SubmissionEngine<T>>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            mapper,
            engine,
            reporter,
        }
    }

    pub async fn start(&self) -> Result<(), EngineError> {
        self.engine.start().await
    }

    pub async fn stop(&self) -> Result<(), EngineError> {
        self.engine.stop().await
    }

    pub fn is_started(&self) -> bool {
        self.engine.is_started()
    }

    pub fn append(&self, event: LogEvent) {
        let document = match self.mapper.map(event) {
            Ok(document) => document,
            Err(e) => {
                self.reporter
                    .report(&SubmissionError::Serialization(e.to_string()));
                return;
            }
        };

        if let Err(e) = self.engine.submit(document) {
            debug!("Event dropped: {}", e);
        }
    }

    pub fn engine(&self) -> &SubmissionEngine<T> {
        &self.engine
    }

    pub fn mapper(&self) -> &DocumentMapper {
        &self.mapper
    }
}
