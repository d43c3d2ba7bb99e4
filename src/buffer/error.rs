use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Queue depth must be greater than 0")]
    ZeroQueueDepth,

    #[error("Max submission interval must be at least 2ms, got {millis}ms")]
    IntervalTooShort { millis: u64 },
}
