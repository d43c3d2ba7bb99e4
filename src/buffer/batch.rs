use super::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Why a batch was sealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SealReason {
    /// The batch reached the configured queue depth.
    SizeBased,
    /// The batch went stale relative to the max submission interval.
    TimeBased,
    /// The engine was stopping and flushed whatever was open.
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of records in one batch.
    pub queue_depth: usize,
    /// Upper bound on how stale an open batch may become.
    #[serde(with = "duration_millis")]
    pub max_submission_interval: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            queue_depth: 100,
            max_submission_interval: Duration::from_millis(5_000),
        }
    }
}

impl BatchConfig {
    pub fn new(queue_depth: usize, max_submission_interval_ms: u64) -> Self {
        Self {
            queue_depth,
            max_submission_interval: Duration::from_millis(max_submission_interval_ms),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.queue_depth == 0 {
            return Err(ConfigurationError::ZeroQueueDepth);
        }

        // The scheduler period is half the interval and must not round to zero.
        let millis = self.max_submission_interval_millis();
        if millis < 2 {
            return Err(ConfigurationError::IntervalTooShort { millis });
        }

        Ok(())
    }

    pub fn max_submission_interval_millis(&self) -> u64 {
        self.max_submission_interval.as_millis() as u64
    }

    /// Age after which a non-empty batch is sealed, and the scheduler period.
    ///
    /// Checking at twice the configured rate keeps the worst-case latency of a
    /// lone record near 1.5x the max interval.
    pub fn seal_after_millis(&self) -> u64 {
        self.max_submission_interval_millis() / 2
    }

    pub fn scheduler_period(&self) -> Duration {
        Duration::from_millis(self.seal_after_millis())
    }
}

/// A sealed, immutable group of records handed to the transport in one call.
#[derive(Debug)]
pub struct Batch<R> {
    id: String,
    records: Vec<R>,
    reason: SealReason,
    sealed_at_millis: u64,
}

impl<R> Batch<R> {
    pub fn new(records: Vec<R>, reason: SealReason, sealed_at_millis: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            records,
            reason,
            sealed_at_millis,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    pub fn reason(&self) -> SealReason {
        self.reason
    }

    pub fn sealed_at_millis(&self) -> u64 {
        self.sealed_at_millis
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
