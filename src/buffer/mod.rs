pub mod accumulator;
pub mod batch;
pub mod clock;
pub mod error;

pub use accumulator::{BatchAccumulator, Intake, Rejected};
pub use batch::{Batch, BatchConfig, SealReason};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::ConfigurationError;
