//! The batching-and-flush engine.
//!
//! [`SubmissionEngine`] ties a [`BatchAccumulator`](crate::buffer::BatchAccumulator)
//! to a [`Transport`](crate::sender::Transport): producers append, full or
//! stale batches are sealed under the accumulator lock and handed to the
//! transport outside it, and a [`FlushScheduler`] task seals stale batches
//! when producers go quiet.

pub mod error;
pub mod fault;
pub mod scheduler;
pub mod submission;

pub use error::{EngineError, EngineState};
pub use fault::{FaultChannel, SchedulerFault};
pub use scheduler::FlushScheduler;
pub use submission::{EngineBuilder, SubmissionEngine};
