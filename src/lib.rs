// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Millisecond clocks fit in u64 for any realistic uptime
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. EngineError in engine module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod appender;
pub mod buffer;
pub mod document;
pub mod domain;
pub mod engine;
pub mod sender;

// Re-export main types for easy access
pub use appender::LogAppender;
pub use buffer::{Batch, BatchConfig, SealReason};
pub use engine::{EngineError, EngineState, SubmissionEngine};
pub use sender::{ErrorReporter, SubmissionError, Transport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
