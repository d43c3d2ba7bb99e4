use super::error::SubmissionError;

#[cfg(test)]
use mockall::automock;

/// Sink for failures nobody is waiting on.
#[cfg_attr(test, automock)]
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &SubmissionError);
}

impl<F> ErrorReporter for F
where
    F: Fn(&SubmissionError) + Send + Sync,
{
    fn report(&self, error: &SubmissionError) {
        self(error);
    }
}

/// Writes one line per failure to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrReporter;

impl StderrReporter {
    pub fn format(error: &SubmissionError) -> String {
        format!("Log submission failed due to error \"{error}\"")
    }
}

impl ErrorReporter for StderrReporter {
    fn report(&self, error: &SubmissionError) {
        eprintln!("{}", Self::format(error));
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _error: &SubmissionError) {}
}

/// Routes failures into this process's own structured log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &SubmissionError) {
        tracing::error!(error = %error, "Log submission failed");
    }
}
