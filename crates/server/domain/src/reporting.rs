//! Error reporting collaborator.
//!
//! Operational failures are surfaced through this seam instead of a
//! process-wide error tracker, so the core stays testable and the tracker
//! is swappable.

/// Collaborator that receives operational errors (cycle failures, skipped
/// records). Implementations must not panic.
pub trait ErrorReporter: Send + Sync {
    fn capture(&self, error: &(dyn std::error::Error + 'static));
}

/// Reporter that drops everything, for tests.
#[derive(Debug, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn capture(&self, _error: &(dyn std::error::Error + 'static)) {}
}
