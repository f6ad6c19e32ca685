//! Error reporting backed by the tracing pipeline.

use eventline_domain::reporting::ErrorReporter;
use tracing::error;

/// Reporter that forwards captured errors to the log pipeline.
#[derive(Debug, Default, Clone)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn new() -> Self {
        Self
    }
}

impl ErrorReporter for TracingReporter {
    fn capture(&self, error: &(dyn std::error::Error + 'static)) {
        let mut chain = String::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push_str(" <- ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }
        error!(error = %error, cause_chain = %chain, "Captured error");
    }
}
