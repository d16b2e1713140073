//! Errors surfaced by processors to the pipeline host.
use std::sync::PoisonError;
use thiserror::Error;

/// Result type returned by processor operations.
pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// Errors a processor returns to the host for a batch or a lifecycle call.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProcessorError {
    /// The inbound request carried no value for a required header.
    #[error("missing header: {0}")]
    MissingHeader(String),

    /// The inbound request carried more than one value for a single-valued
    /// header.
    #[error("multiple values for header: {0}")]
    MultipleHeaderValues(String),

    /// The caller's deadline elapsed while the batch was being processed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The processor configuration is invalid. Permanent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The processor was already shut down.
    #[error("processor already shut down")]
    AlreadyShutdown,

    /// Other types of failures not covered by the variants above.
    #[error("{0}")]
    Other(String),
}

impl ProcessorError {
    /// Whether retrying the same batch can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProcessorError::MissingHeader(_)
                | ProcessorError::MultipleHeaderValues(_)
                | ProcessorError::InvalidConfig(_)
        )
    }
}

impl<T> From<PoisonError<T>> for ProcessorError {
    fn from(err: PoisonError<T>) -> Self {
        ProcessorError::Other(err.to_string())
    }
}
