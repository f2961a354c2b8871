/// Errors raised synchronously by the engine, never via the event stream.
///
/// Per the error taxonomy: work failures, cancellations and internal
/// (panic) errors are always carried as data inside [`crate::Event`] /
/// [`crate::WorkOutcome`]. Only a structurally invalid input matrix is
/// raised out-of-band, and only at construction time: execution never
/// starts if construction fails.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The worker/task matrix failed a structural check.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
