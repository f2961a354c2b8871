use std::fmt;

use crate::ids::{TaskId, WorkerId};

/// Error carried by a non-success [`WorkOutcome`].
///
/// The dispatcher classifies an outcome as canceled by inspecting the
/// attempt's [`tokio_util::sync::CancellationToken`], never by matching on
/// this type: a [`WorkFn`](crate::WorkFn) only ever needs to report that
/// its own work failed, or that something unexpected (a caught panic)
/// happened. [`OutcomeError::Canceled`] exists only to give a dispatcher- or
/// feeder-issued `Canceled` event a human-readable payload.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OutcomeError {
    /// The work function ran to completion but failed to produce a result
    /// (e.g. the remote source returned an error, or a parse failed).
    #[error("{0}")]
    Work(String),
    /// An invariant was violated, or the work function panicked.
    #[error("internal error: {0}")]
    Internal(String),
    /// The attempt never ran, or was aborted, because its outcome no longer
    /// mattered.
    #[error("canceled: {0}")]
    Canceled(String),
}

/// The outcome of one [`WorkFn`](crate::WorkFn) invocation: either a success
/// payload or an [`OutcomeError`].
#[derive(Debug, Clone)]
pub struct WorkOutcome<T>(Result<T, OutcomeError>);

impl<T> WorkOutcome<T> {
    /// Builds a successful outcome.
    pub fn success(value: T) -> Self {
        Self(Ok(value))
    }

    /// Builds a failed outcome from a [`OutcomeError::Work`] error.
    pub fn error(message: impl Into<String>) -> Self {
        Self(Err(OutcomeError::Work(message.into())))
    }

    /// Builds a failed outcome from an [`OutcomeError`].
    pub fn from_error(error: OutcomeError) -> Self {
        Self(Err(error))
    }

    /// Returns the error, if any.
    pub fn as_error(&self) -> Option<&OutcomeError> {
        self.0.as_ref().err()
    }

    /// Returns the success value, if any.
    pub fn as_value(&self) -> Option<&T> {
        self.0.as_ref().ok()
    }

    /// `true` if this outcome is a success.
    pub fn is_success(&self) -> bool {
        self.0.is_ok()
    }

    /// Unwraps into the underlying `Result`.
    pub fn into_result(self) -> Result<T, OutcomeError> {
        self.0
    }
}

impl<T: fmt::Debug> fmt::Display for WorkOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Ok(value) => write!(f, "{value:?}"),
            Err(err) => write!(f, "{err}"),
        }
    }
}

/// A policy-selected [`WorkOutcome`], tagged with the attempt it came from.
///
/// This is what [`crate::Engine::execute`] streams: downstream persistence
/// and presentation layers need to know which task (and, for logging,
/// which worker/instance) a result belongs to without re-deriving it from
/// the raw [`crate::Event`] stream.
#[derive(Debug, Clone)]
pub struct TaskResult<T> {
    /// The task this result resolves.
    pub task_id: TaskId,
    /// The worker whose attempt produced this result.
    pub worker_id: WorkerId,
    /// The 0-based instance index of that worker.
    pub worker_instance: usize,
    /// The outcome itself.
    pub outcome: WorkOutcome<T>,
}
