use chrono::{DateTime, Utc};

use crate::ids::{TaskId, WorkerId};
use crate::outcome::WorkOutcome;

/// Lifecycle stage an [`Event`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EventKind {
    /// A worker instance has begun a task attempt.
    Started,
    /// The attempt succeeded.
    Success,
    /// The attempt failed (not due to cancellation).
    Error,
    /// The attempt was canceled, because a peer attempt for the same task
    /// already succeeded, or because the run was canceled.
    Canceled,
}

impl EventKind {
    /// `true` for any of [`EventKind::Success`], [`EventKind::Error`] or
    /// [`EventKind::Canceled`] (anything but [`EventKind::Started`]).
    pub fn is_terminal(self) -> bool {
        !matches!(self, EventKind::Started)
    }
}

/// One lifecycle record emitted by the dispatcher for a single
/// (worker, instance, task) attempt.
#[derive(Debug, Clone)]
pub struct Event<T> {
    /// What happened.
    pub kind: EventKind,
    /// The worker that ran (or is running) the attempt.
    pub worker_id: WorkerId,
    /// The 0-based instance index of that worker.
    pub worker_instance: usize,
    /// The task this attempt is for.
    pub task_id: TaskId,
    /// The outcome, present for every event except [`EventKind::Started`]
    /// (for which it is always `None`).
    pub result: Option<WorkOutcome<T>>,
    /// When the attempt started.
    pub time_start: DateTime<Utc>,
    /// When the attempt ended. Equal to `time_start` for [`EventKind::Started`].
    pub time_end: DateTime<Utc>,
}

impl<T> Event<T> {
    pub(crate) fn started(worker_id: WorkerId, worker_instance: usize, task_id: TaskId, at: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::Started,
            worker_id,
            worker_instance,
            task_id,
            result: None,
            time_start: at,
            time_end: at,
        }
    }

    pub(crate) fn terminal(
        kind: EventKind,
        worker_id: WorkerId,
        worker_instance: usize,
        task_id: TaskId,
        result: WorkOutcome<T>,
        time_start: DateTime<Utc>,
        time_end: DateTime<Utc>,
    ) -> Self {
        debug_assert!(kind.is_terminal());
        Self {
            kind,
            worker_id,
            worker_instance,
            task_id,
            result: Some(result),
            time_start,
            time_end,
        }
    }
}
