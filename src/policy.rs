use std::collections::HashMap;

use crate::event::{Event, EventKind};
use crate::ids::TaskId;
use crate::mode::Mode;

/// Per-task bookkeeping the [`PolicyEvaluator`] needs to classify events.
///
/// `remaining_attempts` mirrors the dispatcher's own count: the evaluator
/// is initialized with how many (worker, instance) attempts exist for each
/// task, and decrements
/// it on every terminal event, independently of the dispatcher. This is what
/// lets `FirstSuccessOrLastResult` recognize "the chronologically last
/// error" without retroactively revising a decision already streamed to the
/// caller: an error is only reportable once it is known to be the task's
/// final outcome, i.e. once no attempts remain.
#[derive(Debug, Clone, Copy)]
struct TaskSeen {
    remaining_attempts: usize,
    saw_success: bool,
}

impl TaskSeen {
    fn new(total_attempts: usize) -> Self {
        Self {
            remaining_attempts: total_attempts,
            saw_success: false,
        }
    }
}

/// A pure, stateful classifier deciding which terminal events a [`Mode`]
/// surfaces to a caller.
///
/// Must be constructed with the total number of attempts per task (the same
/// count the dispatcher derives from the input [`crate::WorkerTasks`]
/// matrix) so it can recognize exhaustion independently of the dispatcher
/// (see [`PolicyEvaluator::with_task_attempts`]). This separation is what lets
/// the raw [`Event`] stream drive a progress UI while this evaluator
/// independently drives the filtered result stream, and lets the policy be
/// unit-tested against synthetic event sequences.
#[derive(Debug, Default)]
pub struct PolicyEvaluator {
    seen: HashMap<TaskId, TaskSeen>,
}

impl PolicyEvaluator {
    /// Builds an evaluator that will lazily assume a single attempt for any
    /// task it has not been told about. Prefer [`Self::with_task_attempts`]
    /// when the attempt counts are known, which is required for correct
    /// `FirstSuccessOrLastResult`/`ResultsUntilFirstSuccess` classification
    /// of tasks with more than one attempt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an evaluator that knows, for each task, how many attempts
    /// will be made in total.
    pub fn with_task_attempts(task_attempts: impl IntoIterator<Item = (TaskId, usize)>) -> Self {
        let seen = task_attempts
            .into_iter()
            .map(|(id, count)| (id, TaskSeen::new(count)))
            .collect();
        Self { seen }
    }

    /// Decides whether `event` should be forwarded to the caller under
    /// `mode`, updating this task's history as a side effect.
    ///
    /// `Started` events are never forwarded. They are purely informational
    /// for progress UIs, not results a caller waits on.
    pub fn should_report<T>(&mut self, mode: Mode, event: &Event<T>) -> bool {
        if event.kind == EventKind::Started {
            return false;
        }

        let seen = self
            .seen
            .entry(event.task_id.clone())
            .or_insert_with(|| TaskSeen::new(1));

        if matches!(event.kind, EventKind::Error | EventKind::Canceled) {
            seen.remaining_attempts = seen.remaining_attempts.saturating_sub(1);
        }
        let exhausted = seen.remaining_attempts == 0;

        let report = match (mode, event.kind) {
            (_, EventKind::Started) => unreachable!("handled above"),

            (Mode::FirstSuccessOrLastResult, EventKind::Success) => !seen.saw_success,
            (Mode::FirstSuccessOrLastResult, EventKind::Error) => !seen.saw_success && exhausted,
            (Mode::FirstSuccessOrLastResult, EventKind::Canceled) => false,

            (Mode::ResultsUntilFirstSuccess, EventKind::Success) => !seen.saw_success,
            (Mode::ResultsUntilFirstSuccess, EventKind::Error) => !seen.saw_success,
            (Mode::ResultsUntilFirstSuccess, EventKind::Canceled) => false,

            (Mode::SuccessOrErrorResults, EventKind::Success) => true,
            (Mode::SuccessOrErrorResults, EventKind::Error) => true,
            (Mode::SuccessOrErrorResults, EventKind::Canceled) => false,

            (Mode::AllResults, EventKind::Success) => true,
            (Mode::AllResults, EventKind::Error) => true,
            (Mode::AllResults, EventKind::Canceled) => true,
        };

        if event.kind == EventKind::Success {
            seen.saw_success = true;
        }

        report
    }
}
