use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::trace;

use crate::event::Event;
use crate::ids::TaskId;
use crate::mode::Mode;
use crate::outcome::TaskResult;
use crate::policy::PolicyEvaluator;

/// Drains a raw [`Event`] stream through a [`PolicyEvaluator`] for `mode`,
/// forwarding only the results it selects.
pub(crate) async fn filter_events<T>(
    mut events_rx: mpsc::Receiver<Event<T>>,
    attempt_counts: HashMap<TaskId, usize>,
    mode: Mode,
    results_tx: mpsc::Sender<TaskResult<T>>,
) where
    T: Send + 'static,
{
    let mut policy = PolicyEvaluator::with_task_attempts(attempt_counts);

    while let Some(event) = events_rx.recv().await {
        if !policy.should_report(mode, &event) {
            continue;
        }
        let Some(outcome) = event.result else {
            continue;
        };

        trace!(task = %event.task_id, worker = %event.worker_id, mode = ?mode, "forwarding result to policy-filtered stream");

        if results_tx
            .send(TaskResult {
                task_id: event.task_id,
                worker_id: event.worker_id,
                worker_instance: event.worker_instance,
                outcome,
            })
            .await
            .is_err()
        {
            break;
        }
    }
}
