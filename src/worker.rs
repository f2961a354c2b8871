use std::panic::AssertUnwindSafe;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::event::EventKind;
use crate::ids::{TaskId, WorkerId};
use crate::outcome::{OutcomeError, WorkOutcome};
use crate::task::{Task, WorkFn};

/// A task attempt handed to one worker instance, carrying the cancellation
/// token this specific attempt must honor.
pub(crate) struct InstanceCommand<P> {
    pub(crate) task: Task<P>,
    pub(crate) cancel: CancellationToken,
}

/// Everything the dispatcher needs to turn an instance's finished attempt
/// into a terminal [`crate::Event`].
pub(crate) struct InstanceOutcome<T> {
    pub(crate) worker_id: WorkerId,
    pub(crate) instance: usize,
    pub(crate) task_id: TaskId,
    pub(crate) kind: EventKind,
    pub(crate) result: WorkOutcome<T>,
    pub(crate) time_start: DateTime<Utc>,
}

/// A record an instance sends the dispatcher: either it just started an
/// attempt, or it just finished one.
pub(crate) enum InstanceEvent<T> {
    Started {
        worker_id: WorkerId,
        instance: usize,
        task_id: TaskId,
        at: DateTime<Utc>,
    },
    Terminal(InstanceOutcome<T>),
}

/// Runs one worker instance: repeatedly takes a task off `cmd_rx`, executes
/// it, and reports exactly one `Started` followed by exactly one terminal
/// [`InstanceEvent`] per task, until `cmd_rx` closes.
pub(crate) async fn run_instance<P, T>(
    worker_id: WorkerId,
    instance: usize,
    work_fn: WorkFn<P, T>,
    mut cmd_rx: mpsc::Receiver<InstanceCommand<P>>,
    events_tx: mpsc::UnboundedSender<InstanceEvent<T>>,
) where
    P: Send + 'static,
    T: Send + 'static,
{
    while let Some(InstanceCommand { task, cancel }) = cmd_rx.recv().await {
        let task_id = task.id.clone();
        let time_start = Utc::now();

        let _ = events_tx.send(InstanceEvent::Started {
            worker_id: worker_id.clone(),
            instance,
            task_id: task_id.clone(),
            at: time_start,
        });

        trace!(worker = %worker_id, instance, task = %task_id, "attempt started");
        let wall_clock = Instant::now();
        let outcome = run_one(&work_fn, cancel.clone(), worker_id.clone(), instance, task).await;
        trace!(worker = %worker_id, instance, task = %task_id, elapsed = ?wall_clock.elapsed(), "attempt finished");

        let kind = if outcome.is_success() {
            EventKind::Success
        } else if cancel.is_cancelled() {
            EventKind::Canceled
        } else {
            EventKind::Error
        };

        let _ = events_tx.send(InstanceEvent::Terminal(InstanceOutcome {
            worker_id: worker_id.clone(),
            instance,
            task_id,
            kind,
            result: outcome,
            time_start,
        }));
    }
}

/// Executes `work_fn` once, catching panics and converting them into an
/// [`OutcomeError::Internal`] outcome instead of unwinding through the
/// instance loop.
async fn run_one<P, T>(
    work_fn: &WorkFn<P, T>,
    cancel: CancellationToken,
    worker_id: WorkerId,
    instance: usize,
    task: Task<P>,
) -> WorkOutcome<T>
where
    P: Send + 'static,
    T: Send + 'static,
{
    let fut = work_fn(cancel, worker_id, instance, task);
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => WorkOutcome::from_error(OutcomeError::Internal(panic_message(&panic))),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "work function panicked".to_string()
    }
}
