use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::event::{Event, EventKind};
use crate::ids::{TaskId, WorkerId};
use crate::outcome::{OutcomeError, WorkOutcome};
use crate::task::{Task, Worker, WorkerTasks};
use crate::worker::{run_instance, InstanceCommand, InstanceEvent, InstanceOutcome};

/// Per-task state owned exclusively by the dispatcher loop, never touched
/// by worker instances.
struct TaskState {
    remaining_attempts: usize,
    had_success: bool,
    inflight: HashSet<(WorkerId, usize)>,
    tokens: HashMap<(WorkerId, usize), CancellationToken>,
}

impl TaskState {
    fn new(remaining_attempts: usize) -> Self {
        Self {
            remaining_attempts,
            had_success: false,
            inflight: HashSet::new(),
            tokens: HashMap::new(),
        }
    }

    /// A task is done once it has left `Pending` (either `Satisfied`
    /// (`had_success`) or `Exhausted` (`remaining_attempts == 0`)) and no
    /// attempt of it is still running. `remaining_attempts` alone is not
    /// enough: it is never decremented on `Success`, so a satisfied task
    /// whose losing peers are still draining their `Canceled` terminal
    /// events must stay live until `inflight` empties, not until
    /// `remaining_attempts` reaches zero.
    fn is_live(&self) -> bool {
        let out_of_pending = self.had_success || self.remaining_attempts == 0;
        !out_of_pending || !self.inflight.is_empty()
    }
}

/// Counts, for every distinct [`TaskId`] in `tasks`, how many workers own
/// it (the number of attempts it starts with).
pub(crate) fn task_attempt_counts<P>(tasks: &WorkerTasks<P>) -> HashMap<TaskId, usize> {
    let mut counts: HashMap<TaskId, usize> = HashMap::new();
    for task_list in tasks.values() {
        for task in task_list {
            *counts.entry(task.id.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Runs the dispatcher to completion, sending every lifecycle event to
/// `events_tx`. Returns when every task has reached a terminal state and no
/// attempt remains in flight, closing `events_tx` by dropping it.
pub(crate) async fn run<P, T>(
    workers: Vec<Worker<P, T>>,
    mut tasks: WorkerTasks<P>,
    run_token: CancellationToken,
    config: EngineConfig,
    events_tx: mpsc::Sender<Event<T>>,
) where
    P: Send + 'static,
    T: Send + 'static,
{
    let mut task_state: HashMap<TaskId, TaskState> = task_attempt_counts(&tasks)
        .into_iter()
        .map(|(id, count)| (id, TaskState::new(count)))
        .collect();

    let (instance_tx, mut instance_rx) = mpsc::unbounded_channel::<InstanceEvent<T>>();
    let mut instance_cmds: HashMap<(WorkerId, usize), mpsc::Sender<InstanceCommand<P>>> = HashMap::new();
    let mut busy: HashSet<(WorkerId, usize)> = HashSet::new();
    let mut join_set: JoinSet<()> = JoinSet::new();

    for worker in &workers {
        for instance in 0..worker.instances as usize {
            let (cmd_tx, cmd_rx) = mpsc::channel(config.worker_channel_capacity);
            instance_cmds.insert((worker.id.clone(), instance), cmd_tx);

            let work_fn = worker.work.clone();
            let instance_tx = instance_tx.clone();
            let worker_id = worker.id.clone();
            join_set.spawn(async move {
                run_instance(worker_id, instance, work_fn, cmd_rx, instance_tx).await;
            });
        }
    }
    drop(instance_tx);

    let mut pending: HashMap<WorkerId, VecDeque<Task<P>>> = workers
        .iter()
        .map(|w| (w.id.clone(), tasks.remove(&w.id).unwrap_or_default().into()))
        .collect();

    feed(&mut pending, &instance_cmds, &mut busy, &mut task_state, &run_token, &events_tx).await;

    while !task_state.is_empty() {
        let Some(event) = instance_rx.recv().await else {
            warn!("all worker instances exited while tasks were still live");
            break;
        };

        match event {
            InstanceEvent::Started {
                worker_id,
                instance,
                task_id,
                at,
            } => {
                let _ = events_tx.send(Event::started(worker_id, instance, task_id, at)).await;
            }
            InstanceEvent::Terminal(outcome) => {
                busy.remove(&(outcome.worker_id.clone(), outcome.instance));
                handle_outcome(outcome, &mut task_state, &events_tx).await;
            }
        }

        feed(&mut pending, &instance_cmds, &mut busy, &mut task_state, &run_token, &events_tx).await;

        task_state.retain(|task_id, state| {
            let keep = state.is_live();
            if !keep {
                trace!(task = %task_id, "task reached a terminal state");
            }
            keep
        });
    }

    drop(instance_cmds);
    while join_set.join_next().await.is_some() {}
    drop(events_tx);
}

/// Hands queued tasks to free instances, in per-worker list order.
///
/// A queued attempt that will never run (because a peer already satisfied
/// its task, or because the run was canceled before an instance became
/// free) is resolved right here with a synthetic `Started`/`Canceled` pair,
/// so every declared (worker, task) pairing still gets exactly one terminal
/// event even though no [`crate::WorkFn`] ever ran for it.
async fn feed<P, T>(
    pending: &mut HashMap<WorkerId, VecDeque<Task<P>>>,
    instance_cmds: &HashMap<(WorkerId, usize), mpsc::Sender<InstanceCommand<P>>>,
    busy: &mut HashSet<(WorkerId, usize)>,
    task_state: &mut HashMap<TaskId, TaskState>,
    run_token: &CancellationToken,
    events_tx: &mpsc::Sender<Event<T>>,
) {
    for (key, cmd_tx) in instance_cmds {
        if busy.contains(key) {
            continue;
        }
        let (worker_id, instance) = key;
        let Some(queue) = pending.get_mut(worker_id) else {
            continue;
        };

        while let Some(task) = queue.pop_front() {
            let task_id = task.id.clone();

            let skip_reason = if run_token.is_cancelled() {
                Some("the run was canceled before this attempt started")
            } else if task_state.get(&task_id).map(|s| s.had_success).unwrap_or(true) {
                Some("a peer attempt already succeeded")
            } else {
                None
            };

            if let Some(reason) = skip_reason {
                if let Some(state) = task_state.get_mut(&task_id) {
                    state.remaining_attempts = state.remaining_attempts.saturating_sub(1);
                }
                trace!(task = %task_id, worker = %worker_id, reason, "skipping attempt before dispatch");
                emit_synthetic_cancellation(worker_id.clone(), *instance, task_id, reason, events_tx).await;
                continue;
            }

            let token = run_token.child_token();
            if let Some(state) = task_state.get_mut(&task_id) {
                state.inflight.insert(key.clone());
                state.tokens.insert(key.clone(), token.clone());
            }

            if cmd_tx.send(InstanceCommand { task, cancel: token }).await.is_err() {
                warn!(worker = %worker_id, instance, "instance command channel closed unexpectedly");
                if let Some(state) = task_state.get_mut(&task_id) {
                    state.inflight.remove(key);
                    state.tokens.remove(key);
                    state.remaining_attempts = state.remaining_attempts.saturating_sub(1);
                }
                continue;
            }

            busy.insert(key.clone());
            break;
        }
    }
}

async fn emit_synthetic_cancellation<T>(
    worker_id: WorkerId,
    instance: usize,
    task_id: TaskId,
    reason: &str,
    events_tx: &mpsc::Sender<Event<T>>,
) {
    let at = Utc::now();
    let _ = events_tx
        .send(Event::started(worker_id.clone(), instance, task_id.clone(), at))
        .await;
    let _ = events_tx
        .send(Event::terminal(
            EventKind::Canceled,
            worker_id,
            instance,
            task_id,
            WorkOutcome::from_error(OutcomeError::Canceled(reason.to_string())),
            at,
            at,
        ))
        .await;
}

async fn handle_outcome<T>(
    outcome: InstanceOutcome<T>,
    task_state: &mut HashMap<TaskId, TaskState>,
    events_tx: &mpsc::Sender<Event<T>>,
) {
    let InstanceOutcome {
        worker_id,
        instance,
        task_id,
        kind,
        result,
        time_start,
    } = outcome;

    let time_end = Utc::now();
    let key = (worker_id.clone(), instance);

    debug!(worker = %worker_id, instance, task = %task_id, kind = ?kind, "attempt terminated");

    let _ = events_tx
        .send(Event::terminal(
            kind,
            worker_id.clone(),
            instance,
            task_id.clone(),
            result,
            time_start,
            time_end,
        ))
        .await;

    let Some(state) = task_state.get_mut(&task_id) else {
        return;
    };
    state.inflight.remove(&key);
    state.tokens.remove(&key);

    match kind {
        EventKind::Success => {
            if !state.had_success {
                state.had_success = true;
                cancel_peers(state);
            }
        }
        EventKind::Error | EventKind::Canceled => {
            state.remaining_attempts = state.remaining_attempts.saturating_sub(1);
        }
        EventKind::Started => unreachable!("instances never report Started as a terminal outcome"),
    }
}

/// Cancels every still-inflight attempt of a task that just became
/// `Satisfied`.
fn cancel_peers(state: &mut TaskState) {
    for token in state.tokens.values() {
        token.cancel();
    }
}
