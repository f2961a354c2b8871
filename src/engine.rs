use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::dispatcher::{self, task_attempt_counts};
use crate::error::EngineError;
use crate::event::Event;
use crate::mode::Mode;
use crate::outcome::TaskResult;
use crate::stream::filter_events;
use crate::task::{Worker, WorkerTasks};
use crate::validate::validate;

/// The engine façade: validates a worker/task matrix at construction, then
/// drives a single run either as a raw [`Event`] stream or as a
/// policy-filtered [`TaskResult`] stream.
///
/// An `Engine` is single-shot: [`Engine::execute_events`] and
/// [`Engine::execute`] both consume `self`. There is no way to run the
/// same matrix twice through one `Engine` value.
pub struct Engine<P, T> {
    workers: Vec<Worker<P, T>>,
    tasks: WorkerTasks<P>,
    config: EngineConfig,
}

impl<P, T> Engine<P, T>
where
    P: Send + 'static,
    T: Send + 'static,
{
    /// Validates `workers`/`tasks` and builds an engine with default
    /// tunables. No attempt is dispatched until execution is started.
    pub fn construct(workers: Vec<Worker<P, T>>, tasks: WorkerTasks<P>) -> Result<Self, EngineError> {
        Self::construct_with_config(workers, tasks, EngineConfig::default())
    }

    /// Like [`Engine::construct`], with explicit tunables.
    pub fn construct_with_config(
        workers: Vec<Worker<P, T>>,
        tasks: WorkerTasks<P>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        validate(&workers, &tasks)?;
        Ok(Self {
            workers,
            tasks,
            config: config.normalized(),
        })
    }

    /// Starts the run, returning the raw lifecycle event stream.
    ///
    /// Canceling `cancel` aborts every in-flight attempt; the returned
    /// channel drains the resulting `Canceled` events and then closes.
    pub fn execute_events(self, cancel: CancellationToken) -> mpsc::Receiver<Event<T>> {
        let (events_tx, events_rx) = mpsc::channel(self.config.event_channel_capacity);
        tokio::spawn(dispatcher::run(self.workers, self.tasks, cancel, self.config, events_tx));
        events_rx
    }

    /// Starts the run and filters its event stream through `mode`,
    /// returning only the [`TaskResult`]s a caller in that mode should see.
    pub fn execute(self, cancel: CancellationToken, mode: Mode) -> mpsc::Receiver<TaskResult<T>> {
        let attempt_counts = task_attempt_counts(&self.tasks);
        let capacity = self.config.event_channel_capacity;
        let events_rx = self.execute_events(cancel);

        let (results_tx, results_rx) = mpsc::channel(capacity);
        tokio::spawn(filter_events(events_rx, attempt_counts, mode, results_tx));
        results_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::WorkOutcome;
    use crate::task::Task;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::time::sleep;

    fn sleepy_worker(
        id: &str,
        delay_ms: u64,
        outcome: WorkOutcome<&'static str>,
    ) -> Worker<(), &'static str> {
        Worker::new(id, 1, move |_ctx, _w, _i, _task| {
            let outcome = outcome.clone();
            async move {
                sleep(Duration::from_millis(delay_ms)).await;
                outcome
            }
        })
    }

    #[tokio::test]
    async fn single_task_single_worker_success() {
        let workers = vec![sleepy_worker("A", 10, WorkOutcome::success("ok"))];
        let tasks: WorkerTasks<()> = HashMap::from([("A".into(), vec![Task::new("T1", ())])]);
        let engine = Engine::construct(workers, tasks).unwrap();

        let mut results = engine.execute(CancellationToken::new(), Mode::AllResults);
        let first = results.recv().await.unwrap();
        assert!(first.outcome.is_success());
        assert!(results.recv().await.is_none());
    }

    #[tokio::test]
    async fn first_success_or_last_result_reports_the_winner_only() {
        let workers = vec![
            sleepy_worker("A", 20, WorkOutcome::success("fast")),
            sleepy_worker("B", 100, WorkOutcome::success("slow")),
        ];
        let tasks: WorkerTasks<()> = HashMap::from([
            ("A".into(), vec![Task::new("T1", ())]),
            ("B".into(), vec![Task::new("T1", ())]),
        ]);
        let engine = Engine::construct(workers, tasks).unwrap();

        let mut results = engine.execute(CancellationToken::new(), Mode::FirstSuccessOrLastResult);
        let only = results.recv().await.unwrap();
        assert_eq!(only.worker_id.as_str(), "A");
        assert!(only.outcome.is_success());
        assert!(results.recv().await.is_none());
    }

    #[tokio::test]
    async fn first_success_or_last_result_reports_the_last_error() {
        let workers = vec![
            sleepy_worker("A", 10, WorkOutcome::error("eA")),
            sleepy_worker("B", 20, WorkOutcome::error("eB")),
        ];
        let tasks: WorkerTasks<()> = HashMap::from([
            ("A".into(), vec![Task::new("T1", ())]),
            ("B".into(), vec![Task::new("T1", ())]),
        ]);
        let engine = Engine::construct(workers, tasks).unwrap();

        let mut results = engine.execute(CancellationToken::new(), Mode::FirstSuccessOrLastResult);
        let only = results.recv().await.unwrap();
        assert_eq!(only.worker_id.as_str(), "B");
        assert!(!only.outcome.is_success());
        assert!(results.recv().await.is_none());
    }

    #[tokio::test]
    async fn construct_rejects_an_invalid_matrix() {
        let workers = vec![Worker::new("A", 0, |_ctx, _w, _i, _task: Task<()>| async {
            WorkOutcome::success("ok")
        })];
        let tasks: WorkerTasks<()> = HashMap::from([("A".into(), vec![Task::new("T1", ())])]);
        assert!(Engine::construct(workers, tasks).is_err());
    }
}
