use std::collections::HashMap;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use quotes_engine::{Engine, EventKind, Mode, Task, Worker, WorkerTasks, WorkOutcome};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn worker_after(
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

/// Errors from A and B, then a success from C, under
/// `ResultsUntilFirstSuccess`: policy output is every error in
/// chronological order, then the one success, and nothing after.
#[tokio::test]
async fn results_until_first_success_preserves_error_order() {
    init_tracing();
    let workers = vec![
        worker_after("A", 10, WorkOutcome::error("eA")),
        worker_after("B", 20, WorkOutcome::error("eB")),
        worker_after("C", 30, WorkOutcome::success("ok")),
    ];
    let tasks: WorkerTasks<()> = HashMap::from([
        ("A".into(), vec![Task::new("T1", ())]),
        ("B".into(), vec![Task::new("T1", ())]),
        ("C".into(), vec![Task::new("T1", ())]),
    ]);
    let engine = Engine::construct(workers, tasks).unwrap();

    let mut results = engine.execute(CancellationToken::new(), Mode::ResultsUntilFirstSuccess);
    let mut seen = Vec::new();
    while let Some(r) = results.recv().await {
        seen.push((r.worker_id.to_string(), r.outcome.is_success()));
    }

    assert_eq!(
        seen,
        vec![
            ("A".to_string(), false),
            ("B".to_string(), false),
            ("C".to_string(), true),
        ]
    );
}

/// A wins at 20ms, B is still waiting on cancellation. Under `AllResults`
/// both the success and the loser's cancellation are reported (the order
/// between the two is unconstrained).
#[tokio::test]
async fn all_results_reports_success_and_cancellation() {
    let workers = vec![
        worker_after("A", 20, WorkOutcome::success("fast")),
        Worker::new("B", 1, |ctx, _w, _i, _task| async move {
            ctx.cancelled().await;
            WorkOutcome::error("canceled mid-flight")
        }),
    ];
    let tasks: WorkerTasks<()> = HashMap::from([
        ("A".into(), vec![Task::new("T1", ())]),
        ("B".into(), vec![Task::new("T1", ())]),
    ]);
    let engine = Engine::construct(workers, tasks).unwrap();

    let mut results = engine.execute(CancellationToken::new(), Mode::AllResults);
    let mut by_worker = HashMap::new();
    while let Some(r) = results.recv().await {
        by_worker.insert(r.worker_id.to_string(), r.outcome.is_success());
    }

    assert_eq!(by_worker.len(), 2);
    assert_eq!(by_worker.get("A"), Some(&true));
    assert_eq!(by_worker.get("B"), Some(&false));
}

/// Two tasks, fanned across two workers; worker A succeeds on T1 and
/// errors on T2, worker B succeeds on T2. Under `FirstSuccessOrLastResult`
/// each task reports exactly one success and the loser for T2 is canceled
/// (not reported).
#[tokio::test]
async fn multi_task_fan_out_resolves_independently() {
    let workers = vec![
        Worker::new("A", 2, |_ctx, _w, _i, task: Task<()>| async move {
            if task.id.as_str() == "T1" {
                sleep(Duration::from_millis(10)).await;
                WorkOutcome::success("A-T1")
            } else {
                sleep(Duration::from_millis(10)).await;
                WorkOutcome::error("A-T2-failed")
            }
        }),
        worker_after("B", 15, WorkOutcome::success("B-T2")),
    ];
    let tasks: WorkerTasks<()> = HashMap::from([
        ("A".into(), vec![Task::new("T1", ()), Task::new("T2", ())]),
        ("B".into(), vec![Task::new("T2", ())]),
    ]);
    let engine = Engine::construct(workers, tasks).unwrap();

    let mut results = engine.execute(CancellationToken::new(), Mode::FirstSuccessOrLastResult);
    let mut by_task = HashMap::new();
    while let Some(r) = results.recv().await {
        by_task.insert(r.task_id.to_string(), (r.worker_id.to_string(), r.outcome.is_success()));
    }

    assert_eq!(by_task.len(), 2);
    assert_eq!(by_task.get("T1"), Some(&("A".to_string(), true)));
    assert_eq!(by_task.get("T2"), Some(&("B".to_string(), true)));
}

/// Every declared (worker, task) pair gets exactly one `Started` followed
/// by exactly one terminal event, even for the attempt that the feeder
/// skips outright because its task was already satisfied.
#[tokio::test]
async fn every_attempt_gets_started_then_one_terminal_event() {
    let workers = vec![
        worker_after("A", 10, WorkOutcome::success("fast")),
        worker_after("B", 200, WorkOutcome::success("slow")),
    ];
    let tasks: WorkerTasks<()> = HashMap::from([
        ("A".into(), vec![Task::new("T1", ())]),
        ("B".into(), vec![Task::new("T1", ())]),
    ]);
    let engine = Engine::construct(workers, tasks).unwrap();

    let mut events = engine.execute_events(CancellationToken::new());
    let mut started: HashMap<(String, usize), usize> = HashMap::new();
    let mut terminal: HashMap<(String, usize), usize> = HashMap::new();

    while let Some(ev) = events.recv().await {
        let key = (ev.worker_id.to_string(), ev.worker_instance);
        if ev.kind == EventKind::Started {
            *started.entry(key).or_insert(0) += 1;
        } else {
            *terminal.entry(key).or_insert(0) += 1;
        }
    }

    assert_eq!(started.len(), 2);
    assert_eq!(terminal.len(), 2);
    assert!(started.values().all(|&n| n == 1));
    assert!(terminal.values().all(|&n| n == 1));
}

/// Canceling the run context aborts every in-flight attempt and the event
/// channel still closes in bounded time.
#[tokio::test]
async fn run_cancellation_drains_and_closes() {
    let workers: Vec<Worker<(), &'static str>> = vec![Worker::new("A", 1, |ctx, _w, _i, _task| async move {
        ctx.cancelled().await;
        WorkOutcome::error("aborted")
    })];
    let tasks: WorkerTasks<()> = HashMap::from([("A".into(), vec![Task::new("T1", ())])]);
    let engine = Engine::construct(workers, tasks).unwrap();

    let cancel = CancellationToken::new();
    let mut events = engine.execute_events(cancel.clone());

    // Give the instance time to pick up the task and start waiting.
    sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(1), async {
        let mut last = None;
        while let Some(ev) = events.recv().await {
            last = Some(ev);
        }
        last
    })
    .await
    .expect("channel did not close within the timeout");

    let last = outcome.expect("expected at least one terminal event");
    assert_eq!(last.kind, EventKind::Canceled);
}
