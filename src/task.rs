use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::ids::{TaskId, WorkerId};
use crate::outcome::WorkOutcome;

/// A unit of work to execute, identified by a [`TaskId`] and carrying
/// arbitrary worker-specific payload (e.g. a pre-known info URL for a
/// given source).
#[derive(Debug, Clone)]
pub struct Task<P> {
    /// Identity of the task. Tasks sharing an id are equivalent.
    pub id: TaskId,
    /// Worker-specific payload.
    pub payload: P,
}

impl<P> Task<P> {
    /// Builds a new task.
    pub fn new(id: impl Into<TaskId>, payload: P) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }
}

/// Signature of the work function a [`Worker`] executes for one attempt.
///
/// Must honor cancellation promptly: once the token is canceled, the
/// function should return as soon as it next gets a chance to observe it.
pub type WorkFn<P, T> = Arc<
    dyn Fn(CancellationToken, WorkerId, usize, Task<P>) -> Pin<Box<dyn Future<Output = WorkOutcome<T>> + Send>>
        + Send
        + Sync,
>;

/// A worker definition: identity, instance count, and the function every
/// instance runs.
///
/// `Instances` instances of the same worker may run concurrently, each
/// executing a distinct task.
#[derive(Clone)]
pub struct Worker<P, T> {
    /// Unique identifier of this worker within an engine.
    pub id: WorkerId,
    /// Number of concurrent instances, in `1..=100`.
    pub instances: u32,
    pub(crate) work: WorkFn<P, T>,
}

impl<P, T> Worker<P, T> {
    /// Builds a new worker from an async closure.
    ///
    /// `work` receives the attempt's cancellation token (a child of the run
    /// context), this worker's id, the 0-based instance index, and the task.
    pub fn new<F, Fut>(id: impl Into<WorkerId>, instances: u32, work: F) -> Self
    where
        F: Fn(CancellationToken, WorkerId, usize, Task<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WorkOutcome<T>> + Send + 'static,
    {
        Self {
            id: id.into(),
            instances,
            work: Arc::new(move |ctx, worker_id, instance, task| Box::pin(work(ctx, worker_id, instance, task))),
        }
    }
}

impl<P, T> std::fmt::Debug for Worker<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("instances", &self.instances)
            .finish_non_exhaustive()
    }
}

/// The bipartite assignment of tasks to workers: for each worker id, the
/// ordered sequence of tasks it should attempt.
///
/// The same [`TaskId`] may appear under several workers. That redundancy is
/// what the completion policies (see [`crate::Mode`]) resolve.
pub type WorkerTasks<P> = HashMap<WorkerId, Vec<Task<P>>>;
