use std::collections::HashSet;

use crate::error::EngineError;
use crate::ids::WorkerId;
use crate::task::{Worker, WorkerTasks};

const MIN_INSTANCES: u32 = 1;
const MAX_INSTANCES: u32 = 100;

/// Runs every structural check on a worker/task matrix synchronously,
/// before any attempt is dispatched. All checks run (rather than stopping
/// at the first failure) so callers see every problem in one pass.
pub(crate) fn validate<P, T>(workers: &[Worker<P, T>], tasks: &WorkerTasks<P>) -> Result<(), EngineError> {
    let mut problems = Vec::new();

    let mut worker_ids: HashSet<&WorkerId> = HashSet::new();
    for worker in workers {
        if worker.instances < MIN_INSTANCES || worker.instances > MAX_INSTANCES {
            problems.push(format!(
                "worker {:?} has {} instances, must be in {MIN_INSTANCES}..={MAX_INSTANCES}",
                worker.id, worker.instances
            ));
        }
        if !worker_ids.insert(&worker.id) {
            problems.push(format!("duplicate worker id {:?}", worker.id));
        }
    }

    for (worker_id, task_list) in tasks {
        if !worker_ids.contains(worker_id) {
            problems.push(format!(
                "worker tasks reference undeclared worker {worker_id:?}"
            ));
            continue;
        }

        if task_list.is_empty() {
            problems.push(format!("worker {worker_id:?} has an empty task list"));
            continue;
        }

        let mut seen = HashSet::new();
        for task in task_list {
            if !seen.insert(&task.id) {
                problems.push(format!(
                    "worker {worker_id:?} lists task {:?} more than once",
                    task.id
                ));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(EngineError::invalid(problems.join("; ")))
    }
}
