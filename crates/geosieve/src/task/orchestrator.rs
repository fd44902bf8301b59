use super::{TaskHandle, TaskId, TaskState};
use crate::{
    artifact::Lease,
    engine::{Engine, JobCtx},
    history::{Direction, HistoryEntry, HistorySnapshot, Scope},
};

use geosieve_core::{schema::DatasetId, stmt::FilterRequest, Error, Result};

use indexmap::IndexMap;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot, watch, Mutex as AsyncMutex, Semaphore},
};
use tokio_util::sync::CancellationToken;

/// Finished tasks kept around for `poll` before the oldest are dropped.
const RETAINED_TASKS: usize = 1024;

/// Queues filter jobs and runs them in the background.
///
/// Every dataset has its own queue, drained by one task, so jobs on a
/// dataset run in submission order. Queues of different datasets drain
/// concurrently, bounded by the worker semaphore.
#[derive(Debug)]
pub(crate) struct Orchestrator {
    engine: Arc<Engine>,
    runtime: Handle,
    workers: Arc<Semaphore>,
    next_id: AtomicU64,
    tasks: Mutex<IndexMap<TaskId, Task>>,
    queues: Mutex<HashMap<DatasetId, mpsc::UnboundedSender<Work>>>,

    /// One undo or redo at a time, so their barriers never interleave.
    history_moves: AsyncMutex<()>,
}

#[derive(Debug)]
struct Task {
    status: Arc<watch::Sender<TaskHandle>>,
    cancel: CancellationToken,
}

#[derive(Debug)]
enum Work {
    Job(Queued),

    /// Holds the queue while history moves.
    Barrier(Barrier),
}

/// Signals `reached` once every earlier job of the queue ended, then keeps
/// later jobs waiting until `release` resolves or is dropped.
#[derive(Debug)]
struct Barrier {
    reached: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

/// A job waiting in its dataset's queue.
#[derive(Debug)]
struct Queued {
    id: TaskId,
    request: FilterRequest,
    status: Arc<watch::Sender<TaskHandle>>,
    cancel: CancellationToken,
    step: Arc<Mutex<LogicalStep>>,
}

/// Jobs submitted together. Their history is recorded as one global step
/// once the last of them ends.
#[derive(Debug, Default)]
struct LogicalStep {
    remaining: usize,
    entries: Vec<HistoryEntry>,
}

impl Orchestrator {
    pub(crate) fn new(engine: Arc<Engine>, runtime: Handle) -> Orchestrator {
        Orchestrator {
            workers: Arc::new(Semaphore::new(engine.config.max_workers.max(1))),
            engine,
            runtime,
            next_id: AtomicU64::new(1),
            tasks: Mutex::new(IndexMap::new()),
            queues: Mutex::new(HashMap::new()),
            history_moves: AsyncMutex::new(()),
        }
    }

    /// Queues `requests` as one logical step. Nothing is queued when any of
    /// them names an unknown dataset.
    pub(crate) fn submit_all(&self, requests: Vec<FilterRequest>) -> Result<Vec<TaskId>> {
        for request in &requests {
            self.engine.schema.dataset(&request.dataset)?;
        }

        let step = Arc::new(Mutex::new(LogicalStep {
            remaining: requests.len(),
            entries: vec![],
        }));

        let mut ids = Vec::with_capacity(requests.len());
        for request in requests {
            let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
            let (status, _) = watch::channel(TaskHandle::pending(id, request.dataset.clone()));
            let status = Arc::new(status);
            let cancel = CancellationToken::new();

            self.insert_task(
                id,
                Task {
                    status: status.clone(),
                    cancel: cancel.clone(),
                },
            );

            tracing::debug!(task = %id, dataset = %request.dataset, "Task queued");
            self.enqueue(
                request.dataset.clone(),
                Work::Job(Queued {
                    id,
                    request,
                    status,
                    cancel,
                    step: step.clone(),
                }),
            );
            ids.push(id);
        }

        Ok(ids)
    }

    pub(crate) fn poll(&self, id: TaskId) -> Result<TaskHandle> {
        let tasks = self.lock_tasks();
        let task = tasks.get(&id).ok_or_else(|| unknown(id))?;
        let handle = task.status.borrow().clone();
        Ok(handle)
    }

    /// Requests cancellation. A job that has not started is cancelled at
    /// once; a running job stops at its next checkpoint. Returns `false`
    /// when the task already ended.
    pub(crate) fn cancel(&self, id: TaskId) -> Result<bool> {
        let (status, cancel) = {
            let tasks = self.lock_tasks();
            let task = tasks.get(&id).ok_or_else(|| unknown(id))?;
            (task.status.clone(), task.cancel.clone())
        };

        if status.borrow().is_terminal() {
            return Ok(false);
        }
        cancel.cancel();

        let was_pending = status.send_if_modified(|handle| {
            if handle.state != TaskState::Pending {
                return false;
            }
            handle.state = TaskState::Cancelled;
            handle.error = Some(Error::filter_cancelled());
            true
        });

        tracing::debug!(task = %id, was_pending, "Task cancellation requested");
        Ok(true)
    }

    /// Waits until the task ends.
    pub(crate) async fn wait(&self, id: TaskId) -> Result<TaskHandle> {
        let mut rx = {
            let tasks = self.lock_tasks();
            tasks.get(&id).ok_or_else(|| unknown(id))?.status.subscribe()
        };

        if let Ok(handle) = rx.wait_for(TaskHandle::is_terminal).await {
            return Ok(handle.clone());
        }

        // The runner is gone. Report the last published state.
        let handle = rx.borrow().clone();
        Ok(handle)
    }

    /// Moves history one step in `direction` and restores the chains it
    /// describes.
    ///
    /// The move waits behind every job already queued on the datasets it
    /// restores, and jobs submitted to them meanwhile wait for the move, so
    /// no job commits against a chain replaced under it.
    pub(crate) async fn travel(&self, scope: Scope, direction: Direction) -> Option<HistorySnapshot> {
        let _serial = self.history_moves.lock().await;

        loop {
            let datasets = self.engine.lock_history().peek(&scope, direction)?;

            let mut releases = Vec::with_capacity(datasets.len());
            let mut reached = Vec::with_capacity(datasets.len());
            for dataset in &datasets {
                let (reached_tx, reached_rx) = oneshot::channel();
                let (release_tx, release_rx) = oneshot::channel();
                self.enqueue(
                    dataset.clone(),
                    Work::Barrier(Barrier {
                        reached: reached_tx,
                        release: release_rx,
                    }),
                );
                reached.push(reached_rx);
                releases.push(release_tx);
            }

            for rx in reached {
                // An error means the queue task is gone; nothing runs there.
                let _ = rx.await;
            }

            let moved = {
                let mut history = self.engine.lock_history();
                // A job on another dataset may have recorded a global step
                // while the barriers were queued.
                let covered = history
                    .peek(&scope, direction)
                    .map_or(true, |now| now.iter().all(|dataset| datasets.contains(dataset)));
                covered.then(|| history.travel(&scope, direction))
            };

            if let Some(snapshot) = moved {
                if let Some(snapshot) = &snapshot {
                    self.engine.restore(&snapshot.entries);
                }
                drop(releases);
                return snapshot;
            }
        }
    }

    fn enqueue(&self, dataset: DatasetId, mut work: Work) {
        let mut queues = self.lock_queues();

        if let Some(tx) = queues.get(&dataset) {
            match tx.send(work) {
                Ok(()) => return,
                // The queue task is gone; start a new one below.
                Err(mpsc::error::SendError(returned)) => work = returned,
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(work);
        queues.insert(dataset.clone(), tx);

        self.runtime.spawn(drain(
            self.engine.clone(),
            self.workers.clone(),
            dataset,
            rx,
        ));
    }

    fn insert_task(&self, id: TaskId, task: Task) {
        let mut tasks = self.lock_tasks();
        tasks.insert(id, task);

        let mut excess = tasks.len().saturating_sub(RETAINED_TASKS);
        if excess > 0 {
            tasks.retain(|_, task| {
                if excess > 0 && task.status.borrow().is_terminal() {
                    excess -= 1;
                    return false;
                }
                true
            });
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, IndexMap<TaskId, Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_queues(&self) -> MutexGuard<'_, HashMap<DatasetId, mpsc::UnboundedSender<Work>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs the jobs of one dataset, one at a time.
async fn drain(
    engine: Arc<Engine>,
    workers: Arc<Semaphore>,
    dataset: DatasetId,
    mut rx: mpsc::UnboundedReceiver<Work>,
) {
    while let Some(work) = rx.recv().await {
        match work {
            Work::Job(job) => {
                let Ok(_permit) = workers.clone().acquire_owned().await else {
                    break;
                };
                run(&engine, job).await;
            }
            Work::Barrier(barrier) => {
                let _ = barrier.reached.send(());
                let _ = barrier.release.await;
            }
        }
    }
    tracing::debug!(%dataset, "Dataset queue closed");
}

async fn run(engine: &Engine, job: Queued) {
    let Queued {
        id,
        request,
        status,
        cancel,
        step,
    } = job;

    let started = status.send_if_modified(|handle| {
        if handle.state != TaskState::Pending {
            return false;
        }
        handle.state = TaskState::Running;
        true
    });

    if !started {
        end_step(engine, &step, None);
        return;
    }
    tracing::debug!(task = %id, dataset = %request.dataset, "Task running");

    let ctx = JobCtx::new(cancel.clone(), status.clone());
    let timeout = request.timeout.unwrap_or(engine.config.default_timeout);
    let mut lease = Lease::new();

    let res = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::filter_cancelled()),
        res = tokio::time::timeout(timeout, engine.run(&request, &ctx, &mut lease)) => {
            res.unwrap_or_else(|_| Err(Error::filter_timeout(timeout)))
        }
    };

    // Artifacts and connections are released before anyone sees the end.
    engine.finish(lease, res.is_ok()).await;

    // History is recorded before the end is published, so whoever waits on
    // the task sees it.
    match res {
        Ok(outcome) => {
            let entry = engine.commit(&outcome);
            end_step(engine, &step, Some(entry));
            tracing::info!(
                task = %id,
                dataset = %request.dataset,
                plan = %outcome.plan,
                matched = outcome.result.len(),
                "Task succeeded"
            );
            status.send_modify(|handle| {
                handle.state = TaskState::Succeeded;
                handle.progress = 100;
                handle.plan = Some(outcome.plan);
                handle.result = Some(outcome.result);
            });
        }
        Err(err) => {
            end_step(engine, &step, None);
            let state = if err.is_filter_cancelled() {
                TaskState::Cancelled
            } else {
                TaskState::Failed
            };
            tracing::info!(task = %id, dataset = %request.dataset, ?state, error = %err, "Task ended");
            status.send_modify(|handle| {
                handle.state = state;
                handle.error = Some(err);
            });
        }
    }
}

/// Counts one job of a logical step as done, recording the step once all
/// of its jobs are.
fn end_step(engine: &Engine, step: &Mutex<LogicalStep>, entry: Option<HistoryEntry>) {
    let entries = {
        let mut step = step.lock().unwrap_or_else(PoisonError::into_inner);
        step.entries.extend(entry);
        step.remaining = step.remaining.saturating_sub(1);
        if step.remaining > 0 {
            return;
        }
        std::mem::take(&mut step.entries)
    };

    engine.lock_history().record_step(entries);
}

fn unknown(id: TaskId) -> Error {
    Error::invalid_request(format!("unknown task {id}"))
}
