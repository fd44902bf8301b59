mod builder;
pub use builder::Builder;

mod endpoint;
pub(crate) use endpoint::Endpoint;

mod pool;
pub(crate) use pool::Pool;
pub use pool::{PoolConfig, Timeouts};

pub use crate::resilience::BreakerState;

use crate::{
    artifact::Artifact,
    buffer::BufferState,
    engine::Engine,
    history::{Direction, HistorySnapshot, Scope},
    result::ResultSet,
    task::{Orchestrator, TaskHandle, TaskId},
    ChangeKind,
};

use geosieve_core::{
    driver::BackendKind,
    schema::DatasetId,
    stmt::{Expr, FilterRequest},
    Result, Schema,
};

use std::sync::Arc;
use tokio_util::sync::DropGuard;

/// Handle to a filter engine. Cheap to clone; clones share the engine.
///
/// Dropping the last clone stops the background artifact sweep. Jobs still
/// queued keep running to completion.
#[derive(Debug, Clone)]
pub struct Db {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    engine: Arc<Engine>,
    orchestrator: Orchestrator,
    _sweeper: DropGuard,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Queues a filter job and returns at once.
    ///
    /// Fails only when the request names a dataset the engine does not
    /// know; every other failure ends up on the task's handle.
    pub fn submit(&self, request: FilterRequest) -> Result<TaskId> {
        let mut ids = self.shared.orchestrator.submit_all(vec![request])?;
        ids.pop()
            .ok_or_else(|| geosieve_core::err!("submission produced no task"))
    }

    /// Queues several jobs as one logical step. A global undo reverts all of
    /// them together.
    pub fn submit_all(&self, requests: impl IntoIterator<Item = FilterRequest>) -> Result<Vec<TaskId>> {
        self.shared
            .orchestrator
            .submit_all(requests.into_iter().collect())
    }

    pub fn poll(&self, id: TaskId) -> Result<TaskHandle> {
        self.shared.orchestrator.poll(id)
    }

    /// Asks a job to stop. Returns `false` when it already ended.
    pub fn cancel(&self, id: TaskId) -> Result<bool> {
        self.shared.orchestrator.cancel(id)
    }

    /// Waits for a job to end and returns its final handle.
    pub async fn wait(&self, id: TaskId) -> Result<TaskHandle> {
        self.shared.orchestrator.wait(id).await
    }

    /// Submits `request` and waits for its result.
    pub async fn filter(&self, request: FilterRequest) -> Result<ResultSet> {
        let id = self.submit(request)?;
        self.wait(id).await?.into_result()
    }

    /// Tells the engine a dataset changed outside of it. Everything derived
    /// from the old content is dropped.
    pub fn notify(&self, dataset: &DatasetId, change: ChangeKind) -> Result<()> {
        self.shared.engine.schema.dataset(dataset)?;
        self.shared.engine.notify(dataset, change);
        Ok(())
    }

    /// Steps back in history and restores the chain state it describes.
    /// Returns the restored state, or `None` when there is nothing to undo.
    ///
    /// Jobs already queued on the restored datasets end first; jobs
    /// submitted meanwhile run against the restored chains. Each restored
    /// entry's [`chain_len`](crate::HistoryEntry::chain_len) is the position the
    /// next chained request continues at.
    pub async fn undo(&self, scope: Scope) -> Option<HistorySnapshot> {
        let snapshot = self
            .shared
            .orchestrator
            .travel(scope.clone(), Direction::Undo)
            .await?;
        tracing::debug!(?scope, sequence = snapshot.sequence, "Undo");
        Some(snapshot)
    }

    /// Re-applies the state most recently undone.
    pub async fn redo(&self, scope: Scope) -> Option<HistorySnapshot> {
        let snapshot = self
            .shared
            .orchestrator
            .travel(scope.clone(), Direction::Redo)
            .await?;
        tracing::debug!(?scope, sequence = snapshot.sequence, "Redo");
        Some(snapshot)
    }

    /// The dataset's current effective filter, if a chain is active.
    pub fn effective_filter(&self, dataset: &DatasetId) -> Option<Expr> {
        self.shared
            .engine
            .chains
            .last(dataset)
            .map(|step| step.effective)
    }

    /// Number of steps in the dataset's active chain.
    pub fn chain_len(&self, dataset: &DatasetId) -> usize {
        self.shared.engine.chains.len(dataset)
    }

    pub fn buffer_state(&self, dataset: &DatasetId) -> BufferState {
        self.shared.engine.buffers.get(dataset)
    }

    /// Every artifact currently tracked, live or waiting to be dropped.
    pub fn artifacts(&self) -> Vec<Artifact> {
        self.shared.engine.artifacts.list()
    }

    /// Whether the artifact `name` exists and may still be used.
    pub fn is_artifact_live(&self, name: &str) -> bool {
        self.shared.engine.artifacts.is_live(name)
    }

    /// Runs the artifact sweep now instead of waiting for the next interval.
    /// Returns the number of artifacts dropped.
    pub async fn sweep_expired(&self) -> usize {
        self.shared.engine.sweep().await
    }

    /// Forgets every chain, buffer state, cached value and history entry.
    /// Artifacts are left to expire.
    pub fn clear_session(&self) {
        self.shared.engine.clear_session();
    }

    /// Pings every backend once.
    pub async fn health_check(&self) -> Vec<(BackendKind, bool)> {
        let mut out = vec![];
        for (kind, endpoint) in &self.shared.engine.endpoints {
            out.push((*kind, endpoint.health_check().await));
        }
        out
    }

    pub fn breaker_state(&self, backend: BackendKind) -> Option<BreakerState> {
        self.shared
            .engine
            .endpoints
            .get(&backend)
            .map(|endpoint| endpoint.breaker_state())
    }

    /// Connections the backend's pool may hold at once.
    pub fn max_connections(&self, backend: BackendKind) -> Option<usize> {
        self.shared
            .engine
            .endpoints
            .get(&backend)
            .map(|endpoint| endpoint.max_connections())
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.shared.engine.schema
    }
}
