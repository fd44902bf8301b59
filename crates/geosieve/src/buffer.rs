use geosieve_core::{
    driver::BackendKind, schema::DatasetId, stmt::ExprSpatial, Error, Fingerprint, Result,
};

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// The buffer a dataset's active chain has baked into an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferState {
    pub dataset: DatasetId,

    /// Buffer distance of the chain. Zero when nothing is baked.
    pub buffer: f64,

    /// Whether `artifact` holds the buffered reference geometry.
    pub baked: bool,

    pub artifact: Option<String>,
}

/// Tracks, per dataset, which buffered reference is baked into which
/// artifact, so later chain steps bind to it instead of re-buffering.
#[derive(Debug, Default)]
pub(crate) struct BufferTracker {
    states: Mutex<HashMap<DatasetId, Baked>>,
}

#[derive(Debug, Clone)]
struct Baked {
    buffer: f64,
    bake_key: Fingerprint,
    backend: BackendKind,
    artifact: String,
}

/// What to do with a spatial predicate before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// The predicate's buffered reference is already baked.
    Reuse { artifact: String },

    /// Nothing usable is baked. Build an artifact.
    Build,
}

impl BufferTracker {
    pub(crate) fn new() -> BufferTracker {
        BufferTracker::default()
    }

    pub(crate) fn get(&self, dataset: &DatasetId) -> BufferState {
        match self.lock().get(dataset) {
            Some(baked) => BufferState {
                dataset: dataset.clone(),
                buffer: baked.buffer,
                baked: true,
                artifact: Some(baked.artifact.clone()),
            },
            None => BufferState {
                dataset: dataset.clone(),
                buffer: 0.0,
                baked: false,
                artifact: None,
            },
        }
    }

    /// Checks `node` against the baked state of `dataset`.
    ///
    /// Fails with a buffer state conflict when a different non-zero buffer is
    /// baked. The state itself is never changed here.
    pub(crate) fn resolve(
        &self,
        dataset: &DatasetId,
        node: &ExprSpatial,
        backend: BackendKind,
    ) -> Result<Resolution> {
        let states = self.lock();
        let Some(baked) = states.get(dataset) else {
            return Ok(Resolution::Build);
        };

        if baked.backend != backend {
            return Ok(Resolution::Build);
        }

        if baked.bake_key == node.bake_key() {
            return Ok(Resolution::Reuse {
                artifact: baked.artifact.clone(),
            });
        }

        if node.is_buffered() && baked.buffer != node.buffer {
            return Err(Error::buffer_state_conflict(
                dataset,
                baked.buffer,
                node.buffer,
            ));
        }

        Ok(Resolution::Build)
    }

    /// Records a successfully built artifact as the dataset's baked buffer.
    pub(crate) fn record_baked(
        &self,
        dataset: &DatasetId,
        node: &ExprSpatial,
        backend: BackendKind,
        artifact: impl Into<String>,
    ) {
        let artifact = artifact.into();
        tracing::debug!(%dataset, buffer = node.buffer, %artifact, "Buffer baked");

        self.lock().insert(
            dataset.clone(),
            Baked {
                buffer: node.buffer,
                bake_key: node.bake_key(),
                backend,
                artifact,
            },
        );
    }

    pub(crate) fn invalidate(&self, dataset: &DatasetId) {
        if self.lock().remove(dataset).is_some() {
            tracing::debug!(%dataset, "Buffer state invalidated");
        }
    }

    /// Drops the state of any dataset baked into `artifact`.
    pub(crate) fn forget_artifact(&self, artifact: &str) {
        self.lock().retain(|_, baked| baked.artifact != artifact);
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DatasetId, Baked>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
