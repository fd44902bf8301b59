use crate::{db::Endpoint, engine::lower};

use geosieve_core::{
    driver::BackendKind,
    schema::{Dataset, DatasetId},
    stmt::ExprSpatial,
    Error, Fingerprint, Result, Schema,
};

use indexmap::IndexMap;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::{Duration, Instant},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A backend-side structure holding a buffered reference geometry, with a
/// spatial index when the backend has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Backend object name
    pub name: String,

    pub backend: BackendKind,

    /// Dataset whose CRS the stored geometries use
    pub target: DatasetId,

    pub srid: u32,

    pub created_at: Instant,

    /// Lifetime, counted from `created_at`. Reuse does not extend it.
    pub ttl: Duration,

    /// Identity of the buffered reference. Equal fingerprints are
    /// interchangeable.
    pub fingerprint: Fingerprint,

    /// Datasets the reference geometry was read from
    pub sources: Vec<DatasetId>,

    /// Content fingerprint of `sources` at build time
    pub source_fingerprint: Fingerprint,
}

/// Owns every artifact the engine created.
#[derive(Debug)]
pub(crate) struct ArtifactManager {
    ttl: Duration,
    entries: Mutex<IndexMap<String, Entry>>,

    /// Builds in progress. The builder holds the slot's lock until the
    /// outcome is stored in it.
    in_flight: Mutex<HashMap<Fingerprint, Slot>>,
}

type Slot = Arc<AsyncMutex<Option<Result<Artifact>>>>;

#[derive(Debug)]
struct Entry {
    artifact: Artifact,
    status: Status,

    /// Jobs using the artifact, one reference per use. A dead reference is
    /// a job that went away without finishing.
    users: Vec<Weak<()>>,

    /// The job that created the artifact, until it finishes successfully.
    /// A dead reference means the job vanished without cleaning up.
    creator: Option<Weak<()>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Building,
    Live,

    /// Dropping failed; the sweep retries.
    Orphaned,
}

/// The artifacts one job created and used.
#[derive(Debug, Default)]
pub(crate) struct Lease {
    token: Arc<()>,
    created: Vec<String>,
    used: Vec<String>,
}

/// Removes a build's in-flight entry when the build ends, including when
/// the building job is dropped mid-way.
struct InFlightGuard<'a> {
    manager: &'a ArtifactManager,
    fingerprint: Fingerprint,
    slot: Slot,
}

enum Action {
    Hit(Artifact),
    Wait(Slot),
    Build(Slot, OwnedMutexGuard<Option<Result<Artifact>>>),
}

/// What [`ArtifactManager::acquire`] needs to know about the artifact.
pub(crate) struct Request<'a> {
    pub(crate) schema: &'a Arc<Schema>,
    pub(crate) endpoint: &'a Endpoint,
    pub(crate) target: &'a Dataset,
    pub(crate) spatial: &'a ExprSpatial,
    pub(crate) sources: Vec<DatasetId>,
    pub(crate) source_fingerprint: Fingerprint,
}

impl ArtifactManager {
    pub(crate) fn new(ttl: Duration) -> ArtifactManager {
        ArtifactManager {
            ttl,
            entries: Mutex::new(IndexMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a live artifact for the request's buffered reference, building
    /// it when none exists. Concurrent requests for the same reference share
    /// one build.
    pub(crate) async fn acquire(&self, req: Request<'_>, lease: &mut Lease) -> Result<Artifact> {
        let fingerprint = Fingerprint::of(&(
            req.endpoint.kind(),
            req.spatial.bake_key(),
            &req.target.id,
            req.target.srid,
        ));

        loop {
            let action = self.lookup(fingerprint, req.source_fingerprint, lease)?;

            match action {
                Action::Hit(artifact) => {
                    tracing::debug!(artifact = %artifact.name, "Reusing artifact");
                    return Ok(artifact);
                }
                Action::Wait(slot) => {
                    let outcome = slot.lock().await.clone();
                    match outcome {
                        // Register the use through the regular lookup.
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => return Err(err),
                        None => {
                            // The builder was dropped before finishing.
                            self.remove_in_flight(fingerprint, &slot);
                            continue;
                        }
                    }
                }
                Action::Build(slot, mut outcome) => {
                    let _guard = InFlightGuard {
                        manager: self,
                        fingerprint,
                        slot,
                    };
                    let res = self.build(&req, fingerprint, lease).await;
                    *outcome = Some(res.clone());
                    return res;
                }
            }
        }
    }

    /// Registers a use of the artifact named `name`, if it is still live and
    /// built from the current content.
    pub(crate) fn adopt(
        &self,
        name: &str,
        source_fingerprint: Fingerprint,
        lease: &mut Lease,
    ) -> Option<Artifact> {
        let mut entries = self.lock();
        let entry = entries.get_mut(name)?;

        if entry.status != Status::Live
            || entry.artifact.source_fingerprint != source_fingerprint
            || self.is_expired(entry)
        {
            return None;
        }

        entry.users.push(lease.user());
        lease.used.push(name.to_string());
        Some(entry.artifact.clone())
    }

    fn lookup(
        &self,
        fingerprint: Fingerprint,
        source_fingerprint: Fingerprint,
        lease: &mut Lease,
    ) -> Result<Action> {
        let mut entries = self.lock();

        let mut stale = vec![];
        let mut hit = None;

        for (name, entry) in entries.iter_mut() {
            if entry.artifact.fingerprint != fingerprint || entry.status != Status::Live {
                continue;
            }

            if entry.artifact.source_fingerprint != source_fingerprint || self.is_expired(entry) {
                stale.push(name.clone());
                continue;
            }

            entry.users.push(lease.user());
            hit = Some(entry.artifact.clone());
            break;
        }

        for name in stale {
            if let Some(entry) = entries.get_mut(&name) {
                let err = Error::artifact_stale(&name, "source changed or ttl elapsed");
                tracing::debug!(error = %err, "Not reusing artifact");
                entry.status = Status::Orphaned;
            }
        }

        if let Some(artifact) = hit {
            lease.used.push(artifact.name.clone());
            return Ok(Action::Hit(artifact));
        }

        // Still holding `entries`: a build cannot finish between the two
        // checks.
        let mut in_flight = self.lock_in_flight();
        if let Some(slot) = in_flight.get(&fingerprint) {
            return Ok(Action::Wait(slot.clone()));
        }

        let slot: Slot = Arc::new(AsyncMutex::new(None));
        let outcome = slot
            .clone()
            .try_lock_owned()
            .map_err(|_| geosieve_core::err!("artifact build slot already locked"))?;
        in_flight.insert(fingerprint, slot.clone());
        Ok(Action::Build(slot, outcome))
    }

    async fn build(
        &self,
        req: &Request<'_>,
        fingerprint: Fingerprint,
        lease: &mut Lease,
    ) -> Result<Artifact> {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("gs_{}_{}", fingerprint.short(), &suffix[..8]);

        let artifact = Artifact {
            name: name.clone(),
            backend: req.endpoint.kind(),
            target: req.target.id.clone(),
            srid: req.target.srid,
            created_at: Instant::now(),
            ttl: self.ttl,
            fingerprint,
            sources: req.sources.clone(),
            source_fingerprint: req.source_fingerprint,
        };

        // Registered before the backend sees it, so cleanup finds it even if
        // the job is dropped mid-build.
        self.lock().insert(
            name.clone(),
            Entry {
                artifact: artifact.clone(),
                status: Status::Building,
                users: vec![lease.user()],
                creator: Some(lease.user()),
            },
        );
        lease.created.push(name.clone());
        lease.used.push(name.clone());

        tracing::info!(
            artifact = %name,
            backend = %artifact.backend,
            target = %artifact.target,
            buffer = req.spatial.buffer,
            "Materializing artifact"
        );

        let op = lower::materialize(
            req.schema,
            req.endpoint.capability(),
            &req.target.id,
            &name,
            req.spatial,
        )?;
        req.endpoint.exec(req.schema, op).await?;

        if let Some(entry) = self.lock().get_mut(&name) {
            entry.status = Status::Live;
        }
        Ok(artifact)
    }

    /// Ends a job's use of its artifacts.
    ///
    /// On success the artifacts it created stay live until their TTL runs
    /// out. Otherwise they are dropped, unless another job picked them up in
    /// the meantime. A drop the backend refuses leaves the artifact
    /// orphaned for the sweep. Returns the names of the dropped artifacts.
    pub(crate) async fn finish(
        &self,
        schema: &Arc<Schema>,
        endpoints: &IndexMap<BackendKind, Arc<Endpoint>>,
        lease: Lease,
        succeeded: bool,
    ) -> Vec<String> {
        let mut release = vec![];
        {
            let mut entries = self.lock();
            let user = lease.user();
            for name in &lease.used {
                if let Some(entry) = entries.get_mut(name) {
                    if let Some(i) = entry.users.iter().position(|u| u.ptr_eq(&user)) {
                        entry.users.swap_remove(i);
                    }
                }
            }

            for name in &lease.created {
                let Some(entry) = entries.get_mut(name) else {
                    continue;
                };

                if succeeded || (entry.in_use() && entry.status == Status::Live) {
                    entry.creator = None;
                } else {
                    release.push(entry.artifact.clone());
                }
            }
        }

        let mut released = vec![];
        for artifact in release {
            if self.release(schema, endpoints, &artifact).await {
                released.push(artifact.name);
            }
        }
        released
    }

    /// Drops the artifacts no job is using that expired, whose creating job
    /// vanished, that are stale, or whose earlier drop failed. Returns the
    /// names of the dropped artifacts.
    pub(crate) async fn sweep(
        &self,
        schema: &Arc<Schema>,
        endpoints: &IndexMap<BackendKind, Arc<Endpoint>>,
        is_stale: impl Fn(&Artifact) -> bool,
    ) -> Vec<String> {
        let doomed: Vec<Artifact> = self
            .lock()
            .values()
            .filter(|entry| {
                if entry.in_use() {
                    return false;
                }

                // The creating job ended without releasing its uses.
                let abandoned = entry
                    .creator
                    .as_ref()
                    .is_some_and(|creator| creator.strong_count() == 0);

                abandoned
                    || entry.status == Status::Orphaned
                    || self.is_expired(entry)
                    || is_stale(&entry.artifact)
            })
            .map(|entry| entry.artifact.clone())
            .collect();

        let mut dropped = vec![];
        for artifact in doomed {
            if self.release(schema, endpoints, &artifact).await {
                dropped.push(artifact.name);
            }
        }

        if !dropped.is_empty() {
            tracing::info!(dropped = dropped.len(), "Swept artifacts");
        }
        dropped
    }

    /// Drops one artifact on its backend. Returns `false` and marks it
    /// orphaned when the backend cannot be reached.
    async fn release(
        &self,
        schema: &Arc<Schema>,
        endpoints: &IndexMap<BackendKind, Arc<Endpoint>>,
        artifact: &Artifact,
    ) -> bool {
        let res = match endpoints.get(&artifact.backend) {
            Some(endpoint) => match lower::release(
                schema,
                endpoint.capability(),
                &artifact.target,
                &artifact.name,
            ) {
                Ok(Some(op)) => endpoint.exec(schema, op).await.map(|_| ()),
                Ok(None) => Ok(()),
                Err(err) => Err(err),
            },
            None => Err(Error::unsupported_backend(artifact.backend)),
        };

        match res {
            Ok(()) => {
                tracing::debug!(artifact = %artifact.name, "Released artifact");
                self.lock().shift_remove(&artifact.name);
                true
            }
            Err(err) => {
                tracing::warn!(artifact = %artifact.name, error = %err, "Failed to release artifact");
                if let Some(entry) = self.lock().get_mut(&artifact.name) {
                    entry.status = Status::Orphaned;
                    entry.creator = None;
                }
                false
            }
        }
    }

    /// Whether `name` is live and may be used.
    pub(crate) fn is_live(&self, name: &str) -> bool {
        self.lock()
            .get(name)
            .is_some_and(|entry| entry.status == Status::Live && !self.is_expired(entry))
    }

    /// Every artifact the manager currently tracks.
    pub(crate) fn list(&self) -> Vec<Artifact> {
        self.lock().values().map(|entry| entry.artifact.clone()).collect()
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        entry.artifact.created_at.elapsed() >= entry.artifact.ttl
    }

    fn remove_in_flight(&self, fingerprint: Fingerprint, slot: &Slot) {
        let mut in_flight = self.lock_in_flight();
        if in_flight
            .get(&fingerprint)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            in_flight.remove(&fingerprint);
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<Fingerprint, Slot>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Entry {
    fn in_use(&self) -> bool {
        self.users.iter().any(|user| user.strong_count() > 0)
    }
}

impl Lease {
    pub(crate) fn new() -> Lease {
        Lease::default()
    }

    fn user(&self) -> Weak<()> {
        Arc::downgrade(&self.token)
    }

    #[cfg(test)]
    pub(crate) fn created(&self) -> &[String] {
        &self.created
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.manager.remove_in_flight(self.fingerprint, &self.slot);
    }
}
