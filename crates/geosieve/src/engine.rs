mod ctx;
pub(crate) use ctx::JobCtx;

mod estimate;
use estimate::{estimate, Shape};

mod exec;
use exec::Job;

pub(crate) mod lower;

use crate::{
    artifact::{ArtifactManager, Lease},
    buffer::BufferTracker,
    cache::{Cache, CachedResult},
    chain::{Chains, Prepared},
    config::EngineConfig,
    db::Endpoint,
    geometry,
    history::{History, HistoryEntry},
    result::{ResultSet, StrategyPlan},
    ChangeKind,
};

use geosieve_core::{
    driver::{BackendKind, DatasetStats, Registry},
    schema::{Dataset, DatasetId},
    stmt::{Bindings, Expr, FilterRequest},
    Error, Fingerprint, Result, Schema,
};
use geosieve_sql::Serializer;

use indexmap::IndexMap;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Runs filter jobs and owns every piece of cross-job state.
#[derive(Debug)]
pub(crate) struct Engine {
    pub(crate) schema: Arc<Schema>,

    pub(crate) registry: Arc<Registry>,

    pub(crate) config: EngineConfig,

    pub(crate) endpoints: IndexMap<BackendKind, Arc<Endpoint>>,

    /// Backend to re-run on when a backend is unavailable
    pub(crate) fallbacks: IndexMap<BackendKind, BackendKind>,

    pub(crate) buffers: BufferTracker,

    pub(crate) artifacts: ArtifactManager,

    pub(crate) cache: Cache,

    pub(crate) chains: Chains,

    pub(crate) history: Mutex<History>,

    /// Content version per dataset, bumped on every change notification
    versions: Mutex<HashMap<DatasetId, u64>>,

    stats: Mutex<HashMap<(DatasetId, BackendKind), DatasetStats>>,
}

/// A finished job, ready to be committed.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) prepared: Prepared,
    pub(crate) plan: StrategyPlan,
    pub(crate) result: ResultSet,
}

impl Engine {
    pub(crate) fn new(
        schema: Arc<Schema>,
        registry: Arc<Registry>,
        config: EngineConfig,
        endpoints: IndexMap<BackendKind, Arc<Endpoint>>,
        fallbacks: IndexMap<BackendKind, BackendKind>,
    ) -> Engine {
        Engine {
            buffers: BufferTracker::new(),
            artifacts: ArtifactManager::new(config.artifact_ttl),
            cache: Cache::new(&config.cache),
            chains: Chains::new(),
            history: Mutex::new(History::new(config.history_depth)),
            versions: Mutex::new(HashMap::new()),
            stats: Mutex::new(HashMap::new()),
            schema,
            registry,
            config,
            endpoints,
            fallbacks,
        }
    }

    /// Runs one filter request. Artifacts the job creates or uses are
    /// recorded in `lease`; pass it to [`finish`](Self::finish) afterwards,
    /// whatever the outcome.
    pub(crate) async fn run(
        &self,
        request: &FilterRequest,
        ctx: &JobCtx,
        lease: &mut Lease,
    ) -> Result<Outcome> {
        let dataset = self.schema.dataset(&request.dataset)?;

        let mut prepared = self.chains.prepare(request)?;
        if prepared.position == 0 {
            self.buffers.invalidate(&dataset.id);
        }
        geometry::normalize_references(&mut prepared.step.effective, &self.cache.geometries)?;

        let filter = &prepared.step.effective;
        for reference in filter.referenced_datasets() {
            self.schema.dataset(&reference)?;
        }

        let res = match self.endpoint(dataset.backend) {
            Ok(endpoint) => self.run_on(endpoint, dataset, filter, ctx, lease, true).await,
            Err(err) => Err(err),
        };

        let (plan, result) = match res {
            Err(err) if err.is_backend_unavailable() => {
                let Some(fallback) = self.fallbacks.get(&dataset.backend) else {
                    return Err(err);
                };
                tracing::warn!(
                    dataset = %dataset.id,
                    backend = %dataset.backend,
                    %fallback,
                    error = %err,
                    "Backend unavailable, running on fallback"
                );
                let endpoint = self.endpoint(*fallback)?;
                self.run_on(endpoint, dataset, filter, ctx, lease, false)
                    .await?
            }
            res => res?,
        };

        Ok(Outcome {
            prepared,
            plan,
            result,
        })
    }

    async fn run_on(
        &self,
        endpoint: &Endpoint,
        dataset: &Dataset,
        filter: &Expr,
        ctx: &JobCtx,
        lease: &mut Lease,
        use_cache: bool,
    ) -> Result<(StrategyPlan, ResultSet)> {
        let _job = endpoint.lock_job().await;
        ctx.checkpoint()?;

        let kind = endpoint.kind();
        let depends = self.dependencies(&dataset.id, filter);
        let key = Fingerprint::of(&(&dataset.id, kind, filter, self.versions(&depends)));

        let cached = if use_cache {
            self.cache.queries.get(&key)
        } else {
            None
        };

        let stats = match &cached {
            Some(_) => DatasetStats { row_count: 0 },
            None => self.dataset_stats(endpoint, dataset).await?,
        };

        let plan = estimate(
            Shape::of(filter),
            endpoint.capability(),
            stats,
            cached.is_some(),
            &self.config,
        );
        ctx.plan(plan);
        tracing::info!(
            dataset = %dataset.id,
            backend = %kind,
            %plan,
            rows = stats.row_count,
            "Plan selected"
        );

        if let Some(cached) = cached {
            let result = ResultSet::new(
                dataset.id.clone(),
                cached.ids.to_vec(),
                cached.predicate.to_string(),
                kind,
            );
            return Ok((plan, result));
        }

        let predicate = self.predicate(endpoint, dataset, filter, &depends)?;

        let job = Job {
            engine: self,
            endpoint,
            dataset,
            filter,
            ctx,
            stats,
        };

        let ids = match plan {
            StrategyPlan::Direct | StrategyPlan::Cached => job.direct(&Bindings::new()).await?,
            StrategyPlan::Materialized => job.materialized(lease).await?,
            StrategyPlan::TwoPhase => job.two_phase().await?,
            StrategyPlan::Progressive => job.progressive().await?,
        };

        let result = ResultSet::new(dataset.id.clone(), ids, predicate.to_string(), kind);

        if use_cache {
            self.cache.queries.insert(
                key,
                CachedResult {
                    ids: result.ids.clone().into(),
                    predicate,
                },
                depends,
            );
        }

        Ok((plan, result))
    }

    /// Ends a job: releases what a failed job built, and forgets buffer
    /// state baked into anything released.
    pub(crate) async fn finish(&self, lease: Lease, succeeded: bool) {
        let released = self
            .artifacts
            .finish(&self.schema, &self.endpoints, lease, succeeded)
            .await;

        for name in &released {
            self.buffers.forget_artifact(name);
        }
    }

    /// Records a successful step in the chain and the dataset's history.
    /// Returns the history entry for the step.
    pub(crate) fn commit(&self, outcome: &Outcome) -> HistoryEntry {
        let dataset = &outcome.result.dataset;
        let chain = self.chains.commit(dataset, outcome.prepared.clone());

        let entry = HistoryEntry {
            dataset: dataset.clone(),
            filter: Some(outcome.prepared.step.effective.clone()),
            predicate: outcome.result.predicate.clone(),
            buffer: outcome.prepared.step.buffer,
            chain,
        };
        self.lock_history().record(entry.clone());
        entry
    }

    /// Applies restored history entries to the chain state.
    pub(crate) fn restore(&self, entries: &[HistoryEntry]) {
        for entry in entries {
            self.chains.restore(&entry.dataset, entry.chain.clone());
            self.buffers.invalidate(&entry.dataset);
        }
    }

    pub(crate) fn notify(&self, dataset: &DatasetId, change: ChangeKind) {
        let version = {
            let mut versions = lock(&self.versions);
            let version = versions.entry(dataset.clone()).or_default();
            *version += 1;
            *version
        };

        self.cache.invalidate(dataset);
        self.buffers.invalidate(dataset);
        lock(&self.stats).retain(|(id, _), _| id != dataset);

        if change == ChangeKind::Structure {
            self.chains.reset(dataset);
        }

        tracing::debug!(%dataset, ?change, version, "Dataset changed");
    }

    /// Drops expired, stale and orphaned artifacts. Returns how many were
    /// dropped.
    pub(crate) async fn sweep(&self) -> usize {
        let dropped = self
            .artifacts
            .sweep(&self.schema, &self.endpoints, |artifact| {
                self.source_fingerprint(&artifact.sources) != artifact.source_fingerprint
            })
            .await;

        for name in &dropped {
            self.buffers.forget_artifact(name);
        }
        dropped.len()
    }

    /// Forgets every chain, cached value and history ring.
    pub(crate) fn clear_session(&self) {
        self.chains.clear();
        self.buffers.clear();
        self.cache.clear();
        self.lock_history().clear();
    }

    pub(crate) fn endpoint(&self, kind: BackendKind) -> Result<&Endpoint> {
        self.endpoints
            .get(&kind)
            .map(|endpoint| &**endpoint)
            .ok_or_else(|| Error::backend_unavailable(kind, "no driver registered"))
    }

    pub(crate) fn lock_history(&self) -> MutexGuard<'_, History> {
        lock(&self.history)
    }

    /// Content fingerprint of `datasets`, for artifact staleness checks.
    pub(crate) fn source_fingerprint(&self, datasets: &[DatasetId]) -> Fingerprint {
        Fingerprint::of(&self.versions(datasets))
    }

    fn versions(&self, datasets: &[DatasetId]) -> Vec<(DatasetId, u64)> {
        let versions = lock(&self.versions);
        datasets
            .iter()
            .map(|dataset| (dataset.clone(), versions.get(dataset).copied().unwrap_or(0)))
            .collect()
    }

    /// The filtered dataset followed by every dataset the filter reads.
    fn dependencies(&self, dataset: &DatasetId, filter: &Expr) -> Vec<DatasetId> {
        let mut depends = vec![dataset.clone()];
        for reference in filter.referenced_datasets() {
            if !depends.contains(&reference) {
                depends.push(reference);
            }
        }
        depends
    }

    async fn dataset_stats(&self, endpoint: &Endpoint, dataset: &Dataset) -> Result<DatasetStats> {
        let key = (dataset.id.clone(), endpoint.kind());
        if let Some(stats) = lock(&self.stats).get(&key) {
            return Ok(*stats);
        }

        let op = lower::stats(&self.schema, endpoint.capability(), &dataset.id)?;
        let stats = endpoint.exec(&self.schema, op).await?.rows.into_stats()?;

        lock(&self.stats).insert(key, stats);
        Ok(stats)
    }

    /// The effective filter as native predicate text, through the expression
    /// cache tier.
    fn predicate(
        &self,
        endpoint: &Endpoint,
        dataset: &Dataset,
        filter: &Expr,
        depends: &[DatasetId],
    ) -> Result<Arc<str>> {
        let kind = endpoint.kind();
        let key = Fingerprint::of(&(kind, &dataset.id, filter));

        self.cache.expressions.get_or_try_insert(
            key,
            || depends.to_vec(),
            || {
                Serializer::for_backend(&self.schema, &self.registry, kind)?
                    .translate(&dataset.id, filter, &Bindings::new())
                    .map(Arc::from)
            },
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
