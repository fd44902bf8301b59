use super::{lower, Engine, JobCtx};
use crate::{
    artifact::{Artifact, Lease, Request},
    buffer::Resolution,
    db::Endpoint,
};

use geosieve_core::{
    driver::{DatasetStats, Operation, Rows},
    schema::Dataset,
    stmt::{Bindings, Expr, ExprSpatial, GeometryRef, RecordId, SpatialRelation},
    Fingerprint, Result,
};

/// One filter job running a chosen plan on one endpoint.
pub(super) struct Job<'a> {
    pub(super) engine: &'a Engine,
    pub(super) endpoint: &'a Endpoint,
    pub(super) dataset: &'a Dataset,
    pub(super) filter: &'a Expr,
    pub(super) ctx: &'a JobCtx,
    pub(super) stats: DatasetStats,
}

impl Job<'_> {
    /// A single query over the whole dataset.
    pub(super) async fn direct(&self, bindings: &Bindings) -> Result<Vec<RecordId>> {
        let op = lower::select_ids(
            &self.engine.schema,
            self.endpoint.capability(),
            &self.dataset.id,
            self.filter,
            bindings,
        )?;
        self.exec(op).await?.into_ids()
    }

    /// Bakes every buffered or dataset-backed reference into an artifact,
    /// then runs one query bound to the artifacts.
    pub(super) async fn materialized(&self, lease: &mut Lease) -> Result<Vec<RecordId>> {
        let mut bindings = Bindings::new();
        let mut seen: Vec<Fingerprint> = vec![];

        for node in self.filter.spatial_nodes() {
            if !node.is_buffered() && !matches!(node.reference, GeometryRef::Dataset { .. }) {
                continue;
            }

            let key = node.bake_key();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);

            self.ctx.checkpoint()?;

            let artifact = self.artifact_for(node, lease).await?;
            bindings.bind(key, artifact.name, artifact.srid);
        }

        self.ctx.checkpoint()?;
        self.direct(&bindings).await
    }

    /// The artifact for one spatial node: the one baked by an earlier chain
    /// step when it still fits, a new one otherwise.
    async fn artifact_for(&self, node: &ExprSpatial, lease: &mut Lease) -> Result<Artifact> {
        let engine = self.engine;
        let kind = self.endpoint.kind();
        let sources = match &node.reference {
            GeometryRef::Dataset { dataset, .. } => vec![dataset.clone()],
            _ => vec![],
        };
        let source_fingerprint = engine.source_fingerprint(&sources);

        match engine.buffers.resolve(&self.dataset.id, node, kind) {
            Ok(Resolution::Reuse { artifact }) => {
                if let Some(artifact) = engine.artifacts.adopt(&artifact, source_fingerprint, lease)
                {
                    tracing::debug!(
                        dataset = %self.dataset.id,
                        artifact = %artifact.name,
                        "Binding to baked buffer"
                    );
                    return Ok(artifact);
                }
                engine.buffers.invalidate(&self.dataset.id);
            }
            Ok(Resolution::Build) => {}
            Err(err) => {
                tracing::warn!(dataset = %self.dataset.id, error = %err, "Rebuilding buffer");
                engine.buffers.invalidate(&self.dataset.id);
            }
        }

        let artifact = engine
            .artifacts
            .acquire(
                Request {
                    schema: &engine.schema,
                    endpoint: self.endpoint,
                    target: self.dataset,
                    spatial: node,
                    sources,
                    source_fingerprint,
                },
                lease,
            )
            .await?;

        if node.is_buffered() {
            engine
                .buffers
                .record_baked(&self.dataset.id, node, kind, artifact.name.clone());
        }
        Ok(artifact)
    }

    /// Selects candidates by bounding box, then runs the exact filter over
    /// the candidates in batches.
    pub(super) async fn two_phase(&self) -> Result<Vec<RecordId>> {
        let engine = self.engine;
        let capability = self.endpoint.capability();

        let prefilter = Expr::and_from_vec(
            self.filter
                .conjuncts()
                .iter()
                .filter_map(|conjunct| match conjunct {
                    Expr::Spatial(spatial) if spatial.relation.is_boundable() => {
                        let mut bbox = spatial.clone();
                        bbox.relation = SpatialRelation::BboxIntersects;
                        Some(Expr::from(bbox))
                    }
                    _ => None,
                })
                .collect(),
        );

        let op = lower::select_ids(
            &engine.schema,
            capability,
            &self.dataset.id,
            &prefilter,
            &Bindings::new(),
        )?;
        let mut candidates = self.exec(op).await?.into_ids()?;
        candidates.sort_unstable();

        tracing::debug!(
            dataset = %self.dataset.id,
            candidates = candidates.len(),
            rows = self.stats.row_count,
            "Bounding box phase done"
        );
        self.ctx.progress(50);
        self.ctx.checkpoint()?;

        let batch_size = engine.config.candidate_batch.max(1);
        let batches = candidates.len().div_ceil(batch_size);
        let mut matched = vec![];

        for (i, batch) in candidates.chunks(batch_size).enumerate() {
            let op = lower::select_candidates(
                &engine.schema,
                capability,
                &self.dataset.id,
                self.filter,
                &Bindings::new(),
                batch.to_vec(),
            )?;
            matched.extend(self.exec(op).await?.into_ids()?);

            self.ctx.progress((50 + 50 * (i + 1) / batches).min(99) as u8);
            self.ctx.checkpoint()?;
        }

        Ok(matched)
    }

    /// Scans the dataset in keyset pages, checking for cancellation between
    /// pages.
    pub(super) async fn progressive(&self) -> Result<Vec<RecordId>> {
        let engine = self.engine;
        let limit = engine.config.chunk_size.max(1);
        let total = self.stats.row_count.max(1);

        let mut matched = vec![];
        let mut after = None;
        let mut scanned = 0_u64;

        loop {
            self.ctx.checkpoint()?;

            let op = lower::scan_chunk(
                &engine.schema,
                self.endpoint.capability(),
                &self.dataset.id,
                self.filter,
                &Bindings::new(),
                after,
                limit,
            )?;
            let page = self.exec(op).await?.into_flags()?;

            let Some(&(last, _)) = page.last() else {
                break;
            };
            after = Some(last);
            scanned += page.len() as u64;

            let len = page.len();
            matched.extend(page.into_iter().filter_map(|(id, hit)| hit.then_some(id)));

            self.ctx.progress((scanned * 100 / total).min(99) as u8);

            if len < limit {
                break;
            }
        }

        tracing::debug!(
            dataset = %self.dataset.id,
            scanned,
            matched = matched.len(),
            "Progressive scan done"
        );
        Ok(matched)
    }

    async fn exec(&self, op: Operation) -> Result<Rows> {
        Ok(self.endpoint.exec(&self.engine.schema, op).await?.rows)
    }
}
