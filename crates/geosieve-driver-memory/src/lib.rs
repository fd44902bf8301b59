mod eval;
use eval::Evaluator;

mod feature;
pub use feature::Feature;

mod geom;

mod store;
use store::{Artifact, Store};

pub use geo;

use geosieve_core::{
    async_trait,
    driver::{
        operation::{Materialize, Operation, QueryFilter, Scan},
        Capability, DatasetStats, Driver, Response,
    },
    schema::{DatasetId, Schema},
    stmt::RecordId,
    Error, Result,
};

use std::{ops::Bound, sync::Arc};

/// A backend holding its features in process memory.
///
/// Cloning the driver shares the underlying data, so a test can keep a
/// handle to load and modify features after handing the driver to the
/// engine.
#[derive(Debug, Clone)]
pub struct Memory {
    capability: &'static Capability,
    store: Arc<Store>,
}

impl Memory {
    /// An in-memory backend that keeps buffered references as artifacts.
    pub fn new() -> Memory {
        Memory::with_capability(&Capability::IN_MEMORY)
    }

    /// A file-layer backend driven through the host expression engine: no
    /// artifacts, no parallel jobs.
    pub fn generic_vector() -> Memory {
        Memory::with_capability(&Capability::GENERIC_VECTOR)
    }

    fn with_capability(capability: &'static Capability) -> Memory {
        Memory {
            capability,
            store: Arc::new(Store::default()),
        }
    }

    /// Adds or replaces features of `dataset`.
    pub fn insert(&self, dataset: impl Into<DatasetId>, features: impl IntoIterator<Item = Feature>) {
        let mut tables = self.store.tables_mut();
        let table = tables.entry(dataset.into()).or_default();
        for feature in features {
            table.features.insert(feature.id, feature);
        }
    }

    /// Removes one feature. Returns `false` when it did not exist.
    pub fn remove(&self, dataset: &DatasetId, id: RecordId) -> bool {
        self.store
            .tables_mut()
            .get_mut(dataset)
            .is_some_and(|table| table.features.remove(&id).is_some())
    }

    pub fn row_count(&self, dataset: &DatasetId) -> u64 {
        self.store
            .tables()
            .get(dataset)
            .map_or(0, |table| table.features.len() as u64)
    }

    /// Names of the artifacts currently held.
    pub fn artifacts(&self) -> Vec<String> {
        self.store.artifacts().keys().cloned().collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

#[async_trait]
impl Driver for Memory {
    fn capability(&self) -> &'static Capability {
        self.capability
    }

    async fn connect(&self) -> Result<Box<dyn geosieve_core::Connection>> {
        Ok(Box::new(Connection {
            capability: self.capability,
            store: self.store.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct Connection {
    capability: &'static Capability,
    store: Arc<Store>,
}

#[async_trait]
impl geosieve_core::Connection for Connection {
    fn capability(&self) -> &'static Capability {
        self.capability
    }

    async fn exec(&mut self, schema: &Arc<Schema>, op: Operation) -> Result<Response> {
        match op {
            Operation::QueryFilter(op) => self.query_filter(schema, op),
            Operation::Materialize(op) => self.materialize(schema, op),
            Operation::Release(op) => {
                let removed = self.store.artifacts_mut().shift_remove(&op.name).is_some();
                tracing::debug!(artifact = %op.name, removed, "Released in-memory artifact");
                Ok(Response::count(removed as u64))
            }
            Operation::Stats(op) => {
                let row_count = self
                    .store
                    .tables()
                    .get(&op.dataset)
                    .map_or(0, |table| table.features.len() as u64);
                Ok(Response::stats(DatasetStats { row_count }))
            }
            Operation::ExecSql(_) | Operation::QuerySql(_) => Err(Error::invalid_request(format!(
                "{} does not execute SQL",
                self.capability.kind
            ))),
        }
    }

    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Connection {
    fn query_filter(&self, schema: &Schema, op: QueryFilter) -> Result<Response> {
        let target = schema.dataset(&op.dataset)?;
        let tables = self.store.tables();
        let artifacts = self.store.artifacts();

        let mut evaluator = Evaluator::new(schema, &tables, &artifacts, target);
        evaluator.prepare(&op.filter)?;

        let Some(table) = tables.get(&op.dataset) else {
            return Ok(match op.scan {
                Scan::Chunk { .. } => Response::flags(vec![]),
                Scan::All | Scan::Candidates(_) => Response::ids(vec![]),
            });
        };

        match op.scan {
            Scan::All => {
                let mut ids = vec![];
                for feature in table.features.values() {
                    if evaluator.matches(&op.filter, feature)? {
                        ids.push(feature.id);
                    }
                }
                Ok(Response::ids(ids))
            }
            Scan::Candidates(mut candidates) => {
                candidates.sort_unstable();
                candidates.dedup();

                let mut ids = vec![];
                for id in candidates {
                    let Some(feature) = table.features.get(&id) else {
                        continue;
                    };
                    if evaluator.matches(&op.filter, feature)? {
                        ids.push(id);
                    }
                }
                Ok(Response::ids(ids))
            }
            Scan::Chunk { after, limit } => {
                let start = after.map_or(Bound::Unbounded, Bound::Excluded);
                let mut flags = Vec::with_capacity(limit);
                for (id, feature) in table.features.range((start, Bound::Unbounded)).take(limit) {
                    flags.push((*id, evaluator.matches(&op.filter, feature)?));
                }
                Ok(Response::flags(flags))
            }
        }
    }

    fn materialize(&self, schema: &Schema, op: Materialize) -> Result<Response> {
        if !self.capability.materialized_artifacts {
            return Err(Error::invalid_request(format!(
                "{} cannot hold materialized artifacts",
                self.capability.kind
            )));
        }

        let target = schema.dataset(&op.target)?;
        let tables = self.store.tables();
        let artifacts = self.store.artifacts();
        let shape = Evaluator::new(schema, &tables, &artifacts, target).reference(&op.spatial)?;
        drop(artifacts);
        drop(tables);

        tracing::debug!(
            artifact = %op.name,
            target = %op.target,
            empty = shape.is_none(),
            "Materialized in-memory artifact"
        );

        self.store.artifacts_mut().insert(
            op.name,
            Artifact {
                shape,
                srid: target.srid,
            },
        );
        Ok(Response::count(1))
    }
}
