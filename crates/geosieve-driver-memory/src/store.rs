use crate::{geom::Shape, Feature};

use geosieve_core::{schema::DatasetId, stmt::RecordId};

use indexmap::IndexMap;
use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Features and artifacts shared by every connection of a driver.
#[derive(Debug, Default)]
pub(crate) struct Store {
    tables: RwLock<IndexMap<DatasetId, Table>>,
    artifacts: RwLock<IndexMap<String, Artifact>>,
}

#[derive(Debug, Default)]
pub(crate) struct Table {
    pub(crate) features: BTreeMap<RecordId, Feature>,
}

/// A buffered reference geometry kept for reuse across queries.
#[derive(Debug, Clone)]
pub(crate) struct Artifact {
    /// `None` when the buffer eroded the reference away.
    pub(crate) shape: Option<Shape>,
    pub(crate) srid: u32,
}

impl Store {
    pub(crate) fn tables(&self) -> RwLockReadGuard<'_, IndexMap<DatasetId, Table>> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn tables_mut(&self) -> RwLockWriteGuard<'_, IndexMap<DatasetId, Table>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn artifacts(&self) -> RwLockReadGuard<'_, IndexMap<String, Artifact>> {
        self.artifacts.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn artifacts_mut(&self) -> RwLockWriteGuard<'_, IndexMap<String, Artifact>> {
        self.artifacts.write().unwrap_or_else(PoisonError::into_inner)
    }
}
