use crate::{driver::BackendKind, stmt::Type};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stable identifier of a dataset (a layer, in host terms).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(Arc<str>);

/// Where a dataset lives and how its rows are keyed.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub id: DatasetId,

    /// Backend table (or layer) name. May be schema-qualified, as
    /// `schema.table`.
    pub table: String,

    /// Integer column uniquely identifying a row.
    pub primary_key: String,

    pub geometry_column: String,

    pub srid: u32,

    pub backend: BackendKind,

    /// Declared attribute types. Used to insert casts on strictly typed
    /// backends; undeclared attributes are compared as-is.
    pub attributes: IndexMap<String, Type>,
}

impl DatasetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetId {
    fn from(value: &str) -> Self {
        DatasetId(value.into())
    }
}

impl From<String> for DatasetId {
    fn from(value: String) -> Self {
        DatasetId(value.into())
    }
}

impl From<&DatasetId> for DatasetId {
    fn from(value: &DatasetId) -> Self {
        value.clone()
    }
}

impl Dataset {
    /// A dataset keyed by `id` with its geometry in `geom`.
    pub fn new(id: impl Into<DatasetId>, backend: BackendKind, srid: u32) -> Dataset {
        let id = id.into();
        Dataset {
            table: id.to_string(),
            id,
            primary_key: "id".to_string(),
            geometry_column: "geom".to_string(),
            srid,
            backend,
            attributes: IndexMap::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn geometry_column(mut self, column: impl Into<String>) -> Self {
        self.geometry_column = column.into();
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.attributes.insert(name.into(), ty);
        self
    }

    pub fn attribute_type(&self, name: &str) -> Option<Type> {
        self.attributes.get(name).copied()
    }

    pub fn is_geographic(&self) -> bool {
        super::is_geographic(self.srid)
    }
}
