use super::Expr;
use crate::schema::DatasetId;

use serde::{Deserialize, Serialize};

/// The reference side of a spatial predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryRef {
    /// Literal geometry as well-known text.
    Wkt { wkt: String, srid: u32 },

    /// Every feature of another dataset, optionally narrowed by an attribute
    /// filter on that dataset.
    Dataset {
        dataset: DatasetId,
        filter: Option<Box<Expr>>,
    },

    /// A buffered reference already materialized in the backend. The engine
    /// substitutes this in; requests never carry it.
    Artifact { name: String, srid: u32 },
}

impl GeometryRef {
    pub fn wkt(wkt: impl Into<String>, srid: u32) -> GeometryRef {
        GeometryRef::Wkt {
            wkt: wkt.into(),
            srid,
        }
    }

    pub fn dataset(dataset: impl Into<DatasetId>) -> GeometryRef {
        GeometryRef::Dataset {
            dataset: dataset.into(),
            filter: None,
        }
    }

    pub fn dataset_where(dataset: impl Into<DatasetId>, filter: impl Into<Expr>) -> GeometryRef {
        GeometryRef::Dataset {
            dataset: dataset.into(),
            filter: Some(Box::new(filter.into())),
        }
    }

    pub fn is_artifact(&self) -> bool {
        matches!(self, GeometryRef::Artifact { .. })
    }
}
