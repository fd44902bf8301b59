use super::Operation;
use crate::{schema::DatasetId, stmt::ExprSpatial};

#[derive(Debug, Clone)]
pub struct Materialize {
    /// Artifact name, unique within the backend
    pub name: String,

    /// Dataset whose CRS the stored geometries use
    pub target: DatasetId,

    /// Reference and buffer to bake in. The relation is ignored.
    pub spatial: ExprSpatial,
}

impl From<Materialize> for Operation {
    fn from(value: Materialize) -> Self {
        Self::Materialize(value)
    }
}
