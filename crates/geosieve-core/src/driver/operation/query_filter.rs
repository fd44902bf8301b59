use super::Operation;
use crate::{
    schema::DatasetId,
    stmt::{Expr, RecordId},
};

#[derive(Debug, Clone)]
pub struct QueryFilter {
    pub dataset: DatasetId,

    /// Filter with artifact bindings already applied
    pub filter: Expr,

    pub scan: Scan,
}

/// Which rows a structured query looks at, and what it returns.
#[derive(Debug, Clone)]
pub enum Scan {
    /// Every row. Returns matching ids.
    All,

    /// Only the listed rows. Returns matching ids.
    Candidates(Vec<RecordId>),

    /// Up to `limit` rows with ids greater than `after`, in id order.
    /// Returns one flag per scanned row.
    Chunk {
        after: Option<RecordId>,
        limit: usize,
    },
}

impl From<QueryFilter> for Operation {
    fn from(value: QueryFilter) -> Self {
        Self::QueryFilter(value)
    }
}
