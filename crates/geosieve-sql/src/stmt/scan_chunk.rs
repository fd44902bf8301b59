use super::Statement;

use geosieve_core::{
    schema::DatasetId,
    stmt::{Expr, RecordId},
};

#[derive(Debug, Clone)]
pub struct ScanChunk {
    pub dataset: DatasetId,
    pub filter: Expr,

    /// Last id of the previous page
    pub after: Option<RecordId>,

    pub limit: usize,
}

impl Statement {
    pub fn scan_chunk(
        dataset: impl Into<DatasetId>,
        filter: Expr,
        after: Option<RecordId>,
        limit: usize,
    ) -> Statement {
        ScanChunk {
            dataset: dataset.into(),
            filter,
            after,
            limit,
        }
        .into()
    }
}

impl From<ScanChunk> for Statement {
    fn from(value: ScanChunk) -> Self {
        Statement::ScanChunk(value)
    }
}
