mod artifact;
pub use artifact::{ArtifactAction, ArtifactDdl};

mod count_rows;
pub use count_rows::CountRows;

mod scan_chunk;
pub use scan_chunk::ScanChunk;

mod select_ids;
pub use select_ids::SelectIds;

use geosieve_core::schema::DatasetId;

/// A statement the engine sends to a SQL backend.
#[derive(Debug, Clone)]
pub enum Statement {
    /// Ids of every row matching a filter
    SelectIds(SelectIds),

    /// One keyset page of rows, each flagged matched or not
    ScanChunk(ScanChunk),

    CountRows(CountRows),

    /// One step of creating or dropping a materialized artifact
    Artifact(ArtifactDdl),
}

impl Statement {
    /// The dataset the statement is resolved against.
    pub fn dataset(&self) -> &DatasetId {
        match self {
            Statement::SelectIds(stmt) => &stmt.dataset,
            Statement::ScanChunk(stmt) => &stmt.dataset,
            Statement::CountRows(stmt) => &stmt.dataset,
            Statement::Artifact(stmt) => &stmt.target,
        }
    }
}
