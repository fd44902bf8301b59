use super::Statement;

use geosieve_core::{
    schema::DatasetId,
    stmt::{Expr, RecordId},
};

#[derive(Debug, Clone)]
pub struct SelectIds {
    pub dataset: DatasetId,
    pub filter: Expr,

    /// Restricts the query to these rows.
    pub candidates: Option<Vec<RecordId>>,
}

impl Statement {
    pub fn select_ids(dataset: impl Into<DatasetId>, filter: Expr) -> Statement {
        SelectIds {
            dataset: dataset.into(),
            filter,
            candidates: None,
        }
        .into()
    }

    pub fn select_candidates(
        dataset: impl Into<DatasetId>,
        filter: Expr,
        candidates: Vec<RecordId>,
    ) -> Statement {
        SelectIds {
            dataset: dataset.into(),
            filter,
            candidates: Some(candidates),
        }
        .into()
    }
}

impl From<SelectIds> for Statement {
    fn from(value: SelectIds) -> Self {
        Statement::SelectIds(value)
    }
}
