use super::Statement;

use geosieve_core::schema::DatasetId;

#[derive(Debug, Clone)]
pub struct CountRows {
    pub dataset: DatasetId,
}

impl Statement {
    pub fn count_rows(dataset: impl Into<DatasetId>) -> Statement {
        CountRows {
            dataset: dataset.into(),
        }
        .into()
    }
}

impl From<CountRows> for Statement {
    fn from(value: CountRows) -> Self {
        Statement::CountRows(value)
    }
}
