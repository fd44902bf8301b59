use super::Operation;
use crate::schema::DatasetId;

#[derive(Debug, Clone)]
pub struct Stats {
    pub dataset: DatasetId,
}

impl From<Stats> for Operation {
    fn from(value: Stats) -> Self {
        Self::Stats(value)
    }
}
