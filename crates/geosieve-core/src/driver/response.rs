use crate::{stmt::RecordId, Result};

#[derive(Debug)]
pub struct Response {
    pub rows: Rows,
}

#[derive(Debug)]
pub enum Rows {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Matching record ids
    Ids(Vec<RecordId>),

    /// One `(id, matched)` pair per scanned row
    Flags(Vec<(RecordId, bool)>),

    /// Dataset statistics
    Stats(DatasetStats),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetStats {
    pub row_count: u64,
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self {
            rows: Rows::Count(count),
        }
    }

    pub fn ids(ids: Vec<RecordId>) -> Self {
        Self {
            rows: Rows::Ids(ids),
        }
    }

    pub fn flags(flags: Vec<(RecordId, bool)>) -> Self {
        Self {
            rows: Rows::Flags(flags),
        }
    }

    pub fn stats(stats: DatasetStats) -> Self {
        Self {
            rows: Rows::Stats(stats),
        }
    }
}

impl Rows {
    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }

    pub fn into_count(self) -> Result<u64> {
        match self {
            Rows::Count(count) => Ok(count),
            Rows::Stats(stats) => Ok(stats.row_count),
            rows => Err(crate::err!("expected count, got {}", rows.name())),
        }
    }

    pub fn into_ids(self) -> Result<Vec<RecordId>> {
        match self {
            Rows::Ids(ids) => Ok(ids),
            Rows::Flags(flags) => Ok(flags
                .into_iter()
                .filter_map(|(id, matched)| matched.then_some(id))
                .collect()),
            rows => Err(crate::err!("expected ids, got {}", rows.name())),
        }
    }

    pub fn into_flags(self) -> Result<Vec<(RecordId, bool)>> {
        match self {
            Rows::Flags(flags) => Ok(flags),
            rows => Err(crate::err!("expected flags, got {}", rows.name())),
        }
    }

    pub fn into_stats(self) -> Result<DatasetStats> {
        match self {
            Rows::Stats(stats) => Ok(stats),
            Rows::Count(row_count) => Ok(DatasetStats { row_count }),
            rows => Err(crate::err!("expected stats, got {}", rows.name())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Rows::Count(_) => "Count",
            Rows::Ids(_) => "Ids",
            Rows::Flags(_) => "Flags",
            Rows::Stats(_) => "Stats",
        }
    }
}
