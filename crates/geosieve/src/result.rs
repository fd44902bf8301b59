use geosieve_core::{driver::BackendKind, schema::DatasetId, stmt::RecordId};

/// How a filter request is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyPlan {
    /// Answered from the query cache. Nothing runs on the backend.
    Cached,

    /// One query over the whole dataset.
    Direct,

    /// Buffered references are materialized as indexed artifacts first, then
    /// one query runs against them.
    Materialized,

    /// A bounding-box query selects candidates, then the exact predicate runs
    /// on the candidates only.
    TwoPhase,

    /// The dataset is scanned in keyset pages, checking for cancellation
    /// between pages.
    Progressive,
}

impl StrategyPlan {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyPlan::Cached => "cached",
            StrategyPlan::Direct => "direct",
            StrategyPlan::Materialized => "materialized",
            StrategyPlan::TwoPhase => "two_phase",
            StrategyPlan::Progressive => "progressive",
        }
    }
}

impl core::fmt::Display for StrategyPlan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    pub dataset: DatasetId,

    /// Matching record ids, ascending and without duplicates.
    pub ids: Vec<RecordId>,

    /// The effective filter as native predicate text over the dataset. A
    /// host can apply it directly as a subset string.
    pub predicate: String,

    /// The backend that produced the result. Differs from the dataset's own
    /// backend when a fallback ran.
    pub backend: BackendKind,
}

impl ResultSet {
    pub(crate) fn new(
        dataset: DatasetId,
        mut ids: Vec<RecordId>,
        predicate: String,
        backend: BackendKind,
    ) -> ResultSet {
        ids.sort_unstable();
        ids.dedup();
        ResultSet {
            dataset,
            ids,
            predicate,
            backend,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }
}
